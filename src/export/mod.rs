//! Writing snapshots to delimited text files.
mod error;
mod pipeline;
mod row;

pub use error::{Error, Result};
pub use pipeline::{DEFAULT_WORKERS, MAX_WORKERS, export};
pub use row::{HEADER, format_row, header_line};
