use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to socket `{path}`: {source}")]
    SocketConnect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build request for `{uri}`: {source}")]
    Request {
        uri: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error("HTTP exchange for `{uri}` failed: {source}")]
    Http {
        uri: String,
        #[source]
        source: hyper::Error,
    },
    #[error("`{uri}` answered with status {status}: {body}")]
    Status {
        uri: String,
        status: hyper::StatusCode,
        body: String,
    },
    #[error("failed to decode response of `{uri}`: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
