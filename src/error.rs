/// Turns a per-item failure into a logged `None` so a sweep over many items can keep going.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error at `error` level and discards it.
    fn ok_log(self) -> Option<T>;
    /// Logs the error at `warn` level and discards it.
    fn ok_warn(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_warn(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}
