/// Turns a `Result` into an `Option`, logging the error.
///
/// Used where a failure concerns a single container and must not stop the
/// surrounding loop, e.g. a scope that vanished while it was being opened.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        self.inspect_err(|err| log::error!("{err}")).ok()
    }
}
