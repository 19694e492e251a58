/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by background job bodies.
///
/// Any error type can be returned from a background body, it is reported verbatim to the task completion
/// listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error enum type
#[derive(Debug)]
pub enum Error {
    /// The scheduler has been shut down and does not accept new runnables.
    SchedulerShutdown,
    /// A tokio runtime is required but none is running on the calling thread.
    NoRuntime,
    /// A background body observed the cancellation of its task.
    Interrupted,
    /// A background body panicked. The String contains the panic message.
    TaskPanicked(String),
    /// Invalid configuration. The String contains the reason.
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SchedulerShutdown => f.write_str("scheduler is shut down"),
            Error::NoRuntime => f.write_str("no tokio runtime running on this thread"),
            Error::Interrupted => f.write_str("task interrupted"),
            Error::TaskPanicked(reason) => write!(f, "task panicked: {}", reason),
            Error::Config(reason) => write!(f, "configuration error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<tokio::runtime::TryCurrentError> for Error {
    fn from(_: tokio::runtime::TryCurrentError) -> Self {
        Error::NoRuntime
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Config(format!("{}", error))
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(_: flume::SendError<T>) -> Self {
        Error::SchedulerShutdown
    }
}
