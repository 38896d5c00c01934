use thiserror::Error;

/// A display consumer could not render or record an event. Never fatal.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("rendering unavailable: {0}")]
    Unavailable(String),

    #[error("tick log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tick log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A notification could not be delivered. Never reaches the scheduler.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("AMQP transport failed: {0}")]
    Amqp(#[from] amiquip::Error),

    #[error("could not serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("notifier task failed: {0}")]
    Task(String),
}

pub(crate) fn render_unavailable<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Unavailable(e.to_string())
}
