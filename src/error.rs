use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `release` called by a thread that does not hold the monitor
    #[error("thread [{caller}] released a monitor it does not own")]
    NotOwner { caller: usize },

    #[error("{0}")]
    Work(String),

    #[error("{0}")]
    Panicked(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker thread {0} terminated abnormally")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, Error>;
