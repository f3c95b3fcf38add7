use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("remote failure: {0}")]
    Remote(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl TableError {
    pub fn message(&self) -> &str {
        match self {
            TableError::Remote(message) | TableError::Transport(message) => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, TableError::Transport(_))
    }
}
