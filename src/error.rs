use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Every in-bounds cell is taken; placement gives up instead of spinning.
    #[error("no free cell left: {occupied} occupied of {available} in bounds")]
    NoFreeSpace { occupied: usize, available: usize },

    #[error("invalid game options: {0}")]
    InvalidOptions(String),
}
