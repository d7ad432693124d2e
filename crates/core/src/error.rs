use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuewatchError {
    #[error("Configuration error: {0}")]
    Config(String),
}
