use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes could not be decoded, or decoded to an empty image.
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    /// The model could not be loaded or failed to produce scores.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Scores were produced but cannot be interpreted.
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn model_unavailable(error: impl std::fmt::Display) -> Self {
        Error::ModelUnavailable(error.to_string())
    }
}
