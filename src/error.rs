use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImagineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Upload failed: {0}")]
    UploadError(String),
    #[error("Generation failed: {0}")]
    GenerationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("A generation request is already in progress")]
    Busy,
}

impl ImagineError {
    /// Message shown to the user. Server-reported failures keep the server's
    /// wording, everything else gets `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ImagineError::UploadError(msg)
            | ImagineError::GenerationError(msg)
            | ImagineError::ValidationError(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<std::io::Error> for ImagineError {
    fn from(e: std::io::Error) -> Self {
        ImagineError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for ImagineError {
    fn from(e: serde_json::Error) -> Self {
        ImagineError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImagineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_messages_survive_user_message() {
        let err = ImagineError::UploadError("bad file".into());
        assert_eq!(err.user_message("Upload failed"), "bad file");

        let err = ImagineError::RequestError("connection refused".into());
        assert_eq!(err.user_message("Upload failed"), "Upload failed");
    }
}
