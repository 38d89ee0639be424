use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("authentication rejected")]
    Auth,
    #[error("unknown sender {0}")]
    UnknownSender(String),
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),
    #[error("mapping not found")]
    NotFound,
    #[error("validation {0}")]
    Validation(String),
    #[error("matrix {0}")]
    Matrix(String),
}

impl BridgeError {
    pub fn is_auth(&self) -> bool {
        matches!(self, BridgeError::Auth)
    }
}
