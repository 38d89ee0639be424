use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatrixClientError>;

#[derive(Debug, Error)]
pub enum MatrixClientError {
    #[error("invalid base url")]
    InvalidBaseUrl,
    #[error("http error")]
    Http(#[from] reqwest::Error),
    #[error("api error {status} {errcode}")]
    Api {
        status: u16,
        errcode: String,
        error: String,
    },
    #[error("json error")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl MatrixClientError {
    pub fn errcode(&self) -> Option<&str> {
        match self {
            MatrixClientError::Api { errcode, .. } => Some(errcode),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            MatrixClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
