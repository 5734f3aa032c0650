use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::storage::StorageError;

pub const NO_FILE_MESSAGE: &str = "No file uploaded.";

/// Ways an upload request can end without writing the file.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Invalid multipart body: {0}")]
    Form(#[from] MultipartError),

    #[error("File share '{0}' does not exist")]
    ShareMissing(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::NoFile => StatusCode::BAD_REQUEST,
            UploadError::Form(err) => err.status(),
            UploadError::ShareMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::Storage(err) => match err {
                StorageError::Configuration(_) | StorageError::Unexpected(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                StorageError::NotFound(_) => StatusCode::BAD_GATEWAY,
                StorageError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            UploadError::NoFile => (status, NO_FILE_MESSAGE).into_response(),
            UploadError::Form(err) => (status, err.body_text()).into_response(),
            // Server-side failures carry no body.
            UploadError::ShareMissing(_) | UploadError::Storage(_) => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(UploadError::NoFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::ShareMissing("contractsshare".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UploadError::from(StorageError::Configuration("no key".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UploadError::from(StorageError::Unexpected("boom".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            UploadError::from(StorageError::NotFound("uploads".to_string())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            UploadError::from(StorageError::Transient("timeout".to_string())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_server_errors_have_empty_body() {
        let response =
            UploadError::from(StorageError::Transient("timeout".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_no_file_body() {
        let response = UploadError::NoFile.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], NO_FILE_MESSAGE.as_bytes());
    }
}
