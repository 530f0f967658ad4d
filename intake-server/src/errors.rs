use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use blob_store::BlobStoreError;
use record_log::RecordLogError;
use serde::Serialize;
use serde_json::error::Error as SerdeError;
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

/// Closed set of caller-visible failures. Display strings double as the
/// `error` field of the response body, so they stay fixed and never carry
/// internal error text.
#[derive(Debug, Error)]
pub enum IntakeErr {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid_json")]
    Json(#[from] SerdeError),

    #[error("invalid_base64")]
    InvalidBase64,

    #[error("image could not be stored")]
    BlobWrite(std::io::Error),

    #[error("record could not be stored")]
    Storage(#[from] RecordLogError),
}

impl From<BlobStoreError> for IntakeErr {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::InvalidEncoding => IntakeErr::InvalidBase64,
            BlobStoreError::Io(io_err) => IntakeErr::BlobWrite(io_err),
        }
    }
}

impl ResponseError for IntakeErr {
    fn status_code(&self) -> StatusCode {
        match self {
            IntakeErr::Unauthorized => StatusCode::UNAUTHORIZED,
            IntakeErr::Json(_) | IntakeErr::InvalidBase64 => StatusCode::BAD_REQUEST,
            IntakeErr::BlobWrite(_) | IntakeErr::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            ok: false,
            error: self.to_string(),
        })
    }
}
