//! Feathers-style error responses.
//!
//! Every failure leaves the HTTP boundary as
//! `{name, message, code, className, data?, errors?}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_blob::BlobError;
use serde_json::{json, Value};

/// The error classes the upload routes can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,   // 400
    NotFound,     // 404
    Conflict,     // 409
    GeneralError, // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::GeneralError => "general-error",
        }
    }
}

/// An error already shaped for the client. Holds no internal detail.
#[derive(Debug)]
pub struct RelayHttpError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
}

impl RelayHttpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Classify a coordinator error.
    ///
    /// Store failures are logged with their source here and answered with
    /// `failure`, the fixed message of the route that failed.
    pub fn from_blob(err: BlobError, failure: &'static str) -> Self {
        match err {
            BlobError::Validation { message, errors } => {
                let err = Self::bad_request(message);
                match errors {
                    Some(errors) => err.with_errors(errors),
                    None => err,
                }
            }
            BlobError::Reconciliation {
                authoritative,
                claimed,
            } => Self::bad_request("parts do not match the parts in the multipart upload.")
                .with_data(json!({
                    "s3Parts": authoritative,
                    "clientParts": claimed,
                })),
            BlobError::Integrity { part_number } => Self::conflict(format!(
                "part {} has not been fully uploaded; it has no ETag.",
                part_number
            ))
            .with_data(json!({ "partNumber": part_number })),
            BlobError::Store { operation, source } => {
                tracing::error!(operation, error = %source, "{}", failure);
                Self::general_error(failure)
            }
        }
    }

    /// Feathers-ish JSON payload.
    pub fn to_json(&self) -> Value {
        let mut base = json!({
            "name": self.kind.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.kind.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }
}

impl std::fmt::Display for RelayHttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message)
    }
}

impl std::error::Error for RelayHttpError {}

impl From<JsonRejection> for RelayHttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Failed to parse the request body as JSON")
            .with_errors(json!({"_schema": [rejection.body_text()]}))
    }
}

impl IntoResponse for RelayHttpError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_redacted() {
        let err = BlobError::store_message("complete_multipart", "AccessDenied: secret detail");
        let http = RelayHttpError::from_blob(err, "Error completing multipart upload");

        assert_eq!(http.code(), 500);
        let body = http.to_json();
        assert_eq!(body["message"], "Error completing multipart upload");
        assert!(!body.to_string().contains("secret detail"));
        assert!(body.get("data").is_none());
    }

    #[test]
    fn validation_errors_keep_their_field_map() {
        let err = BlobError::validation_with_errors(
            "filename is required",
            json!({"filename": ["filename is required"]}),
        );
        let body = RelayHttpError::from_blob(err, "unused").to_json();
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "filename is required");
        assert_eq!(body["errors"]["filename"][0], "filename is required");

        let body = RelayHttpError::from_blob(BlobError::validation("bad"), "unused").to_json();
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn integrity_maps_to_conflict() {
        let http = RelayHttpError::from_blob(BlobError::integrity(4), "unused");
        let body = http.to_json();
        assert_eq!(body["code"], 409);
        assert_eq!(body["className"], "conflict");
        assert_eq!(body["data"]["partNumber"], 4);
    }
}
