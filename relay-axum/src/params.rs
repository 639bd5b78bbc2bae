use relay_blob::{validate, UploadId, UploadIntent, MAX_PART_NUMBER, MIN_PART_NUMBER};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::RelayHttpError;

const KEY_REQUIRED: &str =
    "the object key must be passed as a query parameter. For example: \"?key=abc.jpg\"";
const SIGN_REQUIRED: &str = "Filename and content type are required";

/// `?key=` on every per-session route
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct KeyQuery {
    #[validate(
        required(message = "the object key must be passed as a query parameter. For example: \"?key=abc.jpg\""),
        length(min = 1, message = "the object key must be passed as a query parameter. For example: \"?key=abc.jpg\"")
    )]
    pub key: Option<String>,
}

impl KeyQuery {
    /// The object key, or a 400 telling the client where it belongs
    pub fn require(self) -> Result<String, RelayHttpError> {
        check(&self)?;
        self.key.ok_or_else(|| RelayHttpError::bad_request(KEY_REQUIRED))
    }
}

/// Body of `POST /s3/multipart`. `type` is accepted for `contentType`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionBody {
    #[serde(default)]
    #[validate(
        required(message = "filename is required"),
        length(min = 1, message = "filename is required")
    )]
    pub filename: Option<String>,
    #[serde(default, alias = "type")]
    #[validate(
        required(message = "contentType is required"),
        length(min = 1, message = "contentType is required")
    )]
    pub content_type: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "relay_blob::validate::metadata_shape"))]
    pub metadata: Value,
}

impl OpenSessionBody {
    /// Checked intent for the coordinator
    pub fn into_intent(self) -> Result<UploadIntent, RelayHttpError> {
        check(&self)?;
        Ok(UploadIntent::new(
            self.filename.unwrap_or_default(),
            self.content_type.unwrap_or_default(),
        )
        .with_metadata(self.metadata))
    }
}

/// Body of `POST /s3/sign`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignBody {
    #[serde(default)]
    #[validate(
        required(message = "Filename and content type are required"),
        length(min = 1, message = "Filename and content type are required")
    )]
    pub filename: Option<String>,
    #[serde(default, alias = "type")]
    #[validate(
        required(message = "Filename and content type are required"),
        length(min = 1, message = "Filename and content type are required")
    )]
    pub content_type: Option<String>,
}

impl SignBody {
    pub fn require(self) -> Result<(String, String), RelayHttpError> {
        check(&self)?;
        match (self.filename, self.content_type) {
            (Some(filename), Some(content_type)) => Ok((filename, content_type)),
            _ => Err(RelayHttpError::bad_request(SIGN_REQUIRED)),
        }
    }
}

/// Run the derived rules; failures are a 400 with the per-field `errors`
pub fn check<T: Validate>(input: &T) -> Result<(), RelayHttpError> {
    validate::check(input).map_err(|err| RelayHttpError::from_blob(err, "Invalid request"))
}

/// The session id from the path; the router never yields an empty one,
/// but an empty segment is still refused.
pub fn upload_id(raw: String) -> Result<UploadId, RelayHttpError> {
    if raw.is_empty() {
        return Err(RelayHttpError::bad_request(
            "invalid uploadId. Must be part of url params: \"/s3/multipart/<uploadId>\"",
        ));
    }
    Ok(UploadId::from_string(raw))
}

/// Parse and range-check the `{partNumber}` path segment.
///
/// The error carries the accepted range so the client can correct itself.
pub fn part_number(raw: &str) -> Result<i64, RelayHttpError> {
    let out_of_range = |message: String| {
        RelayHttpError::bad_request(message)
            .with_data(json!({"min": MIN_PART_NUMBER, "max": MAX_PART_NUMBER}))
    };

    let parsed = raw.trim().parse::<i64>().map_err(|_| {
        out_of_range(format!(
            "the part number must be an integer between {} and {}.",
            MIN_PART_NUMBER, MAX_PART_NUMBER
        ))
    })?;

    validate::part_number(parsed).map_err(|err| out_of_range(validation_message(err)))?;
    Ok(parsed)
}

fn validation_message(err: relay_blob::BlobError) -> String {
    match err {
        relay_blob::BlobError::Validation { message, .. } => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_number_accepts_the_inclusive_range() {
        assert_eq!(part_number("1").unwrap(), 1);
        assert_eq!(part_number("10000").unwrap(), 10_000);
    }

    #[test]
    fn part_number_rejects_garbage_with_the_range() {
        for raw in ["0", "10001", "-2", "abc", "1.5", ""] {
            let err = part_number(raw).unwrap_err();
            assert_eq!(err.code(), 400, "{raw}");
            assert_eq!(err.data, Some(json!({"min": 1, "max": 10000})));
        }
    }

    #[test]
    fn missing_or_empty_key_is_rejected() {
        assert!(KeyQuery { key: None }.require().is_err());
        let err = KeyQuery { key: Some(String::new()) }.require().unwrap_err();
        assert_eq!(err.message, KEY_REQUIRED);
        assert_eq!(err.errors.unwrap()["key"][0], KEY_REQUIRED);
        assert_eq!(
            KeyQuery { key: Some("test/a.bin".into()) }.require().unwrap(),
            "test/a.bin"
        );
    }

    #[test]
    fn open_body_reports_every_failed_field() {
        let body: OpenSessionBody =
            serde_json::from_value(json!({"filename": "", "metadata": {"size": 3}})).unwrap();
        let err = body.into_intent().unwrap_err();
        let errors = err.errors.unwrap();
        assert_eq!(errors["filename"][0], "filename is required");
        assert_eq!(errors["content_type"][0], "contentType is required");
        assert_eq!(errors["metadata"][0], "metadata value for 'size' must be a string");
    }

    #[test]
    fn sign_body_needs_both_fields() {
        let body: SignBody = serde_json::from_value(json!({"type": "image/png"})).unwrap();
        assert_eq!(body.require().unwrap_err().message, SIGN_REQUIRED);

        let body: SignBody =
            serde_json::from_value(json!({"filename": " ", "type": "image/png"})).unwrap();
        assert_eq!(body.require().unwrap(), (" ".to_string(), "image/png".to_string()));
    }

    #[test]
    fn open_body_accepts_type_alias() {
        let body: OpenSessionBody =
            serde_json::from_value(json!({"filename": "a.mp4", "type": "video/mp4"})).unwrap();
        assert_eq!(body.content_type.as_deref(), Some("video/mp4"));
        assert!(body.metadata.is_null());
    }
}
