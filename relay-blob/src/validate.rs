//! Input checks that run before any store call.
//!
//! Request shapes derive [`Validate`]. [`check`] runs the derived rules and
//! turns the collected `ValidationErrors` into a [`BlobError::Validation`]
//! whose `errors` map is keyed by field path.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::{BlobError, BlobResult, ObjectMetadata};

/// Part number as received from a caller, before the range check
#[derive(Debug, Clone, Copy, Validate)]
pub struct PartNumberInput {
    #[validate(range(
        min = 1,
        max = 10000,
        message = "the part number must be an integer between 1 and 10000."
    ))]
    pub part_number: i64,
}

/// The pair every per-session operation addresses
#[derive(Debug, Clone, Validate)]
pub struct SessionRef {
    #[validate(length(min = 1, message = "uploadId is required"))]
    pub upload_id: String,
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,
}

impl SessionRef {
    pub fn new<U: Into<String>, K: Into<String>>(upload_id: U, key: K) -> Self {
        Self {
            upload_id: upload_id.into(),
            key: key.into(),
        }
    }
}

/// Run the derived rules on `input`
pub fn check<T: Validate>(input: &T) -> BlobResult<()> {
    input.validate().map_err(BlobError::from)
}

/// Check that a part number is inside the protocol range
pub fn part_number(part_number: i64) -> BlobResult<u32> {
    check(&PartNumberInput { part_number })?;
    Ok(part_number as u32)
}

/// Metadata is either absent or an object whose values are all strings
pub fn metadata_shape(value: &Value) -> Result<(), ValidationError> {
    let message = match value {
        Value::Null => return Ok(()),
        Value::Object(fields) => match fields.iter().find(|(_, v)| !v.is_string()) {
            Some((key, _)) => format!("metadata value for '{}' must be a string", key),
            None => return Ok(()),
        },
        _ => "Invalid metadata format".to_string(),
    };

    let mut err = ValidationError::new("metadata");
    err.message = Some(message.into());
    Err(err)
}

/// String map of metadata that already passed [`metadata_shape`].
/// `None` when the client sent none.
pub fn metadata_map(value: &Value) -> Option<ObjectMetadata> {
    value.as_object().map(|fields| {
        fields
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn join_index(prefix: &str, idx: usize) -> String {
    format!("{prefix}[{idx}]")
}

fn push_validation_errors(
    out: &mut BTreeMap<String, Vec<String>>,
    prefix: &str,
    errs: &ValidationErrors,
) {
    for (field, kind) in errs.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    out.entry(key.clone()).or_default().push(msg);
                }
            }
            ValidationErrorsKind::Struct(struct_errs) => {
                let next = join_path(prefix, field);
                push_validation_errors(out, &next, struct_errs.as_ref());
            }
            ValidationErrorsKind::List(list_errs) => {
                let base = join_path(prefix, field);
                for (idx, nested) in list_errs {
                    let next = join_index(&base, *idx);
                    push_validation_errors(out, &next, nested.as_ref());
                }
            }
        }
    }
}

impl From<ValidationErrors> for BlobError {
    /// The first failure (by field path) becomes the message; every failure
    /// lands in `errors`.
    fn from(errs: ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        push_validation_errors(&mut fields, "", &errs);

        let message = fields
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "Invalid request".to_string());
        BlobError::validation_with_errors(message, json!(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UploadIntent;

    #[test]
    fn part_number_bounds_are_inclusive() {
        assert_eq!(part_number(1).unwrap(), 1);
        assert_eq!(part_number(10_000).unwrap(), 10_000);
        assert!(part_number(0).unwrap_err().is_validation());
        assert!(part_number(10_001).unwrap_err().is_validation());
        assert!(part_number(-3).unwrap_err().is_validation());
    }

    #[test]
    fn only_empty_strings_are_rejected() {
        assert!(check(&SessionRef::new("", "k")).unwrap_err().is_validation());
        assert!(check(&SessionRef::new("id", "")).unwrap_err().is_validation());
        assert!(check(&SessionRef::new("id", "  ")).is_ok());
        assert!(check(&UploadIntent::new(" ", "text/plain")).is_ok());
    }

    #[test]
    fn failures_carry_per_field_messages() {
        let err = check(&UploadIntent::new("", "")).unwrap_err();
        match err {
            BlobError::Validation { message, errors } => {
                let errors = errors.unwrap();
                assert_eq!(errors["content_type"][0], "contentType is required");
                assert_eq!(errors["filename"][0], "filename is required");
                assert_eq!(message, "contentType is required");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn metadata_must_be_a_string_map() {
        assert!(metadata_shape(&Value::Null).is_ok());
        assert!(metadata_shape(&json!({"owner": "ops", "source": "cli"})).is_ok());

        assert!(metadata_shape(&json!(["owner"])).is_err());
        assert!(metadata_shape(&json!("owner=ops")).is_err());
        let err = metadata_shape(&json!({"size": 12})).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("metadata value for 'size' must be a string"));
    }

    #[test]
    fn metadata_map_keeps_string_values() {
        assert_eq!(metadata_map(&Value::Null), None);
        let parsed = metadata_map(&json!({"owner": "ops"})).unwrap();
        assert_eq!(parsed.get("owner").map(String::as_str), Some("ops"));
    }
}
