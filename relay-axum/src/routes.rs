//! Upload routes.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/s3/sign` | single-shot presigned PUT |
//! | POST   | `/s3/multipart` | open a session |
//! | GET    | `/s3/multipart/{uploadId}/{partNumber}?key=` | presign one part |
//! | GET    | `/s3/multipart/{uploadId}?key=` | list stored parts |
//! | POST   | `/s3/multipart/{uploadId}/complete?key=` | reconcile and finalize |
//! | DELETE | `/s3/multipart/{uploadId}?key=` | abort |

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use relay_blob::{ClaimedPart, PartDescriptor};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    params::{self, KeyQuery, OpenSessionBody, SignBody},
    RelayHttpError, RelayState,
};

pub fn upload_router(state: RelayState) -> Router<()> {
    Router::new()
        .route("/s3/sign", post(sign_upload))
        .route("/s3/multipart", post(open_session))
        .route(
            "/s3/multipart/{uploadId}",
            get(list_parts).delete(abort_session),
        )
        .route("/s3/multipart/{uploadId}/complete", post(complete_session))
        .route("/s3/multipart/{uploadId}/{partNumber}", get(part_target))
        .with_state(state)
}

async fn sign_upload(
    State(state): State<RelayState>,
    body: Result<Json<SignBody>, JsonRejection>,
) -> Result<Json<Value>, RelayHttpError> {
    let Json(body) = body?;
    let (filename, content_type) = body.require()?;

    let upload = state
        .presign
        .sign_upload(&filename, &content_type)
        .await
        .map_err(|err| RelayHttpError::from_blob(err, "Error creating presigned URL"))?;

    Ok(Json(json!({
        "message": "Presigned URL created successfully",
        "url": upload.url,
        "method": upload.method,
        "key": upload.key,
        "expiresAt": upload.expires_at,
    })))
}

async fn open_session(
    State(state): State<RelayState>,
    body: Result<Json<OpenSessionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), RelayHttpError> {
    let Json(body) = body?;
    let intent = body.into_intent()?;

    let session = state
        .uploads
        .open_session(intent)
        .await
        .map_err(|err| RelayHttpError::from_blob(err, "Error starting multipart upload"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Multipart upload started successfully",
            "uploadId": session.upload_id,
            "key": session.key,
        })),
    ))
}

async fn part_target(
    State(state): State<RelayState>,
    Path((upload_id, part_number)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<Value>, RelayHttpError> {
    let upload_id = params::upload_id(upload_id)?;
    let key = query.require()?;
    let part_number = params::part_number(&part_number)?;

    let target = state
        .uploads
        .part_upload_target(&upload_id, &key, part_number)
        .await
        .map_err(|err| {
            RelayHttpError::from_blob(err, "Error creating multipart upload part presigned URL")
        })?;

    Ok(Json(json!({
        "message": "Multipart upload part presigned URL created successfully",
        "url": target.url,
        "method": target.method,
        "expiresAt": target.expires_at,
    })))
}

async fn list_parts(
    State(state): State<RelayState>,
    Path(upload_id): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<Vec<PartDescriptor>>, RelayHttpError> {
    let upload_id = params::upload_id(upload_id)?;
    let key = query.require()?;

    let parts = state
        .uploads
        .list_parts(&upload_id, &key)
        .await
        .map_err(|err| RelayHttpError::from_blob(err, "Error listing multipart upload parts"))?;

    Ok(Json(parts))
}

async fn complete_session(
    State(state): State<RelayState>,
    Path(upload_id): Path<String>,
    Query(query): Query<KeyQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, RelayHttpError> {
    let upload_id = params::upload_id(upload_id)?;
    let key = query.require()?;
    let Json(body) = body?;

    let claimed = ClaimedPart::parse_list(body.get("parts").unwrap_or(&Value::Null))
        .map_err(|err| RelayHttpError::from_blob(err, "Error completing multipart upload"))?;
    debug!(claimed = claimed.len(), "completion requested");

    let receipt = state
        .uploads
        .complete(&upload_id, &key, &claimed)
        .await
        .map_err(|err| RelayHttpError::from_blob(err, "Error completing multipart upload"))?;

    Ok(Json(json!({
        "message": "Multipart upload completed successfully",
        "location": receipt.location,
        "key": receipt.key,
        "parts": receipt.parts,
    })))
}

async fn abort_session(
    State(state): State<RelayState>,
    Path(upload_id): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<Value>, RelayHttpError> {
    let upload_id = params::upload_id(upload_id)?;
    let key = query.require()?;

    state
        .uploads
        .abort(&upload_id, &key)
        .await
        .map_err(|err| RelayHttpError::from_blob(err, "Error aborting multipart upload"))?;

    Ok(Json(json!({
        "message": "Multipart upload aborted successfully",
    })))
}
