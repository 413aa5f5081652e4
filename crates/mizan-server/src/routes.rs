//! Request handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use mizan_core::RegulationDocument;
use mizan_engine::Advisor;
use serde_json::Value;

use crate::error::ApiError;

type Shared = State<Arc<Advisor>>;

/// Parse the body as a JSON object.
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidInput(format!("request body is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ApiError::InvalidInput(
            "request body must be a JSON object".into(),
        ));
    }
    Ok(value)
}

/// A regulation payload with at least one section.
fn document(payload: &Value) -> Result<RegulationDocument, ApiError> {
    let document = RegulationDocument::from_value(payload)?;
    if document.section_count() == 0 {
        return Err(ApiError::InvalidInput(
            "regulations data has no sections".into(),
        ));
    }
    Ok(document)
}

/// The required `regulations` payload as a document.
fn regulations(body: &Value) -> Result<RegulationDocument, ApiError> {
    match body.get("regulations") {
        None | Some(Value::Null) => Err(ApiError::InvalidInput(
            "regulations data is required".into(),
        )),
        Some(payload) => document(payload),
    }
}

pub async fn regulation_drafting(
    State(advisor): Shared,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let document = regulations(&json_body(&body)?)?;
    Ok(Json(advisor.draft(&document).await))
}

pub async fn regulation_update(
    State(advisor): Shared,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let document = regulations(&json_body(&body)?)?;
    Ok(Json(advisor.review(&document).await))
}

pub async fn qa_transform(
    State(advisor): Shared,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(&body)?;
    let query = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("query text is required".into()))?;
    let document = match body.get("regulations") {
        None | Some(Value::Null) => None,
        Some(payload) => Some(document(payload)?),
    };
    Ok(Json(advisor.answer(query, document.as_ref()).await?))
}

pub async fn health(State(advisor): Shared) -> impl IntoResponse {
    Json(advisor.health().await)
}
