use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::Json;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::schema::{CreateMatchSchema, LimitMatchesQuery, LimitQueryParams, ValidationIssues};
use crate::AppState;

pub async fn get_matches_handler(
    opts: Result<Query<LimitQueryParams>, QueryRejection>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    // A repeated `limit` fails here and must not fall back to the default.
    let Query(opts) =
        opts.map_err(|e| ValidationIssues::field("limit", "invalid_type", e.body_text()))?;

    let query = LimitMatchesQuery::parse(opts)?;
    let matches = data.db.get_matches(query.effective_limit()).await?;

    Ok(Json(json!({ "data": matches })))
}

pub async fn create_match_handler(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) =
        payload.map_err(|e| ValidationIssues::payload("invalid_json", e.body_text()))?;
    let payload = CreateMatchSchema::parse(body)?;

    let m = data
        .db
        .create_match(payload.into_new_match(Utc::now()))
        .await?;

    if let Some(broadcaster) = &data.broadcaster {
        broadcaster.notify(&m);
    }

    Ok((StatusCode::CREATED, Json(json!({ "data": m }))))
}
