use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::params::log_record::{CreateParams, CreatedResponse, IndexParams};
use crate::{AppState, Error};
use domain::log_record as LogRecordApi;
use log::*;

/// GET the most recent log records, newest first
#[utoipa::path(
    get,
    path = "/api/logs",
    params(IndexParams),
    responses(
        (status = 200, description = "Successfully retrieved the most recent matching log records", body = [domain::log_records::Model]),
        (status = 500, description = "Log store unavailable")
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET log records with params: {params:?}");

    let filter = params.into_filter();
    let records = LogRecordApi::snapshot(
        app_state.record_store_ref(),
        &filter,
        app_state.config.snapshot_limit,
    )
    .await?;

    Ok(Json(records))
}

/// POST append a new log record
#[utoipa::path(
    post,
    path = "/api/logs",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Successfully appended a new log record", body = CreatedResponse),
        (status = 400, description = "Malformed request body"),
        (status = 422, description = "Unprocessable Entity"),
        (status = 500, description = "Log store unavailable")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new log record from: {params:?}");

    let id = LogRecordApi::create(app_state.record_store_ref(), params.into()).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
