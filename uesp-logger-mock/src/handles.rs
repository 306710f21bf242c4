use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uesp_logger_embedded::MetricLine;

use crate::errors::WriteError;
use crate::settings::InfluxDb;
use crate::store::{PointStore, StoredPoint};

#[derive(Debug, Deserialize)]
pub struct WriteQuery {
    pub db: Option<String>,
    pub u: Option<String>,
    pub p: Option<String>,
}

#[derive(Clone)]
pub struct WriteState {
    pub influxdb: Arc<InfluxDb>,
    pub store: Arc<PointStore>,
}

pub async fn write_points(
    Query(query): Query<WriteQuery>,
    State(state): State<WriteState>,
    body: Bytes,
) -> Result<Response, WriteError> {
    if let Some(status) = state.influxdb.forced_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::debug!("Answering write with forced status {}", status.as_u16());
        return Ok(status.into_response());
    }

    let database = query.db.ok_or(WriteError::MissingDatabase)?;
    if database != state.influxdb.database {
        return Err(WriteError::DatabaseNotFound(database));
    }
    if query.u.as_deref() != Some(state.influxdb.username.as_str())
        || query.p.as_deref() != Some(state.influxdb.password.as_str())
    {
        return Err(WriteError::Unauthorized);
    }

    let body = std::str::from_utf8(&body).map_err(|_| WriteError::InvalidEncoding)?;
    let points = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            MetricLine::parse(line)
                .map(StoredPoint::from)
                .map_err(|e| WriteError::Parse {
                    line: line.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for point in points.iter() {
        tracing::info!(
            measurement = %point.measurement,
            tags = ?point.tags,
            "{}={}",
            point.field,
            point.value
        );
    }
    state.store.append(points).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn get_points(State(state): State<WriteState>) -> impl IntoResponse {
    Json(state.store.points().await)
}

pub async fn clear_points(State(state): State<WriteState>) -> impl IntoResponse {
    state.store.clear().await;
    StatusCode::NO_CONTENT
}
