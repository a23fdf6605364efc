use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use records::{Created, DatabaseStatus, Health, Message, Metrics, User, UserPayload, validate};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::{error::AppError, state::AppState, users};

#[cfg(test)]
mod tests;

pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "user-api",
        "status": "ok",
        "endpoints": ["/users", "/health", "/metrics"],
    }))
}

pub async fn favicon_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Health> {
    let database = if state.database.ping().await {
        DatabaseStatus::Up
    } else {
        DatabaseStatus::Down
    };

    Json(Health {
        uptime: state.uptime(),
        status: "ok".to_string(),
        timestamp: Utc::now().timestamp_millis(),
        database,
    })
}

pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    let pool = state.database.ensure_pool().await?;

    Ok(Json(users::list_users(pool).await?))
}

pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<Created>, AppError> {
    let Json(payload) = payload?;
    debug!("POST /users body => {payload:?}");

    let user = validate(&payload).map_err(AppError::Validation)?;
    let pool = state.database.ensure_pool().await?;
    let id = users::insert_user(pool, &user).await?;

    Ok(Json(Created {
        message: "insert ok".to_string(),
        id,
    }))
}

pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id)?;
    let pool = state.database.ensure_pool().await?;

    Ok(Json(users::get_user(pool, id).await?))
}

pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<Message>, AppError> {
    let Json(payload) = payload?;
    debug!("PUT /users/{id} body => {payload:?}");

    let id = parse_id(&id)?;
    let user = validate(&payload).map_err(AppError::Validation)?;
    let pool = state.database.ensure_pool().await?;
    users::update_user(pool, id, &user).await?;

    Ok(Json(Message {
        message: "update ok".to_string(),
    }))
}

pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Message>, AppError> {
    let id = parse_id(&id)?;
    let pool = state.database.ensure_pool().await?;
    users::delete_user(pool, id).await?;

    Ok(Json(Message {
        message: "delete ok".to_string(),
    }))
}

pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Metrics>, AppError> {
    let pool = state.database.ensure_pool().await?;
    let users_total = users::count_users(pool).await?;

    Ok(Json(Metrics {
        users_total,
        timestamp: Utc::now().timestamp_millis(),
    }))
}

pub async fn ping_db_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = match state.database.ensure_pool().await {
        Ok(pool) => state
            .database
            .round_trip(pool)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))),
        Err(e) => {
            error!("Database ping failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e })),
            )
        }
    }
}

/// Ids that are not integers cannot address a row.
fn parse_id(id: &str) -> Result<i64, AppError> {
    id.trim().parse().map_err(|_| AppError::NotFound)
}
