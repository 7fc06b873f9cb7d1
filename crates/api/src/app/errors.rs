use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::CatalogError;

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::NotFound { kind } => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{kind} not found"))
        }
        CatalogError::AlreadyExists(msg) => json_error(StatusCode::CONFLICT, "already_exists", msg),
        CatalogError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        err @ CatalogError::InsufficientStock { .. } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            err.to_string(),
        ),
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CatalogError::StoreUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        CatalogError::Integrity(msg) => {
            tracing::error!(error = %msg, "stored data violates an invariant");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "integrity_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn invalid_body(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn invalid_query(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}
