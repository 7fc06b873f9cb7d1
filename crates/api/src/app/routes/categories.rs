use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockroom_core::CategoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route(
            "/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

fn parse_id(id: &str) -> Result<CategoryId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("category"))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateCategoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.create_category(body.into()).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_category(id).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::PageParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return errors::invalid_query(rejection),
    };

    match services
        .list_categories(params.page.unwrap_or(1), params.limit.unwrap_or(0))
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCategoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.update_category(id, body.into()).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
