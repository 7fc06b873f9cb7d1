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

use stockroom_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/:id/stock", post(adjust_stock))
}

fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("product"))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.create_product(body.into()).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let product = match services.get_product(id).await {
        Ok(p) => p,
        Err(e) => return errors::catalog_error_to_response(e),
    };

    match services.queries().view(product).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ListProductsParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return errors::invalid_query(rejection),
    };
    let query = match params.into_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.list_products(query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.update_product(id, body.into()).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::invalid_body(rejection),
    };

    match services.adjust_stock(id, body.delta).await {
        Ok(level) => Json(dto::StockResponse::from(level)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
