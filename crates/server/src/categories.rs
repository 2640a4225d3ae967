//! Categories API endpoints.

use api_types::category::{
    CategoryListQuery, CategoryListResponse, CategoryNew, CategoryUpdate, CategoryView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::Merchant;
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    transactions::{api_kind, engine_kind},
};

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: api_kind(category.kind),
        description: category.description,
        archived: category.archived,
    }
}

pub async fn list(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .list_categories(
            merchant.id,
            query.kind.map(engine_kind),
            query.include_archived.unwrap_or(false),
        )
        .await?
        .into_iter()
        .map(map_category)
        .collect();

    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(
            merchant.id,
            &payload.name,
            engine_kind(payload.kind),
            payload.description.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn update(
    Extension(merchant): Extension<Merchant>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let update = engine::CategoryUpdate {
        name: payload.name,
        description: payload
            .description
            .map(|text| Some(text).filter(|text| !text.trim().is_empty())),
        archived: payload.archived,
    };
    let category = state
        .engine
        .update_category(merchant.id, category_id, update)
        .await?;
    Ok(Json(map_category(category)))
}
