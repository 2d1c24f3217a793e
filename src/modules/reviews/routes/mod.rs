use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use bookshelf_authz::Actor;
use bookshelf_http::error::AppError;

use super::models::CreateReviewRequest;
use crate::catalog::{DeletedReview, Review, ReviewInput, ReviewOutcome};
use crate::modules::{parse_book_id, parse_review_id, CatalogState, PageParams};
use crate::utils::Page;

pub async fn create_review(
    State(state): State<CatalogState>,
    actor: Actor,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewOutcome>), AppError> {
    let Json(request) = payload?;
    let (book_id, input) = request.into_parts();
    let book_id = parse_book_id(&book_id)?;

    let outcome = state.catalog.create_review(&actor, book_id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_review(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> Result<Json<Review>, AppError> {
    let review_id = parse_review_id(&id)?;
    Ok(Json(state.catalog.get_review(review_id).await?))
}

pub async fn reviews_for_book(
    State(state): State<CatalogState>,
    Path(book_id): Path<String>,
    paging: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Review>>, AppError> {
    let book_id = parse_book_id(&book_id)?;
    let Query(paging) = paging?;
    let page = state
        .catalog
        .reviews_for_book(book_id, paging.page, paging.limit)
        .await?;
    Ok(Json(page))
}

pub async fn update_review(
    State(state): State<CatalogState>,
    actor: Actor,
    Path(id): Path<String>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<Json<ReviewOutcome>, AppError> {
    let review_id = parse_review_id(&id)?;
    let Json(input) = payload?;
    Ok(Json(
        state.catalog.update_review(&actor, review_id, input).await?,
    ))
}

pub async fn delete_review(
    State(state): State<CatalogState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<DeletedReview>, AppError> {
    let review_id = parse_review_id(&id)?;
    Ok(Json(state.catalog.delete_review(&actor, review_id).await?))
}

/// Any authenticated caller may vote
pub async fn mark_helpful(
    State(state): State<CatalogState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Review>, AppError> {
    let review_id = parse_review_id(&id)?;
    Ok(Json(state.catalog.mark_helpful(review_id).await?))
}
