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

use crate::catalog::{
    Book, BookInput, BookListQuery, BookWithReviews, CascadeReport, ReconcileOutcome,
};
use crate::modules::{parse_book_id, CatalogState, PageParams};
use crate::utils::Page;

pub async fn list_books(
    State(state): State<CatalogState>,
    query: Result<Query<BookListQuery>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.catalog.list_books(&query).await?))
}

pub async fn get_book(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    paging: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<BookWithReviews>, AppError> {
    let book_id = parse_book_id(&id)?;
    let Query(paging) = paging?;
    let detail = state
        .catalog
        .book_with_reviews(book_id, paging.page, paging.limit)
        .await?;
    Ok(Json(detail))
}

pub async fn create_book(
    State(state): State<CatalogState>,
    actor: Actor,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = payload?;
    let book = state.catalog.create_book(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<CatalogState>,
    actor: Actor,
    Path(id): Path<String>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let book_id = parse_book_id(&id)?;
    let Json(input) = payload?;
    Ok(Json(state.catalog.update_book(&actor, book_id, input).await?))
}

pub async fn delete_book(
    State(state): State<CatalogState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<CascadeReport>, AppError> {
    let book_id = parse_book_id(&id)?;
    Ok(Json(state.catalog.delete_book(&actor, book_id).await?))
}

pub async fn reconcile_book(
    State(state): State<CatalogState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let book_id = parse_book_id(&id)?;
    Ok(Json(state.catalog.reconcile_book(&actor, book_id).await?))
}
