pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use bookshelf_kernel::{InitCtx, Module};

use super::docs::{
    body, components, error, health, identity_header, operation, page_of, paging_params,
    path_param, request_body, schema_ref,
};
use super::CatalogState;

const TAG: &str = "Reviews";

/// Reviews and the rating summaries they drive
pub struct ReviewsModule {
    state: CatalogState,
}

impl ReviewsModule {
    pub fn new(state: CatalogState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", post(routes::create_review))
            .route("/health", get(health_check))
            .route("/book/{book_id}", get(routes::reviews_for_book))
            .route(
                "/{id}",
                get(routes::get_review)
                    .put(routes::update_review)
                    .delete(routes::delete_review),
            )
            .route("/{id}/helpful", post(routes::mark_helpful))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }
}

async fn health_check() -> &'static str {
    "reviews module is healthy"
}

fn openapi_fragment() -> Value {
    let id = || path_param("id", "Review id");
    let mut by_book = vec![path_param("book_id", "Book id")];
    by_book.extend(paging_params());

    json!({
        "paths": {
            "/": {
                "post": operation(
                    "Review a book",
                    TAG,
                    vec![identity_header()],
                    Some(request_body("CreateReview")),
                    vec![
                        ("201", body("Review and the book's new summary", schema_ref("ReviewOutcome"))),
                        ("401", error("Missing caller identity")),
                        ("404", error("Book not found")),
                        ("409", error("Caller already reviewed this book")),
                        ("422", error("Invalid rating or comment")),
                        ("500", error("Review saved but the summary may be stale")),
                        ("503", error("Storage unavailable; nothing was written")),
                    ],
                )
            },
            "/health": health(TAG),
            "/book/{book_id}": {
                "get": operation(
                    "List a book's reviews, newest first",
                    TAG,
                    by_book,
                    None,
                    vec![
                        ("200", body("One page of reviews", page_of("Review"))),
                        ("404", error("Book not found")),
                    ],
                )
            },
            "/{id}": {
                "get": operation(
                    "Get a review",
                    TAG,
                    vec![id()],
                    None,
                    vec![
                        ("200", body("The review", schema_ref("Review"))),
                        ("404", error("Review not found")),
                    ],
                ),
                "put": operation(
                    "Update your review",
                    TAG,
                    vec![id(), identity_header()],
                    Some(request_body("ReviewInput")),
                    vec![
                        ("200", body("Review and the book's new summary", schema_ref("ReviewOutcome"))),
                        ("404", error("Review not found or unauthorized")),
                        ("422", error("Invalid rating or comment")),
                        ("500", error("Review saved but the summary may be stale")),
                    ],
                ),
                "delete": operation(
                    "Delete your review",
                    TAG,
                    vec![id(), identity_header()],
                    None,
                    vec![
                        ("200", body("The book's new summary", schema_ref("DeletedReview"))),
                        ("404", error("Review not found or unauthorized")),
                        ("500", error("Review removed but the summary may be stale")),
                    ],
                )
            },
            "/{id}/helpful": {
                "post": operation(
                    "Mark a review as helpful",
                    TAG,
                    vec![id(), identity_header()],
                    None,
                    vec![
                        ("200", body("The review", schema_ref("Review"))),
                        ("404", error("Review not found")),
                    ],
                )
            }
        },
        "components": components(json!({
            "CreateReview": {
                "type": "object",
                "properties": {
                    "bookId": { "type": "string", "format": "uuid" },
                    "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "comment": { "type": "string", "minLength": 10, "maxLength": 1000 }
                },
                "required": ["bookId", "rating", "comment"]
            },
            "ReviewInput": {
                "type": "object",
                "properties": {
                    "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "comment": { "type": "string", "minLength": 10, "maxLength": 1000 }
                },
                "required": ["rating", "comment"]
            },
            "ReviewOutcome": {
                "type": "object",
                "properties": {
                    "review": schema_ref("Review"),
                    "bookRating": schema_ref("RatingSummary")
                },
                "required": ["review", "bookRating"]
            },
            "DeletedReview": {
                "type": "object",
                "properties": {
                    "reviewId": { "type": "string", "format": "uuid" },
                    "bookId": { "type": "string", "format": "uuid" },
                    "bookRating": schema_ref("RatingSummary")
                },
                "required": ["reviewId", "bookId", "bookRating"]
            }
        }))
    })
}

pub fn create_module(state: CatalogState) -> Arc<dyn Module> {
    Arc::new(ReviewsModule::new(state))
}
