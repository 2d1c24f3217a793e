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
    path_param, query_param, request_body, schema_ref,
};
use super::CatalogState;

const TAG: &str = "Books";

/// Book catalog: CRUD, cascading delete and rating reconciliation
pub struct BooksModule {
    state: CatalogState,
}

impl BooksModule {
    pub fn new(state: CatalogState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            default_page_size = ctx.settings.catalog.default_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::list_books).post(routes::create_book))
            .route("/health", get(health_check))
            .route(
                "/{id}",
                get(routes::get_book)
                    .put(routes::update_book)
                    .delete(routes::delete_book),
            )
            .route("/{id}/reconcile", post(routes::reconcile_book))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    /// Summaries left stale by an earlier failure are repaired before the
    /// server takes traffic
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let report = self
            .state
            .catalog
            .reconcile_all()
            .await
            .map_err(|err| anyhow::anyhow!("startup reconciliation failed: {}", err))?;
        tracing::info!(
            module = self.name(),
            scanned = report.scanned,
            corrected = report.corrected,
            "books module started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            in_flight = self.state.catalog.books_in_flight(),
            "books module stopped"
        );
        Ok(())
    }
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

fn openapi_fragment() -> Value {
    let id = || path_param("id", "Book id");
    let mut list_params = paging_params();
    list_params.extend([
        query_param("author", "string", "Case-insensitive author substring"),
        query_param("genre", "string", "Case-insensitive genre substring"),
        query_param("sortBy", "string", "createdAt, averageRating, title or author"),
        query_param("sortOrder", "string", "asc or desc (default desc)"),
    ]);
    let mut get_params = vec![id()];
    get_params.extend(paging_params());

    json!({
        "paths": {
            "/": {
                "get": operation(
                    "List books",
                    TAG,
                    list_params,
                    None,
                    vec![
                        ("200", body("One page of books", page_of("Book"))),
                        ("422", error("Invalid paging or sort parameters")),
                    ],
                ),
                "post": operation(
                    "Create a book",
                    TAG,
                    vec![identity_header()],
                    Some(request_body("BookInput")),
                    vec![
                        ("201", body("Created book", schema_ref("Book"))),
                        ("401", error("Missing caller identity")),
                        ("409", error("ISBN already in use")),
                        ("422", error("Invalid book fields")),
                    ],
                )
            },
            "/health": health(TAG),
            "/{id}": {
                "get": operation(
                    "Get a book with a page of its reviews",
                    TAG,
                    get_params,
                    None,
                    vec![
                        ("200", body("Book and reviews", schema_ref("BookWithReviews"))),
                        ("404", error("Book not found")),
                    ],
                ),
                "put": operation(
                    "Update a book's details",
                    TAG,
                    vec![id(), identity_header()],
                    Some(request_body("BookInput")),
                    vec![
                        ("200", body("Updated book", schema_ref("Book"))),
                        ("403", error("Caller did not create the book")),
                        ("404", error("Book not found")),
                        ("409", error("ISBN already in use")),
                        ("422", error("Invalid book fields")),
                    ],
                ),
                "delete": operation(
                    "Delete a book and all of its reviews",
                    TAG,
                    vec![id(), identity_header()],
                    None,
                    vec![
                        ("200", body("Cascade report", schema_ref("CascadeReport"))),
                        ("403", error("Caller did not create the book")),
                        ("404", error("Book not found")),
                        ("500", error("Cascade failed part way; reconcile the book")),
                    ],
                )
            },
            "/{id}/reconcile": {
                "post": operation(
                    "Recompute a book's rating summary",
                    TAG,
                    vec![id(), identity_header()],
                    None,
                    vec![
                        ("200", body("Summary before and after", schema_ref("ReconcileOutcome"))),
                        ("403", error("Administrator role required")),
                        ("404", error("Book not found")),
                    ],
                )
            }
        },
        "components": components(json!({
            "BookInput": {
                "type": "object",
                "properties": {
                    "title": { "type": "string", "maxLength": 200 },
                    "author": { "type": "string", "maxLength": 100 },
                    "genre": { "type": "string", "maxLength": 50 },
                    "description": { "type": "string", "maxLength": 2000 },
                    "publishedDate": { "type": "string", "format": "date" },
                    "isbn": { "type": "string" },
                    "pageCount": { "type": "integer", "minimum": 1 },
                    "language": { "type": "string" }
                },
                "required": ["title", "author", "genre", "description", "publishedDate"]
            },
            "BookWithReviews": {
                "type": "object",
                "properties": {
                    "book": schema_ref("Book"),
                    "reviews": page_of("Review")
                },
                "required": ["book", "reviews"]
            },
            "CascadeReport": {
                "type": "object",
                "properties": {
                    "bookId": { "type": "string", "format": "uuid" },
                    "reviewsRemoved": { "type": "integer" }
                },
                "required": ["bookId", "reviewsRemoved"]
            },
            "ReconcileOutcome": {
                "type": "object",
                "properties": {
                    "bookId": { "type": "string", "format": "uuid" },
                    "before": schema_ref("RatingSummary"),
                    "after": schema_ref("RatingSummary"),
                    "changed": { "type": "boolean" }
                },
                "required": ["bookId", "before", "after", "changed"]
            }
        }))
    })
}

/// Create a new instance of the books module
pub fn create_module(state: CatalogState) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(state))
}
