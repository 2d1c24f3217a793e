use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use bookshelf_http::error::AppError;
use bookshelf_kernel::Module;

use super::docs::{
    body, components, error, health, operation, page_of, paging_params, query_param, schema_ref,
};
use super::CatalogState;
use crate::catalog::{AdvancedSearchQuery, Book, SearchQuery, SuggestionQuery, Suggestions};
use crate::utils::Page;

const TAG: &str = "Search";

/// Substring search over the catalog
pub struct SearchModule {
    state: CatalogState,
}

impl SearchModule {
    pub fn new(state: CatalogState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for SearchModule {
    fn name(&self) -> &'static str {
        "search"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(search))
            .route("/advanced", get(advanced_search))
            .route("/suggestions", get(suggestions))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<Value> {
        let mut simple = vec![query_param("q", "string", "Title or author substring")];
        simple.extend(paging_params());

        let mut advanced = vec![
            query_param("title", "string", "Title substring"),
            query_param("author", "string", "Author substring"),
            query_param("genre", "string", "Genre substring"),
            query_param("language", "string", "Language substring"),
            query_param("minRating", "number", "Lowest average rating, 0 to 5"),
            query_param("maxRating", "number", "Highest average rating, 0 to 5"),
            query_param("sortBy", "string", "createdAt, averageRating, title or author"),
            query_param("sortOrder", "string", "asc or desc (default desc)"),
        ];
        advanced.extend(paging_params());

        Some(json!({
            "paths": {
                "/": {
                    "get": operation(
                        "Search books by title or author",
                        TAG,
                        simple,
                        None,
                        vec![
                            ("200", body("Matches, best rated first", page_of("Book"))),
                            ("422", error("Missing query")),
                        ],
                    )
                },
                "/advanced": {
                    "get": operation(
                        "Search books by several fields",
                        TAG,
                        advanced,
                        None,
                        vec![
                            ("200", body("Matches", page_of("Book"))),
                            ("422", error("Invalid rating bounds or paging")),
                        ],
                    )
                },
                "/suggestions": {
                    "get": operation(
                        "Title and author suggestions for partial input",
                        TAG,
                        vec![query_param("q", "string", "Partial input, at least 2 characters")],
                        None,
                        vec![("200", body("Up to 10 suggestions", schema_ref("Suggestions")))],
                    )
                },
                "/health": health(TAG)
            },
            "components": components(json!({
                "Suggestions": {
                    "type": "object",
                    "properties": {
                        "suggestions": {
                            "type": "array",
                            "maxItems": 10,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": { "type": "string", "enum": ["title", "author"] },
                                    "value": { "type": "string" }
                                },
                                "required": ["type", "value"]
                            }
                        }
                    },
                    "required": ["suggestions"]
                }
            }))
        }))
    }
}

async fn health_check() -> &'static str {
    "search module is healthy"
}

async fn search(
    State(state): State<CatalogState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.catalog.search_books(&query).await?))
}

async fn advanced_search(
    State(state): State<CatalogState>,
    query: Result<Query<AdvancedSearchQuery>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.catalog.advanced_search(&query).await?))
}

async fn suggestions(
    State(state): State<CatalogState>,
    query: Result<Query<SuggestionQuery>, QueryRejection>,
) -> Result<Json<Suggestions>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.catalog.search_suggestions(&query).await?))
}

pub fn create_module(state: CatalogState) -> Arc<dyn Module> {
    Arc::new(SearchModule::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BookInput, CatalogService};
    use axum::{body::Body, http::Request, http::StatusCode};
    use bookshelf_authz::Actor;
    use bookshelf_kernel::settings::Settings;
    use chrono::NaiveDate;
    use tower::ServiceExt;

    async fn router() -> Router {
        let catalog = Arc::new(CatalogService::in_memory());
        for (title, author) in [("Ficciones", "Jorge Luis Borges"), ("Labyrinths", "Jorge Luis Borges")] {
            catalog
                .create_book(
                    &Actor::user("creator"),
                    BookInput {
                        title: title.to_string(),
                        author: author.to_string(),
                        genre: "Short Stories".to_string(),
                        description: "Forking paths and infinite libraries".to_string(),
                        published_date: NaiveDate::from_ymd_opt(1944, 1, 1).unwrap(),
                        language: Some("Spanish".to_string()),
                        ..BookInput::default()
                    },
                )
                .await
                .unwrap();
        }
        SearchModule::new(CatalogState::new(catalog, &Settings::default())).routes()
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn simple_search_matches_author() {
        let (status, body) = get(router().await, "/?q=borges").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["totalItems"], 2);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (status, body) = get(router().await, "/?q=%20").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "q");
    }

    #[tokio::test]
    async fn advanced_search_filters_by_title_and_language() {
        let (status, body) =
            get(router().await, "/advanced?title=ficc&language=spanish").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["title"], "Ficciones");
        assert_eq!(body["pagination"]["totalItems"], 1);
    }

    #[tokio::test]
    async fn inverted_rating_bounds_are_rejected() {
        let (status, _) = get(router().await, "/advanced?minRating=4&maxRating=1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn suggestions_list_titles_and_authors() {
        let (status, body) = get(router().await, "/suggestions?q=jorge").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["suggestions"],
            json!([{ "type": "author", "value": "Jorge Luis Borges" }])
        );

        let (status, body) = get(router().await, "/suggestions?q=f").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"], json!([]));
    }
}
