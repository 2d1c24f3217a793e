//! HTTP-facing modules of the catalog.
//!
//! Each module owns a slice of the API under `/api/{name}` and shares one
//! [`CatalogState`].

pub mod books;
pub mod docs;
pub mod reviews;
pub mod search;

use std::sync::Arc;

use axum::extract::FromRef;
use serde::Deserialize;

use bookshelf_authz::IdentityHeaders;
use bookshelf_http::error::AppError;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

use crate::catalog::{BookId, CatalogService, ReviewId};

/// Router state shared by every catalog module
#[derive(Clone)]
pub struct CatalogState {
    pub catalog: Arc<CatalogService>,
    pub identity: IdentityHeaders,
}

impl CatalogState {
    pub fn new(catalog: Arc<CatalogService>, settings: &Settings) -> Self {
        Self {
            catalog,
            identity: IdentityHeaders::from(&settings.auth),
        }
    }
}

impl FromRef<CatalogState> for IdentityHeaders {
    fn from_ref(state: &CatalogState) -> Self {
        state.identity.clone()
    }
}

/// `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Ids that do not parse cannot name an existing record
pub(crate) fn parse_book_id(raw: &str) -> Result<BookId, AppError> {
    raw.parse()
        .map_err(|_| AppError::not_found("Book not found"))
}

pub(crate) fn parse_review_id(raw: &str) -> Result<ReviewId, AppError> {
    raw.parse()
        .map_err(|_| AppError::not_found("Review not found"))
}

/// Register all catalog modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, state: CatalogState) -> anyhow::Result<()> {
    registry.register(books::create_module(state.clone()))?;
    registry.register(reviews::create_module(state.clone()))?;
    registry.register(search::create_module(state))?;
    Ok(())
}
