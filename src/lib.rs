//! Bookshelf application library
//!
//! A book catalog whose per-book rating summaries are derived from reviews.
//! The catalog core lives in [`catalog`]; [`modules`] exposes it over HTTP.

pub mod catalog;
pub mod modules;
pub mod utils;

use std::future::Future;
use std::sync::Arc;

use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub use catalog::CatalogService;
use modules::CatalogState;

/// Registry with every catalog module registered against a service on the
/// configured database
pub async fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let catalog = Arc::new(CatalogService::open(settings).await?);
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, CatalogState::new(catalog, settings))?;
    Ok(registry)
}

/// Initialize and start all modules, serve until `shutdown` resolves, then
/// stop the modules in reverse order
pub async fn run<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = build_registry(&settings).await?;
    let ctx = InitCtx::new(&settings);

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;
    tracing::info!(modules = registry.len(), "bookshelf started");

    let served = bookshelf_http::start_server(&registry, &settings, shutdown).await;
    let stopped = registry.stop_all().await;

    served?;
    stopped
}
