use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// Context provided to modules during initialization and start-up
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

impl<'a> InitCtx<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

/// Unit of functionality mounted into the bookshelf server.
///
/// A module owns a slice of the HTTP surface (mounted under
/// `/api/{name}`), an OpenAPI fragment describing it, and lifecycle hooks
/// driven by the [`ModuleRegistry`](crate::ModuleRegistry).
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name, also used as the mount path segment
    fn name(&self) -> &'static str;

    /// Called once during start-up, in registration order
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Axum router for this module's routes, with state already applied
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) for this module.
    /// Paths are relative to the module mount point.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called after every module has been initialized
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, in reverse registration order
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
