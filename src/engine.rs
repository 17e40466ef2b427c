//! Process-level context owning the `BufferPool` and `Catalog`.
//!
//! Bundled into one `Engine` and passed explicitly to whatever needs
//! them (operators, `TableStats`, the CLI), rather than reached through
//! module-level statics or a singleton.

use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config;
use crate::error::DbResult;

pub struct Engine {
    catalog: Arc<Catalog>,
    buffer_pool: BufferPool,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_capacity(config::buffer_pool_default_pages())
    }

    pub fn with_capacity(max_pages: usize) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = BufferPool::new(Arc::clone(&catalog), max_pages);
        Engine {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// Convenience: load a catalog text file into this engine's catalog.
    pub fn load_schema(&self, catalog_path: &Path) -> DbResult<()> {
        self.catalog.load_schema(catalog_path)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
