//! Catalog introspection
//!
//! [`CatalogProbe`] is the engine's only window onto the live database
//! catalog. The engine holds it as a capability, so tests can swap in a fake.

#[cfg(feature = "hana")]
mod hana;

use async_trait::async_trait;

#[cfg(feature = "hana")]
pub use hana::HanaCatalogProbe;

use crate::Result;
use crate::descriptor::TableDescriptor;
use crate::identity::TableIdentity;

/// Reads table metadata from a live database catalog
#[async_trait]
pub trait CatalogProbe: Send + Sync {
    /// Table names in `schema`, or in the current schema when `None`,
    /// in the catalog's listing order.
    async fn list_table_names(&self, schema: Option<&str>) -> Result<Vec<String>>;

    /// Columns and constraints of one table; `Ok(None)` when the catalog
    /// reports no columns for it.
    async fn describe_table(&self, table: &TableIdentity) -> Result<Option<TableDescriptor>>;
}
