//! rust-sqlbrowse: browse a SQL Server database through its relation graph
//!
//! This library infers a navigable graph of tables and relations from catalog
//! metadata and compiles navigation requests into a single nested `for xml` query
//! whose result is read back as a tree of entities.
//!
//! The pipeline:
//!
//! 1. a [`CatalogSchema`] is read from the live `sys.*` views ([`schema::SchemaBuilder`])
//!    or from a snapshot file ([`catalog::snapshot`]);
//! 2. a [`CircularModel`] is built from it;
//! 3. an [`ExtentFactory`] expands a request into a bounded [`Extent`] tree;
//! 4. [`query::get_sql`] compiles the tree and [`query::make_entities`] reads the
//!    result back.

pub mod catalog;
pub mod error;
pub mod extent;
pub mod model;
pub mod names;
pub mod query;
pub mod schema;
pub mod types;
pub(crate) mod util;

pub use catalog::CatalogSchema;
pub use error::BrowseError;
pub use extent::{Extent, ExtentFactory, ExtentRequest, Flavor, FlavorType};
pub use model::CircularModel;
pub use names::ObjectName;
pub use query::{Entity, QueryResult, RelatedEntities};

/// Settings a caller chooses once per model.
#[derive(Debug, Clone)]
pub struct BrowseOptions {
    /// Leave views out of the model.
    pub exclude_views: bool,
    /// Row limit for flavors without a fixed one.
    pub default_limit: Option<usize>,
    /// Flavor of each table in the root overview.
    pub top_flavor: Flavor,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            exclude_views: false,
            default_limit: None,
            top_flavor: Flavor::new(FlavorType::Existence, 0),
        }
    }
}

/// Compile the request for one table.
pub fn compile_request(
    model: &CircularModel,
    options: &BrowseOptions,
    request: &ExtentRequest,
) -> anyhow::Result<(Extent, String)> {
    let extent = ExtentFactory::new(model, options).create_root_extent(request)?;
    let sql = query::get_sql(model, &extent)?;
    Ok((extent, sql))
}

/// Compile the overview of all tables at the configured top flavor.
pub fn compile_overview(
    model: &CircularModel,
    options: &BrowseOptions,
) -> anyhow::Result<(Extent, String)> {
    let extent = ExtentFactory::new(model, options).create_extent_for_root(options.top_flavor)?;
    let sql = query::get_sql(model, &extent)?;
    Ok((extent, sql))
}
