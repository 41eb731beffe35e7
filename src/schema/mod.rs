//! Schema building: read the live catalog and publish circular models
//!
//! [`SchemaBuilder`] runs the two catalog queries through an [`XmlSource`] and builds
//! a [`CircularModel`] from the result. [`ModelHandle`] shares the current model
//! between readers and swaps in a rebuilt one when the schema fingerprint changes.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use roxmltree::Document;
use tracing::{debug, info};

use crate::catalog::system::{
    catalog_from_results, foreign_keys_extent, system_model, tables_extent,
};
use crate::catalog::CatalogSchema;
use crate::extent::{Extent, Flavor, FlavorType};
use crate::model::CircularModel;
use crate::query::{get_sql, make_entities, FINGERPRINT_ATTRIBUTE};
use crate::BrowseOptions;

/// Runs one SQL statement and returns the single XML document it produces.
pub trait XmlSource {
    fn query_xml(&mut self, sql: &str) -> Result<String>;
}

impl<F> XmlSource for F
where
    F: FnMut(&str) -> Result<String>,
{
    fn query_xml(&mut self, sql: &str) -> Result<String> {
        self(sql)
    }
}

/// Reads user catalogs through the `sys.*` views.
pub struct SchemaBuilder {
    system: CircularModel,
    tables: Extent,
    foreign_keys: Extent,
    options: BrowseOptions,
}

impl SchemaBuilder {
    pub fn new(options: BrowseOptions) -> Result<Self> {
        let system = system_model().context("Failed to model the system catalog")?;
        let tables = tables_extent(&system)?;
        let foreign_keys = foreign_keys_extent(&system)?;
        Ok(Self {
            system,
            tables,
            foreign_keys,
            options,
        })
    }

    pub fn options(&self) -> &BrowseOptions {
        &self.options
    }

    /// The statement reading tables, views, columns and indexes.
    pub fn tables_sql(&self) -> Result<String> {
        Ok(get_sql(&self.system, &self.tables)?)
    }

    /// The statement reading foreign keys.
    pub fn foreign_keys_sql(&self) -> Result<String> {
        Ok(get_sql(&self.system, &self.foreign_keys)?)
    }

    /// The statement reading only the schema fingerprint.
    pub fn fingerprint_sql(&self) -> Result<String> {
        Ok(get_sql(
            &self.system,
            &Extent::root(Flavor::new(FlavorType::None, 0)),
        )?)
    }

    /// Current schema fingerprint: the latest `modify_date` in `sys.objects`.
    pub fn fingerprint(&self, source: &mut dyn XmlSource) -> Result<Option<String>> {
        let xml = source
            .query_xml(&self.fingerprint_sql()?)
            .context("Failed to query the schema fingerprint")?;
        let doc = Document::parse(&xml).context("Failed to parse the fingerprint result")?;
        Ok(doc
            .root_element()
            .attribute(FINGERPRINT_ATTRIBUTE)
            .map(str::to_string))
    }

    pub fn read_catalog(&self, source: &mut dyn XmlSource) -> Result<CatalogSchema> {
        let xml = source
            .query_xml(&self.tables_sql()?)
            .context("Failed to query tables")?;
        let tables = make_entities(&self.system, &self.tables, &xml)?;

        let xml = source
            .query_xml(&self.foreign_keys_sql()?)
            .context("Failed to query foreign keys")?;
        let foreign_keys = make_entities(&self.system, &self.foreign_keys, &xml)?;

        Ok(catalog_from_results(&tables, &foreign_keys)?)
    }

    pub fn build(&self, source: &mut dyn XmlSource) -> Result<CircularModel> {
        let catalog = self.read_catalog(source)?;
        let model = CircularModel::build(&catalog, &self.options)?;
        info!(
            tables = model.tables().count(),
            fingerprint = model.fingerprint().unwrap_or(""),
            "built schema model"
        );
        Ok(model)
    }
}

/// Shares the current model and replaces it when the schema changes.
///
/// Readers get an `Arc` snapshot and keep using it for as long as they like; a
/// refresh builds the new model without holding the read lock and publishes it in a
/// single swap. Only one refresh runs at a time.
pub struct ModelHandle {
    current: RwLock<Arc<CircularModel>>,
    writer: Mutex<()>,
}

impl ModelHandle {
    pub fn new(model: CircularModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
            writer: Mutex::new(()),
        }
    }

    pub fn current(&self) -> Arc<CircularModel> {
        Arc::clone(&self.current.read())
    }

    /// Publish a model unconditionally.
    pub fn replace(&self, model: CircularModel) {
        let _writer = self.writer.lock();
        *self.current.write() = Arc::new(model);
    }

    /// Rebuild when the fingerprint moved. Returns whether a new model was published.
    pub fn refresh(&self, builder: &SchemaBuilder, source: &mut dyn XmlSource) -> Result<bool> {
        let _writer = self.writer.lock();

        let fingerprint = builder.fingerprint(source)?;
        if !self.current().is_stale(fingerprint.as_deref()) {
            debug!("schema unchanged");
            return Ok(false);
        }

        let model = builder.build(source)?;
        *self.current.write() = Arc::new(model);
        info!(fingerprint = fingerprint.as_deref().unwrap_or(""), "published new schema model");
        Ok(true)
    }
}
