//! The live `sys.*` catalog as a catalog source
//!
//! The catalog views are themselves described as a [`CatalogSchema`]
//! ([`system_catalog`]), so they can be modeled and queried with the same extent
//! machinery as user tables. Two extent trees read everything a user catalog needs:
//!
//! - [`tables_extent`]: schemas, their tables (`t`) and views (`v`), with columns and
//!   indexes with index columns;
//! - [`foreign_keys_extent`]: foreign keys with their column pairs, referenced table
//!   (and its schema) and referenced key index.
//!
//! [`catalog_from_results`] turns both materialized results into a user catalog.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{BrowseError, Result};
use crate::extent::{Extent, ExtentFactory, Flavor, FlavorType, OrderColumn, Selectable};
use crate::model::CircularModel;
use crate::names::ObjectName;
use crate::query::{Entity, QueryResult};
use crate::BrowseOptions;

use super::{
    CatalogColumn, CatalogForeignKey, CatalogKeyColumn, CatalogKeyish, CatalogSchema,
    CatalogTable, IndexDirection, UnsupportedReason, UnsupportedTag,
};

fn sys(name: &str) -> Result<ObjectName> {
    ObjectName::qualified("sys", name)
}

/// The catalog views the schema reader queries, with the keys and foreign keys that
/// connect them.
pub fn system_catalog() -> Result<CatalogSchema> {
    Ok(CatalogSchema::new(vec![
        CatalogTable::new(sys("schemas")?)
            .column("schema_id", "int", false)
            .column("name", "sysname", false)
            .primary_key("PK_schemas", &["schema_id"]),
        CatalogTable::new(sys("objects")?)
            .column("object_id", "int", false)
            .column("name", "sysname", false)
            .column("schema_id", "int", false)
            .column("type", "char", false)
            .column("modify_date", "datetime", false)
            .primary_key("PK_objects", &["object_id"])
            .foreign_key("objects_schema", &["schema_id"], sys("schemas")?, "PK_schemas"),
        CatalogTable::new(sys("columns")?)
            .column("object_id", "int", false)
            .column("column_id", "int", false)
            .column("name", "sysname", true)
            .column("system_type_id", "tinyint", false)
            .column("user_type_id", "int", false)
            .column("is_nullable", "bit", true)
            .primary_key("PK_columns", &["object_id", "column_id"])
            .foreign_key("columns_object", &["object_id"], sys("objects")?, "PK_objects"),
        CatalogTable::new(sys("indexes")?)
            .column("object_id", "int", false)
            .column("index_id", "int", false)
            .column("name", "sysname", true)
            .column("type", "tinyint", false)
            .column("is_unique", "bit", true)
            .column("is_primary_key", "bit", true)
            .column("is_disabled", "bit", true)
            .column("has_filter", "bit", true)
            .column("is_hypothetical", "bit", true)
            .primary_key("PK_indexes", &["object_id", "index_id"])
            .foreign_key("indexes_object", &["object_id"], sys("objects")?, "PK_objects"),
        CatalogTable::new(sys("index_columns")?)
            .column("object_id", "int", false)
            .column("index_id", "int", false)
            .column("index_column_id", "int", false)
            .column("column_id", "int", false)
            .column("key_ordinal", "tinyint", false)
            .column("is_descending_key", "bit", true)
            .column("is_included_column", "bit", true)
            .primary_key("PK_index_columns", &["object_id", "index_id", "index_column_id"])
            .foreign_key(
                "index_columns_index",
                &["object_id", "index_id"],
                sys("indexes")?,
                "PK_indexes",
            ),
        CatalogTable::new(sys("foreign_keys")?)
            .column("object_id", "int", false)
            .column("name", "sysname", false)
            .column("parent_object_id", "int", false)
            .column("referenced_object_id", "int", true)
            .column("key_index_id", "int", true)
            .primary_key("PK_foreign_keys", &["object_id"])
            .foreign_key("foreign_keys_parent", &["parent_object_id"], sys("objects")?, "PK_objects")
            .foreign_key(
                "foreign_keys_referenced",
                &["referenced_object_id"],
                sys("objects")?,
                "PK_objects",
            )
            .foreign_key(
                "foreign_keys_key_index",
                &["referenced_object_id", "key_index_id"],
                sys("indexes")?,
                "PK_indexes",
            ),
        CatalogTable::new(sys("foreign_key_columns")?)
            .column("constraint_object_id", "int", false)
            .column("constraint_column_id", "int", false)
            .column("parent_object_id", "int", false)
            .column("parent_column_id", "int", false)
            .column("referenced_object_id", "int", false)
            .column("referenced_column_id", "int", false)
            .primary_key(
                "PK_foreign_key_columns",
                &["constraint_object_id", "constraint_column_id"],
            )
            .foreign_key(
                "foreign_key_columns_fk",
                &["constraint_object_id"],
                sys("foreign_keys")?,
                "PK_foreign_keys",
            )
            .foreign_key(
                "foreign_key_columns_parent_column",
                &["parent_object_id", "parent_column_id"],
                sys("columns")?,
                "PK_columns",
            ),
    ]))
}

/// Model of the system catalog.
pub fn system_model() -> Result<CircularModel> {
    CircularModel::build(&system_catalog()?, &BrowseOptions::default())
}

fn flavor() -> Flavor {
    Flavor::new(FlavorType::Table, 0)
}

/// Schemas with their tables and views, columns, indexes and index columns.
pub fn tables_extent(model: &CircularModel) -> Result<Extent> {
    let factory = ExtentFactory::new(model, &BrowseOptions::default());
    let objects = model.require_table("sys.objects")?.id;
    let indexes = model.require_table("sys.indexes")?.id;
    let schemas = model.require_table("sys.schemas")?.id;

    let columns = factory
        .plain_extent(objects, "P_columns_object")?
        .with_alias("c")
        .with_columns(["column_id", "name", "is_nullable"])
        .with_order(vec![OrderColumn::ascending("column_id")])
        .with_selectable(Selectable::new(
            "type_name",
            "coalesce(type_name({alias}.[system_type_id]), type_name({alias}.[user_type_id]))",
        ));
    let index_columns = factory
        .plain_extent(indexes, "P_index_columns_index")?
        .with_alias("ic")
        .with_columns([
            "column_id",
            "key_ordinal",
            "is_descending_key",
            "is_included_column",
        ])
        .with_order(vec![
            OrderColumn::ascending("key_ordinal"),
            OrderColumn::ascending("index_column_id"),
        ]);
    let index_list = factory
        .plain_extent(objects, "P_indexes_object")?
        .with_alias("i")
        .with_columns([
            "index_id",
            "name",
            "type",
            "is_unique",
            "is_primary_key",
            "is_disabled",
            "has_filter",
            "is_hypothetical",
        ])
        .with_order(vec![OrderColumn::ascending("index_id")])
        .with_child(index_columns);

    let objects_of_type = |alias: &str, type_code: &str| -> Result<Extent> {
        Ok(factory
            .plain_extent(schemas, "P_objects_schema")?
            .with_alias(alias)
            .with_columns(["object_id", "name"])
            .with_order(vec![
                OrderColumn::ascending("type"),
                OrderColumn::ascending("name"),
            ])
            .with_values(vec![Some(type_code.to_string())], 1)
            .with_child(columns.clone())
            .with_child(index_list.clone()))
    };

    let schema_list = factory
        .plain_extent(model.root_id(), "sys.schemas")?
        .with_alias("s")
        .with_columns(["schema_id", "name"])
        .with_child(objects_of_type("t", "U")?)
        .with_child(objects_of_type("v", "V")?);

    Ok(Extent::root(flavor()).with_child(schema_list))
}

/// Foreign keys with their columns, referenced table and referenced key.
pub fn foreign_keys_extent(model: &CircularModel) -> Result<Extent> {
    let factory = ExtentFactory::new(model, &BrowseOptions::default());
    let foreign_keys = model.require_table("sys.foreign_keys")?.id;
    let objects = model.require_table("sys.objects")?.id;

    let key_columns = factory
        .plain_extent(foreign_keys, "P_foreign_key_columns_fk")?
        .with_alias("fc")
        .with_columns(["constraint_column_id", "parent_column_id", "referenced_column_id"])
        .with_order(vec![OrderColumn::ascending("constraint_column_id")]);
    let referenced_schema = factory
        .plain_extent(objects, "D_objects_schema")?
        .with_alias("rs")
        .with_columns(["name"]);
    let referenced_table = factory
        .plain_extent(foreign_keys, "D_foreign_keys_referenced")?
        .with_alias("rt")
        .with_columns(["object_id", "name"])
        .with_child(referenced_schema);
    let referenced_key = factory
        .plain_extent(foreign_keys, "D_foreign_keys_key_index")?
        .with_alias("ri")
        .with_columns(["index_id", "name"]);

    let list = factory
        .plain_extent(model.root_id(), "sys.foreign_keys")?
        .with_alias("f")
        .with_columns([
            "object_id",
            "name",
            "parent_object_id",
            "referenced_object_id",
            "key_index_id",
        ])
        .with_child(key_columns)
        .with_child(referenced_table)
        .with_child(referenced_key);

    Ok(Extent::root(flavor()).with_child(list))
}

/// What the foreign key pass needs to know about a table read in the first pass.
struct TableInfo {
    table: CatalogTable,
    column_names: HashMap<String, String>,
    /// Key column names by index id.
    index_keys: HashMap<String, Vec<String>>,
}

/// Turn the materialized results of [`tables_extent`] and [`foreign_keys_extent`]
/// into a user catalog.
pub fn catalog_from_results(
    tables: &QueryResult,
    foreign_keys: &QueryResult,
) -> Result<CatalogSchema> {
    let mut infos: Vec<TableInfo> = Vec::new();
    let mut by_object_id: HashMap<String, usize> = HashMap::new();

    for schema in tables.entities("sys.schemas") {
        let schema_name = required(schema, "name")?;
        for list in &schema.related {
            let is_view = list.alias == "v";
            for object in &list.entities {
                let object_id = required(object, "object_id")?.to_string();
                let info = read_table(schema_name, object, is_view)?;
                by_object_id.insert(object_id, infos.len());
                infos.push(info);
            }
        }
    }

    for fk in foreign_keys.entities("sys.foreign_keys") {
        let name = required(fk, "name")?;
        let parent_id = required(fk, "parent_object_id")?;
        let referenced_id = required(fk, "referenced_object_id")?;
        let (Some(&parent), Some(&referenced)) =
            (by_object_id.get(parent_id), by_object_id.get(referenced_id))
        else {
            warn!(foreign_key = name, "skipping foreign key between tables that weren't read");
            continue;
        };

        let referenced_table = fk
            .related("D_foreign_keys_referenced")
            .and_then(|r| r.entities.first())
            .ok_or_else(|| unexpected(format!("foreign key {} has no referenced table", name)))?;
        let referenced_schema = referenced_table
            .related("D_objects_schema")
            .and_then(|r| r.entities.first())
            .ok_or_else(|| unexpected(format!("foreign key {} has no referenced schema", name)))?;
        let referenced_key = fk
            .related("D_foreign_keys_key_index")
            .and_then(|r| r.entities.first())
            .ok_or_else(|| unexpected(format!("foreign key {} has no referenced key", name)))?;

        let target = &infos[referenced];
        let key_index_id = required(fk, "key_index_id")?;
        let key_columns = target.index_keys.get(key_index_id).cloned().unwrap_or_default();

        let mut pairs = Vec::new();
        for column in fk
            .related("P_foreign_key_columns_fk")
            .map(|r| r.entities.as_slice())
            .unwrap_or_default()
        {
            let parent_column = column_name(&infos[parent], required(column, "parent_column_id")?)?;
            let referenced_column =
                column_name(target, required(column, "referenced_column_id")?)?;
            pairs.push((parent_column, referenced_column));
        }
        pairs.sort_by_key(|(_, referenced_column)| {
            key_columns
                .iter()
                .position(|k| k == referenced_column)
                .unwrap_or(usize::MAX)
        });

        let foreign_key = CatalogForeignKey {
            name: name.to_string(),
            columns: pairs.into_iter().map(|(parent, _)| parent).collect(),
            referenced_table: ObjectName::qualified(
                required(referenced_schema, "name")?,
                required(referenced_table, "name")?,
            )?,
            referenced_key: required(referenced_key, "name")?.to_string(),
        };
        infos[parent].table.foreign_keys.push(foreign_key);
    }

    let catalog = CatalogSchema {
        tables: infos.into_iter().map(|i| i.table).collect(),
        fingerprint: tables.fingerprint.clone(),
    };
    debug!(tables = catalog.tables.len(), "read catalog from sys views");
    Ok(catalog)
}

fn read_table(schema: &str, object: &Entity, is_view: bool) -> Result<TableInfo> {
    let mut table = CatalogTable::new(ObjectName::qualified(schema, required(object, "name")?)?);
    table.is_view = is_view;
    let mut column_names = HashMap::new();

    for column in related(object, "P_columns_object") {
        let name = required(column, "name")?.to_string();
        column_names.insert(required(column, "column_id")?.to_string(), name.clone());
        table.columns.push(CatalogColumn {
            name,
            type_name: column.value("type_name").unwrap_or_default().to_string(),
            is_nullable: flag(column, "is_nullable"),
        });
    }

    let mut index_keys = HashMap::new();
    'indexes: for index in related(object, "P_indexes_object") {
        // Heaps have no name.
        let Some(name) = index.value("name") else {
            continue;
        };

        let mut columns = Vec::new();
        for index_column in related(index, "P_index_columns_index") {
            if flag(index_column, "is_included_column") {
                continue;
            }
            let column_id = required(index_column, "column_id")?;
            let Some(column) = column_names.get(column_id) else {
                warn!(table = %table.name, index = name, column_id, "skipping index over an unknown column");
                continue 'indexes;
            };
            columns.push(CatalogKeyColumn {
                name: column.clone(),
                direction: IndexDirection::from_descending_flag(flag(
                    index_column,
                    "is_descending_key",
                )),
            });
        }

        index_keys.insert(
            required(index, "index_id")?.to_string(),
            columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
        );
        table.keyishes.push(CatalogKeyish {
            name: name.to_string(),
            is_unique: flag(index, "is_unique"),
            is_primary: flag(index, "is_primary_key"),
            columns,
            unsupported: unsupported_reason(index),
        });
    }

    Ok(TableInfo {
        table,
        column_names,
        index_keys,
    })
}

fn unsupported_reason(index: &Entity) -> Option<UnsupportedReason> {
    if flag(index, "is_disabled") {
        return Some(UnsupportedReason::new(UnsupportedTag::Disabled, "index is disabled"));
    }
    if flag(index, "has_filter") {
        return Some(UnsupportedReason::new(UnsupportedTag::Filtered, "index has a filter"));
    }
    if flag(index, "is_hypothetical") {
        return Some(UnsupportedReason::new(
            UnsupportedTag::Hypothetical,
            "index is hypothetical",
        ));
    }
    // 1 = clustered, 2 = nonclustered; everything else isn't a b-tree.
    match index.value("type") {
        Some("1") | Some("2") => None,
        other => Some(UnsupportedReason::new(
            UnsupportedTag::NotBTree,
            format!("index type {}", other.unwrap_or("?")),
        )),
    }
}

fn related<'e>(entity: &'e Entity, name: &str) -> &'e [Entity] {
    entity
        .related(name)
        .map(|r| r.entities.as_slice())
        .unwrap_or_default()
}

fn column_name(info: &TableInfo, column_id: &str) -> Result<String> {
    info.column_names
        .get(column_id)
        .cloned()
        .ok_or_else(|| BrowseError::UnresolvedColumn {
            table: info.table.name.simple().to_string(),
            column: format!("#{}", column_id),
        })
}

fn required<'e>(entity: &'e Entity, column: &str) -> Result<&'e str> {
    entity
        .value(column)
        .ok_or_else(|| unexpected(format!("missing value for {}", column)))
}

fn flag(entity: &Entity, column: &str) -> bool {
    matches!(entity.value(column), Some("1") | Some("true"))
}

fn unexpected(message: String) -> BrowseError {
    BrowseError::UnexpectedResult { message }
}
