//! Common test utilities for rust-sqlbrowse tests

#![allow(dead_code)]

use std::path::PathBuf;

use rust_sqlbrowse::catalog::snapshot::read_snapshot;
use rust_sqlbrowse::catalog::{CatalogSchema, CatalogTable};
use rust_sqlbrowse::query::Entity;
use rust_sqlbrowse::{BrowseOptions, CircularModel, ObjectName};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Failed to read fixture")
}

/// The shop catalog: customers, orders, order lines, products, employees and a view.
pub fn shop_catalog() -> CatalogSchema {
    read_snapshot(&fixture_path("shop_catalog.xml")).expect("Failed to load shop catalog")
}

pub fn shop_model() -> CircularModel {
    CircularModel::build(&shop_catalog(), &BrowseOptions::default()).expect("Failed to build model")
}

pub fn name(n: &str) -> ObjectName {
    ObjectName::new([n]).expect("valid name")
}

/// `customer(id pk, name)` and `order(id pk, customer_id fk -> customer.id)`.
pub fn customer_order_catalog() -> CatalogSchema {
    CatalogSchema::new(vec![
        CatalogTable::new(name("customer"))
            .column("id", "int", false)
            .column("name", "nvarchar", false)
            .primary_key("PK_customer", &["id"]),
        CatalogTable::new(name("order"))
            .column("id", "int", false)
            .column("customer_id", "int", false)
            .primary_key("PK_order", &["id"])
            .index("IX_order_customer", &["customer_id"])
            .foreign_key("FK_order_customer", &["customer_id"], name("customer"), "PK_customer"),
    ])
}

pub fn customer_order_model() -> CircularModel {
    CircularModel::build(&customer_order_catalog(), &BrowseOptions::default())
        .expect("Failed to build model")
}

/// `employee(id pk, name, manager_id fk -> employee.id)`.
pub fn employee_model() -> CircularModel {
    let catalog = CatalogSchema::new(vec![CatalogTable::new(name("employee"))
        .column("id", "int", false)
        .column("name", "nvarchar", false)
        .column("manager_id", "int", true)
        .primary_key("PK_employee", &["id"])
        .index("IX_employee_manager", &["manager_id"])
        .foreign_key("FK_manager", &["manager_id"], name("employee"), "PK_employee")]);
    CircularModel::build(&catalog, &BrowseOptions::default()).expect("Failed to build model")
}

/// Relation names of an entity tree, one line per list, indented by depth.
pub fn shape(entity: &Entity) -> Vec<String> {
    fn walk(entity: &Entity, depth: usize, out: &mut Vec<String>) {
        for related in &entity.related {
            out.push(format!("{}{} ({})", "  ".repeat(depth), related.name, related.alias));
            if let Some(first) = related.entities.first() {
                walk(first, depth + 1, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(entity, 0, &mut out);
    out
}

/// Serialize an entity tree the way the database would, one element per row named
/// after the alias it was selected under.
pub fn entity_to_xml(entity: &Entity) -> String {
    fn rows(entity: &Entity, out: &mut String) {
        for related in &entity.related {
            let tag = rust_sqlbrowse::names::encode_name(&related.alias);
            for row in &related.entities {
                out.push('<');
                out.push_str(&tag);
                for (column, value) in &row.values {
                    if let Some(value) = value {
                        out.push_str(&format!(
                            " {}=\"{}\"",
                            rust_sqlbrowse::names::encode_name(column),
                            value
                        ));
                    }
                }
                out.push('>');
                rows(row, out);
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
    let mut out = String::from("<root modify_date=\"2024-05-01T10:00:00.000\">");
    rows(entity, &mut out);
    out.push_str("</root>");
    out
}
