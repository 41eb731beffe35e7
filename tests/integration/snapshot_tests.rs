//! Catalog snapshot file tests

use rust_sqlbrowse::catalog::snapshot::{parse_snapshot, read_snapshot, to_xml_string, write_snapshot};
use rust_sqlbrowse::catalog::{IndexDirection, UnsupportedTag};
use rust_sqlbrowse::{BrowseError, BrowseOptions, CircularModel};

use crate::common::{fixture_path, name, shop_catalog};

#[test]
fn test_load_shop_snapshot() {
    let catalog = shop_catalog();
    assert_eq!(catalog.fingerprint.as_deref(), Some("2024-05-01T10:00:00.000"));
    assert_eq!(catalog.tables.len(), 6);

    let order = catalog
        .table(&rust_sqlbrowse::ObjectName::new(["dbo", "order"]).unwrap())
        .unwrap();
    assert_eq!(order.columns.len(), 4);
    let index = order
        .keyishes
        .iter()
        .find(|k| k.name == "IX_order_customer")
        .unwrap();
    assert_eq!(index.columns[1].direction, IndexDirection::Descending);
    assert_eq!(order.foreign_keys[0].referenced_key, "PK_customer");
    assert_eq!(order.foreign_keys[0].referenced_table.simple(), "dbo.customer");

    let product = catalog.tables.iter().find(|t| t.name.name() == "product").unwrap();
    let manual = product
        .keyishes
        .iter()
        .find(|k| k.name == "IX_product_manual")
        .unwrap();
    assert_eq!(manual.unsupported.as_ref().map(|r| r.tag), Some(UnsupportedTag::NotBTree));

    assert!(catalog.tables.iter().any(|t| t.is_view));
    assert!(catalog.table(&name("order")).is_none());
}

#[test]
fn test_rewritten_snapshot_is_stable() {
    let catalog = shop_catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.xml");
    write_snapshot(&catalog, &path).unwrap();

    let reread = read_snapshot(&path).unwrap();
    assert_eq!(to_xml_string(&reread).unwrap(), to_xml_string(&catalog).unwrap());

    let model = CircularModel::build(&reread, &BrowseOptions::default()).unwrap();
    assert_eq!(model.tables().count(), 6);
    assert_eq!(model.fingerprint(), Some("2024-05-01T10:00:00.000"));
}

#[test]
fn test_missing_file() {
    let err = read_snapshot(&fixture_path("no_such_catalog.xml")).unwrap_err();
    assert!(matches!(err, BrowseError::SnapshotReadError { .. }));
}

#[test]
fn test_snapshot_without_fingerprint() {
    let catalog = parse_snapshot(
        r#"<catalog><table schema="dbo" name="t" view="0"><column name="id" type="int" nullable="0"/></table></catalog>"#,
    )
    .unwrap();
    assert_eq!(catalog.fingerprint, None);
    assert_eq!(catalog.tables[0].columns[0].type_name, "int");
}
