//! Circular model construction tests

use std::collections::HashSet;

use rust_sqlbrowse::catalog::{CatalogSchema, CatalogTable, UnsupportedTag};
use rust_sqlbrowse::{BrowseError, BrowseOptions, CircularModel};

use crate::common::{name, shop_catalog, shop_model};

#[test]
fn test_root_reaches_every_table_exactly_once() {
    let model = shop_model();
    let root = model.root_table();
    assert!(root.is_root());

    for table in model.tables() {
        let end = model.root_relation_to(table.id).unwrap();
        assert_eq!(end.name.as_deref(), Some(table.name.simple()));
        assert_eq!(model.target_table(end.id).id, table.id);
        assert_eq!(root.relations_by_target[&table.id].len(), 1);

        let root_keys: Vec<_> = table.foreign_keys.iter().filter(|fk| fk.is_root_key()).collect();
        assert_eq!(root_keys.len(), 1, "{}", table.name);
        assert_eq!(root_keys[0].principal.table, model.root_id());
    }
    assert_eq!(root.relations.len(), model.tables().count());
}

#[test]
fn test_relation_ends_form_closed_pairs() {
    let model = shop_model();
    for table in model.tables().chain(std::iter::once(model.root_table())) {
        for &end in table.relations.values() {
            let other = model.other_end(end);
            assert_eq!(other.other, end);
            assert_ne!(other.id, end);
            assert_eq!(model.end(end).table, table.id);
        }
    }
}

#[test]
fn test_every_end_is_anchored_on_its_tuple() {
    let model = shop_model();
    for table in model.tables().chain(std::iter::once(model.root_table())) {
        for &id in table.relations.values() {
            for end in [model.end(id), model.other_end(id)] {
                let tuple = model.end_tuple(end.id).unwrap();
                assert_eq!(tuple.table, end.table);
                assert_eq!(end.is_many, !tuple.contains_key, "{:?}", end.name);
            }
        }
    }
}

#[test]
fn test_foreign_key_principals_and_backing_indexes() {
    let model = shop_model();
    for table in model.tables() {
        for fk in table.foreign_keys.iter().filter(|fk| !fk.is_root_key()) {
            let principal_table = model.table(fk.principal.table);
            let key = principal_table.index(&fk.principal.name).unwrap();
            assert!(key.is_unique);

            let fk_columns: HashSet<&str> = table.column_names(&fk.tuple).into_iter().collect();
            for backing in &fk.backing_indexes {
                let index = table.index(backing).unwrap();
                let leading: HashSet<&str> = table
                    .column_names(&index.tuple)
                    .into_iter()
                    .take(fk_columns.len())
                    .collect();
                assert_eq!(leading, fk_columns, "{} backed by {}", fk.name(), backing);
            }
        }
    }

    let order = model.find_table("dbo.order").unwrap();
    let fk = order.foreign_key("FK_order_customer").unwrap();
    assert_eq!(fk.backing_indexes, vec!["IX_order_customer"]);
    assert_eq!(model.table(fk.principal.table).name.simple(), "dbo.customer");
}

#[test]
fn test_unsupported_indexes_still_back_foreign_keys() {
    let model = shop_model();
    let line = model.find_table("[dbo].[order_line]").unwrap();
    let filtered = line.index("IX_order_line_filtered").unwrap();
    assert_eq!(filtered.unsupported.as_ref().map(|r| r.tag), Some(UnsupportedTag::Filtered));

    let fk = line.foreign_key("FK_order_line_product").unwrap();
    assert!(fk.backing_indexes.contains(&"IX_order_line_filtered".to_string()));
    // A filtered unique index doesn't make the product reference unique.
    assert!(!fk.tuple.contains_key);
    assert!(line.seekable_indexes().all(|i| i.name() != "IX_order_line_filtered"));
}

#[test]
fn test_unsupported_columns_and_indexes() {
    let model = shop_model();
    let product = model.find_table("dbo.product").unwrap();
    assert!(product.column("manual").is_none());
    assert!(product.index("IX_product_manual").is_none());
    assert_eq!(product.columns.len(), 4);
    assert_eq!(product.columns[3].ordinal, 4);

    let photo = product.index("IX_product_photo").unwrap();
    assert_eq!(
        photo.unsupported.as_ref().map(|r| r.tag),
        Some(UnsupportedTag::UnsupportedColumn)
    );
}

#[test]
fn test_relation_multiplicity() {
    let model = shop_model();
    let customer = model.find_table("dbo.customer").unwrap();
    let order = model.find_table("dbo.order").unwrap();

    let to_customer = model.relation(order.id, "D_FK_order_customer").unwrap();
    let to_orders = model.relation(customer.id, "P_FK_order_customer").unwrap();
    assert!(!model.navigates_to_many(to_customer.id));
    assert!(model.navigates_to_many(to_orders.id));
    assert!(to_orders.is_principal);
    assert!(!to_customer.is_principal);
    assert!(model.is_uniquely_typed(to_orders.id));
    assert!(!model.is_uniquely_typed(to_customer.id));
}

#[test]
fn test_primary_name_columns() {
    let model = shop_model();
    let primary = |table: &str| {
        model
            .find_table(table)
            .unwrap()
            .primary_name()
            .map(|c| c.name.clone())
    };
    assert_eq!(primary("dbo.customer").as_deref(), Some("name"));
    assert_eq!(primary("dbo.employee").as_deref(), Some("full_name"));
    assert_eq!(primary("dbo.product").as_deref(), Some("code"));
    assert_eq!(primary("dbo.order").as_deref(), Some("note"));
    assert_eq!(primary("dbo.order_line"), None);

    let customer = model.find_table("dbo.customer").unwrap();
    assert_eq!(customer.columns.iter().filter(|c| c.is_primary_name).count(), 1);
}

#[test]
fn test_primary_name_skips_many_relation_columns() {
    let catalog = CatalogSchema::new(vec![
        CatalogTable::new(name("country"))
            .column("code", "char", false)
            .primary_key("PK_country", &["code"]),
        CatalogTable::new(name("city"))
            .column("country_code", "char", false)
            .column("label", "nvarchar", false)
            .primary_key("PK_city", &["country_code", "label"])
            .foreign_key("FK_city_country", &["country_code"], name("country"), "PK_country"),
    ]);
    let model = CircularModel::build(&catalog, &BrowseOptions::default()).unwrap();
    let city = model.find_table("city").unwrap();
    assert_eq!(city.primary_name().map(|c| c.name.as_str()), Some("label"));
}

#[test]
fn test_exclude_views() {
    let options = BrowseOptions {
        exclude_views: true,
        ..BrowseOptions::default()
    };
    let model = CircularModel::build(&shop_catalog(), &options).unwrap();
    assert!(model.find_table("dbo.customer_summary").is_none());
    assert_eq!(model.tables().count(), 5);

    let with_views = shop_model();
    assert!(with_views.find_table("dbo.customer_summary").unwrap().is_view);
}

#[test]
fn test_abbreviations_and_hues() {
    let model = shop_model();
    let abbreviations: HashSet<String> = model
        .tables()
        .map(|t| t.abbreviation.to_lowercase())
        .collect();
    assert_eq!(abbreviations.len(), model.tables().count());
    assert!(model.tables().all(|t| t.hue < 360));
}

#[test]
fn test_unresolved_references_are_fatal() {
    let missing_key = CatalogSchema::new(vec![CatalogTable::new(name("a"))
        .column("id", "int", false)
        .foreign_key("FK_a_b", &["id"], name("b"), "PK_b")]);
    assert!(matches!(
        CircularModel::build(&missing_key, &BrowseOptions::default()),
        Err(BrowseError::UnresolvedKey { .. })
    ));

    let model = shop_model();
    let customer = model.find_table("dbo.customer").unwrap();
    assert_eq!(
        model.relation(customer.id, "P_nope").unwrap_err().to_string(),
        "Can't find relation P_nope in table dbo.customer"
    );
    assert!(model.require_table("dbo.nope").is_err());
}

#[test]
fn test_fingerprint() {
    let model = shop_model();
    assert_eq!(model.fingerprint(), Some("2024-05-01T10:00:00.000"));
    assert!(!model.is_stale(Some("2024-05-01T10:00:00.000")));
    assert!(model.is_stale(Some("2024-05-02T00:00:00.000")));
}
