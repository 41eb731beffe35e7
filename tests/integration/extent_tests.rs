//! Extent expansion tests

use rust_sqlbrowse::catalog::IndexDirection;
use rust_sqlbrowse::extent::OrderColumn;
use rust_sqlbrowse::{
    BrowseError, BrowseOptions, Extent, ExtentFactory, ExtentRequest, Flavor, FlavorType,
};

use crate::common::{customer_order_model, employee_model, shop_model};

const ALL_TYPES: [FlavorType; 9] = [
    FlavorType::None,
    FlavorType::Existence,
    FlavorType::Inline2,
    FlavorType::Inline,
    FlavorType::Block,
    FlavorType::Page,
    FlavorType::BlockList,
    FlavorType::PageList,
    FlavorType::Table,
];

/// Every root-to-leaf list of relation names.
fn paths(extent: &Extent) -> Vec<Vec<String>> {
    let here = extent.relation.clone().into_iter().collect::<Vec<_>>();
    if extent.children.is_empty() {
        return vec![here];
    }
    extent
        .children
        .iter()
        .flat_map(paths)
        .map(|tail| here.iter().cloned().chain(tail).collect())
        .collect()
}

#[test]
fn test_self_reference_expansion_terminates() {
    let model = employee_model();
    for flavor_type in ALL_TYPES {
        for depth in 0..4 {
            let flavor = Flavor::new(flavor_type, depth);
            let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
            let root = factory
                .create_root_extent(&ExtentRequest::new("employee", flavor))
                .unwrap();

            assert!(root.height() <= depth as usize + 1, "{}", flavor);
            for path in paths(&root) {
                let mut seen = path.clone();
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), path.len(), "{}: {:?}", flavor, path);
            }
        }
    }
}

#[test]
fn test_self_reference_page_list() {
    let model = employee_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let root = factory
        .create_root_extent(&ExtentRequest::new(
            "employee",
            Flavor::new(FlavorType::PageList, 2),
        ))
        .unwrap();

    let employees = &root.children[0];
    assert_eq!(employees.relation.as_deref(), Some("employee"));
    assert_eq!(employees.limit, Some(2));

    let children: Vec<_> = employees
        .children
        .iter()
        .map(|c| (c.relation.as_deref().unwrap_or(""), c.flavor))
        .collect();
    assert_eq!(
        children,
        vec![
            ("D_FK_manager", Flavor::new(FlavorType::Page, 1)),
            ("P_FK_manager", Flavor::new(FlavorType::Page, 1)),
        ]
    );

    let manager = &employees.children[0];
    let below: Vec<_> = manager
        .children
        .iter()
        .map(|c| c.relation.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(below, vec!["P_FK_manager"]);
    assert_eq!(manager.children[0].flavor, Flavor::new(FlavorType::Inline, 0));
    assert!(manager.children[0].children.is_empty());
}

#[test]
fn test_root_overview() {
    let model = customer_order_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let root = factory
        .create_extent_for_root(Flavor::new(FlavorType::Existence, 0))
        .unwrap();

    assert!(root.is_root());
    let names: Vec<_> = root
        .children
        .iter()
        .map(|c| c.relation.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["customer", "order"]);
    assert!(root.children.iter().all(|c| c.children.is_empty()));
    assert!(root.children.iter().all(|c| c.limit == Some(1)));
}

#[test]
fn test_root_overview_at_block_depth() {
    let model = shop_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let root = factory
        .create_extent_for_root(Flavor::new(FlavorType::Block, 1))
        .unwrap();

    assert_eq!(root.children.len(), 6);
    let order = root
        .children
        .iter()
        .find(|c| c.relation.as_deref() == Some("dbo.order"))
        .unwrap();
    let relations: Vec<_> = order
        .children
        .iter()
        .map(|c| c.relation.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(relations, vec!["D_FK_order_customer", "P_FK_order_line_order"]);
    assert!(order
        .children
        .iter()
        .all(|c| c.flavor == Flavor::new(FlavorType::Inline, 0) && c.limit == Some(3)));
}

#[test]
fn test_limits_follow_flavors() {
    let model = shop_model();
    let request = |flavor_type| ExtentRequest::new("dbo.customer", Flavor::new(flavor_type, 0));
    let limit = |options: &BrowseOptions, flavor_type| {
        let root = ExtentFactory::new(&model, options)
            .create_root_extent(&request(flavor_type))
            .unwrap();
        root.children[0].limit
    };

    let defaults = BrowseOptions::default();
    assert_eq!(limit(&defaults, FlavorType::BlockList), Some(10));
    assert_eq!(limit(&defaults, FlavorType::Table), Some(2));

    let configured = BrowseOptions {
        default_limit: Some(50),
        ..BrowseOptions::default()
    };
    assert_eq!(limit(&configured, FlavorType::Table), Some(50));
    assert_eq!(limit(&configured, FlavorType::Page), Some(4));

    let explicit = ExtentFactory::new(&model, &defaults)
        .create_root_extent(&request(FlavorType::Table).with_limit(25))
        .unwrap();
    assert_eq!(explicit.children[0].limit, Some(25));
}

#[test]
fn test_forced_index_orders_by_its_columns() {
    let model = shop_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let root = factory
        .create_root_extent(
            &ExtentRequest::new("dbo.order", Flavor::new(FlavorType::Table, 0))
                .with_index("IX_order_customer"),
        )
        .unwrap();
    let orders = &root.children[0];
    assert_eq!(orders.index.as_deref(), Some("IX_order_customer"));
    assert_eq!(
        orders.order,
        vec![
            OrderColumn::ascending("customer_id"),
            OrderColumn::new("order_date", IndexDirection::Descending),
        ]
    );
}

#[test]
fn test_explicit_order_wins_over_index() {
    let model = shop_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let order = vec![OrderColumn::new("order_date", IndexDirection::Descending)];
    let root = factory
        .create_root_extent(
            &ExtentRequest::new("dbo.order", Flavor::new(FlavorType::Table, 0))
                .with_index("IX_order_customer")
                .with_order(order.clone()),
        )
        .unwrap();
    assert_eq!(root.children[0].order, order);
}

#[test]
fn test_unknown_table_and_index() {
    let model = shop_model();
    let mut factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let table = factory.create_root_extent(&ExtentRequest::new(
        "dbo.nope",
        Flavor::new(FlavorType::Table, 0),
    ));
    assert!(matches!(table, Err(BrowseError::UnresolvedTable { .. })));

    let index = factory.create_root_extent(
        &ExtentRequest::new("dbo.order", Flavor::new(FlavorType::Table, 0)).with_index("IX_nope"),
    );
    assert!(matches!(index, Err(BrowseError::UnresolvedKey { .. })));
}

#[test]
fn test_plain_extent() {
    let model = shop_model();
    let factory = ExtentFactory::new(&model, &BrowseOptions::default());
    let order = model.find_table("dbo.order").unwrap();
    let lines = factory.plain_extent(order.id, "P_FK_order_line_order").unwrap();

    assert!(lines.children.is_empty());
    assert_eq!(lines.limit, None);
    assert_eq!(lines.columns, vec!["order_id", "line_no", "product_id", "quantity"]);
    assert_eq!(
        lines.order,
        vec![OrderColumn::ascending("order_id"), OrderColumn::ascending("line_no")]
    );
}
