//! ObjectName and XML name encoding tests

use rust_sqlbrowse::names::{decode_name, encode_name};
use rust_sqlbrowse::{BrowseError, ObjectName};

#[test]
fn test_escape_parse_escape_is_stable() {
    let parts = ["dbo", "Sales", "Order Lines", "a.b", "x..y", "ünïcode", "sp ace", "1st"];
    for first in parts {
        for second in parts {
            for name in [
                ObjectName::new([second]).unwrap(),
                ObjectName::new([first, second]).unwrap(),
                ObjectName::new(["db", first, second]).unwrap(),
            ] {
                let escaped = name.escaped().unwrap();
                let reparsed = ObjectName::parse(escaped).unwrap();
                assert_eq!(reparsed.escaped().unwrap(), escaped);
                assert_eq!(reparsed.simple(), name.simple());
            }
        }
    }
}

#[test]
fn test_simple_form_doubles_inner_dots() {
    let name = ObjectName::new(["dbo", "v1.2"]).unwrap();
    assert_eq!(name.simple(), "dbo.v1..2");
    assert_eq!(name.to_string(), "[dbo].[v1.2]");
}

#[test]
fn test_equality_uses_escaped_form() {
    let a = ObjectName::qualified("dbo", "customer").unwrap();
    let b = ObjectName::parse("[dbo].[customer]").unwrap();
    let c = ObjectName::parse("dbo.customer").unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_ne!(a, ObjectName::qualified("sales", "customer").unwrap());
}

#[test]
fn test_root_name() {
    let root = ObjectName::root();
    assert!(matches!(root.escaped(), Err(BrowseError::RootNameInSql)));
    assert_eq!(root.to_string(), "<root>");
    assert_eq!(root.name(), "");
}

#[test]
fn test_invalid_parts() {
    for bad in ["", "a[b", "a]b", "a\"b"] {
        assert!(ObjectName::new(["dbo", bad]).is_err(), "accepted {:?}", bad);
    }
}

#[test]
fn test_xml_names_of_aliases_and_columns() {
    assert_eq!(encode_name("c"), "c");
    assert_eq!(encode_name("__matching"), "__matching");
    assert_eq!(encode_name("unit price"), "unit_x0020_price");
    assert_eq!(decode_name("unit_x0020_price"), "unit price");
    assert_eq!(decode_name(&encode_name("_xABCD_")), "_xABCD_");
}
