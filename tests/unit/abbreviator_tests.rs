//! Abbreviator tests

use std::collections::HashSet;

use rust_sqlbrowse::model::abbreviate;

#[test]
fn test_order_family_is_distinct_and_deterministic() {
    let names = ["Order", "OrderLine", "Organization"];
    let first = abbreviate(&names);
    assert!(first.iter().all(|a| !a.is_empty()));

    let unique: HashSet<String> = first.iter().map(|a| a.to_lowercase()).collect();
    assert_eq!(unique.len(), names.len());

    for _ in 0..5 {
        assert_eq!(abbreviate(&names), first);
    }
}

#[test]
fn test_many_similar_names_stay_unique() {
    let names: Vec<String> = (0..40).map(|i| format!("Customer{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let abbreviations = abbreviate(&refs);
    let unique: HashSet<String> = abbreviations.iter().map(|a| a.to_lowercase()).collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn test_snake_case_initials() {
    assert_eq!(abbreviate(&["order_line"]), vec!["OL"]);
}

#[test]
fn test_empty_input() {
    assert!(abbreviate(&[]).is_empty());
}
