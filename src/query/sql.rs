//! Compile an extent tree into one nested `for xml` query
//!
//! The outermost statement is always
//!
//! ```sql
//! select (select max(modify_date) from sys.objects) [@modify_date], <children> for xml path('root')
//! ```
//!
//! and every child extent becomes a correlated subquery in its parent's select list,
//! serialized with `for xml auto, type` so its rows nest as elements named after the
//! subquery's table alias.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{BrowseError, Result};
use crate::extent::{Extent, Scan};
use crate::model::{CircularModel, RelationEnd, Table, TableId};
use crate::names::escape_part;
use crate::types::ScanOption;
use crate::util::{escape_like, sql_string_literal};

/// Name of the column flagging rows that satisfy every filter value.
pub const MATCHING_COLUMN: &str = "__matching";

/// Attribute of the `root` element carrying the schema fingerprint.
pub const FINGERPRINT_ATTRIBUTE: &str = "modify_date";

/// Compile a root extent into a single SQL statement.
pub fn get_sql(model: &CircularModel, root: &Extent) -> Result<String> {
    let mut items = vec![format!(
        "(select max(modify_date) from sys.objects) [@{}]",
        FINGERPRINT_ATTRIBUTE
    )];
    let aliases = child_aliases(model, model.root_id(), "", &root.children)?;
    for (child, alias) in root.children.iter().zip(&aliases) {
        items.push(compile_extent(model, model.root_id(), None, child, alias)?);
    }

    let sql = format!("select {} for xml path('root')", items.join(", "));
    debug!(extents = root.walk().len(), bytes = sql.len(), "compiled extent query");
    Ok(sql)
}

/// Resolve the relation an extent follows from `parent`.
pub(crate) fn resolve_relation<'m>(
    model: &'m CircularModel,
    parent: TableId,
    extent: &Extent,
) -> Result<&'m RelationEnd> {
    let name = extent.relation.as_deref().unwrap_or_default();
    model.relation(parent, name)
}

/// Table aliases of sibling extents below a parent aliased `prefix`.
///
/// An explicit alias is kept as is. Otherwise the alias is the prefix plus the first
/// letter of the target table's name, lowercased (`x` when that isn't a letter);
/// a derived alias already taken by an earlier sibling gets a numeric suffix.
pub(crate) fn child_aliases(
    model: &CircularModel,
    parent: TableId,
    prefix: &str,
    children: &[Extent],
) -> Result<Vec<String>> {
    let mut taken: HashSet<String> = children.iter().filter_map(|c| c.alias.clone()).collect();
    let mut aliases = Vec::with_capacity(children.len());

    for child in children {
        if let Some(alias) = &child.alias {
            aliases.push(alias.clone());
            continue;
        }
        let end = resolve_relation(model, parent, child)?;
        let target = model.target_table(end.id);
        let letter = target
            .name
            .name()
            .chars()
            .next()
            .filter(|c| c.is_alphabetic())
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_else(|| "x".to_string());
        let base = format!("{}{}", prefix, letter);

        let mut alias = base.clone();
        let mut n = 2;
        while taken.contains(&alias) {
            alias = format!("{}{}", base, n);
            n += 1;
        }
        taken.insert(alias.clone());
        aliases.push(alias);
    }
    Ok(aliases)
}

/// `parent_alias` is `None` directly below the root table, which has no columns to
/// join on.
fn compile_extent(
    model: &CircularModel,
    parent: TableId,
    parent_alias: Option<&str>,
    extent: &Extent,
    alias: &str,
) -> Result<String> {
    let end = resolve_relation(model, parent, extent)?;
    let other = model.end(end.other);
    let parent_table = model.table(parent);
    let target = model.table(other.table);
    let a = escape_part(alias);

    if extent.values.len() > extent.order.len() {
        return Err(BrowseError::TooManyValues {
            relation: extent.relation.clone().unwrap_or_default(),
            values: extent.values.len(),
            order: extent.order.len(),
        });
    }

    let mut select = Vec::new();
    let mut binary = false;
    for name in &extent.columns {
        let column = require_column(target, name)?;
        let c = escape_part(&column.name);
        if column.column_type.needs_text_cast() {
            select.push(format!("convert(nvarchar(4000), {}.{}.ToString()) {}", a, c, c));
        } else {
            binary |= column.column_type.is_binary();
            select.push(format!("{}.{}", a, c));
        }
    }

    if !extent.values.is_empty() {
        let all_equal = extent
            .values
            .iter()
            .zip(&extent.order)
            .map(|(value, order)| {
                require_column(target, &order.name)?;
                Ok(equality(&a, &order.name, value.as_deref()))
            })
            .collect::<Result<Vec<_>>>()?;
        select.push(format!(
            "case when {} then 1 else 0 end {}",
            all_equal.join(" and "),
            escape_part(MATCHING_COLUMN)
        ));
    }

    let aliases = child_aliases(model, target.id, alias, &extent.children)?;
    for (child, child_alias) in extent.children.iter().zip(&aliases) {
        select.push(compile_extent(model, target.id, Some(alias), child, child_alias)?);
    }

    for selectable in &extent.selectables {
        select.push(format!(
            "{} {}",
            selectable.expression.replace("{alias}", &a),
            escape_part(&selectable.name)
        ));
    }

    let mut predicates = Vec::new();
    if let Some(parent_alias) = parent_alias {
        let p = escape_part(parent_alias);
        for (&own, &theirs) in other.columns.iter().zip(&end.columns) {
            predicates.push(format!(
                "{}.{} = {}.{}",
                a,
                escape_part(&target.columns[own].name),
                p,
                escape_part(&parent_table.columns[theirs].name)
            ));
        }
    }
    predicates.extend(filter_predicates(target, extent, &a)?);
    if let Some(scan) = &extent.scan {
        predicates.push(scan_predicate(scan, &a));
    }

    let mut sql = String::from("(select ");
    if let Some(limit) = extent.limit {
        sql.push_str(&format!("top ({}) ", limit));
    }
    if select.is_empty() {
        select.push("1 [_]".to_string());
    }
    sql.push_str(&select.join(", "));
    sql.push_str(&format!(" from {} {}", target.name.escaped()?, a));
    if let Some(index) = &extent.index {
        sql.push_str(&format!(" with (index({}))", escape_part(index)));
    }
    if !predicates.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&predicates.join(" and "));
    }
    if !extent.order.is_empty() {
        let order = extent
            .order
            .iter()
            .map(|o| format!("{}.{}{}", a, escape_part(&o.name), o.direction.sql_suffix()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" order by ");
        sql.push_str(&order);
    }
    sql.push_str(if binary {
        " for xml auto, binary base64, type)"
    } else {
        " for xml auto, type)"
    });

    trace!(relation = ?extent.relation, alias, "compiled subquery");
    Ok(sql)
}

fn require_column<'t>(table: &'t Table, name: &str) -> Result<&'t crate::model::Column> {
    table
        .column(name)
        .ok_or_else(|| BrowseError::UnresolvedColumn {
            table: table.name.simple().to_string(),
            column: name.to_string(),
        })
}

fn equality(alias: &str, column: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!(
            "{}.{} = {}",
            alias,
            escape_part(column),
            sql_string_literal(value)
        ),
        None => format!("{}.{} is null", alias, escape_part(column)),
    }
}

/// Seek predicates: bound keys and all but the last value are equalities, the last
/// free value is a directed lower bound.
fn filter_predicates(target: &Table, extent: &Extent, alias: &str) -> Result<Vec<String>> {
    let count = extent.values.len();
    let mut predicates = Vec::with_capacity(count);
    for (i, (value, order)) in extent.values.iter().zip(&extent.order).enumerate() {
        require_column(target, &order.name)?;
        let column = escape_part(&order.name);
        if i < extent.key_value_count || i + 1 != count {
            predicates.push(equality(alias, &order.name, value.as_deref()));
            continue;
        }
        match (value, order.direction.seek_operator()) {
            (Some(value), op) => predicates.push(format!(
                "{}.{} {} {}",
                alias,
                column,
                op,
                sql_string_literal(value)
            )),
            // Nulls sort first: everything follows them ascending, nothing but them descending.
            (None, ">=") => {}
            (None, _) => predicates.push(format!("{}.{} is null", alias, column)),
        }
    }
    Ok(predicates)
}

fn scan_predicate(scan: &Scan, alias: &str) -> String {
    if scan.terms.is_empty() {
        // TODO: skip issuing the query when no column can match instead of asking
        // the server for an empty result.
        return "1 = 0".to_string();
    }
    let terms: Vec<String> = scan
        .terms
        .iter()
        .map(|term| {
            let column = escape_part(&term.column);
            match &term.option {
                ScanOption::Equal(value) => {
                    format!("{}.{} = {}", alias, column, sql_string_literal(value))
                }
                ScanOption::Substring(value) => format!(
                    "{}.{} like {}",
                    alias,
                    column,
                    sql_string_literal(&format!("%{}%", escape_like(value)))
                ),
            }
        })
        .collect();
    format!("({})", terms.join(" or "))
}
