//! Catalog snapshot files
//!
//! A snapshot is a plain XML rendering of a [`CatalogSchema`], so a model can be built
//! without a live database:
//!
//! ```xml
//! <catalog fingerprint="2024-01-01T00:00:00">
//!   <table schema="dbo" name="order" view="0">
//!     <column name="id" type="int" nullable="0"/>
//!     <index name="PK_order" unique="1" primary="1">
//!       <column name="id" direction="asc"/>
//!     </index>
//!     <foreign-key name="FK_order_customer" referenced-table="[dbo].[customer]" referenced-key="PK_customer">
//!       <column name="customer_id"/>
//!     </foreign-key>
//!   </table>
//! </catalog>
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};
use tracing::info;

use crate::error::{xml_generation_error, BrowseError, Result};
use crate::names::ObjectName;

use super::{
    CatalogColumn, CatalogForeignKey, CatalogKeyColumn, CatalogKeyish, CatalogSchema,
    CatalogTable, IndexDirection, UnsupportedReason, UnsupportedTag,
};

/// Load a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<CatalogSchema> {
    let xml = fs::read_to_string(path).map_err(|e| BrowseError::SnapshotReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let catalog = parse_snapshot(&xml)?;
    info!(path = %path.display(), tables = catalog.tables.len(), "loaded catalog snapshot");
    Ok(catalog)
}

/// Save a catalog as a snapshot file.
pub fn write_snapshot(catalog: &CatalogSchema, path: &Path) -> Result<()> {
    let xml = to_xml_string(catalog)?;
    fs::write(path, xml).map_err(|e| BrowseError::SnapshotWriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn parse_snapshot(xml: &str) -> Result<CatalogSchema> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "catalog" {
        return Err(invalid(format!(
            "expected <catalog> document element, found <{}>",
            root.tag_name().name()
        )));
    }

    let tables = elements(root, "table")
        .map(read_table)
        .collect::<Result<Vec<_>>>()?;

    Ok(CatalogSchema {
        tables,
        fingerprint: root.attribute("fingerprint").map(str::to_string),
    })
}

fn read_table(node: Node) -> Result<CatalogTable> {
    let parts: Vec<&str> = ["catalog", "schema"]
        .iter()
        .filter_map(|attr| node.attribute(*attr))
        .chain(std::iter::once(required(node, "name")?))
        .collect();
    let mut table = CatalogTable::new(ObjectName::new(parts)?);
    table.is_view = flag(node, "view");

    for column in elements(node, "column") {
        table.columns.push(CatalogColumn {
            name: required(column, "name")?.to_string(),
            type_name: required(column, "type")?.to_string(),
            is_nullable: flag(column, "nullable"),
        });
    }

    for index in elements(node, "index") {
        let unsupported = match index.attribute("unsupported") {
            Some(tag) => {
                let tag = UnsupportedTag::parse(tag)
                    .ok_or_else(|| invalid(format!("unknown unsupported tag '{}'", tag)))?;
                Some(UnsupportedReason::new(
                    tag,
                    index.attribute("message").unwrap_or_default(),
                ))
            }
            None => None,
        };
        let columns = elements(index, "column")
            .map(|c| {
                Ok(CatalogKeyColumn {
                    name: required(c, "name")?.to_string(),
                    direction: c
                        .attribute("direction")
                        .map(IndexDirection::parse)
                        .unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        table.keyishes.push(CatalogKeyish {
            name: required(index, "name")?.to_string(),
            is_unique: flag(index, "unique"),
            is_primary: flag(index, "primary"),
            columns,
            unsupported,
        });
    }

    for fk in elements(node, "foreign-key") {
        let columns = elements(fk, "column")
            .map(|c| required(c, "name").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        table.foreign_keys.push(CatalogForeignKey {
            name: required(fk, "name")?.to_string(),
            columns,
            referenced_table: ObjectName::parse(required(fk, "referenced-table")?)?,
            referenced_key: required(fk, "referenced-key")?.to_string(),
        });
    }

    Ok(table)
}

fn elements<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent
        .children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

fn required<'a>(node: Node<'a, '_>, attr: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        invalid(format!(
            "<{}> is missing attribute '{}'",
            node.tag_name().name(),
            attr
        ))
    })
}

fn flag(node: Node, attr: &str) -> bool {
    matches!(node.attribute(attr), Some("1") | Some("true"))
}

fn invalid(message: String) -> BrowseError {
    BrowseError::InvalidCatalog { message }
}

/// Render a catalog as snapshot XML.
pub fn to_xml_string(catalog: &CatalogSchema) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_generation_error)?;

    let mut root = BytesStart::new("catalog");
    if let Some(fingerprint) = &catalog.fingerprint {
        root.push_attribute(("fingerprint", fingerprint.as_str()));
    }
    write(&mut writer, Event::Start(root))?;
    for table in &catalog.tables {
        write_table(&mut writer, table)?;
    }
    write(&mut writer, Event::End(BytesEnd::new("catalog")))?;

    String::from_utf8(writer.into_inner()).map_err(xml_generation_error)
}

fn write_table<W: Write>(writer: &mut Writer<W>, table: &CatalogTable) -> Result<()> {
    let parts = table.name.parts();
    let mut start = BytesStart::new("table");
    let labels: &[&str] = match parts.len() {
        3 => &["catalog", "schema", "name"],
        2 => &["schema", "name"],
        _ => &["name"],
    };
    for (label, part) in labels.iter().zip(parts) {
        start.push_attribute((*label, part.as_str()));
    }
    start.push_attribute(("view", bool_attr(table.is_view)));
    write(writer, Event::Start(start))?;

    for column in &table.columns {
        let element = BytesStart::new("column").with_attributes([
            ("name", column.name.as_str()),
            ("type", column.type_name.as_str()),
            ("nullable", bool_attr(column.is_nullable)),
        ]);
        write(writer, Event::Empty(element))?;
    }

    for keyish in &table.keyishes {
        let mut start = BytesStart::new("index").with_attributes([
            ("name", keyish.name.as_str()),
            ("unique", bool_attr(keyish.is_unique)),
            ("primary", bool_attr(keyish.is_primary)),
        ]);
        if let Some(reason) = &keyish.unsupported {
            start.push_attribute(("unsupported", reason.tag.as_str()));
            start.push_attribute(("message", reason.message.as_str()));
        }
        write(writer, Event::Start(start))?;
        for column in &keyish.columns {
            let element = BytesStart::new("column").with_attributes([
                ("name", column.name.as_str()),
                ("direction", column.direction.as_str()),
            ]);
            write(writer, Event::Empty(element))?;
        }
        write(writer, Event::End(BytesEnd::new("index")))?;
    }

    for fk in &table.foreign_keys {
        let referenced = fk.referenced_table.escaped()?;
        let start = BytesStart::new("foreign-key").with_attributes([
            ("name", fk.name.as_str()),
            ("referenced-table", referenced),
            ("referenced-key", fk.referenced_key.as_str()),
        ]);
        write(writer, Event::Start(start))?;
        for column in &fk.columns {
            let element = BytesStart::new("column").with_attributes([("name", column.as_str())]);
            write(writer, Event::Empty(element))?;
        }
        write(writer, Event::End(BytesEnd::new("foreign-key")))?;
    }

    write(writer, Event::End(BytesEnd::new("table")))
}

fn write<W: Write>(writer: &mut Writer<W>, event: Event) -> Result<()> {
    writer.write_event(event).map_err(xml_generation_error)
}

fn bool_attr(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
