//! Build a circular model from catalog metadata
//!
//! Construction runs in fixed phases:
//!
//! 1. [`ModelBuilder::populate_tables`] creates tables, columns and domestic keys and
//!    returns the registry of unique keys by qualified name;
//! 2. [`ModelBuilder::populate_foreign_keys`] resolves foreign keys against that
//!    registry (a foreign key may reference a table created after its own);
//! 3. [`ModelBuilder::populate_root`] links the synthetic root table to every table;
//! 4. [`ModelBuilder::populate_relations_from_foreign_keys`] derives two relation ends
//!    per foreign key;
//! 5. [`ModelBuilder::closeup`] groups relations by target and picks primary-name
//!    columns.
//!
//! Any unresolved reference is a fatal error: the catalog is assumed consistent.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::catalog::{
    CatalogSchema, CatalogTable, IndexDirection, UnsupportedReason, UnsupportedTag,
};
use crate::error::{BrowseError, Result};
use crate::names::ObjectName;
use crate::types::ColumnType;
use crate::BrowseOptions;

use super::{
    abbreviate, CircularModel, Column, ColumnTuple, DirectedColumn, EndSpec, ForeignKey,
    Indexlike, KeyRef, RelationEnd, RelationEndId, RelationSpec, Table, TableId, TupleRef,
};

/// The root table always sits at the start of the table arena.
const ROOT: TableId = TableId(0);

/// Unique keys of every table, by (table simple name, key name).
pub(crate) struct KeyRegistry {
    keys: HashMap<(String, String), KeyRef>,
}

impl KeyRegistry {
    fn get(&self, table: &ObjectName, key: &str) -> Option<&KeyRef> {
        self.keys
            .get(&(table.simple().to_string(), key.to_string()))
    }
}

pub(crate) struct ModelBuilder<'o> {
    options: &'o BrowseOptions,
    tables: Vec<Table>,
    ends: Vec<RelationEnd>,
    table_by_name: HashMap<String, TableId>,
}

impl<'o> ModelBuilder<'o> {
    pub(crate) fn new(options: &'o BrowseOptions) -> Self {
        let mut root = Table::new(ROOT, ObjectName::root());
        root.indexes.push(Indexlike {
            tuple: ColumnTuple {
                name: String::new(),
                table: ROOT,
                columns: Vec::new(),
                contains_key: true,
            },
            is_unique: true,
            is_primary: true,
            unsupported: None,
        });
        root.index_by_name.insert(String::new(), 0);
        root.primary_key = Some(String::new());

        Self {
            options,
            tables: vec![root],
            ends: Vec::new(),
            table_by_name: HashMap::new(),
        }
    }

    fn real_table_ids(&self) -> impl Iterator<Item = TableId> {
        (1..self.tables.len()).map(TableId)
    }

    /// First pass: tables, columns and indexlikes.
    pub(crate) fn populate_tables(&mut self, catalog: &CatalogSchema) -> Result<KeyRegistry> {
        let included: Vec<&CatalogTable> = catalog
            .tables
            .iter()
            .filter(|t| !(self.options.exclude_views && t.is_view))
            .collect();
        let names: Vec<&str> = included.iter().map(|t| t.name.name()).collect();
        let abbreviations = abbreviate(&names);

        let mut keys = HashMap::new();
        for (source, abbreviation) in included.into_iter().zip(abbreviations) {
            let id = TableId(self.tables.len());
            let mut table = Table::new(id, source.name.clone());
            table.is_view = source.is_view;
            table.hue = hue_for(&abbreviation);
            table.abbreviation = abbreviation;

            populate_columns(&mut table, source);
            populate_indexes(&mut table, source);

            for index in table.unique_indexes() {
                keys.insert(
                    (table.name.simple().to_string(), index.name().to_string()),
                    KeyRef {
                        table: id,
                        name: index.name().to_string(),
                    },
                );
            }

            if self
                .table_by_name
                .insert(table.name.simple().to_string(), id)
                .is_some()
            {
                return Err(BrowseError::InvalidCatalog {
                    message: format!("table {} appears twice", table.name),
                });
            }
            self.tables.push(table);
        }

        Ok(KeyRegistry { keys })
    }

    /// Second pass: foreign keys, resolved against the keys of all tables.
    pub(crate) fn populate_foreign_keys(
        &mut self,
        catalog: &CatalogSchema,
        keys: &KeyRegistry,
    ) -> Result<()> {
        for source in &catalog.tables {
            let Some(&id) = self.table_by_name.get(source.name.simple()) else {
                continue;
            };

            let mut foreign_keys = Vec::with_capacity(source.foreign_keys.len());
            for fk in &source.foreign_keys {
                let table = &self.tables[id.0];
                let columns = fk
                    .columns
                    .iter()
                    .map(|name| {
                        table
                            .column_index(name)
                            .map(|column| DirectedColumn {
                                column,
                                direction: IndexDirection::Unknown,
                            })
                            .ok_or_else(|| BrowseError::UnresolvedColumn {
                                table: table.name.simple().to_string(),
                                column: name.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let principal = keys
                    .get(&fk.referenced_table, &fk.referenced_key)
                    .cloned()
                    .ok_or_else(|| BrowseError::UnresolvedKey {
                        table: fk.referenced_table.simple().to_string(),
                        key: fk.referenced_key.clone(),
                    })?;
                let principal_arity = self.tables[principal.table.0]
                    .index(&principal.name)
                    .map(|i| i.tuple.columns.len())
                    .unwrap_or(0);
                if principal_arity != columns.len() {
                    return Err(BrowseError::InvalidCatalog {
                        message: format!(
                            "foreign key {} has {} columns but key {} has {}",
                            fk.name,
                            columns.len(),
                            principal.name,
                            principal_arity
                        ),
                    });
                }

                let contains_key = contains_key(table, &columns);
                let backing_indexes = backing_indexes(table, &columns);
                foreign_keys.push(ForeignKey {
                    tuple: ColumnTuple {
                        name: fk.name.clone(),
                        table: id,
                        columns,
                        contains_key,
                    },
                    principal,
                    backing_indexes,
                });
            }

            let table = &mut self.tables[id.0];
            for fk in foreign_keys {
                add_foreign_key(table, fk);
            }
        }
        Ok(())
    }

    /// Link the root table to every real table.
    pub(crate) fn populate_root(&mut self) -> Result<()> {
        let ids: Vec<TableId> = self.real_table_ids().collect();
        let mut specs = Vec::with_capacity(ids.len());

        for id in ids {
            let table = &mut self.tables[id.0];
            let columns = Vec::new();
            let root_fk = ForeignKey {
                tuple: ColumnTuple {
                    name: String::new(),
                    table: id,
                    contains_key: contains_key(table, &columns),
                    columns,
                },
                principal: KeyRef {
                    table: ROOT,
                    name: String::new(),
                },
                backing_indexes: Vec::new(),
            };
            add_foreign_key(table, root_fk);

            specs.push(RelationSpec {
                principal: EndSpec {
                    table: ROOT,
                    name: Some(table.name.simple().to_string()),
                    key: TupleRef::Index(String::new()),
                    columns: Vec::new(),
                },
                dependent: EndSpec {
                    table: id,
                    name: None,
                    key: TupleRef::ForeignKey(String::new()),
                    columns: Vec::new(),
                },
            });
        }

        self.populate_relations(specs)
    }

    /// One relation per real foreign key: `D_<fk>` on the dependent table leads to the
    /// principal row, `P_<fk>` on the principal table leads to the dependent rows.
    pub(crate) fn populate_relations_from_foreign_keys(&mut self) -> Result<()> {
        let mut specs = Vec::new();
        for id in self.real_table_ids() {
            let table = &self.tables[id.0];
            for fk in table.foreign_keys.iter().filter(|fk| !fk.is_root_key()) {
                let principal_table = &self.tables[fk.principal.table.0];
                let principal_key = principal_table.index(&fk.principal.name).ok_or_else(|| {
                    BrowseError::UnresolvedKey {
                        table: principal_table.name.simple().to_string(),
                        key: fk.principal.name.clone(),
                    }
                })?;

                specs.push(RelationSpec {
                    principal: EndSpec {
                        table: fk.principal.table,
                        name: Some(format!("P_{}", fk.name())),
                        key: TupleRef::Index(fk.principal.name.clone()),
                        columns: owned_names(principal_table, &principal_key.tuple),
                    },
                    dependent: EndSpec {
                        table: id,
                        name: Some(format!("D_{}", fk.name())),
                        key: TupleRef::ForeignKey(fk.name().to_string()),
                        columns: owned_names(table, &fk.tuple),
                    },
                });
            }
        }
        self.populate_relations(specs)
    }

    /// Materialize relation descriptors into linked pairs of ends.
    pub(crate) fn populate_relations(&mut self, specs: Vec<RelationSpec>) -> Result<()> {
        for spec in specs {
            let principal_id = RelationEndId(self.ends.len());
            let dependent_id = RelationEndId(self.ends.len() + 1);
            let principal = self.materialize_end(&spec.principal, principal_id, dependent_id, true)?;
            let dependent =
                self.materialize_end(&spec.dependent, dependent_id, principal_id, false)?;

            if principal.columns.len() != dependent.columns.len() {
                return Err(BrowseError::InvalidCatalog {
                    message: format!(
                        "relation between {} and {} joins {} columns to {}",
                        self.tables[principal.table.0].name,
                        self.tables[dependent.table.0].name,
                        principal.columns.len(),
                        dependent.columns.len()
                    ),
                });
            }

            let partners = [dependent.table, principal.table];
            for (mut end, partner) in [principal, dependent].into_iter().zip(partners) {
                if let Some(name) = end.name.take() {
                    let name = self.unique_relation_name(end.table, name, partner);
                    self.tables[end.table.0]
                        .relations
                        .insert(name.clone(), end.id);
                    end.name = Some(name);
                }
                self.ends.push(end);
            }
        }
        Ok(())
    }

    /// Constraint names are only unique per schema, so a name already taken on `table`
    /// gets the partner table's schema appended, then a counter.
    fn unique_relation_name(&self, table: TableId, name: String, partner: TableId) -> String {
        let relations = &self.tables[table.0].relations;
        if !relations.contains_key(&name) {
            return name;
        }

        let base = match self.tables[partner.0].name.schema() {
            Some(schema) => format!("{}_{}", name, schema),
            None => name.clone(),
        };
        let mut candidate = base.clone();
        let mut counter = 2;
        while relations.contains_key(&candidate) {
            candidate = format!("{}{}", base, counter);
            counter += 1;
        }
        warn!(
            table = %self.tables[table.0].name,
            relation = %name,
            renamed = %candidate,
            "relation name registered twice, renaming the later one"
        );
        candidate
    }

    fn materialize_end(
        &self,
        spec: &EndSpec,
        id: RelationEndId,
        other: RelationEndId,
        is_principal: bool,
    ) -> Result<RelationEnd> {
        let table = &self.tables[spec.table.0];
        let tuple = table
            .column_tuple(&spec.key)
            .ok_or_else(|| BrowseError::UnresolvedKey {
                table: table.name.simple().to_string(),
                key: spec.key.name().to_string(),
            })?;
        let columns = spec
            .columns
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| BrowseError::UnresolvedColumn {
                        table: table.name.simple().to_string(),
                        column: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RelationEnd {
            id,
            name: spec.name.clone(),
            table: spec.table,
            is_principal,
            is_many: !tuple.contains_key,
            key: spec.key.clone(),
            columns,
            other,
        })
    }

    /// Group relations by target table and pick primary-name columns.
    pub(crate) fn closeup(&mut self) {
        for i in 0..self.tables.len() {
            let mut groups: BTreeMap<TableId, Vec<RelationEndId>> = BTreeMap::new();
            for &end_id in self.tables[i].relations.values() {
                let target = self.ends[self.ends[end_id.0].other.0].table;
                groups.entry(target).or_default().push(end_id);
            }
            self.tables[i].relations_by_target = groups;
        }

        for id in self.real_table_ids().collect::<Vec<_>>() {
            let excluded: HashSet<usize> = self.tables[id.0]
                .relations
                .values()
                .map(|e| &self.ends[e.0])
                .filter(|e| e.is_many)
                .flat_map(|e| e.columns.iter().copied())
                .collect();

            let table = &mut self.tables[id.0];
            let candidates: Vec<usize> = table
                .columns
                .iter()
                .enumerate()
                .filter(|(i, c)| c.is_string() && !excluded.contains(i))
                .map(|(i, _)| i)
                .collect();

            let chosen = candidates
                .iter()
                .find(|&&i| table.columns[i].name.eq_ignore_ascii_case("name"))
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|&&i| crate::util::contains_ci(&table.columns[i].name, "name"))
                })
                .or_else(|| candidates.first())
                .copied();

            if let Some(i) = chosen {
                table.columns[i].is_primary_name = true;
            }
            table.primary_name_column = chosen;
        }
    }

    pub(crate) fn finish(self, fingerprint: Option<String>) -> CircularModel {
        debug!(
            tables = self.tables.len() - 1,
            relation_ends = self.ends.len(),
            "built circular model"
        );
        CircularModel {
            tables: self.tables,
            ends: self.ends,
            root: ROOT,
            table_by_name: self.table_by_name,
            fingerprint,
        }
    }
}

fn populate_columns(table: &mut Table, source: &CatalogTable) {
    for (position, column) in source.columns.iter().enumerate() {
        let Some(column_type) = ColumnType::from_sql_name(&column.type_name) else {
            warn!(
                table = %source.name,
                column = %column.name,
                sql_type = %column.type_name,
                "skipping column with unsupported type"
            );
            continue;
        };
        table
            .column_by_name
            .insert(column.name.clone(), table.columns.len());
        table.columns.push(Column {
            ordinal: position + 1,
            name: column.name.clone(),
            sql_type: column.type_name.clone(),
            is_nullable: column.is_nullable,
            column_type,
            is_primary_name: false,
        });
    }
}

fn populate_indexes(table: &mut Table, source: &CatalogTable) {
    'keyishes: for keyish in &source.keyishes {
        let mut columns = Vec::with_capacity(keyish.columns.len());
        for key_column in &keyish.columns {
            match table.column_index(&key_column.name) {
                Some(column) => columns.push(DirectedColumn {
                    column,
                    direction: key_column.direction,
                }),
                None => {
                    warn!(
                        table = %source.name,
                        index = %keyish.name,
                        column = %key_column.name,
                        "skipping index over a column that isn't modeled"
                    );
                    continue 'keyishes;
                }
            }
        }
        if table.index_by_name.contains_key(&keyish.name) {
            continue;
        }

        let unsupported = keyish.unsupported.clone().or_else(|| {
            columns
                .iter()
                .map(|c| &table.columns[c.column])
                .find(|c| !c.column_type.is_seekable())
                .map(|c| {
                    UnsupportedReason::new(
                        UnsupportedTag::UnsupportedColumn,
                        format!("column {} of type {} can't be sought", c.name, c.sql_type),
                    )
                })
        });
        if let Some(reason) = &unsupported {
            debug!(table = %source.name, index = %keyish.name, %reason, "index can't be used for seeking");
        }

        if keyish.is_primary {
            table.primary_key = Some(keyish.name.clone());
        }
        table
            .index_by_name
            .insert(keyish.name.clone(), table.indexes.len());
        table.indexes.push(Indexlike {
            tuple: ColumnTuple {
                name: keyish.name.clone(),
                table: table.id,
                columns,
                contains_key: false,
            },
            is_unique: keyish.is_unique,
            is_primary: keyish.is_primary,
            unsupported,
        });
    }

    let flags: Vec<bool> = table
        .indexes
        .iter()
        .map(|i| contains_key(table, &i.tuple.columns))
        .collect();
    for (index, flag) in table.indexes.iter_mut().zip(flags) {
        index.tuple.contains_key = flag;
    }
}

fn add_foreign_key(table: &mut Table, fk: ForeignKey) {
    table
        .foreign_key_by_name
        .insert(fk.name().to_string(), table.foreign_keys.len());
    table.foreign_keys.push(fk);
}

/// The column set covers some index that enforces uniqueness.
fn contains_key(table: &Table, columns: &[DirectedColumn]) -> bool {
    let set: BTreeSet<usize> = columns.iter().map(|c| c.column).collect();
    table
        .indexes
        .iter()
        .filter(|i| i.guarantees_uniqueness())
        .any(|i| i.tuple.column_indexes().all(|c| set.contains(&c)))
}

/// Indexes whose leading columns, taken as a set, equal the foreign key's columns.
fn backing_indexes(table: &Table, columns: &[DirectedColumn]) -> Vec<String> {
    let wanted: BTreeSet<&str> = columns
        .iter()
        .map(|c| table.columns[c.column].name.as_str())
        .collect();
    if wanted.is_empty() {
        return Vec::new();
    }
    table
        .indexes
        .iter()
        .filter(|index| index.tuple.columns.len() >= columns.len())
        .filter(|index| {
            let leading: BTreeSet<&str> = index.tuple.columns[..columns.len()]
                .iter()
                .map(|c| table.columns[c.column].name.as_str())
                .collect();
            leading == wanted
        })
        .map(|index| index.name().to_string())
        .collect()
}

fn owned_names(table: &Table, tuple: &ColumnTuple) -> Vec<String> {
    table
        .column_names(tuple)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Deterministic color hint in degrees.
fn hue_for(abbreviation: &str) -> u16 {
    let digest = Sha256::digest(abbreviation.as_bytes());
    u16::from_be_bytes([digest[0], digest[1]]) % 360
}
