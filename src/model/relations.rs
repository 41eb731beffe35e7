//! Relation ends: the two directed halves of every link between two tables.

use super::{TableId, TupleRef};

/// Stable handle of a relation end inside one circular model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationEndId(pub(crate) usize);

impl RelationEndId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One directed half of a relation.
///
/// A named end is registered in its own table's relation map; following it leads to
/// the rows of `other`'s table.
#[derive(Debug, Clone)]
pub struct RelationEnd {
    pub id: RelationEndId,
    /// Unnamed ends are only reachable from their partner.
    pub name: Option<String>,
    pub table: TableId,
    pub is_principal: bool,
    /// There may be many rows of this end's table for one row on the other side.
    pub is_many: bool,
    pub key: TupleRef,
    /// Join columns of this end's table, aligned with `other`'s columns.
    pub columns: Vec<usize>,
    pub other: RelationEndId,
}

/// Describes one side of a relation before it is materialized.
#[derive(Debug, Clone)]
pub struct EndSpec {
    pub table: TableId,
    pub name: Option<String>,
    pub key: TupleRef,
    pub columns: Vec<String>,
}

/// A relation to materialize: a principal side and a dependent side.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    pub principal: EndSpec,
    pub dependent: EndSpec,
}
