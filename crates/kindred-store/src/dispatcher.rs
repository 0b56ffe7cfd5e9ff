//! Relationship dispatch for parent entities
//!
//! A parent type declares its child relationships once, as a static list of
//! [`Relation`]s. The dispatcher walks that list on parent insert, update
//! and load, routing each field to the slot, eager-list or tracked
//! persistence routine for its kind. Child tables are named
//! `<parent table>_<field>`.
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//! use kindred_core::{record_fields, TrackedCollection};
//! use kindred_store::dispatcher::{ParentEntity, Relation, RelationshipDispatcher};
//! use kindred_store::StoreConfig;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Tag {
//!     id: String,
//!     parent_id: i64,
//!     created_at: i64,
//!     updated_at: i64,
//!     label: String,
//! }
//! record_fields!(tracked Tag { label: String });
//!
//! #[derive(Default)]
//! struct Post {
//!     id: i64,
//!     tags: TrackedCollection<Tag>,
//! }
//!
//! impl ParentEntity for Post {
//!     fn table_name() -> &'static str {
//!         "posts"
//!     }
//!     fn id(&self) -> i64 {
//!         self.id
//!     }
//!     fn relations() -> &'static [Relation<Self>] {
//!         static RELATIONS: OnceLock<Vec<Relation<Post>>> = OnceLock::new();
//!         RELATIONS.get_or_init(|| vec![Relation::tracked("tags", |p: &mut Post| &mut p.tags)])
//!     }
//! }
//!
//! let mut conn = rusqlite::Connection::open_in_memory().unwrap();
//! let dispatcher = RelationshipDispatcher::<Post>::new(":memory:", StoreConfig::default());
//!
//! let mut post = Post { id: 1, ..Default::default() };
//! post.tags.add(Tag { label: "rust".to_string(), ..Default::default() });
//!
//! let tx = conn.transaction().unwrap();
//! let report = dispatcher.insert_children(&tx, &mut post).unwrap();
//! tx.commit().unwrap();
//! assert_eq!(report.table("posts_tags").map(|r| r.inserted), Some(1));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

use kindred_core::collection::TrackedCollection;
use kindred_core::model::{ChildRecord, Record, TrackedRecord};
use kindred_core::{log_op_end, log_op_error, log_op_start};
use kindred_core_types::schema::OP_CREATE_CHILD_TABLES;
use rusqlite::{Connection, Transaction};

use crate::child::{eager, slot, tracked};
use crate::config::StoreConfig;
use crate::errors::Result;
use crate::migrations::ensure_table;
use crate::report::{ChildWriteReport, LoadReport, SyncReport};
use crate::sql::TableLayout;

/// Child table name for a relationship field
pub fn child_table_name(parent_table: &str, field: &str) -> String {
    format!("{}_{}", parent_table, field)
}

/// Relationship kind of a parent field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    EagerList,
    TrackedCollection,
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "one_to_one",
            RelationKind::EagerList => "eager_list",
            RelationKind::TrackedCollection => "tracked_collection",
        }
    }
}

/// A parent entity with declared child relationships
pub trait ParentEntity: Sized + 'static {
    /// The parent's own table, used as the child table prefix
    fn table_name() -> &'static str;

    /// Storage-assigned id of the parent row
    fn id(&self) -> i64;

    /// Declared relationships, built once and cached by the implementor
    fn relations() -> &'static [Relation<Self>];
}

/// Everything a handler needs besides the parent itself
struct ChildContext<'a> {
    connection_string: &'a str,
    table: &'a str,
    parent_id: i64,
    config: &'a StoreConfig,
}

trait RelationHandler<P>: Send + Sync {
    fn ensure_table(&self, conn: &Connection, table: &str) -> Result<SyncReport>;
    fn insert(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P)
        -> Result<SyncReport>;
    fn update(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P)
        -> Result<SyncReport>;
    fn load(&self, conn: &Connection, ctx: &ChildContext<'_>, parent: &mut P)
        -> Result<LoadReport>;
}

fn ensure<R: Record>(conn: &Connection, table: &str, layout: TableLayout) -> Result<SyncReport> {
    let outcome = ensure_table(conn, table, layout, R::schema())?;
    Ok(SyncReport {
        columns_added: outcome.columns_added,
        schema_statements: outcome.statements,
        ..Default::default()
    })
}

struct OneToOne<P, C> {
    slot: fn(&mut P) -> &mut Option<C>,
}

impl<P, C: ChildRecord> RelationHandler<P> for OneToOne<P, C> {
    fn ensure_table(&self, conn: &Connection, table: &str) -> Result<SyncReport> {
        ensure::<C>(conn, table, TableLayout::Surrogate)
    }

    fn insert(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P) -> Result<SyncReport> {
        match (self.slot)(parent) {
            Some(record) => slot::insert(tx, ctx.table, ctx.parent_id, record),
            None => Ok(SyncReport::default()),
        }
    }

    fn update(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P) -> Result<SyncReport> {
        match (self.slot)(parent) {
            Some(record) => {
                let mut report = self.ensure_table(tx, ctx.table)?;
                report.merge(&slot::upsert(tx, ctx.table, ctx.parent_id, record)?);
                Ok(report)
            }
            None => Ok(SyncReport::default()),
        }
    }

    fn load(&self, conn: &Connection, ctx: &ChildContext<'_>, parent: &mut P) -> Result<LoadReport> {
        let (record, report) = slot::load::<C>(conn, ctx.table, ctx.parent_id)?;
        if record.is_some() {
            *(self.slot)(parent) = record;
        }
        Ok(report)
    }
}

struct EagerList<P, C> {
    list: fn(&mut P) -> &mut Vec<C>,
}

impl<P, C: ChildRecord> RelationHandler<P> for EagerList<P, C> {
    fn ensure_table(&self, conn: &Connection, table: &str) -> Result<SyncReport> {
        ensure::<C>(conn, table, TableLayout::Surrogate)
    }

    fn insert(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P) -> Result<SyncReport> {
        eager::insert_all(tx, ctx.table, ctx.parent_id, (self.list)(parent))
    }

    // Eager lists are write-once
    fn update(&self, _tx: &Transaction, _ctx: &ChildContext<'_>, _parent: &mut P) -> Result<SyncReport> {
        Ok(SyncReport::default())
    }

    fn load(&self, conn: &Connection, ctx: &ChildContext<'_>, parent: &mut P) -> Result<LoadReport> {
        let (records, report) = eager::load_all::<C>(conn, ctx.table, ctx.parent_id)?;
        *(self.list)(parent) = records;
        Ok(report)
    }
}

struct Tracked<P, C: TrackedRecord> {
    collection: fn(&mut P) -> &mut TrackedCollection<C>,
}

impl<P, C: TrackedRecord> Tracked<P, C> {
    fn bound<'p>(&self, ctx: &ChildContext<'_>, parent: &'p mut P) -> &'p mut TrackedCollection<C> {
        let collection = (self.collection)(parent);
        collection.bind(ctx.connection_string, ctx.parent_id, ctx.table);
        collection
    }
}

impl<P, C: TrackedRecord> RelationHandler<P> for Tracked<P, C> {
    fn ensure_table(&self, conn: &Connection, table: &str) -> Result<SyncReport> {
        ensure::<C>(conn, table, TableLayout::Tracked)
    }

    fn insert(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P) -> Result<SyncReport> {
        tracked::sync(tx, self.bound(ctx, parent), ctx.config)
    }

    fn update(&self, tx: &Transaction, ctx: &ChildContext<'_>, parent: &mut P) -> Result<SyncReport> {
        tracked::sync(tx, self.bound(ctx, parent), ctx.config)
    }

    fn load(&self, conn: &Connection, ctx: &ChildContext<'_>, parent: &mut P) -> Result<LoadReport> {
        tracked::load(conn, self.bound(ctx, parent))
    }
}

/// One declared relationship field of a parent type
pub struct Relation<P> {
    field: &'static str,
    kind: RelationKind,
    handler: Box<dyn RelationHandler<P>>,
}

impl<P: 'static> Relation<P> {
    /// Zero or one nested record, stored in its own row
    pub fn one_to_one<C: ChildRecord + 'static>(
        field: &'static str,
        slot: fn(&mut P) -> &mut Option<C>,
    ) -> Self {
        Self {
            field,
            kind: RelationKind::OneToOne,
            handler: Box::new(OneToOne { slot }),
        }
    }

    /// Write-once list of nested records
    pub fn eager_list<C: ChildRecord + 'static>(
        field: &'static str,
        list: fn(&mut P) -> &mut Vec<C>,
    ) -> Self {
        Self {
            field,
            kind: RelationKind::EagerList,
            handler: Box::new(EagerList { list }),
        }
    }

    /// Change-tracked collection, synced in batches
    pub fn tracked<C: TrackedRecord + 'static>(
        field: &'static str,
        collection: fn(&mut P) -> &mut TrackedCollection<C>,
    ) -> Self {
        Self {
            field,
            kind: RelationKind::TrackedCollection,
            handler: Box::new(Tracked { collection }),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }
}

impl<P> fmt::Debug for Relation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Routes a parent type's relationship fields to their persistence routines
///
/// Parent rows themselves are the caller's business: insert the parent
/// first (so it has an id), then call [`insert_children`] in the same
/// transaction.
///
/// [`insert_children`]: RelationshipDispatcher::insert_children
pub struct RelationshipDispatcher<P: ParentEntity> {
    connection_string: String,
    config: StoreConfig,
    _parent: PhantomData<fn() -> P>,
}

impl<P: ParentEntity> RelationshipDispatcher<P> {
    pub fn new(connection_string: impl Into<String>, config: StoreConfig) -> Self {
        Self {
            connection_string: connection_string.into(),
            config,
            _parent: PhantomData,
        }
    }

    pub fn relations(&self) -> &'static [Relation<P>] {
        P::relations()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn context<'a>(&'a self, table: &'a str, parent_id: i64) -> ChildContext<'a> {
        ChildContext {
            connection_string: &self.connection_string,
            table,
            parent_id,
            config: &self.config,
        }
    }

    /// Create every child table that does not exist yet and add missing
    /// columns to those that do
    ///
    /// # Errors
    ///
    /// Returns `SchemaMigrationFailure` naming the first table that failed.
    pub fn create_tables(&self, conn: &Connection) -> Result<ChildWriteReport> {
        log_op_start!(OP_CREATE_CHILD_TABLES, table = P::table_name());
        let start = Instant::now();

        let mut report = ChildWriteReport::default();
        for relation in P::relations() {
            let table = child_table_name(P::table_name(), relation.field);
            let outcome = relation.handler.ensure_table(conn, &table).map_err(|e| {
                log_op_error!(
                    OP_CREATE_CHILD_TABLES,
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    table = table.as_str()
                );
                e
            })?;
            report.record(&table, &outcome);
        }

        log_op_end!(
            OP_CREATE_CHILD_TABLES,
            duration_ms = start.elapsed().as_millis() as u64,
            table = P::table_name(),
            columns_added = report.total().columns_added as u64
        );

        Ok(report)
    }

    /// Write every child of a newly inserted parent
    ///
    /// Creates child tables, writes slot and eager-list rows, then binds and
    /// syncs tracked collections.
    ///
    /// # Errors
    ///
    /// Returns the first child failure; the caller should roll back.
    pub fn insert_children(&self, tx: &Transaction, parent: &mut P) -> Result<ChildWriteReport> {
        let mut report = self.create_tables(tx)?;
        let parent_id = parent.id();

        for relation in Self::ordered() {
            let table = child_table_name(P::table_name(), relation.field);
            let ctx = self.context(&table, parent_id);
            let outcome = relation.handler.insert(tx, &ctx, parent)?;
            report.record(&table, &outcome);
        }

        Ok(report)
    }

    /// Write child changes for an updated parent
    ///
    /// Upserts slots and syncs tracked collections. Eager lists are
    /// write-once and are left alone.
    ///
    /// # Errors
    ///
    /// Returns the first child failure; the caller should roll back.
    pub fn update_children(&self, tx: &Transaction, parent: &mut P) -> Result<ChildWriteReport> {
        let mut report = ChildWriteReport::default();
        let parent_id = parent.id();

        for relation in Self::ordered() {
            let table = child_table_name(P::table_name(), relation.field);
            let ctx = self.context(&table, parent_id);
            let outcome = relation.handler.update(tx, &ctx, parent)?;
            if !outcome.is_noop() {
                report.record(&table, &outcome);
            }
        }

        Ok(report)
    }

    /// Populate every relationship field of a loaded parent
    ///
    /// # Errors
    ///
    /// Returns `LoadFailure` if a child query fails. Unmappable fields are
    /// reported, not returned.
    pub fn load_children(&self, conn: &Connection, parent: &mut P) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let parent_id = parent.id();

        for relation in P::relations() {
            let table = child_table_name(P::table_name(), relation.field);
            let ctx = self.context(&table, parent_id);
            report.merge(relation.handler.load(conn, &ctx, parent)?);
        }

        Ok(report)
    }

    /// Slots and eager lists first, tracked collections last
    fn ordered() -> impl Iterator<Item = &'static Relation<P>> {
        let relations = P::relations();
        relations
            .iter()
            .filter(|r| r.kind != RelationKind::TrackedCollection)
            .chain(
                relations
                    .iter()
                    .filter(|r| r.kind == RelationKind::TrackedCollection),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_table_name() {
        assert_eq!(child_table_name("orders", "lines"), "orders_lines");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RelationKind::EagerList.name(), "eager_list");
        assert_eq!(RelationKind::TrackedCollection.name(), "tracked_collection");
    }
}
