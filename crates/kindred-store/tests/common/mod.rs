#![allow(dead_code)]

use std::sync::OnceLock;

use kindred_core::{record_fields, TrackedCollection};
use kindred_store::{ParentEntity, Relation};
use rusqlite::Connection;

/// Tracked order line
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Line {
    pub id: String,
    pub parent_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub sku: String,
    pub qty: i64,
    pub price: f64,
}

record_fields!(tracked Line { sku: String, qty: i64, price: f64 });

pub fn line(sku: &str, qty: i64) -> Line {
    Line {
        sku: sku.to_string(),
        qty,
        price: 9.5,
        ..Default::default()
    }
}

/// Single-slot shipping address
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    pub id: i64,
    pub parent_id: i64,
    pub street: String,
    pub zip: Option<String>,
}

record_fields!(child Address { street: String, zip: Option<String> });

/// Write-once attachment
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Attachment {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub size: i64,
    pub data: Vec<u8>,
}

record_fields!(child Attachment { name: String, size: i64, data: Vec<u8> });

#[derive(Debug, Default)]
pub struct Order {
    pub id: i64,
    pub shipping: Option<Address>,
    pub attachments: Vec<Attachment>,
    pub lines: TrackedCollection<Line>,
}

impl ParentEntity for Order {
    fn table_name() -> &'static str {
        "orders"
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn relations() -> &'static [Relation<Self>] {
        static RELATIONS: OnceLock<Vec<Relation<Order>>> = OnceLock::new();
        RELATIONS.get_or_init(|| {
            vec![
                Relation::tracked("lines", |o: &mut Order| &mut o.lines),
                Relation::one_to_one("shipping", |o: &mut Order| &mut o.shipping),
                Relation::eager_list("attachments", |o: &mut Order| &mut o.attachments),
            ]
        })
    }
}

pub fn setup_test_db() -> Connection {
    Connection::open_in_memory().unwrap()
}

pub fn bound_lines(table: &str, parent_id: i64) -> TrackedCollection<Line> {
    let mut lines = TrackedCollection::new();
    lines.bind(":memory:", parent_id, table);
    lines
}

pub fn count_rows(conn: &Connection, table: &str, parent_id: i64) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM \"{}\" WHERE ParentId = ?", table),
        [parent_id],
        |row| row.get(0),
    )
    .unwrap()
}
