//! Property tests: the dirty sets stay consistent under any mutation sequence

mod common;

use common::{note, Note};
use kindred_core::TrackedCollection;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Readd(usize),
    Update(usize),
    Remove(usize),
    Clear,
    Load(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Add),
        1 => (0usize..8).prop_map(Op::Readd),
        3 => (0usize..8).prop_map(Op::Update),
        3 => (0usize..8).prop_map(Op::Remove),
        1 => Just(Op::Clear),
        2 => (0usize..8).prop_map(Op::Load),
    ]
}

fn set(ids: impl Iterator<Item = impl Into<String>>) -> BTreeSet<String> {
    ids.map(Into::into).collect()
}

fn apply(c: &mut TrackedCollection<Note>, known: &mut Vec<Note>, op: Op) {
    match op {
        Op::Add => {
            let id = c.add(note("fresh"));
            if let Some(n) = c.get_by_id(&id) {
                known.push(n.clone());
            }
        }
        Op::Readd(i) => {
            if let Some(n) = known.get(i % known.len().max(1)).cloned() {
                c.add(n);
            }
        }
        Op::Update(i) => {
            if let Some(n) = known.get(i % known.len().max(1)).cloned() {
                let _ = c.update(n);
            }
        }
        Op::Remove(i) => {
            if let Some(n) = known.get(i % known.len().max(1)) {
                c.remove_by_id(&n.id.clone());
            }
        }
        Op::Clear => c.clear(),
        Op::Load(i) => {
            let n = Note {
                id: format!("db-{}", i),
                parent_id: 1,
                body: "stored".to_string(),
                created_at: 1,
                updated_at: 1,
                ..Default::default()
            };
            // Ids pending delete are refused, so they stay unreachable
            if !c.contains(&n.id) && c.load_from_database(n.clone()) {
                known.push(n);
            }
        }
    }
}

proptest! {
    #[test]
    fn dirty_sets_stay_disjoint(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut c: TrackedCollection<Note> = TrackedCollection::new();
        c.bind("mem", 1, "parents_notes");
        let mut known = Vec::new();

        for op in ops {
            apply(&mut c, &mut known, op);

            let live = set(c.iter().map(|n| n.id.clone()));
            let added = set(c.added_ids());
            let modified = set(c.modified_ids());
            let deleted = set(c.deleted_ids());

            prop_assert!(added.is_subset(&live));
            prop_assert!(added.is_disjoint(&modified));
            prop_assert!(added.is_disjoint(&deleted));
            prop_assert!(deleted.is_disjoint(&live));
            prop_assert!(c.iter().all(|n| n.parent_id == 1));
        }
    }
}

#[test]
fn test_acknowledged_collection_is_clean() {
    let mut c: TrackedCollection<Note> = TrackedCollection::new();
    c.bind("mem", 1, "parents_notes");
    c.add(note("a"));
    c.add(note("b"));
    assert!(c.is_dirty());

    c.acknowledge_inserts();
    c.acknowledge_updates();
    c.acknowledge_deletes();
    assert!(!c.is_dirty());
    assert_eq!(c.len(), 2);
}
