//! Shared helpers for integration tests and benches: record seeding and a
//! whole-store invariant checker.

use crate::model::{ContactId, ContactRecord, LinkPrecedence, NewContact, Observation};
use crate::store::{ContactStore, ContactTx, MemoryStore};

/// Seed a primary record directly, bypassing the engine.
pub fn seed_primary(store: &MemoryStore, email: Option<&str>, phone: Option<&str>) -> ContactId {
    let observation = Observation::new(email, phone);
    store
        .with_transaction(&mut |tx| Ok(tx.create(NewContact::primary(&observation))?.id))
        .expect("seed primary")
}

/// Seed a secondary record directly, bypassing the engine.
pub fn seed_secondary(
    store: &MemoryStore,
    primary: ContactId,
    email: Option<&str>,
    phone: Option<&str>,
) -> ContactId {
    let observation = Observation::new(email, phone);
    store
        .with_transaction(&mut |tx| Ok(tx.create(NewContact::secondary(&observation, primary))?.id))
        .expect("seed secondary")
}

/// Synthetic contact points for generated workloads.
pub fn synthetic_email(n: usize) -> String {
    format!("person_{n:06}@example.com")
}

pub fn synthetic_phone(n: usize) -> String {
    format!("555{n:07}")
}

/// Assert the structural invariants over the full record set:
///
/// - every live record is a primary with no parent or a secondary whose
///   parent is a live primary (never another secondary);
/// - no secondary predates its primary;
/// - every connected component under shared email/phone values contains
///   exactly one primary, and it is the earliest-created member.
///
/// Panics with a description of the first violation found.
pub fn assert_invariants(store: &MemoryStore) {
    let records = store.all_records();

    for record in &records {
        match record.precedence {
            LinkPrecedence::Primary => {
                assert!(
                    record.linked_id.is_none(),
                    "primary {} carries a parent pointer",
                    record.id
                );
            }
            LinkPrecedence::Secondary => {
                let parent_id = record
                    .linked_id
                    .unwrap_or_else(|| panic!("secondary {} has no parent pointer", record.id));
                let parent = records
                    .iter()
                    .find(|candidate| candidate.id == parent_id)
                    .unwrap_or_else(|| panic!("secondary {} points at missing {}", record.id, parent_id));
                assert!(
                    parent.is_primary(),
                    "secondary {} points at secondary {}",
                    record.id,
                    parent.id
                );
                assert!(
                    parent.creation_order() <= record.creation_order(),
                    "secondary {} predates its primary {}",
                    record.id,
                    parent.id
                );
            }
        }
    }

    // Union records connected by shared values, then check each component
    // resolves to a single primary.
    let mut parent: Vec<usize> = (0..records.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            let grandparent = parent[parent[i]];
            parent[i] = grandparent;
            i = grandparent;
        }
        i
    }
    for a in 0..records.len() {
        for b in (a + 1)..records.len() {
            let shared_email = records[a].email.is_some() && records[a].email == records[b].email;
            let shared_phone = records[a].phone.is_some() && records[a].phone == records[b].phone;
            let linked = records[a].linked_id == Some(records[b].id)
                || records[b].linked_id == Some(records[a].id);
            if shared_email || shared_phone || linked {
                let root_a = find(&mut parent, a);
                let root_b = find(&mut parent, b);
                if root_a != root_b {
                    parent[root_a] = root_b;
                }
            }
        }
    }

    for root in 0..records.len() {
        if find(&mut parent, root) != root {
            continue;
        }
        let component: Vec<&ContactRecord> = (0..records.len())
            .filter(|&i| find(&mut parent, i) == root)
            .map(|i| &records[i])
            .collect();
        let primaries: Vec<&&ContactRecord> =
            component.iter().filter(|record| record.is_primary()).collect();
        assert_eq!(
            primaries.len(),
            1,
            "component of {} records has {} primaries",
            component.len(),
            primaries.len()
        );
        let primary = primaries[0];
        let earliest = component
            .iter()
            .min_by_key(|record| record.creation_order())
            .expect("non-empty component");
        assert_eq!(
            primary.id, earliest.id,
            "primary {} is not the earliest-created member",
            primary.id
        );
        for record in &component {
            if !record.is_primary() {
                assert_eq!(
                    record.linked_id,
                    Some(primary.id),
                    "secondary {} not flattened onto {}",
                    record.id,
                    primary.id
                );
            }
        }
    }
}
