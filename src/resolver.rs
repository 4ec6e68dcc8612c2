//! # Cluster Resolver
//!
//! Interprets a set of matched records: which record anchors a cluster,
//! and which of two cluster primaries survives a merge.
//!
//! A cluster is a union-find structure flattened to one level: every
//! secondary points directly at the current primary, so resolving a
//! record's cluster is a single parent-pointer hop and never a chain walk.

use crate::error::{StoreError, StoreResult};
use crate::model::ContactRecord;
use crate::store::ContactReads;

/// Pick the primary out of one connected component of records.
///
/// Falls back to the earliest-created record if the set carries no primary;
/// that state would mean a broken single-primary invariant and cannot arise
/// from the engine's own writes.
pub fn resolve_primary(records: &[ContactRecord]) -> Option<&ContactRecord> {
    records
        .iter()
        .find(|record| record.is_primary())
        .or_else(|| records.iter().min_by_key(|record| record.creation_order()))
}

/// Given two primaries from different clusters, decide merge direction:
/// the earlier-created record survives, ties break by lower id.
pub fn choose_survivor(
    a: ContactRecord,
    b: ContactRecord,
) -> (ContactRecord, ContactRecord) {
    if a.creation_order() <= b.creation_order() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Resolve any matched record to its cluster's current primary.
///
/// Primaries resolve to themselves; secondaries follow their parent pointer
/// with a single read. A dangling or mis-typed pointer cannot arise from
/// the engine's own writes and surfaces as [`StoreError::NotFound`].
pub fn primary_of<R>(reads: &R, record: &ContactRecord) -> StoreResult<ContactRecord>
where
    R: ContactReads + ?Sized,
{
    if record.is_primary() {
        return Ok(record.clone());
    }
    let parent_id = record.linked_id.ok_or(StoreError::NotFound(record.id))?;
    reads
        .get_by_id(parent_id)?
        .filter(ContactRecord::is_primary)
        .ok_or(StoreError::NotFound(parent_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactId, LinkPrecedence, Timestamp};

    fn record(id: u64, created_at: Timestamp, precedence: LinkPrecedence) -> ContactRecord {
        ContactRecord {
            id: ContactId(id),
            email: None,
            phone: None,
            linked_id: match precedence {
                LinkPrecedence::Primary => None,
                LinkPrecedence::Secondary => Some(ContactId(1)),
            },
            precedence,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    #[test]
    fn resolve_primary_prefers_the_marked_primary() {
        let records = vec![
            record(2, 50, LinkPrecedence::Secondary),
            record(1, 100, LinkPrecedence::Primary),
        ];

        let primary = resolve_primary(&records).expect("primary");
        assert_eq!(primary.id, ContactId(1));
    }

    #[test]
    fn resolve_primary_falls_back_to_earliest_created() {
        let records = vec![
            record(3, 300, LinkPrecedence::Secondary),
            record(2, 100, LinkPrecedence::Secondary),
        ];

        let primary = resolve_primary(&records).expect("primary");
        assert_eq!(primary.id, ContactId(2));
    }

    #[test]
    fn resolve_primary_of_empty_set_is_none() {
        assert!(resolve_primary(&[]).is_none());
    }

    #[test]
    fn survivor_is_the_earlier_created_primary() {
        let older = record(5, 100, LinkPrecedence::Primary);
        let newer = record(2, 200, LinkPrecedence::Primary);

        let (survivor, demoted) = choose_survivor(newer, older);
        assert_eq!(survivor.id, ContactId(5));
        assert_eq!(demoted.id, ContactId(2));
    }

    #[test]
    fn survivor_ties_break_by_lower_id() {
        let a = record(7, 100, LinkPrecedence::Primary);
        let b = record(4, 100, LinkPrecedence::Primary);

        let (survivor, demoted) = choose_survivor(a, b);
        assert_eq!(survivor.id, ContactId(4));
        assert_eq!(demoted.id, ContactId(7));
    }
}
