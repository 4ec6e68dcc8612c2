//! # Cluster Projector
//!
//! Reconstructs the canonical view of one identity cluster: deduplicated
//! contact points with the primary's own values first, and the secondary
//! ids in creation order.

use crate::error::{EngineError, EngineResult};
use crate::model::{ClusterView, ContactId, ContactRecord};
use crate::store::ContactReads;

/// Project the cluster anchored at `primary_id` into its canonical view.
///
/// Fails with [`EngineError::ClusterNotFound`] when the id does not resolve
/// to a live primary record.
pub fn project<R>(reads: &R, primary_id: ContactId) -> EngineResult<ClusterView>
where
    R: ContactReads + ?Sized,
{
    let primary = reads
        .get_by_id(primary_id)?
        .filter(ContactRecord::is_primary)
        .ok_or(EngineError::ClusterNotFound(primary_id))?;
    let children = reads.children_of(primary_id)?;

    let mut emails: Vec<String> = Vec::new();
    let mut phone_numbers: Vec<String> = Vec::new();
    let mut secondary_contact_ids: Vec<ContactId> = Vec::with_capacity(children.len());

    collect_contact_points(&primary, &mut emails, &mut phone_numbers);
    for child in &children {
        collect_contact_points(child, &mut emails, &mut phone_numbers);
        secondary_contact_ids.push(child.id);
    }

    Ok(ClusterView {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    })
}

/// First occurrence wins; a value shared by several records appears once.
fn collect_contact_points(
    record: &ContactRecord,
    emails: &mut Vec<String>,
    phone_numbers: &mut Vec<String>,
) {
    if let Some(email) = &record.email {
        if !emails.iter().any(|known| known == email) {
            emails.push(email.clone());
        }
    }
    if let Some(phone) = &record.phone {
        if !phone_numbers.iter().any(|known| known == phone) {
            phone_numbers.push(phone.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewContact, Observation};
    use crate::store::{ContactStore, ContactTx, MemoryStore};

    fn seed(store: &MemoryStore, draft: NewContact) -> ContactId {
        store
            .with_transaction(&mut |tx| Ok(tx.create(draft.clone())?.id))
            .expect("seed")
    }

    #[test]
    fn primary_values_come_first_and_duplicates_collapse() {
        let store = MemoryStore::new();
        let primary = seed(
            &store,
            NewContact::primary(&Observation::new(Some("ada@example.com"), Some("555-0100"))),
        );
        // Shares the primary's email, adds a new phone.
        let first_child = seed(
            &store,
            NewContact::secondary(
                &Observation::new(Some("ada@example.com"), Some("555-0101")),
                primary,
            ),
        );
        // Adds a new email, repeats the first child's phone.
        let second_child = seed(
            &store,
            NewContact::secondary(
                &Observation::new(Some("lovelace@example.com"), Some("555-0101")),
                primary,
            ),
        );

        let view = project(&store, primary).expect("project");

        assert_eq!(view.primary_contact_id, primary);
        assert_eq!(view.emails, vec!["ada@example.com", "lovelace@example.com"]);
        assert_eq!(view.phone_numbers, vec!["555-0100", "555-0101"]);
        assert_eq!(view.secondary_contact_ids, vec![first_child, second_child]);
    }

    #[test]
    fn projecting_a_missing_id_fails() {
        let store = MemoryStore::new();
        let result = project(&store, ContactId(42));
        assert!(matches!(result, Err(EngineError::ClusterNotFound(_))));
    }

    #[test]
    fn projecting_a_secondary_id_fails() {
        let store = MemoryStore::new();
        let primary = seed(
            &store,
            NewContact::primary(&Observation::email("ada@example.com")),
        );
        let secondary = seed(
            &store,
            NewContact::secondary(&Observation::phone("555-0100"), primary),
        );

        let result = project(&store, secondary);
        assert!(matches!(result, Err(EngineError::ClusterNotFound(_))));
    }

    #[test]
    fn projection_is_deterministic() {
        let store = MemoryStore::new();
        let primary = seed(
            &store,
            NewContact::primary(&Observation::email("ada@example.com")),
        );
        seed(
            &store,
            NewContact::secondary(&Observation::phone("555-0100"), primary),
        );

        let first = project(&store, primary).expect("first");
        let second = project(&store, primary).expect("second");
        assert_eq!(first, second);
    }
}
