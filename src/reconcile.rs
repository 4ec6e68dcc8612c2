//! # Reconciliation Engine
//!
//! The heart of the crate: given one contact observation, decide whether it
//! names an existing identity, extends one, or proves two identities are the
//! same person, then mutate the record store accordingly.
//!
//! The whole match-decide-mutate sequence runs inside a single store
//! transaction, so concurrent observations sharing an email or phone value
//! serialize against each other. A call performs at most one record
//! creation OR one cluster merge, never both, and replaying any observation
//! is mutation-free.

use crate::error::{EngineError, EngineResult, StoreError, StoreResult};
use crate::model::{ContactId, ContactRecord, LinkPrecedence, NewContact, Observation};
use crate::resolver;
use crate::store::{ContactReads, ContactStore, ContactTx};
use std::sync::Arc;

/// Transaction attempts before a persistent conflict is surfaced.
pub const DEFAULT_TX_RETRIES: u32 = 3;

/// Stateless reconciliation engine over a shared record store.
pub struct Reconciler {
    store: Arc<dyn ContactStore>,
    max_tx_retries: u32,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self::with_retries(store, DEFAULT_TX_RETRIES)
    }

    pub fn with_retries(store: Arc<dyn ContactStore>, max_tx_retries: u32) -> Self {
        Self {
            store,
            max_tx_retries: max_tx_retries.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    /// Fold one observation into the record set and return the id of the
    /// cluster primary it resolved to.
    pub fn reconcile(&self, observation: &Observation) -> EngineResult<ContactId> {
        if !observation.has_contact_point() {
            return Err(EngineError::InvalidObservation);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .store
                .with_transaction(&mut |tx| reconcile_in_tx(tx, observation))
            {
                Ok(primary) => return Ok(primary),
                Err(StoreError::Conflict(reason)) if attempt < self.max_tx_retries => {
                    tracing::debug!(attempt, reason = %reason, "retrying reconciliation after conflict");
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(EngineError::RetriesExhausted { attempts: attempt });
                }
                // Inside reconciliation every read goes through linkage the
                // engine wrote itself, so a missing row is a broken cluster,
                // not a caller mistake.
                Err(StoreError::NotFound(id)) => return Err(EngineError::ClusterNotFound(id)),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// One reconciliation pass against a transactional store view.
fn reconcile_in_tx(tx: &mut dyn ContactTx, observation: &Observation) -> StoreResult<ContactId> {
    let email = observation.email.as_deref().filter(|e| !e.is_empty());
    let phone = observation.phone.as_deref().filter(|p| !p.is_empty());

    let matches = tx.find_matching(email, phone)?;

    if matches.is_empty() {
        let record = tx.create(NewContact::primary(observation))?;
        tracing::info!(contact = %record.id, %observation, "created primary for unseen observation");
        return Ok(record.id);
    }

    // A record already storing every observed value means the observation
    // carries nothing new; resolve its cluster and leave the store untouched.
    if let Some(exact) = matches.iter().find(|record| record.covers(observation)) {
        let primary = resolver::primary_of(tx, exact)?;
        tracing::debug!(contact = %exact.id, primary = %primary.id, "observation already covered");
        return Ok(primary.id);
    }

    // find_matching returns creation order, so the first hit per field is
    // the earliest.
    let email_match = email.and_then(|e| {
        matches
            .iter()
            .find(|record| record.email.as_deref() == Some(e))
    });
    let phone_match = phone.and_then(|p| {
        matches
            .iter()
            .find(|record| record.phone.as_deref() == Some(p))
    });

    match (email_match, phone_match) {
        (Some(by_email), Some(by_phone)) => {
            let email_primary = resolver::primary_of(tx, by_email)?;
            let phone_primary = resolver::primary_of(tx, by_phone)?;
            if email_primary.id == phone_primary.id {
                // Both values already live in one cluster; replaying a
                // merge-triggering observation stays mutation-free.
                tracing::debug!(primary = %email_primary.id, "observation spans one cluster; no-op");
                Ok(email_primary.id)
            } else {
                merge_clusters(tx, email_primary, phone_primary)
            }
        }
        (Some(matched), None) | (None, Some(matched)) => {
            let primary = resolver::primary_of(tx, matched)?;
            let secondary = tx.create(NewContact::secondary(observation, primary.id))?;
            tracing::info!(
                contact = %secondary.id,
                primary = %primary.id,
                %observation,
                "created secondary for partially matched observation"
            );
            Ok(primary.id)
        }
        // Unreachable with a non-empty match set: every matched record
        // matched on a provided field. Anchor on the oldest match.
        (None, None) => match resolver::resolve_primary(&matches) {
            Some(anchor) => Ok(resolver::primary_of(tx, anchor)?.id),
            None => Err(StoreError::Unavailable(
                "match set vanished mid-transaction".to_string(),
            )),
        },
    }
}

/// Demote the newer primary under the older one and flatten its children.
///
/// Both writes commit atomically with the surrounding transaction; a
/// half-applied merge would leave secondaries pointing at a secondary and
/// must never be observable.
fn merge_clusters(
    tx: &mut dyn ContactTx,
    a: ContactRecord,
    b: ContactRecord,
) -> StoreResult<ContactId> {
    let (survivor, demoted) = resolver::choose_survivor(a, b);
    tx.update_linkage(demoted.id, LinkPrecedence::Secondary, Some(survivor.id))?;
    let rewritten = tx.reassign_children(demoted.id, survivor.id)?;
    tracing::info!(
        survivor = %survivor.id,
        demoted = %demoted.id,
        rewritten,
        "merged identity clusters"
    );
    Ok(survivor.id)
}
