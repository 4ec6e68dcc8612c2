//! # Store Module
//!
//! The record store adapter the reconciliation engine writes through, plus
//! an in-memory reference implementation with value indexes for efficient
//! email/phone lookup.
//!
//! The engine only ever needs filtered reads, single-row creates, and
//! linkage updates, all inside a serializable transactional scope. Durable
//! backends implement [`ContactStore`] with whatever isolation machinery
//! they have; [`MemoryStore`] serializes transactions with an exclusive
//! lock and commits by swapping a scratch copy, so an aborted transaction
//! leaves no trace.

use crate::error::{StoreError, StoreResult};
use crate::model::{self, ContactId, ContactRecord, LinkPrecedence, NewContact};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Read surface shared by the live store and a transaction in progress.
/// All reads exclude soft-deleted records and return creation order.
pub trait ContactReads {
    /// All non-deleted records matching the provided email OR phone.
    /// Only the clauses for fields actually present are applied.
    fn find_matching(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>>;

    /// Single-row read; `None` for unknown or soft-deleted ids.
    fn get_by_id(&self, id: ContactId) -> StoreResult<Option<ContactRecord>>;

    /// All non-deleted records whose `linked_id` equals `primary`.
    fn children_of(&self, primary: ContactId) -> StoreResult<Vec<ContactRecord>>;
}

/// Mutating view of the store inside one transactional scope.
pub trait ContactTx: ContactReads {
    /// Create a record; the store assigns the id and both timestamps.
    fn create(&mut self, draft: NewContact) -> StoreResult<ContactRecord>;

    /// Rewrite a record's precedence and primary reference in place.
    fn update_linkage(
        &mut self,
        id: ContactId,
        precedence: LinkPrecedence,
        linked_id: Option<ContactId>,
    ) -> StoreResult<()>;

    /// Re-point every record whose `linked_id` equals `old_primary` at
    /// `new_primary`. Returns the number of rows rewritten.
    fn reassign_children(
        &mut self,
        old_primary: ContactId,
        new_primary: ContactId,
    ) -> StoreResult<usize>;
}

/// Durable table of contact records.
///
/// `with_transaction` must execute the closure with serializable isolation
/// with respect to any concurrent transaction touching the same email or
/// phone values: either commit everything the closure did or nothing.
/// Backends that detect conflicts optimistically report
/// [`StoreError::Conflict`]; the engine retries the whole sequence.
pub trait ContactStore: ContactReads + Send + Sync {
    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn ContactTx) -> StoreResult<ContactId>,
    ) -> StoreResult<ContactId>;
}

/// Record table plus value indexes; the state a transaction snapshots.
#[derive(Debug, Clone, Default)]
struct StoreInner {
    /// All records by id; BTreeMap keeps id (and thus creation) order
    records: BTreeMap<ContactId, ContactRecord>,
    /// email value -> record ids carrying it
    email_index: FxHashMap<String, Vec<ContactId>>,
    /// phone value -> record ids carrying it
    phone_index: FxHashMap<String, Vec<ContactId>>,
    next_id: u64,
}

impl StoreInner {
    fn find_matching(&self, email: Option<&str>, phone: Option<&str>) -> Vec<ContactRecord> {
        let mut ids: Vec<ContactId> = Vec::new();
        if let Some(email) = email {
            if let Some(hits) = self.email_index.get(email) {
                ids.extend(hits);
            }
        }
        if let Some(phone) = phone {
            if let Some(hits) = self.phone_index.get(phone) {
                ids.extend(hits);
            }
        }
        ids.sort_unstable();
        ids.dedup();

        let mut matches: Vec<ContactRecord> = ids
            .into_iter()
            .filter_map(|id| self.records.get(&id))
            .filter(|record| !record.is_deleted())
            .cloned()
            .collect();
        matches.sort_by_key(ContactRecord::creation_order);
        matches
    }

    fn get_by_id(&self, id: ContactId) -> Option<ContactRecord> {
        self.records
            .get(&id)
            .filter(|record| !record.is_deleted())
            .cloned()
    }

    fn children_of(&self, primary: ContactId) -> Vec<ContactRecord> {
        let mut children: Vec<ContactRecord> = self
            .records
            .values()
            .filter(|record| record.linked_id == Some(primary) && !record.is_deleted())
            .cloned()
            .collect();
        children.sort_by_key(ContactRecord::creation_order);
        children
    }

    fn create(&mut self, draft: NewContact) -> ContactRecord {
        self.next_id += 1;
        let stamp = model::now();
        let record = ContactRecord {
            id: ContactId(self.next_id),
            email: draft.email,
            phone: draft.phone,
            linked_id: draft.linked_id,
            precedence: draft.precedence,
            created_at: stamp,
            updated_at: stamp,
            deleted_at: None,
        };

        if let Some(email) = &record.email {
            self.email_index
                .entry(email.clone())
                .or_default()
                .push(record.id);
        }
        if let Some(phone) = &record.phone {
            self.phone_index
                .entry(phone.clone())
                .or_default()
                .push(record.id);
        }
        self.records.insert(record.id, record.clone());
        record
    }

    fn update_linkage(
        &mut self,
        id: ContactId,
        precedence: LinkPrecedence,
        linked_id: Option<ContactId>,
    ) -> StoreResult<()> {
        let record = self
            .records
            .get_mut(&id)
            .filter(|record| !record.is_deleted())
            .ok_or(StoreError::NotFound(id))?;
        record.precedence = precedence;
        record.linked_id = linked_id;
        record.updated_at = model::now();
        Ok(())
    }

    fn reassign_children(&mut self, old_primary: ContactId, new_primary: ContactId) -> usize {
        let stamp = model::now();
        let mut rewritten = 0;
        for record in self.records.values_mut() {
            if record.linked_id == Some(old_primary) && !record.is_deleted() {
                record.linked_id = Some(new_primary);
                record.updated_at = stamp;
                rewritten += 1;
            }
        }
        rewritten
    }
}

/// In-memory contact store.
///
/// The default backend for tests and single-node deployments; durable
/// adapters replace it behind the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: parking_lot::RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, soft-deleted ones included.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Every non-deleted record in creation order. Test and audit surface,
    /// not part of the adapter contract.
    pub fn all_records(&self) -> Vec<ContactRecord> {
        let inner = self.inner.read();
        let mut records: Vec<ContactRecord> = inner
            .records
            .values()
            .filter(|record| !record.is_deleted())
            .cloned()
            .collect();
        records.sort_by_key(ContactRecord::creation_order);
        records
    }

    /// Soft-delete a record. Exercised by tests to check that deleted
    /// records stay invisible; the engine itself never deletes.
    pub fn soft_delete(&self, id: ContactId) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let stamp = model::now();
        record.deleted_at = Some(stamp);
        record.updated_at = stamp;
        Ok(())
    }
}

/// Transaction scratch space: a full copy of the store state that is
/// swapped in on commit and dropped on abort.
struct MemoryTx {
    inner: StoreInner,
}

impl ContactReads for MemoryTx {
    fn find_matching(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.inner.find_matching(email, phone))
    }

    fn get_by_id(&self, id: ContactId) -> StoreResult<Option<ContactRecord>> {
        Ok(self.inner.get_by_id(id))
    }

    fn children_of(&self, primary: ContactId) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.inner.children_of(primary))
    }
}

impl ContactTx for MemoryTx {
    fn create(&mut self, draft: NewContact) -> StoreResult<ContactRecord> {
        Ok(self.inner.create(draft))
    }

    fn update_linkage(
        &mut self,
        id: ContactId,
        precedence: LinkPrecedence,
        linked_id: Option<ContactId>,
    ) -> StoreResult<()> {
        self.inner.update_linkage(id, precedence, linked_id)
    }

    fn reassign_children(
        &mut self,
        old_primary: ContactId,
        new_primary: ContactId,
    ) -> StoreResult<usize> {
        Ok(self.inner.reassign_children(old_primary, new_primary))
    }
}

impl ContactReads for MemoryStore {
    fn find_matching(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.inner.read().find_matching(email, phone))
    }

    fn get_by_id(&self, id: ContactId) -> StoreResult<Option<ContactRecord>> {
        Ok(self.inner.read().get_by_id(id))
    }

    fn children_of(&self, primary: ContactId) -> StoreResult<Vec<ContactRecord>> {
        Ok(self.inner.read().children_of(primary))
    }
}

// Shared handles are stores too; tests hold the concrete store while the
// engine owns a clone.
impl<S> ContactReads for std::sync::Arc<S>
where
    S: ContactReads + ?Sized,
{
    fn find_matching(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>> {
        (**self).find_matching(email, phone)
    }

    fn get_by_id(&self, id: ContactId) -> StoreResult<Option<ContactRecord>> {
        (**self).get_by_id(id)
    }

    fn children_of(&self, primary: ContactId) -> StoreResult<Vec<ContactRecord>> {
        (**self).children_of(primary)
    }
}

impl<S> ContactStore for std::sync::Arc<S>
where
    S: ContactStore + ?Sized,
{
    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn ContactTx) -> StoreResult<ContactId>,
    ) -> StoreResult<ContactId> {
        (**self).with_transaction(f)
    }
}

impl ContactStore for MemoryStore {
    fn with_transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn ContactTx) -> StoreResult<ContactId>,
    ) -> StoreResult<ContactId> {
        // The write lock is held across the whole read-decide-write
        // sequence, which makes the scope serializable by construction.
        let mut inner = self.inner.write();
        let mut tx = MemoryTx {
            inner: inner.clone(),
        };
        let id = f(&mut tx)?;
        *inner = tx.inner;
        Ok(id)
    }
}
