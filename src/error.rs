//! # Error Taxonomy
//!
//! Typed errors for the reconciliation engine and the record store adapter.
//! Validation failures are detected before any store access; every
//! mutation-sequence error unwinds the surrounding transaction completely.

use crate::model::ContactId;
use thiserror::Error;

/// Errors surfaced by the record store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist or is soft-deleted.
    #[error("contact not found: {0}")]
    NotFound(ContactId),

    /// Serialization conflict with a concurrent transaction; transient,
    /// the caller retries the whole read-decide-write sequence.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// The store cannot be reached or refused service.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The observation carried neither an email nor a phone number.
    #[error("observation must carry an email or a phone number")]
    InvalidObservation,

    /// A primary id produced by the engine's own writes no longer
    /// resolves; indicates a broken invariant, not a caller mistake.
    #[error("cluster primary not found: {0}")]
    ClusterNotFound(ContactId),

    /// The transaction retry budget was exhausted on conflicts.
    #[error("store kept conflicting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type EngineResult<T> = Result<T, EngineError>;
