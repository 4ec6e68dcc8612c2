//! # Data Model
//!
//! Core data structures for contact identity reconciliation.
//! Includes record identification, link precedence, and the canonical
//! cluster view returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Compact identifier for contact records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(pub u64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Represents a temporal instant as UTC epoch milliseconds
/// Using i64 to support both past and future times, and to avoid floating point issues
pub type Timestamp = i64;

/// Current wall-clock time as a [`Timestamp`], normalized to UTC
pub fn now() -> Timestamp {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp() * 1_000 + i64::from(now.millisecond())
}

/// Whether a record anchors a cluster or hangs off another record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    /// The earliest-created record of a cluster; canonical identity anchor
    Primary,
    /// A record folded into a cluster after its primary was established
    Secondary,
}

/// A single durable contact observation.
///
/// Exactly one of two shapes is valid at rest: a primary with no `linked_id`,
/// or a secondary whose `linked_id` points directly at its cluster's current
/// primary (never through another secondary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Unique identifier, store-assigned and monotonically increasing
    pub id: ContactId,
    /// Normalized email address, if observed
    pub email: Option<String>,
    /// Normalized phone number, if observed
    pub phone: Option<String>,
    /// The cluster primary this record hangs off; set iff secondary
    pub linked_id: Option<ContactId>,
    /// Primary or secondary
    pub precedence: LinkPrecedence,
    /// Creation time; defines precedence ordering within a cluster
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
    /// Soft-delete marker; deleted records are invisible to matching and projection
    pub deleted_at: Option<Timestamp>,
}

impl ContactRecord {
    pub fn is_primary(&self) -> bool {
        self.precedence == LinkPrecedence::Primary
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Key that totally orders records by age: creation time, ties by id.
    pub fn creation_order(&self) -> (Timestamp, ContactId) {
        (self.created_at, self.id)
    }

    /// Whether this record already stores every contact point the
    /// observation carries. Fields absent from the observation are ignored.
    pub fn covers(&self, observation: &Observation) -> bool {
        let email_covered = match &observation.email {
            Some(email) => self.email.as_deref() == Some(email.as_str()),
            None => true,
        };
        let phone_covered = match &observation.phone {
            Some(phone) => self.phone.as_deref() == Some(phone.as_str()),
            None => true,
        };
        email_covered && phone_covered
    }
}

/// A record draft handed to the store for creation.
/// The store assigns the id and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linked_id: Option<ContactId>,
    pub precedence: LinkPrecedence,
}

impl NewContact {
    /// Draft a fresh primary carrying the observation's contact points.
    pub fn primary(observation: &Observation) -> Self {
        Self {
            email: observation.email.clone(),
            phone: observation.phone.clone(),
            linked_id: None,
            precedence: LinkPrecedence::Primary,
        }
    }

    /// Draft a secondary linked to an existing primary.
    pub fn secondary(observation: &Observation, primary: ContactId) -> Self {
        Self {
            email: observation.email.clone(),
            phone: observation.phone.clone(),
            linked_id: Some(primary),
            precedence: LinkPrecedence::Secondary,
        }
    }
}

/// An inbound contact observation: email and/or phone, already normalized
/// and syntactically validated by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Observation {
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        }
    }

    pub fn email(email: &str) -> Self {
        Self::new(Some(email), None)
    }

    pub fn phone(phone: &str) -> Self {
        Self::new(None, Some(phone))
    }

    /// An observation is actionable only if it carries at least one
    /// non-empty contact point.
    pub fn has_contact_point(&self) -> bool {
        let has_email = self.email.as_deref().is_some_and(|e| !e.is_empty());
        let has_phone = self.phone.as_deref().is_some_and(|p| !p.is_empty());
        has_email || has_phone
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{email: {}, phone: {}}}",
            self.email.as_deref().unwrap_or("-"),
            self.phone.as_deref().unwrap_or("-")
        )
    }
}

/// Canonical view of one identity cluster.
///
/// Contact points are deduplicated, the primary's own values listed first,
/// the rest in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<ContactId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, email: Option<&str>, phone: Option<&str>) -> ContactRecord {
        ContactRecord {
            id: ContactId(id),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            linked_id: None,
            precedence: LinkPrecedence::Primary,
            created_at: id as Timestamp,
            updated_at: id as Timestamp,
            deleted_at: None,
        }
    }

    #[test]
    fn covers_ignores_absent_fields() {
        let stored = record(1, Some("ada@example.com"), Some("555-0100"));

        assert!(stored.covers(&Observation::email("ada@example.com")));
        assert!(stored.covers(&Observation::phone("555-0100")));
        assert!(stored.covers(&Observation::new(
            Some("ada@example.com"),
            Some("555-0100")
        )));
    }

    #[test]
    fn covers_rejects_new_values() {
        let stored = record(1, Some("ada@example.com"), None);

        assert!(!stored.covers(&Observation::new(
            Some("ada@example.com"),
            Some("555-0100")
        )));
        assert!(!stored.covers(&Observation::email("grace@example.com")));
    }

    #[test]
    fn creation_order_breaks_ties_by_id() {
        let mut older = record(1, Some("a@example.com"), None);
        let mut newer = record(2, Some("b@example.com"), None);
        older.created_at = 100;
        newer.created_at = 100;

        assert!(older.creation_order() < newer.creation_order());
    }

    #[test]
    fn observation_requires_a_contact_point() {
        assert!(!Observation::default().has_contact_point());
        assert!(!Observation::new(Some(""), Some("")).has_contact_point());
        assert!(Observation::email("ada@example.com").has_contact_point());
        assert!(Observation::phone("555-0100").has_contact_point());
    }

    #[test]
    fn cluster_view_uses_wire_field_names() {
        let view = ClusterView {
            primary_contact_id: ContactId(1),
            emails: vec!["ada@example.com".to_string()],
            phone_numbers: vec!["555-0100".to_string()],
            secondary_contact_ids: vec![ContactId(2)],
        };

        let json = serde_json::to_value(&view).expect("serialize");
        assert!(json.get("primaryContactId").is_some());
        assert!(json.get("phoneNumbers").is_some());
        assert!(json.get("secondaryContactIds").is_some());
    }
}
