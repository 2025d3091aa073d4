//! Payload: the tracked unit of work, keyed by a caller-supplied request id.
//!
//! A payload row is created by the first status event that mentions its
//! request id. Later events may only fill in identity attributes that are
//! still blank; they never erase one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal key of a payload row; stable for the row's lifetime.
pub type PayloadId = i64;

/// A stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
  pub id:           PayloadId,
  pub request_id:   String,
  pub account:      Option<String>,
  pub org_id:       Option<String>,
  pub inventory_id: Option<String>,
  pub system_id:    Option<String>,
  /// Date of the first event seen for this request id. Immutable.
  pub created_at:   DateTime<Utc>,
}

// ─── Identity fields ─────────────────────────────────────────────────────────

/// The optional identity attributes a status message may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
  Account,
  OrgId,
  InventoryId,
  SystemId,
}

impl IdentityField {
  pub const ALL: [IdentityField; 4] =
    [Self::Account, Self::OrgId, Self::InventoryId, Self::SystemId];

  /// Column name in the `payloads` table.
  pub fn column(self) -> &'static str {
    match self {
      Self::Account => "account",
      Self::OrgId => "org_id",
      Self::InventoryId => "inventory_id",
      Self::SystemId => "system_id",
    }
  }
}

/// Identity attributes carried by one event. Blank strings are normalised to
/// `None` on construction so "present" always means "non-blank".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadIdentity {
  pub account:      Option<String>,
  pub org_id:       Option<String>,
  pub inventory_id: Option<String>,
  pub system_id:    Option<String>,
}

impl PayloadIdentity {
  pub fn new(
    account: Option<String>,
    org_id: Option<String>,
    inventory_id: Option<String>,
    system_id: Option<String>,
  ) -> Self {
    Self {
      account:      non_blank(account),
      org_id:       non_blank(org_id),
      inventory_id: non_blank(inventory_id),
      system_id:    non_blank(system_id),
    }
  }

  pub fn get(&self, field: IdentityField) -> Option<&str> {
    match field {
      IdentityField::Account => self.account.as_deref(),
      IdentityField::OrgId => self.org_id.as_deref(),
      IdentityField::InventoryId => self.inventory_id.as_deref(),
      IdentityField::SystemId => self.system_id.as_deref(),
    }
  }

  /// The fields an upsert is allowed to write over an existing row: exactly
  /// the ones that are non-blank in this event.
  pub fn present_fields(&self) -> Vec<IdentityField> {
    IdentityField::ALL
      .into_iter()
      .filter(|f| self.get(*f).is_some())
      .collect()
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// Input to [`crate::store::TrackerStore::upsert_payload`].
#[derive(Debug, Clone)]
pub struct NewPayload {
  pub request_id: String,
  pub identity:   PayloadIdentity,
  /// Used only when the row is created; ignored on conflict.
  pub created_at: DateTime<Utc>,
}
