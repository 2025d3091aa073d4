//! Dimensions: small deduplicated name→id tables.
//!
//! Service, source and status names are stored once each and referenced by
//! integer id from every status row. A name is created the first time it is
//! seen and never changes afterwards.

use serde::{Deserialize, Serialize};

/// Integer key of a dimension row.
pub type DimensionId = i64;

/// One of the three independent dimension namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
  Service,
  Source,
  Status,
}

impl Dimension {
  pub const ALL: [Dimension; 3] = [Self::Service, Self::Source, Self::Status];

  /// The table backing this namespace.
  pub fn table(self) -> &'static str {
    match self {
      Self::Service => "services",
      Self::Source => "sources",
      Self::Status => "statuses",
    }
  }
}

impl std::fmt::Display for Dimension {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Service => "service",
      Self::Source => "source",
      Self::Status => "status",
    };
    f.write_str(name)
  }
}

/// Trim and lower-case a dimension name. Returns `None` for a name that is
/// blank after trimming, which callers treat as "absent".
pub fn canonical_name(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_lowercase())
  }
}
