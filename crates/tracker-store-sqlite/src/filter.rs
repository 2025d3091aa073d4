//! A tiny WHERE-clause builder for the listing queries.
//!
//! Column names come only from the static mappings in [`crate::store`]; user
//! input travels exclusively through bound parameters.

use rusqlite::types::Value;
use tracker_core::store::TimeRange;

use crate::encode::encode_dt;

#[derive(Default)]
pub struct Filter {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Filter {
  /// `column = ?` when `value` is set.
  pub fn eq(&mut self, column: &str, value: Option<&str>) -> &mut Self {
    if let Some(v) = value {
      self.conds.push(format!("{column} = ?"));
      self.params.push(Value::Text(v.to_owned()));
    }
    self
  }

  /// One comparison per bound present in `range`.
  pub fn range(&mut self, column: &str, range: &TimeRange) -> &mut Self {
    if range.is_unbounded() {
      return self;
    }
    let bounds = [("<", range.lt), ("<=", range.lte), (">", range.gt), (">=", range.gte)];
    for (op, bound) in bounds {
      if let Some(at) = bound {
        self.conds.push(format!("{column} {op} ?"));
        self.params.push(Value::Text(encode_dt(at)));
      }
    }
    self
  }

  pub fn where_clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }

  pub fn params(&self) -> Vec<Value> { self.params.clone() }

  /// Parameters followed by `LIMIT ? OFFSET ?` values.
  pub fn params_with_page(&self, limit: u32, offset: u64) -> Vec<Value> {
    let mut params = self.params();
    params.push(Value::Integer(i64::from(limit)));
    params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));
    params
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone as _, Utc};

  use super::*;

  #[test]
  fn empty_filter_has_no_where() {
    assert_eq!(Filter::default().where_clause(), "");
  }

  #[test]
  fn unbounded_range_adds_nothing() {
    let mut f = Filter::default();
    f.range("ps.date", &TimeRange::default());
    assert_eq!(f.where_clause(), "");
    assert!(f.params().is_empty());
  }

  #[test]
  fn conditions_are_anded_in_order() {
    let at = Utc.with_ymd_and_hms(2021, 8, 4, 0, 0, 0).unwrap();
    let mut f = Filter::default();
    f.eq("p.account", Some("0001"))
      .eq("p.org_id", None)
      .range("p.created_at", &TimeRange { gte: Some(at), lt: Some(at), ..Default::default() });

    assert_eq!(
      f.where_clause(),
      "WHERE p.account = ? AND p.created_at < ? AND p.created_at >= ?"
    );
    assert_eq!(f.params().len(), 3);
    assert_eq!(f.params_with_page(10, 20).len(), 5);
  }
}
