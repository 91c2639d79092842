//! Trip list filters and their translation into store parameters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{Pagination, TripPriority, TripPurpose, TripStatus};
use crate::rest::QueryParams;

/// Filters accepted by the trip list. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripFilters {
  pub status: Option<TripStatus>,
  pub user_id: Option<String>,
  pub company_id: Option<String>,
  /// Substring of the destination city
  pub destination: Option<String>,
  pub purpose: Option<TripPurpose>,
  pub priority: Option<TripPriority>,
  pub start_date_gte: Option<NaiveDate>,
  pub start_date_lte: Option<NaiveDate>,
  /// Free text over title, description and destination city
  pub search: Option<String>,
}

impl TripFilters {
  pub fn with_status(status: TripStatus) -> Self {
    Self {
      status: Some(status),
      ..Default::default()
    }
  }

  /// Append the store conditions for every set filter.
  pub fn apply(&self, mut params: QueryParams) -> QueryParams {
    if let Some(status) = self.status {
      params = params.eq("status", status.as_str());
    }
    if let Some(user_id) = &self.user_id {
      params = params.eq("user_id", user_id);
    }
    if let Some(company_id) = &self.company_id {
      params = params.eq("company_id", company_id);
    }
    if let Some(destination) = &self.destination {
      params = params.ilike("destination_city", destination);
    }
    if let Some(purpose) = self.purpose {
      params = params.eq("purpose", purpose.as_str());
    }
    if let Some(priority) = self.priority {
      params = params.eq("priority", priority.as_str());
    }
    if let Some(from) = self.start_date_gte {
      params = params.gte("start_date", from.to_string());
    }
    if let Some(to) = self.start_date_lte {
      params = params.lte("start_date", to.to_string());
    }
    if let Some(search) = &self.search {
      let conditions: Vec<String> = ["title", "description", "destination_city"]
        .iter()
        .map(|column| format!("{}.ilike.{}", column, quoted(&format!("%{}%", search))))
        .collect();
      params = params.or(&conditions);
    }
    params
  }

  /// Cache key segment: an object holding only the set filters.
  pub fn key_segment(&self) -> Value {
    let mut map = Map::new();
    let mut put = |name: &str, value: Option<String>| {
      if let Some(value) = value {
        map.insert(name.to_string(), Value::String(value));
      }
    };
    put("status", self.status.map(|s| s.as_str().to_string()));
    put("user_id", self.user_id.clone());
    put("company_id", self.company_id.clone());
    put("destination", self.destination.clone());
    put("purpose", self.purpose.map(|p| p.as_str().to_string()));
    put("priority", self.priority.map(|p| p.as_str().to_string()));
    put("start_date_gte", self.start_date_gte.map(|d| d.to_string()));
    put("start_date_lte", self.start_date_lte.map(|d| d.to_string()));
    put("search", self.search.clone());
    Value::Object(map)
  }
}

/// Double-quote a value inside a disjunction so `,` `(` and `)` stay literal.
fn quoted(value: &str) -> String {
  let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
  format!("\"{}\"", escaped)
}

impl Pagination {
  pub fn key_segment(&self) -> Value {
    serde_json::json!({ "page": self.page, "limit": self.limit })
  }
}
