use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declares a snake_case string enum with `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum $name {
      $($variant),+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = String;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
          .iter()
          .copied()
          .find(|v| v.as_str() == wanted)
          .ok_or_else(|| {
            let options: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
            format!("unknown {} '{}', expected one of: {}", stringify!($name), s, options.join(", "))
          })
      }
    }
  };
}

string_enum!(
  /// Where a trip is in its approval lifecycle
  TripStatus {
    Draft => "draft",
    Submitted => "submitted",
    Approved => "approved",
    Rejected => "rejected",
    InProgress => "in_progress",
    Completed => "completed",
  }
);

string_enum!(TripPurpose {
  Business => "business",
  Conference => "conference",
  Training => "training",
  ClientMeeting => "client_meeting",
});

string_enum!(TripPriority {
  Low => "low",
  Medium => "medium",
  High => "high",
  Urgent => "urgent",
});

string_enum!(TravelGrade {
  Standard => "standard",
  Business => "business",
  Premium => "premium",
});

string_enum!(BookingStatus {
  Pending => "pending",
  Confirmed => "confirmed",
  Cancelled => "cancelled",
  Completed => "completed",
});

string_enum!(TransportType {
  Flight => "flight",
  Train => "train",
  CarRental => "car_rental",
  Taxi => "taxi",
  Uber => "uber",
  Tube => "tube",
});

string_enum!(RecommendationType {
  Flights => "flights",
  Hotels => "hotels",
  Restaurants => "restaurants",
  Attractions => "attractions",
  BusinessVenues => "business_venues",
  CulturalEtiquette => "cultural_etiquette",
  LocalTips => "local_tips",
  WeatherClothing => "weather_clothing",
  NetworkingEvents => "networking_events",
});

string_enum!(ExpenseCategory {
  Meals => "meals",
  Transport => "transport",
  Accommodation => "accommodation",
  Miscellaneous => "miscellaneous",
  Conference => "conference",
  Entertainment => "entertainment",
  Communication => "communication",
});

string_enum!(ApprovalStatus {
  Pending => "pending",
  Approved => "approved",
  Rejected => "rejected",
});

/// Company travel policy limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyPolicy {
  pub max_flight_cost: f64,
  pub max_hotel_per_night: f64,
  pub requires_approval_above: f64,
}

/// Company. Embedded projections may carry only a few fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
  pub id: String,
  pub name: String,
  pub domain: String,
  pub travel_budget: f64,
  pub policy: Option<CompanyPolicy>,
  pub created_at: String,
}

/// Payload for creating a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyForm {
  pub name: String,
  pub domain: String,
  #[serde(default)]
  pub travel_budget: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub policy: Option<CompanyPolicy>,
}

/// Partial company update; unset fields are left alone by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub travel_budget: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub policy: Option<CompanyPolicy>,
}

/// Traveller or approver. Embedded projections may carry only a few fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
  pub id: String,
  pub email: String,
  pub full_name: String,
  pub company_id: String,
  pub department: String,
  pub role: String,
  pub manager_id: Option<String>,
  pub travel_grade: Option<TravelGrade>,
  pub created_at: String,
  pub company: Option<Box<Company>>,
  pub manager: Option<Box<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryActivity {
  pub time: String,
  pub activity: String,
  pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripItinerary {
  pub id: String,
  pub trip_id: String,
  pub day_number: u32,
  pub date: NaiveDate,
  #[serde(default)]
  pub activities: Vec<ItineraryActivity>,
  pub notes: Option<String>,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
  pub id: String,
  pub trip_id: String,
  pub hotel_name: String,
  pub address: Option<String>,
  pub check_in: NaiveDate,
  pub check_out: NaiveDate,
  pub room_type: Option<String>,
  pub nightly_rate: Option<f64>,
  pub total_cost: Option<f64>,
  pub booking_reference: Option<String>,
  pub status: BookingStatus,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transportation {
  pub id: String,
  pub trip_id: String,
  #[serde(rename = "type")]
  pub transport_type: TransportType,
  pub from_location: String,
  pub to_location: String,
  pub departure_time: Option<String>,
  pub arrival_time: Option<String>,
  pub cost: Option<f64>,
  pub booking_reference: Option<String>,
  pub details: Option<serde_json::Value>,
  pub status: BookingStatus,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRecommendation {
  pub id: String,
  pub trip_id: String,
  pub recommendation_type: RecommendationType,
  pub content: serde_json::Value,
  pub confidence_score: f64,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
  pub id: String,
  pub trip_id: String,
  pub category: ExpenseCategory,
  pub amount: f64,
  pub currency: String,
  pub description: Option<String>,
  pub date: NaiveDate,
  pub receipt_url: Option<String>,
  pub is_reimbursable: bool,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripApproval {
  pub id: String,
  pub trip_id: String,
  pub approver_id: String,
  pub status: ApprovalStatus,
  pub comments: Option<String>,
  pub approved_at: Option<String>,
  pub created_at: String,
  #[serde(default, alias = "users")]
  pub approver: Option<User>,
}

/// A business trip with whichever relations the projection embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub user_id: String,
  pub company_id: String,
  pub destination_city: String,
  pub destination_country: String,
  pub purpose: TripPurpose,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub total_budget: Option<f64>,
  pub actual_cost: Option<f64>,
  pub status: TripStatus,
  pub priority: TripPriority,
  pub approval_notes: Option<String>,
  pub created_at: String,
  pub updated_at: String,

  // Relations
  #[serde(default, alias = "users")]
  pub user: Option<User>,
  #[serde(default, alias = "companies")]
  pub company: Option<Company>,
  #[serde(default)]
  pub accommodations: Vec<Accommodation>,
  #[serde(default)]
  pub transportation: Vec<Transportation>,
  #[serde(default)]
  pub trip_itineraries: Vec<TripItinerary>,
  #[serde(default)]
  pub ai_recommendations: Vec<AiRecommendation>,
  #[serde(default)]
  pub expenses: Vec<Expense>,
  #[serde(default)]
  pub trip_approvals: Vec<TripApproval>,
}

/// Payload for creating a trip (validated upstream)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripForm {
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub user_id: String,
  pub company_id: String,
  pub destination_city: String,
  pub destination_country: String,
  pub purpose: TripPurpose,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_budget: Option<f64>,
  pub priority: TripPriority,
}

/// Partial update; unset fields are left alone by the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub destination_city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub destination_country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub purpose: Option<TripPurpose>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_budget: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<TripPriority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<TripStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub approval_notes: Option<String>,
}

/// Aggregates over all trips (optionally for one company)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripStats {
  pub total_trips: u64,
  pub total_budget: f64,
  pub total_spent: f64,
  pub by_status: BTreeMap<String, u64>,
  pub by_purpose: BTreeMap<String, u64>,
  pub by_priority: BTreeMap<String, u64>,
  pub average_cost: f64,
  pub upcoming_trips: u64,
  pub completed_trips: u64,
}

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
  pub page: u32,
  pub limit: u32,
}

impl Pagination {
  pub fn new(page: u32, limit: u32) -> Self {
    Self {
      page: page.max(1),
      limit,
    }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

impl Default for Pagination {
  fn default() -> Self {
    Self { page: 1, limit: 10 }
  }
}

/// One page of results plus the metadata needed to navigate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResult<T> {
  pub items: Vec<T>,
  pub page: u32,
  pub limit: u32,
  pub total: u64,
  pub total_pages: u64,
  pub has_next: bool,
  pub has_prev: bool,
}

impl<T> PaginatedResult<T> {
  pub fn new(mut items: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
    items.truncate(limit as usize);
    let total_pages = if limit == 0 {
      0
    } else {
      total.div_ceil(u64::from(limit))
    };
    Self {
      items,
      page,
      limit,
      total,
      total_pages,
      has_next: u64::from(page) < total_pages,
      has_prev: page > 1,
    }
  }
}
