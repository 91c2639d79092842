//! Command-line interface.

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use tripdeck::trips::types::{TripPriority, TripPurpose};
use tripdeck::trips::{Pagination, TripFilters, TripStatus};

#[derive(Parser, Debug)]
#[command(name = "tripdeck")]
#[command(about = "Browse and manage business trips from the terminal")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tripdeck/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List trips, newest first
  List {
    #[command(flatten)]
    filters: FilterArgs,
    #[command(flatten)]
    page: PageArgs,
  },
  /// Show one trip with its bookings, expenses and approvals
  Show { id: String },
  /// Aggregate statistics
  Stats {
    /// Restrict to one company
    #[arg(long)]
    company: Option<String>,
  },
  /// Most recently created trips
  Recent {
    #[arg(long, default_value_t = tripdeck::trips::keys::DEFAULT_RECENT_LIMIT)]
    limit: u32,
  },
  /// Trips in one status
  ByStatus {
    status: TripStatus,
    #[command(flatten)]
    page: PageArgs,
  },
  /// Create a draft trip from a YAML or JSON file
  Create {
    #[arg(long)]
    file: PathBuf,
  },
  /// Apply a partial update from a YAML or JSON file
  Update {
    id: String,
    #[arg(long)]
    file: PathBuf,
  },
  Delete { id: String },
  /// Move a trip to another status
  SetStatus {
    id: String,
    status: TripStatus,
    #[arg(long)]
    notes: Option<String>,
  },
  Companies,
  /// Show one company
  Company { id: String },
  /// Create a company from a YAML or JSON file
  CreateCompany {
    #[arg(long)]
    file: PathBuf,
  },
  /// Apply a partial company update from a YAML or JSON file
  UpdateCompany {
    id: String,
    #[arg(long)]
    file: PathBuf,
  },
  /// Members of a company
  Users {
    #[arg(long)]
    company: String,
  },
  /// Live summary that refreshes as entries go stale
  Dashboard {
    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,
    #[arg(long)]
    company: Option<String>,
  },
}

#[derive(ClapArgs, Debug, Default)]
pub struct FilterArgs {
  #[arg(long)]
  pub status: Option<TripStatus>,
  #[arg(long)]
  pub user: Option<String>,
  #[arg(long)]
  pub company: Option<String>,
  /// Substring of the destination city
  #[arg(long)]
  pub destination: Option<String>,
  #[arg(long)]
  pub purpose: Option<TripPurpose>,
  #[arg(long)]
  pub priority: Option<TripPriority>,
  /// Earliest start date (YYYY-MM-DD)
  #[arg(long)]
  pub from: Option<NaiveDate>,
  /// Latest start date (YYYY-MM-DD)
  #[arg(long)]
  pub to: Option<NaiveDate>,
  /// Free text over title, description and destination
  #[arg(long)]
  pub search: Option<String>,
}

impl FilterArgs {
  pub fn into_filters(self) -> TripFilters {
    TripFilters {
      status: self.status,
      user_id: self.user,
      company_id: self.company,
      destination: self.destination,
      purpose: self.purpose,
      priority: self.priority,
      start_date_gte: self.from,
      start_date_lte: self.to,
      search: self.search,
    }
  }
}

#[derive(ClapArgs, Debug, Default)]
pub struct PageArgs {
  #[arg(long, default_value_t = 1)]
  pub page: u32,
  /// Page size (default from config)
  #[arg(long)]
  pub limit: Option<u32>,
}

impl PageArgs {
  pub fn pagination(&self, default_limit: u32) -> Pagination {
    Pagination::new(self.page, self.limit.unwrap_or(default_limit))
  }
}

/// Read a payload file. YAML is a superset of JSON, so both parse.
pub fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_yaml::from_str(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}
