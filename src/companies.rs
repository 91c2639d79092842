//! Company and user reads, and company writes.
//!
//! Creating or updating a company writes its detail entry and invalidates
//! the company list. A failed write leaves the cache untouched.

use serde_json::json;
use tracing::info;

use crate::cache::{QueryCache, QueryKey, QueryKind};
use crate::error::{GatewayError, MutationError, MutationKind};
use crate::query::Query;
use crate::rest::{QueryParams, RestClient};
use crate::trips::mutations::settle;
use crate::trips::types::{Company, CompanyForm, CompanyPatch, User};

const TABLE: &str = "companies";

const USERS_PROJECTION: &str = "
  *,
  company:companies(name, domain),
  manager:users(full_name, email)
";

/// Access to the `companies` and `users` tables.
#[derive(Clone)]
pub struct CompanyGateway {
  rest: RestClient,
}

impl CompanyGateway {
  pub fn new(rest: RestClient) -> Self {
    Self { rest }
  }

  /// All companies, alphabetically.
  pub async fn list_companies(&self) -> Result<Vec<Company>, GatewayError> {
    let params = QueryParams::new().select("*").order("name.asc");
    self.rest.get(TABLE, &params).await
  }

  pub async fn get_company(&self, id: &str) -> Result<Company, GatewayError> {
    let rows: Vec<Company> = self.rest.get(TABLE, &QueryParams::new().eq("id", id)).await?;
    single(rows, id)
  }

  pub async fn create_company(&self, form: &CompanyForm) -> Result<Company, GatewayError> {
    let rows: Vec<Company> = self.rest.post(TABLE, form).await?;
    single(rows, "new")
  }

  /// Fails with `NotFound` when no row matches `id`.
  pub async fn update_company(
    &self,
    id: &str,
    patch: &CompanyPatch,
  ) -> Result<Company, GatewayError> {
    let params = QueryParams::new().eq("id", id);
    let rows: Vec<Company> = self.rest.patch(TABLE, &params, patch).await?;
    single(rows, id)
  }

  /// Members of a company with their company and manager embedded.
  pub async fn users_by_company(&self, company_id: &str) -> Result<Vec<User>, GatewayError> {
    let params = QueryParams::new()
      .select(USERS_PROJECTION)
      .eq("company_id", company_id)
      .order("full_name.asc");
    self.rest.get("users", &params).await
  }
}

fn single(rows: Vec<Company>, id: &str) -> Result<Company, GatewayError> {
  rows.into_iter().next().ok_or_else(|| GatewayError::NotFound {
    entity: "company",
    id: id.to_string(),
  })
}

pub mod company_keys {
  use super::*;

  pub fn list() -> QueryKey {
    QueryKey::new("companies").kind_segment(QueryKind::List)
  }

  pub fn detail(id: &str) -> QueryKey {
    QueryKey::new("companies")
      .kind_segment(QueryKind::Detail)
      .push(id)
  }

  pub fn users(company_id: &str) -> QueryKey {
    QueryKey::new("users")
      .kind_segment(QueryKind::List)
      .push(json!({ "company_id": company_id }))
  }
}

/// Cached company reads.
#[derive(Clone)]
pub struct CompanyQueries {
  cache: QueryCache,
  gateway: CompanyGateway,
}

impl CompanyQueries {
  pub fn new(cache: QueryCache, gateway: CompanyGateway) -> Self {
    Self { cache, gateway }
  }

  pub fn list(&self) -> Query<Vec<Company>> {
    let gateway = self.gateway.clone();
    Query::new(self.cache.clone(), company_keys::list(), move || {
      let gateway = gateway.clone();
      async move { gateway.list_companies().await }
    })
  }

  pub fn detail(&self, id: &str) -> Query<Company> {
    let gateway = self.gateway.clone();
    let id = id.to_string();
    Query::new(self.cache.clone(), company_keys::detail(&id), move || {
      let gateway = gateway.clone();
      let id = id.clone();
      async move { gateway.get_company(&id).await }
    })
  }

  pub fn users(&self, company_id: &str) -> Query<Vec<User>> {
    let gateway = self.gateway.clone();
    let company_id = company_id.to_string();
    Query::new(self.cache.clone(), company_keys::users(&company_id), move || {
      let gateway = gateway.clone();
      let company_id = company_id.clone();
      async move { gateway.users_by_company(&company_id).await }
    })
  }
}

#[derive(Clone)]
pub struct CompanyMutations {
  cache: QueryCache,
  gateway: CompanyGateway,
}

impl CompanyMutations {
  pub fn new(cache: QueryCache, gateway: CompanyGateway) -> Self {
    Self { cache, gateway }
  }

  pub async fn create(&self, form: &CompanyForm) -> Result<Company, MutationError> {
    let company = settle(
      MutationKind::CreateCompany,
      self.gateway.create_company(form).await,
    )?;
    info!(id = %company.id, "company created");

    self.write_detail_and_invalidate(&company);
    Ok(company)
  }

  pub async fn update(&self, id: &str, patch: &CompanyPatch) -> Result<Company, MutationError> {
    let company = settle(
      MutationKind::UpdateCompany,
      self.gateway.update_company(id, patch).await,
    )?;
    info!(id = %company.id, "company updated");

    self.write_detail_and_invalidate(&company);
    Ok(company)
  }

  fn write_detail_and_invalidate(&self, company: &Company) {
    self
      .cache
      .write(&company_keys::detail(&company.id), company.clone());
    self.cache.invalidate(&company_keys::list());
  }
}
