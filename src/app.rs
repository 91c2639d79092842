use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{read_payload, Command};
use crate::{dashboard, format};
use tripdeck::cache::QueryCache;
use tripdeck::companies::{CompanyGateway, CompanyMutations, CompanyQueries};
use tripdeck::config::Config;
use tripdeck::error::FetchError;
use tripdeck::rest::RestClient;
use tripdeck::trips::types::{CompanyForm, CompanyPatch};
use tripdeck::trips::{RestGateway, TripForm, TripMutations, TripPatch, TripQueries};

/// Everything a command needs, wired to one shared cache
pub struct App {
  pub config: Config,
  pub trips: TripQueries<RestGateway>,
  pub mutations: TripMutations<RestGateway>,
  pub companies: CompanyQueries,
  pub company_mutations: CompanyMutations,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let rest = RestClient::from_config(&config)?;
    let cache = QueryCache::new(config.cache.clone());
    let store = Arc::new(RestGateway::new(rest.clone()));
    let company_gateway = CompanyGateway::new(rest);

    Ok(Self {
      trips: TripQueries::new(cache.clone(), Arc::clone(&store)),
      mutations: TripMutations::new(cache.clone(), store),
      companies: CompanyQueries::new(cache.clone(), company_gateway.clone()),
      company_mutations: CompanyMutations::new(cache, company_gateway),
      config,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    let page_size = self.config.default_page_size;

    match command {
      Command::List { filters, page } => {
        let page = page.pagination(page_size);
        let result = self.trips.list(filters.into_filters(), page).fetch().await;
        let page = loaded(result)?;
        print!("{}", format::trip_page(&page));
      }
      Command::Show { id } => {
        let trip = loaded(self.trips.detail(&id).fetch().await)?;
        print!("{}", format::trip_detail(&trip));
      }
      Command::Stats { company } => {
        let stats = loaded(self.trips.stats(company.as_deref()).fetch().await)?;
        print!("{}", format::stats(&stats));
      }
      Command::Recent { limit } => {
        let trips = loaded(self.trips.recent(limit).fetch().await)?;
        print!("{}", format::trip_list(&trips));
      }
      Command::ByStatus { status, page } => {
        let page = page.pagination(page_size);
        let result = self.trips.by_status(status, page).fetch().await;
        let page = loaded(result)?;
        print!("{}", format::trip_page(&page));
      }
      Command::Create { file } => {
        let form: TripForm = read_payload(&file)?;
        let trip = self.mutations.create(&form).await?;
        println!("created {}", format::trip_line(&trip));
      }
      Command::Update { id, file } => {
        let patch: TripPatch = read_payload(&file)?;
        let trip = self.mutations.update(&id, &patch).await?;
        println!("updated {}", format::trip_line(&trip));
      }
      Command::Delete { id } => {
        self.mutations.delete(&id).await?;
        println!("deleted {}", id);
      }
      Command::SetStatus { id, status, notes } => {
        let trip = self
          .mutations
          .update_status(&id, status, notes.as_deref())
          .await?;
        println!("updated {}", format::trip_line(&trip));
      }
      Command::Companies => {
        let companies = loaded(self.companies.list().fetch().await)?;
        print!("{}", format::companies(&companies));
      }
      Command::Company { id } => {
        let company = loaded(self.companies.detail(&id).fetch().await)?;
        print!("{}", format::company_detail(&company));
      }
      Command::CreateCompany { file } => {
        let form: CompanyForm = read_payload(&file)?;
        let company = self.company_mutations.create(&form).await?;
        print!("created {}", format::companies(std::slice::from_ref(&company)));
      }
      Command::UpdateCompany { id, file } => {
        let patch: CompanyPatch = read_payload(&file)?;
        let company = self.company_mutations.update(&id, &patch).await?;
        print!("updated {}", format::companies(std::slice::from_ref(&company)));
      }
      Command::Users { company } => {
        let users = loaded(self.companies.users(&company).fetch().await)?;
        print!("{}", format::users(&users));
      }
      Command::Dashboard {
        refresh_secs,
        company,
      } => {
        dashboard::run(self, Duration::from_secs(refresh_secs.max(1)), company).await?;
      }
    }

    Ok(())
  }
}

fn loaded<T>(result: Result<Arc<T>, FetchError>) -> Result<Arc<T>> {
  result.map_err(|e| eyre!("{}", e.cause()))
}
