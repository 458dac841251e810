pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
pub mod utils;

use std::sync::Arc;

use config::Settings;
use services::{AccountService, CatalogService, MembershipFilter, ProvisioningService, RegistryClient};

pub use startup::{build_router, Application};

#[derive(Clone)]
pub struct AppState {
    pub provisioning: ProvisioningService,
    pub membership: MembershipFilter,
    pub catalog: CatalogService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wires every service to the same registry client.
    pub fn new(settings: &Settings, registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            provisioning: ProvisioningService::new(registry.clone(), &settings.provisioning),
            membership: MembershipFilter::new(registry.clone()),
            catalog: CatalogService::new(registry.clone()),
            accounts: AccountService::new(registry),
        }
    }
}
