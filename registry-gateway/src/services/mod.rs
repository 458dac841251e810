pub mod accounts;
pub mod catalog;
pub mod error;
pub mod membership;
pub mod metrics;
pub mod provisioning;
pub mod registry;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use error::{ErrorCode, RegistryResultExt};
pub use membership::MembershipFilter;
pub use metrics::{get_metrics, init_metrics};
pub use provisioning::{ProvisioningError, ProvisioningService, RobotCredential};
pub use registry::{HarborClient, InMemoryRegistry, RegistryClient, RegistryError};
