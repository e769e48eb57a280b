//! Concrete resources.

mod capability;
mod federation_resolver;
mod tenant;

pub use capability::{CapabilityKey, DeliveryServiceRequiredCapability};
pub(crate) use capability::delivery_service_tenant;
pub use federation_resolver::{FederationResolver, RESOLVE4, RESOLVE6, ResolverId};
pub use tenant::{Tenant, TenantKey};
