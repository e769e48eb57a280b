//! The concrete assignment targets.

use crate::backends::sqlite::SqliteTransaction;
use crate::error::StorageResult;
use crate::resources::{DeliveryServiceRequiredCapability, FederationResolver, delivery_service_tenant};
use crate::tenant::TenantId;

use super::Assignment;

/// Federation → federation resolvers. Federations are untenanted.
#[derive(Debug, Clone, Copy)]
pub struct FederationResolverAssignment;

impl Assignment for FederationResolverAssignment {
    type ChildId = i64;
    type Assigned = FederationResolver;

    const PARENT_NOUN: &'static str = "federation";
    const CHILD_NOUN: &'static str = "resolver";

    const PARENT_NAME_QUERY: &'static str = "SELECT cname FROM federation WHERE id = :parent_id";
    const CHILD_EXISTS_QUERY: &'static str =
        "SELECT 1 FROM federation_resolver WHERE id = :child_id";
    const CLEAR_STATEMENT: &'static str =
        "DELETE FROM federation_federation_resolver WHERE federation = :parent_id";
    const ASSOCIATE_STATEMENT: &'static str = "INSERT INTO federation_federation_resolver (federation, federation_resolver)
VALUES (:parent_id, :child_id)
ON CONFLICT DO NOTHING";
    const ASSIGNED_QUERY: &'static str = "SELECT fr.id, fr.ip_address, fr.type, fr.last_updated
FROM federation_resolver fr
JOIN federation_federation_resolver ffr ON ffr.federation_resolver = fr.id
WHERE ffr.federation = :parent_id
ORDER BY fr.id";
}

/// Delivery service → required capabilities, scoped by the delivery
/// service's tenant.
#[derive(Debug, Clone, Copy)]
pub struct RequiredCapabilityAssignment;

impl Assignment for RequiredCapabilityAssignment {
    type ChildId = String;
    type Assigned = DeliveryServiceRequiredCapability;

    const PARENT_NOUN: &'static str = "delivery service";
    const CHILD_NOUN: &'static str = "capability";

    const PARENT_NAME_QUERY: &'static str = "SELECT xml_id FROM deliveryservice WHERE id = :parent_id";
    const CHILD_EXISTS_QUERY: &'static str = "SELECT 1 FROM server_capability WHERE name = :child_id";
    const CLEAR_STATEMENT: &'static str =
        "DELETE FROM deliveryservice_required_capability WHERE deliveryservice_id = :parent_id";
    const ASSOCIATE_STATEMENT: &'static str = "INSERT INTO deliveryservice_required_capability (deliveryservice_id, required_capability)
VALUES (:parent_id, :child_id)
ON CONFLICT DO NOTHING";
    const ASSIGNED_QUERY: &'static str = "SELECT rc.required_capability, rc.deliveryservice_id, ds.xml_id, rc.last_updated
FROM deliveryservice_required_capability rc
JOIN deliveryservice ds ON ds.id = rc.deliveryservice_id
WHERE rc.deliveryservice_id = :parent_id
ORDER BY rc.required_capability";

    fn parent_tenant(parent_id: i64, tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        delivery_service_tenant(tx, parent_id)
    }
}
