//! The acting user of a request.

use serde::{Deserialize, Serialize};

use super::TenantId;

/// The authenticated user on whose behalf an operation runs.
///
/// Authorization decisions are made against the user's tenant; the user
/// name is recorded in the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Login name, used for change-log attribution.
    pub user_name: String,
    /// The tenant the user belongs to.
    pub tenant_id: TenantId,
}

impl CurrentUser {
    /// Creates a user belonging to the given tenant.
    pub fn new(user_name: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            user_name: user_name.into(),
            tenant_id,
        }
    }
}
