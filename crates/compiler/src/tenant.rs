//! Tenant identity threaded through every compiled query (§4.8 "Tenant
//! injection").

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub app_id: String,
    pub organization_id: String,
    pub user_id: Option<String>,
}

impl TenantContext {
    #[must_use]
    pub fn new(app_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self { app_id: app_id.into(), organization_id: organization_id.into(), user_id: None }
    }
}

/// Column names the compiler writes/reads tenant identity through.
/// Defaults match §4.8: `app_id`, `organization_id`.
#[derive(Debug, Clone)]
pub struct TenantColumns {
    pub app_id: String,
    pub organization_id: String,
}

impl Default for TenantColumns {
    fn default() -> Self {
        Self { app_id: "app_id".to_string(), organization_id: "organization_id".to_string() }
    }
}
