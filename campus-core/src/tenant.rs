//! Core multi-tenant types.

use std::fmt;

/// Sentinel tenant used for system-level writes (schools, super-admins).
pub const SYSTEM_TENANT: &str = "SYSTEM";

/// A school identifier. Every tenant-scoped row carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried with every storage operation.
///
/// Services receive it explicitly so that all reads and writes are
/// tenant-aware. The `SYSTEM` sentinel disables tenant-column forcing.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

impl TenantContext {
    /// Convenience constructor from a string.
    pub fn new<S: Into<String>>(tenant: S) -> Self {
        Self {
            tenant_id: TenantId(tenant.into()),
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_TENANT)
    }

    pub fn is_system(&self) -> bool {
        self.tenant_id.0 == SYSTEM_TENANT
    }

    pub fn id(&self) -> &str {
        self.tenant_id.as_str()
    }
}
