use std::time::Duration;

use crate::cache::TtlCache;

pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(24 * 3600);

/// Backend session credentials obtained by exchanging a service user's
/// password, memoized per tenant.
///
/// Only Saba needs this today: its login call returns a certificate that is
/// then sent on every request.
#[derive(Clone)]
pub struct CredentialCache {
    certificates: TtlCache<String>,
}

impl CredentialCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            certificates: TtlCache::new(ttl),
        }
    }

    pub fn get(&self, tenant: &str) -> Option<String> {
        self.certificates.get(tenant)
    }

    pub fn store(&self, tenant: &str, certificate: String) {
        self.certificates.insert(tenant, certificate);
    }

    /// Forget a tenant's certificate so the next request logs in again.
    pub fn invalidate(&self, tenant: &str) {
        tracing::info!(tenant = %tenant, "dropping cached backend certificate");
        self.certificates.invalidate(tenant);
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_TTL)
    }
}
