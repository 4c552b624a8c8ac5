use serde::{Deserialize, Serialize};

/// Claims carried by the hub's JWT.
///
/// The hub identifies the user through `prn` (`<username>@<tenant>`) and
/// usually also sends explicit `tenant` and `email` claims.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectorClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub prn: Option<String>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: i64,
}

impl ConnectorClaims {
    /// Username as known to the backend: `prn` up to the `@`, else `sub`.
    pub fn username(&self) -> Option<&str> {
        match self.prn.as_deref() {
            Some(prn) => prn.split('@').next().filter(|s| !s.is_empty()),
            None => self.sub.as_deref(),
        }
    }

    /// Tenant id: the `tenant` claim, else the part of `prn` after the `@`.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_deref().or_else(|| {
            self.prn
                .as_deref()
                .and_then(|prn| prn.split_once('@'))
                .map(|(_, tenant)| tenant)
                .filter(|s| !s.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_from_prn() {
        let claims = ConnectorClaims {
            prn: Some("jdoe@acme".into()),
            sub: Some("ignored".into()),
            ..Default::default()
        };
        assert_eq!(claims.username(), Some("jdoe"));
        assert_eq!(claims.tenant_id(), Some("acme"));
    }

    #[test]
    fn test_explicit_tenant_wins() {
        let claims = ConnectorClaims {
            prn: Some("jdoe@acme".into()),
            tenant: Some("acme-prod".into()),
            ..Default::default()
        };
        assert_eq!(claims.tenant_id(), Some("acme-prod"));
    }

    #[test]
    fn test_fallbacks_without_prn() {
        let claims = ConnectorClaims {
            sub: Some("svc-user".into()),
            ..Default::default()
        };
        assert_eq!(claims.username(), Some("svc-user"));
        assert_eq!(claims.tenant_id(), None);
    }
}
