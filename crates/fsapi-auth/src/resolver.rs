//! Tenant derivation per entity kind
//!
//! Each entity row carries its tenant in exactly one field, and the field
//! and its encoding differ per kind.

use fsapi_esl::reply::extract_token;
use fsapi_esl::Row;

/// Contact token carrying an agent's domain
pub const AGENT_DOMAIN_TOKEN: &str = "domain_name";

/// Extracts the tenant an entity row belongs to
pub trait TenantResolver: Send + Sync {
    /// Field holding the tenant
    fn field(&self) -> &'static str;

    /// Tenant encoded in the field value; empty when none
    fn derive(&self, value: &str) -> String;

    fn resolve(&self, row: &Row) -> String {
        row.get(self.field())
            .map(|value| self.derive(value))
            .unwrap_or_default()
    }
}

/// Text after the first `@` of a `local@tenant` name
pub fn domain_suffix(name: &str) -> &str {
    name.split_once('@').map(|(_, domain)| domain).unwrap_or("")
}

/// Calls from `show calls as json`
pub struct CallResolver;

impl TenantResolver for CallResolver {
    fn field(&self) -> &'static str {
        "accountcode"
    }

    fn derive(&self, value: &str) -> String {
        value.to_string()
    }
}

/// Callcenter queues, `name` is `queue@tenant`
pub struct QueueResolver;

impl TenantResolver for QueueResolver {
    fn field(&self) -> &'static str {
        "name"
    }

    fn derive(&self, value: &str) -> String {
        domain_suffix(value).to_string()
    }
}

/// Callcenter tiers, keyed by their queue
pub struct TierResolver;

impl TenantResolver for TierResolver {
    fn field(&self) -> &'static str {
        "queue"
    }

    fn derive(&self, value: &str) -> String {
        domain_suffix(value).to_string()
    }
}

/// Callcenter agents, via the `domain_name` token in the contact string
pub struct AgentResolver;

impl TenantResolver for AgentResolver {
    fn field(&self) -> &'static str {
        "contact"
    }

    fn derive(&self, value: &str) -> String {
        extract_token(value, AGENT_DOMAIN_TOKEN)
    }
}

/// SIP registrations from `show registrations as json`
pub struct RegistrationResolver;

impl TenantResolver for RegistrationResolver {
    fn field(&self) -> &'static str {
        "realm"
    }

    fn derive(&self, value: &str) -> String {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(field: &str, value: &str) -> Row {
        let mut row = Row::new();
        row.insert(field.to_string(), value.to_string());
        row
    }

    #[test]
    fn test_domain_suffix() {
        assert_eq!(domain_suffix("support@acme.com"), "acme.com");
        assert_eq!(domain_suffix("a@b@c"), "b@c");
        assert_eq!(domain_suffix("support"), "");
        assert_eq!(domain_suffix("support@"), "");
    }

    #[test]
    fn test_resolvers() {
        assert_eq!(CallResolver.resolve(&row("accountcode", "acme.com")), "acme.com");
        assert_eq!(QueueResolver.resolve(&row("name", "q@acme.com")), "acme.com");
        assert_eq!(TierResolver.resolve(&row("queue", "q@acme.com")), "acme.com");
        assert_eq!(
            AgentResolver.resolve(&row("contact", "{domain_name=acme.com}user/1000")),
            "acme.com"
        );
        assert_eq!(
            AgentResolver.resolve(&row("contact", "[domain_name=acme.com]user/1000")),
            "acme.com]user/1000"
        );
        assert_eq!(RegistrationResolver.resolve(&row("realm", "acme.com")), "acme.com");
    }

    #[test]
    fn test_missing_field_resolves_empty() {
        assert_eq!(QueueResolver.resolve(&row("queue", "q@acme.com")), "");
        assert_eq!(CallResolver.resolve(&Row::new()), "");
    }
}
