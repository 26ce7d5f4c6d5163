//! Per-request tenant scope

use crate::resolver::TenantResolver;
use fsapi_core::ApiError;
use fsapi_esl::Row;
use std::collections::BTreeSet;
use tracing::warn;

/// Header declaring the tenants a caller may act on
pub const ALLOWED_CONTEXTS_HEADER: &str = "X-Allowed-Contexts";

/// Token granting access to every tenant
pub const WILDCARD: &str = "*";

/// Resolved authorization state for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Unrestricted,
    Restricted(BTreeSet<String>),
}

/// What a denial is about; decides the wording of the 403 message
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A call, by uuid
    Call(&'a str),
    /// A new call placed into a dialplan context
    Originate,
    /// A `local@tenant` entity such as a queue
    Named { kind: &'a str, name: &'a str },
    /// An entity whose tenant came from the request body
    Domain { kind: &'a str },
}

impl Subject<'_> {
    fn denial(&self, tenant: &str, allowed: &str) -> String {
        match self {
            Subject::Call(uuid) => format!(
                "Call {} belongs to context '{}' which is not in your allowed contexts: [{}]",
                uuid, tenant, allowed
            ),
            Subject::Originate => format!(
                "Cannot originate call in context '{}' - not in your allowed contexts: [{}]",
                tenant, allowed
            ),
            Subject::Named { kind, name } => format!(
                "{} '{}' belongs to domain '{}' which is not in your allowed contexts: [{}]",
                kind, name, tenant, allowed
            ),
            Subject::Domain { kind } => format!(
                "{} domain '{}' is not in your allowed contexts: [{}]",
                kind, tenant, allowed
            ),
        }
    }
}

impl TenantScope {
    /// Derive the scope from the raw header value
    ///
    /// Absent or empty means unrestricted, as does a wildcard anywhere in
    /// the list. A non-empty header with no usable tokens allows nothing.
    pub fn from_header(value: Option<&str>) -> Self {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => return TenantScope::Unrestricted,
        };

        let mut tenants = BTreeSet::new();
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == WILDCARD {
                return TenantScope::Unrestricted;
            }
            tenants.insert(token.to_string());
        }

        TenantScope::Restricted(tenants)
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, TenantScope::Unrestricted)
    }

    /// An empty tenant never matches a restricted scope
    pub fn is_allowed(&self, tenant: &str) -> bool {
        match self {
            TenantScope::Unrestricted => true,
            TenantScope::Restricted(tenants) => !tenant.is_empty() && tenants.contains(tenant),
        }
    }

    /// Allowed tenants joined with `, ` for error messages
    pub fn allowed_list(&self) -> String {
        match self {
            TenantScope::Unrestricted => WILDCARD.to_string(),
            TenantScope::Restricted(tenants) => {
                tenants.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
            }
        }
    }

    /// Keep only rows whose resolved tenant is in scope
    pub fn filter_rows(&self, rows: Vec<Row>, resolver: &dyn TenantResolver) -> Vec<Row> {
        if self.is_unrestricted() {
            return rows;
        }

        rows.into_iter()
            .filter(|row| self.is_allowed(&resolver.resolve(row)))
            .collect()
    }

    /// Fail with 403 unless `tenant` is in scope
    pub fn require_allowed(&self, tenant: &str, subject: Subject<'_>) -> Result<(), ApiError> {
        if self.is_allowed(tenant) {
            return Ok(());
        }

        let message = subject.denial(tenant, &self.allowed_list());
        warn!(tenant = %tenant, "{}", message);
        Err(ApiError::Forbidden(message))
    }
}
