//! Verified caller identity and the raw claims it is built from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Caller identity established by the authentication gate
///
/// Roles are kept as issued by the identity provider. They may include roles
/// the registry does not know, which simply grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub username: String,
    pub email: String,
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Claims object carried in a token payload or a userinfo response
///
/// Every field is optional. Merging a later claims object overwrites only the
/// fields it actually carries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub resource_access: Option<Map<String, Value>>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl Claims {
    /// Roles nested under `resource_access.<client_id>.roles`, falling back to
    /// the top level `roles` array when the nested list is empty
    pub fn roles_for(&self, client_id: &str) -> Vec<String> {
        let nested: Vec<String> = self
            .resource_access
            .as_ref()
            .and_then(|access| access.get(client_id))
            .and_then(|client| client.get("roles"))
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if !nested.is_empty() {
            return nested;
        }

        self.roles.clone().unwrap_or_default()
    }

    pub fn merge(&mut self, other: Claims) {
        if other.sub.is_some() {
            self.sub = other.sub;
        }
        if other.preferred_username.is_some() {
            self.preferred_username = other.preferred_username;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.resource_access.is_some() {
            self.resource_access = other.resource_access;
        }
        if other.roles.is_some() {
            self.roles = other.roles;
        }
    }

    pub fn into_identity(self, client_id: &str) -> Identity {
        let roles = self.roles_for(client_id).into_iter().collect();
        Identity {
            subject: self.sub.unwrap_or_default(),
            username: self.preferred_username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_nested_roles_take_precedence() {
        let claims = claims(json!({
            "sub": "u-1",
            "resource_access": {
                "account": {"roles": ["manage-account"]},
                "mcp-client": {"roles": ["Admin"]}
            },
            "roles": ["viewer"]
        }));

        assert_eq!(claims.roles_for("mcp-client"), vec!["Admin".to_string()]);
        assert_eq!(claims.roles_for("other"), vec!["viewer".to_string()]);
    }

    #[test]
    fn test_empty_nested_roles_fall_back_to_top_level() {
        let claims = claims(json!({
            "resource_access": {"mcp-client": {"roles": []}},
            "roles": ["user"]
        }));

        assert_eq!(claims.roles_for("mcp-client"), vec!["user".to_string()]);
    }

    #[test]
    fn test_odd_resource_access_shapes_are_ignored() {
        let claims = claims(json!({
            "resource_access": {"mcp-client": "not-an-object", "x": 3}
        }));

        assert!(claims.roles_for("mcp-client").is_empty());
    }

    #[test]
    fn test_merge_overwrites_present_fields_only() {
        let mut base = claims(json!({
            "sub": "u-1",
            "preferred_username": "ada",
            "email": "ada@example.com"
        }));
        base.merge(claims(json!({
            "email": "lovelace@example.com",
            "roles": ["viewer"]
        })));

        let identity = base.into_identity("mcp-client");
        assert_eq!(identity.subject, "u-1");
        assert_eq!(identity.username, "ada");
        assert_eq!(identity.email, "lovelace@example.com");
        assert!(identity.has_role("VIEWER"));
    }
}
