use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::CanonicalJson;
use crate::error::{ValidationError, ValidationResult};

/// Kind of principal a permission identity refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityType {
    #[default]
    Unknown,
    User,
    Group,
    VirtualGroup,
}

/// An identity referenced from a document's permission sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionIdentity {
    #[serde(rename = "identityType")]
    pub identity_type: IdentityType,
    /// Security provider that owns the identity. Empty means the source's
    /// default provider.
    #[serde(rename = "securityProvider", default)]
    pub security_provider: String,
    pub identity: String,
    #[serde(
        rename = "additionalInfo",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub additional_info: BTreeMap<String, String>,
}

impl PermissionIdentity {
    pub fn new(
        identity_type: IdentityType,
        security_provider: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            identity_type,
            security_provider: security_provider.into(),
            identity: identity.into(),
            additional_info: BTreeMap::new(),
        }
    }

    pub fn with_additional_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Allowed and denied identities, evaluated together.
///
/// Overlapping allowed/denied entries are kept as given; resolving them is
/// the service's job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AllowAnonymous")]
    pub allow_anonymous: bool,
    #[serde(rename = "AllowedPermissions")]
    pub allowed: Vec<PermissionIdentity>,
    #[serde(rename = "DeniedPermissions")]
    pub denied: Vec<PermissionIdentity>,
}

impl PermissionSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_allowed(&mut self, identities: impl IntoIterator<Item = PermissionIdentity>) {
        self.allowed.extend(identities);
    }

    pub fn add_denied(&mut self, identities: impl IntoIterator<Item = PermissionIdentity>) {
        self.denied.extend(identities);
    }
}

/// An ordered level of permission sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PermissionSets")]
    pub permission_sets: Vec<PermissionSet>,
}

impl PermissionLevel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permission_sets: Vec::new(),
        }
    }

    pub fn add_permission_set(&mut self, set: PermissionSet) {
        self.permission_sets.push(set);
    }
}

/// Identity as used by the security identity (expansion) endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityExpansion {
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[serde(default)]
    pub provider: String,
    pub name: String,
    #[serde(
        rename = "additionalInfo",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub additional_info: BTreeMap<String, String>,
}

impl IdentityExpansion {
    pub fn new(
        identity_type: IdentityType,
        provider: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            identity_type,
            provider: provider.into(),
            name: name.into(),
            additional_info: BTreeMap::new(),
        }
    }

    pub fn with_additional_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Everything known about one identity: who it maps to, who its members
/// are, and which well-known groups it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionIdentityBody {
    pub identity: IdentityExpansion,
    #[serde(default)]
    pub mappings: Vec<IdentityExpansion>,
    #[serde(default)]
    pub members: Vec<IdentityExpansion>,
    #[serde(rename = "wellKnowns", default)]
    pub well_knowns: Vec<IdentityExpansion>,
}

impl PermissionIdentityBody {
    pub fn new(identity: IdentityExpansion) -> Self {
        Self {
            identity,
            mappings: Vec::new(),
            members: Vec::new(),
            well_knowns: Vec::new(),
        }
    }

    pub fn add_members(&mut self, identities: impl IntoIterator<Item = IdentityExpansion>) {
        self.members.extend(identities);
    }

    pub fn add_mappings(&mut self, identities: impl IntoIterator<Item = IdentityExpansion>) {
        self.mappings.extend(identities);
    }

    pub fn add_well_knowns(&mut self, identities: impl IntoIterator<Item = IdentityExpansion>) {
        self.well_knowns.extend(identities);
    }
}

impl PermissionIdentityBody {
    /// Parse a body from untyped JSON.
    ///
    /// `members`, `mappings` and `wellKnowns` go through
    /// [`parse_identity_list`], so a list mixing record shapes fails as a
    /// whole.
    pub fn from_json(value: &Value) -> ValidationResult<Self> {
        let obj = value.as_object().ok_or_else(|| ValidationError::MalformedIdentity {
            index: 0,
            reason: "identity body must be a JSON object".into(),
        })?;
        let identity = obj
            .get("identity")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ValidationError::MalformedIdentity {
                index: 0,
                reason: e.to_string(),
            })?
            .ok_or_else(|| ValidationError::MalformedIdentity {
                index: 0,
                reason: "missing `identity`".into(),
            })?;

        let expansions = |field: &str| -> ValidationResult<Vec<IdentityExpansion>> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(list) => parse_identity_list(list)?.into_expansions(),
            }
        };
        Ok(Self {
            identity,
            mappings: expansions("mappings")?,
            members: expansions("members")?,
            well_knowns: expansions("wellKnowns")?,
        })
    }
}

/// Payload of a permission batch upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPermissions {
    pub mappings: Vec<PermissionIdentityBody>,
    pub members: Vec<PermissionIdentityBody>,
    pub deleted: Vec<PermissionIdentityBody>,
}

impl BatchPermissions {
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.members.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len() + self.members.len() + self.deleted.len()
    }

    /// Parse a whole batch from untyped JSON, each body through
    /// [`PermissionIdentityBody::from_json`].
    pub fn from_json(value: &Value) -> ValidationResult<Self> {
        let obj = value.as_object().ok_or_else(|| ValidationError::MalformedIdentity {
            index: 0,
            reason: "permission batch must be a JSON object".into(),
        })?;
        let bodies = |field: &str| -> ValidationResult<Vec<PermissionIdentityBody>> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(Vec::new()),
                Some(Value::Array(items)) => items.iter().map(PermissionIdentityBody::from_json).collect(),
                Some(_) => Err(ValidationError::MalformedIdentity {
                    index: 0,
                    reason: format!("`{field}` must be a JSON array"),
                }),
            }
        };
        Ok(Self {
            mappings: bodies("mappings")?,
            members: bodies("members")?,
            deleted: bodies("deleted")?,
        })
    }

    pub fn extend(&mut self, other: BatchPermissions) {
        self.mappings.extend(other.mappings);
        self.members.extend(other.members);
        self.deleted.extend(other.deleted);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityProviderReference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SecurityProviderReference {
    /// Reference from a push source.
    pub fn source(source_id: impl Into<String>) -> Self {
        Self {
            id: source_id.into(),
            kind: "SOURCE".into(),
        }
    }
}

/// Definition of a security provider as sent to the platform API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityProvider {
    pub name: String,
    #[serde(rename = "nodeRequired")]
    pub node_required: bool,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "referencedBy")]
    pub referenced_by: Vec<SecurityProviderReference>,
    #[serde(rename = "cascadingSecurityProviders")]
    pub cascading_security_providers: BTreeMap<String, Value>,
}

impl CanonicalJson for PermissionIdentity {}
impl CanonicalJson for PermissionSet {}
impl CanonicalJson for PermissionLevel {}
impl CanonicalJson for IdentityExpansion {}
impl CanonicalJson for PermissionIdentityBody {}
impl CanonicalJson for BatchPermissions {}
impl CanonicalJson for SecurityProvider {}

// ---------------------------------------------------------------------------
// Untyped identity lists
// ---------------------------------------------------------------------------

/// A homogeneous list of identity records read from untyped JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityList {
    Permissions(Vec<PermissionIdentity>),
    Expansions(Vec<IdentityExpansion>),
}

impl IdentityList {
    pub fn len(&self) -> usize {
        match self {
            Self::Permissions(v) => v.len(),
            Self::Expansions(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The list as expansion identities, or an error naming the actual shape.
    pub fn into_expansions(self) -> ValidationResult<Vec<IdentityExpansion>> {
        match self {
            Self::Expansions(v) => Ok(v),
            Self::Permissions(v) if v.is_empty() => Ok(Vec::new()),
            Self::Permissions(_) => Err(ValidationError::MixedIdentityList {
                expected: "identity expansion",
                found: "permission identity",
                index: 0,
            }),
        }
    }

    /// The list as document permission identities.
    pub fn into_permissions(self) -> ValidationResult<Vec<PermissionIdentity>> {
        match self {
            Self::Permissions(v) => Ok(v),
            Self::Expansions(v) if v.is_empty() => Ok(Vec::new()),
            Self::Expansions(_) => Err(ValidationError::MixedIdentityList {
                expected: "permission identity",
                found: "identity expansion",
                index: 0,
            }),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Permission,
    Expansion,
}

impl Shape {
    fn label(self) -> &'static str {
        match self {
            Self::Permission => "permission identity",
            Self::Expansion => "identity expansion",
        }
    }

    fn detect(index: usize, record: &Value) -> ValidationResult<Self> {
        let obj = record.as_object().ok_or_else(|| ValidationError::MalformedIdentity {
            index,
            reason: "not a JSON object".into(),
        })?;
        if obj.contains_key("identityType") {
            Ok(Self::Permission)
        } else if obj.contains_key("type") && obj.contains_key("name") {
            Ok(Self::Expansion)
        } else {
            Err(ValidationError::MalformedIdentity {
                index,
                reason: "expected `identityType` or `type`/`name` fields".into(),
            })
        }
    }
}

/// Parse a JSON array of identity records.
///
/// The first record fixes the shape of the list; a record of any other
/// shape fails the whole list before anything is converted.
pub fn parse_identity_list(value: &Value) -> ValidationResult<IdentityList> {
    let records = value.as_array().ok_or_else(|| ValidationError::MalformedIdentity {
        index: 0,
        reason: "identity list must be a JSON array".into(),
    })?;

    let Some(first) = records.first() else {
        return Ok(IdentityList::Permissions(Vec::new()));
    };
    let expected = Shape::detect(0, first)?;
    for (index, record) in records.iter().enumerate().skip(1) {
        let found = Shape::detect(index, record)?;
        if found != expected {
            return Err(ValidationError::MixedIdentityList {
                expected: expected.label(),
                found: found.label(),
                index,
            });
        }
    }

    let malformed = |index: usize, e: serde_json::Error| ValidationError::MalformedIdentity {
        index,
        reason: e.to_string(),
    };
    match expected {
        Shape::Permission => records
            .iter()
            .enumerate()
            .map(|(i, r)| serde_json::from_value(r.clone()).map_err(|e| malformed(i, e)))
            .collect::<ValidationResult<Vec<_>>>()
            .map(IdentityList::Permissions),
        Shape::Expansion => records
            .iter()
            .enumerate()
            .map(|(i, r)| serde_json::from_value(r.clone()).map_err(|e| malformed(i, e)))
            .collect::<ValidationResult<Vec<_>>>()
            .map(IdentityList::Expansions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(email: &str) -> PermissionIdentity {
        PermissionIdentity::new(IdentityType::User, "", email)
    }

    #[test]
    fn identity_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&IdentityType::VirtualGroup).unwrap(),
            "\"VIRTUAL_GROUP\""
        );
        assert_eq!(serde_json::to_string(&IdentityType::User).unwrap(), "\"USER\"");
    }

    #[test]
    fn overlapping_allow_and_deny_are_kept() {
        let mut set = PermissionSet::new("Set1");
        set.add_allowed([user("a@example.com"), user("b@example.com")]);
        set.add_denied([user("a@example.com")]);
        set.add_allowed([user("a@example.com")]);

        assert_eq!(set.allowed.len(), 3);
        assert_eq!(set.denied.len(), 1);
        let json = set.to_canonical().unwrap();
        assert_eq!(json.matches("a@example.com").count(), 3);
    }

    #[test]
    fn permission_identity_json_shape() {
        let id = user("wim@example.com").with_additional_info("dept", "sales");
        let value = serde_json::to_value(&id).unwrap();
        assert_eq!(
            value,
            json!({
                "identityType": "USER",
                "securityProvider": "",
                "identity": "wim@example.com",
                "additionalInfo": {"dept": "sales"}
            })
        );
    }

    #[test]
    fn body_json_shape() {
        let mut body = PermissionIdentityBody::new(IdentityExpansion::new(
            IdentityType::Group,
            "Email Security Provider",
            "Sales",
        ));
        body.add_members([IdentityExpansion::new(IdentityType::User, "Email Security Provider", "a@x.com")]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["identity"]["type"], "GROUP");
        assert_eq!(value["members"][0]["name"], "a@x.com");
        assert_eq!(value["wellKnowns"], json!([]));
    }

    #[test]
    fn parse_homogeneous_permission_list() {
        let value = json!([
            {"identityType": "USER", "identity": "a@x.com"},
            {"identityType": "GROUP", "identity": "everyone", "securityProvider": "P"}
        ]);
        let list = parse_identity_list(&value).unwrap();
        let ids = list.into_permissions().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].security_provider, "P");
    }

    #[test]
    fn parse_homogeneous_expansion_list() {
        let value = json!([
            {"type": "USER", "name": "a@x.com", "provider": "P"},
            {"type": "USER", "name": "b@x.com", "provider": "P"}
        ]);
        let list = parse_identity_list(&value).unwrap();
        assert!(matches!(list, IdentityList::Expansions(ref v) if v.len() == 2));
    }

    #[test]
    fn batch_from_json_reads_every_section() {
        let value = json!({
            "members": [{
                "identity": {"type": "GROUP", "name": "admins", "provider": "P"},
                "members": [
                    {"type": "USER", "name": "a@x.com", "provider": "P"},
                    {"type": "USER", "name": "b@x.com", "provider": "P"}
                ]
            }],
            "deleted": [{"identity": {"type": "USER", "name": "gone@x.com", "provider": "P"}}]
        });
        let batch = BatchPermissions::from_json(&value).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.members[0].members.len(), 2);
        assert!(batch.members[0].mappings.is_empty());
        assert!(batch.mappings.is_empty());
    }

    #[test]
    fn batch_from_json_rejects_mixed_member_list() {
        let value = json!({
            "members": [{
                "identity": {"type": "GROUP", "name": "admins", "provider": "P"},
                "members": [
                    {"type": "USER", "name": "a@x.com", "provider": "P"},
                    {"identityType": "USER", "identity": "b@x.com"}
                ]
            }]
        });
        assert_eq!(
            BatchPermissions::from_json(&value),
            Err(ValidationError::MixedIdentityList {
                expected: "identity expansion",
                found: "permission identity",
                index: 1,
            })
        );
    }

    #[test]
    fn body_from_json_requires_expansions() {
        let value = json!({
            "identity": {"type": "USER", "name": "a@x.com", "provider": "P"},
            "mappings": [{"identityType": "USER", "identity": "DOMAIN\\a"}]
        });
        assert!(matches!(
            PermissionIdentityBody::from_json(&value),
            Err(ValidationError::MixedIdentityList { .. })
        ));
        assert!(matches!(
            PermissionIdentityBody::from_json(&json!({"members": []})),
            Err(ValidationError::MalformedIdentity { .. })
        ));
    }

    #[test]
    fn mixed_list_fails_eagerly() {
        let value = json!([
            {"identityType": "USER", "identity": "a@x.com"},
            {"type": "USER", "name": "b@x.com"},
            "not even an object"
        ]);
        let err = parse_identity_list(&value).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MixedIdentityList {
                expected: "permission identity",
                found: "identity expansion",
                index: 1,
            }
        );
    }

    #[test]
    fn wrong_list_kind_is_rejected() {
        let list = IdentityList::Permissions(vec![user("a@x.com")]);
        assert!(list.into_expansions().is_err());
        assert!(IdentityList::Permissions(vec![]).into_expansions().unwrap().is_empty());
    }

    #[test]
    fn security_provider_shape() {
        let provider = SecurityProvider {
            name: "Confluence".into(),
            node_required: false,
            kind: "EXPANDED".into(),
            referenced_by: vec![SecurityProviderReference::source("src-1")],
            cascading_security_providers: BTreeMap::new(),
        };
        let value = serde_json::to_value(&provider).unwrap();
        assert_eq!(value["referencedBy"][0], json!({"id": "src-1", "type": "SOURCE"}));
        assert_eq!(value["nodeRequired"], false);
    }
}
