//! Resource identifiers, references and action references.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Type of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    Role,
    Bucket,
    BuildProject,
    Pipeline,
    /// Any other resource type, carried through untouched.
    Custom(String),
}

impl ResourceKind {
    /// Attributes the provisioning engine computes for this kind.
    ///
    /// A reference may name one of these without the target declaring it.
    pub fn computed_attributes(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Role => &["arn", "id", "name", "unique_id"],
            ResourceKind::Bucket => &["arn", "id", "bucket", "bucket_domain_name"],
            ResourceKind::BuildProject => &["arn", "id", "name"],
            ResourceKind::Pipeline => &["arn", "id", "name"],
            ResourceKind::Custom(_) => &["id"],
        }
    }

    /// The attribute binding an executable resource to its execution role.
    pub fn role_attribute(&self) -> Option<&'static str> {
        match self {
            ResourceKind::BuildProject => Some("service-role"),
            ResourceKind::Pipeline => Some("role-arn"),
            _ => None,
        }
    }

    pub fn is_executable(&self) -> bool {
        self.role_attribute().is_some()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Role => write!(f, "role"),
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::BuildProject => write!(f, "build_project"),
            ResourceKind::Pipeline => write!(f, "pipeline"),
            ResourceKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "role" => Ok(ResourceKind::Role),
            "bucket" => Ok(ResourceKind::Bucket),
            "build_project" => Ok(ResourceKind::BuildProject),
            "pipeline" => Ok(ResourceKind::Pipeline),
            other if is_identifier(other) => Ok(ResourceKind::Custom(other.to_string())),
            other => Err(Error::InvalidInput(format!(
                "invalid resource type '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.to_string()
    }
}

/// Identity of a resource within a stack: its type plus logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{kind}.{name}")]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Reference one of this resource's attributes.
    pub fn attr(&self, attribute: impl Into<String>) -> Reference {
        Reference {
            target: self.clone(),
            attribute: attribute.into(),
        }
    }
}

impl std::str::FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('.')
            .ok_or_else(|| Error::InvalidInput(format!("invalid resource id '{}'", s)))?;
        if !is_identifier(name) {
            return Err(Error::InvalidInput(format!(
                "invalid logical name in '{}'",
                s
            )));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// A reference to another resource's attribute, written `kind.name.attribute`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{target}.{attribute}")]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub target: ResourceId,
    pub attribute: String,
}

impl std::str::FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(name), Some(attribute), None)
                if is_identifier(name) && is_identifier(attribute) =>
            {
                Ok(ResourceId::new(kind.parse()?, name).attr(attribute))
            }
            _ => Err(Error::InvalidInput(format!(
                "invalid reference '{}', expected kind.name.attribute",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.to_string()
    }
}

/// Names an action inside a pipeline, rendered `stage/action`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{stage}/{action}")]
pub struct ActionRef {
    pub stage: String,
    pub action: String,
}

impl ActionRef {
    pub fn new(stage: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            action: action.into(),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let r: Reference = "role.CodeBuildRole.arn".parse().unwrap();
        assert_eq!(r.target, ResourceId::new(ResourceKind::Role, "CodeBuildRole"));
        assert_eq!(r.attribute, "arn");
        assert_eq!(r.to_string(), "role.CodeBuildRole.arn");
    }

    #[test]
    fn test_custom_kind_round_trips_through_display() {
        let id: ResourceId = "sns_topic.Alerts".parse().unwrap();
        assert_eq!(id.kind, ResourceKind::Custom("sns_topic".to_string()));
        assert_eq!(id.to_string(), "sns_topic.Alerts");
    }

    #[test]
    fn test_reject_malformed_reference() {
        assert!("role.CodeBuildRole".parse::<Reference>().is_err());
        assert!("role.A.arn.extra".parse::<Reference>().is_err());
        assert!("role..arn".parse::<Reference>().is_err());
        assert!(".A.arn".parse::<Reference>().is_err());
    }

    #[test]
    fn test_resource_id_serializes_as_string() {
        let id = ResourceId::new(ResourceKind::BuildProject, "BuildProject");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"build_project.BuildProject\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_executable_kinds_have_role_attribute() {
        assert_eq!(ResourceKind::BuildProject.role_attribute(), Some("service-role"));
        assert_eq!(ResourceKind::Pipeline.role_attribute(), Some("role-arn"));
        assert!(!ResourceKind::Bucket.is_executable());
    }
}
