//! Declared resources and their attribute values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::{Reference, ResourceId, ResourceKind};

/// An opaque literal supplied by a secret source.
///
/// Carried verbatim into the synthesis output, never shown in `Debug` or
/// `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sensitive(String);

impl Sensitive {
    pub const REDACTED: &'static str = "***";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sensitive({})", Self::REDACTED)
    }
}

impl std::fmt::Display for Sensitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

/// A declared attribute value: a literal tree that may contain references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
    Ref(Reference),
    Sensitive(Sensitive),
}

impl AttrValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttrValue::String(value.into())
    }

    pub fn reference(reference: Reference) -> Self {
        AttrValue::Ref(reference)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            AttrValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Collect every reference in this value, depth-first, paired with its path.
    ///
    /// Paths are rooted at `prefix` and use `.key` for map entries and `[i]`
    /// for list items.
    pub fn references<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Reference)>) {
        match self {
            AttrValue::Ref(r) => out.push((prefix.to_string(), r)),
            AttrValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.references(&format!("{}[{}]", prefix, i), out);
                }
            }
            AttrValue::Map(entries) => {
                for (key, value) in entries {
                    value.references(&format!("{}.{}", prefix, key), out);
                }
            }
            _ => {}
        }
    }

    /// Rebuild the value, transforming every string literal.
    pub fn try_map_strings<E>(
        self,
        f: &mut impl FnMut(String) -> Result<AttrValue, E>,
    ) -> Result<AttrValue, E> {
        Ok(match self {
            AttrValue::String(s) => f(s)?,
            AttrValue::List(items) => AttrValue::List(
                items
                    .into_iter()
                    .map(|item| item.try_map_strings(&mut *f))
                    .collect::<Result<_, _>>()?,
            ),
            AttrValue::Map(entries) => AttrValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| v.try_map_strings(&mut *f).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
            other => other,
        })
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{:?}", s),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttrValue::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            AttrValue::Ref(r) => write!(f, "ref({})", r),
            AttrValue::Sensitive(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<Reference> for AttrValue {
    fn from(value: Reference) -> Self {
        AttrValue::Ref(value)
    }
}

/// An attribute value after reference resolution.
///
/// References to declared literals are replaced by the literal. References to
/// attributes only the provisioning engine can produce remain `Deferred`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<ResolvedValue>),
    Map(BTreeMap<String, ResolvedValue>),
    Sensitive(Sensitive),
    Deferred(Deferred),
}

/// Placeholder for a computed attribute, serialized as `{"deferred": "kind.name.attr"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferred {
    pub deferred: Reference,
}

impl ResolvedValue {
    pub fn deferred(reference: Reference) -> Self {
        ResolvedValue::Deferred(Deferred {
            deferred: reference,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether any part of this value still awaits the provisioning engine.
    pub fn is_deferred(&self) -> bool {
        match self {
            ResolvedValue::Deferred(_) => true,
            ResolvedValue::List(items) => items.iter().any(ResolvedValue::is_deferred),
            ResolvedValue::Map(entries) => entries.values().any(ResolvedValue::is_deferred),
            _ => false,
        }
    }

    /// Copy of this value with every sensitive literal replaced by a marker.
    pub fn redacted(&self) -> ResolvedValue {
        match self {
            ResolvedValue::Sensitive(_) => {
                ResolvedValue::Sensitive(Sensitive::new(Sensitive::REDACTED))
            }
            ResolvedValue::List(items) => {
                ResolvedValue::List(items.iter().map(ResolvedValue::redacted).collect())
            }
            ResolvedValue::Map(entries) => ResolvedValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.redacted()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Replace deferred placeholders using `lookup`, failing on the first miss.
    pub fn try_fill<E>(
        &self,
        lookup: &impl Fn(&Reference) -> Result<String, E>,
    ) -> Result<ResolvedValue, E> {
        Ok(match self {
            ResolvedValue::Deferred(d) => ResolvedValue::String(lookup(&d.deferred)?),
            ResolvedValue::List(items) => ResolvedValue::List(
                items
                    .iter()
                    .map(|item| item.try_fill(lookup))
                    .collect::<Result<_, _>>()?,
            ),
            ResolvedValue::Map(entries) => ResolvedValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| v.try_fill(lookup).map(|v| (k.clone(), v)))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        })
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Resource {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(kind, name),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Whether `attribute` can be referenced on this resource.
    pub fn exposes(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
            || self.id.kind.computed_attributes().contains(&attribute)
    }

    /// Every reference in this resource's attributes, in attribute order.
    pub fn references(&self) -> Vec<(String, &Reference)> {
        let mut out = Vec::new();
        for (name, value) in &self.attributes {
            value.references(name, &mut out);
        }
        out
    }
}

/// A resource after reference resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedResource {
    pub id: ResourceId,
    pub attributes: BTreeMap<String, ResolvedValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_is_redacted() {
        let value = AttrValue::Sensitive(Sensitive::new("ghp_token"));
        assert_eq!(value.to_string(), "***");
        assert!(!format!("{:?}", value).contains("ghp_token"));
    }

    #[test]
    fn test_sensitive_serializes_verbatim() {
        let value = ResolvedValue::Sensitive(Sensitive::new("ghp_token"));
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"ghp_token\"");
        let redacted = value.redacted();
        assert_eq!(serde_json::to_string(&redacted).unwrap(), "\"***\"");
    }

    #[test]
    fn test_nested_references_are_collected_with_paths() {
        let role: Reference = "role.Exec.arn".parse().unwrap();
        let bucket: Reference = "bucket.Store.bucket".parse().unwrap();
        let resource = Resource::new(ResourceKind::Pipeline, "Pipeline")
            .with_attr("role-arn", role.clone())
            .with_attr(
                "artifact-store",
                AttrValue::Map(BTreeMap::from([
                    ("location".to_string(), AttrValue::Ref(bucket.clone())),
                    ("type".to_string(), AttrValue::string("S3")),
                ])),
            );

        let refs = resource.references();
        assert_eq!(
            refs,
            vec![
                ("artifact-store.location".to_string(), &bucket),
                ("role-arn".to_string(), &role),
            ]
        );
    }

    #[test]
    fn test_exposes_computed_attributes() {
        let role = Resource::new(ResourceKind::Role, "Exec").with_attr("path", "/service-role/");
        assert!(role.exposes("arn"));
        assert!(role.exposes("path"));
        assert!(!role.exposes("bucket"));
    }

    #[test]
    fn test_deferred_serialization() {
        let value = ResolvedValue::deferred("role.Exec.arn".parse().unwrap());
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"deferred":"role.Exec.arn"}"#
        );
        assert!(value.is_deferred());
    }
}
