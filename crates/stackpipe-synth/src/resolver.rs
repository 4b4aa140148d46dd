//! Resource reference resolution.
//!
//! Builds the reference graph of a stack (an edge `A -> B` when a value of `A`
//! depends on `B`), sorts it depth-first so every resource follows the
//! resources it references, checks role and artifact-store bindings, then
//! resolves attribute values in that order.

use regex::Regex;
use stackpipe_core::pipeline::{Action, ActionCategory};
use stackpipe_core::resource::ResolvedResource;
use stackpipe_core::{
    ActionRef, AttrValue, Reference, ResolvedValue, Resource, ResourceId, ResourceKind, Stack,
    SynthError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::debug;

/// Attribute holding the pipeline's artifact store.
pub const ARTIFACT_STORE: &str = "artifact-store";

/// Attribute under which the pipeline's stages are emitted.
pub const STAGES: &str = "stage";

/// Configuration key naming the CodeBuild project of a build action.
pub const PROJECT_NAME: &str = "ProjectName";

static ROLE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:iam::\d{12}:role/[A-Za-z0-9+=,.@_/-]+$")
        .expect("role ARN pattern is valid")
});

/// Resolve every resource of `stack`, returning them in dependency order.
pub fn resolve(stack: &Stack) -> Result<Vec<ResolvedResource>, SynthError> {
    let graph = ReferenceGraph::build(stack)?;
    let order = graph.topological_order()?;
    check_bindings(stack)?;

    let mut resolved: BTreeMap<&ResourceId, BTreeMap<String, ResolvedValue>> = BTreeMap::new();
    let mut result = Vec::with_capacity(order.len());

    for index in order {
        let resource = graph.resources[index];
        let mut attributes: BTreeMap<String, ResolvedValue> = resource
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), resolve_value(value, &resolved)))
            .collect();

        if graph.owner == Some(index) && !stack.stages.is_empty() {
            attributes.insert(STAGES.to_string(), emit_stages(stack, &resolved));
        }

        debug!(resource = %resource.id, attributes = attributes.len(), "Resolved resource");
        resolved.insert(&resource.id, attributes.clone());
        result.push(ResolvedResource {
            id: resource.id.clone(),
            attributes,
        });
    }

    Ok(result)
}

/// Arena of resources with index-based dependency edges.
struct ReferenceGraph<'a> {
    resources: Vec<&'a Resource>,
    /// Dependencies per resource, deduplicated, in first-seen order.
    edges: Vec<Vec<usize>>,
    /// The pipeline resource owning the stack's stages.
    owner: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl<'a> ReferenceGraph<'a> {
    fn build(stack: &'a Stack) -> Result<Self, SynthError> {
        let resources: Vec<&Resource> = stack.resources.iter().collect();

        let mut index: HashMap<&ResourceId, usize> = HashMap::new();
        for (i, resource) in resources.iter().enumerate() {
            if index.insert(&resource.id, i).is_some() {
                return Err(SynthError::DuplicateResource(resource.id.clone()));
            }
        }

        let mut pipelines = stack.pipelines();
        let owner = pipelines.next().and_then(|p| index.get(&p.id).copied());
        if !stack.stages.is_empty() {
            if let Some(second) = pipelines.next() {
                return Err(SynthError::DuplicateResource(second.id.clone()));
            }
        }

        let lookup = |from: String, reference: &Reference| -> Result<usize, SynthError> {
            let target = index
                .get(&reference.target)
                .copied()
                .filter(|&t| resources[t].exposes(&reference.attribute));
            target.ok_or_else(|| SynthError::UnresolvedReference {
                from,
                reference: reference.clone(),
            })
        };

        let mut edges = vec![Vec::new(); resources.len()];
        for (i, resource) in resources.iter().enumerate() {
            for (path, reference) in resource.references() {
                let target = lookup(format!("{}.{}", resource.id, path), reference)?;
                if !edges[i].contains(&target) {
                    edges[i].push(target);
                }
            }
        }

        for stage in &stack.stages {
            for (action_ref, action) in stage.action_refs() {
                for (path, reference) in action_references(&action_ref, action) {
                    let target = lookup(path, reference)?;
                    if let Some(owner) = owner {
                        if !edges[owner].contains(&target) {
                            edges[owner].push(target);
                        }
                    }
                }
            }
        }

        Ok(Self {
            resources,
            edges,
            owner,
        })
    }

    /// Depth-first topological sort rooted in declaration order.
    ///
    /// Iterative, so long reference chains cannot exhaust the call stack.
    fn topological_order(&self) -> Result<Vec<usize>, SynthError> {
        let mut marks = vec![Mark::Unvisited; self.resources.len()];
        let mut order = Vec::with_capacity(self.resources.len());
        // Active path: (node, index of the next edge to follow).
        let mut path: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.resources.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::Visiting;
            path.push((root, 0));

            while let Some((node, next)) = path.pop() {
                let Some(&dep) = self.edges[node].get(next) else {
                    marks[node] = Mark::Done;
                    order.push(node);
                    continue;
                };

                path.push((node, next + 1));
                match marks[dep] {
                    Mark::Done => {}
                    Mark::Visiting => return Err(self.cycle(&path, dep)),
                    Mark::Unvisited => {
                        marks[dep] = Mark::Visiting;
                        path.push((dep, 0));
                    }
                }
            }
        }
        Ok(order)
    }

    /// The cycle closed by an edge back to `node`, which is on `path`.
    fn cycle(&self, path: &[(usize, usize)], node: usize) -> SynthError {
        let start = path.iter().position(|&(n, _)| n == node).unwrap_or(0);
        SynthError::CyclicReference {
            cycle: path[start..]
                .iter()
                .map(|&(n, _)| self.resources[n].id.clone())
                .collect(),
        }
    }
}

fn action_references<'a>(action_ref: &ActionRef, action: &'a Action) -> Vec<(String, &'a Reference)> {
    let mut out = Vec::new();
    for (key, value) in &action.configuration {
        value.references(&format!("{}.configuration.{}", action_ref, key), &mut out);
    }
    out
}

/// Role, artifact-store and build-project bindings.
fn check_bindings(stack: &Stack) -> Result<(), SynthError> {
    for resource in &stack.resources {
        if let Some(attribute) = resource.id.kind.role_attribute() {
            check_role_binding(resource, attribute)?;
        }
        if resource.id.kind == ResourceKind::Pipeline {
            check_artifact_store(resource)?;
        }
    }

    for stage in &stack.stages {
        for (action_ref, action) in stage.action_refs() {
            if action.category == ActionCategory::Build && action.provider.provider == "CodeBuild"
            {
                check_project_binding(&action_ref, action)?;
            }
        }
    }
    Ok(())
}

fn check_role_binding(resource: &Resource, attribute: &str) -> Result<(), SynthError> {
    let fail = |reason: String| SynthError::RoleBinding {
        resource: resource.id.clone(),
        reason,
    };

    match resource.attr(attribute) {
        None => Err(fail(format!("missing '{}'", attribute))),
        Some(AttrValue::Ref(reference)) if reference.target.kind == ResourceKind::Role => Ok(()),
        Some(AttrValue::Ref(reference)) => Err(fail(format!(
            "'{}' references {}, which is not a role",
            attribute, reference.target
        ))),
        Some(AttrValue::String(arn)) if ROLE_ARN.is_match(arn) => Ok(()),
        Some(AttrValue::Sensitive(arn)) if ROLE_ARN.is_match(arn.expose()) => Ok(()),
        Some(AttrValue::String(_)) | Some(AttrValue::Sensitive(_)) => Err(fail(format!(
            "'{}' is not an IAM role ARN",
            attribute
        ))),
        Some(_) => Err(fail(format!(
            "'{}' must be a role reference or an IAM role ARN",
            attribute
        ))),
    }
}

fn check_artifact_store(pipeline: &Resource) -> Result<(), SynthError> {
    let subject = pipeline.id.to_string();
    let missing = |attribute: &str| SynthError::MissingAttribute {
        subject: subject.clone(),
        attribute: attribute.to_string(),
    };

    let store = pipeline
        .attr(ARTIFACT_STORE)
        .ok_or_else(|| missing(ARTIFACT_STORE))?
        .as_map()
        .ok_or_else(|| SynthError::InvalidBinding {
            subject: subject.clone(),
            reason: format!("'{}' must be a block with location and type", ARTIFACT_STORE),
        })?;

    match store.get("location") {
        None => return Err(missing("artifact-store.location")),
        Some(AttrValue::Ref(reference)) if reference.target.kind != ResourceKind::Bucket => {
            return Err(SynthError::InvalidBinding {
                subject,
                reason: format!(
                    "artifact store location references {}, which is not a bucket",
                    reference.target
                ),
            });
        }
        Some(_) => {}
    }
    if !store.contains_key("type") {
        return Err(missing("artifact-store.type"));
    }
    Ok(())
}

fn check_project_binding(action_ref: &ActionRef, action: &Action) -> Result<(), SynthError> {
    match action.configuration.get(PROJECT_NAME) {
        None => Err(SynthError::MissingAttribute {
            subject: action_ref.to_string(),
            attribute: format!("configuration.{}", PROJECT_NAME),
        }),
        Some(AttrValue::Ref(reference))
            if reference.target.kind != ResourceKind::BuildProject =>
        {
            Err(SynthError::InvalidBinding {
                subject: action_ref.to_string(),
                reason: format!(
                    "{} references {}, which is not a build project",
                    PROJECT_NAME, reference.target
                ),
            })
        }
        Some(_) => Ok(()),
    }
}

fn resolve_value(
    value: &AttrValue,
    resolved: &BTreeMap<&ResourceId, BTreeMap<String, ResolvedValue>>,
) -> ResolvedValue {
    match value {
        AttrValue::String(s) => ResolvedValue::String(s.clone()),
        AttrValue::Integer(i) => ResolvedValue::Integer(*i),
        AttrValue::Bool(b) => ResolvedValue::Bool(*b),
        AttrValue::Sensitive(s) => ResolvedValue::Sensitive(s.clone()),
        AttrValue::List(items) => {
            ResolvedValue::List(items.iter().map(|v| resolve_value(v, resolved)).collect())
        }
        AttrValue::Map(entries) => ResolvedValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, resolved)))
                .collect(),
        ),
        AttrValue::Ref(reference) => resolved
            .get(&reference.target)
            .and_then(|attrs| attrs.get(&reference.attribute))
            .cloned()
            .unwrap_or_else(|| ResolvedValue::deferred(reference.clone())),
    }
}

/// Render the stages as a `stage` attribute of the owning pipeline resource.
fn emit_stages(
    stack: &Stack,
    resolved: &BTreeMap<&ResourceId, BTreeMap<String, ResolvedValue>>,
) -> ResolvedValue {
    let strings = |items: &[String]| {
        ResolvedValue::List(items.iter().cloned().map(ResolvedValue::String).collect())
    };

    let stages = stack
        .stages
        .iter()
        .map(|stage| {
            let actions = stage
                .actions
                .iter()
                .map(|action| {
                    let mut fields = BTreeMap::from([
                        ("name".to_string(), ResolvedValue::String(action.name.clone())),
                        (
                            "category".to_string(),
                            ResolvedValue::String(action.category.to_string()),
                        ),
                        (
                            "owner".to_string(),
                            ResolvedValue::String(action.provider.owner.to_string()),
                        ),
                        (
                            "provider".to_string(),
                            ResolvedValue::String(action.provider.provider.clone()),
                        ),
                        (
                            "version".to_string(),
                            ResolvedValue::String(action.provider.version.clone()),
                        ),
                        ("input_artifacts".to_string(), strings(&action.input_artifacts)),
                        ("output_artifacts".to_string(), strings(&action.output_artifacts)),
                        (
                            "configuration".to_string(),
                            ResolvedValue::Map(
                                action
                                    .configuration
                                    .iter()
                                    .map(|(k, v)| (k.clone(), resolve_value(v, resolved)))
                                    .collect(),
                            ),
                        ),
                    ]);
                    if let Some(run_order) = action.run_order {
                        fields.insert("run_order".to_string(), ResolvedValue::Integer(run_order));
                    }
                    ResolvedValue::Map(fields)
                })
                .collect();

            ResolvedValue::Map(BTreeMap::from([
                ("name".to_string(), ResolvedValue::String(stage.name.clone())),
                ("action".to_string(), ResolvedValue::List(actions)),
            ]))
        })
        .collect();

    ResolvedValue::List(stages)
}
