//! Stack declaration parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode, KdlValue};
use stackpipe_core::pipeline::{Action, ActionCategory, ActionOwner, ProviderBinding, Stage};
use stackpipe_core::stack::Provider;
use stackpipe_core::{AttrValue, Reference, Resource, ResourceKind, Stack};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read and parse a stack declaration file.
pub fn parse_stack_file(path: impl AsRef<Path>) -> ConfigResult<Stack> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading stack declaration");
    let content = std::fs::read_to_string(path)?;
    parse_stack(&content)
}

/// Parse a stack declaration from KDL text.
pub fn parse_stack(kdl: &str) -> ConfigResult<Stack> {
    let doc: KdlDocument = kdl.parse()?;

    let mut name = String::new();
    let mut providers = Vec::new();
    let mut resources = Vec::new();
    let mut stages = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("stack name".to_string()))?;
            }
            "provider" => {
                providers.push(parse_provider(node)?);
            }
            "resource" => {
                resources.push(parse_resource(node)?);
            }
            "pipeline" => {
                let (pipeline, pipeline_stages) = parse_pipeline(node)?;
                resources.push(pipeline);
                stages.extend(pipeline_stages);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    if name.is_empty() {
        return Err(ConfigError::MissingField("stack name".to_string()));
    }

    Ok(Stack {
        name,
        providers,
        resources,
        stages,
    })
}

fn parse_provider(node: &KdlNode) -> ConfigResult<Provider> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("provider name".to_string()))?;
    Ok(Provider {
        name,
        region: get_string_prop(node, "region"),
    })
}

fn parse_resource(node: &KdlNode) -> ConfigResult<Resource> {
    let args = get_all_string_args(node);
    let [kind, name] = args.as_slice() else {
        return Err(ConfigError::MissingField(
            "resource type and logical name".to_string(),
        ));
    };

    let kind: ResourceKind = kind.parse().map_err(|e: stackpipe_core::Error| {
        ConfigError::InvalidValue {
            field: format!("type of resource '{}'", name),
            message: e.to_string(),
        }
    })?;

    let mut resource = Resource::new(kind, name.as_str());
    if let Some(children) = node.children() {
        resource.attributes = parse_attributes(children.nodes(), &resource.id.to_string())?;
    }
    Ok(resource)
}

fn parse_pipeline(node: &KdlNode) -> ConfigResult<(Resource, Vec<Stage>)> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("pipeline name".to_string()))?;

    let mut resource = Resource::new(ResourceKind::Pipeline, name);
    let mut stages = Vec::new();

    if let Some(children) = node.children() {
        let (stage_nodes, attribute_nodes): (Vec<&KdlNode>, Vec<&KdlNode>) = children
            .nodes()
            .iter()
            .partition(|n| n.name().value() == "stage");

        resource.attributes = parse_attributes(attribute_nodes, &resource.id.to_string())?;
        for stage in stage_nodes {
            stages.push(parse_stage(stage)?);
        }
    }

    Ok((resource, stages))
}

fn parse_stage(node: &KdlNode) -> ConfigResult<Stage> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("stage name".to_string()))?;

    let mut stage = Stage::new(name);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "action" => {
                    let action = parse_action(child, &stage.name)?;
                    stage.actions.push(action);
                }
                other => warn!(stage = %stage.name, node = other, "Ignoring unknown stage node"),
            }
        }
    }
    Ok(stage)
}

fn parse_action(node: &KdlNode, stage: &str) -> ConfigResult<Action> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("action name in stage '{}'", stage)))?;
    let field = |f: &str| format!("{} of action '{}/{}'", f, stage, name);

    let category: ActionCategory = get_string_prop(node, "category")
        .ok_or_else(|| ConfigError::MissingField(field("category")))?
        .parse()
        .map_err(|e: stackpipe_core::Error| ConfigError::InvalidValue {
            field: field("category"),
            message: e.to_string(),
        })?;

    let owner: ActionOwner = match get_string_prop(node, "owner") {
        Some(owner) => owner
            .parse()
            .map_err(|e: stackpipe_core::Error| ConfigError::InvalidValue {
                field: field("owner"),
                message: e.to_string(),
            })?,
        None => ActionOwner::default(),
    };

    let provider = get_string_prop(node, "provider")
        .ok_or_else(|| ConfigError::MissingField(field("provider")))?;

    let mut binding = ProviderBinding::new(owner, provider);
    if let Some(version) = get_scalar_string_prop(node, "version") {
        binding.version = version;
    }

    let mut action = Action::new(name.as_str(), category, binding);

    // Left unset when omitted; planning reports it as an invalid run order.
    if let Some(value) = node.get("run-order") {
        let run_order = value
            .as_integer()
            .and_then(|i| i64::try_from(i).ok())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: field("run-order"),
                message: format!("expected an integer, found {}", value),
            })?;
        action.run_order = Some(run_order);
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "input" => action.input_artifacts.extend(get_all_string_args(child)),
                "output" => action.output_artifacts.extend(get_all_string_args(child)),
                "configuration" => {
                    if let Some(config) = child.children() {
                        action.configuration = parse_attributes(config.nodes(), &field("configuration"))?;
                    }
                }
                other => warn!(action = %name, node = other, "Ignoring unknown action node"),
            }
        }
    }

    Ok(action)
}

/// Parse attribute nodes into a map; each attribute may appear once.
fn parse_attributes<'a>(
    nodes: impl IntoIterator<Item = &'a KdlNode>,
    owner: &str,
) -> ConfigResult<BTreeMap<String, AttrValue>> {
    let mut attributes = BTreeMap::new();
    for node in nodes {
        let key = node.name().value().to_string();
        let field = format!("{}.{}", owner, key);
        let value = parse_value(node, &field)?;
        if attributes.insert(key, value).is_some() {
            return Err(ConfigError::InvalidValue {
                field,
                message: "declared more than once".to_string(),
            });
        }
    }
    Ok(attributes)
}

/// Parse one attribute node.
///
/// - `key ref="kind.name.attr"` is a reference
/// - `key value` is a literal
/// - `key a b c` is a list
/// - `key { ... }` is a map
fn parse_value(node: &KdlNode, field: &str) -> ConfigResult<AttrValue> {
    let args: Vec<&KdlValue> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
        .collect();

    if let Some(target) = get_string_prop(node, "ref") {
        if !args.is_empty() || node.children().is_some() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "a reference cannot also have arguments or children".to_string(),
            });
        }
        let reference: Reference = target
            .parse()
            .map_err(|e| ConfigError::InvalidReference(format!("{}: {}", field, e)))?;
        return Ok(AttrValue::Ref(reference));
    }

    match (args.as_slice(), node.children()) {
        ([], Some(children)) => Ok(AttrValue::Map(parse_attributes(children.nodes(), field)?)),
        ([], None) => Err(ConfigError::MissingField(format!("value for {}", field))),
        ([single], None) => parse_scalar(single, field),
        (many, None) => Ok(AttrValue::List(
            many.iter()
                .map(|v| parse_scalar(v, field))
                .collect::<ConfigResult<_>>()?,
        )),
        (_, Some(_)) => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: "a value cannot have both arguments and children".to_string(),
        }),
    }
}

fn parse_scalar(value: &KdlValue, field: &str) -> ConfigResult<AttrValue> {
    if let Some(s) = value.as_string() {
        return Ok(AttrValue::String(s.to_string()));
    }
    if let Some(i) = value.as_integer() {
        return i64::try_from(i)
            .map(AttrValue::Integer)
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("integer {} out of range", i),
            });
    }
    if let Some(b) = value.as_bool() {
        return Ok(AttrValue::Bool(b));
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("unsupported value {}", value),
    })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// A string property, also accepting integers (`version=1`).
fn get_scalar_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name).and_then(|v| {
        v.as_string()
            .map(|s| s.to_string())
            .or_else(|| v.as_integer().map(|i| i.to_string()))
    })
}
