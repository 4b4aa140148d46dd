//! Stack synthesis: resolver, artifact validator and ordering engine in sequence.

use stackpipe_core::{Stack, SynthError, Synthesis};
use tracing::{info, warn};

use crate::artifacts::validate_artifacts;
use crate::ordering::plan_execution;
use crate::resolver::resolve;

/// Synthesize `stack` into a provisioning plan.
///
/// Fails on the first error, checking references, then artifacts, then run
/// orders. Identical input always produces identical output.
pub fn synthesize(stack: &Stack) -> Result<Synthesis, SynthError> {
    info!(
        stack = %stack.name,
        resources = stack.resources.len(),
        stages = stack.stages.len(),
        "Synthesizing stack"
    );

    let result = resolve(stack).and_then(|resolved_resources| {
        let artifact_map = validate_artifacts(&stack.stages)?;
        let execution_plan = plan_execution(&stack.stages, &artifact_map)?;
        Ok(Synthesis {
            stack: stack.name.clone(),
            providers: stack.providers.clone(),
            resolved_resources,
            execution_plan,
            artifact_map,
        })
    });

    match &result {
        Ok(synthesis) => info!(
            stack = %stack.name,
            waves = synthesis.execution_plan.waves().count(),
            artifacts = synthesis.artifact_map.len(),
            "Synthesis complete"
        ),
        Err(e) => warn!(stack = %stack.name, kind = e.kind(), error = %e, "Synthesis failed"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpipe_core::pipeline::{Action, ActionCategory, ActionOwner, ProviderBinding, Stage};
    use stackpipe_core::resource::Resource;
    use stackpipe_core::{AttrValue, Reference, ResourceKind};
    use std::collections::BTreeMap;

    const BUILD_ROLE: &str = "arn:aws:iam::567404226201:role/service-role/gateway_automation";
    const PIPELINE_ROLE: &str = "arn:aws:iam::567404226201:role/service-role/codebuild-stage_gateway_automation-service-role";

    fn source_action() -> Action {
        Action::new(
            "SourceAction",
            ActionCategory::Source,
            ProviderBinding::new(ActionOwner::ThirdParty, "GitHub"),
        )
        .with_run_order(1)
        .with_output("source_output")
        .with_config("Owner", "harsha81860")
        .with_config("Repo", "cdktf-pipeline")
        .with_config("Branch", "main")
    }

    fn build_action(input: &str) -> Action {
        Action::new(
            "BuildAction",
            ActionCategory::Build,
            ProviderBinding::new(ActionOwner::Aws, "CodeBuild"),
        )
        .with_run_order(1)
        .with_input(input)
        .with_config(
            "ProjectName",
            "build_project.BuildProject.name".parse::<Reference>().unwrap(),
        )
    }

    fn demo_stack(build_input: &str) -> Stack {
        Stack::new("CdktfPipelineStack")
            .with_provider("aws", Some("eu-west-2".to_string()))
            .with_resource(
                Resource::new(ResourceKind::BuildProject, "BuildProject")
                    .with_attr("name", "cdktf-build-project")
                    .with_attr("service-role", BUILD_ROLE),
            )
            .with_resource(
                Resource::new(ResourceKind::Pipeline, "Pipeline")
                    .with_attr("name", "cdktf-demo-pipeline")
                    .with_attr("role-arn", PIPELINE_ROLE)
                    .with_attr(
                        "artifact-store",
                        AttrValue::Map(BTreeMap::from([
                            (
                                "location".to_string(),
                                AttrValue::string("codepipeline-eu-west-2-919922704011"),
                            ),
                            ("type".to_string(), AttrValue::string("S3")),
                        ])),
                    ),
            )
            .with_stage(Stage::new("Source").with_action(source_action()))
            .with_stage(Stage::new("Build").with_action(build_action(build_input)))
    }

    #[test]
    fn test_two_stage_pipeline_plan() {
        let synthesis = synthesize(&demo_stack("source_output")).unwrap();

        assert_eq!(
            synthesis.execution_plan.wave_names(),
            vec![vec!["SourceAction"], vec!["BuildAction"]]
        );
        assert_eq!(
            synthesis.artifact_map.producer("source_output").unwrap().to_string(),
            "Source/SourceAction"
        );
        let order: Vec<String> = synthesis
            .resolved_resources
            .iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(order, vec!["build_project.BuildProject", "pipeline.Pipeline"]);
    }

    #[test]
    fn test_wrong_input_is_unknown_artifact() {
        let err = synthesize(&demo_stack("wrong_output")).unwrap_err();
        assert!(matches!(
            err,
            SynthError::UnknownArtifact { ref artifact, .. } if artifact == "wrong_output"
        ));
    }

    #[test]
    fn test_resolver_errors_win_over_artifact_errors() {
        let mut stack = demo_stack("wrong_output");
        stack.resources.remove(0);
        let err = synthesize(&stack).unwrap_err();
        assert_eq!(err.kind(), "UnresolvedReferenceError");
    }

    #[test]
    fn test_artifact_errors_win_over_run_order_errors() {
        let mut stack = demo_stack("wrong_output");
        stack.stages[0].actions[0].run_order = Some(-1);
        let err = synthesize(&stack).unwrap_err();
        assert_eq!(err.kind(), "UnknownArtifactError");
    }

    #[test]
    fn test_same_wave_consumer_conflicts() {
        let mut stack = demo_stack("source_output");
        let lint = Action::new(
            "Lint",
            ActionCategory::Test,
            ProviderBinding::new(ActionOwner::Aws, "CodeBuild"),
        )
        .with_run_order(1)
        .with_input("source_output")
        .with_output("lint_report");
        let report = Action::new(
            "Report",
            ActionCategory::Test,
            ProviderBinding::new(ActionOwner::Aws, "CodeBuild"),
        )
        .with_run_order(1)
        .with_input("lint_report");
        stack.stages[1].actions.push(lint);
        stack.stages[1].actions.push(report);

        let err = synthesize(&stack).unwrap_err();
        assert_eq!(err.kind(), "IntraWaveArtifactConflictError");
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = synthesize(&demo_stack("source_output")).unwrap();
        let second = synthesize(&demo_stack("source_output")).unwrap();
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_output_contract_keys() {
        let synthesis = synthesize(&demo_stack("source_output")).unwrap();
        let json = synthesis.to_json().unwrap();
        assert!(json.contains("\"resolvedResources\""));
        assert!(json.contains("\"executionPlan\""));
        assert!(json.contains("\"artifactMap\""));
        assert!(json.contains("\"artifactConsumers\""));
    }
}
