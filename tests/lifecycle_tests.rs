// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Set Lifecycle Integration Tests
//!
//! Drives single stacks through prepare, parameter collection,
//! registration and execution against the in-memory provisioning service.

mod fixtures;

use anyhow::{Context, Result};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use cim_stack_deploy::artifact::InMemoryArtifactStore;
use cim_stack_deploy::domain::{
    Change, ChangeAction, OperationKind, ParameterValue, StackDefinition, StackEvent,
    TemplateLocation,
};
use cim_stack_deploy::lifecycle::{ChangeSetLifecycle, NO_CHANGES_REASON};
use cim_stack_deploy::provisioning::{InMemoryProvisioner, TemplateParameter};
use cim_stack_deploy::state_machine::ChangeSetState;
use cim_stack_deploy::{DeployConfig, DeployContext, DeployError};

use fixtures::*;

fn lifecycle(service: &Arc<InMemoryProvisioner>, stack: StackDefinition) -> ChangeSetLifecycle {
    ChangeSetLifecycle::new(context(service.clone()), Arc::new(stack))
}

async fn drain(mut events: mpsc::Receiver<StackEvent>) -> Vec<String> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(format!("{} {}", event.logical_resource_id, event.status));
    }
    seen
}

#[tokio::test]
async fn test_create_runs_to_success() {
    // Arrange
    let service = Arc::new(InMemoryProvisioner::new());
    service.declare_template(APP_BODY, vec![TemplateParameter::required("Env")]);
    service.plan_changes(
        "app",
        vec![Change::new(ChangeAction::Add, "Messaging::Queue", "Queue", false)],
    );
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY).with_parameter("Env", "dev"));

    // Act
    lc.prepare().await.unwrap();
    assert_eq!(lc.operation(), OperationKind::Create);
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let changes = lc.register().await.unwrap().to_vec();
    let (sink, events) = mpsc::channel(64);
    lc.execute(sink).await.unwrap();

    // Assert
    assert_eq!(changes.len(), 1);
    assert_eq!(lc.state(), ChangeSetState::Succeeded);
    assert_eq!(
        drain(events).await,
        vec![
            "app CREATE_IN_PROGRESS",
            "Queue CREATE_IN_PROGRESS",
            "Queue CREATE_COMPLETE",
            "app CREATE_COMPLETE",
        ]
    );

    let path: Vec<(ChangeSetState, ChangeSetState)> =
        lc.history().iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        path,
        vec![
            (ChangeSetState::Built, ChangeSetState::Registering),
            (ChangeSetState::Registering, ChangeSetState::Ready),
            (ChangeSetState::Ready, ChangeSetState::Executing),
            (ChangeSetState::Executing, ChangeSetState::Succeeded),
        ]
    );
    assert!(service.stack("app").unwrap().is_deployed());
}

#[tokio::test]
async fn test_unchanged_update_surfaces_no_change() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.seed_stack("app", APP_BODY, &[("Env", "prod")], &[]);
    service.declare_template(APP_BODY, vec![TemplateParameter::required("Env")]);
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));

    lc.prepare().await.unwrap();
    let change_set = lc.collect_parameters(&BTreeMap::new()).unwrap();
    assert_eq!(change_set.operation, OperationKind::Update);
    assert_eq!(change_set.parameters[0].value, ParameterValue::UsePrevious);

    let err = lc.register().await.unwrap_err();
    assert!(err.is_no_change(), "unexpected error: {err}");
    assert_eq!(lc.state(), ChangeSetState::NoChange);
}

#[tokio::test]
async fn test_both_no_change_wordings_are_benign() {
    for reason in [NO_CHANGES_REASON, "No updates are to be performed."] {
        let service = Arc::new(InMemoryProvisioner::new());
        service.fail_next_change_set("app", reason);
        let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));

        lc.prepare().await.unwrap();
        lc.collect_parameters(&BTreeMap::new()).unwrap();
        let err = lc.register().await.unwrap_err();
        assert!(err.is_no_change(), "{reason:?} gave {err}");
    }
}

#[tokio::test]
async fn test_failed_change_set_reports_id_status_and_reason() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.fail_next_change_set("app", "Template error: unresolved reference Subnet");
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let err = lc.register().await.unwrap_err();

    match err {
        DeployError::ChangeSetFailed {
            change_set_id,
            status,
            reason,
        } => {
            assert!(change_set_id.starts_with("changeSet/app/cim-deploy-"));
            assert_eq!(status, "FAILED");
            assert_eq!(reason, "Template error: unresolved reference Subnet");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(lc.state(), ChangeSetState::Failed);
}

#[tokio::test]
async fn test_all_change_pages_collected_in_order() -> Result<()> {
    let service = Arc::new(InMemoryProvisioner::new().with_page_size(2));
    let planned: Vec<Change> = (0..5)
        .map(|i| Change::new(ChangeAction::Add, "Messaging::Queue", format!("Queue{}", i), false))
        .collect();
    service.plan_changes("app", planned.clone());
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));

    lc.prepare().await?;
    lc.collect_parameters(&BTreeMap::new())?;
    let changes = lc.register().await?;

    assert_eq!(changes, planned.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_missing_parameters_can_be_supplied_on_retry() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.declare_template(
        APP_BODY,
        vec![
            TemplateParameter::required("foo"),
            TemplateParameter::required("bar"),
        ],
    );
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY).with_parameter("foo", "1"));
    lc.prepare().await.unwrap();

    let err = lc.collect_parameters(&BTreeMap::new()).unwrap_err();
    assert_eq!(err.missing_parameters(), Some(&["bar".to_string()][..]));

    let supplied = BTreeMap::from([("bar".to_string(), "2".to_string())]);
    let change_set = lc.collect_parameters(&supplied).unwrap();
    assert_eq!(change_set.parameters.len(), 2);
}

#[tokio::test]
async fn test_capabilities_acknowledged_on_submission() -> Result<()> {
    let service = Arc::new(InMemoryProvisioner::new());
    let mut lc = lifecycle(
        &service,
        StackDefinition::new("app", APP_BODY).with_capability("CAPABILITY_IAM"),
    );

    lc.prepare().await?;
    lc.collect_parameters(&BTreeMap::new())?;
    lc.register().await?;

    let id = lc
        .change_set()
        .and_then(|cs| cs.id())
        .context("registered change set has an id")?;
    assert_eq!(
        service.change_set_capabilities(id),
        Some(vec!["CAPABILITY_IAM".to_string()])
    );
    Ok(())
}

#[tokio::test]
async fn test_register_before_collect_is_rejected() {
    let service = Arc::new(InMemoryProvisioner::new());
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));
    lc.prepare().await.unwrap();

    assert!(matches!(
        lc.register().await,
        Err(DeployError::NotPrepared(_))
    ));
    assert_eq!(lc.state(), ChangeSetState::Built);
}

#[tokio::test]
async fn test_oversized_template_uploaded_and_released() {
    // Arrange
    let store = Arc::new(InMemoryArtifactStore::new());
    let service = Arc::new(InMemoryProvisioner::new().with_artifacts(store.clone()));
    let config = DeployConfig {
        artifact_bucket: Some("templates".to_string()),
        upload_threshold: 16,
        ..fast_config()
    };
    let ctx = DeployContext::new(service.clone(), store.clone(), config).unwrap();
    let mut lc = ChangeSetLifecycle::new(ctx, Arc::new(StackDefinition::new("app", APP_BODY)));

    // Act
    lc.prepare().await.unwrap();
    let uploaded = store.len();
    let change_set = lc.collect_parameters(&BTreeMap::new()).unwrap();
    let is_url = matches!(change_set.template, TemplateLocation::Url(_));
    lc.register().await.unwrap();

    // Assert
    assert_eq!(uploaded, 1);
    assert!(is_url);
    assert!(store.is_empty(), "artifact must be released after registration");
}

#[tokio::test]
async fn test_close_releases_template_held_before_registration() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let service = Arc::new(InMemoryProvisioner::new().with_artifacts(store.clone()));
    let config = DeployConfig {
        artifact_bucket: Some("templates".to_string()),
        upload_threshold: 16,
        ..fast_config()
    };
    let ctx = DeployContext::new(service.clone(), store.clone(), config).unwrap();
    let mut lc = ChangeSetLifecycle::new(ctx, Arc::new(StackDefinition::new("app", APP_BODY)));

    lc.prepare().await.unwrap();
    assert_eq!(store.len(), 1);
    lc.close().await;
    assert!(store.is_empty());
    lc.close().await;
    assert_eq!(lc.state(), ChangeSetState::Built);
}

#[tokio::test]
async fn test_artifact_released_when_registration_fails() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let service = Arc::new(InMemoryProvisioner::new().with_artifacts(store.clone()));
    service.fail_next_change_set("app", "Requires capabilities : [CAPABILITY_IAM]");
    let config = DeployConfig {
        artifact_bucket: Some("templates".to_string()),
        upload_threshold: 16,
        ..fast_config()
    };
    let ctx = DeployContext::new(service.clone(), store.clone(), config).unwrap();
    let mut lc = ChangeSetLifecycle::new(ctx, Arc::new(StackDefinition::new("app", APP_BODY)));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    assert!(lc.register().await.is_err());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_dropped_lifecycle_releases_artifact() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let service = Arc::new(InMemoryProvisioner::new().with_artifacts(store.clone()));
    let config = DeployConfig {
        artifact_bucket: Some("templates".to_string()),
        upload_threshold: 16,
        ..fast_config()
    };
    let ctx = DeployContext::new(service, store.clone(), config).unwrap();
    let mut lc = ChangeSetLifecycle::new(ctx, Arc::new(StackDefinition::new("app", APP_BODY)));
    lc.prepare().await.unwrap();
    assert_eq!(store.len(), 1);

    drop(lc);
    for _ in 0..100 {
        if store.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_rolled_back_update_reports_stack_status() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.seed_stack("app", APP_BODY, &[], &[]);
    service.plan_changes(
        "app",
        vec![Change::new(ChangeAction::Modify, "Messaging::Queue", "Queue", false)],
    );
    service.fail_execution("app", "Resource limit exceeded");
    let mut lc = lifecycle(&service, StackDefinition::new("app", NETWORK_BODY));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let id = {
        lc.register().await.unwrap();
        lc.change_set().and_then(|cs| cs.id()).unwrap().to_string()
    };
    let (sink, events) = mpsc::channel(64);
    let err = lc.execute(sink).await.unwrap_err();

    match err {
        DeployError::ExecutionFailed {
            stack,
            change_set_id,
            status,
            reason,
        } => {
            assert_eq!(stack, "app");
            assert_eq!(change_set_id, id);
            assert_eq!(status, "UPDATE_ROLLBACK_COMPLETE");
            assert_eq!(reason, "Resource limit exceeded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(lc.state(), ChangeSetState::Failed);
    assert!(drain(events)
        .await
        .contains(&"Queue CREATE_FAILED".to_string()));
}

#[tokio::test]
async fn test_stalled_execution_times_out() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.seed_stack("app", APP_BODY, &[], &[]);
    service.stall("app");
    let mut lc = lifecycle(&service, StackDefinition::new("app", NETWORK_BODY));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    lc.register().await.unwrap();
    let change_set_id = lc.change_set().and_then(|cs| cs.id()).unwrap().to_string();
    let (sink, _events) = mpsc::channel(64);
    let err = lc.execute(sink).await.unwrap_err();

    match err {
        DeployError::WaitTimeout {
            change_set_id: id,
            attempts,
            status,
            reason,
            ..
        } => {
            assert_eq!(id, change_set_id);
            assert_eq!(attempts, fast_config().wait_max_attempts);
            assert_eq!(status, "UPDATE_IN_PROGRESS");
            assert_eq!(reason, "User Initiated");
        }
        other => panic!("expected a wait timeout, got {other:?}"),
    }
    assert_eq!(lc.state(), ChangeSetState::Failed);
}

#[tokio::test]
async fn test_repeated_continuation_token_fails_registration() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.repeat_continuation_token("app");
    let mut lc = lifecycle(&service, StackDefinition::new("app", APP_BODY));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let err = lc.register().await.unwrap_err();

    assert!(err.to_string().contains("continuation token 0 repeated"));
    assert_eq!(lc.state(), ChangeSetState::Failed);
    let listings = service
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("describe_change_set:"))
        .count();
    assert_eq!(listings, 2);
}

#[tokio::test]
async fn test_diff_of_deployed_stack_touches_only_changed_line() {
    let service = Arc::new(InMemoryProvisioner::new());
    service.seed_stack("app", PARAM_BODY_OLD, &[], &[]);
    let mut lc = lifecycle(&service, StackDefinition::new("app", PARAM_BODY_NEW));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let diff = lc.diff().await.unwrap();

    assert_eq!(
        diff,
        concat!(
            "--- old/app\n",
            "+++ new/app\n",
            "@@ -1,3 +1,3 @@\n",
            " parameters:\n",
            "-  param1: old_val1\n",
            "+  param1: new_val1\n",
            "   param2: old_val2\n",
        )
    );
}

#[tokio::test]
async fn test_diff_of_new_stack_is_all_additions() {
    let service = Arc::new(InMemoryProvisioner::new());
    let mut lc = lifecycle(&service, StackDefinition::new("app", PARAM_BODY_NEW));

    lc.prepare().await.unwrap();
    lc.collect_parameters(&BTreeMap::new()).unwrap();
    let diff = lc.diff().await.unwrap();

    let mut lines = diff.lines();
    assert_eq!(lines.next(), Some("--- /dev/null"));
    assert_eq!(lines.next(), Some("+++ new/app"));
    assert_eq!(lines.next(), Some("@@ -0,0 +1,3 @@"));
    let added: Vec<&str> = lines.map(|l| l.strip_prefix('+').unwrap()).collect();
    assert_eq!(added, PARAM_BODY_NEW.lines().collect::<Vec<_>>());
}
