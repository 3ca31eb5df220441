// Copyright (c) 2025 - Cowboy AI, Inc.
//! Parameter Reconciliation Tests

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use test_case::test_case;

use cim_stack_deploy::domain::{Parameter, StackStatus};
use cim_stack_deploy::parameters::ParameterCollector;
use cim_stack_deploy::provisioning::{StackDescription, StackParameter, TemplateParameter};

fn declared(keys: &[&str]) -> Vec<TemplateParameter> {
    keys.iter().map(|k| TemplateParameter::required(*k)).collect()
}

fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn deployed(pairs: &[(&str, &str)]) -> StackDescription {
    StackDescription {
        stack_id: "stack/web".to_string(),
        name: "web".to_string(),
        status: StackStatus::new(StackStatus::UPDATE_COMPLETE),
        status_reason: None,
        parameters: pairs
            .iter()
            .map(|(k, v)| StackParameter {
                key: k.to_string(),
                value: v.to_string(),
            })
            .collect(),
        tags: Vec::new(),
        outputs: Vec::new(),
    }
}

#[test]
fn test_unused_override_ignored_and_declaration_order_kept() {
    let declared = declared(&["foo", "bar"]);
    let overrides = overrides(&[("buz", "buzval"), ("bar", "barval"), ("foo", "fooval")]);

    let parameters = ParameterCollector::new(&declared, &overrides, None)
        .collect()
        .unwrap();

    assert_eq!(
        parameters,
        vec![
            Parameter::explicit("foo", "fooval"),
            Parameter::explicit("bar", "barval"),
        ]
    );
}

#[test]
fn test_every_missing_key_reported() {
    let declared = declared(&["foo", "bar"]);
    let err = ParameterCollector::new(&declared, &BTreeMap::new(), None)
        .collect()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Missing parameters: foo, bar"
    );
    assert_eq!(
        err.missing_parameters(),
        Some(&["foo".to_string(), "bar".to_string()][..])
    );
}

#[test_case(Some("prod"), None, Some(Parameter::explicit("Env", "prod")) ; "override wins")]
#[test_case(None, Some("dev"), Some(Parameter::use_previous("Env")) ; "previous value reused")]
#[test_case(Some("prod"), Some("dev"), Some(Parameter::explicit("Env", "prod")) ; "override beats previous")]
#[test_case(None, None, None ; "missing on deployed stack")]
fn test_deployed_stack_resolution(
    supplied: Option<&str>,
    previous: Option<&str>,
    expected: Option<Parameter>,
) {
    let declared = declared(&["Env"]);
    let overrides = overrides(&supplied.map(|v| vec![("Env", v)]).unwrap_or_default());
    let stack = deployed(&previous.map(|v| vec![("Env", v)]).unwrap_or_default());

    let result = ParameterCollector::new(&declared, &overrides, Some(&stack)).collect();

    match expected {
        Some(parameter) => assert_eq!(result.unwrap(), vec![parameter]),
        None => assert!(result.unwrap_err().missing_parameters().is_some()),
    }
}

#[test]
fn test_default_wins_over_previous_value() {
    let declared = vec![TemplateParameter::with_default("Size", "small")];
    let stack = deployed(&[("Size", "large")]);

    let parameters = ParameterCollector::new(&declared, &BTreeMap::new(), Some(&stack))
        .collect()
        .unwrap();

    assert!(parameters.is_empty());
}
