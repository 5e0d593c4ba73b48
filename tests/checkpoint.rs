//! Checkpoint tree recording: shape, states, metadata, and secret scrubbing.

mod common;

use serde_json::{Map, json};
use trellis::{
    Component, ComponentOpts, Element, NodeState, Props, RunOptions, Workflow, WorkflowOpts,
};

use common::run_recorded;

fn adder() -> Component {
    Component::new("Add", |props: Props, _scope| async move {
        let a = props.get_i64("a").unwrap_or(0);
        let b = props.get_i64("b").unwrap_or(0);
        Ok(Element::value(a + b))
    })
}

#[tokio::test]
async fn snapshot_mirrors_the_invocation_tree() {
    let add = adder();
    let combine = {
        let add = add.clone();
        Component::new("Combine", move |_props, _scope| {
            let add = add.clone();
            async move {
                Ok(Element::object([
                    ("low", add.call(Props::new().with("a", 1).with("b", 2))),
                    ("high", add.call(Props::new().with("a", 10).with("b", 20))),
                ]))
            }
        })
    };
    let workflow = Workflow::new("Sums", combine);
    let (result, _) = run_recorded(&workflow, Props::new()).await;
    let snapshot = result.unwrap().checkpoint.unwrap();

    assert_eq!(snapshot.component_name, "Combine");
    assert_eq!(snapshot.state, NodeState::Completed);
    assert_eq!(snapshot.children.len(), 2);
    assert_eq!(snapshot.step_count(), 3);
    assert_eq!(snapshot.output, Some(json!({"low": 3, "high": 30})));
    for child in &snapshot.children {
        assert_eq!(child.component_name, "Add");
        assert_eq!(child.state, NodeState::Completed);
        assert_eq!(child.parent_id.as_deref(), Some(snapshot.id.as_str()));
    }
}

#[tokio::test]
async fn failed_invocations_record_state_and_error() {
    let failing = Component::new("Flaky", |_props, _scope| async move {
        Err::<Element, _>(trellis::ComponentError::msg("no quota left"))
    });
    let workflow = Workflow::new("Flaky", failing);
    let (result, events) = run_recorded(&workflow, Props::new()).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("no quota left"));

    let error_event = events
        .iter()
        .find_map(|e| match &e.kind {
            trellis::ProgressEventKind::Error { error, .. } => Some(error.clone()),
            _ => None,
        })
        .unwrap();
    assert!(error_event.message.contains("no quota left"));
}

#[tokio::test]
async fn secret_props_are_scrubbed_from_snapshots_and_events() {
    let opts = ComponentOpts {
        secret_props: vec!["apiKey".to_string()],
        ..ComponentOpts::default()
    };
    let caller = Component::with_opts("CallApi", opts, |props: Props, _scope| async move {
        let key = props.get_str("apiKey").unwrap_or_default().to_string();
        Ok(Element::value(format!("authorized with {key}")))
    });
    let workflow = Workflow::new("Secrets", caller);
    let (result, events) = run_recorded(
        &workflow,
        Props::new().with("apiKey", "sk-very-secret-value"),
    )
    .await;
    let snapshot = result.unwrap().checkpoint.unwrap();

    assert_eq!(snapshot.props, json!({"apiKey": "[secret]"}));
    // The secret leaked into the output string and is scrubbed there too.
    assert_eq!(snapshot.output, Some(json!("authorized with [secret]")));

    let serialized = serde_json::to_string(&events).unwrap();
    assert!(!serialized.contains("sk-very-secret-value"));
}

#[tokio::test]
async fn secret_values_inherited_by_descendants() {
    let echo = Component::new("EchoKey", |props: Props, _scope| async move {
        Ok(Element::value(
            props.get_str("key").unwrap_or_default().to_string(),
        ))
    });
    let opts = ComponentOpts {
        secret_props: vec!["token".to_string()],
        ..ComponentOpts::default()
    };
    let parent = {
        let echo = echo.clone();
        Component::with_opts("Parent", opts, move |props: Props, _scope| {
            let echo = echo.clone();
            let token = props.get_str("token").unwrap_or_default().to_string();
            async move { Ok(echo.call(Props::new().with("key", token))) }
        })
    };
    let workflow = Workflow::new("Inherited", parent);
    let (result, _) = run_recorded(
        &workflow,
        Props::new().with("token", "parent-held-secret"),
    )
    .await;
    let snapshot = result.unwrap().checkpoint.unwrap();
    let child = snapshot.find("EchoKey").unwrap();
    assert_eq!(child.props, json!({"key": "[secret]"}));
    assert_eq!(child.output, Some(json!("[secret]")));
}

#[tokio::test]
async fn secret_outputs_register_produced_values() {
    let opts = ComponentOpts {
        secret_outputs: true,
        ..ComponentOpts::default()
    };
    let minter = Component::with_opts("Mint", opts, |_props, _scope| async move {
        Ok(Element::value("minted-credential"))
    });
    let workflow = Workflow::new("Mint", minter);
    let (result, events) = run_recorded(&workflow, Props::new()).await;
    let snapshot = result.unwrap().checkpoint.unwrap();
    assert_eq!(snapshot.output, Some(json!("[secret]")));
    let serialized = serde_json::to_string(&events).unwrap();
    assert!(!serialized.contains("minted-credential"));
}

#[tokio::test]
async fn short_strings_are_not_treated_as_secrets() {
    let opts = ComponentOpts {
        secret_props: vec!["pin".to_string()],
        ..ComponentOpts::default()
    };
    let caller = Component::with_opts("Pin", opts, |props: Props, _scope| async move {
        Ok(Element::value(props.get_str("pin").unwrap_or_default()))
    });
    let workflow = Workflow::new("Pin", caller);
    let (result, _) = run_recorded(&workflow, Props::new().with("pin", "1234")).await;
    let snapshot = result.unwrap().checkpoint.unwrap();
    assert_eq!(snapshot.props, json!({"pin": "1234"}));
}

#[tokio::test]
async fn component_and_workflow_metadata_land_on_nodes() {
    let mut component_meta = Map::new();
    component_meta.insert("model".to_string(), json!("gpt-x"));
    let opts = ComponentOpts {
        metadata: component_meta,
        ..ComponentOpts::default()
    };
    let tagged = Component::with_opts("Tagged", opts, |_props, _scope| async move {
        Ok(Element::value(1))
    });

    let mut workflow_meta = Map::new();
    workflow_meta.insert("env".to_string(), json!("staging"));
    let workflow = Workflow::with_opts(
        "Tagged",
        WorkflowOpts {
            metadata: workflow_meta,
            ..WorkflowOpts::default()
        },
        tagged,
    );
    let (result, _) = run_recorded(&workflow, Props::new()).await;
    let snapshot = result.unwrap().checkpoint.unwrap();
    assert_eq!(snapshot.metadata.get("model"), Some(&json!("gpt-x")));
    assert_eq!(snapshot.metadata.get("env"), Some(&json!("staging")));
}

#[tokio::test]
async fn disabled_capture_records_and_emits_nothing() {
    let workflow = Workflow::new("Quiet", adder());
    let sink = trellis::MemorySink::new();
    let report = workflow
        .run_with(
            Props::new().with("a", 2).with("b", 2),
            RunOptions::new()
                .with_sink(sink.clone())
                .capture_checkpoints(false),
        )
        .await
        .unwrap();
    assert_eq!(report.output, json!(4));
    assert!(report.checkpoint.is_none());
    assert!(sink.snapshot().is_empty());
}

#[tokio::test]
async fn snapshots_serialize_with_camel_case_wire_names() {
    let workflow = Workflow::new("Wire", adder());
    let (result, _) = run_recorded(&workflow, Props::new().with("a", 1).with("b", 1)).await;
    let snapshot = result.unwrap().checkpoint.unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert!(value.get("componentName").is_some());
    assert!(value.get("startTime").is_some());
    assert!(value.get("parentId").is_some());
    assert!(value.get("component_name").is_none());
}
