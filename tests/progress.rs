//! Progress event ordering, identity, wire shape, and sink behavior.

mod common;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::time::sleep;
use trellis::{
    ChannelSink, Component, Element, ProgressEvent, ProgressEventKind, ProgressSink, Props,
    RunOptions, Workflow,
};

use common::{ids, labels, run_recorded};

/// Outer component fanning out three inner calls with staggered delays.
fn staggered_tree() -> Workflow {
    let inner = Component::new("Inner", |props: Props, _scope| {
        let delay = props.get_u64("delay").unwrap_or(0);
        async move {
            sleep(Duration::from_millis(delay)).await;
            Ok(Element::value(delay))
        }
    });
    let outer = Component::new("Outer", move |_props, _scope| {
        let inner = inner.clone();
        async move {
            Ok(Element::list([
                inner.call(Props::new().with("delay", 10)),
                inner.call(Props::new().with("delay", 5)),
                inner.call(Props::new().with("delay", 1)),
            ]))
        }
    });
    Workflow::new("Staggered", outer)
}

#[tokio::test]
async fn ids_start_at_one_and_are_gap_free() {
    let (result, events) = run_recorded(&staggered_tree(), Props::new()).await;
    result.unwrap();
    let ids = ids(&events);
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn runs_are_wrapped_by_start_and_end() {
    let (result, events) = run_recorded(&staggered_tree(), Props::new()).await;
    result.unwrap();
    assert!(matches!(
        events.first().map(|e| &e.kind),
        Some(ProgressEventKind::Start { workflow_name }) if workflow_name == "Staggered"
    ));
    assert!(matches!(events.last().map(|e| &e.kind), Some(ProgressEventKind::End)));
}

#[tokio::test]
async fn delivery_order_respects_causality() {
    let (result, events) = run_recorded(&staggered_tree(), Props::new()).await;
    result.unwrap();

    let start_of = |node: &str| {
        events.iter().position(|e| {
            matches!(&e.kind, ProgressEventKind::ComponentStart { node_id, .. } if node_id == node)
        })
    };
    let end_of = |node: &str| {
        events.iter().position(|e| {
            matches!(&e.kind, ProgressEventKind::ComponentEnd { node_id, .. } if node_id == node)
        })
    };

    let mut inner_ends = Vec::new();
    let mut outer_end = None;
    for event in &events {
        if let ProgressEventKind::ComponentEnd {
            component_name,
            node_id,
            ..
        } = &event.kind
        {
            if component_name == "Inner" {
                inner_ends.push(node_id.clone());
            } else {
                outer_end = Some(node_id.clone());
            }
        }
    }
    assert_eq!(inner_ends.len(), 3);
    let outer_end = outer_end.expect("outer component finished");

    // Every start precedes its own end, and the outer end comes after every
    // inner end.
    for node in inner_ends.iter().chain([&outer_end]) {
        assert!(start_of(node).unwrap() < end_of(node).unwrap());
    }
    for inner in &inner_ends {
        assert!(end_of(inner).unwrap() < end_of(&outer_end).unwrap());
    }
}

#[tokio::test]
async fn failures_produce_error_events_at_each_boundary() {
    let failing = Component::new("Child", |_props, _scope| async move {
        Err::<Element, _>(trellis::ComponentError::msg("exploded"))
    });
    let parent = Component::new("Parent", move |_props, _scope| {
        let failing = failing.clone();
        async move { Ok(failing.call(Props::new())) }
    });
    let workflow = Workflow::new("Failing", parent);
    let (result, events) = run_recorded(&workflow, Props::new()).await;
    assert!(result.is_err());

    let error_count = events
        .iter()
        .filter(|e| matches!(e.kind, ProgressEventKind::Error { .. }))
        .count();
    assert_eq!(error_count, 2);
    assert_eq!(labels(&events).last(), Some(&"end"));
}

#[tokio::test]
async fn scope_progress_payloads_are_delivered_in_place() {
    let reporter = Component::new("Reporter", |_props, scope| async move {
        scope.progress(json!({"pct": 50}));
        Ok(Element::value("done"))
    });
    let workflow = Workflow::new("Reporting", reporter);
    let (result, events) = run_recorded(&workflow, Props::new()).await;
    result.unwrap();

    let seen = labels(&events);
    assert_eq!(seen, ["start", "component-start", "progress", "component-end", "end"]);
    let ProgressEventKind::Progress { node_id, data } = &events[2].kind else {
        panic!("expected progress event");
    };
    assert!(node_id.is_some());
    assert_eq!(data, &json!({"pct": 50}));
}

#[tokio::test]
async fn listener_closures_observe_every_event() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let workflow = Workflow::new(
        "Observed",
        Component::new("Noop", |_props, _scope| async move {
            Ok(Element::value(1))
        }),
    );
    let seen_in_listener = Arc::clone(&seen);
    workflow
        .run_with(
            Props::new(),
            RunOptions::new().with_listener(move |event: &ProgressEvent| {
                seen_in_listener.lock().push(event.kind.label().to_string());
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        *seen.lock(),
        ["start", "component-start", "component-end", "end"]
    );
}

struct BrokenSink;

impl ProgressSink for BrokenSink {
    fn handle(&mut self, _event: &ProgressEvent) -> io::Result<()> {
        Err(io::Error::other("sink unavailable"))
    }
}

#[tokio::test]
async fn failing_sinks_do_not_disturb_the_run_or_other_sinks() {
    let memory = trellis::MemorySink::new();
    let workflow = Workflow::new(
        "Resilient",
        Component::new("Noop", |_props, _scope| async move {
            Ok(Element::value("ok"))
        }),
    );
    let report = workflow
        .run_with(
            Props::new(),
            RunOptions::new()
                .with_sink(BrokenSink)
                .with_sink(memory.clone()),
        )
        .await
        .unwrap();
    assert_eq!(report.output, json!("ok"));
    assert_eq!(labels(&memory.snapshot()).len(), 4);
}

#[tokio::test]
async fn panicking_listeners_are_contained() {
    let workflow = Workflow::new(
        "Contained",
        Component::new("Noop", |_props, _scope| async move {
            Ok(Element::value(1))
        }),
    );
    let report = workflow
        .run_with(
            Props::new(),
            RunOptions::new().with_listener(|_event: &ProgressEvent| panic!("listener bug")),
        )
        .await
        .unwrap();
    assert_eq!(report.output, json!(1));
}

#[tokio::test]
async fn channel_sinks_feed_async_consumers() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let workflow = Workflow::new(
        "Channelled",
        Component::new("Noop", |_props, _scope| async move {
            Ok(Element::value(1))
        }),
    );
    workflow
        .run_with(Props::new(), RunOptions::new().with_sink(ChannelSink::new(tx)))
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event.kind.label());
    }
    assert_eq!(received, ["start", "component-start", "component-end", "end"]);
}

#[tokio::test]
async fn events_serialize_in_the_documented_wire_shape() {
    let workflow = Workflow::new(
        "Wire",
        Component::new("Shape", |_props, _scope| async move {
            Ok(Element::value("payload"))
        }),
    );
    let (result, events) = run_recorded(&workflow, Props::new().with("k", "v")).await;
    result.unwrap();

    let start = events[1].to_json_value();
    assert_eq!(start["type"], json!("component-start"));
    assert_eq!(start["componentName"], json!("Shape"));
    assert_eq!(start["props"], json!({"k": "v"}));
    assert_eq!(start["id"], json!("2"));
    assert!(start["timestamp"].is_i64());
    assert!(start["nodeId"].is_string());

    let end = events[2].to_json_value();
    assert_eq!(end["type"], json!("component-end"));
    assert_eq!(end["output"], json!("payload"));
}
