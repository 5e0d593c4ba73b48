#![allow(dead_code)]

use trellis::{
    MemorySink, ProgressEvent, Props, RunOptions, RunReport, Workflow, WorkflowError,
};

/// Run a workflow with an in-memory event sink and hand back both the
/// outcome and everything the sink captured.
pub async fn run_recorded(
    workflow: &Workflow,
    props: Props,
) -> (Result<RunReport, WorkflowError>, Vec<ProgressEvent>) {
    let sink = MemorySink::new();
    let result = workflow
        .run_with(props, RunOptions::new().with_sink(sink.clone()))
        .await;
    (result, sink.snapshot())
}

/// Wire labels of the captured events, in delivery order.
pub fn labels(events: &[ProgressEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind.label()).collect()
}

/// Numeric event ids, in delivery order.
pub fn ids(events: &[ProgressEvent]) -> Vec<u64> {
    events
        .iter()
        .map(|e| e.id.parse().expect("event id is numeric"))
        .collect()
}
