//! Tree resolution: fan-out ordering, nesting, fail-fast, deferred elements.

use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::time::sleep;
use trellis::{Component, ComponentError, Element, Props, Streamable, execute};

fn echo_after_delay() -> Component {
    Component::new("Echo", |props: Props, _scope| {
        let n = props.get_i64("n").unwrap_or(0);
        let delay = rand::rng().random_range(0..25u64);
        async move {
            sleep(Duration::from_millis(delay)).await;
            Ok(Element::value(n))
        }
    })
}

#[tokio::test]
async fn plain_values_pass_through() {
    let out = execute(Element::value(json!({"a": 1, "b": [true, null]})))
        .await
        .unwrap();
    assert_eq!(out, json!({"a": 1, "b": [true, null]}));
}

#[tokio::test]
async fn list_results_keep_declared_order_regardless_of_completion_order() {
    let echo = echo_after_delay();
    let list = Element::list((0..8).map(|n| echo.call(Props::new().with("n", n))));
    let out = execute(list).await.unwrap();
    assert_eq!(out, json!([0, 1, 2, 3, 4, 5, 6, 7]));
}

#[tokio::test]
async fn object_results_keep_key_correspondence() {
    let echo = echo_after_delay();
    let object = Element::object([
        ("first", echo.call(Props::new().with("n", 1))),
        ("second", echo.call(Props::new().with("n", 2))),
        ("third", echo.call(Props::new().with("n", 3))),
    ]);
    let out = execute(object).await.unwrap();
    assert_eq!(out, json!({"first": 1, "second": 2, "third": 3}));
}

#[tokio::test]
async fn nested_structures_resolve_recursively() {
    let echo = echo_after_delay();
    let tree = Element::object([
        ("static", Element::value("fixed")),
        (
            "items",
            Element::list([
                echo.call(Props::new().with("n", 10)),
                Element::object([("inner", echo.call(Props::new().with("n", 20)))]),
            ]),
        ),
    ]);
    let out = execute(tree).await.unwrap();
    assert_eq!(
        out,
        json!({"static": "fixed", "items": [10, {"inner": 20}]})
    );
}

#[tokio::test]
async fn first_failure_wins_in_a_fan_out_group() {
    let slow_ok = Component::new("SlowOk", |_props, _scope| async move {
        sleep(Duration::from_millis(100)).await;
        Ok(Element::value("fine"))
    });
    let quick_fail = Component::new("QuickFail", |_props, _scope| async move {
        Err::<Element, _>(ComponentError::msg("bad input"))
    });

    let list = Element::list([slow_ok.call(Props::new()), quick_fail.call(Props::new())]);
    let err = execute(list).await.unwrap_err();
    assert_eq!(err.component_name(), Some("QuickFail"));
}

#[tokio::test]
async fn deferred_elements_are_awaited_then_resolved() {
    let echo = echo_after_delay();
    let deferred = Element::future(async move {
        sleep(Duration::from_millis(5)).await;
        Ok(echo.call(Props::new().with("n", 99)))
    });
    let out = execute(deferred).await.unwrap();
    assert_eq!(out, json!(99));
}

#[tokio::test]
async fn deferred_failure_surfaces_as_an_error() {
    let deferred = Element::future(async move {
        Err::<Element, _>(ComponentError::msg("never produced"))
    });
    let err = execute(deferred).await.unwrap_err();
    assert!(err.to_string().contains("never produced"));
}

#[tokio::test]
async fn streams_in_value_positions_are_drained_to_text() {
    let tree = Element::list([
        Element::value("lead"),
        Element::stream(Streamable::from_chunks(["a", "b", "c"])),
    ]);
    let out = execute(tree).await.unwrap();
    assert_eq!(out, json!(["lead", "abc"]));
}

#[tokio::test]
async fn component_outputs_containing_calls_resolve_fully() {
    let leaf = Component::new("Leaf", |props: Props, _scope| async move {
        Ok(Element::value(props.get_i64("n").unwrap_or(0) + 1))
    });
    let branch = {
        let leaf = leaf.clone();
        Component::new("Branch", move |_props, _scope| {
            let leaf = leaf.clone();
            async move {
                Ok(Element::list([
                    leaf.call(Props::new().with("n", 1)),
                    leaf.call(Props::new().with("n", 2)),
                ]))
            }
        })
    };
    let out = branch.run(Props::new()).await.unwrap();
    assert_eq!(out, json!([2, 3]));
}
