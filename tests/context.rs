//! Ambient context propagation through provider elements.

use std::sync::Arc;

use serde_json::json;
use trellis::{Component, Context, Element, Props, execute};

fn reader(ctx: &Arc<Context<String>>) -> Component {
    let ctx = Arc::clone(ctx);
    Component::new("Reader", move |_props, scope| {
        let ctx = Arc::clone(&ctx);
        async move { Ok(Element::value(scope.get(&ctx))) }
    })
}

#[tokio::test]
async fn default_is_returned_verbatim_without_a_provider() {
    let ctx = Arc::new(Context::named("Locale", "en-US".to_string()));
    let out = reader(&ctx).run(Props::new()).await.unwrap();
    assert_eq!(out, json!("en-US"));
}

#[tokio::test]
async fn nearest_provider_shadows_outer_ones() {
    let ctx = Arc::new(Context::named("Locale", "default".to_string()));
    let read = reader(&ctx);

    let tree = ctx.provider(
        "outer".to_string(),
        Element::list([
            read.call(Props::new()),
            ctx.provider("inner".to_string(), read.call(Props::new())),
        ]),
    );
    let out = execute(tree).await.unwrap();
    assert_eq!(out, json!(["outer", "inner"]));
}

#[tokio::test]
async fn concurrent_sibling_subtrees_see_their_own_bindings() {
    let ctx = Arc::new(Context::named("Tenant", "none".to_string()));
    let read = reader(&ctx);

    let tree = Element::list([
        ctx.provider("left".to_string(), read.call(Props::new())),
        ctx.provider("right".to_string(), read.call(Props::new())),
        read.call(Props::new()),
    ]);
    let out = execute(tree).await.unwrap();
    assert_eq!(out, json!(["left", "right", "none"]));
}

#[tokio::test]
async fn distinct_contexts_do_not_collide() {
    let locale = Arc::new(Context::named("Locale", "en".to_string()));
    let tenant = Arc::new(Context::named("Tenant", "acme".to_string()));

    let both = {
        let locale = Arc::clone(&locale);
        let tenant = Arc::clone(&tenant);
        Component::new("Both", move |_props, scope| {
            let locale = Arc::clone(&locale);
            let tenant = Arc::clone(&tenant);
            async move {
                Ok(Element::value(json!({
                    "locale": scope.get(&locale),
                    "tenant": scope.get(&tenant),
                })))
            }
        })
    };

    let tree = locale.provider("fr".to_string(), both.call(Props::new()));
    let out = execute(tree).await.unwrap();
    assert_eq!(out, json!({"locale": "fr", "tenant": "acme"}));
}

#[tokio::test]
async fn bindings_reach_descendants_created_by_component_bodies() {
    let ctx = Arc::new(Context::named("Depth", "shallow".to_string()));
    let read = reader(&ctx);
    let wrapper = {
        let read = read.clone();
        Component::new("Wrapper", move |_props, _scope| {
            let read = read.clone();
            async move { Ok(read.call(Props::new())) }
        })
    };

    let tree = ctx.provider("deep".to_string(), wrapper.call(Props::new()));
    let out = execute(tree).await.unwrap();
    assert_eq!(out, json!("deep"));
}
