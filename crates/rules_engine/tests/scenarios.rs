use rules_actions::ActionContext;
use rules_config::Element;
use rules_engine::RuleServer;
use rules_objects::{InMemoryObjectRegistry, Value};
use std::time::Duration;

/// S1: a rule wired up through `RuleServer::import` dispatches its
/// true-action only on the false→true edge of its object condition, and
/// stays silent on a repeated notification that doesn't change the edge.
#[tokio::test]
async fn s1_edge_only_dispatch_through_the_server() {
    let mut registry = InMemoryObjectRegistry::new();
    registry.register("L1", Value::Bool(false));
    registry.register("L2", Value::Bool(false));
    let action_ctx = ActionContext::new(&registry);
    let server = RuleServer::new();

    let doc = Element::parse(
        r#"<rules>
             <rule id="r1">
               <condition type="object" id="L1" value="on" op="eq" trigger="true"/>
               <actionlist><action type="set-value" id="L2" value="on"/></actionlist>
             </rule>
           </rules>"#,
    )
    .unwrap();
    server.import(&doc, &registry, &action_ctx).await.unwrap();

    let l2 = registry.get_object("L2").unwrap();
    assert_eq!(l2.get_value().await, Value::Bool(false));

    registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(l2.get_value().await, Value::Bool(true));

    // Set L2 back manually; a repeated L1=on notification carries no edge
    // and must not touch L2 again.
    l2.set_value(Value::Bool(false)).await.unwrap();
    registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(l2.get_value().await, Value::Bool(false));
}

/// Invariant 6: reconfiguring a rule with an `<actionlist>` present
/// discards both polarities and rebuilds only what the update specifies.
#[tokio::test]
async fn reconfigure_replaces_both_actionlists_when_any_is_present() {
    let mut registry = InMemoryObjectRegistry::new();
    registry.register("L1", Value::Bool(false));
    registry.register("L2", Value::Bool(false));
    registry.register("L3", Value::Bool(false));
    let action_ctx = ActionContext::new(&registry);
    let server = RuleServer::new();

    let create = Element::parse(
        r#"<rules>
             <rule id="r1">
               <condition type="object" id="L1" value="on" trigger="true"/>
               <actionlist><action type="set-value" id="L2" value="on"/></actionlist>
               <actionlist type="on-false"><action type="set-value" id="L2" value="off"/></actionlist>
             </rule>
           </rules>"#,
    )
    .unwrap();
    server.import(&create, &registry, &action_ctx).await.unwrap();

    let update = Element::parse(
        r#"<rules>
             <rule id="r1">
               <actionlist><action type="set-value" id="L3" value="on"/></actionlist>
             </rule>
           </rules>"#,
    )
    .unwrap();
    server.import(&update, &registry, &action_ctx).await.unwrap();

    registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let l2 = registry.get_object("L2").unwrap();
    let l3 = registry.get_object("L3").unwrap();
    assert_eq!(l2.get_value().await, Value::Bool(false), "old true-action must not fire");
    assert_eq!(l3.get_value().await, Value::Bool(true), "new true-action fires");
}

/// Invariant 5: an inactive rule never dispatches and never updates `prev`.
#[tokio::test]
async fn inactive_rule_leaves_prev_unchanged() {
    let mut registry = InMemoryObjectRegistry::new();
    registry.register("L1", Value::Bool(false));
    registry.register("L2", Value::Bool(false));
    let action_ctx = ActionContext::new(&registry);
    let server = RuleServer::new();

    let doc = Element::parse(
        r#"<rules>
             <rule id="r1" active="off">
               <condition type="object" id="L1" value="on" trigger="true"/>
               <actionlist><action type="set-value" id="L2" value="on"/></actionlist>
             </rule>
           </rules>"#,
    )
    .unwrap();
    server.import(&doc, &registry, &action_ctx).await.unwrap();

    registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let l2 = registry.get_object("L2").unwrap();
    assert_eq!(l2.get_value().await, Value::Bool(false));
}

/// S6: duration literals round-trip through the server's re-exported
/// parse/format helpers the way configuration call sites use them.
#[test]
fn s6_duration_helpers_match_canonical_forms() {
    assert_eq!(rules_engine::parse_duration("2h", false).unwrap(), 7200);
    assert_eq!(rules_engine::parse_duration("90", false).unwrap(), 90);
    assert_eq!(rules_engine::parse_duration("1d", false).unwrap(), 86_400);
    assert!(rules_engine::parse_duration("-5s", false).is_err());

    assert_eq!(rules_engine::format_duration(3600), "1h");
    assert_eq!(rules_engine::format_duration(90), "90");
    assert_eq!(rules_engine::format_duration(0), "");
}

/// Deleting an unconfigured rule id is a configuration error, and the
/// import aborts without touching previously-applied rules in the same
/// document.
#[tokio::test]
async fn import_aborts_on_first_failure_but_keeps_prior_rules() {
    let mut registry = InMemoryObjectRegistry::new();
    registry.register("L1", Value::Bool(false));
    let action_ctx = ActionContext::new(&registry);
    let server = RuleServer::new();

    let doc = Element::parse(
        r#"<rules>
             <rule id="r1"><condition type="object" id="L1" value="on"/></rule>
             <rule id="ghost" delete="true"/>
           </rules>"#,
    )
    .unwrap();
    let result = server.import(&doc, &registry, &action_ctx).await;
    assert!(result.is_err());
    assert_eq!(server.len().await, 1);
}
