use crate::rule::Rule;
use indexmap::IndexMap;
use rules_actions::ActionContext;
use rules_config::Element;
use rules_core::RuleError;
use rules_objects::ObjectRegistry;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the rule set. Created once per process and handed through setup
/// explicitly rather than reached for as global state.
pub struct RuleServer {
    rules: Mutex<IndexMap<String, Arc<Rule>>>,
}

impl Default for RuleServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleServer {
    pub fn new() -> Self {
        Self { rules: Mutex::new(IndexMap::new()) }
    }

    /// For each `<rule>` child: unknown id + `delete="true"` errors, unknown
    /// id without delete creates and configures a new rule, known id with
    /// `delete="true"` tears the rule down, otherwise the rule is
    /// reconfigured. Aborts on the first failing child; rules already
    /// applied before the failure stay in place.
    pub async fn import(
        &self,
        doc: &Element,
        registry: &dyn ObjectRegistry,
        action_ctx: &ActionContext<'_>,
    ) -> Result<(), RuleError> {
        for rule_elem in doc.children_named("rule") {
            let id = rule_elem.require_attr("id")?;
            let delete = matches!(rule_elem.attr("delete"), Some("true"));

            let mut rules = self.rules.lock().await;
            match (rules.get(id).cloned(), delete) {
                (None, true) => return Err(RuleError::UnknownRuleId(id.to_string())),
                (None, false) => {
                    let rule = Rule::new(id);
                    drop(rules);
                    rule.configure(rule_elem, registry, action_ctx).await?;
                    self.rules.lock().await.insert(id.to_string(), rule);
                }
                (Some(existing), true) => {
                    drop(rules);
                    existing.teardown().await;
                    self.rules.lock().await.shift_remove(id);
                }
                (Some(existing), false) => {
                    drop(rules);
                    existing.reconfigure(rule_elem, registry, action_ctx).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn export(&self) -> Element {
        let mut doc = Element::new("rules");
        let rules = self.rules.lock().await;
        for rule in rules.values() {
            doc.push_child(rule.serialize().await);
        }
        doc
    }

    pub async fn rule(&self, id: &str) -> Option<Arc<Rule>> {
        self.rules.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rules.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.lock().await.is_empty()
    }
}

pub use rules_core::duration::{format as format_duration, parse as parse_duration};

#[cfg(test)]
mod tests {
    use super::*;
    use rules_objects::{InMemoryObjectRegistry, Value};

    #[tokio::test]
    async fn import_creates_unknown_rules() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let doc = Element::parse(
            r#"<rules><rule id="r1"><condition type="object" id="L1" value="on"/></rule></rules>"#,
        )
        .unwrap();
        server.import(&doc, &registry, &action_ctx).await.unwrap();
        assert_eq!(server.len().await, 1);
    }

    #[tokio::test]
    async fn import_deleting_unknown_rule_errors() {
        let registry = InMemoryObjectRegistry::new();
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let doc = Element::parse(r#"<rules><rule id="ghost" delete="true"/></rules>"#).unwrap();
        assert!(server.import(&doc, &registry, &action_ctx).await.is_err());
    }

    #[tokio::test]
    async fn import_deletes_known_rule() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let create = Element::parse(
            r#"<rules><rule id="r1"><condition type="object" id="L1" value="on"/></rule></rules>"#,
        )
        .unwrap();
        server.import(&create, &registry, &action_ctx).await.unwrap();

        let delete = Element::parse(r#"<rules><rule id="r1" delete="true"/></rules>"#).unwrap();
        server.import(&delete, &registry, &action_ctx).await.unwrap();
        assert!(server.is_empty().await);
    }

    #[tokio::test]
    async fn import_deleting_a_rule_revokes_its_trigger_subscription() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        registry.register("L2", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let create = Element::parse(
            r#"<rules><rule id="r1">
                 <condition type="object" id="L1" value="on" trigger="true"/>
                 <actionlist><action type="set-value" id="L2" value="on"/></actionlist>
               </rule></rules>"#,
        )
        .unwrap();
        server.import(&create, &registry, &action_ctx).await.unwrap();
        assert_eq!(registry.object("L1").unwrap().listener_count().await, 1);

        let delete = Element::parse(r#"<rules><rule id="r1" delete="true"/></rules>"#).unwrap();
        server.import(&delete, &registry, &action_ctx).await.unwrap();
        assert_eq!(registry.object("L1").unwrap().listener_count().await, 0, "deleted rule's subscription must be revoked");

        registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
        tokio::task::yield_now().await;
        let l2 = registry.get_object("L2").unwrap();
        assert_eq!(l2.get_value().await, Value::Bool(false), "deleted rule must not fire its actions");
    }

    #[tokio::test]
    async fn reconfigure_with_a_new_condition_revokes_the_old_subscription() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        registry.register("L2", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let create = Element::parse(
            r#"<rules><rule id="r1">
                 <condition type="object" id="L1" value="on" trigger="true"/>
                 <actionlist><action type="set-value" id="L2" value="on"/></actionlist>
               </rule></rules>"#,
        )
        .unwrap();
        server.import(&create, &registry, &action_ctx).await.unwrap();
        assert_eq!(registry.object("L1").unwrap().listener_count().await, 1);

        let update = Element::parse(
            r#"<rules><rule id="r1">
                 <condition type="object" id="L2" value="on" trigger="true"/>
               </rule></rules>"#,
        )
        .unwrap();
        server.import(&update, &registry, &action_ctx).await.unwrap();
        assert_eq!(registry.object("L1").unwrap().listener_count().await, 0, "old subscription must be revoked on reconfigure");
        assert_eq!(registry.object("L2").unwrap().listener_count().await, 1);
    }

    #[tokio::test]
    async fn import_reconfigures_known_rule() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let create = Element::parse(
            r#"<rules><rule id="r1" active="off"><condition type="object" id="L1" value="on"/></rule></rules>"#,
        )
        .unwrap();
        server.import(&create, &registry, &action_ctx).await.unwrap();

        let update = Element::parse(
            r#"<rules><rule id="r1" active="on"><condition type="object" id="L1" value="off"/></rule></rules>"#,
        )
        .unwrap();
        server.import(&update, &registry, &action_ctx).await.unwrap();
        assert_eq!(server.len().await, 1);
    }

    #[tokio::test]
    async fn export_round_trips_rule_ids_in_insertion_order() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let action_ctx = ActionContext::new(&registry);
        let server = RuleServer::new();

        let doc = Element::parse(
            r#"<rules>
                 <rule id="first"><condition type="object" id="L1" value="on"/></rule>
                 <rule id="second"><condition type="object" id="L1" value="off"/></rule>
               </rules>"#,
        )
        .unwrap();
        server.import(&doc, &registry, &action_ctx).await.unwrap();

        let exported = server.export().await;
        let ids: Vec<&str> = exported.children_named("rule").map(|r| r.attr("id").unwrap()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
