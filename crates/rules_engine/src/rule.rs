use async_trait::async_trait;
use rules_actions::{Action, ActionContext};
use rules_config::Element;
use rules_conditions::Condition;
use rules_core::RuleError;
use rules_objects::{ChangeListener, ObjectRegistry};
use std::sync::Arc;
use tokio::sync::Mutex;

fn parse_active(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "off" | "false" | "no"),
    }
}

struct RuleState {
    active: bool,
    condition: Option<Box<dyn Condition>>,
    true_actions: Vec<Arc<dyn Action>>,
    false_actions: Vec<Arc<dyn Action>>,
    prev: bool,
}

/// One condition tree plus its true/false action lists. Owns both: tearing
/// down the rule (dropping the last `Arc`) drops the condition tree and its
/// object subscriptions along with it.
///
/// Held behind a single mutex so edge evaluation and reconfiguration can
/// never interleave — evaluation reads and writes `prev` under the same
/// lock a reconfigure takes to replace the condition or action lists.
pub struct Rule {
    id: String,
    state: Mutex<RuleState>,
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            state: Mutex::new(RuleState {
                active: true,
                condition: None,
                true_actions: Vec::new(),
                false_actions: Vec::new(),
                prev: false,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First-time configure: `condition` is required, `active` defaults to
    /// true when absent.
    pub async fn configure(
        self: &Arc<Self>,
        elem: &Element,
        registry: &dyn ObjectRegistry,
        action_ctx: &ActionContext<'_>,
    ) -> Result<(), RuleError> {
        let active = parse_active(elem.attr("active"));
        let cond_elem = elem.require_child("condition")?;
        let owner = self.clone() as Arc<dyn ChangeListener>;
        let condition = rules_conditions::from_config(cond_elem, registry, owner).await?;
        let (true_actions, false_actions) = self.build_action_lists(elem, action_ctx).await?;

        let mut state = self.state.lock().await;
        state.active = active;
        state.condition = Some(condition);
        state.true_actions = true_actions;
        state.false_actions = false_actions;
        state.prev = false;
        Ok(())
    }

    /// Update: `active` only changes if present, `condition` only replaces
    /// if present, and the action lists are all-or-nothing — if any
    /// `<actionlist>` is present, both polarities are discarded and rebuilt
    /// from the document.
    pub async fn reconfigure(
        self: &Arc<Self>,
        elem: &Element,
        registry: &dyn ObjectRegistry,
        action_ctx: &ActionContext<'_>,
    ) -> Result<(), RuleError> {
        let new_active = elem.attr("active").map(|v| parse_active(Some(v)));

        let new_condition = match elem.child("condition") {
            Some(cond_elem) => {
                let owner = self.clone() as Arc<dyn ChangeListener>;
                Some(rules_conditions::from_config(cond_elem, registry, owner).await?)
            }
            None => None,
        };

        let has_actionlists = elem.children_named("actionlist").next().is_some();
        let new_actions = if has_actionlists { Some(self.build_action_lists(elem, action_ctx).await?) } else { None };

        let mut state = self.state.lock().await;
        if let Some(active) = new_active {
            state.active = active;
        }
        if let Some(condition) = new_condition {
            if let Some(old) = state.condition.replace(condition) {
                old.teardown().await;
            }
        }
        if let Some((true_actions, false_actions)) = new_actions {
            state.true_actions = true_actions;
            state.false_actions = false_actions;
        }
        Ok(())
    }

    /// Revokes the current condition tree's object subscriptions, so a
    /// deleted rule's `Arc<Self>` isn't kept alive by an `Object` still
    /// holding it as a listener. Leaves the rule with no condition, so this
    /// is only meant to be called right before the rule itself is dropped.
    pub async fn teardown(&self) {
        let old = self.state.lock().await.condition.take();
        if let Some(old) = old {
            old.teardown().await;
        }
    }

    async fn build_action_lists(
        &self,
        elem: &Element,
        action_ctx: &ActionContext<'_>,
    ) -> Result<(Vec<Arc<dyn Action>>, Vec<Arc<dyn Action>>), RuleError> {
        let mut true_actions = Vec::new();
        let mut false_actions = Vec::new();
        for actionlist in elem.children_named("actionlist") {
            let on_false = actionlist.attr("type") == Some("on-false");
            let target = if on_false { &mut false_actions } else { &mut true_actions };
            for action_elem in actionlist.children_named("action") {
                target.push(rules_actions::from_config(action_elem, action_ctx).await?);
            }
        }
        Ok((true_actions, false_actions))
    }

    pub async fn serialize(&self) -> Element {
        let state = self.state.lock().await;
        let mut elem = Element::new("rule");
        elem.set_attr("id", self.id.clone());
        elem.set_attr("active", if state.active { "on" } else { "off" });
        if let Some(condition) = &state.condition {
            elem.push_child(condition.serialize());
        }
        if !state.true_actions.is_empty() {
            let mut list = Element::new("actionlist");
            for action in &state.true_actions {
                list.push_child(action.serialize());
            }
            elem.push_child(list);
        }
        if !state.false_actions.is_empty() {
            let mut list = Element::new("actionlist");
            list.set_attr("type", "on-false");
            for action in &state.false_actions {
                list.push_child(action.serialize());
            }
            elem.push_child(list);
        }
        elem
    }
}

#[async_trait]
impl ChangeListener for Rule {
    /// Re-evaluates the condition tree and dispatches the true/false-edge
    /// action list, if any. Runs under the rule's own lock end to end, so
    /// overlapping notifications for the same rule are serialized.
    async fn on_change(&self, _object_id: Option<&str>) {
        let mut state = self.state.lock().await;
        if !state.active {
            return;
        }
        let Some(condition) = &state.condition else { return };
        let cur = condition.evaluate().await;
        let prev = state.prev;
        state.prev = cur;

        let to_run: Vec<Arc<dyn Action>> = if cur && !prev {
            state.true_actions.clone()
        } else if !cur && prev {
            state.false_actions.clone()
        } else {
            Vec::new()
        };
        drop(state);

        for action in to_run {
            rules_actions::spawn_action(action);
        }
    }
}
