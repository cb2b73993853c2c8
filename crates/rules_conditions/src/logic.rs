use crate::{from_config, Condition};
use async_trait::async_trait;
use rules_config::Element;
use rules_core::RuleError;
use rules_objects::{ChangeListener, ObjectRegistry};
use std::sync::Arc;

pub struct And {
    children: Vec<Box<dyn Condition>>,
}

impl And {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let mut children = Vec::new();
        for child in elem.children_named("condition") {
            children.push(from_config(child, registry, owner.clone()).await?);
        }
        Ok(Self { children })
    }
}

#[async_trait]
impl Condition for And {
    async fn evaluate(&self) -> bool {
        for child in &self.children {
            if !child.evaluate().await {
                return false;
            }
        }
        true
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "and");
        for child in &self.children {
            elem.push_child(child.serialize());
        }
        elem
    }

    async fn teardown(&self) {
        for child in &self.children {
            child.teardown().await;
        }
    }
}

pub struct Or {
    children: Vec<Box<dyn Condition>>,
}

impl Or {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let mut children = Vec::new();
        for child in elem.children_named("condition") {
            children.push(from_config(child, registry, owner.clone()).await?);
        }
        Ok(Self { children })
    }
}

#[async_trait]
impl Condition for Or {
    async fn evaluate(&self) -> bool {
        for child in &self.children {
            if child.evaluate().await {
                return true;
            }
        }
        false
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "or");
        for child in &self.children {
            elem.push_child(child.serialize());
        }
        elem
    }

    async fn teardown(&self) {
        for child in &self.children {
            child.teardown().await;
        }
    }
}

pub struct Not {
    child: Box<dyn Condition>,
}

impl Not {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let child_elem = elem.require_child("condition")?;
        let child = from_config(child_elem, registry, owner).await?;
        Ok(Self { child })
    }
}

#[async_trait]
impl Condition for Not {
    async fn evaluate(&self) -> bool {
        !self.child.evaluate().await
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "not");
        elem.push_child(self.child.serialize());
        elem
    }

    async fn teardown(&self) {
        self.child.teardown().await;
    }
}
