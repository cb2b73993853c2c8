use crate::Condition;
use async_trait::async_trait;
use rules_config::Element;
use rules_core::{BusAddress, RuleError};
use rules_objects::{ChangeListener, Object, ObjectRegistry, Value};
use std::sync::Arc;

/// Bitmask over {eq, lt, gt}, matching the comparison result codes
/// `Value::compare` returns (0/-1/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOp(u8);

impl CompareOp {
    pub const EQ: CompareOp = CompareOp(1);
    pub const LT: CompareOp = CompareOp(2);
    pub const GT: CompareOp = CompareOp(4);

    fn union(self, other: CompareOp) -> CompareOp {
        CompareOp(self.0 | other.0)
    }

    fn contains(self, other: CompareOp) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn matches(self, compare_result: i32) -> bool {
        match compare_result {
            0 => self.contains(CompareOp::EQ),
            -1 => self.contains(CompareOp::LT),
            1 => self.contains(CompareOp::GT),
            _ => false, // -2: incomparable, matches no operator
        }
    }

    pub fn parse(op: &str) -> Result<CompareOp, RuleError> {
        Ok(match op {
            "" | "eq" => CompareOp::EQ,
            "lt" => CompareOp::LT,
            "gt" => CompareOp::GT,
            "ne" => CompareOp::LT.union(CompareOp::GT),
            // `lte` is intentionally not lt|eq: the engine this was built
            // against maps both `lte` and `gte` onto gt|eq, and callers
            // have come to depend on that. Preserved as-is.
            "lte" | "gte" => CompareOp::GT.union(CompareOp::EQ),
            other => {
                return Err(RuleError::InvalidAttributeValue {
                    attr: "op".to_string(),
                    value: other.to_string(),
                })
            }
        })
    }

    pub fn to_config_str(self) -> &'static str {
        if self == CompareOp::EQ {
            "eq"
        } else if self == CompareOp::LT {
            "lt"
        } else if self == CompareOp::GT {
            "gt"
        } else if self == CompareOp::GT.union(CompareOp::EQ) {
            "gte"
        } else {
            "ne"
        }
    }
}

pub struct ObjectCompare {
    object: Arc<dyn Object>,
    value: Option<Value>,
    op: CompareOp,
    trigger: bool,
    owner: Option<Arc<dyn ChangeListener>>,
}

impl ObjectCompare {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let id = elem.require_attr("id")?;
        let object = registry.get_object(id)?;

        let trigger = elem.attr("trigger") == Some("true");
        let owner = if trigger {
            object.add_change_listener(owner.clone()).await;
            Some(owner)
        } else {
            None
        };

        let value = match elem.attr("value") {
            Some(v) if !v.is_empty() => Some(object.create_object_value(v)?),
            _ => None,
        };

        let op = CompareOp::parse(elem.attr_or("op", ""))?;

        Ok(Self { object, value, op, trigger, owner })
    }

    fn write_common_attrs(&self, elem: &mut Element) {
        elem.set_attr("id", self.object.id().to_string());
        if self.op != CompareOp::EQ {
            elem.set_attr("op", self.op.to_config_str());
        }
        if let Some(value) = &self.value {
            elem.set_attr("value", value.to_literal());
        }
        if self.trigger {
            elem.set_attr("trigger", "true");
        }
    }
}

#[async_trait]
impl Condition for ObjectCompare {
    async fn evaluate(&self) -> bool {
        let Some(value) = &self.value else {
            tracing::debug!(id = self.object.id(), "ObjectCompare: no value configured, always true");
            return true;
        };
        let result = self.object.compare(value).await;
        let matched = self.op.matches(result);
        tracing::debug!(id = self.object.id(), matched, "ObjectCompare evaluated");
        matched
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "object");
        self.write_common_attrs(&mut elem);
        elem
    }

    async fn teardown(&self) {
        if let Some(owner) = &self.owner {
            self.object.remove_change_listener(owner).await;
        }
    }
}

/// `ObjectCompare` additionally gated on the address that last wrote the
/// object: true only when `src` matches `Object::last_tx()`.
pub struct ObjectSourceCompare {
    inner: ObjectCompare,
    src: BusAddress,
}

impl ObjectSourceCompare {
    pub async fn from_config(
        elem: &Element,
        registry: &dyn ObjectRegistry,
        owner: Arc<dyn ChangeListener>,
    ) -> Result<Self, RuleError> {
        let src: BusAddress = elem.require_attr("src")?.parse()?;
        let inner = ObjectCompare::from_config(elem, registry, owner).await?;
        Ok(Self { inner, src })
    }
}

#[async_trait]
impl Condition for ObjectSourceCompare {
    async fn evaluate(&self) -> bool {
        let last_tx = self.inner.object.last_tx().await;
        let matched = last_tx == self.src && self.inner.evaluate().await;
        tracing::debug!(id = self.inner.object.id(), matched, "ObjectSourceCompare evaluated");
        matched
    }

    fn serialize(&self) -> Element {
        let mut elem = Element::new("condition");
        elem.set_attr("type", "object-src");
        self.inner.write_common_attrs(&mut elem);
        elem.set_attr("src", self.src.to_string());
        elem
    }

    async fn teardown(&self) {
        self.inner.teardown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_objects::InMemoryObjectRegistry;

    struct NoopListener;
    #[async_trait]
    impl ChangeListener for NoopListener {
        async fn on_change(&self, _object_id: Option<&str>) {}
    }

    #[test]
    fn lte_and_gte_both_map_to_gt_or_eq() {
        assert_eq!(CompareOp::parse("lte").unwrap(), CompareOp::GT.union(CompareOp::EQ));
        assert_eq!(CompareOp::parse("gte").unwrap(), CompareOp::GT.union(CompareOp::EQ));
    }

    #[test]
    fn ne_is_lt_or_gt() {
        let ne = CompareOp::parse("ne").unwrap();
        assert!(ne.matches(-1));
        assert!(ne.matches(1));
        assert!(!ne.matches(0));
    }

    #[tokio::test]
    async fn no_configured_value_is_always_true() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let elem = Element::parse(r#"<condition type="object" id="L1"/>"#).unwrap();
        let cond = ObjectCompare::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(cond.evaluate().await);
    }

    #[tokio::test]
    async fn matches_on_configured_value() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(true));
        let elem = Element::parse(r#"<condition type="object" id="L1" value="on"/>"#).unwrap();
        let cond = ObjectCompare::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(cond.evaluate().await);
    }

    #[tokio::test]
    async fn source_mismatch_is_false() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(true));
        registry
            .simulate_bus_write("L1", Value::Bool(true), "1.1.1".parse().unwrap())
            .await
            .unwrap();
        let elem = Element::parse(r#"<condition type="object-src" id="L1" value="on" src="2.2.2"/>"#).unwrap();
        let cond = ObjectSourceCompare::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(!cond.evaluate().await);
    }

    #[tokio::test]
    async fn teardown_revokes_the_trigger_subscription() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingListener(Arc<AtomicUsize>);
        #[async_trait]
        impl ChangeListener for CountingListener {
            async fn on_change(&self, _object_id: Option<&str>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(false));
        let elem = Element::parse(r#"<condition type="object" id="L1" value="on" trigger="true"/>"#).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let owner: Arc<dyn ChangeListener> = Arc::new(CountingListener(count.clone()));
        let cond = ObjectCompare::from_config(&elem, &registry, owner).await.unwrap();

        registry.simulate_bus_write("L1", Value::Bool(true), Default::default()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        cond.teardown().await;
        registry.simulate_bus_write("L1", Value::Bool(false), Default::default()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1, "no notification after teardown");
    }

    #[tokio::test]
    async fn source_match_is_true() {
        let mut registry = InMemoryObjectRegistry::new();
        registry.register("L1", Value::Bool(true));
        registry
            .simulate_bus_write("L1", Value::Bool(true), "1.1.1".parse().unwrap())
            .await
            .unwrap();
        let elem = Element::parse(r#"<condition type="object-src" id="L1" value="on" src="1.1.1"/>"#).unwrap();
        let cond = ObjectSourceCompare::from_config(&elem, &registry, Arc::new(NoopListener))
            .await
            .unwrap();
        assert!(cond.evaluate().await);
    }
}
