use crate::{ChangeListener, Object, ObjectRegistry, ObjectType, Value};
use async_trait::async_trait;
use rules_core::{BusAddress, RuleError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single in-memory object: current value, last writer's bus address, and
/// the list of listeners subscribed via `trigger="true"` conditions.
pub struct InMemoryObject {
    id: String,
    object_type: ObjectType,
    value: RwLock<Value>,
    last_tx: RwLock<BusAddress>,
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

impl InMemoryObject {
    fn new(id: impl Into<String>, initial: Value) -> Self {
        Self {
            id: id.into(),
            object_type: initial.object_type(),
            value: RwLock::new(initial),
            last_tx: RwLock::new(BusAddress::NULL),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Apply a write as if it came from the bus (or from an action), update
    /// `last_tx`, and notify subscribers. Used by both `Object::set_value`
    /// and test/demo code simulating external bus traffic.
    async fn write(&self, value: Value, src: BusAddress) -> Result<(), RuleError> {
        if value.object_type() != self.object_type {
            return Err(RuleError::ObjectTypeMismatch(self.id.clone()));
        }
        *self.value.write().await = value;
        *self.last_tx.write().await = src;
        let listeners = self.listeners.read().await.clone();
        for listener in listeners {
            listener.on_change(Some(&self.id)).await;
        }
        Ok(())
    }

    /// Number of subscribed listeners, for tests asserting that a
    /// `teardown()` actually revoked a subscription.
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

#[async_trait]
impl Object for InMemoryObject {
    fn id(&self) -> &str {
        &self.id
    }

    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    async fn get_value(&self) -> Value {
        self.value.read().await.clone()
    }

    async fn set_value(&self, value: Value) -> Result<(), RuleError> {
        self.write(value, BusAddress::NULL).await
    }

    async fn last_tx(&self) -> BusAddress {
        *self.last_tx.read().await
    }

    async fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners.write().await.push(listener);
    }

    async fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener>) {
        self.listeners.write().await.retain(|l| !Arc::ptr_eq(l, listener));
    }
}

/// An in-memory stand-in for the real `ObjectController`. Tests and the CLI
/// demo register objects up front, then simulate bus writes via
/// `simulate_bus_write` to exercise trigger-driven re-evaluation.
#[derive(Default)]
pub struct InMemoryObjectRegistry {
    objects: HashMap<String, Arc<InMemoryObject>>,
}

impl InMemoryObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, initial: Value) -> &mut Self {
        let id = id.into();
        self.objects.insert(id.clone(), Arc::new(InMemoryObject::new(id, initial)));
        self
    }

    /// Look up the concrete in-memory object (bypassing the trait object),
    /// for use by tests that need to simulate external bus writes.
    pub fn object(&self, id: &str) -> Option<Arc<InMemoryObject>> {
        self.objects.get(id).cloned()
    }

    /// Simulate a write arriving from a specific bus source address, as
    /// opposed to a local action write (which always carries
    /// `BusAddress::NULL`). Drives `ObjectSourceCompare`.
    pub async fn simulate_bus_write(
        &self,
        id: &str,
        value: Value,
        src: BusAddress,
    ) -> Result<(), RuleError> {
        let obj = self
            .objects
            .get(id)
            .ok_or_else(|| RuleError::UnknownObjectId(id.to_string()))?;
        obj.write(value, src).await
    }
}

impl ObjectRegistry for InMemoryObjectRegistry {
    fn get_object(&self, id: &str) -> Result<Arc<dyn Object>, RuleError> {
        self.objects
            .get(id)
            .cloned()
            .map(|o| o as Arc<dyn Object>)
            .ok_or_else(|| RuleError::UnknownObjectId(id.to_string()))
    }
}
