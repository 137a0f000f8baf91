use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BootConfig;
use crate::ipc::{Channel, Device};
use crate::kernel::error::{Error, Result};

/// What a driver can reach while bringing its device up
#[derive(Debug, Clone, Copy)]
pub struct DriverContext<'a> {
    pub channel: &'a Arc<Channel>,
    pub config: &'a BootConfig,
    /// Every driver constructed for this boot, initialized or not
    pub registry: &'a DriverRegistry,
}

/// Lifecycle trait for all peripheral drivers.
///
/// Constructors must not touch hardware: they only receive configuration.
/// `initialize` runs once, after every driver exists, and is where the
/// device is brought to its operational state over the channel.
#[async_trait]
pub trait Driver: Any + Send + Sync + Debug {
    fn name(&self) -> &'static str;
    fn device(&self) -> Device;
    fn is_initialized(&self) -> bool;
    async fn initialize(&self, ctx: &DriverContext<'_>) -> Result<()>;
}

/// Registry storing each driver singleton as `Arc<dyn Driver>`, keyed by its concrete type
#[derive(Default, Debug)]
pub struct DriverRegistry {
    instances: HashMap<TypeId, Arc<dyn Driver>>,
    // Registration order, which is also initialization order
    order: Vec<TypeId>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a driver instance. A second instance of the same type is rejected.
    pub fn register_instance<V>(&mut self, instance: Arc<V>) -> Result<()>
    where
        V: Driver + 'static,
    {
        let type_id = TypeId::of::<V>();
        if self.instances.contains_key(&type_id) {
            return Err(Error::ComponentRegistryError {
                operation: "RegisterDriver".to_string(),
                component_name: Some(instance.name().to_string()),
                message: "driver singleton already constructed".to_string(),
            });
        }
        self.instances.insert(type_id, instance);
        self.order.push(type_id);
        Ok(())
    }

    /// Get a driver by the TypeId of its concrete type.
    pub fn get_component_by_id(&self, type_id: &TypeId) -> Option<Arc<dyn Driver>> {
        self.instances.get(type_id).cloned()
    }

    /// Get a driver by concrete type T.
    pub fn get_concrete<T: Driver + 'static>(&self) -> Option<Arc<T>> {
        self.instances.get(&TypeId::of::<T>()).and_then(|driver| {
            let any: Arc<dyn Any + Send + Sync> = driver.clone();
            Arc::downcast::<T>(any).ok()
        })
    }

    /// All drivers in registration order.
    pub fn ordered(&self) -> Vec<Arc<dyn Driver>> {
        self.order
            .iter()
            .filter_map(|type_id| self.instances.get(type_id).cloned())
            .collect()
    }

    /// Driver names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.ordered().iter().map(|driver| driver.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
