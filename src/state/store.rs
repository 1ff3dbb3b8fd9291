//! # Store: the set of named state modules of one pass.
//!
//! A state module owns a [`StateContainer`] and the domain operations around it
//! (see [`CategoriesState`](crate::modules::CategoriesState)). The [`Store`]
//! registers modules by name, hands them back typed, and moves their snapshots
//! across the server/client boundary.
//!
//! ```text
//! server: Store::dehydrate() ─► { "categories": {...}, ... } ─► client: Store::hydrate()
//! ```

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StateError;
use crate::state::container::StateContainer;
use crate::state::patch::Replace;

/// Serialized snapshots keyed by module name.
pub type StatePayload = BTreeMap<String, Value>;

/// A named piece of application state plus the operations that change it.
pub trait StateModule: Send + Sync + 'static {
    /// Snapshot type.
    type State: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Initial snapshot, computed once when the module is constructed.
    fn initial() -> Self::State;

    /// The container holding the module's snapshots.
    fn container(&self) -> &StateContainer<Self::State>;
}

/// Object-safe view of a module used for registration and hydration.
trait ErasedState: Send + Sync {
    fn name(&self) -> &str;
    fn dump(&self) -> Result<Value, StateError>;
    fn restore(&self, value: Value) -> Result<(), StateError>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<M: StateModule> ErasedState for M {
    fn name(&self) -> &str {
        self.container().name()
    }

    fn dump(&self) -> Result<Value, StateError> {
        Ok(serde_json::to_value(self.container().current().data())?)
    }

    fn restore(&self, value: Value) -> Result<(), StateError> {
        let state: M::State = serde_json::from_value(value).map_err(|e| StateError::Malformed {
            store: self.name().to_string(),
            reason: e.to_string(),
        })?;
        self.container().update(Replace(state), "hydrate").map(drop)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Registry of state modules keyed by name.
#[derive(Default)]
pub struct Store {
    modules: RwLock<HashMap<String, Arc<dyn ErasedState>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under its container name.
    ///
    /// ### Errors
    /// [`StateError::DuplicateState`] if the name is taken.
    pub fn register<M: StateModule>(&self, module: M) -> Result<Arc<M>, StateError> {
        let name = module.container().name().to_string();
        let mut modules = self.modules.write();
        if modules.contains_key(&name) {
            return Err(StateError::DuplicateState { name });
        }
        let module = Arc::new(module);
        let erased: Arc<dyn ErasedState> = module.clone();
        modules.insert(name, erased);
        Ok(module)
    }

    /// Returns the module registered as `name` if it has type `M`.
    pub fn get<M: StateModule>(&self, name: &str) -> Option<Arc<M>> {
        let erased = Arc::clone(self.modules.read().get(name)?);
        erased.into_any().downcast::<M>().ok()
    }

    /// Sorted module names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Serializes every module's current snapshot.
    pub fn dehydrate(&self) -> Result<StatePayload, StateError> {
        self.modules
            .read()
            .iter()
            .map(|(name, module)| module.dump().map(|value| (name.clone(), value)))
            .collect()
    }

    /// Replaces the snapshot of every registered module found in `payload`.
    ///
    /// Names without a registered module are skipped.
    pub fn hydrate(&self, payload: &StatePayload) -> Result<(), StateError> {
        let modules = self.modules.read();
        for (name, value) in payload {
            match modules.get(name) {
                Some(module) => module.restore(value.clone())?,
                None => tracing::warn!(state = %name, "no module registered for hydrated state"),
            }
        }
        Ok(())
    }
}
