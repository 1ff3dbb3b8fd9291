use std::sync::Arc;

use crate::api::{ApiService, Endpoint};
use crate::config::Config;
use crate::core::hydration::HydrationPayload;
use crate::core::services::{EventListener, Services};
use crate::error::{BuildError, StateError};
use crate::events::Bus;
use crate::init::History;
use crate::state::{StateModule, Store};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::suspense::SuspenseRegistry;

type StateFactory = Box<dyn FnOnce(&StateContext, &Store) -> Result<(), StateError> + Send>;

/// What a state module needs at construction.
#[derive(Clone)]
pub struct StateContext {
    api: Arc<ApiService>,
    bus: Bus,
    log: bool,
}

impl StateContext {
    pub fn api(&self) -> Arc<ApiService> {
        Arc::clone(&self.api)
    }

    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Whether transitions should be logged.
    pub fn log(&self) -> bool {
        self.log
    }
}

/// Builder for [`Services`].
pub struct ServicesBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    states: Vec<StateFactory>,
    payload: Option<HydrationPayload>,
}

impl ServicesBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            endpoints: Vec::new(),
            states: Vec::new(),
            payload: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Installs a custom endpoint for its namespace.
    pub fn with_endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Registers the state module built by `factory`.
    pub fn with_state<M, F>(mut self, factory: F) -> Self
    where
        M: StateModule,
        F: FnOnce(&StateContext) -> M + Send + 'static,
    {
        self.states
            .push(Box::new(move |ctx, store| store.register(factory(ctx)).map(drop)));
        self
    }

    /// Seeds the registry and the state modules from a server payload.
    pub fn hydrate(mut self, payload: HydrationPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the services of one pass.
    ///
    /// Must run inside a Tokio runtime when subscribers are configured.
    pub fn build(self) -> Result<Services, BuildError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = (!self.subscribers.is_empty()).then(|| {
            EventListener::spawn(&bus, SubscriberSet::new(self.subscribers, bus.clone()))
        });

        let api = Arc::new(ApiService::new(&self.cfg.api)?);
        for endpoint in self.endpoints {
            api.register_endpoint(endpoint);
        }

        let store = Store::new();
        let ctx = StateContext {
            api: Arc::clone(&api),
            bus: bus.clone(),
            log: self.cfg.store.log,
        };
        for factory in self.states {
            factory(&ctx, &store)?;
        }

        let suspense = match self.payload {
            Some(payload) => {
                store.hydrate(&payload.state)?;
                SuspenseRegistry::hydrate(payload.suspense, bus.clone())
            }
            None => SuspenseRegistry::new(bus.clone()),
        };
        let history = History::new(self.cfg.navigation.history_capacity);

        Ok(Services::new_internal(
            self.cfg, bus, api, store, suspense, history, listener,
        ))
    }
}
