//! # Services of one pass.
//!
//! [`Services`] bundles everything a render pass needs. On the server one
//! instance is built per request and dropped (or [`abort`](Services::abort)ed)
//! when the request ends; on the client one instance lives for the session.
//!
//! ```text
//! ServicesBuilder::build()
//!   ├─► Bus ──► event listener ──► SubscriberSet ──► LogWriter / custom
//!   ├─► ApiService (reqwest client, token header, endpoints)
//!   ├─► Store (state modules; hydrated from payload.state on the client)
//!   ├─► SuspenseRegistry (fresh on the server, from payload.suspense on the client)
//!   └─► History (pop-state events)
//!
//! Services::coordinator() ──► Coordinator::mount(init, options) ──► InitHook
//! Services::dehydrate()   ──► HydrationPayload (server → client)
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiService;
use crate::config::{Config, RenderEnv};
use crate::core::builder::ServicesBuilder;
use crate::core::hydration::HydrationPayload;
use crate::error::StateError;
use crate::events::Bus;
use crate::init::{Coordinator, History};
use crate::state::{StateModule, Store};
use crate::subscribers::SubscriberSet;
use crate::suspense::SuspenseRegistry;

/// Forwards bus events to the subscriber set until cancelled.
pub(crate) struct EventListener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventListener {
    pub(crate) fn spawn(bus: &Bus, set: SubscriberSet) -> Self {
        let mut rx = bus.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit_arc(Arc::new(ev)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            set.shutdown().await;
        });
        Self { cancel, handle }
    }
}

/// Services of one render pass.
pub struct Services {
    cfg: Config,
    bus: Bus,
    api: Arc<ApiService>,
    store: Store,
    suspense: Arc<SuspenseRegistry>,
    history: History,
    listener: Option<EventListener>,
}

impl Services {
    /// Starts building services for `cfg`.
    pub fn builder(cfg: Config) -> ServicesBuilder {
        ServicesBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        api: Arc<ApiService>,
        store: Store,
        suspense: Arc<SuspenseRegistry>,
        history: History,
        listener: Option<EventListener>,
    ) -> Self {
        Self {
            cfg,
            bus,
            api,
            store,
            suspense,
            history,
            listener,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn env(&self) -> RenderEnv {
        self.cfg.env
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn api(&self) -> &Arc<ApiService> {
        &self.api
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Shortcut for `store().get::<M>(name)`.
    pub fn state<M: StateModule>(&self, name: &str) -> Option<Arc<M>> {
        self.store.get(name)
    }

    pub fn suspense(&self) -> &Arc<SuspenseRegistry> {
        &self.suspense
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Coordinator bound to this pass.
    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(
            self.cfg.env,
            Arc::clone(&self.suspense),
            self.history.clone(),
            self.bus.clone(),
        )
    }

    /// Collects settled suspense entries and state snapshots for the client.
    pub fn dehydrate(&self) -> Result<HydrationPayload, StateError> {
        Ok(HydrationPayload {
            suspense: self.suspense.dehydrate(),
            state: self.store.dehydrate()?,
        })
    }

    /// Aborts the pass: cancels every pending deferred job.
    pub fn abort(&self) {
        self.suspense.abort();
    }

    /// Aborts the pass and waits until subscribers drained their queues.
    pub async fn shutdown(mut self) {
        self.abort();
        if let Some(listener) = self.listener.take() {
            listener.cancel.cancel();
            if let Err(err) = listener.handle.await {
                tracing::warn!(error = %err, "event listener ended abnormally");
            }
        }
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.cancel.cancel();
        }
    }
}
