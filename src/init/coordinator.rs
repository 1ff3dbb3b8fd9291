//! # Init coordinator.
//!
//! Decides, per rendering unit and per render, whether an init function runs,
//! suspends the render, or reuses a result computed by the server.
//!
//! ## Server pass (`ssr` label set)
//! ```text
//! label absent  ─► wait_with(label, init) ─► Render::Suspend
//! Pending       ─────────────────────────► Render::Suspend
//! Settled(v)    ─────────────────────────► Render::Ready(v)
//! Failed(e)     ─────────────────────────► Err(InitError::Job)
//! ```
//! Without an `ssr` label the server render is [`Render::Skipped`].
//!
//! ## Client (first render, then whenever `deps` change)
//! ```text
//! no label | label absent | force ─► spawn init           Render::Invoked
//! label present                   ─► registry.delete()    Render::Reused
//! deps unchanged                  ─────────────────────► Render::Unchanged
//! on_back_forward                 ─► every PopState spawns init until the hook is dropped
//! ```
//! Client-side failures are logged and published as `InitFailed`; they never
//! reach the renderer.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::RenderEnv;
use crate::error::{InitError, RegistryError};
use crate::events::{Bus, Event, EventKind};
use crate::init::history::History;
use crate::init::init_fn::InitRef;
use crate::init::options::InitOptions;
use crate::suspense::{Suspend, SuspenseRegistry};

/// What a render should do after consulting the coordinator.
#[derive(Debug)]
pub enum Render {
    /// Server: pause this subtree until the job settles, then render again.
    Suspend(Suspend),
    /// Server: the job settled; render with its value.
    Ready(Value),
    /// Server: the hook has no `ssr` label, nothing runs on the server.
    Skipped,
    /// Client: the init function was started.
    Invoked,
    /// Client: the server result was reused and its registry entry consumed.
    Reused,
    /// Client: dependencies did not change, nothing ran.
    Unchanged,
}

/// Creates init hooks bound to one pass's registry, history and bus.
#[derive(Clone)]
pub struct Coordinator {
    env: RenderEnv,
    registry: Arc<SuspenseRegistry>,
    history: History,
    bus: Bus,
}

impl Coordinator {
    pub fn new(env: RenderEnv, registry: Arc<SuspenseRegistry>, history: History, bus: Bus) -> Self {
        Self {
            env,
            registry,
            history,
            bus,
        }
    }

    pub fn env(&self) -> RenderEnv {
        self.env
    }

    /// Creates the hook of one rendering unit.
    ///
    /// `D` is the dependency list compared between renders (usually a tuple).
    pub fn mount<D: PartialEq>(&self, init: InitRef, options: InitOptions) -> InitHook<D> {
        InitHook {
            coord: self.clone(),
            init,
            options,
            deps: None,
            navigation: None,
        }
    }
}

/// Per-unit state of the coordinator.
///
/// Dropping the hook stops its back/forward subscription.
pub struct InitHook<D> {
    coord: Coordinator,
    init: InitRef,
    options: InitOptions,
    deps: Option<D>,
    navigation: Option<DropGuard>,
}

impl<D: PartialEq> InitHook<D> {
    /// Consults the coordinator for one render with the current `deps`.
    ///
    /// ### Errors
    /// Server only: [`InitError::Job`] when the labelled job failed, or a
    /// [`RegistryError`] on label misuse.
    pub fn render(&mut self, deps: D) -> Result<Render, InitError> {
        match self.coord.env {
            RenderEnv::Server => self.render_server(),
            RenderEnv::Client => Ok(self.render_client(deps)),
        }
    }

    /// The options this hook was mounted with.
    pub fn options(&self) -> &InitOptions {
        &self.options
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn render_server(&self) -> Result<Render, InitError> {
        let Some(label) = self.options.ssr() else {
            return Ok(Render::Skipped);
        };
        let registry = &self.coord.registry;

        if !registry.has(label) {
            let init = Arc::clone(&self.init);
            match registry.wait_with(label, move || init.call()) {
                // another unit registered the label in between
                Ok(_) | Err(RegistryError::DuplicateLabel { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(suspend) = registry.suspend_if_waiting(label)? {
            return Ok(Render::Suspend(suspend));
        }
        match registry.outcome(label) {
            Some(Ok(value)) => Ok(Render::Ready(value)),
            Some(Err(source)) => Err(InitError::Job {
                label: label.to_string(),
                source,
            }),
            None => Err(RegistryError::UnknownLabel {
                label: label.to_string(),
            }
            .into()),
        }
    }

    fn render_client(&mut self, deps: D) -> Render {
        if self.deps.as_ref() == Some(&deps) {
            return Render::Unchanged;
        }
        let first = self.deps.is_none();
        self.deps = Some(deps);

        let label = self.options.ssr_label();
        let render = match label.as_deref() {
            Some(l) if !self.options.force() && self.coord.registry.has(l) => {
                self.coord.registry.delete(l);
                self.coord
                    .bus
                    .publish(Event::new(EventKind::InitReused).with_label(l));
                Render::Reused
            }
            _ => {
                let trigger = match (first, self.options.force()) {
                    (_, true) => "force",
                    (true, false) => "mount",
                    (false, false) => "deps",
                };
                invoke(&self.init, label.clone(), &self.coord.bus, trigger);
                Render::Invoked
            }
        };

        if first && self.options.on_back_forward() {
            self.navigation = Some(self.listen_back_forward(label));
        }
        render
    }

    /// Spawns a listener invoking `init` on every pop-state event until the
    /// returned guard is dropped.
    fn listen_back_forward(&self, label: Option<Arc<str>>) -> DropGuard {
        let mut rx = self.coord.history.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();
        let init = Arc::clone(&self.init);
        let bus = self.coord.bus.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(_) => invoke(&init, label.clone(), &bus, "popstate"),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "pop-state listener lagged");
                            invoke(&init, label.clone(), &bus, "popstate");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        token.drop_guard()
    }
}

/// Starts `init` in the background; failures are logged and published.
fn invoke(init: &InitRef, label: Option<Arc<str>>, bus: &Bus, trigger: &'static str) {
    let fut = init.call();
    let mut ev = Event::new(EventKind::InitInvoked).with_reason(trigger);
    if let Some(l) = &label {
        ev = ev.with_label(Arc::clone(l));
    }
    bus.publish(ev);

    let bus = bus.clone();
    tokio::spawn(async move {
        if let Err(err) = fut.await {
            tracing::error!(label = label.as_deref().unwrap_or("-"), error = %err, "init failed");
            let mut ev = Event::new(EventKind::InitFailed).with_reason(err.to_string());
            if let Some(l) = label {
                ev = ev.with_label(l);
            }
            bus.publish(ev);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::init::init_fn::InitFn;
    use crate::suspense::EntryStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Fixture {
        bus: Bus,
        registry: Arc<SuspenseRegistry>,
        history: History,
    }

    impl Fixture {
        fn new() -> Self {
            let bus = Bus::new(256);
            Self {
                registry: SuspenseRegistry::new(bus.clone()),
                history: History::new(8),
                bus,
            }
        }

        fn coordinator(&self, env: RenderEnv) -> Coordinator {
            Coordinator::new(env, Arc::clone(&self.registry), self.history.clone(), self.bus.clone())
        }
    }

    /// Init function counting its calls and resolving to the call number.
    fn counting(calls: &Arc<AtomicUsize>) -> InitRef {
        let calls = Arc::clone(calls);
        InitFn::arc(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, JobError>(json!(n)) }
        })
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !cond() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_server_suspends_then_ready() {
        let fx = Fixture::new();
        let gate = Arc::new(Notify::new());
        let init: InitRef = InitFn::arc({
            let gate = Arc::clone(&gate);
            move || {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok::<_, JobError>(json!({"items": [1]}))
                }
            }
        });
        let coord = fx.coordinator(RenderEnv::Server);
        let mut hook = coord.mount::<()>(init, InitOptions::new().with_ssr("categories"));

        let Render::Suspend(suspend) = hook.render(()).unwrap() else {
            panic!("expected suspend");
        };
        assert_eq!(suspend.label(), "categories");
        assert!(matches!(hook.render(()).unwrap(), Render::Suspend(_)));

        gate.notify_one();
        assert_eq!(suspend.settled().await, Ok(json!({"items": [1]})));

        match hook.render(()).unwrap() {
            Render::Ready(value) => assert_eq!(value, json!({"items": [1]})),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_runs_init_once_for_many_units() {
        let fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let coord = fx.coordinator(RenderEnv::Server);
        let opts = InitOptions::new().with_ssr("shared");
        let mut a = coord.mount::<()>(counting(&calls), opts.clone());
        let mut b = coord.mount::<()>(counting(&calls), opts);

        let first = a.render(()).unwrap();
        let second = b.render(()).unwrap();
        for render in [first, second] {
            match render {
                Render::Suspend(s) => {
                    s.settled().await.unwrap();
                }
                Render::Ready(_) => {}
                other => panic!("unexpected {other:?}"),
            }
        }

        assert!(matches!(a.render(()).unwrap(), Render::Ready(_)));
        assert!(matches!(b.render(()).unwrap(), Render::Ready(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_failure_reaches_every_render() {
        let fx = Fixture::new();
        let init: InitRef = InitFn::arc(|| async { Err::<Value, _>(JobError::fail("upstream down")) });
        let coord = fx.coordinator(RenderEnv::Server);
        let mut hook = coord.mount::<()>(init, InitOptions::new().with_ssr("broken"));

        if let Render::Suspend(s) = hook.render(()).unwrap() {
            assert!(s.settled().await.is_err());
        }
        for _ in 0..2 {
            let err = hook.render(()).unwrap_err();
            assert_eq!(err.as_label(), "job_failed");
        }
        assert_eq!(fx.registry.status("broken"), Some(EntryStatus::Failed));
    }

    #[tokio::test]
    async fn test_server_failure_is_shared_by_every_unit() {
        let fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let init: InitRef = InitFn::arc({
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<Value, _>(JobError::fail("upstream down")) }
            }
        });
        let coord = fx.coordinator(RenderEnv::Server);
        let opts = InitOptions::new().with_ssr("broken");
        let mut a = coord.mount::<()>(Arc::clone(&init), opts.clone());
        let mut b = coord.mount::<()>(init, opts);

        for render in [a.render(()).unwrap(), b.render(()).unwrap()] {
            if let Render::Suspend(s) = render {
                assert_eq!(s.settled().await, Err(JobError::fail("upstream down")));
            }
        }

        let mut sources = Vec::new();
        for hook in [&mut a, &mut b] {
            match hook.render(()) {
                Err(InitError::Job { label, source }) => {
                    assert_eq!(label, "broken");
                    sources.push(source);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(sources[0], sources[1]);
        assert_eq!(sources[0], JobError::fail("upstream down"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_without_label_skips() {
        let fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hook = fx
            .coordinator(RenderEnv::Server)
            .mount::<()>(counting(&calls), InitOptions::new());

        assert!(matches!(hook.render(()).unwrap(), Render::Skipped));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(fx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_client_reuses_server_result_once() {
        let fx = Fixture::new();
        fx.registry.wait("categories", async { Ok(json!([])) }).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hook = fx.coordinator(RenderEnv::Client).mount(
            counting(&calls),
            InitOptions::new().with_ssr("categories"),
        );

        assert!(matches!(hook.render((1, "a")).unwrap(), Render::Reused));
        assert!(!fx.registry.has("categories"));
        assert!(matches!(hook.render((1, "a")).unwrap(), Render::Unchanged));

        assert!(matches!(hook.render((2, "a")).unwrap(), Render::Invoked));
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_client_invokes_without_server_result() {
        let fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hook = fx.coordinator(RenderEnv::Client).mount(
            counting(&calls),
            InitOptions::new().with_ssr("categories"),
        );

        assert!(matches!(hook.render(0u32).unwrap(), Render::Invoked));
        assert!(matches!(hook.render(0u32).unwrap(), Render::Unchanged));
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_client_force_ignores_server_result() {
        let fx = Fixture::new();
        fx.registry.wait("categories", async { Ok(json!([])) }).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hook = fx.coordinator(RenderEnv::Client).mount::<()>(
            counting(&calls),
            InitOptions::new().with_ssr("categories").with_force(true),
        );

        assert!(matches!(hook.render(()).unwrap(), Render::Invoked));
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_client_failure_is_published_not_raised() {
        let fx = Fixture::new();
        let mut rx = fx.bus.subscribe();
        let init: InitRef = InitFn::arc(|| async { Err::<Value, _>(JobError::fail("offline")) });
        let mut hook = fx
            .coordinator(RenderEnv::Client)
            .mount::<()>(init, InitOptions::new());

        assert!(matches!(hook.render(()).unwrap(), Render::Invoked));

        let failed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let ev = rx.recv().await.unwrap();
                if ev.kind == EventKind::InitFailed {
                    return ev;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(failed.reason.as_deref(), Some("job failed: offline"));
    }

    #[tokio::test]
    async fn test_back_forward_invokes_until_dropped() {
        let fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hook = fx.coordinator(RenderEnv::Client).mount::<()>(
            counting(&calls),
            InitOptions::new().with_back_forward(true),
        );

        hook.render(()).unwrap();
        assert_eq!(fx.history.listeners(), 1);
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;

        fx.history.pop("/catalog?page=2");
        wait_for(|| calls.load(Ordering::SeqCst) == 2).await;

        // unchanged deps do not resubscribe
        hook.render(()).unwrap();
        assert_eq!(fx.history.listeners(), 1);

        drop(hook);
        wait_for(|| fx.history.listeners() == 0).await;
        fx.history.pop("/catalog?page=3");
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
