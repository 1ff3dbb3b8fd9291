//! # Suspense registry - per-pass ledger of deferred jobs.
//!
//! The registry tracks async jobs started during a server render pass, keyed by
//! label, and hands their settled results over to the client.
//!
//! ## State machine (per label)
//! ```text
//!            wait / wait_with               job completes
//! Absent ──────────────────────► Pending ─────────────────► Settled(value)
//!   ▲                               │     job fails
//!   │                               └─────────────────────► Failed(error)
//!   │          delete / abort                                   │
//!   └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - `wait`/`wait_with` are the single arbiter: first writer wins, later callers
//!   get `DuplicateLabel` and must not start the job again.
//! - Every awaiter of a label observes the same outcome (shared job future).
//! - The registry is scoped to one render pass (one request on the server, one
//!   hydration on the client); it is never shared across requests.
//! - Dropping or aborting the registry cancels every pending job.
//! - Only settled entries are dehydrated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{JobError, RegistryError};
use crate::events::{Bus, Event, EventKind};
use crate::suspense::job::{BoxJob, JobOutcome, PendingJob, Suspend, drive};
use crate::suspense::payload::SuspensePayload;

/// Status of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// The job is still running.
    Pending,
    /// The job completed with a value.
    Settled,
    /// The job failed or was cancelled.
    Failed,
}

enum Slot {
    Pending {
        job: PendingJob,
        cancel: CancellationToken,
    },
    Settled(Value),
    Failed(JobError),
}

struct Entry {
    /// Distinguishes a re-registered label from a deleted one with the same name.
    id: u64,
    slot: Slot,
}

impl Entry {
    fn status(&self) -> EntryStatus {
        match self.slot {
            Slot::Pending { .. } => EntryStatus::Pending,
            Slot::Settled(_) => EntryStatus::Settled,
            Slot::Failed(_) => EntryStatus::Failed,
        }
    }
}

/// Per-pass registry of labelled deferred jobs.
pub struct SuspenseRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    bus: Bus,
    next_id: AtomicU64,
}

impl SuspenseRegistry {
    /// Creates an empty registry (one per server render pass).
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
            bus,
            next_id: AtomicU64::new(0),
        })
    }

    /// Rebuilds a registry on the client from a dehydrated server payload.
    ///
    /// Every entry starts out `Settled`.
    pub fn hydrate(payload: SuspensePayload, bus: Bus) -> Arc<Self> {
        let registry = Self::new(bus);
        {
            let mut entries = registry.entries.write();
            for (label, value) in payload {
                let id = registry.next_id();
                entries.insert(
                    label,
                    Entry {
                        id,
                        slot: Slot::Settled(value),
                    },
                );
            }
        }
        registry
    }

    /// True iff `label` is pending, settled or failed.
    pub fn has(&self, label: &str) -> bool {
        self.entries.read().contains_key(label)
    }

    /// True iff `label` is pending.
    pub fn waiting(&self, label: &str) -> bool {
        self.status(label) == Some(EntryStatus::Pending)
    }

    /// Returns the status of `label`, or `None` if absent.
    pub fn status(&self, label: &str) -> Option<EntryStatus> {
        self.entries.read().get(label).map(Entry::status)
    }

    /// Registers `job` under `label` (`Absent → Pending`).
    ///
    /// The job is driven on the Tokio runtime; when it completes the entry
    /// becomes `Settled` or `Failed`.
    ///
    /// ### Errors
    /// [`RegistryError::DuplicateLabel`] if the label is already present.
    pub fn wait<F>(self: &Arc<Self>, label: &str, job: F) -> Result<(), RegistryError>
    where
        F: Future<Output = JobOutcome> + Send + 'static,
    {
        self.wait_with(label, move || job).map(drop)
    }

    /// Registers the job produced by `make` under `label`, calling `make` only
    /// if the label is absent.
    ///
    /// The label is reserved as `Pending` under the write lock, so concurrent
    /// callers racing on the same label start the job exactly once. `make` runs
    /// after the lock is released and may read the registry. If `make` panics
    /// the entry fails instead of staying pending.
    ///
    /// ### Errors
    /// [`RegistryError::DuplicateLabel`] if the label is already present
    /// (`make` is not called).
    pub fn wait_with<M, F>(self: &Arc<Self>, label: &str, make: M) -> Result<PendingJob, RegistryError>
    where
        M: FnOnce() -> F,
        F: Future<Output = JobOutcome> + Send + 'static,
    {
        let (start, body) = oneshot::channel::<BoxJob>();
        let job = {
            let mut entries = self.entries.write();
            if entries.contains_key(label) {
                return Err(RegistryError::DuplicateLabel {
                    label: label.to_string(),
                });
            }

            let id = self.next_id();
            let cancel = CancellationToken::new();
            let weak: Weak<Self> = Arc::downgrade(self);
            let owned_label = label.to_string();
            let deferred = async move {
                match body.await {
                    Ok(job) => job.await,
                    Err(_) => Err(JobError::fail("job factory did not produce a job")),
                }
            };
            let job = drive(label, deferred, cancel.clone(), move |outcome| {
                if let Some(registry) = weak.upgrade() {
                    registry.settle(&owned_label, id, outcome);
                }
            });

            entries.insert(
                label.to_string(),
                Entry {
                    id,
                    slot: Slot::Pending {
                        job: job.clone(),
                        cancel,
                    },
                },
            );
            job
        };

        self.bus
            .publish(Event::new(EventKind::JobRegistered).with_label(label));
        tokio::spawn(job.clone().settled());
        let _ = start.send(make().boxed());
        Ok(job)
    }

    /// Suspension primitive.
    ///
    /// Returns `Some(Suspend)` while `label` is pending: the caller must pause
    /// and render again once [`Suspend::settled`] resolves. Returns `None` once
    /// the label is settled or failed.
    ///
    /// ### Errors
    /// [`RegistryError::UnknownLabel`] if the label is absent.
    pub fn suspend_if_waiting(&self, label: &str) -> Result<Option<Suspend>, RegistryError> {
        let suspend = match self.entries.read().get(label).map(|e| &e.slot) {
            None => {
                return Err(RegistryError::UnknownLabel {
                    label: label.to_string(),
                });
            }
            Some(Slot::Pending { job, .. }) => Suspend::new(job.clone()),
            Some(Slot::Settled(_) | Slot::Failed(_)) => return Ok(None),
        };

        self.bus
            .publish(Event::new(EventKind::RenderSuspended).with_label(label));
        Ok(Some(suspend))
    }

    /// Returns the settled value of `label`.
    pub fn settled(&self, label: &str) -> Option<Value> {
        match self.entries.read().get(label).map(|e| &e.slot) {
            Some(Slot::Settled(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the outcome of `label` once it is settled or failed.
    ///
    /// `None` if the label is absent or still pending.
    pub fn outcome(&self, label: &str) -> Option<JobOutcome> {
        match self.entries.read().get(label).map(|e| &e.slot) {
            Some(Slot::Settled(value)) => Some(Ok(value.clone())),
            Some(Slot::Failed(err)) => Some(Err(err.clone())),
            _ => None,
        }
    }

    /// Removes `label` unconditionally. Returns `true` if an entry was removed.
    ///
    /// A pending job keeps running for awaiters that already hold it, but its
    /// outcome is no longer recorded.
    pub fn delete(&self, label: &str) -> bool {
        let removed = self.entries.write().remove(label).is_some();
        if removed {
            self.bus
                .publish(Event::new(EventKind::JobConsumed).with_label(label));
        }
        removed
    }

    /// Returns sorted list of labels currently present.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.entries.read().keys().cloned().collect();
        labels.sort_unstable();
        labels
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Aborts the pass: cancels every pending job and discards all entries.
    pub fn abort(&self) {
        let drained: Vec<(String, Entry)> = self.entries.write().drain().collect();
        for (label, entry) in drained {
            if let Slot::Pending { cancel, .. } = entry.slot {
                cancel.cancel();
                self.bus
                    .publish(Event::new(EventKind::JobCanceled).with_label(label));
            }
        }
    }

    /// Serializes settled entries for the client.
    ///
    /// Pending and failed entries are skipped.
    pub fn dehydrate(&self) -> SuspensePayload {
        self.entries
            .read()
            .iter()
            .filter_map(|(label, entry)| match &entry.slot {
                Slot::Settled(value) => Some((label.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Records a job outcome (`Pending → Settled/Failed`) if the entry is still
    /// the one that started the job.
    fn settle(&self, label: &str, id: u64, outcome: &JobOutcome) {
        {
            let mut entries = self.entries.write();
            let Some(entry) = entries.get_mut(label) else {
                return;
            };
            if entry.id != id || !matches!(entry.slot, Slot::Pending { .. }) {
                return;
            }
            entry.slot = match outcome {
                Ok(value) => Slot::Settled(value.clone()),
                Err(err) => Slot::Failed(err.clone()),
            };
        }

        let ev = match outcome {
            Ok(_) => Event::new(EventKind::JobSettled).with_label(label),
            Err(JobError::Canceled) => Event::new(EventKind::JobCanceled).with_label(label),
            Err(err) => {
                tracing::warn!(label, error = %err, "deferred job failed");
                Event::new(EventKind::JobFailed)
                    .with_label(label)
                    .with_reason(err.to_string())
            }
        };
        self.bus.publish(ev);
    }
}

impl Drop for SuspenseRegistry {
    fn drop(&mut self) {
        for entry in self.entries.get_mut().values() {
            if let Slot::Pending { cancel, .. } = &entry.slot {
                cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn registry() -> Arc<SuspenseRegistry> {
        SuspenseRegistry::new(Bus::new(64))
    }

    #[tokio::test]
    async fn test_pending_then_settled() {
        let reg = registry();
        let (tx, rx) = oneshot::channel::<Value>();
        reg.wait("a", async move { rx.await.map_err(JobError::fail) })
            .expect("register");

        assert!(reg.has("a"));
        assert!(reg.waiting("a"));
        assert_eq!(reg.settled("a"), None);
        assert_eq!(reg.outcome("a"), None);

        let suspend = reg
            .suspend_if_waiting("a")
            .expect("known")
            .expect("pending");
        tx.send(json!({"n": 1})).expect("send");
        assert_eq!(suspend.settled().await, Ok(json!({"n": 1})));

        assert!(reg.has("a"));
        assert!(!reg.waiting("a"));
        assert_eq!(reg.status("a"), Some(EntryStatus::Settled));
        assert_eq!(reg.settled("a"), Some(json!({"n": 1})));
        assert!(reg.suspend_if_waiting("a").expect("known").is_none());
    }

    #[tokio::test]
    async fn test_failed_entry_keeps_error() {
        let reg = registry();
        let job = reg
            .wait_with("bad", || async { Err(JobError::fail("boom")) })
            .expect("register");
        assert_eq!(job.settled().await, Err(JobError::fail("boom")));

        assert!(reg.has("bad"));
        assert!(!reg.waiting("bad"));
        assert_eq!(reg.status("bad"), Some(EntryStatus::Failed));
        assert_eq!(reg.outcome("bad"), Some(Err(JobError::fail("boom"))));
        assert!(reg.dehydrate().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_label_rejected_without_starting_job() {
        let reg = registry();
        reg.wait("a", async { Ok(json!(1)) }).expect("first");

        let started = AtomicUsize::new(0);
        let err = reg
            .wait_with("a", || {
                started.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!(2)) }
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateLabel { ref label } if label == "a"));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_job_factory_may_read_registry() {
        let reg = registry();
        let inner = Arc::clone(&reg);
        let register = tokio::task::spawn_blocking(move || {
            let reg = Arc::clone(&inner);
            inner.wait_with("a", move || {
                assert!(reg.has("a"));
                assert!(reg.waiting("a"));
                assert!(!reg.has("other"));
                async { Ok(json!("ready")) }
            })
        });

        let job = tokio::time::timeout(std::time::Duration::from_secs(2), register)
            .await
            .expect("wait_with returned")
            .expect("no panic")
            .expect("register");
        assert_eq!(job.settled().await, Ok(json!("ready")));
        assert_eq!(reg.settled("a"), Some(json!("ready")));
    }

    #[tokio::test]
    async fn test_panicking_factory_fails_entry() {
        let reg = registry();
        let inner = Arc::clone(&reg);
        let registered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            inner.wait_with("a", || -> futures::future::Ready<JobOutcome> {
                panic!("factory broke")
            })
        }));
        assert!(registered.is_err());

        let suspend = reg.suspend_if_waiting("a").expect("known");
        if let Some(suspend) = suspend {
            assert!(matches!(suspend.settled().await, Err(JobError::Fail { .. })));
        }
        assert_eq!(reg.status("a"), Some(EntryStatus::Failed));
    }

    #[tokio::test]
    async fn test_suspend_unknown_label() {
        let reg = registry();
        let err = reg.suspend_if_waiting("missing").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLabel { .. }));
    }

    #[tokio::test]
    async fn test_job_settles_without_awaiters() {
        let reg = registry();
        let mut rx = reg.bus.subscribe();
        reg.wait("bg", async { Ok(json!("done")) }).expect("register");

        loop {
            let ev = rx.recv().await.expect("event");
            if ev.kind == EventKind::JobSettled {
                assert_eq!(ev.label.as_deref(), Some("bg"));
                break;
            }
        }
        assert_eq!(reg.settled("bg"), Some(json!("done")));
    }

    #[tokio::test]
    async fn test_delete_then_reregister_ignores_stale_outcome() {
        let reg = registry();
        let (tx, rx) = oneshot::channel::<Value>();
        let first = reg
            .wait_with("a", || async move { rx.await.map_err(JobError::fail) })
            .expect("first");

        assert!(reg.delete("a"));
        assert!(!reg.has("a"));
        assert!(!reg.delete("a"));

        let (tx2, rx2) = oneshot::channel::<Value>();
        reg.wait("a", async move { rx2.await.map_err(JobError::fail) })
            .expect("second");

        tx.send(json!("stale")).expect("send");
        assert_eq!(first.settled().await, Ok(json!("stale")));
        assert!(reg.waiting("a"));

        tx2.send(json!("fresh")).expect("send");
        let suspend = reg.suspend_if_waiting("a").expect("known").expect("pending");
        assert_eq!(suspend.settled().await, Ok(json!("fresh")));
        assert_eq!(reg.settled("a"), Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_abort_cancels_pending_and_clears() {
        let reg = registry();
        let job = reg
            .wait_with("hung", || futures::future::pending::<JobOutcome>())
            .expect("register");
        reg.wait_with("done", || async { Ok(json!(1)) })
            .expect("register")
            .settled()
            .await
            .expect("settled");

        reg.abort();
        assert!(reg.is_empty());
        assert_eq!(job.settled().await, Err(JobError::Canceled));
        assert!(!reg.has("hung"));
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_jobs() {
        let reg = registry();
        let job = reg
            .wait_with("hung", || futures::future::pending::<JobOutcome>())
            .expect("register");
        drop(reg);
        assert_eq!(job.settled().await, Err(JobError::Canceled));
    }

    #[tokio::test]
    async fn test_dehydrate_hydrate_settled_only() {
        let reg = registry();
        reg.wait_with("ok", || async { Ok(json!([1, 2])) })
            .expect("register")
            .settled()
            .await
            .expect("settled");
        reg.wait_with("err", || async { Err(JobError::fail("x")) })
            .expect("register")
            .settled()
            .await
            .unwrap_err();
        reg.wait_with("pending", || futures::future::pending::<JobOutcome>())
            .expect("register");

        let payload = reg.dehydrate();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get("ok"), Some(&json!([1, 2])));

        let client = SuspenseRegistry::hydrate(payload, Bus::new(8));
        assert_eq!(client.labels(), vec!["ok".to_string()]);
        assert_eq!(client.status("ok"), Some(EntryStatus::Settled));
        assert!(client.suspend_if_waiting("ok").expect("known").is_none());
    }
}
