// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lazily initialised, shared heavy runtimes.
//
// The vision runtime and the OCR engine are both expensive to construct and
// must exist at most once per process. `SingleFlight` guarantees that
// concurrent first callers share one initialisation, and that a failed
// initialisation leaves the slot empty so the next caller retries.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use scanwerk_core::error::{Result, ScanwerkError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What waiting callers eventually observe.
type Outcome<T> = Option<std::result::Result<Arc<T>, String>>;

enum Slot<T: ?Sized> {
    Empty,
    Loading(watch::Receiver<Outcome<T>>),
    Ready(Arc<T>),
}

enum Role<T: ?Sized> {
    Lead(watch::Sender<Outcome<T>>, watch::Receiver<Outcome<T>>),
    Follow(watch::Receiver<Outcome<T>>),
}

fn lock_slot<T: ?Sized>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    // A panic while holding the lock cannot leave the slot half-written.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// At most one in-flight initialisation of a shared `T`.
pub struct SingleFlight<T: ?Sized> {
    name: &'static str,
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> SingleFlight<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(Slot::Empty)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        lock_slot(&self.slot)
    }

    /// The ready value, if initialisation has completed.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Ready value, or the role this caller plays in the next flight.
    fn claim(&self) -> std::result::Result<Arc<T>, Role<T>> {
        let mut slot = self.lock();
        match &*slot {
            Slot::Ready(value) => Ok(Arc::clone(value)),
            Slot::Loading(rx) => Err(Role::Follow(rx.clone())),
            Slot::Empty => {
                let (tx, rx) = watch::channel(None);
                *slot = Slot::Loading(rx.clone());
                Err(Role::Lead(tx, rx))
            }
        }
    }

    /// Return the shared value, running `init` only if nobody else has.
    ///
    /// Callers arriving while an initialisation is in flight wait for it and
    /// observe the same outcome. A failure is not cached. The flight lives
    /// in this caller's future: dropping it abandons the initialisation.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>>,
    {
        let sender = match self.claim() {
            Ok(value) => return Ok(value),
            Err(Role::Follow(rx)) => return self.wait(rx).await,
            Err(Role::Lead(tx, _)) => tx,
        };

        info!(runtime = self.name, "initialising");
        let guard = LeaderGuard::new(Arc::clone(&self.slot));
        let result = init().await;
        guard.publish(self.name, &sender, &result);
        result
    }

    /// Like [`get_or_init`](Self::get_or_init), but the initialisation runs
    /// as its own task. It finishes and publishes its outcome even when
    /// every caller has gone away, and later callers attach to it.
    pub async fn get_or_spawn<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
    {
        let rx = match self.claim() {
            Ok(value) => return Ok(value),
            Err(Role::Follow(rx)) => rx,
            Err(Role::Lead(tx, rx)) => {
                info!(runtime = self.name, "initialising");
                let guard = LeaderGuard::new(Arc::clone(&self.slot));
                let name = self.name;
                let flight = init();
                tokio::spawn(async move {
                    let result = flight.await;
                    guard.publish(name, &tx, &result);
                });
                rx
            }
        };
        self.wait(rx).await
    }

    async fn wait(&self, mut rx: watch::Receiver<Outcome<T>>) -> Result<Arc<T>> {
        debug!(runtime = self.name, "waiting for in-flight initialisation");
        let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(ScanwerkError::RuntimeUnavailable(message)),
            None => Err(ScanwerkError::RuntimeUnavailable(format!(
                "{} initialisation was abandoned",
                self.name
            ))),
        }
    }

    /// Release the ready value so the next caller initialises afresh.
    /// An in-flight initialisation is left to finish.
    pub fn teardown(&self) -> Option<Arc<T>> {
        let mut slot = self.lock();
        if matches!(&*slot, Slot::Ready(_)) {
            if let Slot::Ready(value) = std::mem::replace(&mut *slot, Slot::Empty) {
                info!(runtime = self.name, "torn down");
                return Some(value);
            }
        }
        None
    }
}

/// Owns a flight until it publishes; resets the slot if dropped first.
struct LeaderGuard<T: ?Sized + Send + Sync + 'static> {
    slot: Arc<Mutex<Slot<T>>>,
    finished: bool,
}

impl<T: ?Sized + Send + Sync + 'static> LeaderGuard<T> {
    fn new(slot: Arc<Mutex<Slot<T>>>) -> Self {
        Self {
            slot,
            finished: false,
        }
    }

    fn publish(
        mut self,
        name: &'static str,
        sender: &watch::Sender<Outcome<T>>,
        result: &Result<Arc<T>>,
    ) {
        self.finished = true;
        *lock_slot(&self.slot) = match result {
            Ok(value) => Slot::Ready(Arc::clone(value)),
            Err(_) => Slot::Empty,
        };

        match result {
            Ok(_) => info!(runtime = name, "ready"),
            Err(e) => warn!(runtime = name, error = %e, "initialisation failed"),
        }

        // No receivers left is fine: nobody was waiting.
        let _ = sender.send(Some(
            result.as_ref().map(Arc::clone).map_err(|e| e.to_string()),
        ));
    }
}

impl<T: ?Sized + Send + Sync + 'static> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        if !self.finished {
            let mut slot = lock_slot(&self.slot);
            if matches!(&*slot, Slot::Loading(_)) {
                *slot = Slot::Empty;
            }
        }
    }
}

/// Builds a runtime on a blocking thread.
pub type RuntimeFactory<T> = Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// A [`SingleFlight`] paired with the factory that fills it.
///
/// Construction runs on tokio's blocking pool because loading models or
/// allocating large buffers would otherwise stall the async workers.
pub struct RuntimeLoader<T: ?Sized> {
    flight: SingleFlight<T>,
    factory: RuntimeFactory<T>,
}

impl<T: ?Sized + Send + Sync + 'static> RuntimeLoader<T> {
    pub fn new(name: &'static str, factory: RuntimeFactory<T>) -> Self {
        Self {
            flight: SingleFlight::new(name),
            factory,
        }
    }

    /// A loader whose every attempt fails with `reason`.
    pub fn unavailable(name: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            name,
            Arc::new(move || Err(ScanwerkError::RuntimeUnavailable(reason.clone()))),
        )
    }

    /// The shared runtime, initialising it on first use. Cancelling the
    /// caller does not cancel the load.
    pub async fn ready(&self) -> Result<Arc<T>> {
        let factory = Arc::clone(&self.factory);
        self.flight
            .get_or_spawn(|| async move {
                tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(|e| ScanwerkError::RuntimeUnavailable(format!("loader task: {e}")))?
            })
            .await
    }

    /// The runtime if it is already loaded; never starts a load.
    pub fn current(&self) -> Option<Arc<T>> {
        self.flight.get()
    }

    pub fn is_ready(&self) -> bool {
        self.flight.is_ready()
    }

    pub fn teardown(&self) {
        self.flight.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_initialisation() {
        let flight: SingleFlight<String> = SingleFlight::new("test");
        let calls = &AtomicUsize::new(0);

        let init = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Arc::new("engine".to_string()))
        };

        let (a, b, c) = tokio::join!(
            flight.get_or_init(init),
            flight.get_or_init(init),
            flight.get_or_init(init),
        );

        let (a, b, c) = (a.expect("a"), b.expect("b"), c.expect("c"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn ready_value_is_reused() {
        let flight: SingleFlight<u32> = SingleFlight::new("test");
        let calls = &AtomicUsize::new(0);
        let init = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(7))
        };

        flight.get_or_init(init).await.expect("first");
        flight.get_or_init(init).await.expect("second");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.get().as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn failure_rejects_all_waiters_and_is_retried() {
        let flight: SingleFlight<u32> = SingleFlight::new("test");
        let calls = &AtomicUsize::new(0);

        let failing = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(ScanwerkError::RuntimeUnavailable("no models".into()))
        };

        let (a, b) = tokio::join!(flight.get_or_init(failing), flight.get_or_init(failing));
        assert!(a.is_err());
        assert!(matches!(b, Err(ScanwerkError::RuntimeUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flight.is_ready());

        let value = flight
            .get_or_init(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(1))
            })
            .await
            .expect("retry succeeds");
        assert_eq!(*value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn teardown_allows_reinitialisation() {
        let flight: SingleFlight<u32> = SingleFlight::new("test");
        flight.get_or_init(|| async { Ok(Arc::new(1)) }).await.expect("init");
        assert!(flight.teardown().is_some());
        assert!(!flight.is_ready());
        assert!(flight.teardown().is_none());

        let value = flight
            .get_or_init(|| async { Ok(Arc::new(2)) })
            .await
            .expect("reinit");
        assert_eq!(*value, 2);
    }

    #[tokio::test]
    async fn cancelled_initialisation_frees_the_slot() {
        let flight: SingleFlight<u32> = SingleFlight::new("test");
        let slow = flight.get_or_init(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Arc::new(1))
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;
        assert!(timed_out.is_err());

        let value = flight
            .get_or_init(|| async { Ok(Arc::new(3)) })
            .await
            .expect("fresh init");
        assert_eq!(*value, 3);
    }

    #[tokio::test]
    async fn loader_runs_factory_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader: RuntimeLoader<String> = RuntimeLoader::new(
            "test",
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("runtime".to_string()))
            }),
        );

        assert!(loader.current().is_none());
        let (a, b) = tokio::join!(loader.ready(), loader.ready());
        assert!(Arc::ptr_eq(&a.expect("a"), &b.expect("b")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_ready());
    }

    #[tokio::test]
    async fn abandoned_load_is_joined_not_restarted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader: RuntimeLoader<String> = RuntimeLoader::new(
            "test",
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
                Ok(Arc::new("runtime".to_string()))
            }),
        );

        let timed_out = tokio::time::timeout(Duration::from_millis(20), loader.ready()).await;
        assert!(timed_out.is_err());
        assert!(!loader.is_ready());

        let value = loader.ready().await.expect("joins the running load");
        assert_eq!(value.as_str(), "runtime");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_loader_reports_runtime_unavailable() {
        let loader: RuntimeLoader<String> = RuntimeLoader::unavailable("test", "not installed");
        assert!(matches!(
            loader.ready().await,
            Err(ScanwerkError::RuntimeUnavailable(_))
        ));
        assert!(!loader.is_ready());
    }
}
