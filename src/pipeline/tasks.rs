//! Bounded, shutdown-aware pool of fire-and-forget tokio tasks.
//!
//! Every expensive lookup is spawned through a [`TaskPool`].  The pool caps
//! how many of them run at once (a semaphore), counts live tasks and lets
//! shutdown wait for them for a bounded grace period:
//!
//! ```text
//! spawn ──▶ live += 1 ──▶ acquire permit ──▶ run ──▶ live -= 1
//!                            │
//!                            └─ pool closed ──▶ abandoned, live -= 1
//! ```
//!
//! A panic inside a task is contained by tokio; the live counter is still
//! decremented because the guard is dropped during unwinding.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};

#[derive(Debug)]
struct Inner {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    live: AtomicUsize,
    idle: Notify,
}

/// Cheap-to-clone handle to a task pool.
#[derive(Debug, Clone)]
pub struct TaskPool {
    inner: Arc<Inner>,
}

/// Decrements the live counter when a task ends, however it ends.
struct LiveGuard(Arc<Inner>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        if self.0.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl TaskPool {
    /// A pool running at most `max_concurrent` tasks at once.
    pub fn new(name: &'static str, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
                live: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Spawn `fut` on the current runtime.  It starts once a permit is free;
    /// if the pool is shut down first it never runs.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        let guard = LiveGuard(Arc::clone(&self.inner));
        let semaphore = Arc::clone(&self.inner.semaphore);
        let name = self.inner.name;
        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = semaphore.acquire_owned().await else {
                log::debug!("pipeline: {name} pool closed, task abandoned");
                return;
            };
            fut.await;
        });
    }

    /// Tasks spawned and not yet finished (queued or running).
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    /// Wait until no task is live.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.live() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop handing out permits: queued tasks are abandoned and new ones
    /// never start.  Running tasks are left alone.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    /// [`close`](Self::close) the pool and wait up to `grace` for running
    /// tasks.  Returns `true` if the pool drained in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.close();
        let drained = tokio::time::timeout(grace, self.wait_idle()).await.is_ok();
        if drained {
            log::debug!("pipeline: {} pool drained", self.inner.name);
        } else {
            log::warn!(
                "pipeline: {} pool still has {} task(s) after {} ms, abandoning",
                self.inner.name,
                self.live(),
                grace.as_millis()
            );
        }
        drained
    }
}
