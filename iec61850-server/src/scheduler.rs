//! Per-association timer scheduler
//!
//! Every timer belongs to an entity of the model (an RCB or a controllable
//! object) and a [`TimerKind`]. Scheduling a timer for a key that is already
//! armed replaces it; cancelling by entity stops every timer of that entity.
//!
//! Timers run on the runtime the association was accepted on, so they can be
//! armed from host threads outside of it.

use iec61850_model::NodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Purpose of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Buffer time expiry of an RCB
    Flush,
    /// Periodic integrity report
    Integrity,
    /// General interrogation report
    Gi,
    /// Automatic deselection of a controllable object
    SboTimeout,
}

/// Timers of one association
#[derive(Debug)]
pub struct Scheduler {
    runtime: Handle,
    tasks: Mutex<HashMap<(NodeId, TimerKind), JoinHandle<()>>>,
    closed: Mutex<bool>,
}

impl Scheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Mutex::new(HashMap::new()),
            closed: Mutex::new(false),
        }
    }

    /// Run `task` once after `delay`
    ///
    /// # Returns
    ///
    /// `false` if the scheduler is shut down and the task will never run
    pub fn schedule<F>(&self, entity: NodeId, kind: TimerKind, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.insert(
            entity,
            kind,
            self.runtime.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                task.await;
            }),
        )
    }

    /// Run the task produced by `make_task` every `period`, first after one period
    pub fn schedule_periodic<F, Fut>(&self, entity: NodeId, kind: TimerKind, period: Duration, make_task: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.insert(
            entity,
            kind,
            self.runtime.spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    make_task().await;
                }
            }),
        )
    }

    fn insert(&self, entity: NodeId, kind: TimerKind, handle: JoinHandle<()>) -> bool {
        if *self.closed.lock() {
            handle.abort();
            return false;
        }
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, task| !task.is_finished());
        if let Some(previous) = tasks.insert((entity, kind), handle) {
            previous.abort();
        }
        true
    }

    pub fn cancel(&self, entity: NodeId, kind: TimerKind) {
        if let Some(task) = self.tasks.lock().remove(&(entity, kind)) {
            task.abort();
        }
    }

    /// Cancel every timer of an entity
    pub fn cancel_entity(&self, entity: NodeId) {
        self.tasks.lock().retain(|(e, _), task| {
            if *e == entity {
                task.abort();
                false
            } else {
                true
            }
        });
    }

    pub fn is_scheduled(&self, entity: NodeId, kind: TimerKind) -> bool {
        self.tasks
            .lock()
            .get(&(entity, kind))
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancel everything and refuse new timers
    pub fn shutdown(&self) {
        *self.closed.lock() = true;
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            task.abort();
        }
    }
}
