// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A long-lived background worker parked on the shared monitor.
//!
//! Each wake is classified while the lock is still held:
//! termination wins over everything, a new work-request generation means one
//! unit of work, anything else is spurious and the worker parks again.
//! The unit of work itself always runs with the lock released.

use hive_core::event::publish_to;
use hive_core::{
    SharedMonitor, WorkContext, WorkUnit, WorkerEvent, WorkerId, WorkerSnapshot, WorkerState,
    WorkerStatus,
};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A worker before its thread is started.
pub struct Worker {
    id: WorkerId,
    name: String,
    monitor: Arc<SharedMonitor>,
    unit: Arc<dyn WorkUnit>,
    status: Arc<WorkerStatus>,
    events: flume::Sender<WorkerEvent>,
    served_generation: u64,
}

impl Worker {
    /// Creates a worker bound to `monitor`.
    ///
    /// `served_generation` is the generation the worker treats as already
    /// handled; any higher generation is a pending request.
    pub fn new(
        id: WorkerId,
        name: impl Into<String>,
        monitor: Arc<SharedMonitor>,
        unit: Arc<dyn WorkUnit>,
        events: flume::Sender<WorkerEvent>,
        served_generation: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            monitor,
            unit,
            status: Arc::new(WorkerStatus::new()),
            events,
            served_generation,
        }
    }

    /// Starts the worker on a named OS thread.
    pub fn spawn(self) -> io::Result<WorkerHandle> {
        let id = self.id;
        let name = self.name.clone();
        let status = Arc::clone(&self.status);
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())?;
        Ok(WorkerHandle {
            id,
            name,
            status,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        log::debug!("{}: started", self.name);

        while let Some(generation) = self.await_work() {
            self.perform(generation);
        }

        self.status.set_state(WorkerState::Terminated);
        publish_to(&self.events, WorkerEvent::Terminated { worker: self.id });
        log::info!("{}: done doing stuff.", self.name);
    }

    /// Blocks until there is a unit of work to run or the pool terminates.
    ///
    /// Returns the generation to serve, or `None` once terminating.
    fn await_work(&mut self) -> Option<u64> {
        let mut guard = self.monitor.lock();
        let mut woken = false;

        loop {
            if guard.is_terminating() {
                return None;
            }

            let generation = guard.generation();
            if generation != self.served_generation {
                self.served_generation = generation;
                return Some(generation);
            }

            if woken {
                self.status.record_spurious();
                log::trace!("{}: spurious wakeup", self.name);
                publish_to(&self.events, WorkerEvent::SpuriousWakeup { worker: self.id });
            } else {
                self.status.set_state(WorkerState::Waiting);
                log::debug!("{}: waiting for condition", self.name);
                // Still under the lock: a broadcast issued after this event
                // is observed cannot be missed.
                publish_to(&self.events, WorkerEvent::Waiting { worker: self.id });
            }

            guard = guard.wait();
            woken = true;
        }
    }

    fn perform(&self, generation: u64) {
        self.status.set_state(WorkerState::Working);
        publish_to(
            &self.events,
            WorkerEvent::WorkStarted {
                worker: self.id,
                generation,
            },
        );
        log::debug!(
            "{}: running '{}' for generation {}",
            self.name,
            self.unit.name(),
            generation
        );

        let ctx = WorkContext::new(self.id, &self.name, generation, &self.monitor);
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.unit.run(&ctx)));

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(format!("{error:#}")),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        match failure {
            None => {
                self.status.record_completed();
                publish_to(
                    &self.events,
                    WorkerEvent::WorkCompleted {
                        worker: self.id,
                        generation,
                        elapsed: started.elapsed(),
                    },
                );
            }
            Some(error) => {
                self.status.record_failed();
                log::error!(
                    "{}: unit of work '{}' failed: {}",
                    self.name,
                    self.unit.name(),
                    error
                );
                publish_to(
                    &self.events,
                    WorkerEvent::WorkFailed {
                        worker: self.id,
                        generation,
                        error,
                    },
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// Handle to a started worker.
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    name: String,
    status: Arc<WorkerStatus>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Identifier of the worker.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Thread name of the worker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copies the worker's current status.
    pub fn snapshot(&self) -> WorkerSnapshot {
        self.status.snapshot(self.id, &self.name)
    }

    /// Returns `true` once the thread has exited or been joined.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the thread to exit. Joining twice is a no-op.
    pub fn join(&mut self) -> thread::Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }

    pub(crate) fn take_thread(&mut self) -> Option<JoinHandle<()>> {
        self.thread.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct CountingUnit {
        runs: AtomicUsize,
    }

    impl WorkUnit for CountingUnit {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(&self, _: &WorkContext<'_>) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn spawn_worker(
        monitor: &Arc<SharedMonitor>,
        unit: Arc<dyn WorkUnit>,
    ) -> (WorkerHandle, flume::Receiver<WorkerEvent>) {
        let (tx, rx) = flume::unbounded();
        let worker = Worker::new(WorkerId(0), "worker-0", Arc::clone(monitor), unit, tx, 0);
        (worker.spawn().unwrap(), rx)
    }

    fn terminate(monitor: &SharedMonitor) {
        monitor.with_lock(|guard| {
            guard.set_terminating();
            guard.broadcast();
        });
    }

    #[test]
    fn parks_then_terminates() {
        let monitor = Arc::new(SharedMonitor::new());
        let unit = Arc::new(CountingUnit::default());
        let (mut handle, events) = spawn_worker(&monitor, unit.clone());

        assert_eq!(
            events.recv_timeout(TIMEOUT).unwrap(),
            WorkerEvent::Waiting {
                worker: WorkerId(0)
            }
        );
        terminate(&monitor);
        handle.join().unwrap();

        assert_eq!(
            events.recv_timeout(TIMEOUT).unwrap(),
            WorkerEvent::Terminated {
                worker: WorkerId(0)
            }
        );
        assert_eq!(unit.runs.load(Ordering::SeqCst), 0);
        assert_eq!(handle.snapshot().state, WorkerState::Terminated);
        assert!(handle.is_finished());
    }

    #[test]
    fn pending_request_is_served_before_parking() {
        let monitor = Arc::new(SharedMonitor::new());
        monitor.with_lock(|guard| {
            guard.request_work();
        });

        let unit = Arc::new(CountingUnit::default());
        let (mut handle, events) = spawn_worker(&monitor, unit.clone());

        assert!(matches!(
            events.recv_timeout(TIMEOUT).unwrap(),
            WorkerEvent::WorkStarted { generation: 1, .. }
        ));
        assert!(matches!(
            events.recv_timeout(TIMEOUT).unwrap(),
            WorkerEvent::WorkCompleted { generation: 1, .. }
        ));
        assert!(matches!(
            events.recv_timeout(TIMEOUT).unwrap(),
            WorkerEvent::Waiting { .. }
        ));

        terminate(&monitor);
        handle.join().unwrap();
        assert_eq!(unit.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn termination_wins_over_pending_request() {
        let monitor = Arc::new(SharedMonitor::new());
        monitor.with_lock(|guard| {
            guard.request_work();
            guard.set_terminating();
        });

        let unit = Arc::new(CountingUnit::default());
        let (mut handle, events) = spawn_worker(&monitor, unit.clone());
        handle.join().unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            WorkerEvent::Terminated {
                worker: WorkerId(0)
            }
        );
        assert_eq!(unit.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
