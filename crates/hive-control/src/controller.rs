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

//! The controller that owns the shared monitor and the worker set.

use crate::config::ControllerConfig;
use crate::worker::{Worker, WorkerHandle};
use hive_core::{
    ControlError, ControlResult, EventBus, MonitorStats, SharedMonitor, SimulatedTask,
    WorkUnit, WorkerEvent, WorkerId, WorkerSnapshot,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle phase of a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Created, no workers yet.
    Idle = 0,
    /// Workers are running and accept signals.
    Running = 1,
    /// Shutdown requested, workers are being joined.
    Stopping = 2,
    /// Every worker has been joined.
    Stopped = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Idle,
            1 => Phase::Running,
            2 => Phase::Stopping,
            _ => Phase::Stopped,
        }
    }
}

/// Owns a [`SharedMonitor`] and a fixed set of workers parked on it.
///
/// [`signal`](Self::signal) and [`shutdown`](Self::shutdown) are the only
/// operations that mutate the monitor's state, and both may be called from
/// any thread.
pub struct Controller {
    config: ControllerConfig,
    monitor: Arc<SharedMonitor>,
    unit: Arc<dyn WorkUnit>,
    phase: AtomicU8,
    workers: Mutex<Vec<WorkerHandle>>,
    events: EventBus<WorkerEvent>,
}

impl Controller {
    /// Creates a controller whose workers run a [`SimulatedTask`] of
    /// `config.work_duration()`.
    pub fn new(config: ControllerConfig) -> Self {
        let unit = Arc::new(SimulatedTask::new(config.work_duration()));
        Self::with_work_unit(config, unit)
    }

    /// Creates a controller whose workers run `unit` on every wake.
    pub fn with_work_unit(config: ControllerConfig, unit: Arc<dyn WorkUnit>) -> Self {
        let events = EventBus::bounded(config.event_buffer_size.max(1));
        Self {
            config,
            monitor: Arc::new(SharedMonitor::new()),
            unit,
            phase: AtomicU8::new(Phase::Idle as u8),
            workers: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Creates `count` workers on the shared monitor and starts them.
    ///
    /// May be called once. If a thread cannot be spawned, the workers
    /// already started are shut down and the controller ends `Stopped`.
    pub fn start(&self, count: usize) -> ControlResult<()> {
        if count == 0 {
            return Err(ControlError::InvalidWorkerCount(count));
        }
        self.phase
            .compare_exchange(
                Phase::Idle as u8,
                Phase::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| ControlError::AlreadyStarted)?;

        // Captured before any thread exists, so a signal issued as soon as
        // start() returns counts as pending for every worker.
        let served_generation = self.monitor.with_lock(|guard| guard.generation());

        let spawned: ControlResult<()> = {
            let mut workers = self.lock_workers();
            (0..count).try_for_each(|index| {
                let name = self.config.thread_name(index);
                let worker = Worker::new(
                    WorkerId(index),
                    name.clone(),
                    Arc::clone(&self.monitor),
                    Arc::clone(&self.unit),
                    self.events.sender(),
                    served_generation,
                );
                let handle = worker
                    .spawn()
                    .map_err(|source| ControlError::Spawn { name, source })?;
                workers.push(handle);
                Ok::<(), ControlError>(())
            })
        };

        match spawned {
            Ok(()) => {
                log::info!(
                    "Worker pool started with {} workers running '{}'.",
                    count,
                    self.unit.name()
                );
                Ok(())
            }
            Err(error) => {
                log::error!("Worker pool failed to start: {error}");
                if self.begin_stopping() {
                    self.stop_workers();
                }
                Err(error)
            }
        }
    }

    /// Wakes every parked worker so each runs one unit of work.
    ///
    /// Signals are not queued: several signals arriving while a worker is
    /// busy are served by a single extra unit. After shutdown this is a
    /// no-op.
    pub fn signal(&self) -> ControlResult<()> {
        match self.phase() {
            Phase::Idle => {
                log::warn!("Signal ignored: worker pool not started.");
                Err(ControlError::NotStarted)
            }
            Phase::Running => {
                let generation = self.monitor.with_lock(|guard| {
                    let generation = guard.request_work();
                    guard.broadcast();
                    generation
                });
                log::debug!("Signalled workers (generation {generation}).");
                Ok(())
            }
            Phase::Stopping | Phase::Stopped => {
                log::debug!("Signal ignored: worker pool is shut down.");
                Ok(())
            }
        }
    }

    /// Requests termination and blocks until every worker has exited.
    ///
    /// A unit of work already in progress is allowed to finish. Calling this
    /// again after the first call returns immediately.
    pub fn shutdown(&self) -> ControlResult<()> {
        match self.phase() {
            Phase::Idle => Err(ControlError::NotStarted),
            _ if self.begin_stopping() => {
                self.stop_workers();
                Ok(())
            }
            _ => {
                log::debug!("Shutdown already requested.");
                Ok(())
            }
        }
    }

    /// Delivers a wake to every parked worker without requesting work.
    ///
    /// Workers treat it as a spurious wakeup and park again.
    pub fn interrupt_workers(&self) {
        self.monitor.interrupt();
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Returns `true` while workers accept signals.
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Status of every worker, in creation order.
    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.lock_workers()
            .iter()
            .map(WorkerHandle::snapshot)
            .collect()
    }

    /// Number of worker threads that have not exited yet.
    pub fn running_workers(&self) -> usize {
        self.lock_workers()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Receiver for worker lifecycle events.
    pub fn events(&self) -> flume::Receiver<WorkerEvent> {
        self.events.receiver()
    }

    /// Usage counters of the shared monitor.
    pub fn monitor_stats(&self) -> MonitorStats {
        self.monitor.stats()
    }

    /// Configuration this controller was created with.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn begin_stopping(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Running as u8,
                Phase::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn stop_workers(&self) {
        self.monitor.with_lock(|guard| {
            guard.set_terminating();
            guard.broadcast();
        });

        // Taken out under the lock, joined outside it so observers are
        // never blocked behind a long unit of work.
        let threads: Vec<_> = self
            .lock_workers()
            .iter_mut()
            .filter_map(|handle| {
                let name = handle.name().to_owned();
                handle.take_thread().map(|thread| (name, thread))
            })
            .collect();

        for (name, thread) in threads {
            if thread.join().is_err() {
                log::error!("{name}: worker thread panicked outside its unit of work");
            }
        }

        self.phase.store(Phase::Stopped as u8, Ordering::Release);
        log::info!("Worker pool stopped.");
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<WorkerHandle>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            work_duration_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn signal_before_start_is_misuse() {
        let controller = Controller::new(fast_config());
        let error = controller.signal().unwrap_err();
        assert!(matches!(error, ControlError::NotStarted));
        assert!(error.is_misuse());
    }

    #[test]
    fn shutdown_before_start_is_misuse() {
        let controller = Controller::new(fast_config());
        assert!(matches!(
            controller.shutdown(),
            Err(ControlError::NotStarted)
        ));
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn start_rejects_empty_pool() {
        let controller = Controller::new(fast_config());
        assert!(matches!(
            controller.start(0),
            Err(ControlError::InvalidWorkerCount(0))
        ));
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn start_twice_is_misuse() {
        let controller = Controller::new(fast_config());
        controller.start(1).unwrap();
        assert!(matches!(
            controller.start(1),
            Err(ControlError::AlreadyStarted)
        ));
        controller.shutdown().unwrap();
    }

    #[test]
    fn lifecycle_phases() {
        let controller = Controller::new(fast_config());
        assert_eq!(controller.phase(), Phase::Idle);

        controller.start(3).unwrap();
        assert!(controller.is_running());
        assert_eq!(controller.workers().len(), 3);

        controller.shutdown().unwrap();
        assert_eq!(controller.phase(), Phase::Stopped);
        assert_eq!(controller.running_workers(), 0);

        // Second shutdown is a no-op.
        controller.shutdown().unwrap();
    }

    #[test]
    fn workers_are_named_from_config() {
        let controller = Controller::new(ControllerConfig {
            thread_name_prefix: "bee".into(),
            ..fast_config()
        });
        controller.start(2).unwrap();
        let names: Vec<_> = controller.workers().into_iter().map(|w| w.name).collect();
        assert_eq!(names, ["bee-0", "bee-1"]);
        controller.shutdown().unwrap();
    }

    #[test]
    fn signal_takes_the_lock_once_and_broadcasts() {
        let controller = Controller::new(fast_config());
        controller.start(1).unwrap();
        let before = controller.monitor_stats();

        controller.signal().unwrap();

        let after = controller.monitor_stats();
        assert!(after.acquisitions > before.acquisitions);
        assert_eq!(after.broadcasts, before.broadcasts + 1);
        controller.shutdown().unwrap();
    }

    #[test]
    fn drop_shuts_down_running_pool() {
        let controller = Controller::new(fast_config());
        controller.start(2).unwrap();
        let events = controller.events();
        drop(controller);

        let mut terminated = 0;
        while let Ok(event) = events.recv_timeout(Duration::from_millis(500)) {
            if matches!(event, WorkerEvent::Terminated { .. }) {
                terminated += 1;
            }
        }
        assert_eq!(terminated, 2);
    }
}
