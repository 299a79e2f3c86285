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

//! The unit-of-work contract executed by pool workers.

use crate::monitor::SharedMonitor;
use crate::worker::WorkerId;
use std::thread;
use std::time::Duration;

/// Everything a unit of work may know about the worker running it.
///
/// The monitor is reachable only for diagnostics; a unit of work cannot
/// acquire the lock through this context.
#[derive(Debug, Clone, Copy)]
pub struct WorkContext<'a> {
    worker: WorkerId,
    name: &'a str,
    generation: u64,
    monitor: &'a SharedMonitor,
}

impl<'a> WorkContext<'a> {
    /// Creates a context for one execution of a unit of work.
    pub fn new(
        worker: WorkerId,
        name: &'a str,
        generation: u64,
        monitor: &'a SharedMonitor,
    ) -> Self {
        Self {
            worker,
            name,
            generation,
            monitor,
        }
    }

    /// Identifier of the running worker.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Thread name of the running worker.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Work-request generation this execution serves.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether any thread currently holds the shared monitor's lock.
    pub fn lock_held(&self) -> bool {
        self.monitor.is_held()
    }
}

/// One bounded, non-reentrant task run by a worker after each wake.
///
/// Implementations run with the monitor's lock released and must not touch
/// shared mutable state except through their own synchronization.
pub trait WorkUnit: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Performs the work. Errors are logged by the worker and never stop it.
    fn run(&self, ctx: &WorkContext<'_>) -> anyhow::Result<()>;
}

/// A fixed-duration simulated task.
#[derive(Debug, Clone)]
pub struct SimulatedTask {
    duration: Duration,
}

impl SimulatedTask {
    /// Default duration of one simulated unit.
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(1000);

    /// Creates a task that sleeps for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Duration of one execution.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for SimulatedTask {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

impl WorkUnit for SimulatedTask {
    fn name(&self) -> &str {
        "simulated-task"
    }

    fn run(&self, ctx: &WorkContext<'_>) -> anyhow::Result<()> {
        log::info!("{}: doing something", ctx.name());
        thread::sleep(self.duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn context_accessors() {
        let monitor = SharedMonitor::new();
        let ctx = WorkContext::new(WorkerId(4), "worker-4", 9, &monitor);
        assert_eq!(ctx.worker(), WorkerId(4));
        assert_eq!(ctx.name(), "worker-4");
        assert_eq!(ctx.generation(), 9);
        assert!(!ctx.lock_held());

        let _guard = monitor.lock();
        assert!(ctx.lock_held());
    }

    #[test]
    fn simulated_task_sleeps_for_its_duration() {
        let monitor = SharedMonitor::new();
        let ctx = WorkContext::new(WorkerId(0), "worker-0", 1, &monitor);
        let task = SimulatedTask::new(Duration::from_millis(20));

        let start = Instant::now();
        task.run(&ctx).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn simulated_task_default_duration() {
        assert_eq!(
            SimulatedTask::default().duration(),
            Duration::from_millis(1000)
        );
    }
}
