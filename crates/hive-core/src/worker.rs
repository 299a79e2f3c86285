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

//! Worker identity, state machine states, and status bookkeeping.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Stable identifier of a worker, equal to its creation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// The states a worker moves through.
///
/// `Waiting` is initial, `Terminated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Parked on the shared monitor.
    Waiting = 0,
    /// Running one unit of work with the lock released.
    Working = 1,
    /// Observed the termination flag and left its loop.
    Terminated = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Waiting,
            1 => WorkerState::Working,
            _ => WorkerState::Terminated,
        }
    }
}

/// Lock-free status cell a worker updates and observers read.
#[derive(Debug)]
pub struct WorkerStatus {
    state: AtomicU8,
    units_completed: AtomicU64,
    units_failed: AtomicU64,
    spurious_wakeups: AtomicU64,
}

impl WorkerStatus {
    /// Creates a status in the `Waiting` state with zeroed counters.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Waiting as u8),
            units_completed: AtomicU64::new(0),
            units_failed: AtomicU64::new(0),
            spurious_wakeups: AtomicU64::new(0),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Records a state transition. Once `Terminated`, the state is final.
    pub fn set_state(&self, state: WorkerState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != WorkerState::Terminated as u8).then_some(state as u8)
            });
    }

    /// Counts a unit of work that finished successfully.
    pub fn record_completed(&self) {
        self.units_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a unit of work that returned an error or panicked.
    pub fn record_failed(&self) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a wake that carried neither work nor termination.
    pub fn record_spurious(&self) {
        self.spurious_wakeups.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the status for reporting.
    pub fn snapshot(&self, id: WorkerId, name: &str) -> WorkerSnapshot {
        WorkerSnapshot {
            id,
            name: name.to_owned(),
            state: self.state(),
            units_completed: self.units_completed.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            spurious_wakeups: self.spurious_wakeups.load(Ordering::Relaxed),
        }
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of one worker's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    /// Worker identifier.
    pub id: WorkerId,
    /// Thread name of the worker.
    pub name: String,
    /// State at the time of the snapshot.
    pub state: WorkerState,
    /// Units of work that returned `Ok`.
    pub units_completed: u64,
    /// Units of work that returned an error or panicked.
    pub units_failed: u64,
    /// Wakes that carried neither work nor termination.
    pub spurious_wakeups: u64,
}

impl WorkerSnapshot {
    /// Total units of work attempted, successful or not.
    pub fn units_attempted(&self) -> u64 {
        self.units_completed + self.units_failed
    }
}
