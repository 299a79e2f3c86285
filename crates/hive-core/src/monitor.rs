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

//! The shared monitor: one mutex paired with one condition variable.
//!
//! Every worker and the controller rendezvous on a single [`SharedMonitor`].
//! The guarded [`MonitorState`] is only reachable through a [`MonitorGuard`],
//! so the termination flag and the work-request generation can never be read
//! or written without holding the lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// State protected by the monitor's lock.
#[derive(Debug, Default)]
pub struct MonitorState {
    terminating: bool,
    generation: u64,
}

/// Counters describing how the monitor has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Number of explicit lock acquisitions.
    pub acquisitions: u64,
    /// Number of broadcasts issued by lock holders.
    pub broadcasts: u64,
    /// Number of interruptions delivered to parked waiters.
    pub interrupts: u64,
}

/// A mutex and a condition variable bound to it, shared by a worker pool.
#[derive(Debug, Default)]
pub struct SharedMonitor {
    state: Mutex<MonitorState>,
    condvar: Condvar,
    held: AtomicBool,
    acquisitions: AtomicU64,
    broadcasts: AtomicU64,
    interrupts: AtomicU64,
}

impl SharedMonitor {
    /// Creates a monitor with `terminating == false` and generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock.
    ///
    /// A poisoned lock is recovered: the guarded state is two plain values
    /// that are never left half-written.
    pub fn lock(&self) -> MonitorGuard<'_> {
        let inner = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        MonitorGuard {
            monitor: self,
            marker: HeldMarker::mark(&self.held),
            inner,
        }
    }

    /// Runs `body` with the lock held and releases it on every exit path,
    /// unwinding included.
    pub fn with_lock<R>(&self, body: impl FnOnce(&mut MonitorGuard<'_>) -> R) -> R {
        let mut guard = self.lock();
        body(&mut guard)
    }

    /// Wakes every parked waiter without touching the guarded state.
    ///
    /// Waiters observe this exactly like a spurious wakeup.
    pub fn interrupt(&self) {
        let _guard = self.lock();
        self.interrupts.fetch_add(1, Ordering::Relaxed);
        self.condvar.notify_all();
    }

    /// Returns `true` while some thread holds the lock outside of `wait`.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
        }
    }
}

/// Flags the lock as held for as long as it lives.
#[derive(Debug)]
struct HeldMarker<'a> {
    held: &'a AtomicBool,
}

impl<'a> HeldMarker<'a> {
    fn mark(held: &'a AtomicBool) -> Self {
        held.store(true, Ordering::SeqCst);
        Self { held }
    }
}

impl Drop for HeldMarker<'_> {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

/// Proof that the monitor's lock is held.
///
/// Field order matters: `marker` is dropped before `inner`, so the held flag
/// is cleared while the mutex is still locked.
#[derive(Debug)]
pub struct MonitorGuard<'a> {
    monitor: &'a SharedMonitor,
    marker: HeldMarker<'a>,
    inner: MutexGuard<'a, MonitorState>,
}

impl<'a> MonitorGuard<'a> {
    /// Atomically releases the lock and parks until woken, then reacquires it.
    ///
    /// Returning says nothing about the guarded state: the wake may be a
    /// broadcast, an interruption, or spurious. Callers re-check.
    pub fn wait(self) -> MonitorGuard<'a> {
        let MonitorGuard {
            monitor,
            marker,
            inner,
        } = self;
        drop(marker);
        let inner = monitor
            .condvar
            .wait(inner)
            .unwrap_or_else(PoisonError::into_inner);
        MonitorGuard {
            monitor,
            marker: HeldMarker::mark(&monitor.held),
            inner,
        }
    }

    /// Wakes every thread parked in [`wait`](Self::wait). The lock stays held.
    pub fn broadcast(&self) {
        self.monitor.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.monitor.condvar.notify_all();
    }

    /// Returns the termination flag.
    pub fn is_terminating(&self) -> bool {
        self.inner.terminating
    }

    /// Sets the termination flag. It is never cleared.
    pub fn set_terminating(&mut self) {
        self.inner.terminating = true;
    }

    /// Returns the current work-request generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Advances the work-request generation and returns the new value.
    pub fn request_work(&mut self) -> u64 {
        self.inner.generation = self.inner.generation.wrapping_add(1);
        self.inner.generation
    }
}
