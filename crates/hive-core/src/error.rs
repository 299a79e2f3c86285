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

//! Errors surfaced to callers of the worker pool.

use std::io;

/// Precondition violations and setup failures reported by the controller.
///
/// Failures inside a unit of work never appear here; they are absorbed and
/// logged by the worker that ran the unit.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// `start` was asked for an empty pool.
    #[error("invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),
    /// `start` was called on a pool that has already been started.
    #[error("worker pool already started")]
    AlreadyStarted,
    /// `signal` or `shutdown` was called before `start`.
    #[error("worker pool not started")]
    NotStarted,
    /// The operating system refused to create a worker thread.
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        /// Name of the thread that could not be created.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ControlError {
    /// Returns `true` for errors caused by calling the API in the wrong order
    /// or with invalid arguments.
    pub fn is_misuse(&self) -> bool {
        !matches!(self, ControlError::Spawn { .. })
    }
}

/// Result alias for controller operations.
pub type ControlResult<T> = Result<T, ControlError>;
