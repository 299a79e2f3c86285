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

//! # Hive Core
//!
//! Foundational types for the hive worker pool: the shared monitor every
//! worker parks on, the unit-of-work contract, worker status bookkeeping,
//! lifecycle events, and the controller's error type.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod monitor;
pub mod work;
pub mod worker;

pub use error::{ControlError, ControlResult};
pub use event::{EventBus, WorkerEvent};
pub use monitor::{MonitorGuard, MonitorStats, SharedMonitor};
pub use work::{SimulatedTask, WorkContext, WorkUnit};
pub use worker::{WorkerId, WorkerSnapshot, WorkerState, WorkerStatus};
