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

//! # Hive Control
//!
//! A small pool of long-lived workers that sleep on one shared monitor,
//! run a unit of work each time they are signalled, and terminate through a
//! race-free shutdown protocol.
//!
//! ```no_run
//! use hive_control::{Controller, ControllerConfig};
//!
//! let controller = Controller::new(ControllerConfig::default());
//! controller.start(2)?;
//! controller.signal()?;
//! controller.shutdown()?;
//! # Ok::<(), hive_core::ControlError>(())
//! ```

pub mod config;
pub mod controller;
pub mod worker;

pub use config::ControllerConfig;
pub use controller::{Controller, Phase};
pub use worker::{Worker, WorkerHandle};
