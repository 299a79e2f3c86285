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

//! Worker lifecycle events and the bounded bus that carries them.

use crate::worker::WorkerId;
use std::time::Duration;

/// Something a worker did, published for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The worker is about to park. Published with the lock still held, so
    /// any broadcast issued after this event is observed reaches the worker.
    Waiting {
        /// Publishing worker.
        worker: WorkerId,
    },
    /// The worker woke without a work request or termination.
    SpuriousWakeup {
        /// Publishing worker.
        worker: WorkerId,
    },
    /// The worker released the lock and began a unit of work.
    WorkStarted {
        /// Publishing worker.
        worker: WorkerId,
        /// Work-request generation being served.
        generation: u64,
    },
    /// A unit of work returned `Ok`.
    WorkCompleted {
        /// Publishing worker.
        worker: WorkerId,
        /// Work-request generation served.
        generation: u64,
        /// Wall time spent in the unit.
        elapsed: Duration,
    },
    /// A unit of work returned an error or panicked.
    WorkFailed {
        /// Publishing worker.
        worker: WorkerId,
        /// Work-request generation served.
        generation: u64,
        /// Rendered failure message.
        error: String,
    },
    /// The worker observed the termination flag and exited.
    Terminated {
        /// Publishing worker.
        worker: WorkerId,
    },
}

impl WorkerEvent {
    /// Returns the worker that published this event.
    pub fn worker(&self) -> WorkerId {
        match self {
            WorkerEvent::Waiting { worker }
            | WorkerEvent::SpuriousWakeup { worker }
            | WorkerEvent::WorkStarted { worker, .. }
            | WorkerEvent::WorkCompleted { worker, .. }
            | WorkerEvent::WorkFailed { worker, .. }
            | WorkerEvent::Terminated { worker } => *worker,
        }
    }
}

/// A bounded, thread-safe event channel.
///
/// Publishing never blocks: when the buffer is full the event is dropped.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus holding at most `capacity` undelivered events.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self { sender, receiver }
    }

    /// Publishes an event, dropping it if the buffer is full.
    pub fn publish(&self, event: T) {
        publish_to(&self.sender, event);
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a clone of the receiver end of the channel.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }
}

/// Publishes on a bare sender with the same drop-when-full policy as
/// [`EventBus::publish`].
pub fn publish_to<T>(sender: &flume::Sender<T>, event: T) {
    match sender.try_send(event) {
        Ok(()) => {}
        Err(flume::TrySendError::Full(_)) => {
            log::trace!("Event buffer full, dropping event.");
        }
        Err(flume::TrySendError::Disconnected(_)) => {
            log::trace!("Event receiver disconnected, dropping event.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;

    #[test]
    fn publish_and_receive() {
        let bus = EventBus::bounded(4);
        bus.publish(WorkerEvent::Waiting {
            worker: WorkerId(0),
        });
        let event = bus.receiver().try_recv().unwrap();
        assert_eq!(event.worker(), WorkerId(0));
    }

    #[test]
    fn full_buffer_drops_newest() {
        let bus = EventBus::bounded(1);
        bus.publish(WorkerEvent::Waiting {
            worker: WorkerId(0),
        });
        bus.publish(WorkerEvent::Terminated {
            worker: WorkerId(1),
        });

        let receiver = bus.receiver();
        assert_eq!(
            receiver.try_recv().unwrap(),
            WorkerEvent::Waiting {
                worker: WorkerId(0)
            }
        );
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn sender_clones_share_the_buffer() {
        let bus = EventBus::bounded(8);
        let sender = bus.sender();
        publish_to(
            &sender,
            WorkerEvent::WorkStarted {
                worker: WorkerId(2),
                generation: 7,
            },
        );
        match bus.receiver().try_recv().unwrap() {
            WorkerEvent::WorkStarted { worker, generation } => {
                assert_eq!(worker, WorkerId(2));
                assert_eq!(generation, 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
