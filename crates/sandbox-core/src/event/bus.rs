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

use flume::TrySendError;

/// Manages a generic event channel with a bounded backlog.
///
/// The bus owns both ends of the channel. Publishing never blocks: once the
/// backlog is full, new events are dropped until a consumer drains it, so a
/// host that never listens does not grow memory every frame.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new EventBus whose backlog holds at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        log::debug!("EventBus initialized (capacity={capacity}).");
        Self { sender, receiver }
    }

    /// Publishes an event, dropping it if the backlog is full.
    ///
    /// ## Returns
    /// `true` if the event was queued.
    pub fn publish(&self, event: T) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("EventBus backlog full, dropping event.");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("Failed to send event: receiver disconnected.");
                false
            }
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a clone of the receiver end of the channel.
    ///
    /// Every receiver competes for the same events; each event is delivered once.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Removes and returns every event currently queued.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Stepped,
        Resized { width: u32 },
    }

    #[test]
    fn event_bus_starts_empty() {
        let bus = EventBus::<TestEvent>::with_capacity(4);
        assert!(bus.is_empty());
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn publish_and_drain_in_order() {
        let bus = EventBus::<TestEvent>::with_capacity(4);
        assert!(bus.publish(TestEvent::Stepped));
        assert!(bus.publish(TestEvent::Resized { width: 3 }));

        assert_eq!(bus.len(), 2);
        assert_eq!(
            bus.drain(),
            vec![TestEvent::Stepped, TestEvent::Resized { width: 3 }]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn full_backlog_drops_new_events() {
        let bus = EventBus::<TestEvent>::with_capacity(2);
        assert!(bus.publish(TestEvent::Stepped));
        assert!(bus.publish(TestEvent::Stepped));
        assert!(!bus.publish(TestEvent::Resized { width: 1 }));

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| *e == TestEvent::Stepped));
    }

    #[test]
    fn external_sender_feeds_the_bus() {
        let bus = EventBus::<TestEvent>::with_capacity(2);
        bus.sender()
            .send(TestEvent::Resized { width: 7 })
            .expect("Send should succeed");
        assert_eq!(
            bus.receiver().try_recv(),
            Ok(TestEvent::Resized { width: 7 })
        );
    }
}
