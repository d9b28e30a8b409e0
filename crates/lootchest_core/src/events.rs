//! Typed publish/subscribe between the 3D core and the overlay UI.
//!
//! Every subscriber owns an unbounded queue; publishing clones the event into
//! each live queue and forgets queues whose receiver was dropped. Consumers
//! drain their queue on the frame thread, so nothing here ever blocks a tick.

use std::sync::Mutex;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::camera::CameraSnapshot;

/// The chest picked in the overlay's selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestSelection {
    pub id: String,
    pub name: String,
    /// Manifest name of the chest model.
    pub model: String,
}

/// Anchor points of the bound chest plus the camera needed to project them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChestPoints {
    pub points: Vec<Vec3>,
    pub camera: CameraSnapshot,
}

/// Events the UI sends into the core.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChestSelected(ChestSelection),
}

/// Events the core sends out to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    ChestPointsUpdated(ChestPoints),
    ShowUi,
    HideUi,
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::ChestSelected(_) => "chest-selected",
        }
    }
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::ChestPointsUpdated(_) => "chest-points-updated",
            OutboundEvent::ShowUi => "show-ui",
            OutboundEvent::HideUi => "hide-ui",
        }
    }
}

pub struct EventBus<E> {
    subscribers: Mutex<Vec<UnboundedSender<E>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventReceiver<E> {
        let (tx, rx) = unbounded_channel();
        self.lock().push(tx);
        EventReceiver(rx)
    }

    /// Sends `event` to every live subscriber, returning how many received it.
    pub fn publish(&self, event: E) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Drops every subscription; receivers observe a closed bus.
    pub fn disconnect_all(&self) {
        let mut subscribers = self.lock();
        log::debug!("disconnecting {} event subscribers", subscribers.len());
        subscribers.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<E>>> {
        // A poisoned list of senders is still a valid list of senders.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct EventReceiver<E>(UnboundedReceiver<E>);

impl<E> EventReceiver<E> {
    pub fn try_recv(&mut self) -> Option<E> {
        self.0.try_recv().ok()
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.0.try_recv() {
            events.push(event);
        }
        events
    }

    /// `true` once the bus disconnected this receiver and the queue is empty.
    pub fn is_disconnected(&self) -> bool {
        self.0.is_closed() && self.0.is_empty()
    }

    pub async fn recv(&mut self) -> Option<E> {
        self.0.recv().await
    }
}
