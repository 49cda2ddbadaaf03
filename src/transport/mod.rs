//! Transport abstraction unifying WebSocket and MQTT behind one capability set (§4.1).
//!
//! Both transports resolve an inbound connection/message to a `charger_id` and hand the
//! raw text to the [`crate::router::Router`] directly, the way the teacher's WebSocket
//! server calls `handler.handle(&text)` inline rather than through an event queue.

pub mod mqtt;
pub mod websocket;

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::codec::OcppFrame;
use crate::support::errors::CsmsError;

/// OCPP 1.6 WebSocket subprotocol, required on the Sec-WebSocket-Protocol header.
pub const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

/// Bounded inbound frame buffer sitting between a transport's raw read loop and
/// `Router::on_inbound` (§5). Full buffers drop the oldest entry rather than applying
/// backpressure to the socket/eventloop read.
pub struct InboundQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> InboundQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), items: Mutex::new(VecDeque::new()), notify: Notify::new() }
    }

    /// Pushes `item`, returning the oldest buffered item if it had to be dropped to stay
    /// within capacity.
    pub async fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock().await;
        let dropped = if items.len() >= self.capacity { items.pop_front() } else { None };
        items.push_back(item);
        drop(items);
        self.notify.notify_one();
        dropped
    }

    pub async fn pop(&self) -> T {
        loop {
            let notified = self.notify.notified();
            {
                let mut items = self.items.lock().await;
                if let Some(item) = items.pop_front() {
                    return item;
                }
            }
            notified.await;
        }
    }
}

/// A handle a Session/Router uses to push a server-initiated CALL or a response back down
/// to a charger, regardless of which transport it arrived on. Takes the transport-agnostic
/// `OcppFrame` rather than pre-serialized text so each implementation can apply its own
/// wire encoding (bracketed-array for WebSocket, JSON object for MQTT, per §6).
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send(&self, frame: &OcppFrame) -> Result<(), CsmsError>;
    async fn close(&self);
}
