// MIT License - Copyright (c) 2026 Peter Wright
// Broadcast event bus for panel activity

use tokio::sync::broadcast;

/// Events emitted as the gateway processes panel traffic. Receivers that lag
/// behind drop the oldest events (broadcast channel semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Serial link opened and the startup sequence was issued.
    Connected,
    /// Serial link closed or failed; fatal to the daemon.
    Disconnected,
    /// A checksum-valid frame arrived (before any state transition).
    FrameReceived { code: u16 },
    ZoneOpened { zone: u8 },
    ZoneRestored { zone: u8 },
    /// Label transfer finished (label index 151 arrived).
    LabelsLoaded,
    /// The keypad-visible state changed; carries the new etag.
    KeypadChanged { etag: u64 },
    /// The panel acknowledged the in-flight command.
    CommandAcknowledged { code: u16 },
    /// The in-flight command was dropped after the ack timeout.
    AckTimeout { code: u16 },
}

pub type EventSender = broadcast::Sender<PanelEvent>;
pub type EventReceiver = broadcast::Receiver<PanelEvent>;

/// Create the event channel with the given buffer capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}
