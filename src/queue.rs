// MIT License - Copyright (c) 2026 Peter Wright
// Single-in-flight outbound command queue

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::frame::Frame;

struct Pending {
    frame: Frame,
    sent_at: Instant,
}

/// Outbound flow control: the panel accepts one command at a time, so at
/// most one frame is ever in flight; everything else waits in FIFO order
/// until a COMMAND_ACKNOWLEDGE (or the ack timeout) releases the next one.
///
/// The timeout is a deliberate addition over the panel's documented
/// behavior: without it a single lost acknowledgment stalls outbound
/// traffic forever.
pub struct OutboundQueue {
    pending: Option<Pending>,
    waiting: VecDeque<Frame>,
    ack_timeout: Duration,
}

impl OutboundQueue {
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            pending: None,
            waiting: VecDeque::new(),
            ack_timeout,
        }
    }

    /// Submit a frame. Returns the frame to write to the panel right now
    /// (and marks it in flight) when the link is idle; otherwise the frame
    /// joins the waiting queue and `None` is returned.
    pub fn submit(&mut self, frame: Frame) -> Option<Frame> {
        if self.pending.is_some() {
            self.waiting.push_back(frame);
            return None;
        }
        self.pending = Some(Pending {
            frame: frame.clone(),
            sent_at: Instant::now(),
        });
        Some(frame)
    }

    /// The panel acknowledged the in-flight frame. Returns the next frame to
    /// write, already marked in flight, when one is waiting.
    pub fn acknowledge(&mut self) -> Option<Frame> {
        self.pending = None;
        self.release_next()
    }

    /// Drop the in-flight frame if it has waited longer than the ack
    /// timeout. Returns the expired frame and the next one to write.
    pub fn expire(&mut self, now: Instant) -> Option<(Frame, Option<Frame>)> {
        let timed_out = self
            .pending
            .as_ref()
            .is_some_and(|p| now.duration_since(p.sent_at) >= self.ack_timeout);
        if !timed_out {
            return None;
        }
        let expired = self.pending.take().map(|p| p.frame)?;
        let next = self.release_next();
        Some((expired, next))
    }

    fn release_next(&mut self) -> Option<Frame> {
        let frame = self.waiting.pop_front()?;
        self.pending = Some(Pending {
            frame: frame.clone(),
            sent_at: Instant::now(),
        });
        Some(frame)
    }

    pub fn pending_code(&self) -> Option<u16> {
        self.pending.as_ref().map(|p| p.frame.code)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.waiting.is_empty()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }
}
