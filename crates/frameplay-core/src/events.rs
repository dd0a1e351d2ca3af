//! Notifications delivered to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Receiver of player lifecycle notifications.
///
/// - `on_initialized` fires once, after the first successful preroll and sizing.
/// - `on_frame_decoded` fires from the runtime streaming thread for each
///   accepted frame. Only the latest frame is ever readable, so sinks may
///   coalesce these.
/// - `on_completed` fires at most once per end-of-stream, from inside the
///   position query that observed it.
pub trait PlayerEvents: Send + Sync {
    fn on_initialized(&self);
    fn on_frame_decoded(&self);
    fn on_completed(&self);
}

/// Notification as sent over a channel by [`ChannelEvents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Initialized,
    FrameDecoded,
    Completed,
}

/// [`PlayerEvents`] sink that forwards notifications into a channel.
///
/// `Initialized` and `Completed` are never dropped. `FrameDecoded` is
/// coalesced: at most one is queued until the host receives it.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    sender: Sender<PlayerEvent>,
    frame_pending: Arc<AtomicBool>,
}

impl ChannelEvents {
    /// Creates a sink and its receiving end.
    pub fn unbounded() -> (Self, EventReceiver) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let frame_pending = Arc::new(AtomicBool::new(false));
        (
            Self {
                sender,
                frame_pending: Arc::clone(&frame_pending),
            },
            EventReceiver {
                receiver,
                frame_pending,
            },
        )
    }

    fn send(&self, event: PlayerEvent) {
        // Host hung up; nothing left to notify.
        let _ = self.sender.send(event);
    }
}

impl PlayerEvents for ChannelEvents {
    fn on_initialized(&self) {
        self.send(PlayerEvent::Initialized);
    }

    fn on_frame_decoded(&self) {
        if !self.frame_pending.swap(true, Ordering::AcqRel) {
            self.send(PlayerEvent::FrameDecoded);
        }
    }

    fn on_completed(&self) {
        self.send(PlayerEvent::Completed);
    }
}

/// Receiving end of [`ChannelEvents`].
///
/// Receiving a `FrameDecoded` re-arms the sender so the next frame queues a
/// fresh one.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: Receiver<PlayerEvent>,
    frame_pending: Arc<AtomicBool>,
}

impl EventReceiver {
    fn observe(&self, event: PlayerEvent) -> PlayerEvent {
        if event == PlayerEvent::FrameDecoded {
            self.frame_pending.store(false, Ordering::Release);
        }
        event
    }

    pub fn try_recv(&self) -> Result<PlayerEvent, TryRecvError> {
        self.receiver.try_recv().map(|e| self.observe(e))
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout).map(|e| self.observe(e))
    }

    /// Drains every queued notification without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = PlayerEvent> + '_ {
        std::iter::from_fn(move || self.try_recv().ok())
    }

    /// Number of queued notifications.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
