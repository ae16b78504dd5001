use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::Message;

/// Default channel buffer size for inter-component messaging.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// The message bus connecting gateway, presence handler, scheduler and announcer.
///
/// Built on Tokio mpsc channels. Each receiver can be taken exactly once.
pub struct StayBus {
    pub presence_tx: mpsc::Sender<Message>,
    pub presence_rx: Option<mpsc::Receiver<Message>>,

    pub scheduler_tx: mpsc::Sender<Message>,
    pub scheduler_rx: Option<mpsc::Receiver<Message>>,

    pub announcer_tx: mpsc::Sender<Message>,
    pub announcer_rx: Option<mpsc::Receiver<Message>>,
}

impl StayBus {
    /// Create a new bus with default buffer sizes.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (presence_tx, presence_rx) = mpsc::channel(buffer);
        let (scheduler_tx, scheduler_rx) = mpsc::channel(buffer);
        let (announcer_tx, announcer_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "StayBus initialized");

        Self {
            presence_tx,
            presence_rx: Some(presence_rx),
            scheduler_tx,
            scheduler_rx: Some(scheduler_rx),
            announcer_tx,
            announcer_rx: Some(announcer_rx),
        }
    }

    /// Take the presence receiver (can only be called once).
    pub fn take_presence_rx(&mut self) -> Option<mpsc::Receiver<Message>> {
        debug!("Presence receiver taken");
        self.presence_rx.take()
    }

    /// Take the scheduler receiver (can only be called once).
    pub fn take_scheduler_rx(&mut self) -> Option<mpsc::Receiver<Message>> {
        debug!("Scheduler receiver taken");
        self.scheduler_rx.take()
    }

    /// Take the announcer receiver (can only be called once).
    pub fn take_announcer_rx(&mut self) -> Option<mpsc::Receiver<Message>> {
        debug!("Announcer receiver taken");
        self.announcer_rx.take()
    }
}

impl Default for StayBus {
    fn default() -> Self {
        Self::new()
    }
}
