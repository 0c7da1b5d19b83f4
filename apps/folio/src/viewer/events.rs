//! Viewer events published to the UI shell
//!
//! Events fan out over a `tokio::sync::broadcast` channel. Dropping a
//! [`ViewerSubscription`] unsubscribes; a subscriber that falls behind skips
//! the events it missed.

use serde::Serialize;
use tokio::sync::broadcast;

/// Requested scroll animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    DocumentOpened {
        book_id: String,
        page_count: u32,
        current_page: u32,
    },
    /// A render finished and its surfaces are final
    LayoutCommitted {
        generation: u64,
        scale: f32,
        page_count: u32,
        failed_pages: Vec<u32>,
    },
    PageRenderFailed {
        generation: u64,
        page: u32,
        reason: String,
    },
    /// The shell should scroll the container to `scroll_top`
    ScrollRequested {
        scroll_top: f64,
        behavior: ScrollBehavior,
    },
    ActivePageChanged {
        page: u32,
    },
    ResumeAvailable {
        page: u32,
    },
    ReadingModeChanged {
        enabled: bool,
    },
    Closed,
}

/// Sending half shared by the viewer
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ViewerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers; no subscribers is fine
    pub fn publish(&self, event: ViewerEvent) {
        tracing::trace!(?event, "Viewer event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> ViewerSubscription {
        ViewerSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving half handed to a subscriber
pub struct ViewerSubscription {
    receiver: broadcast::Receiver<ViewerEvent>,
}

impl ViewerSubscription {
    /// Wait for the next event; `None` once the viewer is gone
    pub async fn next(&mut self) -> Option<ViewerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Viewer subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-published event, without waiting
    pub fn try_next(&mut self) -> Option<ViewerEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Viewer subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain everything published so far
    pub fn drain(&mut self) -> Vec<ViewerEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
