use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Per-table completion barriers shared by concurrent load workers.
///
/// A worker that creates a table calls [`TableReadiness::signal_ready`];
/// workers that insert into it, or create child tables under it, await
/// [`TableReadiness::wait_ready`] first. Barriers are one-shot: once open they
/// stay open. Clones share the same barriers.
#[derive(Debug, Clone, Default)]
pub struct TableReadiness {
    barriers: Arc<DashMap<String, watch::Sender<bool>>>,
}

impl TableReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(&self, name: &str) -> watch::Receiver<bool> {
        if let Some(sender) = self.barriers.get(name) {
            return sender.subscribe();
        }
        self.barriers
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Open the barrier for `name`, releasing every current and future waiter.
    pub fn signal_ready(&self, name: &str) {
        let was_ready = self
            .barriers
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .send_replace(true);
        if !was_ready {
            debug!(target: "kwproto::load", table = name, "table ready");
        }
    }

    /// Resolve once `name` has been signalled, immediately if it already was.
    pub async fn wait_ready(&self, name: &str) {
        let mut rx = self.subscribe(name);
        // The sender lives in the map for as long as `self` does, so the
        // channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.barriers
            .get(name)
            .map(|sender| *sender.borrow())
            .unwrap_or(false)
    }
}
