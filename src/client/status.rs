use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use super::ClientError;

/// The one user-visible message a surface shows. A new message replaces
/// whatever was there.
#[derive(Debug, Clone)]
pub struct StatusLine(Arc<watch::Sender<Option<String>>>);

impl Default for StatusLine {
    fn default() -> Self { Self::new() }
}

impl StatusLine {
    pub fn new() -> Self { Self(Arc::new(watch::Sender::new(None))) }

    pub fn report(&self, err: &ClientError) {
        warn!(%err, "surfacing error");
        self.0.send_replace(Some(err.to_string()));
    }

    pub fn clear(&self) { self.0.send_replace(None); }

    pub fn message(&self) -> Option<String> { self.0.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> { self.0.subscribe() }
}
