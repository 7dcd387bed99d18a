//! Actor plumbing shared by the long-running tasks of a surface.
//!
//! Every message carries the [`Span`] that was current when it was sent, so
//! the receiving side can re-enter it and keep traces connected across the
//! channel hop.

use tokio::sync::mpsc;
use tracing::Span;

pub mod hotkey_dispatcher;

pub use hotkey_dispatcher::{DispatcherHandle, HotkeyDispatcher, HotkeyResolution};

#[derive(Debug)]
pub struct Sender<Event>(mpsc::UnboundedSender<(Span, Event)>);

#[derive(Debug)]
pub struct Receiver<Event>(mpsc::UnboundedReceiver<(Span, Event)>);

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Sender(tx), Receiver(rx))
}

impl<Event> Sender<Event> {
    pub fn send(&self, event: Event) { _ = self.try_send(event) }

    pub fn try_send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.0
            .send((Span::current(), event))
            .map_err(|mpsc::error::SendError((_, event))| mpsc::error::SendError(event))
    }

    pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Event> Receiver<Event> {
    pub async fn recv(&mut self) -> Option<(Span, Event)> { self.0.recv().await }

    pub fn try_recv(&mut self) -> Option<(Span, Event)> { self.0.try_recv().ok() }

    pub fn close(&mut self) { self.0.close() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (tx, mut rx) = channel();
        tx.send(1);
        tx.send(2);
        drop(tx);

        let mut seen = Vec::new();
        while let Some((_span, event)) = rx.recv().await {
            seen.push(event);
        }
        assert_eq!(vec![1, 2], seen);
    }

    #[test]
    fn send_after_close_returns_event() {
        let (tx, mut rx) = channel::<u32>();
        rx.close();
        let err = tx.try_send(7).unwrap_err();
        assert_eq!(7, err.0);
        assert!(tx.is_closed());
    }
}
