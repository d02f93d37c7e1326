use tokio::sync::mpsc;

use ava_core::{Environment, Message};

use crate::error::AdapterError;

/// Sending half of an adapter's error channel.
///
/// Unbounded: the dispatch worker both feeds and drains this channel, so a
/// bounded one could block the worker on itself.
pub type ErrorSink = mpsc::UnboundedSender<AdapterError>;

/// Everything a factory needs to build one adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    /// Registry key, also used as the adapter's name in logs.
    pub name: String,

    /// Adapter-specific settings (tokens, nick, …).
    pub environment: Environment,

    /// Capacity of the inbound and outbound message channels.
    pub buffer: usize,
}

/// The dispatch-loop side of a started adapter.
///
/// Created by [`Adapter::start`](crate::adapter::Adapter::start) and owned by
/// exactly one dispatch worker for the lifetime of the daemon.
#[derive(Debug)]
pub struct AdapterLink {
    /// Messages received from the chat surface, in arrival order.
    pub inbound: mpsc::Receiver<Message>,

    /// Replies to deliver to the chat surface.
    pub outbound: mpsc::Sender<Message>,

    /// Where the dispatch worker reports plugin failures.
    pub errors: ErrorSink,

    /// Errors raised by the adapter itself or by plugins, drained and logged
    /// by the dispatch worker.
    pub error_events: mpsc::UnboundedReceiver<AdapterError>,
}

/// The adapter side of the channel bundle: feeds inbound messages, drains
/// replies and reports its own errors.
#[derive(Debug)]
pub struct AdapterEnd {
    pub inbound: mpsc::Sender<Message>,
    pub outbound: mpsc::Receiver<Message>,
    pub errors: ErrorSink,
}

impl AdapterLink {
    /// Create a connected link/end pair with `buffer` slots per message
    /// channel.
    ///
    /// Panics if `buffer` is zero, like [`mpsc::channel`]; the daemon
    /// config rejects a zero buffer before any adapter is built.
    pub fn pair(buffer: usize) -> (AdapterLink, AdapterEnd) {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let link = AdapterLink {
            inbound: inbound_rx,
            outbound: outbound_tx,
            errors: errors_tx.clone(),
            error_events: errors_rx,
        };
        let end = AdapterEnd {
            inbound: inbound_tx,
            outbound: outbound_rx,
            errors: errors_tx,
        };
        (link, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_is_wired_both_ways() {
        let (mut link, mut end) = AdapterLink::pair(4);

        end.inbound.send(Message::new("ops", "ping")).await.unwrap();
        assert_eq!(link.inbound.recv().await.unwrap().body, "ping");

        link.outbound.send(Message::new("ops", "pong")).await.unwrap();
        assert_eq!(end.outbound.recv().await.unwrap().body, "pong");

        end.errors
            .send(AdapterError::Malformed("bad".into()))
            .unwrap();
        link.errors
            .send(AdapterError::StartFailed("worse".into()))
            .unwrap();
        assert!(matches!(
            link.error_events.recv().await,
            Some(AdapterError::Malformed(_))
        ));
        assert!(matches!(
            link.error_events.recv().await,
            Some(AdapterError::StartFailed(_))
        ));
    }

    #[tokio::test]
    async fn dropping_end_closes_inbound() {
        let (mut link, end) = AdapterLink::pair(1);
        drop(end);
        assert!(link.inbound.recv().await.is_none());
    }
}
