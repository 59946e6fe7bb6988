// SPDX-License-Identifier: MIT
//! TCP transport endpoints for URTS services: a fan-out publisher and its
//! subscribers, and a request/reply requestor and its replier, plus a
//! small in-memory service directory.

mod directory;
mod error;
mod framing;
mod publisher;
mod replier;
mod requestor;
mod subscriber;
pub mod zap;

pub use directory::ServiceDirectory;
pub use error::TransportError;
pub use publisher::Publisher;
pub use replier::Replier;
pub use requestor::{Requestor, DEFAULT_REQUEST_TIMEOUT};
pub use subscriber::Subscriber;
pub use zap::ZapOptions;

/// Default bound on a publisher's per-subscriber outbound queue.
pub const DEFAULT_SEND_HWM: usize = 8192;
/// Default bound a replier applies to its per-connection inbound queue.
pub const DEFAULT_RECV_HWM: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use urts_model::{ChannelId, Pick};
    use urts_proto::Message;

    fn pick_message() -> Message {
        let channel = ChannelId::new("UU", "FORK", "HHZ", "01").unwrap();
        Message::Pick(Pick::new(channel, 1_000, urts_model::PhaseHint::P, 1))
    }

    // ── 1. publish fans out to every connected subscriber ────────────────

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let publisher = Publisher::bind("127.0.0.1:0", ZapOptions::Grasslands, DEFAULT_SEND_HWM)
            .await
            .unwrap();
        let addr = publisher.local_addr();
        let mut subscriber = Subscriber::connect(addr, ZapOptions::Grasslands).await.unwrap();

        // Give the accept loop a moment to register the connection.
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(&pick_message(), 123).unwrap();

        let (message, ts) = tokio::time::timeout(Duration::from_secs(1), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, pick_message());
        assert_eq!(ts, 123);
    }

    // ── 2. request/reply round trip ───────────────────────────────────────

    #[tokio::test]
    async fn request_reply_round_trip() {
        let replier = Replier::bind("127.0.0.1:0", ZapOptions::Grasslands, |message, _ts| async move {
            Ok::<_, TransportError>(message)
        })
        .await
        .unwrap();
        let addr = replier.local_addr();
        let mut requestor = Requestor::connect(addr, ZapOptions::Grasslands).await.unwrap();

        let (reply, ts) = requestor
            .request(&pick_message(), 42, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, pick_message());
        assert_eq!(ts, 42);
    }

    // ── 3. request times out when no replier is listening ────────────────

    #[tokio::test]
    async fn request_times_out_without_replier() {
        let replier = Replier::bind("127.0.0.1:0", ZapOptions::Grasslands, |_m, _ts| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            unreachable!("handler should never finish within the test timeout")
        })
        .await
        .unwrap();
        let addr = replier.local_addr();
        let mut requestor = Requestor::connect(addr, ZapOptions::Grasslands).await.unwrap();

        let result = requestor
            .request(&pick_message(), 0, Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }
}
