// SPDX-License-Identifier: MIT
/// Errors raised by a transport endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A subscriber's or replier's inbound queue was full; the message
    /// was dropped rather than applying backpressure to the publisher.
    #[error("subscriber queue is full, message dropped")]
    Backpressure,
    /// A request/reply round trip did not complete within its deadline.
    #[error("request timed out waiting for a reply")]
    Timeout,
    /// A frame was read but did not decode into a well-formed message.
    #[error("protocol error: {0}")]
    ProtocolError(String),
    /// The underlying connection was closed by the peer.
    #[error("connection closed by peer")]
    ConnectionClosed,
    /// An I/O error occurred on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The wire codec rejected a message.
    #[error("codec error: {0}")]
    Proto(#[from] urts_proto::ProtoError),
}
