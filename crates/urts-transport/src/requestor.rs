// SPDX-License-Identifier: MIT
use crate::error::TransportError;
use crate::framing::{read_frame, write_frame};
use crate::zap::ZapOptions;
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};
use urts_proto::Message;

/// The default deadline a [`Requestor`] waits for a reply before giving
/// up, matching the original service's polling timeout default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A client-side request/reply connection to a [`crate::Replier`].
pub struct Requestor {
    stream: TcpStream,
}

impl Requestor {
    /// Connect to a replier at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs, _zap: ZapOptions) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    /// Send `message` and wait up to `timeout` for a reply.
    pub async fn request(
        &mut self,
        message: &Message,
        timestamp_micros: i64,
        timeout: Duration,
    ) -> Result<(Message, i64), TransportError> {
        let payload = message.encode(timestamp_micros)?;
        write_frame(&mut self.stream, &payload).await?;
        let reply = tokio::time::timeout(timeout, read_frame(&mut self.stream))
            .await
            .map_err(|_| TransportError::Timeout)??;
        let (reply_message, ts) = Message::decode(&reply)?;
        Ok((reply_message, ts))
    }

    /// Send `message` and wait the default timeout for a reply.
    pub async fn request_default(
        &mut self,
        message: &Message,
        timestamp_micros: i64,
    ) -> Result<(Message, i64), TransportError> {
        self.request(message, timestamp_micros, DEFAULT_REQUEST_TIMEOUT).await
    }
}
