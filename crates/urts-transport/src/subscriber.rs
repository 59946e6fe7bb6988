// SPDX-License-Identifier: MIT
use crate::error::TransportError;
use crate::framing::read_frame;
use crate::zap::ZapOptions;
use tokio::net::{TcpStream, ToSocketAddrs};
use urts_proto::Message;

/// A connection to a [`crate::Publisher`] that yields decoded messages as
/// they arrive.
pub struct Subscriber {
    stream: TcpStream,
}

impl Subscriber {
    /// Connect to a publisher at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs, _zap: ZapOptions) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    /// Read and decode the next message from the publisher.
    pub async fn recv(&mut self) -> Result<(Message, i64), TransportError> {
        let payload = read_frame(&mut self.stream).await?;
        let (message, ts) = Message::decode(&payload)?;
        Ok((message, ts))
    }
}
