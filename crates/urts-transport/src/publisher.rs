// SPDX-License-Identifier: MIT
use crate::error::TransportError;
use crate::zap::ZapOptions;
use crate::DEFAULT_SEND_HWM;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use urts_proto::wire::encode_frame;
use urts_proto::Message;

/// Broadcasts encoded messages to every currently-connected subscriber.
///
/// A subscriber whose inbound queue is full is never blocked on: its
/// oldest-undelivered message is simply dropped, and the publisher moves
/// on. A slow subscriber degrades its own feed, never the publisher's.
pub struct Publisher {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<Vec<u8>>>>>,
    local_addr: SocketAddr,
    send_hwm: usize,
    accept_task: JoinHandle<()>,
}

impl Publisher {
    /// Bind a publisher to `addr` and begin accepting subscriber
    /// connections in the background.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        _zap: ZapOptions,
        send_hwm: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let subscribers: Arc<Mutex<Vec<mpsc::Sender<Vec<u8>>>>> = Arc::new(Mutex::new(Vec::new()));
        let subs_for_task = subscribers.clone();

        let accept_task = tokio::spawn(async move {
            loop {
                let (mut stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "publisher accept failed");
                        continue;
                    }
                };
                let (tx, mut rx) = mpsc::channel::<Vec<u8>>(send_hwm);
                subs_for_task.lock().push(tx);
                tracing::info!(%peer, "subscriber connected");
                tokio::spawn(async move {
                    while let Some(frame) = rx.recv().await {
                        if stream.write_all(&frame).await.is_err() {
                            tracing::info!(%peer, "subscriber disconnected");
                            break;
                        }
                    }
                });
            }
        });

        Ok(Self {
            subscribers,
            local_addr,
            send_hwm,
            accept_task,
        })
    }

    /// Bind with the default send high-water mark.
    pub async fn bind_default(addr: impl ToSocketAddrs, zap: ZapOptions) -> Result<Self, TransportError> {
        Self::bind(addr, zap, DEFAULT_SEND_HWM).await
    }

    /// The address this publisher is actually listening on (useful after
    /// binding to port 0).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// This publisher's configured send high-water mark.
    #[must_use]
    pub const fn send_hwm(&self) -> usize {
        self.send_hwm
    }

    /// Encode and fan `message` out to every connected subscriber,
    /// returning how many subscribers actually received it.
    pub fn publish(&self, message: &Message, timestamp_micros: i64) -> Result<usize, TransportError> {
        let payload = message.encode(timestamp_micros)?;
        let framed = encode_frame(&payload)?;
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        let mut delivered = 0;
        for tx in subscribers.iter() {
            match tx.try_send(framed.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("subscriber queue full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        Ok(delivered)
    }

    /// Number of subscribers currently connected.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
