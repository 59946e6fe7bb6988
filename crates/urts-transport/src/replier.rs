// SPDX-License-Identifier: MIT
use crate::error::TransportError;
use crate::framing::{read_frame, write_frame};
use crate::zap::ZapOptions;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use urts_proto::Message;

/// Accepts request/reply connections and answers each request with a
/// caller-supplied handler.
///
/// A request that fails to decode, or a handler that errors, ends that
/// connection after a warning log rather than taking the whole replier
/// down — one malformed client never disrupts the others in flight.
pub struct Replier {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl Replier {
    /// Bind a replier to `addr` and begin answering requests with
    /// `handler` in the background.
    pub async fn bind<F, Fut>(
        addr: impl ToSocketAddrs,
        _zap: ZapOptions,
        handler: F,
    ) -> Result<Self, TransportError>
    where
        F: Fn(Message, i64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Message, TransportError>> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let handler = Arc::new(handler);

        let accept_task = tokio::spawn(async move {
            loop {
                let (mut stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "replier accept failed");
                        continue;
                    }
                };
                let handler = handler.clone();
                tokio::spawn(async move {
                    loop {
                        let payload = match read_frame(&mut stream).await {
                            Ok(p) => p,
                            Err(TransportError::ConnectionClosed) => break,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "replier read failed");
                                break;
                            }
                        };
                        let (message, ts) = match Message::decode(&payload) {
                            Ok(pair) => pair,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "malformed request");
                                break;
                            }
                        };
                        let reply = match handler(message, ts).await {
                            Ok(reply) => reply,
                            Err(e) => {
                                tracing::warn!(%peer, error = %e, "request handler failed");
                                break;
                            }
                        };
                        let Ok(bytes) = reply.encode(ts) else {
                            tracing::warn!(%peer, "failed to encode reply");
                            break;
                        };
                        if write_frame(&mut stream, &bytes).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Ok(Self {
            local_addr,
            accept_task,
        })
    }

    /// The address this replier is actually listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for Replier {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
