// SPDX-License-Identifier: MIT
//! Typed publisher/subscriber pairs, one per broadcast payload type, over
//! the generic endpoints in `urts-transport`.
//!
//! A subscriber of a given type silently skips any message on the wire
//! that isn't its type — the same connection can in principle carry a
//! mixed feed, though every publisher here only ever emits one kind.

use std::marker::PhantomData;
use std::net::SocketAddr;
use tokio::net::ToSocketAddrs;
use urts_model::{Origin, Pick, ProbabilityPacket, SamplePacket};
use urts_proto::Message;
use urts_transport::{Publisher, Subscriber, TransportError, ZapOptions, DEFAULT_SEND_HWM};

/// A value that can be carried as one variant of [`Message`].
pub trait BroadcastPayload: Sized {
    /// Wrap `self` into its [`Message`] variant.
    fn into_message(self) -> Message;
    /// Unwrap a [`Message`] into this type, or `None` if it was a
    /// different variant.
    fn from_message(message: Message) -> Option<Self>;
}

impl BroadcastPayload for SamplePacket {
    fn into_message(self) -> Message {
        Message::DataPacket(self)
    }
    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::DataPacket(packet) => Some(packet),
            _ => None,
        }
    }
}

impl BroadcastPayload for ProbabilityPacket {
    fn into_message(self) -> Message {
        Message::Probability(self)
    }
    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Probability(packet) => Some(packet),
            _ => None,
        }
    }
}

impl BroadcastPayload for Pick {
    fn into_message(self) -> Message {
        Message::Pick(self)
    }
    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Pick(pick) => Some(pick),
            _ => None,
        }
    }
}

impl BroadcastPayload for Origin {
    fn into_message(self) -> Message {
        Message::Origin(self)
    }
    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Origin(origin) => Some(origin),
            _ => None,
        }
    }
}

/// A publisher that only ever emits one payload type.
pub struct TypedPublisher<T> {
    inner: Publisher,
    _marker: PhantomData<T>,
}

impl<T: BroadcastPayload> TypedPublisher<T> {
    /// Bind a typed publisher with the default send high-water mark.
    pub async fn bind(addr: impl ToSocketAddrs, zap: ZapOptions) -> Result<Self, TransportError> {
        Ok(Self {
            inner: Publisher::bind(addr, zap, DEFAULT_SEND_HWM).await?,
            _marker: PhantomData,
        })
    }

    /// The address this publisher is listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr()
    }

    /// Publish a value, returning how many subscribers received it.
    pub fn publish(&self, value: T, timestamp_micros: i64) -> Result<usize, TransportError> {
        self.inner.publish(&value.into_message(), timestamp_micros)
    }

    /// Publish an arbitrary message on this publisher's connection,
    /// bypassing the type restriction. Exists for endpoints that
    /// deliberately multiplex more than one payload type on a feed; most
    /// callers want [`TypedPublisher::publish`] instead.
    pub fn publish_raw(&self, message: Message, timestamp_micros: i64) -> Result<usize, TransportError> {
        self.inner.publish(&message, timestamp_micros)
    }
}

/// A subscriber that only ever yields one payload type, skipping any
/// other message it happens to see on the connection.
pub struct TypedSubscriber<T> {
    inner: Subscriber,
    _marker: PhantomData<T>,
}

impl<T: BroadcastPayload> TypedSubscriber<T> {
    /// Connect a typed subscriber to a publisher at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs, zap: ZapOptions) -> Result<Self, TransportError> {
        Ok(Self {
            inner: Subscriber::connect(addr, zap).await?,
            _marker: PhantomData,
        })
    }

    /// Receive the next value of this subscriber's type.
    pub async fn recv(&mut self) -> Result<(T, i64), TransportError> {
        loop {
            let (message, ts) = self.inner.recv().await?;
            if let Some(value) = T::from_message(message) {
                return Ok((value, ts));
            }
        }
    }
}

/// Publishes contiguous waveform data.
pub type DataPacketPublisher = TypedPublisher<SamplePacket>;
/// Subscribes to contiguous waveform data.
pub type DataPacketSubscriber = TypedSubscriber<SamplePacket>;
/// Publishes detector posterior streams.
pub type ProbabilityPublisher = TypedPublisher<ProbabilityPacket>;
/// Subscribes to detector posterior streams.
pub type ProbabilitySubscriber = TypedSubscriber<ProbabilityPacket>;
/// Publishes phase picks.
pub type PickPublisher = TypedPublisher<Pick>;
/// Subscribes to phase picks.
pub type PickSubscriber = TypedSubscriber<Pick>;
/// Publishes candidate or finalized origins.
pub type OriginPublisher = TypedPublisher<Origin>;
/// Subscribes to candidate or finalized origins.
pub type OriginSubscriber = TypedSubscriber<Origin>;
