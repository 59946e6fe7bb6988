// SPDX-License-Identifier: MIT
//! A bounded, time-ordered cache of recent waveform packets, keyed by
//! channel. Each channel's packets are kept in onset order behind its own
//! lock so one busy channel never blocks reads or writes on another.
//!
//! A missing channel or an empty requested window are both ordinary,
//! expected outcomes here, not faults: a channel that has never produced
//! data, or a window that has aged out, is routine in a live feed.

mod service;

pub use service::{CacheAlgorithm, CacheRequest, CacheResponse};

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use urts_interp::{resample_to_uniform_grid, Gap, InterpError};
use urts_model::{ChannelId, SamplePacket};

/// Default number of packets retained per channel before the oldest is
/// evicted.
pub const DEFAULT_MAX_PACKETS_PER_CHANNEL: usize = 300;

/// Errors raised while reading from or writing to the cache.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// No packets have ever been cached for this channel.
    #[error("no packets cached for channel {0}")]
    ChannelUnknown(ChannelId),
    /// The channel is known, but no cached packet overlaps the requested
    /// window.
    #[error("no cached packet overlaps the requested window")]
    WindowEmpty,
    /// Resampling the window onto a uniform grid failed.
    #[error("interpolation error: {0}")]
    Interp(#[from] InterpError),
}

struct ChannelRing {
    packets: Mutex<VecDeque<SamplePacket>>,
}

impl ChannelRing {
    fn new() -> Self {
        Self {
            packets: Mutex::new(VecDeque::new()),
        }
    }
}

/// A bounded per-channel cache of waveform packets.
pub struct PacketCache {
    channels: RwLock<HashMap<ChannelId, ChannelRing>>,
    max_packets_per_channel: usize,
}

impl Default for PacketCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCache {
    /// Build a cache with [`DEFAULT_MAX_PACKETS_PER_CHANNEL`] retained per
    /// channel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_packets_per_channel(DEFAULT_MAX_PACKETS_PER_CHANNEL)
    }

    /// Build a cache with a caller-specified per-channel retention bound.
    #[must_use]
    pub fn with_max_packets_per_channel(max_packets_per_channel: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            max_packets_per_channel,
        }
    }

    /// Insert a packet, evicting the oldest packet on its channel if the
    /// retention bound would otherwise be exceeded. A packet sharing its
    /// channel and start time with one already cached replaces it rather
    /// than duplicating it.
    pub fn put(&self, packet: SamplePacket) {
        // Fast path: channel already exists, no write lock on the map needed.
        {
            let channels = self.channels.read();
            if let Some(ring) = channels.get(&packet.channel) {
                Self::insert_into_ring(ring, packet, self.max_packets_per_channel);
                return;
            }
        }
        let mut channels = self.channels.write();
        let ring = channels
            .entry(packet.channel.clone())
            .or_insert_with(ChannelRing::new);
        Self::insert_into_ring(ring, packet, self.max_packets_per_channel);
    }

    fn insert_into_ring(ring: &ChannelRing, packet: SamplePacket, max_packets: usize) {
        let mut packets = ring.packets.lock();
        if let Some(existing) = packets
            .iter_mut()
            .find(|p| p.start_time_micros == packet.start_time_micros)
        {
            *existing = packet;
            return;
        }
        let insert_at = packets
            .iter()
            .position(|p| p.start_time_micros > packet.start_time_micros)
            .unwrap_or(packets.len());
        packets.insert(insert_at, packet);
        while packets.len() > max_packets {
            packets.pop_front();
        }
    }

    /// Return every cached packet on `channel` whose time span overlaps
    /// `[start_micros, end_micros)`, in onset order.
    pub fn get_window(
        &self,
        channel: &ChannelId,
        start_micros: i64,
        end_micros: i64,
    ) -> Result<Vec<SamplePacket>, CacheError> {
        let channels = self.channels.read();
        let ring = channels
            .get(channel)
            .ok_or_else(|| CacheError::ChannelUnknown(channel.clone()))?;
        let packets = ring.packets.lock();
        let window: Vec<SamplePacket> = packets
            .iter()
            .filter(|p| p.start_time_micros < end_micros && p.end_time_micros() >= start_micros)
            .cloned()
            .collect();
        if window.is_empty() {
            return Err(CacheError::WindowEmpty);
        }
        Ok(window)
    }

    /// Fetch `[start_micros, end_micros)` for `channel` and resample it
    /// onto a uniform grid at `target_rate_hz`, reporting any gaps between
    /// the cached packets that make up the window.
    pub fn get_uniform(
        &self,
        channel: &ChannelId,
        start_micros: i64,
        end_micros: i64,
        target_rate_hz: f64,
    ) -> Result<(SamplePacket, Vec<Gap>), CacheError> {
        let packets = self.get_window(channel, start_micros, end_micros)?;
        let mut times = Vec::new();
        let mut values = Vec::new();
        for packet in &packets {
            let period_micros = packet.sample_period_micros();
            for (i, &sample) in packet.samples.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let t = packet.start_time_micros + (i as f64 * period_micros).round() as i64;
                times.push(t);
                values.push(sample);
            }
        }
        if times.len() < 2 {
            return Err(CacheError::WindowEmpty);
        }
        resample_to_uniform_grid(channel.clone(), &times, &values, target_rate_hz)
            .map_err(CacheError::from)
    }

    /// List every channel with at least one cached packet.
    #[must_use]
    pub fn list_channels(&self) -> Vec<ChannelId> {
        self.channels.read().keys().cloned().collect()
    }

    /// Number of packets currently cached for `channel`, or zero if the
    /// channel is unknown.
    #[must_use]
    pub fn len(&self, channel: &ChannelId) -> usize {
        self.channels
            .read()
            .get(channel)
            .map_or(0, |ring| ring.packets.lock().len())
    }

    /// True if no channel has ever had a packet cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}
