// SPDX-License-Identifier: MIT
//! A fixed pool of OS threads that run an [`Algorithm`] outside any async
//! runtime, so a slow or blocking inference call never stalls a tokio
//! reactor. Threads poll their request queue on a fixed interval and
//! check a shared cancellation flag between polls, rather than blocking
//! indefinitely on it, so `stop()` returns promptly.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often an idle worker thread checks the cancellation flag while
/// waiting for its next request.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle state of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, not yet initialized.
    Uninitialized,
    /// Initialized, not yet accepting work.
    Initialized,
    /// Threads spawned and accepting requests.
    Running,
    /// Threads joined; the pool will not run again.
    Stopped,
}

/// Errors raised by pool lifecycle and submission operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// `action` was attempted while the pool was in `state`.
    #[error("cannot {action} while the pool is {state:?}")]
    InvalidState {
        /// The pool's actual state at the time of the call.
        state: WorkerState,
        /// The operation that was rejected.
        action: &'static str,
    },
    /// The request queue was gone (every worker thread had already exited).
    #[error("worker pool is no longer accepting requests")]
    Unavailable,
    /// A [`WorkerPool::call`] did not receive its matching reply in time.
    #[error("no reply received within the call timeout")]
    Timeout,
}

/// Why an algorithm invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The request payload itself was malformed or failed validation.
    InvalidMessage(String),
    /// The request was well-formed but the algorithm failed to process it.
    AlgorithmFailure(String),
}

/// The outcome tag carried on every [`Reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    /// The algorithm processed the request and produced a payload.
    Success,
    /// The request payload was rejected before processing.
    InvalidMessage,
    /// The algorithm failed while processing an otherwise valid request.
    AlgorithmFailure,
}

impl WorkerError {
    /// True if this error reflects a timed-out [`WorkerPool::call`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// A unit of work submitted to the pool.
#[derive(Debug, Clone)]
pub struct Request {
    /// Caller-assigned identifier echoed back on the matching [`Reply`],
    /// so a caller juggling many in-flight requests can match them up.
    pub correlation_id: u64,
    /// Opaque request payload, interpreted by the configured [`Algorithm`].
    pub payload: Vec<u8>,
}

/// The result of processing one [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    /// Echoes the originating request's `correlation_id`.
    pub correlation_id: u64,
    /// Outcome of processing.
    pub status: ReplyStatus,
    /// Result payload on success; empty on failure.
    pub payload: Vec<u8>,
}

/// A unit of inference work a [`WorkerPool`] runs on its threads.
pub trait Algorithm: Send + Sync + 'static {
    /// Process one request payload, returning a reply payload or the
    /// reason processing did not succeed.
    fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError>;
}

/// A fixed pool of OS threads that run an [`Algorithm`] against submitted
/// requests and deliver replies on a shared channel.
pub struct WorkerPool {
    state: Mutex<WorkerState>,
    stop_flag: Arc<AtomicBool>,
    request_tx: Sender<Request>,
    request_rx: Receiver<Request>,
    reply_tx: Sender<Reply>,
    reply_rx: Receiver<Reply>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
    poll_interval: Duration,
    next_correlation_id: AtomicU64,
    stray_replies: Mutex<HashMap<u64, Reply>>,
}

impl WorkerPool {
    /// Build a pool with `num_threads` worker threads. The pool starts
    /// `Uninitialized`; call [`WorkerPool::initialize`] then
    /// [`WorkerPool::start`] before submitting requests.
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        Self::with_poll_interval(num_threads, DEFAULT_POLL_INTERVAL)
    }

    /// Build a pool with an explicit cancellation polling interval.
    #[must_use]
    pub fn with_poll_interval(num_threads: usize, poll_interval: Duration) -> Self {
        let (request_tx, request_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        Self {
            state: Mutex::new(WorkerState::Uninitialized),
            stop_flag: Arc::new(AtomicBool::new(false)),
            request_tx,
            request_rx,
            reply_tx,
            reply_rx,
            handles: Mutex::new(Vec::new()),
            num_threads: num_threads.max(1),
            poll_interval,
            next_correlation_id: AtomicU64::new(0),
            stray_replies: Mutex::new(HashMap::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Transition `Uninitialized -> Initialized`.
    pub fn initialize(&self) -> Result<(), WorkerError> {
        let mut state = self.state.lock();
        if *state != WorkerState::Uninitialized {
            return Err(WorkerError::InvalidState {
                state: *state,
                action: "initialize",
            });
        }
        *state = WorkerState::Initialized;
        Ok(())
    }

    /// Transition `Initialized -> Running`, spawning the worker threads.
    pub fn start(&self, algorithm: Arc<dyn Algorithm>) -> Result<(), WorkerError> {
        let mut state = self.state.lock();
        if *state != WorkerState::Initialized {
            return Err(WorkerError::InvalidState {
                state: *state,
                action: "start",
            });
        }
        let mut handles = self.handles.lock();
        for _ in 0..self.num_threads {
            let rx = self.request_rx.clone();
            let tx = self.reply_tx.clone();
            let stop_flag = self.stop_flag.clone();
            let algorithm = algorithm.clone();
            let poll_interval = self.poll_interval;
            handles.push(thread::spawn(move || {
                worker_loop(&rx, &tx, &stop_flag, algorithm.as_ref(), poll_interval);
            }));
        }
        *state = WorkerState::Running;
        Ok(())
    }

    /// Submit a request for processing. Only valid while `Running`.
    pub fn submit(&self, request: Request) -> Result<(), WorkerError> {
        let state = self.state.lock();
        if *state != WorkerState::Running {
            return Err(WorkerError::InvalidState {
                state: *state,
                action: "submit",
            });
        }
        self.request_tx
            .send(request)
            .map_err(|_| WorkerError::Unavailable)
    }

    /// The channel replies are delivered on.
    #[must_use]
    pub fn replies(&self) -> &Receiver<Reply> {
        &self.reply_rx
    }

    /// Submit `payload` and block the calling thread until its matching
    /// reply arrives or `timeout` elapses.
    ///
    /// Safe to call concurrently from multiple threads: a caller that
    /// drains a reply belonging to a different in-flight call stashes it
    /// rather than discarding it, so no other caller's reply is lost. Pairs
    /// naturally with `tokio::task::spawn_blocking` for an async caller
    /// bridging into this pool.
    pub fn call(&self, payload: Vec<u8>, timeout: Duration) -> Result<Reply, WorkerError> {
        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        self.submit(Request {
            correlation_id,
            payload,
        })?;
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(reply) = self.stray_replies.lock().remove(&correlation_id) {
                return Ok(reply);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WorkerError::Timeout);
            }
            match self
                .reply_rx
                .recv_timeout(remaining.min(self.poll_interval))
            {
                Ok(reply) if reply.correlation_id == correlation_id => return Ok(reply),
                Ok(reply) => {
                    self.stray_replies.lock().insert(reply.correlation_id, reply);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Unavailable),
            }
        }
    }

    /// Signal every worker thread to stop at its next poll, then join
    /// them. Idempotent: stopping an already-`Stopped` pool is a no-op.
    pub fn stop(&self) -> Result<(), WorkerError> {
        {
            let state = self.state.lock();
            if *state == WorkerState::Stopped {
                return Ok(());
            }
        }
        self.stop_flag.store(true, Ordering::SeqCst);
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
        *self.state.lock() = WorkerState::Stopped;
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn worker_loop(
    rx: &Receiver<Request>,
    tx: &Sender<Reply>,
    stop_flag: &AtomicBool,
    algorithm: &dyn Algorithm,
    poll_interval: Duration,
) {
    while !stop_flag.load(Ordering::SeqCst) {
        match rx.recv_timeout(poll_interval) {
            Ok(request) => {
                let reply = match algorithm.process(&request.payload) {
                    Ok(payload) => Reply {
                        correlation_id: request.correlation_id,
                        status: ReplyStatus::Success,
                        payload,
                    },
                    Err(ProcessError::InvalidMessage(_)) => Reply {
                        correlation_id: request.correlation_id,
                        status: ReplyStatus::InvalidMessage,
                        payload: Vec::new(),
                    },
                    Err(ProcessError::AlgorithmFailure(_)) => Reply {
                        correlation_id: request.correlation_id,
                        status: ReplyStatus::AlgorithmFailure,
                        payload: Vec::new(),
                    },
                };
                if tx.send(reply).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Echo;
    impl Algorithm for Echo {
        fn process(&self, payload: &[u8]) -> Result<Vec<u8>, ProcessError> {
            if payload.is_empty() {
                return Err(ProcessError::InvalidMessage("empty payload".to_string()));
            }
            if payload == b"boom" {
                return Err(ProcessError::AlgorithmFailure("simulated failure".to_string()));
            }
            Ok(payload.to_vec())
        }
    }

    fn running_pool(num_threads: usize) -> WorkerPool {
        let pool = WorkerPool::with_poll_interval(num_threads, Duration::from_millis(5));
        pool.initialize().unwrap();
        pool.start(Arc::new(Echo)).unwrap();
        pool
    }

    // ── 1. submit before start is rejected ───────────────────────────────

    #[test]
    fn submit_before_start_rejected() {
        let pool = WorkerPool::new(2);
        let err = pool
            .submit(Request {
                correlation_id: 1,
                payload: vec![1],
            })
            .unwrap_err();
        assert_eq!(
            err,
            WorkerError::InvalidState {
                state: WorkerState::Uninitialized,
                action: "submit",
            }
        );
    }

    // ── 2. start before initialize is rejected ───────────────────────────

    #[test]
    fn start_before_initialize_rejected() {
        let pool = WorkerPool::new(2);
        let err = pool.start(Arc::new(Echo)).unwrap_err();
        assert_eq!(
            err,
            WorkerError::InvalidState {
                state: WorkerState::Uninitialized,
                action: "start",
            }
        );
    }

    // ── 3. N concurrent requests across K workers yield N replies ───────

    #[test]
    fn n_requests_yield_n_replies() {
        let pool = running_pool(4);
        const N: u64 = 100;
        for i in 0..N {
            pool.submit(Request {
                correlation_id: i,
                payload: vec![1, 2, 3],
            })
            .unwrap();
        }
        let mut seen = std::collections::HashSet::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < N as usize && Instant::now() < deadline {
            if let Ok(reply) = pool.replies().recv_timeout(Duration::from_millis(100)) {
                assert_eq!(reply.status, ReplyStatus::Success);
                seen.insert(reply.correlation_id);
            }
        }
        assert_eq!(seen.len(), N as usize);
        pool.stop().unwrap();
    }

    // ── 4. invalid and failing payloads get the right reply status ──────

    #[test]
    fn reply_status_reflects_process_outcome() {
        let pool = running_pool(1);
        pool.submit(Request {
            correlation_id: 1,
            payload: Vec::new(),
        })
        .unwrap();
        pool.submit(Request {
            correlation_id: 2,
            payload: b"boom".to_vec(),
        })
        .unwrap();
        let mut statuses = std::collections::HashMap::new();
        for _ in 0..2 {
            let reply = pool
                .replies()
                .recv_timeout(Duration::from_secs(1))
                .unwrap();
            statuses.insert(reply.correlation_id, reply.status);
        }
        assert_eq!(statuses[&1], ReplyStatus::InvalidMessage);
        assert_eq!(statuses[&2], ReplyStatus::AlgorithmFailure);
        pool.stop().unwrap();
    }

    // ── 5. stop is idempotent ────────────────────────────────────────────

    #[test]
    fn stop_is_idempotent() {
        let pool = running_pool(2);
        pool.stop().unwrap();
        pool.stop().unwrap();
        assert_eq!(pool.state(), WorkerState::Stopped);
    }

    // ── 6. call returns the matching reply, not another caller's ────────

    #[test]
    fn call_matches_concurrent_repliers() {
        let pool = Arc::new(running_pool(4));
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let pool = pool.clone();
            handles.push(thread::spawn(move || {
                let reply = pool.call(vec![i], Duration::from_secs(5)).unwrap();
                assert_eq!(reply.payload, vec![i]);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        pool.stop().unwrap();
    }

    // ── 7. call reports InvalidState once the pool has stopped ──────────

    #[test]
    fn call_after_stop_is_invalid_state() {
        let pool = WorkerPool::with_poll_interval(1, Duration::from_millis(5));
        pool.initialize().unwrap();
        pool.start(Arc::new(Echo)).unwrap();
        pool.stop().unwrap();
        let err = pool.call(vec![1], Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidState { .. }));
    }
}
