//! Audio chunk lifecycle and interruptible queueing
//!
//! An [`AudioChunk`] moves through Queued → Playing → Played unless the
//! caller barges in, in which case undelivered chunks land in
//! Interrupted. The producer creates chunks; only the output device
//! mutates state and fires the one-shot lifecycle hooks.
//!
//! [`InterruptibleEvent`] wraps any queue payload with an interruption
//! flag. Once a consumer has irrevocably committed work on the payload
//! it flips the event to non-interruptible; that transition happens at
//! most once and is never reversed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Playback lifecycle of one chunk of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Waiting in the output queue
    Queued,
    /// Handed to the sink
    Playing,
    /// Fully delivered to the remote endpoint
    Played,
    /// Discarded because the caller barged in
    Interrupted,
}

type Hook = Box<dyn FnOnce() + Send>;

struct ChunkInner {
    state: Mutex<ChunkState>,
    on_play: Mutex<Option<Hook>>,
    on_interrupt: Mutex<Option<Hook>>,
}

/// One buffer of synthesized audio plus its lifecycle state
pub struct AudioChunk {
    /// Raw encoded audio bytes
    pub data: Vec<u8>,
    inner: Arc<ChunkInner>,
}

impl AudioChunk {
    /// Create a chunk with no lifecycle hooks
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_hooks(data, None, None)
    }

    /// Create a chunk with optional one-shot hooks
    pub fn with_hooks(data: Vec<u8>, on_play: Option<Hook>, on_interrupt: Option<Hook>) -> Self {
        Self {
            data,
            inner: Arc::new(ChunkInner {
                state: Mutex::new(ChunkState::Queued),
                on_play: Mutex::new(on_play),
                on_interrupt: Mutex::new(on_interrupt),
            }),
        }
    }

    /// Handle the producer can keep to observe state after enqueueing
    pub fn handle(&self) -> ChunkHandle {
        ChunkHandle {
            inner: self.inner.clone(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChunkState {
        *self.inner.state.lock().expect("chunk state lock poisoned")
    }

    pub(crate) fn set_state(&self, state: ChunkState) {
        *self.inner.state.lock().expect("chunk state lock poisoned") = state;
    }

    pub(crate) fn fire_on_play(&self) {
        if let Some(hook) = self.inner.on_play.lock().expect("hook lock poisoned").take() {
            hook();
        }
    }

    pub(crate) fn fire_on_interrupt(&self) {
        if let Some(hook) = self
            .inner
            .on_interrupt
            .lock()
            .expect("hook lock poisoned")
            .take()
        {
            hook();
        }
    }
}

impl std::fmt::Debug for AudioChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioChunk")
            .field("len", &self.data.len())
            .field("state", &self.state())
            .finish()
    }
}

/// Read-only view of a chunk's lifecycle state
#[derive(Clone)]
pub struct ChunkHandle {
    inner: Arc<ChunkInner>,
}

impl ChunkHandle {
    pub fn state(&self) -> ChunkState {
        *self.inner.state.lock().expect("chunk state lock poisoned")
    }
}

struct EventFlags {
    interruptible: AtomicBool,
    interrupted: AtomicBool,
}

/// Queue payload wrapper carrying an interruption flag
pub struct InterruptibleEvent<T> {
    payload: T,
    flags: Arc<EventFlags>,
}

impl<T> InterruptibleEvent<T> {
    pub fn new(payload: T) -> Self {
        Self::with_interruptible(payload, true)
    }

    pub fn with_interruptible(payload: T, is_interruptible: bool) -> Self {
        Self {
            payload,
            flags: Arc::new(EventFlags {
                interruptible: AtomicBool::new(is_interruptible),
                interrupted: AtomicBool::new(false),
            }),
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn is_interruptible(&self) -> bool {
        self.flags.interruptible.load(Ordering::SeqCst)
    }

    pub fn is_interrupted(&self) -> bool {
        self.flags.interrupted.load(Ordering::SeqCst)
    }

    /// Flag the event as interrupted. Returns false if the consumer has
    /// already committed work on the payload.
    pub fn interrupt(&self) -> bool {
        if !self.flags.interruptible.load(Ordering::SeqCst) {
            return false;
        }
        self.flags.interrupted.store(true, Ordering::SeqCst);
        true
    }

    /// One-way transition: the payload's effects can no longer be
    /// undone, so interruption must not touch this event anymore.
    pub fn mark_uninterruptible(&self) {
        self.flags.interruptible.store(false, Ordering::SeqCst);
    }

    fn flags(&self) -> Arc<EventFlags> {
        self.flags.clone()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for InterruptibleEvent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptibleEvent")
            .field("payload", &self.payload)
            .field("interruptible", &self.is_interruptible())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

struct QueueInner<T> {
    items: VecDeque<InterruptibleEvent<T>>,
    in_flight: Option<Arc<EventFlags>>,
    closed: bool,
}

/// Single-producer/single-consumer FIFO of interruptible events.
///
/// Interruption does not remove anything; it flags every queued event
/// plus the one currently held by the consumer, and the consumer
/// discards flagged events as it dequeues them. There is no way to
/// interrupt "the device" — flagging the queue is the mechanism.
pub struct InterruptibleQueue<T> {
    inner: Mutex<QueueInner<T>>,
    notify: Notify,
}

impl<T> InterruptibleQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                in_flight: None,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue an event. Events pushed after `close` are dropped.
    pub fn push(&self, event: InterruptibleEvent<T>) {
        {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            if inner.closed {
                return;
            }
            inner.items.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Dequeue the next event, waiting if the queue is empty. Returns
    /// `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<InterruptibleEvent<T>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().expect("queue lock poisoned");
                if let Some(event) = inner.items.pop_front() {
                    inner.in_flight = Some(event.flags());
                    return Some(event);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// The consumer calls this when it is done with the last event it
    /// popped, so interruption stops reaching that event.
    pub fn clear_in_flight(&self) {
        self.inner.lock().expect("queue lock poisoned").in_flight = None;
    }

    /// Flag every queued event and the in-flight one as interrupted.
    pub fn interrupt_all(&self) {
        let inner = self.inner.lock().expect("queue lock poisoned");
        for event in &inner.items {
            event.interrupt();
        }
        if let Some(flags) = &inner.in_flight {
            if flags.interruptible.load(Ordering::SeqCst) {
                flags.interrupted.store(true, Ordering::SeqCst);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("queue lock poisoned").items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").items.len()
    }

    /// Close the queue; pending events remain poppable, then `pop`
    /// returns `None`.
    pub fn close(&self) {
        self.inner.lock().expect("queue lock poisoned").closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

impl<T> Default for InterruptibleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_chunk_state_transitions() {
        let chunk = AudioChunk::new(vec![0u8; 16]);
        let handle = chunk.handle();
        assert_eq!(handle.state(), ChunkState::Queued);
        chunk.set_state(ChunkState::Playing);
        chunk.set_state(ChunkState::Played);
        assert_eq!(handle.state(), ChunkState::Played);
    }

    #[test]
    fn test_hooks_fire_once() {
        let plays = Arc::new(AtomicUsize::new(0));
        let plays_clone = plays.clone();
        let chunk = AudioChunk::with_hooks(
            vec![0u8; 4],
            Some(Box::new(move || {
                plays_clone.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
        chunk.fire_on_play();
        chunk.fire_on_play();
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_interrupt_respects_commitment() {
        let event = InterruptibleEvent::new("payload");
        assert!(event.interrupt());
        assert!(event.is_interrupted());

        let committed = InterruptibleEvent::new("payload");
        committed.mark_uninterruptible();
        assert!(!committed.interrupt());
        assert!(!committed.is_interrupted());
    }

    #[tokio::test]
    async fn test_queue_fifo_order() {
        let queue = InterruptibleQueue::new();
        queue.push(InterruptibleEvent::new(1));
        queue.push(InterruptibleEvent::new(2));
        queue.push(InterruptibleEvent::new(3));

        assert_eq!(queue.pop().await.unwrap().into_payload(), 1);
        assert_eq!(queue.pop().await.unwrap().into_payload(), 2);
        assert_eq!(queue.pop().await.unwrap().into_payload(), 3);
    }

    #[tokio::test]
    async fn test_queue_close_drains_then_ends() {
        let queue = InterruptibleQueue::new();
        queue.push(InterruptibleEvent::new("a"));
        queue.close();

        assert!(queue.pop().await.is_some());
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_interrupt_all_flags_queued_and_in_flight() {
        let queue = InterruptibleQueue::new();
        queue.push(InterruptibleEvent::new("first"));
        queue.push(InterruptibleEvent::new("second"));

        let in_flight = queue.pop().await.unwrap();
        queue.interrupt_all();

        assert!(in_flight.is_interrupted());
        let second = queue.pop().await.unwrap();
        assert!(second.is_interrupted());
    }

    #[tokio::test]
    async fn test_interrupt_all_skips_committed_in_flight() {
        let queue = InterruptibleQueue::new();
        queue.push(InterruptibleEvent::new("only"));

        let in_flight = queue.pop().await.unwrap();
        in_flight.mark_uninterruptible();
        queue.interrupt_all();

        assert!(!in_flight.is_interrupted());
    }
}
