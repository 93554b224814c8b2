//! Cross-Domain Handoff Queue
#![allow(unsafe_code)] // Required for the lock-free ring storage
//!
//! ## Overview
//!
//! Bounded single-producer single-consumer ring buffer carrying packed
//! records from the sampling domain to the processing domain. The producer
//! runs at the oversampled rate and must never stall, so the queue trades
//! completeness for liveness: when full, the new entry is dropped and the
//! producer continues. Drops are counted - a silent loss the host cannot
//! see at all would make the diagnostics lie.
//!
//! ## Algorithm
//!
//! A ring buffer with atomic head/tail indices:
//!
//! ```text
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//! │  0  │  1  │  2  │  3  │  4  │  5  │  6  │  7  │
//! └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!          ↑                       ↑
//!        tail                    head
//!        (next read)          (next write)
//! ```
//!
//! The producer writes `buffer[head]` then publishes with a release store
//! of the new head; the consumer acquires head before reading, so an entry
//! is visible only once fully written. One slot is sacrificed to tell full
//! from empty, and capacity must be a power of two for cheap index masking.
//!
//! ## Ordering guarantees
//!
//! Strict FIFO: entries dequeue in exactly the order they were enqueued.
//! `len` is exposed so the consumer can gate batch drains on fill level
//! (the drain logic waits for a complete start/stop pair).

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Bounded SPSC handoff queue.
///
/// ## Safety contract
///
/// At most one producer context calls `push` and at most one consumer
/// context calls `pop`. The atomics make the handoff itself safe; the
/// single-producer/single-consumer restriction is what keeps the slot
/// writes race-free.
pub struct HandoffQueue<T: Copy, const N: usize> {
    /// Ring storage; slots own no destructors (`T: Copy`)
    buffer: UnsafeCell<[MaybeUninit<T>; N]>,

    /// Next write position (producer owned)
    head: AtomicUsize,

    /// Next read position (consumer owned)
    tail: AtomicUsize,

    /// Transfer statistics
    stats: QueueStats,
}

/// Queue transfer statistics.
///
/// `dropped` is the overflow counter: every entry refused because the ring
/// was full. Saturating reads are not needed - a u32 outlives any
/// realistic session at these rates.
pub struct QueueStats {
    /// Total entries accepted
    pub pushed: AtomicU32,
    /// Total entries consumed
    pub popped: AtomicU32,
    /// Entries dropped because the queue was full
    pub dropped: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }
}

impl<T: Copy, const N: usize> HandoffQueue<T, N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(
        N.is_power_of_two(),
        "handoff queue capacity must be a power of 2"
    );

    /// Create a new empty queue. Usable in static context.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_IS_POWER_OF_TWO;
        Self {
            buffer: UnsafeCell::new([MaybeUninit::uninit(); N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stats: QueueStats::new(),
        }
    }

    /// Enqueue an entry from the producer context.
    ///
    /// Returns false when the queue was full; the entry is dropped and
    /// counted, and the producer never stalls.
    pub fn push(&self, entry: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) & (N - 1);

        if next_head == self.tail.load(Ordering::Acquire) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Sole producer: nothing else writes this slot until head moves
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[head].write(entry);
        }

        // Publish the write before moving head
        self.head.store(next_head, Ordering::Release);
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Dequeue the oldest entry from the consumer context.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // Sole consumer: the slot is fully written once head has passed it
        let entry = unsafe {
            let buffer = &*self.buffer.get();
            ptr::read(&buffer[tail]).assume_init()
        };

        self.tail
            .store((tail + 1) & (N - 1), Ordering::Release);
        self.stats.popped.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Current fill level.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);

        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// True when the next push would drop.
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        ((head + 1) & (N - 1)) == tail
    }

    /// Transfer statistics.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Discard everything queued. Exclusive access makes this race-free.
    pub fn clear(&mut self) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
    }

    /// Drain all queued entries through an iterator.
    pub fn drain(&self) -> QueueDrain<'_, T, N> {
        QueueDrain { queue: self }
    }
}

impl<T: Copy, const N: usize> Default for HandoffQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// The queue handles its own synchronization
unsafe impl<T: Copy + Send, const N: usize> Send for HandoffQueue<T, N> {}
unsafe impl<T: Copy + Send, const N: usize> Sync for HandoffQueue<T, N> {}

/// Iterator draining the consumer side.
pub struct QueueDrain<'a, T: Copy, const N: usize> {
    queue: &'a HandoffQueue<T, N>,
}

impl<'a, T: Copy, const N: usize> Iterator for QueueDrain<'a, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}
