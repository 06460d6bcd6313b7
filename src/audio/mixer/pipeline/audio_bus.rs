// Audio Bus: the single hand-off point between producers and the render worker
//
// Capture callbacks and the playback tap write 16-bit PCM bytes here; the
// render callback drains them. Every read/write holds one mutex for its whole
// duration and never blocks on I/O while holding it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::Notify;

use crate::audio::types::DEFAULT_BUS_CAPACITY_BYTES;

/// Snapshot of bus counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub capacity_bytes: usize,
    pub buffered_bytes: usize,
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Bytes discarded by the drop-oldest overflow policy
    pub bytes_dropped: u64,
}

#[derive(Debug, Default)]
struct BusStorage {
    bytes: VecDeque<u8>,
    bytes_written: u64,
    bytes_read: u64,
    bytes_dropped: u64,
}

/// Bounded, thread-safe byte queue with drop-oldest overflow
#[derive(Debug)]
pub struct AudioBus {
    storage: Mutex<BusStorage>,
    capacity: usize,
    data_available: Arc<Notify>,
}

impl AudioBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY_BYTES)
    }

    /// A zero capacity is bumped to one byte.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: Mutex::new(BusStorage {
                bytes: VecDeque::with_capacity(capacity.min(DEFAULT_BUS_CAPACITY_BYTES)),
                ..BusStorage::default()
            }),
            capacity,
            data_available: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusStorage> {
        // A producer that panicked mid-write leaves the queue structurally valid
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `bytes`, evicting the oldest buffered bytes when the bus would overflow.
    ///
    /// The whole write is always accepted and its length returned. When a single
    /// write is larger than the capacity only its trailing `capacity` bytes are kept.
    pub fn write(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let kept = if bytes.len() > self.capacity {
            &bytes[bytes.len() - self.capacity..]
        } else {
            bytes
        };
        let truncated = bytes.len() - kept.len();

        {
            let mut storage = self.lock();
            let overflow = (storage.bytes.len() + kept.len()).saturating_sub(self.capacity);
            if overflow > 0 {
                storage.bytes.drain(..overflow);
            }
            storage.bytes.extend(kept.iter().copied());

            storage.bytes_written += bytes.len() as u64;
            storage.bytes_dropped += (overflow + truncated) as u64;

            if overflow + truncated > 0 {
                crate::audio_debug!(
                    "🗑️ AUDIO_BUS: Dropped {} oldest bytes (capacity {} bytes)",
                    overflow + truncated,
                    self.capacity
                );
            }
        }

        self.data_available.notify_waiters();
        bytes.len()
    }

    /// Remove and return up to `max_bytes` from the front. Empty when nothing is buffered.
    pub fn read(&self, max_bytes: usize) -> Vec<u8> {
        let mut storage = self.lock();
        let count = max_bytes.min(storage.bytes.len());
        let out: Vec<u8> = storage.bytes.drain(..count).collect();
        storage.bytes_read += count as u64;
        out
    }

    /// Fill the front of `out` with buffered bytes, returning how many were copied.
    pub fn read_into(&self, out: &mut [u8]) -> usize {
        let mut storage = self.lock();
        let count = out.len().min(storage.bytes.len());
        for (slot, byte) in out.iter_mut().zip(storage.bytes.drain(..count)) {
            *slot = byte;
        }
        storage.bytes_read += count as u64;
        count
    }

    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard everything buffered (counted as read, not dropped)
    pub fn clear(&self) {
        let mut storage = self.lock();
        let count = storage.bytes.len();
        storage.bytes.clear();
        storage.bytes_read += count as u64;
    }

    pub fn stats(&self) -> BusStats {
        let storage = self.lock();
        BusStats {
            capacity_bytes: self.capacity,
            buffered_bytes: storage.bytes.len(),
            bytes_written: storage.bytes_written,
            bytes_read: storage.bytes_read,
            bytes_dropped: storage.bytes_dropped,
        }
    }

    /// Notified after every non-empty write
    pub fn data_notifier(&self) -> Arc<Notify> {
        self.data_available.clone()
    }

    /// Wait until at least one byte is buffered
    pub async fn wait_for_data(&self) {
        // Registered before the emptiness check so a concurrent write cannot be missed
        let notified = self.data_available.notified();
        if !self.is_empty() {
            return;
        }
        notified.await;
    }
}

impl Default for AudioBus {
    fn default() -> Self {
        Self::new()
    }
}
