//! Fixed-capacity rolling window over raw range samples.
//!
//! The running sum makes `average` O(1); `spread` scans at most
//! [`MAX_WINDOW_SIZE`] values.

use crate::config::{MAX_WINDOW_SIZE, validate_window_size};
use crate::error::EngineError;

const SLOTS: usize = MAX_WINDOW_SIZE as usize;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    buf: [u32; SLOTS],
    capacity: usize,
    /// Next write position.
    head: usize,
    len: usize,
    sum: u64,
    filled: bool,
}

impl RollingWindow {
    pub fn new(capacity: u8) -> Result<Self, EngineError> {
        validate_window_size(capacity)?;
        Ok(Self {
            buf: [0; SLOTS],
            capacity: usize::from(capacity),
            head: 0,
            len: 0,
            sum: 0,
            filled: false,
        })
    }

    #[inline]
    pub fn capacity(&self) -> u8 {
        // capacity is validated to 3..=20 on construction
        u8::try_from(self.capacity).unwrap_or(MAX_WINDOW_SIZE)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `capacity` samples have been inserted since the last reset.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Append one sample, evicting the oldest once full.
    pub fn insert(&mut self, value: u32) {
        if self.len == self.capacity {
            self.sum -= u64::from(self.buf[self.head]);
        } else {
            self.len += 1;
        }
        self.buf[self.head] = value;
        self.sum += u64::from(value);
        self.head = (self.head + 1) % self.capacity;
        if self.len == self.capacity {
            self.filled = true;
        }
    }

    /// Mean of the occupied slots, truncated to whole millimeters.
    pub fn average(&self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        let mean = self.sum / self.len as u64;
        Some(u32::try_from(mean).unwrap_or(u32::MAX))
    }

    /// `max - min` over the occupied slots; 0 for an empty window.
    pub fn spread(&self) -> u32 {
        let occupied = self.occupied();
        match (occupied.iter().min(), occupied.iter().max()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    /// Clear the window. With a seed, every slot is pre-filled with it and
    /// the window counts as filled.
    pub fn reset(&mut self, seed: Option<u32>) {
        self.head = 0;
        match seed {
            Some(v) => {
                self.buf[..self.capacity].fill(v);
                self.len = self.capacity;
                self.sum = u64::from(v) * self.capacity as u64;
                self.filled = true;
            }
            None => {
                self.buf = [0; SLOTS];
                self.len = 0;
                self.sum = 0;
                self.filled = false;
            }
        }
    }

    /// Change capacity; contents are discarded.
    pub fn resize(&mut self, capacity: u8) -> Result<(), EngineError> {
        validate_window_size(capacity)?;
        self.capacity = usize::from(capacity);
        self.reset(None);
        Ok(())
    }

    /// Samples oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (newer, older) = if self.len < self.capacity {
            (&self.buf[..self.len], &self.buf[..0])
        } else {
            (&self.buf[..self.head], &self.buf[self.head..self.capacity])
        };
        older.iter().chain(newer.iter()).copied()
    }

    // Writes start at index 0 after every reset, so until the buffer wraps
    // the occupied slots are exactly the first `len`.
    #[inline]
    fn occupied(&self) -> &[u32] {
        &self.buf[..self.len]
    }
}
