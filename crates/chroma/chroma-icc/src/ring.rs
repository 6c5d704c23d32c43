//! Ring buffer configuration and cursor arithmetic.
//!
//! Cursors live in shared memory as `int32` slot indices in `[0, capacity)`.
//! They are advanced modulo the capacity, so the capacity does not need to
//! be a power of two.

/// Largest ring the supervisor will create.
pub const MAX_CAPACITY: usize = 4096;

/// Configuration for a ring buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of solution slots in the ring.
    pub capacity: usize,
}

impl RingConfig {
    /// Creates a new ring configuration with the specified capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or larger than [`MAX_CAPACITY`].
    ///
    /// # Example
    /// ```
    /// use chroma_icc::RingConfig;
    /// let cfg = RingConfig::new(20);
    /// assert_eq!(cfg.advance(19), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).expect("ring capacity must be in 1..=4096")
    }

    /// Fallible variant of [`RingConfig::new`] for capacities read from config.
    pub fn try_new(capacity: usize) -> Option<Self> {
        (1..=MAX_CAPACITY)
            .contains(&capacity)
            .then_some(Self { capacity })
    }

    /// Returns the cursor that follows `index`, wrapping to zero at the end.
    #[inline(always)]
    pub fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity
    }

    /// Number of unread slots between a read and a write cursor.
    ///
    /// A full ring and an empty ring both report zero, which is why the
    /// semaphore counts, not the cursors, decide whether a slot is available.
    #[inline]
    pub fn pending(&self, write_index: usize, read_index: usize) -> usize {
        (write_index + self.capacity - read_index) % self.capacity
    }

    /// Checks a cursor loaded from shared memory.
    #[inline]
    pub fn contains(&self, index: i32) -> bool {
        index >= 0 && (index as usize) < self.capacity
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(chroma_events::CAPACITY)
    }
}
