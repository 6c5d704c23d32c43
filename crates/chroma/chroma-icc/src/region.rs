use crate::error::ResourceError;
use crate::ring::RingConfig;
use crate::shm_layout::{RegionHeader, bytes_for_region, capacity_for_len};
use chroma_events::{ProtocolViolation, Solution};
use chroma_shm::ShmSegmentMut;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering;

/// A process's view of the shared solution ring.
///
/// Slot and cursor accessors are only sound under the semaphore protocol
/// implemented by the channels; they are crate-private for that reason.
pub(crate) struct SharedRegion {
    /// Owns the mapping; the name is removed on drop if this process created it.
    mm: ShmSegmentMut,
    /// Start of the mapped segment (header location).
    base: *mut u8,
    ring: RingConfig,
}

// SAFETY: the mapping stays valid for the lifetime of `mm`, and all shared
// state is accessed through atomics or under the semaphore protocol.
unsafe impl Send for SharedRegion {}

impl SharedRegion {
    /// Creates and zero-initializes a named region. Owner only.
    pub(crate) fn create(name: &str, ring: RingConfig) -> Result<Self, ResourceError> {
        let bytes = bytes_for_region(ring.capacity) as u64;
        let mut mm = ShmSegmentMut::create_rw(name, bytes)
            .map_err(|e| ResourceError::from_io(name, e, false))?;
        let base = mm.as_mut_ptr();

        // SAFETY: the segment was just created with O_EXCL and is sized for
        // the header plus `capacity` slots; nobody else can have mapped it
        // before the semaphores exist.
        unsafe {
            ptr::write_bytes(base, 0, bytes as usize);
            let header = &*(base as *const RegionHeader);
            header.terminate.store(0, Ordering::Relaxed);
            header.write_index.store(0, Ordering::Relaxed);
            header.read_index.store(0, Ordering::Release);
        }

        tracing::info!(name, capacity = ring.capacity, bytes, "shared region created");
        Ok(Self { mm, base, ring })
    }

    /// Maps an existing region. Producer only; never creates anything.
    pub(crate) fn attach(name: &str) -> Result<Self, ResourceError> {
        let mut mm =
            ShmSegmentMut::open_rw(name).map_err(|e| ResourceError::from_io(name, e, false))?;
        let capacity = capacity_for_len(mm.len()).map_err(|reason| ResourceError::Layout {
            name: name.to_owned(),
            reason,
        })?;
        let ring = RingConfig::try_new(capacity).ok_or_else(|| ResourceError::Layout {
            name: name.to_owned(),
            reason: "slot count exceeds the largest supported ring",
        })?;
        let base = mm.as_mut_ptr();

        tracing::debug!(name, capacity, "shared region attached");
        Ok(Self { mm, base, ring })
    }

    /// Removes the region's name if this process created it. The mapping
    /// itself goes away when the handle drops.
    pub(crate) fn remove_name(&mut self) {
        if let Err(e) = self.mm.unlink_name() {
            tracing::warn!(name = self.mm.name(), error = %e, "failed to remove shared region");
        }
    }

    #[inline(always)]
    fn header(&self) -> &RegionHeader {
        // SAFETY: base points to a RegionHeader inside a mapping of at least
        // bytes_for_region(1) bytes, checked at create/attach.
        unsafe { &*(self.base as *const RegionHeader) }
    }

    #[inline(always)]
    fn slot_ptr(&self, idx: usize) -> *mut Solution {
        debug_assert!(idx < self.ring.capacity);
        // SAFETY: idx < capacity, and the mapping holds `capacity` slots
        // after the header.
        unsafe { (self.base.add(size_of::<RegionHeader>()) as *mut Solution).add(idx) }
    }

    pub(crate) fn ring(&self) -> RingConfig {
        self.ring
    }

    pub(crate) fn name(&self) -> &str {
        self.mm.name()
    }

    /// True once the owner began shutting down. Never reverts.
    #[inline]
    pub(crate) fn terminate_requested(&self) -> bool {
        self.header().terminate.load(Ordering::Acquire) != 0
    }

    #[inline]
    pub(crate) fn request_terminate(&self) {
        self.header().terminate.store(1, Ordering::Release);
    }

    /// Checks a cursor loaded from the header. A value outside the ring is
    /// never used as an index.
    fn cursor(&self, cursor: &'static str, value: i32) -> Result<usize, ProtocolViolation> {
        if self.ring.contains(value) {
            Ok(value as usize)
        } else {
            Err(ProtocolViolation::CursorOutOfRange {
                cursor,
                value,
                capacity: self.ring.capacity,
            })
        }
    }

    pub(crate) fn write_index(&self) -> Result<usize, ProtocolViolation> {
        self.cursor(
            "write_index",
            self.header().write_index.load(Ordering::Acquire),
        )
    }

    pub(crate) fn read_index(&self) -> Result<usize, ProtocolViolation> {
        self.cursor("read_index", self.header().read_index.load(Ordering::Acquire))
    }

    /// Copies `solution` into the slot at `write_index` and advances it.
    /// Nothing is written if `write_index` is corrupt.
    ///
    /// # Safety
    /// The caller holds the write mutex and has consumed a `free_slots` unit.
    pub(crate) unsafe fn push(&self, solution: &Solution) -> Result<(), ProtocolViolation> {
        let idx = self.write_index()?;
        // SAFETY: the free_slots unit guarantees the supervisor is not
        // reading this slot, and the write mutex excludes other producers.
        unsafe { ptr::write_volatile(self.slot_ptr(idx), *solution) };
        self.header()
            .write_index
            .store(self.ring.advance(idx) as i32, Ordering::Release);
        Ok(())
    }

    /// Copies the slot at `read_index` out and advances it.
    ///
    /// The outer error is a corrupt `read_index`: nothing was read and the
    /// cursor did not move. The inner error is a corrupt record that was
    /// consumed.
    ///
    /// # Safety
    /// The caller is the single reader and has consumed a `used_slots` unit.
    pub(crate) unsafe fn pop(
        &self,
    ) -> Result<Result<Solution, ProtocolViolation>, ProtocolViolation> {
        let idx = self.read_index()?;
        // SAFETY: the used_slots unit guarantees a producer finished writing
        // this slot and no producer writes it until free_slots is posted.
        let solution = unsafe { ptr::read_volatile(self.slot_ptr(idx)) };
        self.header()
            .read_index
            .store(self.ring.advance(idx) as i32, Ordering::Release);
        Ok(solution.validate().map(|_| solution))
    }
}
