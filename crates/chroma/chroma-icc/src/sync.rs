use crate::error::{ResourceError, SyncError};
use crate::names::ResourceNames;
use crate::semaphore::NamedSemaphore;

/// The three semaphores that govern the ring.
///
/// - `free_slots` counts slots a producer may fill (starts at capacity)
/// - `used_slots` counts slots the supervisor may drain (starts at zero)
/// - `write_mutex` serializes producers around `write_index` (starts at one)
pub(crate) struct SyncTriple {
    pub(crate) free_slots: NamedSemaphore,
    pub(crate) used_slots: NamedSemaphore,
    pub(crate) write_mutex: NamedSemaphore,
}

impl SyncTriple {
    /// Creates all three semaphores. If one fails, the ones already created
    /// are closed and unlinked as the partial triple is dropped.
    pub(crate) fn create(names: &ResourceNames, capacity: usize) -> Result<Self, ResourceError> {
        let free_slots = NamedSemaphore::create(&names.free_slots, capacity as u32)?;
        let used_slots = NamedSemaphore::create(&names.used_slots, 0)?;
        let write_mutex = NamedSemaphore::create(&names.write_mutex, 1)?;
        Ok(Self {
            free_slots,
            used_slots,
            write_mutex,
        })
    }

    pub(crate) fn open(names: &ResourceNames) -> Result<Self, ResourceError> {
        Ok(Self {
            free_slots: NamedSemaphore::open(&names.free_slots)?,
            used_slots: NamedSemaphore::open(&names.used_slots)?,
            write_mutex: NamedSemaphore::open(&names.write_mutex)?,
        })
    }

    /// Removes all three names if this triple created them. The handles
    /// stay usable until dropped.
    pub(crate) fn remove_names(&mut self) {
        for sem in [
            &mut self.free_slots,
            &mut self.used_slots,
            &mut self.write_mutex,
        ] {
            if let Err(e) = sem.unlink_name() {
                tracing::warn!(error = %e, "failed to remove semaphore");
            }
        }
    }

    pub(crate) fn occupancy(&self) -> Result<(u32, u32), SyncError> {
        Ok((self.free_slots.value()?, self.used_slots.value()?))
    }
}
