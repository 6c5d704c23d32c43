//! Multi-producer, single-consumer solution channel over shared memory.
//!
//! The supervisor owns the channel: [`OwnerChannel::create`] creates the
//! shared region and the three semaphores, and dropping (or shutting down)
//! the owner removes all four names again. Generators only ever attach with
//! [`ProducerChannel::attach`] and close their own handles.
//!
//! # Protocol
//!
//! **Producer** (per candidate):
//! 1. wait `free_slots`; an interrupted wait ends the producer
//! 2. re-check `terminate`; if set, stop without writing
//! 3. lock `write_mutex`, write `buffer[write_index]`, advance, unlock
//! 4. post `used_slots`
//!
//! **Owner** (per record):
//! 1. wait `used_slots`; an interrupted wait ends the owner loop
//! 2. read `buffer[read_index]`, advance
//! 3. post `free_slots`
//!
//! # Shutdown
//!
//! The owner sets `terminate` and then posts `free_slots` once per slot, so
//! every producer parked on a full ring wakes up, sees the flag and leaves.
//! A producer that got past step 2 just before the flag was raised still
//! completes its write; that record is never read.

use crate::error::{ResourceError, SyncError, WaitError};
use crate::interrupt;
use crate::names::ResourceNames;
use crate::region::SharedRegion;
use crate::ring::RingConfig;
use crate::semaphore::{NamedSemaphore, SemaphoreGuard};
use crate::sync::SyncTriple;
use chroma_events::{ProtocolViolation, Solution};

/// Result of [`ProducerChannel::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The record is in the ring and the supervisor has been signalled.
    Written,
    /// The supervisor is shutting down or this process was interrupted.
    /// Nothing was written; the producer should stop.
    Terminated,
}

/// Result of [`OwnerChannel::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receive {
    Record(Solution),
    /// The slot was drained but held an impossible record.
    Corrupt(ProtocolViolation),
    /// The wait was interrupted by a shutdown signal.
    Interrupted,
}

/// Snapshot of the semaphore counts and cursors, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub free_slots: u32,
    pub used_slots: u32,
    pub write_index: usize,
    pub read_index: usize,
    pub capacity: usize,
}

impl Occupancy {
    /// At a quiescent point every slot is counted by exactly one semaphore.
    pub fn is_conserved(&self) -> bool {
        (self.free_slots + self.used_slots) as usize == self.capacity
    }

    /// Unread slots according to the cursors. Agrees with `used_slots` at a
    /// quiescent point unless the ring is completely full.
    pub fn pending(&self) -> usize {
        RingConfig::new(self.capacity).pending(self.write_index, self.read_index)
    }
}

fn occupancy(region: &SharedRegion, sync: &SyncTriple) -> Result<Occupancy, SyncError> {
    let (free_slots, used_slots) = sync.occupancy()?;
    Ok(Occupancy {
        free_slots,
        used_slots,
        write_index: region.write_index()?,
        read_index: region.read_index()?,
        capacity: region.ring().capacity,
    })
}

/// The supervisor's side of the channel. Creates and destroys every named
/// resource.
pub struct OwnerChannel {
    // Field order is drop order: semaphores go before the region.
    sync: SyncTriple,
    region: SharedRegion,
    names: ResourceNames,
    /// Set once `terminate` was raised and the producers were released.
    released: bool,
}

impl OwnerChannel {
    /// Creates the region and the semaphores under `names`.
    ///
    /// Anything created before a failure is removed again before the error
    /// is returned.
    pub fn create(names: &ResourceNames, ring: RingConfig) -> Result<Self, ResourceError> {
        let region = SharedRegion::create(&names.region, ring)?;
        let sync = SyncTriple::create(names, ring.capacity)?;
        tracing::info!(region = %names.region, capacity = ring.capacity, "channel initialized");
        Ok(Self {
            sync,
            region,
            names: names.clone(),
            released: false,
        })
    }

    /// Removes leftover names from a supervisor that died without cleaning up.
    /// Returns how many of the four names existed.
    pub fn reclaim(names: &ResourceNames) -> Result<usize, ResourceError> {
        let mut removed = 0;
        for name in names.semaphores() {
            removed += usize::from(NamedSemaphore::unlink(name)?);
        }
        let region = chroma_shm::ShmSegmentMut::unlink(&names.region).map_err(|source| {
            ResourceError::Region {
                name: names.region.clone(),
                source,
            }
        })?;
        removed += usize::from(region);

        if removed > 0 {
            tracing::warn!(region = %names.region, removed, "reclaimed stale channel names");
        } else {
            tracing::debug!(region = %names.region, "no stale channel names");
        }
        Ok(removed)
    }

    /// Lets a SIGINT/SIGTERM wake a blocked [`recv`](Self::recv).
    pub fn wake_on_interrupt(&self) {
        interrupt::set_wake_target(&self.sync.used_slots);
    }

    /// Blocks until a producer has published a record, then takes it out of
    /// the ring and hands the slot back to the producers.
    pub fn recv(&mut self) -> Result<Receive, SyncError> {
        match self.sync.used_slots.wait() {
            Ok(()) => {}
            Err(WaitError::Interrupted) => return Ok(Receive::Interrupted),
            Err(WaitError::Os(e)) => return Err(self.sync.used_slots.sync_error("sem_wait", e)),
        }
        // The signal handler's wake post is not a record.
        if interrupt::requested() {
            return Ok(Receive::Interrupted);
        }

        // SAFETY: we are the only reader and hold a used_slots unit. A
        // corrupt read_index is fatal for the owner.
        let record = unsafe { self.region.pop() }?;
        self.sync.free_slots.post()?;

        Ok(match record {
            Ok(solution) => {
                tracing::debug!(edges = solution.len(), "record received");
                Receive::Record(solution)
            }
            Err(violation) => Receive::Corrupt(violation),
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.region.terminate_requested()
    }

    pub fn capacity(&self) -> usize {
        self.region.ring().capacity
    }

    pub fn names(&self) -> &ResourceNames {
        &self.names
    }

    pub fn occupancy(&self) -> Result<Occupancy, SyncError> {
        occupancy(&self.region, &self.sync)
    }

    /// Raises `terminate` and wakes every producer that may be parked on a
    /// full ring. Runs at most once.
    fn release_producers(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        interrupt::clear_wake_target(&self.sync.used_slots);

        self.region.request_terminate();
        for _ in 0..self.capacity() {
            if let Err(e) = self.sync.free_slots.post() {
                tracing::warn!(error = %e, "failed to wake producers");
                break;
            }
        }
    }

    /// Terminates the producers, then closes and unlinks the semaphores and
    /// unmaps and unlinks the region.
    pub fn shutdown(mut self) {
        self.release_producers();
        self.sync.remove_names();
        self.region.remove_name();
        tracing::info!(region = %self.names.region, "channel shut down");
        // Handles are closed and the region unmapped as `self` drops here.
    }
}

impl Drop for OwnerChannel {
    fn drop(&mut self) {
        self.release_producers();
    }
}

/// A generator's side of the channel. Never creates or removes anything.
pub struct ProducerChannel {
    region: SharedRegion,
    sync: SyncTriple,
}

impl ProducerChannel {
    /// Attaches to the channel a supervisor created under `names`.
    ///
    /// Fails with [`ResourceError::MissingOwner`] if no supervisor is running.
    /// No retry: the caller is expected to exit.
    pub fn attach(names: &ResourceNames) -> Result<Self, ResourceError> {
        let region = SharedRegion::attach(&names.region)?;
        let sync = SyncTriple::open(names)?;
        tracing::info!(region = %names.region, capacity = region.ring().capacity, "attached to channel");
        Ok(Self { region, sync })
    }

    /// Publishes one record, blocking while the ring is full.
    pub fn publish(&mut self, solution: &Solution) -> Result<Publish, SyncError> {
        solution.validate()?;

        match self.sync.free_slots.wait() {
            Ok(()) => {}
            Err(WaitError::Interrupted) => return Ok(Publish::Terminated),
            Err(WaitError::Os(e)) => return Err(self.sync.free_slots.sync_error("sem_wait", e)),
        }
        // The unit just taken may be one of the owner's shutdown posts. It is
        // not given back: the owner expects no further input.
        if self.region.terminate_requested() || interrupt::requested() {
            return Ok(Publish::Terminated);
        }

        let pushed = {
            let _lock = match SemaphoreGuard::acquire(&self.sync.write_mutex) {
                Ok(lock) => lock,
                Err(WaitError::Interrupted) => return Ok(Publish::Terminated),
                Err(WaitError::Os(e)) => {
                    return Err(self.sync.write_mutex.sync_error("sem_wait", e));
                }
            };
            // SAFETY: we hold the write mutex and a free_slots unit.
            unsafe { self.region.push(solution) }
        };
        if let Err(violation) = pushed {
            // Nothing was written; hand the slot back.
            self.sync.free_slots.post()?;
            return Err(violation.into());
        }

        self.sync.used_slots.post()?;
        tracing::trace!(edges = solution.len(), "record published");
        Ok(Publish::Written)
    }

    pub fn is_terminated(&self) -> bool {
        self.region.terminate_requested()
    }

    pub fn capacity(&self) -> usize {
        self.region.ring().capacity
    }

    pub fn region_name(&self) -> &str {
        self.region.name()
    }

    pub fn occupancy(&self) -> Result<Occupancy, SyncError> {
        occupancy(&self.region, &self.sync)
    }
}
