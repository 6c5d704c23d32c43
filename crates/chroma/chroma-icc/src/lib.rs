mod channel;
mod error;
pub mod interrupt;
mod names;
mod region;
mod ring;
mod semaphore;
mod shm_layout;
mod sync;

pub use channel::{Occupancy, OwnerChannel, ProducerChannel, Publish, Receive};
pub use error::{ResourceError, SyncError, WaitError};
pub use names::{DEFAULT_NAMESPACE, ResourceNames};
pub use ring::{MAX_CAPACITY, RingConfig};
pub use semaphore::NamedSemaphore;
pub use shm_layout::{RegionHeader, bytes_for_region};
