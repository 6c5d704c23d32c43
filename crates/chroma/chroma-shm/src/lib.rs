//! Named POSIX shared-memory segments mapped read-write.
//!
//! A segment lives in the system-wide shm namespace (`/dev/shm` on Linux)
//! under a name such as `/graph_coloring_shm`. The process that creates a
//! segment owns its name and removes it again when the handle is dropped;
//! processes that merely open a segment only unmap their view.

use memmap2::MmapMut;
use nix::fcntl::OFlag;
use nix::sys::mman;
use nix::sys::stat::Mode;
use std::{fs::File, io};

pub struct ShmSegmentMut {
    _file: File,
    mmap: MmapMut,
    name: String,
    /// Set for the creating process; cleared once the name has been removed.
    owns_name: bool,
}

impl ShmSegmentMut {
    /// Create a new segment of `size_bytes` zeroed bytes and map it read-write.
    ///
    /// Fails with `AlreadyExists` if a segment of that name is present. If the
    /// segment cannot be sized or mapped, the freshly created name is removed
    /// before the error is returned.
    pub fn create_rw(name: &str, size_bytes: u64) -> io::Result<Self> {
        let fd = mman::shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )?;
        let file = File::from(fd);

        let mapped = file
            .set_len(size_bytes)
            .and_then(|_| unsafe { MmapMut::map_mut(&file) });
        let mmap = match mapped {
            Ok(mmap) => mmap,
            Err(e) => {
                let _ = mman::shm_unlink(name);
                return Err(e);
            }
        };

        tracing::debug!(name, size_bytes, "created shm segment");
        Ok(Self {
            _file: file,
            mmap,
            name: name.to_owned(),
            owns_name: true,
        })
    }

    /// Open an existing segment and map it to read and write.
    ///
    /// A segment that exists but has not been sized yet is reported as
    /// `InvalidData`, since there is nothing to map.
    pub fn open_rw(name: &str) -> io::Result<Self> {
        let fd = mman::shm_open(name, OFlag::O_RDWR, Mode::empty())?;
        let file = File::from(fd);

        if file.metadata()?.len() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "shm segment has zero length",
            ));
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            _file: file,
            mmap,
            name: name.to_owned(),
            owns_name: false,
        })
    }

    /// Remove a segment name from the namespace. Existing mappings stay valid.
    ///
    /// Removing a name that does not exist is not an error. Returns whether
    /// a name was actually removed.
    pub fn unlink(name: &str) -> io::Result<bool> {
        match mman::shm_unlink(name) {
            Ok(()) => Ok(true),
            Err(nix::errno::Errno::ENOENT) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove this segment's name now instead of at drop. No-op for handles
    /// that did not create the segment, and on every call after the first.
    pub fn unlink_name(&mut self) -> io::Result<()> {
        if !self.owns_name {
            return Ok(());
        }
        self.owns_name = false;
        Self::unlink(&self.name).map(|_| ())
    }

    /// Return raw pointer to start of the mapped segment
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while this handle is responsible for removing the name.
    pub fn owns_name(&self) -> bool {
        self.owns_name
    }
}

impl Drop for ShmSegmentMut {
    fn drop(&mut self) {
        if let Err(e) = self.unlink_name() {
            tracing::warn!(name = %self.name, error = %e, "failed to unlink shm segment");
        }
    }
}
