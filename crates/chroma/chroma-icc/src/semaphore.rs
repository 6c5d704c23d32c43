//! POSIX named semaphores (`sem_open` and friends).
//!
//! A `NamedSemaphore` is a handle to a kernel object identified by a name in
//! the system-wide namespace. Closing a handle never destroys the object;
//! only the creating handle removes the name, either explicitly through
//! [`NamedSemaphore::unlink_name`] or when dropped. Processes that still hold
//! an open handle keep a working semaphore after the name is gone.

use crate::error::{ResourceError, SyncError, WaitError};
use std::ffi::CString;
use std::io;
use std::ptr::NonNull;

pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
    /// Set for the creating handle; cleared once the name has been removed.
    owns_name: bool,
}

// SAFETY: POSIX semaphores are safe to use from any thread, and the handle
// is only closed in `Drop`.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

fn c_name(name: &str) -> Result<CString, ResourceError> {
    CString::new(name).map_err(|_| ResourceError::InvalidName {
        name: name.to_owned(),
    })
}

impl NamedSemaphore {
    /// Creates a new semaphore with `initial` units.
    ///
    /// Fails with `AlreadyExists` if the name is taken, so a second
    /// supervisor cannot silently share the first one's semaphores.
    pub fn create(name: &str, initial: u32) -> Result<Self, ResourceError> {
        let cname = c_name(name)?;
        // SAFETY: cname is a valid C string; mode and value are passed as
        // c_uint, matching the variadic promotion sem_open expects.
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        let sem = Self::check_open(name, sem)?;
        tracing::debug!(name, initial, "created semaphore");
        Ok(Self {
            sem,
            name: name.to_owned(),
            owns_name: true,
        })
    }

    /// Opens an existing semaphore. Fails with `MissingOwner` if absent.
    pub fn open(name: &str) -> Result<Self, ResourceError> {
        let cname = c_name(name)?;
        // SAFETY: cname is a valid C string; without O_CREAT no further
        // arguments are read.
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        let sem = Self::check_open(name, sem)?;
        Ok(Self {
            sem,
            name: name.to_owned(),
            owns_name: false,
        })
    }

    fn check_open(name: &str, sem: *mut libc::sem_t) -> Result<NonNull<libc::sem_t>, ResourceError> {
        if sem == libc::SEM_FAILED {
            return Err(ResourceError::from_io(name, io::Error::last_os_error(), true));
        }
        NonNull::new(sem).ok_or_else(|| ResourceError::Semaphore {
            name: name.to_owned(),
            source: io::Error::other("sem_open returned null"),
        })
    }

    /// Removes a semaphore name. Removing a missing name is not an error.
    /// Returns whether a name was actually removed.
    pub fn unlink(name: &str) -> Result<bool, ResourceError> {
        let cname = c_name(name)?;
        // SAFETY: cname is a valid C string.
        if unsafe { libc::sem_unlink(cname.as_ptr()) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::NotFound {
            return Ok(false);
        }
        Err(ResourceError::Semaphore {
            name: name.to_owned(),
            source: err,
        })
    }

    /// Removes this semaphore's name now. No-op for opened handles and on
    /// every call after the first.
    pub fn unlink_name(&mut self) -> Result<(), ResourceError> {
        if !self.owns_name {
            return Ok(());
        }
        self.owns_name = false;
        Self::unlink(&self.name).map(|_| ())
    }

    /// Blocks until a unit is available and takes it.
    ///
    /// A signal delivered while blocked yields [`WaitError::Interrupted`];
    /// the wait is not resumed.
    pub fn wait(&self) -> Result<(), WaitError> {
        // SAFETY: self.sem is an open semaphore for the lifetime of self.
        if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            Err(WaitError::Interrupted)
        } else {
            Err(WaitError::Os(err))
        }
    }

    /// Takes a unit if one is available without blocking.
    pub fn try_wait(&self) -> Result<bool, SyncError> {
        // SAFETY: as in `wait`.
        if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(false),
            _ => Err(self.sync_error("sem_trywait", err)),
        }
    }

    /// Adds a unit, waking one waiter if any.
    pub fn post(&self) -> Result<(), SyncError> {
        // SAFETY: as in `wait`.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(self.sync_error("sem_post", io::Error::last_os_error()))
        }
    }

    /// Current number of units. A snapshot, stale as soon as it returns.
    pub fn value(&self) -> Result<u32, SyncError> {
        let mut value: libc::c_int = 0;
        // SAFETY: as in `wait`; value is a valid out pointer.
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } == 0 {
            Ok(value.max(0) as u32)
        } else {
            Err(self.sync_error("sem_getvalue", io::Error::last_os_error()))
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw handle for the signal handler's wake post.
    pub(crate) fn as_raw(&self) -> *mut libc::sem_t {
        self.sem.as_ptr()
    }

    pub(crate) fn sync_error(&self, op: &'static str, source: io::Error) -> SyncError {
        SyncError::Semaphore {
            op,
            name: self.name.clone(),
            source,
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: the handle is open and never used after this point.
        unsafe { libc::sem_close(self.sem.as_ptr()) };
        if let Err(e) = self.unlink_name() {
            tracing::warn!(name = %self.name, error = %e, "failed to unlink semaphore");
        }
    }
}

/// Holds one unit of a binary semaphore and gives it back on drop, so the
/// write mutex is released on every exit path of a critical section.
pub(crate) struct SemaphoreGuard<'a> {
    sem: &'a NamedSemaphore,
}

impl<'a> SemaphoreGuard<'a> {
    pub(crate) fn acquire(sem: &'a NamedSemaphore) -> Result<Self, WaitError> {
        sem.wait()?;
        Ok(Self { sem })
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sem.post() {
            tracing::error!(error = %e, "failed to release semaphore guard");
        }
    }
}
