//! Platform durable-sync shims
//!
//! The journal swap renames a freshly written file over the live journal.
//! Before the rename the new file is synced, and after it the parent
//! directory is synced, so a crash leaves at least one readable journal
//! generation behind. Each platform maps to its strongest primitive:
//! fdatasync on Linux, F_FULLFSYNC on Apple platforms, FlushFileBuffers
//! on Windows.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flush file data to persistent storage.
///
/// May block for an extended period under heavy I/O; callers must not hold
/// the index lock across this call.
pub fn sync_file(file: &File) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        // fdatasync skips metadata (atime/mtime), which the journal does
        // not care about.
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fdatasync on a descriptor obtained from a live File.
        let rc = unsafe { libc::fdatasync(fd) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        // Plain fsync on Apple platforms only reaches the drive's volatile
        // write cache; F_FULLFSYNC is required for power-loss durability.
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fcntl on a descriptor obtained from a live File.
        let rc = unsafe { libc::fcntl(fd, libc::F_FULLFSYNC) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::FlushFileBuffers;
        let handle = file.as_raw_handle();
        // SAFETY: FlushFileBuffers on a handle obtained from a live File.
        let rc = unsafe { FlushFileBuffers(handle as *mut _) };
        if rc != 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "windows"
    )))]
    {
        file.sync_data()
    }
}

/// Persist a rename by syncing the containing directory.
///
/// POSIX requires the directory itself to be synced for the new name to
/// survive a crash. Windows has no equivalent on directory handles; the
/// rename is already durable enough there.
pub fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)?;
        sync_file(&dir)
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}
