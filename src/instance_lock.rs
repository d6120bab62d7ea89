use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Exclusive process lock over a data directory.
///
/// Correlation cycles are a read-modify-write over whole JSON snapshots, so
/// two processes sharing a data directory would silently lose each other's
/// updates. The lock file lives inside the data directory itself and is
/// held via `flock` until dropped.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Creating data directory {}", data_dir.display()))?;
        let path = data_dir.join(".skyroutes.lock");

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Opening lock file {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if result != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    anyhow::bail!(
                        "Another instance already owns {}. Lock file: {}",
                        data_dir.display(),
                        path.display()
                    );
                }
                return Err(err).context("Acquiring data directory lock");
            }
        }

        let mut pid_writer = file.try_clone().context("Cloning lock file handle")?;
        writeln!(pid_writer, "{}", std::process::id()).context("Writing PID to lock file")?;

        info!("Acquired instance lock at {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
        if std::fs::remove_file(&self.path).is_ok() {
            debug!("Released instance lock at {}", self.path.display());
        }
    }
}
