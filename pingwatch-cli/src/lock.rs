//! Single-instance guard backed by a PID file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Lock file name inside the system temp directory.
pub const LOCK_FILE_NAME: &str = "pingwatch.lock";

/// Why the lock could not be taken.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another live process holds it.
    #[error("pingwatch is already running (pid {pid})")]
    Held { pid: u32 },

    #[error("lock file error: {0}")]
    Io(#[from] io::Error),
}

/// Held lock. The file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Default lock location.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(LOCK_FILE_NAME)
    }

    /// Take the lock at `path`, reclaiming it if its owner is gone or the
    /// file is unreadable.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();

        // Two rounds: the second runs after a stale file was removed.
        for _ in 0..2 {
            match Self::create(&path) {
                Ok(()) => {
                    debug!("acquired instance lock {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            match read_pid(&path) {
                Some(pid) if pid != std::process::id() && process_alive(pid) => {
                    return Err(LockError::Held { pid });
                }
                stale => {
                    info!(
                        "removing stale lock {} (pid {:?})",
                        path.display(),
                        stale
                    );
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Err(LockError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("could not claim {}", path.display()),
        )))
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        write!(file, "{}", std::process::id())?;
        file.flush()
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence and permission.
    // SAFETY: kill with signal 0 sends nothing and has no memory effects.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    let filter = format!("PID eq {}", pid);
    std::process::Command::new("tasklist")
        .args(["/FI", filter.as_str(), "/NH"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
fn process_alive(_pid: u32) -> bool {
    true
}
