//! Wait for removable media before a run.
//!
//! Presence is judged only by the mount path listing at least one entry;
//! there is no device identity check.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, XpackError};
use crate::util::check_interrupted;

pub const DEFAULT_MOUNT_PATH: &str = "/media";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MediaGate {
    pub mount_path: PathBuf,
    pub poll_interval: Duration,
    /// Give up after this long; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for MediaGate {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_PATH)
    }
}

impl MediaGate {
    pub fn new(mount_path: impl Into<PathBuf>) -> Self {
        Self {
            mount_path: mount_path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    pub fn is_present(&self) -> bool {
        mount_has_entries(&self.mount_path)
    }

    /// Poll at a fixed interval until media shows up.
    ///
    /// `on_poll` is called with the attempt number after every unsuccessful
    /// check. Returns the number of checks performed.
    pub fn wait(
        &self,
        shutdown: Option<&AtomicBool>,
        mut on_poll: impl FnMut(u32),
    ) -> Result<u32> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            check_interrupted(shutdown)?;
            attempts += 1;
            if self.is_present() {
                info!(path = %self.mount_path.display(), attempts, "removable media detected");
                return Ok(attempts);
            }
            debug!(path = %self.mount_path.display(), attempts, "no media yet");
            on_poll(attempts);

            if let Some(timeout) = self.timeout {
                if started.elapsed() + self.poll_interval > timeout {
                    return Err(XpackError::MediaTimeout(self.mount_path.clone()));
                }
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

fn mount_has_entries(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}
