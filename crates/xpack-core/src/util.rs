use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, XpackError};

/// Return `Err(XpackError::Interrupted)` if the shutdown flag is set.
pub fn check_interrupted(shutdown: Option<&AtomicBool>) -> Result<()> {
    if shutdown.is_some_and(|f| f.load(Ordering::Relaxed)) {
        return Err(XpackError::Interrupted);
    }
    Ok(())
}
