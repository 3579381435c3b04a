use std::sync::atomic::AtomicBool;

/// Global shutdown flag. Set to `true` on first SIGINT/SIGTERM.
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install signal handlers for cooperative shutdown.
///
/// The archiver checks [`SHUTDOWN`] between entries, so the archive is still
/// finalized. The first signal also restores the default handler so a second
/// signal terminates immediately.
pub fn install_signal_handlers() {
    #[cfg(unix)]
    {
        // Safety: the handler only stores an atomic bool and resets itself.
        unsafe {
            libc::signal(
                libc::SIGTERM,
                unix_signal_handler as *const () as libc::sighandler_t,
            );
            libc::signal(
                libc::SIGINT,
                unix_signal_handler as *const () as libc::sighandler_t,
            );
        }
    }
}

#[cfg(unix)]
extern "C" fn unix_signal_handler(sig: libc::c_int) {
    SHUTDOWN.store(true, std::sync::atomic::Ordering::SeqCst);
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
    }
}
