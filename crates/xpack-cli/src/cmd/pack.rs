use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use xpack_core::archive::{
    self, ArchiveProgressEvent, ArchiveRequest, EntryCompression, ErrorPolicy, SymlinkPolicy,
};
use xpack_core::config::{self, XpackConfig};
use xpack_core::gate::MediaGate;
use xpack_core::report::render::{save_log_image, ImageLayout};

use crate::cli::PackArgs;
use crate::console::ConsoleLog;
use crate::format::{format_bytes, format_elapsed};
use crate::prompt;
use crate::signal::SHUTDOWN;

const CONFIRM_QUESTION: &str = "Start the backup?";

/// Everything a pack run needs, after command-line flags were layered over
/// the config file.
#[derive(Debug)]
pub(crate) struct PackSettings {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub compression: EntryCompression,
    pub error_policy: ErrorPolicy,
    pub symlinks: SymlinkPolicy,
    pub entry_delay: Duration,
    pub confirm: bool,
    pub assume_yes: bool,
    pub log_image: Option<PathBuf>,
    pub layout: ImageLayout,
    pub max_log_lines: usize,
    pub gate: Option<MediaGate>,
}

impl PackSettings {
    pub(crate) fn resolve(
        cfg: &XpackConfig,
        args: &PackArgs,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let source = match (&args.source, cfg.source_path()) {
            (Some(s), _) => config::expand_tilde(s),
            (None, Some(p)) => p,
            (None, None) => {
                return Err(
                    "no source directory given; pass SOURCE or set 'source_dir' in the config"
                        .into(),
                )
            }
        };
        let destination = args
            .dest
            .as_deref()
            .map(config::expand_tilde)
            .unwrap_or_else(|| cfg.destination_path());

        let compression = match &args.compression {
            Some(c) => EntryCompression::from_config(c)?,
            None => cfg.compression,
        };
        let error_policy = if args.continue_on_error {
            ErrorPolicy::BestEffort
        } else {
            cfg.on_error
        };
        let symlinks = if args.follow_symlinks {
            SymlinkPolicy::Follow
        } else {
            cfg.symlinks
        };
        let entry_delay = match &args.delay {
            Some(d) => config::parse_duration(d)?,
            None => cfg.entry_delay,
        };

        let log_image = match &args.log_image {
            Some(p) => Some(config::expand_tilde(p)),
            None if cfg.log_image.enabled => Some(cfg.log_image.output_path()),
            None => None,
        };

        let gate = match &args.wait_for_media {
            Some(path) => {
                let mut gate = cfg.media_gate.to_gate();
                if !path.is_empty() {
                    gate.mount_path = config::expand_tilde(path);
                }
                Some(gate)
            }
            None if cfg.media_gate.enabled => Some(cfg.media_gate.to_gate()),
            None => None,
        };

        Ok(Self {
            source,
            destination,
            compression,
            error_policy,
            symlinks,
            entry_delay,
            confirm: args.confirm || cfg.confirm,
            assume_yes: args.yes,
            log_image,
            layout: cfg.log_image.layout(),
            max_log_lines: cfg.log_image.max_lines,
            gate,
        })
    }
}

pub(crate) fn run_pack(settings: &PackSettings) -> Result<(), Box<dyn std::error::Error>> {
    let mut console = ConsoleLog::new(settings.max_log_lines);
    let result = pack_with_console(settings, &mut console);

    if let Some(path) = &settings.log_image {
        match save_log_image(console.book().lines(), path, &settings.layout) {
            Ok(()) => info!(path = %path.display(), "log image saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write log image"),
        }
    }

    result
}

fn pack_with_console(
    settings: &PackSettings,
    console: &mut ConsoleLog,
) -> Result<(), Box<dyn std::error::Error>> {
    console.info("Start");

    if let Some(gate) = &settings.gate {
        wait_for_media(gate, console)?;
    }

    if settings.confirm && !settings.assume_yes && !ask_to_start()? {
        console.error("Cancelled by user");
        return Ok(());
    }

    let mut req = ArchiveRequest::new(&settings.source, &settings.destination);
    req.compression = settings.compression;
    req.error_policy = settings.error_policy;
    req.symlinks = settings.symlinks;
    req.entry_delay = settings.entry_delay;
    req.shutdown = Some(&SHUTDOWN);

    let started = Instant::now();
    let mut reported = 0usize;
    let mut on_progress = |event: ArchiveProgressEvent| {
        if matches!(event, ArchiveProgressEvent::EntryFailed { .. }) {
            reported += 1;
        }
        console.on_event(&event);
    };

    let outcome = match archive::run_with_progress(req, Some(&mut on_progress)) {
        Ok(outcome) => outcome,
        Err(e) => {
            console.error(e.to_string());
            return Err(e.into());
        }
    };

    // Interruption and finalize failures are not tied to an entry event.
    for e in outcome.errors.iter().skip(reported) {
        console.error(e.to_string());
    }

    if let Some(first) = outcome.first_error() {
        let count = outcome.errors.len();
        if count == 1 {
            return Err(first.to_string().into());
        }
        return Err(format!("{count} errors while archiving; first: {first}").into());
    }

    console.ok(format!(
        "Archive created: {} ({} files, {}, {})",
        settings.destination.display(),
        outcome.entries_written,
        format_bytes(outcome.bytes_written),
        format_elapsed(started.elapsed()),
    ));
    if !outcome.skipped.is_empty() {
        console.info(format!("{} entries skipped", outcome.skipped.len()));
    }
    Ok(())
}

fn wait_for_media(
    gate: &MediaGate,
    console: &mut ConsoleLog,
) -> Result<(), Box<dyn std::error::Error>> {
    if !gate.is_present() {
        console.info(format!(
            "Waiting for removable media at {}",
            gate.mount_path.display()
        ));
    }
    match gate.wait(Some(&SHUTDOWN), |_| {}) {
        Ok(_) => {
            console.ok("Removable media detected");
            Ok(())
        }
        Err(e) => {
            console.error(e.to_string());
            Err(e.into())
        }
    }
}

fn ask_to_start() -> io::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        warn!("stdin is not a terminal; reading the confirmation answer from it");
    }
    prompt::confirm(CONFIRM_QUESTION, &mut stdin.lock(), &mut io::stdout())
}
