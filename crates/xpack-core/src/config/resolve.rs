use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, XpackError};

use super::types::XpackConfig;

pub const CONFIG_ENV_VAR: &str = "XPACK_CONFIG";

/// Expand `${VAR}` and `${VAR:-default}` placeholders in raw config text.
fn expand_env_placeholders(input: &str, path: &Path) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;

    while let Some(offset) = input[cursor..].find("${") {
        let start = cursor + offset;
        out.push_str(&input[cursor..start]);

        let token_start = start + 2;
        let Some(token_len) = input[token_start..].find('}') else {
            return Err(expand_error(path, input, start, "unterminated placeholder"));
        };
        let token = &input[token_start..token_start + token_len];
        let (name, default) = match token.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (token, None),
        };
        if !is_valid_env_var_name(name) {
            return Err(expand_error(
                path,
                input,
                start,
                format!("invalid environment variable name '{name}'"),
            ));
        }

        let value = match (std::env::var(name), default) {
            (Ok(v), Some(d)) if v.is_empty() => d.to_string(),
            (Ok(v), _) => v,
            (Err(std::env::VarError::NotPresent), Some(d)) => d.to_string(),
            (Err(std::env::VarError::NotPresent), None) => {
                return Err(expand_error(
                    path,
                    input,
                    start,
                    format!("environment variable '{name}' is not set"),
                ));
            }
            (Err(std::env::VarError::NotUnicode(_)), _) => {
                return Err(expand_error(
                    path,
                    input,
                    start,
                    format!("environment variable '{name}' is not valid UTF-8"),
                ));
            }
        };
        out.push_str(&value);
        cursor = token_start + token_len + 1;
    }

    out.push_str(&input[cursor..]);
    Ok(out)
}

fn is_valid_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn expand_error(path: &Path, input: &str, start: usize, message: impl fmt::Display) -> XpackError {
    let line = input[..start].matches('\n').count() + 1;
    let column = input[..start]
        .rsplit('\n')
        .next()
        .map_or(0, |s| s.chars().count())
        + 1;
    XpackError::Config(format!(
        "invalid config '{}': {message} at line {line}, column {column}",
        path.display()
    ))
}

/// Parse config text; `path` is only used in error messages.
pub fn parse_config(contents: &str, path: &Path) -> Result<XpackConfig> {
    let expanded = expand_env_placeholders(contents, path)?;
    let config: XpackConfig = if expanded.trim().is_empty() {
        XpackConfig::default()
    } else {
        serde_yaml::from_str(&expanded).map_err(|e| {
            XpackError::Config(format!("invalid config '{}': {e}", path.display()))
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Read and parse a YAML config file.
pub fn load_config(path: &Path) -> Result<XpackConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| XpackError::Config(format!("cannot read '{}': {e}", path.display())))?;
    parse_config(&contents, path)
}

/// Tracks where the config file was found.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Explicitly passed via `--config`.
    CliArg(PathBuf),
    /// Set via the `XPACK_CONFIG` env var.
    EnvVar(PathBuf),
    /// Found by searching standard locations.
    SearchOrder { path: PathBuf, level: &'static str },
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::CliArg(p) | ConfigSource::EnvVar(p) => p,
            ConfigSource::SearchOrder { path, .. } => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliArg(p) => write!(f, "{} (--config)", p.display()),
            ConfigSource::EnvVar(p) => write!(f, "{} ({CONFIG_ENV_VAR})", p.display()),
            ConfigSource::SearchOrder { path, level } => {
                write!(f, "{} ({})", path.display(), level)
            }
        }
    }
}

/// Search locations in priority order: project, user, system.
pub fn default_config_search_paths() -> Vec<(PathBuf, &'static str)> {
    let mut paths = vec![(PathBuf::from("xpack.yaml"), "project")];

    #[cfg(windows)]
    let user_config = dirs::config_dir().map(|base| base.join("xpack").join("config.yaml"));

    #[cfg(not(windows))]
    let user_config = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|base| base.join("xpack").join("config.yaml"));

    if let Some(p) = user_config {
        paths.push((p, "user"));
    }

    #[cfg(windows)]
    {
        let program_data = std::env::var_os("PROGRAMDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
        paths.push((program_data.join("xpack").join("config.yaml"), "system"));
    }

    #[cfg(not(windows))]
    paths.push((PathBuf::from("/etc/xpack/config.yaml"), "system"));

    paths
}

/// Resolve which config file to use.
///
/// Priority: CLI arg > `XPACK_CONFIG` > first existing file from search paths.
/// Returns `None` if nothing is found; xpack runs on defaults in that case.
pub fn resolve_config_path(cli_config: Option<&str>) -> Option<ConfigSource> {
    if let Some(path) = cli_config {
        return Some(ConfigSource::CliArg(PathBuf::from(path)));
    }

    if let Ok(val) = std::env::var(CONFIG_ENV_VAR) {
        if !val.is_empty() {
            return Some(ConfigSource::EnvVar(PathBuf::from(val)));
        }
    }

    default_config_search_paths()
        .into_iter()
        .find(|(path, _)| path.exists())
        .map(|(path, level)| ConfigSource::SearchOrder { path, level })
}

/// Starter config written by `xpack config`.
pub fn minimal_config_template() -> &'static str {
    r#"# xpack configuration file

source_dir: ./x-tool
destination: data.zip

# --- Optional settings (uncomment as needed) ---

# compression: deflate      # deflate | stored
# on_error: abort           # abort | continue
# symlinks: skip            # skip | follow
# entry_delay: 150ms
# confirm: true
#
# log_image:
#   enabled: true
#   path: log.png
#   max_lines: 30
#
# media_gate:
#   enabled: true
#   mount_path: /media
#   poll_interval: 2s
#   timeout: 10m
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::archive::{EntryCompression, ErrorPolicy, SymlinkPolicy};

    // Tests that mutate process-global state (env vars, CWD) must be serialized.
    static GLOBAL_STATE: Mutex<()> = Mutex::new(());

    fn parse(text: &str) -> Result<XpackConfig> {
        parse_config(text, Path::new("test.yaml"))
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, XpackConfig::default());
        assert_eq!(config.destination, "data.zip");
        assert_eq!(config.compression, EntryCompression::Deflate);
        assert_eq!(config.on_error, ErrorPolicy::FailFast);
        assert_eq!(config.symlinks, SymlinkPolicy::Skip);
        assert_eq!(config.media_gate.poll_interval, Duration::from_secs(2));
        assert_eq!(config.log_image.max_lines, 30);
    }

    #[test]
    fn test_full_document() {
        let config = parse(
            "source_dir: ./x-tool\n\
             destination: out/data.zip\n\
             compression: stored\n\
             on_error: continue\n\
             symlinks: follow\n\
             entry_delay: 150ms\n\
             confirm: true\n\
             log_image:\n  enabled: true\n  path: run.png\n  max_lines: 10\n\
             media_gate:\n  enabled: true\n  mount_path: /mnt/usb\n  poll_interval: 1s\n  timeout: 5m\n",
        )
        .unwrap();
        assert_eq!(config.source_dir.as_deref(), Some("./x-tool"));
        assert_eq!(config.destination, "out/data.zip");
        assert_eq!(config.compression, EntryCompression::Stored);
        assert_eq!(config.on_error, ErrorPolicy::BestEffort);
        assert_eq!(config.symlinks, SymlinkPolicy::Follow);
        assert_eq!(config.entry_delay, Duration::from_millis(150));
        assert!(config.confirm);
        assert!(config.log_image.enabled);
        assert_eq!(config.log_image.path, "run.png");
        assert_eq!(config.log_image.max_lines, 10);
        assert_eq!(config.log_image.width, 800);
        let gate = config.media_gate.to_gate();
        assert_eq!(gate.mount_path, PathBuf::from("/mnt/usb"));
        assert_eq!(gate.poll_interval, Duration::from_secs(1));
        assert_eq!(gate.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = parse("source: ./x-tool\n").unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{err}");
        assert!(parse("log_image:\n  colour: red\n").is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse("compression: lz4\n").is_err());
        assert!(parse("on_error: retry\n").is_err());
        assert!(parse("entry_delay: soon\n").is_err());
        assert!(parse("media_gate:\n  poll_interval: 0s\n").is_err());
        assert!(parse("destination: \"\"\n").is_err());
        assert!(parse("log_image:\n  width: 0\n").is_err());
        assert!(parse("log_image:\n  width: 4294967295\n  height: 4294967295\n").is_err());
        assert!(parse("log_image:\n  height: 100000\n").is_err());
        assert!(parse("log_image:\n  width: 16384\n  height: 16384\n").is_ok());
    }

    #[test]
    fn test_integer_durations_are_seconds() {
        let config = parse("entry_delay: 1\nmedia_gate:\n  timeout: 30\n").unwrap();
        assert_eq!(config.entry_delay, Duration::from_secs(1));
        assert_eq!(config.media_gate.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_env_placeholders_are_expanded() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _guard = EnvGuard::set("XPACK_TEST_SOURCE", "/srv/data");
        let _unset = EnvGuard::unset("XPACK_TEST_MISSING");
        let config = parse(
            "source_dir: ${XPACK_TEST_SOURCE}\ndestination: ${XPACK_TEST_MISSING:-backup.zip}\n",
        )
        .unwrap();
        assert_eq!(config.source_dir.as_deref(), Some("/srv/data"));
        assert_eq!(config.destination, "backup.zip");
    }

    #[test]
    fn test_env_placeholder_errors_report_position() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _unset = EnvGuard::unset("XPACK_TEST_MISSING");
        let err = parse("destination: a.zip\nsource_dir: ${XPACK_TEST_MISSING}\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("is not set"), "{msg}");
        assert!(msg.contains("line 2, column 13"), "{msg}");

        assert!(parse("source_dir: ${UNTERMINATED\n").is_err());
        assert!(parse("source_dir: ${1BAD}\n").is_err());
    }

    #[test]
    fn test_search_paths_order() {
        let paths = default_config_search_paths();
        assert!(paths.len() >= 2);
        assert_eq!(paths[0].1, "project");
        assert_eq!(paths.last().unwrap().1, "system");
    }

    #[test]
    fn test_resolve_cli_arg_wins() {
        let source = resolve_config_path(Some("/tmp/override.yaml")).unwrap();
        assert!(matches!(source, ConfigSource::CliArg(_)));
        assert_eq!(source.path(), Path::new("/tmp/override.yaml"));
    }

    #[test]
    fn test_resolve_env_var() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let _guard = EnvGuard::set(CONFIG_ENV_VAR, "/tmp/env-config.yaml");
        let source = resolve_config_path(None).unwrap();
        assert!(matches!(source, ConfigSource::EnvVar(_)));
        assert_eq!(source.path(), Path::new("/tmp/env-config.yaml"));
    }

    #[test]
    fn test_resolve_search_finds_project() {
        let _lock = GLOBAL_STATE.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("xpack.yaml"), "source_dir: here\n").unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let _env_guard = EnvGuard::set(CONFIG_ENV_VAR, "");

        let result = resolve_config_path(None);
        std::env::set_current_dir(original).unwrap();

        assert!(matches!(
            result.unwrap(),
            ConfigSource::SearchOrder {
                level: "project",
                ..
            }
        ));
    }

    #[test]
    fn test_minimal_template_is_valid_yaml() {
        let config = parse(minimal_config_template()).unwrap();
        assert_eq!(config.source_dir.as_deref(), Some("./x-tool"));
        assert_eq!(config.destination, "data.zip");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/path/xpack.yaml")).unwrap_err();
        assert!(matches!(err, XpackError::Config(_)));
    }

    /// RAII guard to set an env var and restore its previous value on drop.
    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::set_var(key, val);
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
