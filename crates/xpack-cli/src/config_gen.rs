//! `xpack config`: write a starter configuration file.
//!
//! Relative paths in the template (`./x-tool`, `data.zip`) are resolved
//! against the working directory, so the project file next to them is the
//! default target.

use std::path::PathBuf;

use xpack_core::config;

pub(crate) fn run_config_generate(
    dest: Option<&str>,
    user: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_target(dest, user)?;
    write_template(&path)?;
    println!("Config written to: {}", path.display());
    println!("Set 'source_dir' to the directory to pack and 'destination' to the output ZIP.");
    Ok(())
}

/// Pick where the template goes: an explicit path, the user config file, or
/// the project file in the working directory.
fn config_target(dest: Option<&str>, user: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(d) = dest {
        return Ok(PathBuf::from(d));
    }
    let level = if user { "user" } else { "project" };
    config::default_config_search_paths()
        .into_iter()
        .find(|(_, l)| *l == level)
        .map(|(path, _)| path)
        .ok_or_else(|| format!("no {level} config location on this platform").into())
}

fn write_template(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!("file already exists: {}", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, config::minimal_config_template())?;
    Ok(())
}
