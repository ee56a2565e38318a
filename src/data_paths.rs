//! Purpose: Shared default location for the roster data file.
//! Exports: `default_data_path`.
//! Role: Keep CLI and server data-file semantics aligned from one source.
//! Invariants: Default data file remains `~/.muster/roster.json`.

use std::path::PathBuf;

pub(crate) fn default_data_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".muster").join("roster.json")
}
