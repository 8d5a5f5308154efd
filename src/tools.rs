//! Runtime tool path resolution
//!
//! For each external executable (e.g. `gnome-terminal`) we:
//! 1. Check for an environment variable `{TOOL}_BIN` (e.g. `GNOME_TERMINAL_BIN`)
//! 2. Fall back to PATH-based invocation if the envvar is not set
//!
//! This lets a packaged install pin exact binaries while plain installs rely on PATH.

use std::env;

/// Get the path to an external tool
///
/// Checks `{TOOL}_BIN`, with the tool name uppercased and `-` turned into `_`.
/// Falls back to the tool name itself, which relies on PATH.
///
/// ```rust,ignore
/// // With GNOME_TERMINAL_BIN="/usr/bin/gnome-terminal"
/// assert_eq!(get_tool_path("gnome-terminal"), "/usr/bin/gnome-terminal");
/// ```
pub fn get_tool_path(tool: &str) -> String {
    env::var(tool_env_var(tool)).unwrap_or_else(|_| tool.to_string())
}

/// Environment variable consulted for `tool`
pub fn tool_env_var(tool: &str) -> String {
    format!("{}_BIN", tool.to_uppercase().replace('-', "_"))
}

/// Common tool names
pub mod tools {
    pub const BASH: &str = "bash";
}
