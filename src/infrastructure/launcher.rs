//! Argo application deletion hand-off
//!
//! Deletion itself is done by an operator-maintained script that runs in its
//! own terminal window. The launcher spawns that window and returns at once:
//! there is no completion signal and no exit status to collect. The operator
//! watches the other window.

use std::process::Stdio;
use tokio::process::Command;

use crate::error::LaunchError;
use crate::tools::{get_tool_path, tools};

/// Launches the external application deletion
pub trait AppDeleter: Send + Sync {
    fn launch(&self, argocd_url: &str, service_name: &str) -> Result<LaunchHandle, LaunchError>;
}

/// What is known about a detached launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHandle {
    pub pid: Option<u32>,
    pub command: String,
}

/// Opens the deletion script in a new terminal session
pub struct TerminalLauncher {
    terminal: String,
    script: String,
}

impl TerminalLauncher {
    pub fn new(terminal: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            terminal: terminal.into(),
            script: script.into(),
        }
    }

    /// Arguments passed to the terminal emulator
    ///
    /// Script, URL and service go in as positional parameters so the shell
    /// never re-parses them.
    pub fn terminal_args(&self, argocd_url: &str, service_name: &str) -> Vec<String> {
        vec![
            "--".to_string(),
            get_tool_path(tools::BASH),
            "-c".to_string(),
            r#""$0" "$1" "$2"; read -p 'Press enter to close...'"#.to_string(),
            self.script.clone(),
            argocd_url.to_string(),
            service_name.to_string(),
        ]
    }
}

impl AppDeleter for TerminalLauncher {
    fn launch(&self, argocd_url: &str, service_name: &str) -> Result<LaunchHandle, LaunchError> {
        let terminal = get_tool_path(&self.terminal);
        let resolved = which::which(&terminal).map_err(|_| LaunchError::TerminalNotFound {
            terminal: terminal.clone(),
        })?;

        let args = self.terminal_args(argocd_url, service_name);
        let child = Command::new(&resolved)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                terminal: terminal.clone(),
                source,
            })?;

        // Dropping the handle detaches the child; tokio reaps it in the background.
        Ok(LaunchHandle {
            pid: child.id(),
            command: format!("{} {}", terminal, args.join(" ")),
        })
    }
}
