//! Shell Integration
//!
//! Opens Azure portal links in the OS browser.

use crate::resource::ResourceId;
use std::process::{Command, Stdio};

/// Result of a shell operation
#[derive(Debug)]
pub enum ShellResult {
    /// Command completed successfully
    Success,
    /// Command failed with exit code
    Failed(i32),
    /// Error launching command
    Error(String),
}

/// Open URL in browser (for portal links)
pub fn open_browser(url: &str) -> ShellResult {
    let (cmd, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", url])
    } else {
        // Linux - try xdg-open first
        ("xdg-open", vec![url])
    };

    execute_command(cmd, &args.iter().map(|s| s.to_string()).collect::<Vec<_>>())
}

/// Execute a command, inheriting stdio
fn execute_command(cmd: &str, args: &[String]) -> ShellResult {
    match Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(mut child) => match child.wait() {
            Ok(status) => {
                if status.success() {
                    ShellResult::Success
                } else {
                    ShellResult::Failed(status.code().unwrap_or(-1))
                }
            },
            Err(e) => ShellResult::Error(format!("Failed to wait for process: {}", e)),
        },
        Err(e) => ShellResult::Error(format!("Failed to execute {}: {}", cmd, e)),
    }
}

/// Build an Azure portal URL for a resource
pub fn portal_url(id: &ResourceId) -> String {
    format!("https://portal.azure.com/#@/resource{}", id)
}
