//! Optional image compression through an external command

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs `<command> <input> <output>` over staged uploads.
///
/// Compression is opportunistic: when the command is missing, fails, or
/// does not shrink the file, the original bytes are used.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    command: Option<String>,
}

impl Compressor {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// Compress the file at `input`, whose contents are `original`
    pub async fn compress(&self, input: &Path, original: Vec<u8>) -> Vec<u8> {
        let Some(command) = &self.command else {
            return original;
        };

        let output = output_path(input);
        let result = run(command, input, &output).await;

        if let Err(e) = fs::remove_file(&output).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = ?output, error = %e, "Failed to remove compression output");
            }
        }

        match result {
            Ok(compressed) if !compressed.is_empty() && compressed.len() < original.len() => {
                info!(
                    original = original.len(),
                    compressed = compressed.len(),
                    "Compressed upload"
                );
                compressed
            }
            Ok(compressed) => {
                debug!(
                    original = original.len(),
                    compressed = compressed.len(),
                    "Compression did not help, keeping original"
                );
                original
            }
            Err(e) => {
                warn!(command = %command, error = %e, "Compression failed, keeping original");
                original
            }
        }
    }
}

/// Hidden sibling of the input so it never collides with a cache key
fn output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!(".{}.min", name))
}

async fn run(command: &str, input: &Path, output: &Path) -> io::Result<Vec<u8>> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "empty compression command"))?;

    let status = Command::new(program)
        .args(parts)
        .arg(input)
        .arg(output)
        .kill_on_drop(true)
        .status()
        .await?;

    if !status.success() {
        return Err(io::Error::other(format!("command exited with {}", status)));
    }

    fs::read(output).await
}
