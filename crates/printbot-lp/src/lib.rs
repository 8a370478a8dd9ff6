//! Print capability adapter.
//!
//! Submits files to the system spooler by running `lp` (or any command with the
//! same calling convention: options first, file path last).

use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use printbot_core::{
    errors::Error,
    print::{JobReport, PrintPort},
    utils::tail_text,
    Result,
};

const OUTPUT_TAIL_MAX_BYTES: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct LpPrinter {
    program: String,
    args: Vec<String>,
}

impl LpPrinter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A dispatcher timeout drops the future; take the child down with it.
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PrintPort for LpPrinter {
    async fn submit(&self, path: &Path) -> Result<JobReport> {
        debug!(program = %self.program, path = %path.display(), "running print command");

        let out = self
            .command(path)
            .output()
            .await
            .map_err(|e| Error::External(format!("failed to run {}: {e}", self.program)))?;

        Ok(JobReport {
            exit_code: out.status.code(),
            stdout: capture(&out.stdout),
            stderr: capture(&out.stderr),
        })
    }
}

fn capture(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    tail_text(&text, OUTPUT_TAIL_MAX_BYTES).to_string()
}
