use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::Result;

/// Raw result of one invocation of the print capability.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Port for the operating system's print spooler.
///
/// `Err` means the capability could not be run at all (missing binary, I/O).
/// A job the spooler rejected is an `Ok` report with a non-zero exit code.
#[async_trait]
pub trait PrintPort: Send + Sync {
    async fn submit(&self, path: &Path) -> Result<JobReport>;
}

/// Classified result of one print submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrintOutcome {
    Success { details: String },
    CommandFailure { diagnostic: String },
    UnexpectedFailure { diagnostic: String },
}

impl PrintOutcome {
    pub fn from_report(report: JobReport) -> Self {
        if report.succeeded() {
            return Self::Success {
                details: report.stdout.trim().to_string(),
            };
        }

        let stderr = report.stderr.trim();
        let diagnostic = if !stderr.is_empty() {
            stderr.to_string()
        } else {
            match report.exit_code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        };
        Self::CommandFailure { diagnostic }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Submits stored files to the print capability, one attempt each, bounded by a timeout.
#[derive(Clone)]
pub struct PrintDispatcher {
    printer: Arc<dyn PrintPort>,
    timeout: Duration,
}

impl PrintDispatcher {
    pub fn new(printer: Arc<dyn PrintPort>, timeout: Duration) -> Self {
        Self { printer, timeout }
    }

    pub async fn dispatch(&self, path: &Path) -> PrintOutcome {
        let printer = Arc::clone(&self.printer);
        let owned = path.to_path_buf();
        // Own task so a panicking adapter is classified instead of unwinding the handler.
        let mut task = tokio::spawn(async move { printer.submit(&owned).await });

        let joined = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                let diagnostic = format!(
                    "print command timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                );
                warn!(path = %path.display(), "{diagnostic}");
                return PrintOutcome::UnexpectedFailure { diagnostic };
            }
        };

        let outcome = match joined {
            Ok(Ok(report)) => PrintOutcome::from_report(report),
            Ok(Err(e)) => PrintOutcome::UnexpectedFailure {
                diagnostic: e.to_string(),
            },
            Err(e) => PrintOutcome::UnexpectedFailure {
                diagnostic: format!("print task failed: {e}"),
            },
        };

        match &outcome {
            PrintOutcome::Success { details } => {
                info!(path = %path.display(), details = %details, "print job submitted")
            }
            PrintOutcome::CommandFailure { diagnostic } => {
                warn!(path = %path.display(), diagnostic = %diagnostic, "print command failed")
            }
            PrintOutcome::UnexpectedFailure { diagnostic } => {
                error!(path = %path.display(), diagnostic = %diagnostic, "print dispatch failed")
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePrinter, PrinterScript};

    fn dispatcher(script: PrinterScript) -> (PrintDispatcher, Arc<FakePrinter>) {
        let printer = Arc::new(FakePrinter::new(script));
        (
            PrintDispatcher::new(printer.clone(), Duration::from_millis(200)),
            printer,
        )
    }

    #[test]
    fn classifies_reports() {
        let ok = JobReport {
            exit_code: Some(0),
            stdout: "request id is hp-42 (1 file(s))\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(
            PrintOutcome::from_report(ok),
            PrintOutcome::Success {
                details: "request id is hp-42 (1 file(s))".to_string()
            }
        );

        let failed = JobReport {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "lp: unsupported document-format\n".to_string(),
        };
        assert_eq!(
            PrintOutcome::from_report(failed),
            PrintOutcome::CommandFailure {
                diagnostic: "lp: unsupported document-format".to_string()
            }
        );

        let silent = JobReport {
            exit_code: Some(2),
            ..JobReport::default()
        };
        assert_eq!(
            PrintOutcome::from_report(silent),
            PrintOutcome::CommandFailure {
                diagnostic: "exited with status 2".to_string()
            }
        );

        let killed = JobReport::default();
        assert!(matches!(
            PrintOutcome::from_report(killed),
            PrintOutcome::CommandFailure { diagnostic } if diagnostic.contains("signal")
        ));
    }

    #[tokio::test]
    async fn dispatch_submits_exactly_once() {
        let (d, printer) = dispatcher(PrinterScript::Succeed("request id 42".to_string()));
        let out = d.dispatch(Path::new("/tmp/x.pdf")).await;
        assert!(out.is_success());
        assert_eq!(printer.submitted().len(), 1);
    }

    #[tokio::test]
    async fn port_error_is_unexpected_failure() {
        let (d, _) = dispatcher(PrinterScript::Unavailable("lp: not found".to_string()));
        let out = d.dispatch(Path::new("/tmp/x.pdf")).await;
        assert!(matches!(
            out,
            PrintOutcome::UnexpectedFailure { diagnostic } if diagnostic.contains("lp: not found")
        ));
    }

    #[tokio::test]
    async fn timeout_is_unexpected_failure() {
        let (d, _) = dispatcher(PrinterScript::Hang);
        let out = d.dispatch(Path::new("/tmp/x.pdf")).await;
        assert!(matches!(
            out,
            PrintOutcome::UnexpectedFailure { diagnostic } if diagnostic.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn panicking_printer_is_unexpected_failure() {
        let (d, _) = dispatcher(PrinterScript::Panic);
        let out = d.dispatch(Path::new("/tmp/x.pdf")).await;
        assert!(matches!(out, PrintOutcome::UnexpectedFailure { .. }));
    }
}
