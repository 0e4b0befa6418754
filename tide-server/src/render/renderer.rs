//! External calendar rendering.
//!
//! The two-stage `pcal` → `ps2pdf` pipeline runs in a scratch directory
//! with a timeout per stage. Children are killed if the render is dropped.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::domain::MonthRef;

/// Default per-stage timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `pcal -s` colour for emphasized dates, as `r:g:b` (blue).
const DEFAULT_HIGHLIGHT: &str = "0.0:0.0:1.0";

/// Errors from the render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The tool could not be started
    #[error("failed to start {stage}: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully
    #[error("{stage} exited with {}: {stderr}", .code.map_or("a signal".to_string(), |c| format!("status {c}")))]
    Exit {
        stage: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool ran past its deadline
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// The pipeline finished without producing a document
    #[error("renderer produced no output")]
    EmptyOutput,

    /// Scratch directory IO failed
    #[error("render IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a day file into a printable document.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        day_file: &str,
        period: MonthRef,
    ) -> impl Future<Output = Result<Vec<u8>, RenderError>> + Send;
}

/// Configuration for the `pcal` pipeline.
#[derive(Debug, Clone)]
pub struct PcalConfig {
    /// Path or name of the `pcal` binary
    pub pcal_bin: PathBuf,
    /// Path or name of the `ps2pdf` binary
    pub ps2pdf_bin: PathBuf,
    /// Colour passed to `pcal -s`
    pub highlight: String,
    /// Timeout per stage in seconds
    pub timeout_secs: u64,
}

impl PcalConfig {
    pub fn new() -> Self {
        Self {
            pcal_bin: PathBuf::from("pcal"),
            ps2pdf_bin: PathBuf::from("ps2pdf"),
            highlight: DEFAULT_HIGHLIGHT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_binaries(mut self, pcal: impl Into<PathBuf>, ps2pdf: impl Into<PathBuf>) -> Self {
        self.pcal_bin = pcal.into();
        self.ps2pdf_bin = ps2pdf.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for PcalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders calendars with `pcal` and `ps2pdf`.
#[derive(Debug, Clone)]
pub struct PcalRenderer {
    config: PcalConfig,
}

impl PcalRenderer {
    pub fn new(config: PcalConfig) -> Self {
        Self { config }
    }

    async fn run_stage(&self, stage: &'static str, mut command: Command) -> Result<(), RenderError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let secs = self.config.timeout_secs;
        let output = match tokio::time::timeout(Duration::from_secs(secs), command.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(RenderError::Spawn { stage, source }),
            Err(_) => return Err(RenderError::Timeout { stage, secs }),
        };

        if !output.status.success() {
            return Err(RenderError::Exit {
                stage,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(500)
                    .collect(),
            });
        }

        debug!(stage, "render stage finished");
        Ok(())
    }

    fn pcal_command(&self, input: &Path, output: &Path, period: MonthRef) -> Command {
        let mut command = Command::new(&self.config.pcal_bin);
        command
            .arg("-f")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-s")
            .arg(&self.config.highlight)
            .arg("-m")
            .arg("-S")
            .arg(period.month().to_string())
            .arg(period.year().to_string());
        command
    }

    fn ps2pdf_command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.config.ps2pdf_bin);
        command.arg(input).arg(output);
        command
    }
}

impl Renderer for PcalRenderer {
    async fn render(&self, day_file: &str, period: MonthRef) -> Result<Vec<u8>, RenderError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("tides.txt");
        let postscript = scratch.path().join("tides.ps");
        let pdf = scratch.path().join("tides.pdf");

        tokio::fs::write(&input, day_file).await?;

        self.run_stage("pcal", self.pcal_command(&input, &postscript, period))
            .await?;
        self.run_stage("ps2pdf", self.ps2pdf_command(&postscript, &pdf))
            .await?;

        let bytes = match tokio::fs::read(&pdf).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::EmptyOutput);
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june() -> MonthRef {
        MonthRef::new(2024, 6).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = PcalConfig::new();
        assert_eq!(config.pcal_bin, PathBuf::from("pcal"));
        assert_eq!(config.ps2pdf_bin, PathBuf::from("ps2pdf"));
        assert_eq!(config.highlight, "0.0:0.0:1.0");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn pcal_arguments() {
        let renderer = PcalRenderer::new(PcalConfig::new());
        let command =
            renderer.pcal_command(Path::new("in.txt"), Path::new("out.ps"), june());
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["-f", "in.txt", "-o", "out.ps", "-s", "0.0:0.0:1.0", "-m", "-S", "6", "2024"]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let config = PcalConfig::new().with_binaries("/nonexistent/pcal", "/nonexistent/ps2pdf");
        let err = PcalRenderer::new(config)
            .render("6/1  00:17 High 3.2 m\n", june())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn { stage: "pcal", .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_stage_is_exit_error() {
        let config = PcalConfig::new().with_binaries("false", "true");
        let err = PcalRenderer::new(config)
            .render("6/1  00:17 High 3.2 m\n", june())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Exit { stage: "pcal", code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn no_output_is_empty_output() {
        let config = PcalConfig::new().with_binaries("true", "true");
        let err = PcalRenderer::new(config)
            .render("6/1  00:17 High 3.2 m\n", june())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyOutput));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_stage_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow.sh");
        write_script(&script, "#!/bin/sh\nsleep 5\n");

        let config = PcalConfig::new().with_binaries(&script, "true").with_timeout(1);
        let err = PcalRenderer::new(config)
            .render("6/1  00:17 High 3.2 m\n", june())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { stage: "pcal", secs: 1 }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn produces_pdf_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_ps2pdf.sh");
        write_script(&script, "#!/bin/sh\nprintf '%%PDF-1.4 fake' > \"$2\"\n");

        let config = PcalConfig::new().with_binaries("true", &script);
        let bytes = PcalRenderer::new(config)
            .render("6/1  00:17 High 3.2 m\n", june())
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[cfg(unix)]
    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
