//! Media engine backed by an external `gst-launch` style program
//!
//! Each media path is one child process. A watch task owns the child: it
//! reports the exit as a fault, or kills the child when the path is stopped.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::descriptor::{SinkDescriptor, SourceDescriptor};
use super::engine::{FaultSender, MediaEngine, MediaError, MediaFault};

/// Default launcher program
pub const DEFAULT_PROGRAM: &str = "gst-launch-1.0";

/// Opus bitrate for relayed streams
const BITRATE: u32 = 96_000;

/// Runs media paths as child processes of a launcher program
#[derive(Debug, Clone)]
pub struct LaunchEngine {
    program: String,
}

/// A running child process
#[derive(Debug)]
pub struct LaunchHandle {
    pid: Option<u32>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LaunchHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl LaunchEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for LaunchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

/// Pipeline elements reading from a source
fn source_elements(source: &SourceDescriptor) -> Vec<String> {
    match source {
        SourceDescriptor::Uri(uri) => {
            let mut elements = match uri.as_str() {
                "test" => vec!["audiotestsrc".to_string(), "is-live=true".to_string()],
                "alsa" => vec!["alsasrc".to_string()],
                "pulse" => vec!["pulsesrc".to_string()],
                _ => match uri.split_once(':') {
                    Some(("alsa", device)) => vec!["alsasrc".to_string(), format!("device={}", device)],
                    Some(("pulse", device)) => vec!["pulsesrc".to_string(), format!("device={}", device)],
                    _ => vec!["uridecodebin".to_string(), format!("uri={}", uri)],
                },
            };
            elements.extend(
                [
                    "!",
                    "audioconvert",
                    "!",
                    "audioresample",
                    "!",
                    "opusenc",
                ]
                .map(String::from),
            );
            elements.push(format!("bitrate={}", BITRATE));
            elements.extend(["!", "oggmux"].map(String::from));
            elements
        }
        SourceDescriptor::Relay { host, port } => vec![
            "tcpclientsrc".to_string(),
            format!("host={}", host),
            format!("port={}", port),
            "!".to_string(),
            "oggdemux".to_string(),
            "!".to_string(),
            "opusdec".to_string(),
        ],
    }
}

/// Pipeline elements writing to a sink
fn sink_elements(sink: &SinkDescriptor) -> Vec<String> {
    match sink {
        SinkDescriptor::TcpServer { host, port } => vec![
            "tcpserversink".to_string(),
            format!("host={}", host),
            format!("port={}", port),
        ],
        SinkDescriptor::Playback { volume } => vec![
            "audioconvert".to_string(),
            "!".to_string(),
            "volume".to_string(),
            format!("volume={:.3}", SinkDescriptor::gain(*volume)),
            "!".to_string(),
            "autoaudiosink".to_string(),
        ],
    }
}

/// Launcher arguments for a path from `source` to `sink`
pub fn pipeline_args(source: &SourceDescriptor, sink: &SinkDescriptor) -> Vec<String> {
    let mut args = vec!["-q".to_string()];
    args.extend(source_elements(source));
    args.push("!".to_string());
    args.extend(sink_elements(sink));
    args
}

impl MediaEngine for LaunchEngine {
    type Handle = LaunchHandle;

    async fn start(
        &self,
        source: &SourceDescriptor,
        sink: &SinkDescriptor,
        faults: FaultSender,
    ) -> Result<LaunchHandle, MediaError> {
        let args = pipeline_args(source, sink);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!(pid = ?pid, %source, %sink, "Started media path");

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let fault = match status {
                        Ok(status) if status.success() => MediaFault::EndOfStream,
                        Ok(status) => MediaFault::Error(format!("media process exited with {}", status)),
                        Err(e) => MediaFault::Error(e.to_string()),
                    };
                    let _ = faults.send(fault);
                }
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(pid = ?pid, error = %e, "Failed to kill media process");
                    }
                }
            }
        });

        Ok(LaunchHandle { pid, stop_tx, task })
    }

    async fn stop(&self, handle: LaunchHandle) {
        let _ = handle.stop_tx.send(());
        let _ = handle.task.await;
        tracing::debug!(pid = ?handle.pid, "Stopped media path");
    }
}
