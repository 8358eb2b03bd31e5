//! Renderer that runs an external command once per frame.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics::FRAMES_RENDERED;

use super::{RenderError, RenderedFrame, Renderer, RendererConfig};

/// Runs the configured command for every frame.
///
/// The command receives the script on stdin and the frame position in the
/// `PINFORGE_FRAME_INDEX` and `PINFORGE_FRAME_COUNT` environment variables,
/// and writes the PNG to stdout. A shared semaphore bounds the number of
/// frames in progress across all jobs.
pub struct ProcessRenderer {
    config: RendererConfig,
    permits: Arc<Semaphore>,
}

impl ProcessRenderer {
    pub fn new(config: RendererConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_parallel_frames.max(1)));
        Self { config, permits }
    }

    fn spawn_frame(
        &self,
        tasks: &mut JoinSet<Result<RenderedFrame, RenderError>>,
        script: Arc<String>,
        index: usize,
        frame_count: usize,
    ) {
        let config = self.config.clone();
        let permits = Arc::clone(&self.permits);

        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| RenderError::Cancelled)?;
            render_frame(&config, &script, index, frame_count).await
        });
    }
}

async fn render_frame(
    config: &RendererConfig,
    script: &str,
    index: usize,
    frame_count: usize,
) -> Result<RenderedFrame, RenderError> {
    let mut child = Command::new(&config.command)
        .args(&config.args)
        .env("PINFORGE_FRAME_INDEX", index.to_string())
        .env("PINFORGE_FRAME_COUNT", frame_count.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RenderError::Spawn(format!("{}: {}", config.command.display(), e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        let script = script.to_string();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                debug!(index, error = %e, "Renderer closed stdin early");
            }
        });
    }

    let output = timeout(
        Duration::from_secs(config.frame_timeout_secs),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| RenderError::Timeout {
        index,
        timeout_secs: config.frame_timeout_secs,
    })?
    .map_err(|e| RenderError::frame_failed(index, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RenderError::frame_failed(
            index,
            format!(
                "{}: {}",
                output.status,
                stderr.trim().chars().take(200).collect::<String>()
            ),
        ));
    }

    if output.stdout.is_empty() {
        return Err(RenderError::frame_failed(index, "renderer produced no output"));
    }

    Ok(RenderedFrame {
        index,
        data: output.stdout,
    })
}

#[async_trait]
impl Renderer for ProcessRenderer {
    fn name(&self) -> &str {
        "process"
    }

    async fn render(
        &self,
        script: String,
        frame_count: usize,
        frames: mpsc::Sender<RenderedFrame>,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        let script = Arc::new(script);
        let window = self.config.max_parallel_frames.max(1);
        let mut tasks = JoinSet::new();
        let mut next = 0;

        loop {
            while next < frame_count && tasks.len() < window && !cancel.is_cancelled() {
                self.spawn_frame(&mut tasks, Arc::clone(&script), next, frame_count);
                next += 1;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(RenderError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            let frame = match joined {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => {
                    warn!(error = %e, "Frame render failed");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(RenderError::Spawn(e.to_string()));
                }
            };

            FRAMES_RENDERED.inc();
            if frames.send(frame).await.is_err() {
                tasks.abort_all();
                return Err(RenderError::SinkClosed);
            }
        }

        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_renderer(body: &str) -> ProcessRenderer {
        ProcessRenderer::new(RendererConfig {
            command: "sh".into(),
            args: vec!["-c".to_string(), body.to_string()],
            max_parallel_frames: 3,
            frame_timeout_secs: 10,
            ..Default::default()
        })
    }

    async fn collect(mut rx: mpsc::Receiver<RenderedFrame>) -> Vec<RenderedFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_renders_every_frame() {
        let renderer = shell_renderer(r#"cat > /dev/null; printf "frame-$PINFORGE_FRAME_INDEX""#);
        let (tx, rx) = mpsc::channel(16);

        let result = renderer
            .render("draw()".to_string(), 5, tx, CancellationToken::new())
            .await;
        assert!(result.is_ok());

        let mut frames = collect(rx).await;
        frames.sort_by_key(|f| f.index);
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.data, format!("frame-{i}").into_bytes());
        }
    }

    #[tokio::test]
    async fn test_script_is_passed_on_stdin() {
        let renderer = shell_renderer("cat");
        let (tx, rx) = mpsc::channel(4);

        renderer
            .render("let x = 1;".to_string(), 1, tx, CancellationToken::new())
            .await
            .unwrap();

        let frames = collect(rx).await;
        assert_eq!(frames[0].data, b"let x = 1;");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let renderer = shell_renderer("cat");
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = renderer.render("x".to_string(), 10, tx, cancel).await.unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
        assert!(collect(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_frame() {
        let renderer = shell_renderer("cat > /dev/null; echo broken >&2; exit 3");
        let (tx, _rx) = mpsc::channel(4);

        let err = renderer
            .render("x".to_string(), 2, tx, CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            RenderError::FrameFailed { reason, .. } => assert!(reason.contains("broken")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_command() {
        let renderer = ProcessRenderer::new(RendererConfig {
            command: "/nonexistent/pinforge-render".into(),
            ..Default::default()
        });
        let (tx, _rx) = mpsc::channel(4);

        let err = renderer
            .render("x".to_string(), 1, tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn(_)));
    }
}
