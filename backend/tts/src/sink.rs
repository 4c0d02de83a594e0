//! Where synthesized audio ends up.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::engine::AudioFormat;

/// Plays one clip to completion. Dropping the `play` future must stop playback.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: Bytes, format: AudioFormat) -> Result<()>;
}

/// Pipes audio into an external player (`ffplay`, `mpv`, ...) reading stdin.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// `ffplay -nodisp -autoexit -loglevel quiet -`
    pub fn ffplay() -> Self {
        Self::new(
            "ffplay",
            ["-nodisp", "-autoexit", "-loglevel", "quiet", "-"].map(String::from).to_vec(),
        )
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    async fn play(&self, audio: Bytes, _format: AudioFormat) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Interrupting speech drops this future; the player must die with it.
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning audio player {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&audio).await?;
            stdin.shutdown().await?;
        }
        let status = child.wait().await?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Writes each clip to a numbered file. Useful headless and in tests.
pub struct FileSink {
    dir: PathBuf,
    counter: AtomicU64,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), counter: AtomicU64::new(0) }
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&self, audio: Bytes, format: AudioFormat) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.dir.join(format!("utterance-{n:04}.{}", format.extension()));
        tokio::fs::write(&path, &audio).await.with_context(|| format!("writing {}", path.display()))?;
        debug!("[Sink] wrote {} bytes to {}", audio.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_sink_numbers_clips() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("audio"));
        sink.play(Bytes::from_static(b"one"), AudioFormat::Mp3).await.unwrap();
        sink.play(Bytes::from_static(b"two"), AudioFormat::Wav).await.unwrap();
        let second = std::fs::read(dir.path().join("audio/utterance-0002.wav")).unwrap();
        assert_eq!(second, b"two");
    }

    #[tokio::test]
    async fn missing_player_is_an_error() {
        let sink = CommandSink::new("pagesight-no-such-player", vec![]);
        assert!(sink.play(Bytes::from_static(b"x"), AudioFormat::Mp3).await.is_err());
    }
}
