use crate::domain::tts::SynthesisResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

/// Give up looking for a free file name after this many suffixes
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free file name for {0}")]
    NameExhausted(PathBuf),

    #[error("invalid anchor '{0}': expected top, bottom or heading:<text>")]
    InvalidAnchor(String),
}

impl StorageError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durably writes audio and reports where it landed
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn write(&self, name: &str, audio: &[u8]) -> Result<PathBuf, StorageError>;
}

/// Writes into one directory, never replacing an existing file
#[derive(Debug, Clone)]
pub struct FsAudioSink {
    dir: PathBuf,
}

impl FsAudioSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidate(&self, name: &str, attempt: u32) -> PathBuf {
        if attempt == 0 {
            return self.dir.join(name);
        }

        let path = Path::new(name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.dir.join(format!("{}-{}.{}", stem, attempt, ext)),
            None => self.dir.join(format!("{}-{}", stem, attempt)),
        }
    }
}

#[async_trait]
impl AudioSink for FsAudioSink {
    async fn write(&self, name: &str, audio: &[u8]) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io("create directory", &self.dir, e))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.candidate(name, attempt);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::io("create", &path, e)),
            };

            file.write_all(audio)
                .await
                .map_err(|e| StorageError::io("write", &path, e))?;
            file.sync_all()
                .await
                .map_err(|e| StorageError::io("sync", &path, e))?;

            tracing::info!(
                path = %path.display(),
                audio_size_bytes = audio.len(),
                "Audio written"
            );
            return Ok(path);
        }

        Err(StorageError::NameExhausted(self.dir.join(name)))
    }
}

/// Where a block goes inside the target text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// After front matter, if any
    Top,
    Bottom,
    /// Right below the first heading with this text; bottom when missing
    AfterHeading(String),
}

impl FromStr for Anchor {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "top" => return Ok(Anchor::Top),
            "bottom" => return Ok(Anchor::Bottom),
            _ => {}
        }

        match trimmed.split_once(':') {
            Some((kind, heading))
                if kind.eq_ignore_ascii_case("heading") && !heading.trim().is_empty() =>
            {
                Ok(Anchor::AfterHeading(heading.trim().to_string()))
            }
            _ => Err(StorageError::InvalidAnchor(s.to_string())),
        }
    }
}

/// Inserts a block of text into a larger text resource
#[async_trait]
pub trait TextInserter: Send + Sync {
    async fn insert(&self, target: &Path, anchor: &Anchor, block: &str)
        -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct FsTextInserter;

impl FsTextInserter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextInserter for FsTextInserter {
    async fn insert(
        &self,
        target: &Path,
        anchor: &Anchor,
        block: &str,
    ) -> Result<(), StorageError> {
        let content = tokio::fs::read_to_string(target)
            .await
            .map_err(|e| StorageError::io("read", target, e))?;

        let updated = insert_block(&content, anchor, block);

        tokio::fs::write(target, updated)
            .await
            .map_err(|e| StorageError::io("write", target, e))?;

        tracing::info!(path = %target.display(), anchor = ?anchor, "Block inserted");
        Ok(())
    }
}

/// Insert `block` into `content` as its own paragraph
pub fn insert_block(content: &str, anchor: &Anchor, block: &str) -> String {
    let block = block.trim_end();
    let lines: Vec<&str> = content.lines().collect();

    let position = match anchor {
        Anchor::Top => Some(front_matter_end(&lines)),
        Anchor::Bottom => None,
        Anchor::AfterHeading(heading) => {
            let found = lines
                .iter()
                .position(|line| heading_text(line) == Some(heading.as_str()))
                .map(|i| i + 1);
            if found.is_none() {
                tracing::warn!(heading = %heading, "Heading not found, appending at the bottom");
            }
            found
        }
    };

    let Some(position) = position else {
        let body = content.trim_end();
        return if body.is_empty() {
            format!("{}\n", block)
        } else {
            format!("{}\n\n{}\n", body, block)
        };
    };

    let (before, after) = lines.split_at(position);
    let mut out = String::with_capacity(content.len() + block.len() + 4);
    for line in before {
        out.push_str(line);
        out.push('\n');
    }
    if !before.is_empty() && !before.last().is_some_and(|l| l.trim().is_empty()) {
        out.push('\n');
    }
    out.push_str(block);
    out.push('\n');

    let rest: Vec<&str> = after
        .iter()
        .skip_while(|l| l.trim().is_empty())
        .copied()
        .collect();
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(&rest.join("\n"));
        out.push('\n');
    }
    out
}

fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let text = trimmed.trim_start_matches('#');
    if text.len() == trimmed.len() || !(text.is_empty() || text.starts_with(' ')) {
        return None;
    }
    Some(text.trim())
}

fn front_matter_end(lines: &[&str]) -> usize {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return 0;
    }
    lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == "---")
        .map(|i| i + 2)
        .unwrap_or(0)
}

/// File name for a fresh narration, e.g. `narration-20240501-093000.mp3`
pub fn audio_file_name(result: &SynthesisResult, now: DateTime<Utc>) -> String {
    format!(
        "narration-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        result.extension()
    )
}

/// Embed link plus a metadata comment naming what produced the audio
pub fn embed_block(path: &Path, result: &SynthesisResult) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    format!(
        "![[{}]]\n%% narrate: provider={} model={} voice={} %%",
        file_name,
        result.provider().as_str(),
        result.model(),
        result.voice()
    )
}
