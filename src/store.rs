//! Persistence for the single high-score value that outlives a session.

use std::cell::Cell as SharedCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Name the high score is stored under.
pub const HIGH_SCORE_KEY: &str = "snakeHighScore";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("high score file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed high score file: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait HighScoreStore {
    /// Stored high score, `0` when nothing usable has been saved yet.
    fn load(&self) -> u32;

    fn save(&mut self, score: u32) -> Result<(), StoreError>;
}

/// On-disk layout: a JSON object with the high score under [`HIGH_SCORE_KEY`].
/// Other keys are carried through untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreFile {
    #[serde(rename = "snakeHighScore", default)]
    high_score: u32,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    fn read_file(&self) -> Result<ScoreFile, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(ScoreFile::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ScoreFile::default()),
            Err(source) => Err(StoreError::Io { path: self.path.clone(), source }),
        }
    }
}

impl HighScoreStore for FileStore {
    fn load(&self) -> u32 {
        match self.read_file() {
            Ok(file) => file.high_score,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring unreadable high score");
                0
            }
        }
    }

    fn save(&mut self, score: u32) -> Result<(), StoreError> {
        // A corrupt file is replaced rather than blocking new records.
        let mut file = self.read_file().unwrap_or_default();
        file.high_score = score;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }

        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        debug!(path = %self.path.display(), key = HIGH_SCORE_KEY, score, "saved high score");
        Ok(())
    }
}

/// Keeps the value in memory only. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Rc<SharedCell<u32>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn new(initial: u32) -> Self {
        MemoryStore { value: Rc::new(SharedCell::new(initial)) }
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&self) -> u32 {
        self.value.get()
    }

    fn save(&mut self, score: u32) -> Result<(), StoreError> {
        self.value.set(score);
        Ok(())
    }
}
