//! Synthesis artifact cache
//!
//! Artifacts are MP3 files on disk keyed by canonical phrase ID or content
//! hash. Entries are write-once: a hit always returns the original artifact.
//! An age-based janitor evicts stale artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::Result;
use crate::db::{MessagingPrefs, VoiceGender};

/// A cached synthesis artifact
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub filename: String,
    pub engine: String,
    pub bytes: usize,
    pub latency_ms: u64,
    pub created_at: SystemTime,
}

/// In-process artifact cache backed by files on disk
pub struct SpeechCache {
    dir: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SpeechCache {
    /// Create a cache rooted at `dir`
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Directory holding the audio artifacts
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up an entry whose artifact still exists on disk
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if self.dir.join(&entry.filename).exists() {
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Store an artifact; an existing live entry wins (write-once)
    ///
    /// # Errors
    ///
    /// Returns error if the artifact cannot be written
    pub async fn put(
        &self,
        key: &str,
        audio: &[u8],
        engine: &str,
        latency_ms: u64,
    ) -> Result<CacheEntry> {
        if let Some(existing) = self.get(key).await {
            return Ok(existing);
        }

        let filename = format!("{key}.mp3");
        tokio::fs::write(self.dir.join(&filename), audio).await?;

        let entry = CacheEntry {
            filename,
            engine: engine.to_string(),
            bytes: audio.len(),
            latency_ms,
            created_at: SystemTime::now(),
        };

        self.entries
            .write()
            .await
            .insert(key.to_string(), entry.clone());

        Ok(entry)
    }

    /// Remove entries and artifacts older than `max_age`
    ///
    /// Returns the number of artifacts removed.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = self.entries.write().await;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, e)| {
                now.duration_since(e.created_at)
                    .is_ok_and(|age| age > max_age)
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in stale {
            if let Some(entry) = entries.remove(&key) {
                let path = self.dir.join(&entry.filename);
                if tokio::fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
            }
        }
        drop(entries);

        // Orphaned files from a previous run age out by mtime
        if let Ok(mut dir) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(file)) = dir.next_entry().await {
                let Ok(meta) = file.metadata().await else {
                    continue;
                };
                let stale = meta
                    .modified()
                    .ok()
                    .and_then(|m| now.duration_since(m).ok())
                    .is_some_and(|age| age > max_age);
                if stale && tokio::fs::remove_file(file.path()).await.is_ok() {
                    removed += 1;
                }
            }
        }

        removed
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Content-addressed cache key for dynamic text
///
/// The voice parameters are part of the key so a preference change never
/// serves audio in the wrong voice.
#[must_use]
pub fn content_key(text: &str, prefs: &MessagingPrefs) -> String {
    let gender = match prefs.voice_gender {
        VoiceGender::Female => "f",
        VoiceGender::Male => "m",
    };

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(gender.as_bytes());
    hasher.update(prefs.speech_rate_wpm.to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}
