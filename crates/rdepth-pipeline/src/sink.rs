// rdepth-pipeline/src/sink.rs
// Persistence collaborator: takes encoded stills, reports completion.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write still image: {0}")]
    Io(#[from] io::Error),
}

/// Which half of a capture a still belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillKind {
    Color,
    Depth,
}

impl StillKind {
    pub fn label(self) -> &'static str {
        match self {
            StillKind::Color => "color",
            StillKind::Depth => "depth",
        }
    }
}

/// Per-call completion hook.  The coordinator's hooks just log the
/// outcome; richer handling is the extension point.
pub type SaveCompletion = Box<dyn FnOnce(Result<(), SinkError>) + Send>;

/// Still-image persistence contract.  `png` is an already-encoded PNG;
/// the sink owns delivery and must invoke `done` exactly once.
pub trait StillSink: Send + Sync {
    fn save(&self, png: Vec<u8>, kind: StillKind, done: SaveCompletion);
}

/// Writes sequence-numbered stills into a directory.
pub struct DirStillSink {
    dir: PathBuf,
    seq: AtomicU64,
}

impl DirStillSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seq: AtomicU64::new(0),
        })
    }
}

impl StillSink for DirStillSink {
    fn save(&self, png: Vec<u8>, kind: StillKind, done: SaveCompletion) {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("{n:05}-{}.png", kind.label()));
        done(fs::write(&path, &png).map_err(SinkError::from));
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Default)]
pub struct MemoryStillSink {
    stills: Mutex<Vec<(StillKind, Vec<u8>)>>,
}

impl MemoryStillSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stills(&self) -> Vec<(StillKind, Vec<u8>)> {
        lock_ignore_poison(&self.stills).clone()
    }

    pub fn count_of(&self, kind: StillKind) -> usize {
        lock_ignore_poison(&self.stills)
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

impl StillSink for MemoryStillSink {
    fn save(&self, png: Vec<u8>, kind: StillKind, done: SaveCompletion) {
        lock_ignore_poison(&self.stills).push((kind, png));
        done(Ok(()));
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
