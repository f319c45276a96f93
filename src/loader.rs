use crate::error::ViewerError;
use crate::scene::SceneAsset;
use anyhow::{Context, Result};
use log::{debug, error, info};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

const READ_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Rounded percentage, or `None` while the total size is unknown.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => {
                let pct = (self.loaded as f64 / total as f64 * 100.0).round();
                Some(pct.clamp(0.0, 100.0) as u8)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Loaded(SceneAsset),
    Failed(ViewerError),
}

impl LoadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::Progress(_))
    }
}

/// Reads and parses one model on a background thread. Events are drained between frames.
pub struct AssetLoader {
    path: PathBuf,
    rx: Receiver<LoadEvent>,
    finished: bool,
}

impl AssetLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        let builder = thread::Builder::new().name("model-loader".to_string());
        // A failed spawn drops the sender, which drain_events reports as a failure.
        if let Err(err) = builder.spawn(move || run_load(&worker_path, &tx)) {
            error!("[loader] failed to spawn loader thread: {err:?}");
        }
        info!("[loader] loading {}", path.display());
        Self { path, rx, finished: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pending events in arrival order. Exactly one terminal event is ever returned; a worker
    /// that vanishes without one is reported as a failure.
    pub fn drain_events(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    events.push(event);
                    if terminal {
                        self.finished = true;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(LoadEvent::Failed(ViewerError::asset_load(
                        &self.path,
                        "loader stopped before reporting a result",
                    )));
                    break;
                }
            }
        }
        events
    }
}

fn run_load(path: &Path, tx: &Sender<LoadEvent>) {
    let event = match read_with_progress(path, tx).and_then(|bytes| parse_scene(path, &bytes)) {
        Ok(scene) => {
            debug!("[loader] parsed {} nodes from {}", scene.len(), path.display());
            LoadEvent::Loaded(scene)
        }
        Err(err) => LoadEvent::Failed(ViewerError::asset_load(path, format!("{err:#}"))),
    };
    let _ = tx.send(event);
}

fn read_with_progress(path: &Path, tx: &Sender<LoadEvent>) -> Result<Vec<u8>> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let total = file.metadata().ok().map(|meta| meta.len());
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = file.read(&mut chunk).with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        let _ = tx.send(LoadEvent::Progress(LoadProgress { loaded: bytes.len() as u64, total }));
    }
    Ok(bytes)
}

fn parse_scene(path: &Path, bytes: &[u8]) -> Result<SceneAsset> {
    let gltf = gltf::Gltf::from_slice(bytes).with_context(|| format!("Failed to parse glTF {}", path.display()))?;
    SceneAsset::from_document(&gltf.document).with_context(|| format!("Unusable scene in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_handles_unknown_total() {
        assert_eq!(LoadProgress { loaded: 1, total: Some(3) }.percent(), Some(33));
        assert_eq!(LoadProgress { loaded: 2, total: Some(3) }.percent(), Some(67));
        assert_eq!(LoadProgress { loaded: 10, total: None }.percent(), None);
        assert_eq!(LoadProgress { loaded: 0, total: Some(0) }.percent(), None);
    }
}
