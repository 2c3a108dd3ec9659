use crate::models::IndexProgress;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Notifications sent to the host while a book is indexed.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    Started { total_pages: usize, rebuild: bool },
    PageIndexed { path: String },
    PageSkipped { path: String, reason: String },
    Committed { pages: usize },
}

/// Progress of the current indexing pass, plus an optional event channel.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    progress: Arc<Mutex<IndexProgress>>,
    observer: Arc<Mutex<Option<Sender<IndexEvent>>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route future events to `sender`. A closed receiver silently detaches.
    pub fn subscribe(&self, sender: Sender<IndexEvent>) {
        if let Ok(mut observer) = self.observer.lock() {
            *observer = Some(sender);
        }
    }

    pub fn start(&self, total_pages: usize, rebuild: bool) {
        if let Ok(mut progress) = self.progress.lock() {
            *progress = IndexProgress {
                total_pages,
                status: "indexing".to_string(),
                ..IndexProgress::default()
            };
        }
        self.emit(IndexEvent::Started { total_pages, rebuild });
    }

    pub fn page_indexed(&self, path: &str) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.processed_pages += 1;
            progress.current_page = Some(path.to_string());
        }
        self.emit(IndexEvent::PageIndexed {
            path: path.to_string(),
        });
    }

    pub fn page_skipped(&self, path: &str, reason: String) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.skipped_pages += 1;
            progress.current_page = Some(path.to_string());
            progress.warnings.push(format!("{}: {}", path, reason));
        }
        self.emit(IndexEvent::PageSkipped {
            path: path.to_string(),
            reason,
        });
    }

    pub fn committed(&self) {
        let pages = match self.progress.lock() {
            Ok(mut progress) => {
                progress.current_page = None;
                progress.status = "completed".to_string();
                progress.processed_pages
            }
            Err(_) => 0,
        };
        self.emit(IndexEvent::Committed { pages });
    }

    /// Snapshot of the current pass.
    pub fn get(&self) -> IndexProgress {
        self.progress
            .lock()
            .map(|progress| progress.clone())
            .unwrap_or_default()
    }

    fn emit(&self, event: IndexEvent) {
        if let Ok(mut observer) = self.observer.lock() {
            if let Some(sender) = observer.as_ref() {
                if sender.send(event).is_err() {
                    log::debug!("Index observer disconnected");
                    *observer = None;
                }
            }
        }
    }
}
