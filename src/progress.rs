// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for cluster calls
//!
//! The client pool reports connection and listing progress on a broadcast
//! channel; the one-shot CLI turns it into spinner messages.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    /// Connecting to a cluster
    Connecting { cluster: String },
    /// Connected to a cluster
    Connected { cluster: String, elapsed_ms: u64 },
    /// Running the discovery API for a non-core kind
    Discovering { cluster: String },
    /// Listing objects of a kind (empty namespace = all namespaces)
    Listing { kind: String, namespace: String },
    /// Listing finished
    Listed {
        kind: String,
        objects: usize,
        elapsed_ms: u64,
    },
}

/// Progress reporter shared by all searches of a pool
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    /// Count of finished list calls
    lists_done: AtomicUsize,
    /// Count of objects returned by finished list calls
    objects_seen: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            lists_done: AtomicUsize::new(0),
            objects_seen: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn connecting(&self, cluster: &str) {
        let _ = self.sender.send(ProgressUpdate::Connecting {
            cluster: cluster.to_string(),
        });
    }

    pub fn connected(&self, cluster: &str, elapsed_ms: u64) {
        let _ = self.sender.send(ProgressUpdate::Connected {
            cluster: cluster.to_string(),
            elapsed_ms,
        });
    }

    pub fn discovering(&self, cluster: &str) {
        let _ = self.sender.send(ProgressUpdate::Discovering {
            cluster: cluster.to_string(),
        });
    }

    pub fn listing(&self, kind: &str, namespace: &str) {
        let _ = self.sender.send(ProgressUpdate::Listing {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
        });
    }

    pub fn listed(&self, kind: &str, objects: usize, elapsed_ms: u64) {
        self.lists_done.fetch_add(1, Ordering::SeqCst);
        self.objects_seen.fetch_add(objects, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::Listed {
            kind: kind.to_string(),
            objects,
            elapsed_ms,
        });
    }

    /// Finished list calls and objects returned so far
    pub fn progress(&self) -> (usize, usize) {
        (
            self.lists_done.load(Ordering::SeqCst),
            self.objects_seen.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
