//! Filesystem-backed change notifier.
//!
//! The `notify` watcher runs its own thread but only queues raw events.
//! Handlers run on whichever thread calls [`FsNotifier::dispatch_pending`]
//! or [`FsNotifier::dispatch_timeout`], so table loading stays on a single
//! thread.

use super::{ChangeHandler, ChangeKind, ChangeNotifier, EventBus, SubscriptionToken};
use crate::error::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Change notifier for a directory tree on the local filesystem.
pub struct FsNotifier {
    bus: EventBus,
    events: Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl FsNotifier {
    /// Start watching `path` recursively.
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(path, RecursiveMode::Recursive)?;
        log::info!("Watching {} for changes", path.display());
        Ok(Self {
            bus: EventBus::new(),
            events,
            _watcher: watcher,
        })
    }

    /// Dispatch every queued event without blocking.
    ///
    /// Returns the number of notifications delivered to the bus.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => delivered += self.dispatch(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }

    /// Wait up to `timeout` for an event, then dispatch everything queued.
    pub fn dispatch_timeout(&mut self, timeout: Duration) -> usize {
        match self.events.recv_timeout(timeout) {
            Ok(event) => self.dispatch(event) + self.dispatch_pending(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn dispatch(&mut self, event: notify::Result<Event>) -> usize {
        match event {
            Ok(event) => classify(&event)
                .into_iter()
                .filter(|(_, path)| !path.is_dir())
                .map(|(kind, path)| {
                    self.bus.emit(kind, &path);
                    1
                })
                .sum(),
            Err(err) => {
                log::warn!("File watcher error: {}", err);
                0
            }
        }
    }
}

impl ChangeNotifier for FsNotifier {
    fn subscribe(&mut self, kind: ChangeKind, handler: ChangeHandler) -> SubscriptionToken {
        self.bus.subscribe(kind, handler)
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.bus.unsubscribe(token)
    }
}

/// Map a raw `notify` event to change notifications.
///
/// Renames become a delete of the old path and a create of the new one.
/// Access and metadata-only events are dropped.
pub fn classify(event: &Event) -> Vec<(ChangeKind, PathBuf)> {
    let all = |kind: ChangeKind| -> Vec<(ChangeKind, PathBuf)> {
        event.paths.iter().map(|p| (kind, p.clone())).collect()
    };

    match &event.kind {
        EventKind::Create(_) => all(ChangeKind::Created),
        EventKind::Remove(_) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::new();
            if let Some(from) = event.paths.first() {
                changes.push((ChangeKind::Deleted, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push((ChangeKind::Created, to.clone()));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                };
                (kind, p.clone())
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => all(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
