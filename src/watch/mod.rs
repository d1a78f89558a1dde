//! Change notification routing.
//!
//! A [`ChangeNotifier`] delivers raw create/modify/delete notifications
//! for any path. A [`ChangeWatcher`] subscribes to one, keeps only table
//! files under its root folder, and forwards them to its three handlers.
//! The watcher does no I/O of its own.

pub mod fs;

use crate::store::is_table_file;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use fs::FsNotifier;

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A file appeared.
    Created,
    /// A file's contents changed.
    Modified,
    /// A file went away.
    Deleted,
}

impl ChangeKind {
    /// All kinds, in subscription order.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted];
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Callback receiving the changed path.
pub type ChangeHandler = Box<dyn FnMut(&Path)>;

/// Source of change notifications.
pub trait ChangeNotifier {
    /// Register `handler` for `kind` notifications.
    fn subscribe(&mut self, kind: ChangeKind, handler: ChangeHandler) -> SubscriptionToken;

    /// Drop a subscription. Returns whether it was active.
    fn unsubscribe(&mut self, token: SubscriptionToken) -> bool;
}

struct Subscription {
    token: SubscriptionToken,
    kind: ChangeKind,
    handler: ChangeHandler,
}

/// In-process notifier. Handlers run synchronously inside [`EventBus::emit`].
#[derive(Default)]
pub struct EventBus {
    next_token: u64,
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a notification to every handler subscribed to `kind`.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&mut self, kind: ChangeKind, path: &Path) -> usize {
        let mut delivered = 0;
        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (subscription.handler)(path);
            delivered += 1;
        }
        delivered
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl ChangeNotifier for EventBus {
    fn subscribe(&mut self, kind: ChangeKind, handler: ChangeHandler) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.push(Subscription {
            token,
            kind,
            handler,
        });
        token
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.token != token);
        self.subscriptions.len() != before
    }
}

/// The three callbacks a [`ChangeWatcher`] dispatches to.
pub struct WatchHandlers {
    /// Called for created table files.
    pub on_create: ChangeHandler,
    /// Called for modified table files.
    pub on_modify: ChangeHandler,
    /// Called for deleted table files.
    pub on_delete: ChangeHandler,
}

impl WatchHandlers {
    fn handler_mut(&mut self, kind: ChangeKind) -> &mut ChangeHandler {
        match kind {
            ChangeKind::Created => &mut self.on_create,
            ChangeKind::Modified => &mut self.on_modify,
            ChangeKind::Deleted => &mut self.on_delete,
        }
    }
}

/// Whether a notification for `path` concerns the table folder `root`.
///
/// Matches `.json` paths at or below `root`. The comparison is per path
/// component, so a trailing separator on either side makes no difference
/// and `root-other/` never matches `root/`. Notifiers only report files.
pub fn is_watched(root: &Path, path: &Path) -> bool {
    is_table_file(path) && path.starts_with(root)
}

/// Filters notifications down to table files under a root folder.
pub struct ChangeWatcher {
    root: PathBuf,
    handlers: Rc<RefCell<WatchHandlers>>,
    tokens: Vec<SubscriptionToken>,
}

impl ChangeWatcher {
    /// Create a stopped watcher for `root`.
    pub fn new(root: impl Into<PathBuf>, handlers: WatchHandlers) -> Self {
        Self {
            root: root.into(),
            handlers: Rc::new(RefCell::new(handlers)),
            tokens: Vec::new(),
        }
    }

    /// Root folder being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the watcher holds subscriptions.
    pub fn is_running(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Subscribe to all three change kinds. No-op while running.
    pub fn start(&mut self, notifier: &mut dyn ChangeNotifier) {
        if self.is_running() {
            return;
        }
        for kind in ChangeKind::ALL {
            let root = self.root.clone();
            let handlers = Rc::clone(&self.handlers);
            let token = notifier.subscribe(
                kind,
                Box::new(move |path: &Path| {
                    if is_watched(&root, path) {
                        log::debug!("{:?}: {}", kind, path.display());
                        (handlers.borrow_mut().handler_mut(kind))(path);
                    }
                }),
            );
            self.tokens.push(token);
        }
        log::debug!("Watching {}", self.root.display());
    }

    /// Release every subscription. Safe to call repeatedly.
    pub fn stop(&mut self, notifier: &mut dyn ChangeNotifier) {
        for token in self.tokens.drain(..) {
            notifier.unsubscribe(token);
        }
    }
}
