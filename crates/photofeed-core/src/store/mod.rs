//! Photo store
//!
//! The store is responsible for:
//! - Fetching the photo list page by page
//! - Keeping the cached list and the page cursor consistent
//! - Toggling likes against the backend and patching the cached record
//! - Publishing a change notification when a page lands
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   Command    ┌─────────────┐   spawn    ┌────────────┐
//! │ PhotoStoreHandle │─────────────▶│  StoreTask  │───────────▶│ Transport  │
//! │  (cloneable)     │◀── oneshot ──│ (one task)  │◀───────────│ (worker)   │
//! └──────────────────┘              └─────────────┘ Completion └────────────┘
//!                                          │
//!                          ┌───────────────┴───────────────┐
//!                          ▼                               ▼
//!                  ┌────────────────┐             ┌────────────────┐
//!                  │ ChangeNotifier │             │  StoreEvent    │
//!                  │ (page appends) │             │  (monitoring)  │
//!                  └────────────────┘             └────────────────┘
//! ```
//!
//! ## Threading
//!
//! All cache state lives inside a single tokio task. Handles talk to it over
//! a bounded command channel; network calls run on spawned workers whose
//! results are queued back to the same task. Nothing else can touch the
//! cache, so no locks guard it.
//!
//! ## Single Flight
//!
//! Fetches and like toggles share one in-flight slot:
//! - `fetch_next_page()` is a no-op while anything is in flight
//! - `toggle_like()` cancels an in-flight fetch and takes the slot
//!
//! Cancellation is cooperative. A cancelled worker may still deliver its
//! result; completions carry their task id and are discarded unless that id
//! is still the registered in-flight operation.

mod task;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::PhotoRecord;
use crate::notifier::ChangeNotifier;
use crate::request::RequestFactory;
use crate::traits::{DateParser, Rfc3339DateParser, Transport};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use task::{Command, StoreTask};

/// Identifier of a network operation started by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Kind of operation occupying the in-flight slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Page fetch
    Fetch,
    /// Like toggle
    Like,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Fetch => f.write_str("fetch"),
            OperationKind::Like => f.write_str("like"),
        }
    }
}

/// Events emitted by the store for monitoring
///
/// UI observers should listen on the [`ChangeNotifier`] instead; these
/// events exist for logging, metrics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A page was appended to the cache
    PageLoaded {
        page: u32,
        count: usize,
    },

    /// A page fetch failed; the cursor did not move
    PageFailed {
        page: u32,
        error: String,
    },

    /// `fetch_next_page()` was ignored because the slot was busy
    FetchSkipped {
        in_flight: OperationKind,
    },

    /// An in-flight fetch was cancelled in favour of a like toggle
    FetchCancelled {
        task: TaskId,
    },

    /// A cached record's like state was flipped
    LikeChanged {
        photo_id: String,
        is_liked: bool,
    },

    /// A like toggle failed
    LikeFailed {
        photo_id: String,
        error: String,
    },

    /// A completion arrived for an operation that is no longer current
    StaleCompletionDropped {
        task: TaskId,
    },

    /// Store task stopped
    Stopped,
}

/// Point-in-time copy of the store state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Cached photos in server order
    pub photos: Vec<PhotoRecord>,

    /// Last successfully loaded page (`None` before the first success)
    pub last_loaded_page: Option<u32>,

    /// Operation currently occupying the in-flight slot
    pub in_flight: Option<OperationKind>,
}

/// Photo store builder
///
/// ## Lifecycle
///
/// 1. Create with [`PhotoStore::new()`]
/// 2. Optionally swap the date parser with [`PhotoStore::with_date_parser()`]
/// 3. Start with [`PhotoStore::spawn()`] and keep the returned handle
/// 4. Stop with [`PhotoStoreHandle::shutdown()`] or by dropping every handle
pub struct PhotoStore {
    transport: Arc<dyn Transport>,
    notifier: ChangeNotifier,
    dates: Arc<dyn DateParser>,
    config: StoreConfig,
    event_tx: mpsc::Sender<StoreEvent>,
}

impl PhotoStore {
    /// Create a new photo store
    ///
    /// # Parameters
    ///
    /// - `transport`: Transport used for every API call
    /// - `notifier`: Notifier published to after each page append
    /// - `config`: Store configuration
    ///
    /// # Returns
    ///
    /// A tuple of (store, event_receiver) where event_receiver yields store events
    pub fn new(
        transport: Arc<dyn Transport>,
        notifier: ChangeNotifier,
        config: StoreConfig,
    ) -> Result<(Self, mpsc::Receiver<StoreEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let store = Self {
            transport,
            notifier,
            dates: Arc::new(Rfc3339DateParser),
            config,
            event_tx: tx,
        };

        Ok((store, rx))
    }

    /// Replace the date parser used when mapping payloads
    pub fn with_date_parser(mut self, dates: Arc<dyn DateParser>) -> Self {
        self.dates = dates;
        self
    }

    /// Start the store task
    ///
    /// Must be called from within a tokio runtime. The returned join handle
    /// resolves once the task has stopped.
    pub fn spawn(self) -> (PhotoStoreHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_channel_capacity);
        let notifier = self.notifier.clone();

        let task = StoreTask::new(
            self.transport,
            self.notifier,
            self.dates,
            RequestFactory::new(self.config.base_url),
            self.config.per_page,
            self.event_tx,
        );
        let join = tokio::spawn(task.run(command_rx));

        let handle = PhotoStoreHandle {
            commands: command_tx,
            notifier,
        };

        (handle, join)
    }
}

/// Cloneable handle to a running photo store
///
/// Every method only enqueues a command; the store task processes commands
/// strictly in the order they were sent.
#[derive(Clone)]
pub struct PhotoStoreHandle {
    commands: mpsc::Sender<Command>,
    notifier: ChangeNotifier,
}

impl PhotoStoreHandle {
    /// Request the next page
    ///
    /// Returns once the request is queued. The outcome is reported through
    /// the [`ChangeNotifier`] (success) or the logs (failure). Ignored while
    /// another operation is in flight.
    pub async fn fetch_next_page(&self) -> Result<()> {
        self.send(Command::FetchNextPage).await
    }

    /// Toggle the like state of a cached photo
    ///
    /// `like` selects the request (`POST` when true, `DELETE` when false).
    /// On success the cached record's `is_liked` is inverted relative to its
    /// value at lookup time, whatever `like` was.
    ///
    /// An in-flight fetch is cancelled. An in-flight like is not: a newer
    /// like takes the slot, but the older one still runs, applies its flip
    /// when confirmed and answers its own caller, even if a fetch has
    /// started since. Shutdown aborts both and they resolve with
    /// [`Error::StoreClosed`].
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Backend confirmed and the cached record was replaced
    /// - `Err(Error::NotFound)`: Backend confirmed but the photo is not cached
    /// - `Err(Error::RequestConstruction)`: No request was sent
    /// - `Err(Error::Transport)`: Request failed; cache unchanged
    /// - `Err(Error::StoreClosed)`: Store stopped before answering
    pub async fn toggle_like(&self, photo_id: impl Into<String>, like: bool) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ToggleLike {
            photo_id: photo_id.into(),
            like,
            reply,
        })
        .await?;

        response.await.map_err(|_| Error::StoreClosed)?
    }

    /// Copy of the current store state
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| Error::StoreClosed)
    }

    /// Cached photos in server order
    pub async fn photos(&self) -> Result<Vec<PhotoRecord>> {
        Ok(self.snapshot().await?.photos)
    }

    /// Last successfully loaded page
    pub async fn last_loaded_page(&self) -> Result<Option<u32>> {
        Ok(self.snapshot().await?.last_loaded_page)
    }

    /// Stop the store task
    ///
    /// Any in-flight operation is aborted and pending like toggles resolve
    /// with [`Error::StoreClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Notifier the store publishes to
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Whether the store task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::StoreClosed)
    }
}

impl fmt::Debug for PhotoStoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoStoreHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
