//! Store task: the single owner of the cache state

use super::{OperationKind, StoreEvent, StoreSnapshot, TaskId};
use crate::error::{Error, Result, TransportError};
use crate::model::{PhotoRecord, RawLikeResponse, RawPhotoPayload};
use crate::notifier::ChangeNotifier;
use crate::request::RequestFactory;
use crate::traits::{DateParser, Transport, execute_json};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Requests sent by [`PhotoStoreHandle`](super::PhotoStoreHandle)
pub(super) enum Command {
    FetchNextPage,
    ToggleLike {
        photo_id: String,
        like: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<StoreSnapshot>,
    },
    Shutdown,
}

/// Results sent back by network workers
enum Completion {
    Page {
        task: TaskId,
        page: u32,
        result: std::result::Result<Vec<RawPhotoPayload>, TransportError>,
    },
    Like {
        task: TaskId,
        photo_id: String,
        result: std::result::Result<RawLikeResponse, TransportError>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// The operation occupying the single in-flight slot
struct InFlight {
    id: TaskId,
    kind: OperationKind,
    handle: JoinHandle<()>,
}

pub(super) struct StoreTask {
    transport: Arc<dyn Transport>,
    notifier: ChangeNotifier,
    dates: Arc<dyn DateParser>,
    requests: RequestFactory,
    per_page: u32,
    event_tx: mpsc::Sender<StoreEvent>,

    /// Cached photos, server order
    items: Vec<PhotoRecord>,

    /// `None` until the first page loads, then +1 per loaded page
    last_loaded_page: Option<u32>,

    in_flight: Option<InFlight>,

    /// Likes pushed out of the slot by a newer like; still running
    superseded: Vec<InFlight>,

    next_task_id: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
}

impl StoreTask {
    pub(super) fn new(
        transport: Arc<dyn Transport>,
        notifier: ChangeNotifier,
        dates: Arc<dyn DateParser>,
        requests: RequestFactory,
        per_page: u32,
        event_tx: mpsc::Sender<StoreEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            transport,
            notifier,
            dates,
            requests,
            per_page,
            event_tx,
            items: Vec::new(),
            last_loaded_page: None,
            in_flight: None,
            superseded: Vec::new(),
            next_task_id: 0,
            completion_tx,
            completion_rx: Some(completion_rx),
        }
    }

    /// Main loop
    ///
    /// Runs until a shutdown command arrives or every handle is dropped.
    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let Some(mut completions) = self.completion_rx.take() else {
            error!("Photo store started twice, refusing to run");
            return;
        };

        info!("Photo store started ({})", self.requests.base_url());

        loop {
            tokio::select! {
                // Commands first: a cancel issued before a completion is
                // observed must win over that completion.
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All store handles dropped");
                        break;
                    }
                },

                Some(completion) = completions.recv() => self.handle_completion(completion),
            }
        }

        if let Some(op) = self.in_flight.take() {
            debug!("Aborting in-flight {} {}", op.kind, op.id);
            op.handle.abort();
        }

        for op in self.superseded.drain(..) {
            if !op.handle.is_finished() {
                debug!("Aborting superseded {} {}", op.kind, op.id);
                op.handle.abort();
            }
        }

        self.emit_event(StoreEvent::Stopped);
        info!("Photo store stopped with {} photo(s) cached", self.items.len());
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::FetchNextPage => self.fetch_next_page(),
            Command::ToggleLike {
                photo_id,
                like,
                reply,
            } => self.toggle_like(photo_id, like, reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Page { task, page, result } => self.on_page_completed(task, page, result),
            Completion::Like {
                task,
                photo_id,
                result,
                reply,
            } => self.on_like_completed(task, photo_id, result, reply),
        }
    }

    fn fetch_next_page(&mut self) {
        if let Some(op) = &self.in_flight {
            debug!("{} {} in flight, ignoring fetch request", op.kind, op.id);
            let kind = op.kind;
            self.emit_event(StoreEvent::FetchSkipped { in_flight: kind });
            return;
        }

        let page = self.last_loaded_page.unwrap_or(0) + 1;

        let request = match self.requests.page_request(page, self.per_page) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to build request for page {}: {}", page, e);
                return;
            }
        };

        let id = self.next_task_id();
        debug!("Fetching page {} as {}: {}", page, id, request);

        let transport = Arc::clone(&self.transport);
        let completions = self.completion_tx.clone();
        let handle = tokio::spawn(async move {
            let result = execute_json::<Vec<RawPhotoPayload>>(&*transport, request).await;
            let _ = completions.send(Completion::Page {
                task: id,
                page,
                result,
            });
        });

        // Messages are handled one at a time, so the slot is registered
        // before this worker's completion can be observed.
        self.in_flight = Some(InFlight {
            id,
            kind: OperationKind::Fetch,
            handle,
        });
    }

    fn on_page_completed(
        &mut self,
        task: TaskId,
        page: u32,
        result: std::result::Result<Vec<RawPhotoPayload>, TransportError>,
    ) {
        if !self.is_current(task) {
            debug!("Dropping stale completion for page {} from {}", page, task);
            self.emit_event(StoreEvent::StaleCompletionDropped { task });
            return;
        }

        match result {
            Ok(payloads) => {
                let loaded = self.last_loaded_page.map_or(1, |last| last + 1);
                self.last_loaded_page = Some(loaded);

                let count = payloads.len();
                let dates = Arc::clone(&self.dates);
                self.items.extend(
                    payloads
                        .into_iter()
                        .map(|payload| PhotoRecord::from_payload(payload, &*dates)),
                );

                info!("Loaded page {} ({} photo(s), {} cached)", loaded, count, self.items.len());
                self.notifier.publish();
                self.emit_event(StoreEvent::PageLoaded {
                    page: loaded,
                    count,
                });
            }
            Err(e) => {
                error!("Failed to load page {}: {}", page, e);
                self.emit_event(StoreEvent::PageFailed {
                    page,
                    error: e.to_string(),
                });
            }
        }

        // Reopen the gate only once the visible state is consistent
        self.in_flight = None;
    }

    fn toggle_like(&mut self, photo_id: String, like: bool, reply: oneshot::Sender<Result<()>>) {
        if let Some(fetch) = self
            .in_flight
            .take_if(|op| op.kind == OperationKind::Fetch)
        {
            info!("Cancelling {} in favour of like toggle on {}", fetch.id, photo_id);
            fetch.handle.abort();
            self.emit_event(StoreEvent::FetchCancelled { task: fetch.id });
        }

        let request = match self.requests.like_request(&photo_id, like) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to build like request for {}: {}", photo_id, e);
                self.emit_event(StoreEvent::LikeFailed {
                    photo_id,
                    error: e.to_string(),
                });
                let _ = reply.send(Err(e));
                return;
            }
        };

        let id = self.next_task_id();
        debug!("Changing like on {} as {}: {}", photo_id, id, request);

        let transport = Arc::clone(&self.transport);
        let completions = self.completion_tx.clone();
        let handle = tokio::spawn(async move {
            let result = execute_json::<RawLikeResponse>(&*transport, request).await;
            let _ = completions.send(Completion::Like {
                task: id,
                photo_id,
                result,
                reply,
            });
        });

        let previous = self.in_flight.replace(InFlight {
            id,
            kind: OperationKind::Like,
            handle,
        });
        if let Some(previous) = previous {
            debug!("{} supersedes {} {} in the in-flight slot", id, previous.kind, previous.id);
            self.superseded.retain(|op| !op.handle.is_finished());
            self.superseded.push(previous);
        }
    }

    fn on_like_completed(
        &mut self,
        task: TaskId,
        photo_id: String,
        result: std::result::Result<RawLikeResponse, TransportError>,
        reply: oneshot::Sender<Result<()>>,
    ) {
        let outcome = match result {
            // The confirmation body is not consulted: the cached value is
            // inverted relative to what it was at lookup time.
            Ok(_confirmation) => match self.items.iter().position(|p| p.id == photo_id) {
                Some(index) => {
                    let updated = self.items[index].with_like_toggled();
                    let is_liked = updated.is_liked;
                    self.items[index] = updated;

                    info!("Photo {} is_liked -> {}", photo_id, is_liked);
                    self.emit_event(StoreEvent::LikeChanged {
                        photo_id: photo_id.clone(),
                        is_liked,
                    });
                    Ok(())
                }
                None => {
                    warn!("Like confirmed for {} but it is not cached", photo_id);
                    Err(Error::not_found(photo_id.clone()))
                }
            },
            Err(e) => {
                warn!("Failed to change like for {}: {}", photo_id, e);
                Err(Error::Transport(e))
            }
        };

        if let Err(e) = &outcome {
            self.emit_event(StoreEvent::LikeFailed {
                photo_id: photo_id.clone(),
                error: e.to_string(),
            });
        }

        if self.is_current(task) {
            self.in_flight = None;
        } else {
            self.superseded.retain(|op| op.id != task);
        }

        if reply.send(outcome).is_err() {
            debug!("Caller for like on {} went away", photo_id);
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            photos: self.items.clone(),
            last_loaded_page: self.last_loaded_page,
            in_flight: self.in_flight.as_ref().map(|op| op.kind),
        }
    }

    fn is_current(&self, task: TaskId) -> bool {
        self.in_flight.as_ref().is_some_and(|op| op.id == task)
    }

    fn next_task_id(&mut self) -> TaskId {
        self.next_task_id += 1;
        TaskId(self.next_task_id)
    }

    fn emit_event(&self, event: StoreEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
