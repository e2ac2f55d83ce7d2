//! Drives a [`FilterController`] on tokio: one task per session owns the
//! controller, the debounce deadline and the fetch in flight. Commands arrive
//! over an mpsc channel; the render-facing [`ViewState`] is published on a
//! watch channel after every transition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use super::controller::{Completion, Effect, FilterController, FilterEdit, ViewState};
use super::fetcher::{CatalogFetcher, FetchError, bounds_or_fallback};
use super::filters::{FilterKind, QuickFilter};
use crate::catalog::FallbackBounds;
use crate::models::ResultPage;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const COMMAND_BUFFER: usize = 64;

#[derive(Error, Debug)]
#[error("Filter session has shut down")]
pub struct SessionClosed;

#[derive(Debug)]
enum Command {
    Edit(FilterEdit),
    Quick(QuickFilter),
    Remove(FilterKind),
    SetPage(u32),
    ClearAll,
    Retry,
}

/// Handle to a running filter session. Cheap to clone; the session stops when
/// every handle is dropped.
#[derive(Clone)]
pub struct FilterSession {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<ViewState>,
}

impl FilterSession {
    /// Seeds the controller from the live bounds (or `fallback`) and starts the
    /// session with an initial load.
    pub async fn bootstrap(
        fetcher: Arc<dyn CatalogFetcher>,
        fallback: &FallbackBounds,
        page_size: u32,
        debounce: Duration,
    ) -> (Self, JoinHandle<()>) {
        let bounds = bounds_or_fallback(fetcher.as_ref(), fallback).await;
        Self::spawn(fetcher, FilterController::new(bounds, page_size), debounce)
    }

    pub fn spawn(
        fetcher: Arc<dyn CatalogFetcher>,
        controller: FilterController,
        debounce: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (publisher, view) = watch::channel(controller.view());
        let worker = SessionWorker::new(controller, fetcher, debounce, receiver, publisher);
        let handle = tokio::spawn(worker.run());
        (FilterSession { commands, view }, handle)
    }

    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    pub async fn edit(&self, edit: FilterEdit) -> Result<(), SessionClosed> {
        self.send(Command::Edit(edit)).await
    }

    pub async fn quick_filter(&self, quick: QuickFilter) -> Result<(), SessionClosed> {
        self.send(Command::Quick(quick)).await
    }

    pub async fn remove_filter(&self, kind: FilterKind) -> Result<(), SessionClosed> {
        self.send(Command::Remove(kind)).await
    }

    pub async fn set_page(&self, page: u32) -> Result<(), SessionClosed> {
        self.send(Command::SetPage(page)).await
    }

    pub async fn clear_all(&self) -> Result<(), SessionClosed> {
        self.send(Command::ClearAll).await
    }

    pub async fn retry(&self) -> Result<(), SessionClosed> {
        self.send(Command::Retry).await
    }

    async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }
}

struct SessionWorker {
    controller: FilterController,
    fetcher: Arc<dyn CatalogFetcher>,
    debounce: Duration,
    commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<ViewState>,
    deadline: Option<Instant>,
    in_flight: JoinSet<Result<ResultPage, FetchError>>,
    // Request seq of every task still in `in_flight`, aborted ones included
    requests: HashMap<task::Id, u64>,
}

type Joined = Result<(task::Id, Result<ResultPage, FetchError>), JoinError>;

impl SessionWorker {
    fn new(
        controller: FilterController,
        fetcher: Arc<dyn CatalogFetcher>,
        debounce: Duration,
        commands: mpsc::Receiver<Command>,
        publisher: watch::Sender<ViewState>,
    ) -> Self {
        SessionWorker {
            controller,
            fetcher,
            debounce,
            commands,
            publisher,
            deadline: None,
            in_flight: JoinSet::new(),
            requests: HashMap::new(),
        }
    }

    async fn run(mut self) {
        info!("Filter session started");
        let effect = self.controller.load();
        self.perform(effect);
        self.publish();

        loop {
            let deadline = self.deadline;
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    let effect = self.handle(command);
                    self.perform(effect);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    let effect = self.controller.debounce_elapsed();
                    self.perform(effect);
                }
                Some(joined) = self.in_flight.join_next_with_id() => {
                    if !self.settle(joined) {
                        continue;
                    }
                }
            }
            self.publish();
        }

        self.in_flight.abort_all();
        info!("Filter session stopped");
    }

    /// Hands a finished fetch to the controller under the seq it was spawned
    /// with, so a stale task (panicked or not) is discarded there. Returns
    /// whether the view changed.
    fn settle(&mut self, joined: Joined) -> bool {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) if e.is_cancelled() => {
                self.requests.remove(&e.id());
                return false;
            }
            Err(e) => {
                error!("Catalog fetch task panicked: {}", e);
                (e.id(), Err(FetchError::from(e)))
            }
        };
        match self.requests.remove(&id) {
            Some(seq) => self.controller.complete(seq, result) == Completion::Applied,
            None => false,
        }
    }

    fn handle(&mut self, command: Command) -> Effect {
        debug!(?command, phase = ?self.controller.phase(), "Filter session command");
        match command {
            Command::Edit(edit) => self.controller.edit(edit),
            Command::Quick(quick) => self.controller.apply_quick_filter(quick, Utc::now().year()),
            Command::Remove(kind) => self.controller.remove_filter(kind),
            Command::SetPage(page) => self.controller.set_page(page),
            Command::ClearAll => self.controller.clear_all(),
            Command::Retry => self.controller.retry(),
        }
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::Debounce => {
                self.in_flight.abort_all();
                self.deadline = Some(Instant::now() + self.debounce);
            }
            Effect::Fetch(request) => {
                self.in_flight.abort_all();
                self.deadline = None;
                let fetcher = Arc::clone(&self.fetcher);
                let criteria = request.criteria;
                let spawned = self.in_flight.spawn(async move { fetcher.fetch(&criteria).await });
                self.requests.insert(spawned.id(), request.seq);
            }
            Effect::Nothing => {}
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.controller.view());
    }
}
