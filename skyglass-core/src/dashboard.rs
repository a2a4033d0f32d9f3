//! The dashboard view: the one piece of shared mutable state.
//!
//! Every resolution cycle replaces the whole [`DashboardView`] through a
//! `watch` channel, so subscribers never observe a half-updated bundle. A
//! result is dropped once a newer cycle has already published a bundle. A
//! failed search publishes nothing, so it never cancels an older cycle.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

use crate::{error::PipelineError, model::WeatherBundle, pipeline::Pipeline, sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Idle,
    Resolving,
    Succeeded,
    SampleSubstituted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub bundle: Arc<WeatherBundle>,
    pub state: ResolutionState,
    /// Latest user-facing error; may describe a failed search while an older
    /// bundle stays displayed.
    pub message: Option<String>,
}

/// Ticket bookkeeping for the cycles started on one dashboard.
#[derive(Debug, Default)]
struct Cycles {
    issued: u64,
    published: u64,
    in_flight: usize,
    /// Newest failed search, kept until a newer bundle lands.
    failure: Option<(u64, String)>,
}

impl Cycles {
    fn settled_state(&self, bundle: &WeatherBundle) -> ResolutionState {
        if self.in_flight > 0 {
            ResolutionState::Resolving
        } else if self.published == 0 {
            ResolutionState::Idle
        } else if bundle.is_sample {
            ResolutionState::SampleSubstituted
        } else {
            ResolutionState::Succeeded
        }
    }

    /// Failure message that is newer than `ticket`, if any.
    fn failure_after(&self, ticket: u64) -> Option<String> {
        self.failure
            .as_ref()
            .filter(|(failed, _)| *failed > ticket)
            .map(|(_, message)| message.clone())
    }
}

#[derive(Debug)]
pub struct Dashboard {
    pipeline: Pipeline,
    view: watch::Sender<DashboardView>,
    cycles: Mutex<Cycles>,
}

impl Dashboard {
    /// Starts `Idle`, showing the sample bundle until the first cycle lands.
    pub fn new(pipeline: Pipeline) -> Self {
        let initial = DashboardView {
            bundle: Arc::new(sample::bundle(None, None)),
            state: ResolutionState::Idle,
            message: None,
        };
        let (view, _) = watch::channel(initial);

        Self {
            pipeline,
            view,
            cycles: Mutex::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    /// Automatic path; always ends with a renderable bundle.
    pub async fn refresh(&self) -> DashboardView {
        let ticket = self.begin();
        let bundle = self.pipeline.resolve_or_sample().await;

        self.land(ticket, bundle);
        self.view()
    }

    /// Manual search. On failure the displayed bundle is kept and only the
    /// message changes.
    pub async fn search(&self, query: &str) -> Result<DashboardView, PipelineError> {
        let ticket = self.begin();

        match self.pipeline.search(query).await {
            Ok(bundle) => {
                self.land(ticket, bundle);
                Ok(self.view())
            }
            Err(e) => {
                self.fail(ticket, &e);
                Err(e)
            }
        }
    }

    fn cycles(&self) -> MutexGuard<'_, Cycles> {
        self.cycles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> u64 {
        let mut cycles = self.cycles();
        cycles.issued += 1;
        cycles.in_flight += 1;

        self.view
            .send_modify(|view| view.state = ResolutionState::Resolving);
        cycles.issued
    }

    fn land(&self, ticket: u64, bundle: WeatherBundle) {
        let mut cycles = self.cycles();
        cycles.in_flight = cycles.in_flight.saturating_sub(1);

        if ticket <= cycles.published {
            debug!("Discarding result of superseded cycle {}", ticket);
            self.view
                .send_modify(|view| view.state = cycles.settled_state(&view.bundle));
            return;
        }

        cycles.published = ticket;
        let pending_failure = cycles.failure_after(ticket);
        if pending_failure.is_none() {
            cycles.failure = None;
        }

        let state = cycles.settled_state(&bundle);
        let message = bundle.error.clone().or(pending_failure);
        self.view.send_replace(DashboardView {
            bundle: Arc::new(bundle),
            state,
            message,
        });
    }

    fn fail(&self, ticket: u64, error: &PipelineError) {
        let mut cycles = self.cycles();
        cycles.in_flight = cycles.in_flight.saturating_sub(1);

        let current = ticket == cycles.issued;
        let message = error.to_string();
        if current {
            cycles.failure = Some((ticket, message.clone()));
        } else {
            debug!("Ignoring failure of superseded search {}", ticket);
        }

        self.view.send_modify(|view| {
            view.state = cycles.settled_state(&view.bundle);
            if current {
                view.message = Some(message);
            }
        });
    }
}
