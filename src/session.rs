//! The session: one state container driving both flows.
//!
//! ```text
//!                 ┌──────────── select_document / set_text / set_mode
//!                 ▼
//!   Idle ──extract()/generate()──▶ InFlight ──┬─▶ Success ─┐
//!    ▲                                        └─▶ Failed  ──┴─▶ Idle
//!    └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both flows share the `loading` flag and the `error` field of
//! [`SessionState`]. State lives in a `tokio::sync::watch` channel, so a
//! presentation layer can [`StudySession::subscribe`] and redraw on change.
//!
//! ## Stale completions
//!
//! Flows are not cancelled. If a second flow starts while the first is still
//! suspended, both run to completion. Each flow kind (extraction, generation)
//! keeps its own ticket counter; a flow takes a ticket when it begins and may
//! only publish while its ticket is still the newest of its kind. Selecting a
//! document advances both counters. A flow that finishes late returns
//! [`FlowOutcome::Superseded`] and touches nothing.
//!
//! An extraction and a generation running side by side do not supersede each
//! other: each publishes its own fields, and `loading` stays raised until
//! neither is in flight.

use crate::config::{GenerationMode, StudyConfig};
use crate::error::{StudyError, EXTRACTION_FAILED_MESSAGE};
use crate::extract::extract_document_text;
use crate::output::ResultSet;
use crate::pipeline::document::{DocumentParser, ParsedDocument};
use crate::pipeline::generate::{GenerateRequest, GenerationClient, HttpGenerationClient};
use crate::pipeline::input::DocumentHandle;
use crate::pipeline::pdfium::PdfiumParser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    /// The selected document, if any.
    #[serde(serialize_with = "serialize_document")]
    pub document: Option<DocumentHandle>,
    /// The extracted (or user-edited) text buffer.
    pub text: String,
    pub mode: GenerationMode,
    pub results: ResultSet,
    /// True while any current flow is suspended awaiting external completion.
    pub loading: bool,
    /// Outcome message of the most recent failed flow.
    pub error: Option<String>,
    #[serde(skip)]
    extraction: FlowSlot,
    #[serde(skip)]
    generation: FlowSlot,
}

impl SessionState {
    fn slot_mut(&mut self, flow: Flow) -> &mut FlowSlot {
        match flow {
            Flow::Extraction => &mut self.extraction,
            Flow::Generation => &mut self.generation,
        }
    }

    fn refresh_loading(&mut self) {
        self.loading = self.extraction.in_flight || self.generation.in_flight;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Extraction,
    Generation,
}

impl Flow {
    fn label(self) -> &'static str {
        match self {
            Flow::Extraction => "Extraction",
            Flow::Generation => "Generation",
        }
    }
}

/// Newest ticket issued for one flow kind, and whether its holder still runs.
#[derive(Debug, Clone, Copy, Default)]
struct FlowSlot {
    ticket: u64,
    in_flight: bool,
}

fn serialize_document<S: serde::Serializer>(
    document: &Option<DocumentHandle>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match document {
        Some(handle) => serializer.serialize_some(&handle.name()),
        None => serializer.serialize_none(),
    }
}

/// How a flow that passed its precondition ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Results were published.
    Completed,
    /// The flow failed; the message was published as the session error.
    Failed(String),
    /// A newer flow started meanwhile; nothing was published.
    Superseded,
}

/// Drives the extraction pipeline and the generation request flow.
pub struct StudySession {
    state: watch::Sender<SessionState>,
    parser: Arc<dyn DocumentParser>,
    client: Arc<dyn GenerationClient>,
    config: StudyConfig,
}

impl StudySession {
    /// A session backed by pdfium and an HTTP client for `config.endpoint`.
    pub fn new(config: StudyConfig) -> Result<Self, StudyError> {
        let parser = Arc::new(PdfiumParser::new(
            config.password.clone(),
            config.pdfium_library.clone(),
        ));
        let client = Arc::new(HttpGenerationClient::new(
            config.endpoint.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        )?);
        Ok(Self::with_backends(config, parser, client))
    }

    /// A session with caller-supplied parsing and generation backends.
    pub fn with_backends(
        config: StudyConfig,
        parser: Arc<dyn DocumentParser>,
        client: Arc<dyn GenerationClient>,
    ) -> Self {
        let initial = SessionState {
            mode: config.mode,
            ..SessionState::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            state,
            parser,
            client,
            config,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Select a new document.
    ///
    /// Clears the text buffer, results and error, and supersedes any flow
    /// still in flight.
    pub fn select_document(&self, handle: DocumentHandle) {
        info!("Selected document: {}", handle.name());
        self.state.send_modify(|s| {
            for flow in [Flow::Extraction, Flow::Generation] {
                let slot = s.slot_mut(flow);
                slot.ticket += 1;
                slot.in_flight = false;
            }
            s.document = Some(handle);
            s.text.clear();
            s.results = ResultSet::default();
            s.error = None;
            s.loading = false;
        });
    }

    /// Replace the text buffer (the user edited it).
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.text = text);
    }

    pub fn set_mode(&self, mode: GenerationMode) {
        self.state.send_modify(|s| s.mode = mode);
    }

    /// Run the extraction pipeline on the selected document.
    ///
    /// # Errors
    /// [`StudyError::NoDocumentSelected`] when nothing is selected; the state
    /// is left untouched. Every other failure is published to the session
    /// and reported as [`FlowOutcome::Failed`].
    pub async fn extract(&self) -> Result<FlowOutcome, StudyError> {
        let handle = self
            .state
            .borrow()
            .document
            .clone()
            .ok_or(StudyError::NoDocumentSelected)?;

        let ticket = self.begin(Flow::Extraction, |s| {
            s.results = ResultSet::default();
        });
        info!("Extraction #{} started: {}", ticket, handle.name());

        let result = async {
            let bytes = handle.load(self.config.download_timeout_secs).await?;
            let document: Arc<dyn ParsedDocument> = Arc::from(self.parser.open(bytes).await?);
            extract_document_text(document, self.config.progress_callback.as_ref()).await
        }
        .await;

        match result {
            Ok(text) => {
                let chars = text.len();
                if self.commit(Flow::Extraction, ticket, |s| s.text = text) {
                    info!("Extraction #{} complete: {} chars", ticket, chars);
                    Ok(FlowOutcome::Completed)
                } else {
                    Ok(self.superseded(Flow::Extraction, ticket))
                }
            }
            Err(e) => {
                error!("Extraction #{} failed: {}", ticket, e);
                let message = EXTRACTION_FAILED_MESSAGE.to_string();
                let published = message.clone();
                if self.commit(Flow::Extraction, ticket, |s| s.error = Some(published)) {
                    Ok(FlowOutcome::Failed(message))
                } else {
                    Ok(self.superseded(Flow::Extraction, ticket))
                }
            }
        }
    }

    /// Send the text buffer and mode to the generation service.
    ///
    /// Results and error are cleared first, on every attempt.
    ///
    /// # Errors
    /// [`StudyError::EmptyText`] when the buffer is empty or whitespace-only;
    /// no request is sent. Every other failure is published to the session
    /// and reported as [`FlowOutcome::Failed`].
    pub async fn generate(&self) -> Result<FlowOutcome, StudyError> {
        let mut request = None;
        self.state.send_modify(|s| {
            s.results = ResultSet::default();
            s.error = None;
            if !s.text.trim().is_empty() {
                request = Some(GenerateRequest {
                    text: s.text.clone(),
                    mode: s.mode,
                });
            }
        });
        let request = request.ok_or(StudyError::EmptyText)?;

        let ticket = self.begin(Flow::Generation, |_| {});
        info!(
            "Generation #{} started: mode={}, {} chars",
            ticket,
            request.mode,
            request.text.len()
        );

        match self.client.generate(&request).await {
            Ok(response) => {
                let results = ResultSet::from(response);
                if self.commit(Flow::Generation, ticket, |s| s.results = results) {
                    info!("Generation #{} complete", ticket);
                    Ok(FlowOutcome::Completed)
                } else {
                    Ok(self.superseded(Flow::Generation, ticket))
                }
            }
            Err(e) => {
                error!("Generation #{} failed: {}", ticket, e);
                let message = e.user_message();
                let published = message.clone();
                if self.commit(Flow::Generation, ticket, |s| s.error = Some(published)) {
                    Ok(FlowOutcome::Failed(message))
                } else {
                    Ok(self.superseded(Flow::Generation, ticket))
                }
            }
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Enter `InFlight`: take a fresh ticket for `flow`, raise `loading`,
    /// clear the error, then apply `reset`.
    fn begin(&self, flow: Flow, reset: impl FnOnce(&mut SessionState)) -> u64 {
        let mut ticket = 0;
        self.state.send_modify(|s| {
            let slot = s.slot_mut(flow);
            slot.ticket += 1;
            slot.in_flight = true;
            ticket = slot.ticket;
            s.loading = true;
            s.error = None;
            reset(s);
        });
        ticket
    }

    /// Publish `apply` if `ticket` is still the newest of its flow, then drop
    /// `loading` unless the other flow is still running.
    fn commit(&self, flow: Flow, ticket: u64, apply: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|s| {
            let slot = s.slot_mut(flow);
            if slot.ticket != ticket {
                return false;
            }
            slot.in_flight = false;
            apply(s);
            s.refresh_loading();
            true
        })
    }

    fn superseded(&self, flow: Flow, ticket: u64) -> FlowOutcome {
        warn!(
            "{} #{} finished after a newer operation; result discarded",
            flow.label(),
            ticket
        );
        FlowOutcome::Superseded
    }
}
