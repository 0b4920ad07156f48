//! Session flow tests with in-memory parsing and generation backends.
//!
//! No pdfium and no network: the fakes below stand in for both external
//! capabilities so every state transition can be checked exactly.

use async_trait::async_trait;
use edgequake_pdf2study::error::{EXTRACTION_FAILED_MESSAGE, REQUEST_FAILED_MESSAGE};
use edgequake_pdf2study::{
    DocumentError, DocumentHandle, DocumentParser, ExtractionProgressCallback, FlowOutcome,
    GenerateRequest, GenerateResponse, GenerationClient, GenerationMode, PageText, ParsedDocument,
    RequestError, StudyConfig, StudyError, StudySession,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready};

// ── Fakes ────────────────────────────────────────────────────────────────────

type PageSpec = Result<Vec<&'static str>, &'static str>;

/// Parser whose documents are a fixed list of pages; `Err` pages fail.
#[derive(Clone, Default)]
struct FakeParser {
    pages: Vec<PageSpec>,
    fail_open: bool,
    page_delay: Duration,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl FakeParser {
    fn with_pages(pages: Vec<PageSpec>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }
}

struct FakeDocument {
    parser: FakeParser,
}

#[async_trait]
impl DocumentParser for FakeParser {
    async fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn ParsedDocument>, DocumentError> {
        if self.fail_open {
            return Err(DocumentError::CorruptPdf {
                detail: "xref table missing".into(),
            });
        }
        Ok(Box::new(FakeDocument {
            parser: self.clone(),
        }))
    }
}

#[async_trait]
impl ParsedDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.parser.pages.len()
    }

    async fn page_text(&self, page_num: usize) -> Result<PageText, DocumentError> {
        self.parser.requested.lock().unwrap().push(page_num);
        if !self.parser.page_delay.is_zero() {
            tokio::time::sleep(self.parser.page_delay).await;
        }
        match &self.parser.pages[page_num - 1] {
            Ok(items) => Ok(PageText::new(
                page_num,
                items.iter().map(|s| s.to_string()).collect(),
            )),
            Err(detail) => Err(DocumentError::PageTextFailed {
                page: page_num,
                detail: detail.to_string(),
            }),
        }
    }
}

/// Client that answers from a script keyed by request text.
#[derive(Default)]
struct FakeClient {
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl GenerationClient for FakeClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match request.text.as_str() {
            "abc" if request.mode == GenerationMode::Quiz => Ok(GenerateResponse {
                quiz: Some("Q1?".into()),
                ..Default::default()
            }),
            "everything" => Ok(GenerateResponse {
                summary: Some("S".into()),
                quiz: Some("Q".into()),
                assignments: Some("A".into()),
            }),
            "summary only" => Ok(GenerateResponse {
                summary: Some("just a summary".into()),
                ..Default::default()
            }),
            "rate" => Err(RequestError::Service {
                status: 429,
                detail: Some("rate limited".into()),
            }),
            "garbage" => Err(RequestError::Service {
                status: 502,
                detail: None,
            }),
            "offline" => Err(RequestError::Transport("connection refused".into())),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(GenerateResponse {
                    summary: Some("summary of slow".into()),
                    ..Default::default()
                })
            }
            "slow failure" => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err(RequestError::Transport("late failure".into()))
            }
            "slower" => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(GenerateResponse {
                    summary: Some("summary of slower".into()),
                    ..Default::default()
                })
            }
            other => Ok(GenerateResponse {
                summary: Some(format!("summary of {other}")),
                ..Default::default()
            }),
        }
    }
}

fn session_with(parser: FakeParser, client: Arc<FakeClient>) -> StudySession {
    StudySession::with_backends(StudyConfig::default(), Arc::new(parser), client)
}

fn pdf() -> DocumentHandle {
    DocumentHandle::from_bytes("lecture.pdf", b"%PDF-1.7".to_vec())
}

// ── Extraction pipeline ──────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_document_extracts_in_order() {
    let parser = FakeParser::with_pages(vec![Ok(vec!["Hello", "World"]), Ok(vec!["Foo"])]);
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());

    let outcome = session.extract().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.text, "Hello World\n\nFoo\n\n");
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn every_page_contributes_one_block_in_ascending_order() {
    let parser = FakeParser::with_pages(vec![
        Ok(vec!["one"]),
        Ok(vec![]),
        Ok(vec!["three", "3"]),
        Ok(vec!["four\n\nwith breaks"]),
        Ok(vec!["five"]),
    ]);
    let requested = Arc::clone(&parser.requested);
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());

    session.extract().await.unwrap();

    assert_eq!(*requested.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(
        session.state().text,
        "one\n\n\n\nthree 3\n\nfour\n\nwith breaks\n\nfive\n\n"
    );
}

#[tokio::test]
async fn zero_page_document_is_an_empty_buffer() {
    let session = session_with(FakeParser::with_pages(vec![]), Arc::new(FakeClient::default()));
    session.select_document(pdf());
    session.set_text("left over");

    let outcome = session.extract().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.text, "");
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn failing_page_publishes_nothing_and_stops_reading() {
    let parser = FakeParser::with_pages(vec![
        Ok(vec!["fine"]),
        Err("broken content stream"),
        Ok(vec!["never read"]),
    ]);
    let requested = Arc::clone(&parser.requested);
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());
    session.set_text("typed by hand");

    let outcome = session.extract().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Failed(EXTRACTION_FAILED_MESSAGE.into()));
    let state = session.state();
    assert_eq!(state.text, "typed by hand");
    assert_eq!(state.error.as_deref(), Some(EXTRACTION_FAILED_MESSAGE));
    assert!(!state.loading);
    assert_eq!(*requested.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn open_failure_surfaces_generic_message() {
    let parser = FakeParser {
        fail_open: true,
        ..FakeParser::default()
    };
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());

    let outcome = session.extract().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Failed(EXTRACTION_FAILED_MESSAGE.into()));
    let error = session.state().error.unwrap();
    assert!(!error.contains("xref"), "cause must not leak: {error}");
}

#[tokio::test]
async fn unreadable_file_is_an_extraction_failure() {
    let session = session_with(
        FakeParser::with_pages(vec![Ok(vec!["x"])]),
        Arc::new(FakeClient::default()),
    );
    session.select_document(DocumentHandle::from_path("/definitely/not/here.pdf"));

    let outcome = session.extract().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Failed(EXTRACTION_FAILED_MESSAGE.into()));
    assert!(!session.state().loading);
}

#[tokio::test]
async fn extract_without_document_changes_nothing() {
    let session = session_with(
        FakeParser::with_pages(vec![Ok(vec!["x"])]),
        Arc::new(FakeClient::default()),
    );
    session.set_text("draft");
    let before = serde_json::to_value(session.state()).unwrap();

    let err = session.extract().await.unwrap_err();

    assert!(matches!(err, StudyError::NoDocumentSelected));
    assert_eq!(serde_json::to_value(session.state()).unwrap(), before);
}

#[tokio::test]
async fn extraction_clears_previous_results_and_error() {
    let client = Arc::new(FakeClient::default());
    let session = session_with(
        FakeParser::with_pages(vec![Err("bad page")]),
        Arc::clone(&client),
    );
    session.select_document(pdf());
    session.set_text("everything");
    session.generate().await.unwrap();
    assert!(!session.state().results.is_empty());

    session.extract().await.unwrap();

    let state = session.state();
    assert!(state.results.is_empty());
    assert_eq!(state.error.as_deref(), Some(EXTRACTION_FAILED_MESSAGE));
    assert_eq!(state.text, "everything");
}

#[tokio::test]
async fn selecting_a_document_resets_the_session() {
    let session = session_with(
        FakeParser::with_pages(vec![Ok(vec!["x"])]),
        Arc::new(FakeClient::default()),
    );
    session.set_text("rate");
    session.generate().await.unwrap();
    assert!(session.state().error.is_some());

    session.select_document(pdf());

    let state = session.state();
    assert_eq!(state.document.map(|d| d.name()).as_deref(), Some("lecture.pdf"));
    assert_eq!(state.text, "");
    assert!(state.results.is_empty());
    assert_eq!(state.error, None);
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for RecordingProgress {
    fn on_extraction_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_len: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("page {page_num}/{total_pages} {text_len}"));
    }

    fn on_extraction_complete(&self, total_pages: usize, total_chars: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {total_pages} {total_chars}"));
    }
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let progress = Arc::new(RecordingProgress::default());
    let config = StudyConfig::builder()
        .progress_callback(Arc::clone(&progress) as Arc<dyn ExtractionProgressCallback>)
        .build()
        .unwrap();
    let parser = FakeParser::with_pages(vec![Ok(vec!["Hello", "World"]), Ok(vec!["Foo"])]);
    let session =
        StudySession::with_backends(config, Arc::new(parser), Arc::new(FakeClient::default()));
    session.select_document(pdf());

    session.extract().await.unwrap();

    assert_eq!(
        *progress.events.lock().unwrap(),
        vec!["start 2", "page 1/2 11", "page 2/2 3", "done 2 18"]
    );
}

// ── Generation request flow ──────────────────────────────────────────────────

#[tokio::test]
async fn quiz_mode_scenario() {
    let client = Arc::new(FakeClient::default());
    let session = session_with(FakeParser::default(), Arc::clone(&client));
    session.set_text("abc");
    session.set_mode(GenerationMode::Quiz);

    let outcome = session.generate().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.results.summary, "");
    assert_eq!(state.results.quiz, "Q1?");
    assert_eq!(state.results.assignments, "");
    assert_eq!(
        client.requests.lock().unwrap()[0],
        GenerateRequest {
            text: "abc".into(),
            mode: GenerationMode::Quiz
        }
    );
}

#[tokio::test]
async fn blank_text_is_rejected_without_a_request() {
    let client = Arc::new(FakeClient::default());
    let session = session_with(FakeParser::default(), Arc::clone(&client));

    for text in ["", "   ", "\n\n\t "] {
        session.set_text(text);
        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, StudyError::EmptyText), "text {text:?}");
    }

    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(!session.state().loading);
}

#[tokio::test]
async fn rejected_generation_still_clears_results_and_error() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("everything");
    session.generate().await.unwrap();
    session.set_text("rate");
    session.generate().await.unwrap();
    assert!(session.state().error.is_some());

    session.set_text(" ");
    assert!(session.generate().await.is_err());

    let state = session.state();
    assert!(state.results.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn missing_fields_reset_previous_results() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("everything");
    session.generate().await.unwrap();
    assert_eq!(session.state().results.quiz, "Q");

    session.set_text("summary only");
    session.generate().await.unwrap();

    let results = session.state().results;
    assert_eq!(results.summary, "just a summary");
    assert_eq!(results.quiz, "");
    assert_eq!(results.assignments, "");
}

#[tokio::test]
async fn service_detail_becomes_the_error() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("rate");

    let outcome = session.generate().await.unwrap();

    assert_eq!(outcome, FlowOutcome::Failed("rate limited".into()));
    let state = session.state();
    assert_eq!(state.error.as_deref(), Some("rate limited"));
    assert!(!state.loading);
    assert!(state.results.is_empty());
}

#[tokio::test]
async fn service_failure_without_detail_uses_fallback() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("garbage");

    session.generate().await.unwrap();

    assert_eq!(session.state().error.as_deref(), Some(REQUEST_FAILED_MESSAGE));
}

#[tokio::test]
async fn transport_failure_message_is_published() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("offline");

    session.generate().await.unwrap();

    assert_eq!(session.state().error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn loading_flag_tracks_the_request() {
    let gate = Arc::new(Notify::new());
    let client = Arc::new(FakeClient {
        gate: Some(Arc::clone(&gate)),
        ..FakeClient::default()
    });
    let session = session_with(FakeParser::default(), client);
    session.set_text("everything");

    let mut generate = tokio_test::task::spawn(session.generate());
    assert_pending!(generate.poll());
    assert!(session.state().loading);

    gate.notify_one();
    let outcome = assert_ready!(generate.poll());

    assert_eq!(outcome.unwrap(), FlowOutcome::Completed);
    assert!(!session.state().loading);
}

// ── Stale completions ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn late_generation_cannot_overwrite_a_newer_one() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("slow");

    let first = session.generate();
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.set_text("fast");
        session.generate().await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), FlowOutcome::Superseded);
    assert_eq!(second.unwrap(), FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.results.summary, "summary of fast");
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn late_failure_leaves_the_newer_flow_in_flight() {
    let session = session_with(FakeParser::default(), Arc::new(FakeClient::default()));
    session.set_text("slow failure");

    let first = session.generate();
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.set_text("slower");
        session.generate().await
    };
    let probe = async {
        // first has finished, second has not
        tokio::time::sleep(Duration::from_millis(150)).await;
        session.state()
    };
    let (first, second, mid) = tokio::join!(first, second, probe);

    assert_eq!(first.unwrap(), FlowOutcome::Superseded);
    assert!(mid.loading);
    assert_eq!(mid.error, None);

    assert_eq!(second.unwrap(), FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.results.summary, "summary of slower");
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn new_document_supersedes_running_extraction() {
    let parser = FakeParser {
        pages: vec![Ok(vec!["old"]), Ok(vec!["document"])],
        page_delay: Duration::from_millis(50),
        ..FakeParser::default()
    };
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());

    let extraction = session.extract();
    let reselect = async {
        tokio::time::sleep(Duration::from_millis(60)).await;
        session.select_document(DocumentHandle::from_bytes("other.pdf", b"%PDF".to_vec()));
    };
    let (outcome, ()) = tokio::join!(extraction, reselect);

    assert_eq!(outcome.unwrap(), FlowOutcome::Superseded);
    let state = session.state();
    assert_eq!(state.text, "");
    assert!(!state.loading);
    assert_eq!(state.document.map(|d| d.name()).as_deref(), Some("other.pdf"));
}

// ── Overlapping flows of different kinds ─────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn generation_during_extraction_keeps_the_extracted_text() {
    let parser = FakeParser {
        pages: vec![Ok(vec!["fresh"])],
        page_delay: Duration::from_millis(100),
        ..FakeParser::default()
    };
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());
    session.set_text("old text");

    let extraction = session.extract();
    let generation = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let outcome = session.generate().await;
        (outcome, session.state())
    };
    let (extracted, (generated, mid)) = tokio::join!(extraction, generation);

    assert_eq!(generated.unwrap(), FlowOutcome::Completed);
    assert_eq!(mid.results.summary, "summary of old text");
    assert!(mid.loading, "extraction still running");

    assert_eq!(extracted.unwrap(), FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.text, "fresh\n\n");
    assert_eq!(state.results.summary, "summary of old text");
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn extraction_during_generation_keeps_the_results() {
    let parser = FakeParser::with_pages(vec![Ok(vec!["fresh"])]);
    let session = session_with(parser, Arc::new(FakeClient::default()));
    session.select_document(pdf());
    session.set_text("slow");

    let generation = session.generate();
    let extraction = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let outcome = session.extract().await;
        (outcome, session.state())
    };
    let (generated, (extracted, mid)) = tokio::join!(generation, extraction);

    assert_eq!(extracted.unwrap(), FlowOutcome::Completed);
    assert_eq!(mid.text, "fresh\n\n");
    assert!(mid.loading, "generation still running");

    assert_eq!(generated.unwrap(), FlowOutcome::Completed);
    let state = session.state();
    assert_eq!(state.results.summary, "summary of slow");
    assert_eq!(state.text, "fresh\n\n");
    assert!(!state.loading);
}
