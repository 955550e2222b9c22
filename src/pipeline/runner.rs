//! Orchestrator: drives capture → correct → rewrite on a single task.
//!
//! [`Orchestrator`] owns the [`CaptureGate`] and responds to [`InputEvent`]s
//! received over a `tokio::sync::mpsc` channel.
//!
//! # Flow
//!
//! ```text
//! InputEvent::Key ──▶ gate.on_key ──sentence──▶ correction job   [CorrectionRequested]
//! inactivity deadline ──▶ gate.on_timer ──┘          │
//!                                                    ├─ Success, differs ─▶ gate.pause()
//!                                                    │      └─▶ rewrite job + settle  [Rewriting]
//!                                                    │             └─▶ gate.resume()  [Idle]
//!                                                    └─ anything else ─────────────▶ [Idle]
//! ```
//!
//! Only one job (correction or rewrite) exists at a time.  A sentence that
//! completes while a job is running waits in a single pending slot; a newer
//! one replaces it.  Keystrokes from two rewrites therefore never interleave.
//!
//! Corrections and rewrites run as futures polled by the `select!` loop, so
//! key intake continues while they are in flight.  Dropping the loop (on
//! [`InputEvent::Shutdown`]) cancels the retry loop and any pending timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::capture::{CaptureGate, KeyInputAccumulator, Sentence};
use crate::config::AppConfig;
use crate::keyboard::{InputEvent, KeyEvent};
use crate::rewrite::{InputRewriter, RewriteError, SinkFactory};
use crate::service::{CorrectionClient, CorrectionOutcome};

use super::state::SentenceStage;

// ---------------------------------------------------------------------------
// OrchestratorEvent
// ---------------------------------------------------------------------------

/// Notifications emitted, in order, for observers of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    SentenceCaptured(String),
    CorrectionApplied { original: String, corrected: String },
    NoCorrectionNeeded(String),
    ServiceUnavailable,
    ServiceError { message: String },
    RewriteFailed { message: String },
    CapturePaused,
    CaptureResumed,
    AutoCorrectToggled { enabled: bool },
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

enum JobDone {
    Corrected {
        sentence: Sentence,
        outcome: CorrectionOutcome,
    },
    Rewritten {
        original: String,
        corrected: String,
        result: Result<(), RewriteError>,
    },
}

type Job = Pin<Box<dyn Future<Output = JobDone> + Send>>;

/// Resolves with the running job's result; never resolves without one.
async fn poll_job(job: &mut Option<Job>) -> JobDone {
    match job {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// `true` when `corrected` is worth typing over `original`: non-blank and
/// different ignoring case.
///
/// ```
/// use text_pilot::pipeline::needs_rewrite;
///
/// assert!(needs_rewrite("Yo echo de menos.", "Yo hecho de menos."));
/// assert!(!needs_rewrite("hola.", "Hola."));
/// assert!(!needs_rewrite("hola.", "  "));
/// ```
pub fn needs_rewrite(original: &str, corrected: &str) -> bool {
    !corrected.trim().is_empty() && original.to_lowercase() != corrected.to_lowercase()
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    gate: CaptureGate,
    client: Arc<CorrectionClient>,
    rewriter: Arc<InputRewriter>,
    /// Pause kept after a rewrite so the target app catches up.
    settle: Duration,
    enabled: bool,
    stage: SentenceStage,
    pending: Option<Sentence>,
    events: Option<mpsc::UnboundedSender<OrchestratorEvent>>,
}

impl Orchestrator {
    pub fn new(
        gate: CaptureGate,
        client: Arc<CorrectionClient>,
        rewriter: Arc<InputRewriter>,
        settle: Duration,
    ) -> Self {
        Self {
            gate,
            client,
            rewriter,
            settle,
            enabled: true,
            stage: SentenceStage::Idle,
            pending: None,
            events: None,
        }
    }

    /// Build every component from `config`; `sink` provides the synthetic
    /// input backend.
    pub fn from_config(config: &AppConfig, sink: SinkFactory) -> Self {
        let gate = CaptureGate::new(KeyInputAccumulator::new(
            config.capture.debounce(),
            &config.capture.terminators,
        ));
        let client = Arc::new(CorrectionClient::from_config(&config.service));
        let rewriter = Arc::new(InputRewriter::from_config(sink, &config.rewrite));

        let mut orchestrator = Self::new(gate, client, rewriter, config.rewrite.settle());
        orchestrator.set_enabled(config.capture.start_enabled);
        orchestrator
    }

    /// Switch automatic correction on or off before [`run`](Self::run).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stage(&self) -> SentenceStage {
        self.stage
    }

    /// Receive [`OrchestratorEvent`]s.  Only the latest subscriber is served.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OrchestratorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until [`InputEvent::Shutdown`] arrives or `input` is closed.
    ///
    /// On `Shutdown` everything in flight is dropped.  On a closed channel
    /// the partial sentence is discarded, but the running job and the
    /// pending sentence are finished first.
    pub async fn run(mut self, mut input: mpsc::Receiver<InputEvent>) {
        let mut job: Option<Job> = None;
        let mut input_open = true;

        log::info!(
            "pipeline: orchestrator started (auto-correct {})",
            if self.enabled { "on" } else { "off" }
        );

        loop {
            if !input_open && job.is_none() {
                match self.pending.take() {
                    Some(sentence) => job = Some(self.start_correction(sentence)),
                    None => break,
                }
            }

            let deadline = self.gate.deadline();

            tokio::select! {
                biased;

                event = input.recv(), if input_open => match event {
                    Some(InputEvent::Key(key)) => self.handle_key(&key, &mut job),
                    Some(InputEvent::ToggleAutoCorrect) => self.toggle(),
                    Some(InputEvent::Shutdown) => {
                        log::info!("pipeline: shutdown requested");
                        break;
                    }
                    None => {
                        log::info!("pipeline: input channel closed, finishing in-flight work");
                        input_open = false;
                        self.gate.discard();
                    }
                },

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    if let Some(sentence) = self.gate.on_timer(Instant::now()) {
                        self.submit(sentence, &mut job);
                    }
                }

                done = poll_job(&mut job), if job.is_some() => {
                    job = None;
                    self.handle_done(done, &mut job);
                }
            }
        }

        self.gate.discard();
        self.pending = None;
        log::info!("pipeline: orchestrator stopped");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn handle_key(&mut self, key: &KeyEvent, job: &mut Option<Job>) {
        if !self.enabled {
            return;
        }
        if let Some(sentence) = self.gate.on_key(key) {
            self.submit(sentence, job);
        }
    }

    fn toggle(&mut self) {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.gate.discard();
        }
        log::info!(
            "pipeline: auto-correct {}",
            if self.enabled { "enabled" } else { "disabled" }
        );
        self.emit(OrchestratorEvent::AutoCorrectToggled {
            enabled: self.enabled,
        });
    }

    fn submit(&mut self, sentence: Sentence, job: &mut Option<Job>) {
        log::debug!("pipeline: sentence received: {:?}", sentence.text);
        self.emit(OrchestratorEvent::SentenceCaptured(sentence.text.clone()));

        // The stage is only Idle while no job is running.
        if self.stage.is_busy() {
            if let Some(old) = self.pending.replace(sentence) {
                log::debug!("pipeline: pending sentence superseded: {:?}", old.text);
            }
            return;
        }

        self.set_stage(SentenceStage::Received);
        *job = Some(self.start_correction(sentence));
    }

    fn handle_done(&mut self, done: JobDone, job: &mut Option<Job>) {
        match done {
            JobDone::Corrected { sentence, outcome } => {
                self.handle_correction(sentence, outcome, job)
            }
            JobDone::Rewritten {
                original,
                corrected,
                result,
            } => {
                match result {
                    Ok(()) => {
                        log::info!("pipeline: corrected {:?} → {:?}", original, corrected);
                        self.emit(OrchestratorEvent::CorrectionApplied {
                            original,
                            corrected,
                        });
                    }
                    Err(e) => {
                        log::warn!(
                            "pipeline: rewrite failed, input may be partially corrected: {e}"
                        );
                        self.emit(OrchestratorEvent::RewriteFailed {
                            message: e.to_string(),
                        });
                    }
                }
                // Resume even after a failure, or capture would stall.
                self.gate.resume(Instant::now());
                self.emit(OrchestratorEvent::CaptureResumed);
                self.set_stage(SentenceStage::Idle);
            }
        }

        if job.is_none() {
            if let Some(next) = self.pending.take() {
                self.set_stage(SentenceStage::Received);
                *job = Some(self.start_correction(next));
            }
        }
    }

    fn handle_correction(
        &mut self,
        sentence: Sentence,
        outcome: CorrectionOutcome,
        job: &mut Option<Job>,
    ) {
        match outcome {
            CorrectionOutcome::Success(corrected) => {
                self.set_stage(SentenceStage::CorrectionSucceeded);
                if !self.enabled {
                    log::debug!("pipeline: auto-correct off, dropping correction");
                } else if needs_rewrite(&sentence.text, &corrected) {
                    self.gate.pause();
                    self.emit(OrchestratorEvent::CapturePaused);
                    *job = Some(self.start_rewrite(sentence, corrected));
                    return;
                } else {
                    log::debug!("pipeline: no correction needed for {:?}", sentence.text);
                    self.emit(OrchestratorEvent::NoCorrectionNeeded(sentence.text));
                }
            }
            CorrectionOutcome::Loading | CorrectionOutcome::ConnectionError => {
                self.set_stage(SentenceStage::CorrectionFailed);
                log::warn!("pipeline: service unavailable, sentence left as typed");
                self.emit(OrchestratorEvent::ServiceUnavailable);
            }
            CorrectionOutcome::ServiceError(message) => {
                self.set_stage(SentenceStage::CorrectionFailed);
                log::error!("pipeline: correction service error: {message}");
                self.emit(OrchestratorEvent::ServiceError { message });
            }
        }
        self.set_stage(SentenceStage::Idle);
    }

    // -----------------------------------------------------------------------
    // Job construction
    // -----------------------------------------------------------------------

    fn start_correction(&mut self, sentence: Sentence) -> Job {
        self.set_stage(SentenceStage::CorrectionRequested);
        let client = Arc::clone(&self.client);
        Box::pin(async move {
            let outcome = client.correct(&sentence.text).await;
            JobDone::Corrected { sentence, outcome }
        })
    }

    fn start_rewrite(&mut self, sentence: Sentence, corrected: String) -> Job {
        self.set_stage(SentenceStage::Rewriting);
        let rewriter = Arc::clone(&self.rewriter);
        let settle = self.settle;
        Box::pin(async move {
            let result = rewriter
                .apply(&sentence.text, &corrected, sentence.trailing)
                .await;
            tokio::time::sleep(settle).await;
            JobDone::Rewritten {
                original: sentence.text,
                corrected,
                result,
            }
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_stage(&mut self, stage: SentenceStage) {
        if self.stage != stage {
            log::trace!("pipeline: {} → {}", self.stage.label(), stage.label());
            self.stage = stage;
        }
    }

    fn emit(&self, event: OrchestratorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyKind;
    use crate::rewrite::SyntheticInputSink;
    use crate::service::{BackendError, BackendReply, CorrectionBackend, RetryPolicy};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const DEBOUNCE: Duration = Duration::from_millis(1500);
    const SETTLE: Duration = Duration::from_millis(100);

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Answers every request with `reply(sentence)` and records the requests.
    struct FnBackend {
        reply: fn(&str) -> Result<BackendReply, BackendError>,
        requests: Mutex<Vec<String>>,
    }

    impl FnBackend {
        fn new(reply: fn(&str) -> Result<BackendReply, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CorrectionBackend for FnBackend {
        async fn request(
            &self,
            sentence: &str,
            _timeout: Duration,
        ) -> Result<BackendReply, BackendError> {
            self.requests.lock().unwrap().push(sentence.to_string());
            (self.reply)(sentence)
        }
    }

    /// Sleeps before fixing "echo", logging each request into the same
    /// log the sink writes to.
    struct SlowFix {
        delay: Duration,
        log: Arc<Mutex<Vec<Op>>>,
    }

    #[async_trait]
    impl CorrectionBackend for SlowFix {
        async fn request(
            &self,
            sentence: &str,
            _timeout: Duration,
        ) -> Result<BackendReply, BackendError> {
            self.log.lock().unwrap().push(Op::Req(sentence.to_string()));
            tokio::time::sleep(self.delay).await;
            fix_echo(sentence)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Req(String),
        Delete,
        Type(String),
    }

    struct RecordingSink {
        ops: Arc<Mutex<Vec<Op>>>,
        fail: bool,
    }

    impl SyntheticInputSink for RecordingSink {
        fn delete(&mut self) -> Result<(), RewriteError> {
            if self.fail {
                return Err(RewriteError::KeySimulation("no target window".into()));
            }
            self.ops.lock().unwrap().push(Op::Delete);
            Ok(())
        }

        fn type_text(&mut self, text: &str) -> Result<(), RewriteError> {
            self.ops.lock().unwrap().push(Op::Type(text.to_string()));
            Ok(())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        backend: Arc<FnBackend>,
        ops: Arc<Mutex<Vec<Op>>>,
        events: mpsc::UnboundedReceiver<OrchestratorEvent>,
    }

    fn orchestrator(
        backend: Arc<dyn CorrectionBackend>,
        ops: Arc<Mutex<Vec<Op>>>,
        sink_fails: bool,
    ) -> Orchestrator {
        let client = Arc::new(CorrectionClient::new(
            backend,
            RetryPolicy::default(),
            Duration::from_secs(60),
        ));

        let factory: SinkFactory = Arc::new(move || {
            Ok(Box::new(RecordingSink {
                ops: ops.clone(),
                fail: sink_fails,
            }) as Box<dyn SyntheticInputSink>)
        });
        let rewriter = Arc::new(InputRewriter::new(factory, Duration::ZERO, false));

        let gate = CaptureGate::new(KeyInputAccumulator::new(DEBOUNCE, ".?!"));
        Orchestrator::new(gate, client, rewriter, SETTLE)
    }

    fn harness(
        reply: fn(&str) -> Result<BackendReply, BackendError>,
        sink_fails: bool,
    ) -> Harness {
        let backend = FnBackend::new(reply);
        let ops = Arc::new(Mutex::new(Vec::new()));
        let mut orchestrator = orchestrator(backend.clone(), ops.clone(), sink_fails);
        let events = orchestrator.subscribe();

        Harness {
            orchestrator,
            backend,
            ops,
            events,
        }
    }

    /// Orchestrator over a [`SlowFix`] backend; requests and keystrokes share
    /// one log.
    fn slow_harness(
        delay: Duration,
    ) -> (
        Orchestrator,
        Arc<Mutex<Vec<Op>>>,
        mpsc::UnboundedReceiver<OrchestratorEvent>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(SlowFix {
            delay,
            log: log.clone(),
        });
        let mut orchestrator = orchestrator(backend, log.clone(), false);
        let events = orchestrator.subscribe();
        (orchestrator, log, events)
    }

    fn fix_echo(s: &str) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Success(s.replace("echo", "hecho")))
    }

    fn unchanged(s: &str) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Success(s.to_string()))
    }

    fn refused(_: &str) -> Result<BackendReply, BackendError> {
        Err(BackendError::Unreachable("connection refused".into()))
    }

    fn rejected(_: &str) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Error("model crashed".into()))
    }

    async fn type_text(tx: &mpsc::Sender<InputEvent>, text: &str) {
        for c in text.chars() {
            tx.send(InputEvent::Key(KeyEvent::typed(c, Instant::now())))
                .await
                .unwrap();
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn terminated_sentence_is_corrected_in_place() {
        let mut h = harness(fix_echo, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Yo echo de menos.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        let ops = h.ops.lock().unwrap().clone();
        let deletes = ops.iter().filter(|op| **op == Op::Delete).count();
        assert_eq!(deletes, "Yo echo de menos.".chars().count());
        assert_eq!(ops.last(), Some(&Op::Type("Yo hecho de menos.".into())));
        assert_eq!(ops.len(), deletes + 1);

        assert_eq!(
            drain(&mut h.events),
            vec![
                OrchestratorEvent::SentenceCaptured("Yo echo de menos.".into()),
                OrchestratorEvent::CapturePaused,
                OrchestratorEvent::CorrectionApplied {
                    original: "Yo echo de menos.".into(),
                    corrected: "Yo hecho de menos.".into(),
                },
                OrchestratorEvent::CaptureResumed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_service_leaves_input_alone() {
        let mut h = harness(refused, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Hola mundo.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert_eq!(h.backend.requests().len(), 100);
        assert!(h.ops.lock().unwrap().is_empty());

        let events = drain(&mut h.events);
        assert!(events.contains(&OrchestratorEvent::ServiceUnavailable));
        assert!(!events.contains(&OrchestratorEvent::CapturePaused));
    }

    #[tokio::test(start_paused = true)]
    async fn service_error_is_reported() {
        let mut h = harness(rejected, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Hola.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert_eq!(h.backend.requests(), vec!["Hola.".to_string()]);
        assert!(h.ops.lock().unwrap().is_empty());
        assert!(drain(&mut h.events).contains(&OrchestratorEvent::ServiceError {
            message: "model crashed".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_correction_is_not_typed() {
        let mut h = harness(unchanged, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Todo bien.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert!(h.ops.lock().unwrap().is_empty());
        assert!(drain(&mut h.events)
            .contains(&OrchestratorEvent::NoCorrectionNeeded("Todo bien.".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_flushes_after_debounce() {
        let Harness {
            orchestrator,
            backend,
            mut events,
            ..
        } = harness(unchanged, false);
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(orchestrator.run(rx));

        type_text(&tx, "sin punto final ").await;
        tokio::time::sleep(DEBOUNCE - Duration::from_millis(100)).await;
        assert!(backend.requests().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(backend.requests(), vec!["sin punto final".to_string()]);

        drop(tx);
        task.await.unwrap();
        assert_eq!(
            drain(&mut events).first(),
            Some(&OrchestratorEvent::SentenceCaptured("sin punto final".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_discards_partial_sentence() {
        let h = harness(unchanged, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "a medias").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_pending_sentence_survives() {
        let h = harness(unchanged, false);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Uno. Dos. Tres.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert_eq!(
            h.backend.requests(),
            vec!["Uno.".to_string(), "Tres.".to_string()]
        );
    }

    fn rewrite_ops(original: &str, corrected: &str) -> Vec<Op> {
        let mut ops = vec![Op::Delete; original.chars().count()];
        ops.push(Op::Type(corrected.into()));
        ops
    }

    #[tokio::test(start_paused = true)]
    async fn sentence_flushed_mid_correction_waits_for_the_rewrite() {
        let (orchestrator, log, _events) = slow_harness(Duration::from_millis(500));
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(orchestrator.run(rx));

        type_text(&tx, "Te echo.").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        type_text(&tx, " Lo echo.").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        drop(tx);
        task.await.unwrap();

        let mut expected = vec![Op::Req("Te echo.".into())];
        expected.extend(rewrite_ops("Te echo.", "Te hecho."));
        expected.push(Op::Req("Lo echo.".into()));
        expected.extend(rewrite_ops("Lo echo.", "Lo hecho."));
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_from_the_rewrite_window_are_not_captured() {
        let (orchestrator, log, mut events) = slow_harness(Duration::from_millis(500));
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(orchestrator.run(rx));

        // Correction lands at 500 ms; capture stays paused until the settle
        // delay ends at 600 ms.
        type_text(&tx, "Te echo.").await;
        tokio::time::sleep(Duration::from_millis(550)).await;
        let during_rewrite = Instant::now();
        type_text(&tx, "xyz ").await;

        // Same window, but delivered late by the listener.
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(InputEvent::Key(KeyEvent::typed('q', during_rewrite)))
            .await
            .unwrap();

        tokio::time::sleep(DEBOUNCE * 2).await;
        type_text(&tx, "Bien.").await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(tx);
        task.await.unwrap();

        let mut expected = vec![Op::Req("Te echo.".into())];
        expected.extend(rewrite_ops("Te echo.", "Te hecho."));
        expected.push(Op::Req("Bien.".into()));
        assert_eq!(*log.lock().unwrap(), expected);

        let events = drain(&mut events);
        let paused = events
            .iter()
            .position(|e| *e == OrchestratorEvent::CapturePaused)
            .expect("capture paused");
        let resumed = events
            .iter()
            .position(|e| *e == OrchestratorEvent::CaptureResumed)
            .expect("capture resumed");
        assert!(paused < resumed);
        assert!(!events
            .iter()
            .any(|e| matches!(e, OrchestratorEvent::SentenceCaptured(s) if s.contains("xyz"))));
    }

    #[tokio::test(start_paused = true)]
    async fn rewrite_failure_still_resumes_capture() {
        let mut h = harness(fix_echo, true);
        let (tx, rx) = mpsc::channel(256);

        type_text(&tx, "Te echo.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        let events = drain(&mut h.events);
        let failed = events
            .iter()
            .position(|e| matches!(e, OrchestratorEvent::RewriteFailed { .. }))
            .expect("rewrite failure reported");
        assert_eq!(events.get(failed + 1), Some(&OrchestratorEvent::CaptureResumed));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_disables_capture() {
        let mut h = harness(fix_echo, false);
        let (tx, rx) = mpsc::channel(256);

        tx.send(InputEvent::ToggleAutoCorrect).await.unwrap();
        type_text(&tx, "Te echo.").await;
        tx.send(InputEvent::ToggleAutoCorrect).await.unwrap();
        type_text(&tx, "Lo echo.").await;
        drop(tx);
        h.orchestrator.run(rx).await;

        assert_eq!(h.backend.requests(), vec!["Lo echo.".to_string()]);
        let events = drain(&mut h.events);
        assert_eq!(
            events[0],
            OrchestratorEvent::AutoCorrectToggled { enabled: false }
        );
        assert_eq!(
            events[1],
            OrchestratorEvent::AutoCorrectToggled { enabled: true }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_the_retry_loop() {
        let h = harness(refused, false);
        let backend = h.backend.clone();
        let (tx, rx) = mpsc::channel(256);

        let task = tokio::spawn(h.orchestrator.run(rx));
        type_text(&tx, "Hola.").await;
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        tx.send(InputEvent::Shutdown).await.unwrap();
        task.await.unwrap();

        let made = backend.requests().len();
        assert!(made >= 1 && made < 100, "{made} requests");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.requests().len(), made);
    }

    #[tokio::test(start_paused = true)]
    async fn other_keys_keep_the_sentence_open() {
        let h = harness(unchanged, false);
        let backend = h.backend.clone();
        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(h.orchestrator.run(rx));

        type_text(&tx, "hola").await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        tx.send(InputEvent::Key(KeyEvent::press(KeyKind::Other, Instant::now())))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(backend.requests().is_empty());

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(backend.requests(), vec!["hola".to_string()]);

        drop(tx);
        task.await.unwrap();
    }

    #[test]
    fn rewrite_decision_ignores_case() {
        assert!(!needs_rewrite("HOLA", "hola"));
        assert!(needs_rewrite("ola", "hola"));
    }

    #[test]
    fn from_config_respects_start_enabled() {
        let mut config = AppConfig::default();
        config.capture.start_enabled = false;
        let factory: SinkFactory =
            Arc::new(|| Err(RewriteError::Init("unused".into())));
        let o = Orchestrator::from_config(&config, factory);
        assert!(!o.is_enabled());
        assert_eq!(o.stage(), SentenceStage::Idle);
    }
}
