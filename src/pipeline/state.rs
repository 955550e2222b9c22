//! Per-sentence state machine of the orchestrator.

/// Where the sentence currently owned by the orchestrator is.
///
/// ```text
/// Idle ──flush──▶ Received ──▶ CorrectionRequested
///                                 ├──▶ CorrectionSucceeded ──differs──▶ Rewriting ──▶ Idle
///                                 │                        └─same────────────────────▶ Idle
///                                 └──▶ CorrectionFailed ─────────────────────────────▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentenceStage {
    #[default]
    Idle,
    Received,
    CorrectionRequested,
    CorrectionSucceeded,
    CorrectionFailed,
    /// Capture is paused and synthetic keys are being emitted.
    Rewriting,
}

impl SentenceStage {
    /// `true` while a sentence occupies the correction/rewrite slot.
    ///
    /// ```
    /// use text_pilot::pipeline::SentenceStage;
    ///
    /// assert!(!SentenceStage::Idle.is_busy());
    /// assert!(SentenceStage::CorrectionRequested.is_busy());
    /// assert!(SentenceStage::Rewriting.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, SentenceStage::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentenceStage::Idle => "Idle",
            SentenceStage::Received => "Received",
            SentenceStage::CorrectionRequested => "Correcting",
            SentenceStage::CorrectionSucceeded => "Corrected",
            SentenceStage::CorrectionFailed => "Failed",
            SentenceStage::Rewriting => "Rewriting",
        }
    }
}
