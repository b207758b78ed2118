//! Live quiz state extraction.
//!
//! The quiz client keeps its render state in a page-global object; every
//! question is answered against a fresh snapshot of it plus the currently
//! rendered option elements. Snapshots are never reused across questions.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::EngineError;
use crate::page::PageDriver;

/// One rendered answer option.
///
/// `index` is the option's DOM slot (`#rqAnswerOption{index}`), not its
/// position in the snapshot vector: slots can be missing, so the two
/// numberings diverge on degraded pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub index: u32,
    #[serde(default)]
    pub data_option: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl QuizOption {
    /// Locator for this option's DOM slot.
    pub fn selector(&self) -> String {
        format!("#rqAnswerOption{}", self.index)
    }
}

/// Per-question snapshot of the quiz client state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizState {
    pub max_questions: u32,
    #[serde(default)]
    pub correctly_answered_count: u32,
    pub number_of_options: u32,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<QuizOption>,
}

impl QuizState {
    pub fn remaining_questions(&self) -> u32 {
        self.max_questions
            .saturating_sub(self.correctly_answered_count)
    }
}

/// Read the current quiz snapshot from the live page.
pub async fn fetch_quiz_state(page: &dyn PageDriver) -> Result<QuizState, EngineError> {
    let script = r#"
        (function() {
            const info = window._w && window._w.rewardsQuizRenderInfo;
            if (!info) return null;
            const options = [];
            for (let i = 0; i < info.numberOfOptions; i++) {
                const el = document.getElementById('rqAnswerOption' + i);
                if (!el) continue;
                options.push({
                    index: i,
                    dataOption: el.getAttribute('data-option') || '',
                    isCorrect: (el.getAttribute('iscorrectoption') || '').toLowerCase() === 'true'
                });
            }
            return {
                maxQuestions: info.maxQuestions,
                correctlyAnsweredCount: info.CorrectlyAnsweredQuestionCount
                    || info.correctlyAnsweredQuestionCount || 0,
                numberOfOptions: info.numberOfOptions,
                correctAnswer: info.correctAnswer || '',
                options: options
            };
        })()
    "#;

    let value = page.execute_js(script).await?;
    if value.is_null() {
        return Err(EngineError::QuizStateUnavailable(
            "quiz render info not present on page".into(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| EngineError::QuizStateUnavailable(format!("malformed quiz state: {}", e)))
}

/// Wait for the answer-processed UI change after a submission click.
///
/// Absence of the signal within `timeout` is fatal for the current
/// activity; the caller must abort rather than retry indefinitely.
pub async fn wait_for_refresh(
    page: &dyn PageDriver,
    timeout: Duration,
) -> Result<(), EngineError> {
    let script = r#"
        (function() {
            const credits = document.querySelector('span.rqMCredits');
            const answered = document.querySelector('#rqAnsweredSlide, .rqQuestionState');
            return !!(credits || answered);
        })()
    "#;

    // Runtime clock, so tests driving a paused clock time out virtually
    let start = tokio::time::Instant::now();
    loop {
        if let Ok(Value::Bool(true)) = page.execute_js(script).await {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(EngineError::RefreshSignalMissing(format!(
                "no refresh within {}ms",
                timeout.as_millis()
            )));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mock::MockPage;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_parses_snapshot() {
        let page = MockPage::new();
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![json!({
                "maxQuestions": 3,
                "correctlyAnsweredCount": 1,
                "numberOfOptions": 4,
                "correctAnswer": "tok_b",
                "options": [
                    { "index": 0, "dataOption": "tok_a", "isCorrect": false },
                    { "index": 1, "dataOption": "tok_b", "isCorrect": true }
                ]
            })],
        )
        .await;

        let state = fetch_quiz_state(page.as_ref()).await.unwrap();
        assert_eq!(state.max_questions, 3);
        assert_eq!(state.remaining_questions(), 2);
        assert_eq!(state.correct_answer, "tok_b");
        assert_eq!(state.options.len(), 2);
        assert_eq!(state.options[1].selector(), "#rqAnswerOption1");
    }

    #[tokio::test]
    async fn test_missing_option_slots_keep_dom_indices() {
        let page = MockPage::new();
        // Slot 1 never rendered; the snapshot skips it but the remaining
        // options still carry their real DOM slots
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![json!({
                "maxQuestions": 1,
                "correctlyAnsweredCount": 0,
                "numberOfOptions": 3,
                "correctAnswer": "tok_c",
                "options": [
                    { "index": 0, "dataOption": "tok_a", "isCorrect": false },
                    { "index": 2, "dataOption": "tok_c", "isCorrect": true }
                ]
            })],
        )
        .await;

        let state = fetch_quiz_state(page.as_ref()).await.unwrap();
        let correct = state
            .options
            .iter()
            .find(|opt| opt.data_option == state.correct_answer)
            .unwrap();
        assert_eq!(correct.selector(), "#rqAnswerOption2");
    }

    #[tokio::test]
    async fn test_fetch_errors_when_absent() {
        let page = MockPage::new();
        let err = fetch_quiz_state(page.as_ref()).await.unwrap_err();
        assert!(matches!(err, EngineError::QuizStateUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timeout_is_fatal() {
        let page = MockPage::new();
        // Script keeps answering false
        page.set_default_js(json!(false)).await;

        let started = tokio::time::Instant::now();
        let err = wait_for_refresh(page.as_ref(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RefreshSignalMissing(_)));
        // The deadline is tracked on the runtime clock: under a paused
        // clock the wait ends after the timeout plus at most one poll
        assert!(started.elapsed() <= Duration::from_millis(2_600));
    }

    #[tokio::test]
    async fn test_refresh_observed() {
        let page = MockPage::new();
        page.on_js("rqMCredits", vec![json!(true)]).await;
        wait_for_refresh(page.as_ref(), Duration::from_secs(2))
            .await
            .unwrap();
    }
}
