//! Standard multi-question quiz protocol.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::state::{fetch_quiz_state, wait_for_refresh};
use super::protocol_click;
use crate::click::ClickExecutor;
use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;

const START_CONTROL: &str = "#rqStartQuiz";
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct QuizProtocol;

impl QuizProtocol {
    /// Drive a quiz from its current state to completion.
    pub async fn run(
        page: &dyn PageDriver,
        executor: &ClickExecutor,
        title: &str,
    ) -> Result<(), EngineError> {
        // A resumed quiz has no start control; its absence is normal
        if page
            .wait_for_selector(START_CONTROL, Duration::from_secs(5))
            .await
            .unwrap_or(false)
        {
            protocol_click(page, executor, START_CONTROL).await?;
            delay::random_delay(1_500, 3_000).await;
        }

        let mut state = fetch_quiz_state(page).await?;
        let question_bound = state.max_questions;

        for question in 0..question_bound {
            if state.remaining_questions() == 0 {
                break;
            }
            debug!(
                "{}: question {}/{} ({} options)",
                title,
                question + 1,
                question_bound,
                state.number_of_options
            );

            match state.number_of_options {
                8 => {
                    // Multi-answer question: every flagged option, each
                    // submission confirmed before the next
                    let correct: Vec<String> = state
                        .options
                        .iter()
                        .filter(|opt| opt.is_correct)
                        .map(|opt| opt.selector())
                        .collect();

                    for selector in correct {
                        protocol_click(page, executor, &selector).await?;
                        wait_for_refresh(page, REFRESH_TIMEOUT).await?;
                        delay::random_delay(800, 2_000).await;
                    }
                }
                2..=4 => {
                    // Click the option's DOM slot, not its snapshot
                    // position: missing slots shift the two apart
                    let option = state
                        .options
                        .iter()
                        .find(|opt| opt.data_option == state.correct_answer)
                        .ok_or_else(|| {
                            EngineError::QuizStateUnavailable(format!(
                                "no option carries the expected answer token for {}",
                                title
                            ))
                        })?;

                    protocol_click(page, executor, &option.selector()).await?;
                    wait_for_refresh(page, REFRESH_TIMEOUT).await?;
                    delay::random_delay(800, 2_000).await;
                }
                other => {
                    warn!("{}: unsupported option count {}, stopping", title, other);
                    break;
                }
            }

            // Fresh snapshot every question; nothing carries over
            state = fetch_quiz_state(page).await?;
        }

        info!("{}: quiz finished", title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mock::MockPage;
    use serde_json::{json, Value};

    fn visible_probe() -> Value {
        json!({ "found": true, "width": 100.0, "height": 30.0, "hidden": false,
                "cx": 50.0, "cy": 15.0 })
    }

    fn single_answer_state(answered: u32) -> Value {
        json!({
            "maxQuestions": 1,
            "correctlyAnsweredCount": answered,
            "numberOfOptions": 2,
            "correctAnswer": "B",
            "options": [
                { "index": 0, "dataOption": "A", "isCorrect": false },
                { "index": 1, "dataOption": "B", "isCorrect": true }
            ]
        })
    }

    fn multi_answer_state(answered: u32) -> Value {
        let mut options = Vec::new();
        for i in 0..8 {
            let flagged = [1, 4, 6].contains(&i);
            options.push(json!({
                "index": i,
                "dataOption": format!("tok{}", i),
                "isCorrect": flagged
            }));
        }
        json!({
            "maxQuestions": 1,
            "correctlyAnsweredCount": answered,
            "numberOfOptions": 8,
            "correctAnswer": "",
            "options": options
        })
    }

    async fn quiz_page() -> std::sync::Arc<MockPage> {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        for i in 0..8 {
            page.add_selector(&format!("#rqAnswerOption{}", i)).await;
        }
        page
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_answer_clicks_exactly_the_correct_option() {
        let page = quiz_page().await;
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![single_answer_state(0), single_answer_state(1)],
        )
        .await;
        page.on_js("rqMCredits", vec![json!(true)]).await;

        QuizProtocol::run(page.as_ref(), &ClickExecutor::default(), "daily quiz")
            .await
            .unwrap();

        // Correct answer 'B' sits at option index 1; exactly one click
        assert_eq!(page.clicks.lock().await.as_slice(), &["#rqAnswerOption1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_option_slot_does_not_shift_the_click_target() {
        let page = quiz_page().await;
        // Slot 1 never rendered; the correct token lives in DOM slot 2
        let state_with_hole = |answered: u32| {
            json!({
                "maxQuestions": 1,
                "correctlyAnsweredCount": answered,
                "numberOfOptions": 3,
                "correctAnswer": "C",
                "options": [
                    { "index": 0, "dataOption": "A", "isCorrect": false },
                    { "index": 2, "dataOption": "C", "isCorrect": true }
                ]
            })
        };
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![state_with_hole(0), state_with_hole(1)],
        )
        .await;
        page.on_js("rqMCredits", vec![json!(true)]).await;

        QuizProtocol::run(page.as_ref(), &ClickExecutor::default(), "sparse quiz")
            .await
            .unwrap();

        assert_eq!(page.clicks.lock().await.as_slice(), &["#rqAnswerOption2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_answer_clicks_every_flagged_option() {
        let page = quiz_page().await;
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![multi_answer_state(0), multi_answer_state(1)],
        )
        .await;
        page.on_js("rqMCredits", vec![json!(true), json!(true), json!(true)])
            .await;

        QuizProtocol::run(page.as_ref(), &ClickExecutor::default(), "warpstream quiz")
            .await
            .unwrap();

        assert_eq!(
            page.clicks.lock().await.as_slice(),
            &["#rqAnswerOption1", "#rqAnswerOption4", "#rqAnswerOption6"]
        );
        // One refresh wait per flagged option
        assert_eq!(page.js_count("rqMCredits").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_option_count_warns_and_stops() {
        let page = quiz_page().await;
        page.on_js(
            "rewardsQuizRenderInfo",
            vec![json!({
                "maxQuestions": 2,
                "correctlyAnsweredCount": 0,
                "numberOfOptions": 6,
                "correctAnswer": "",
                "options": []
            })],
        )
        .await;

        QuizProtocol::run(page.as_ref(), &ClickExecutor::default(), "odd quiz")
            .await
            .unwrap();

        assert!(page.clicks.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_refresh_signal_aborts() {
        let page = quiz_page().await;
        page.on_js("rewardsQuizRenderInfo", vec![single_answer_state(0)])
            .await;
        page.on_js("rqMCredits", vec![json!(false)]).await;

        let err = QuizProtocol::run(page.as_ref(), &ClickExecutor::default(), "stuck quiz")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RefreshSignalMissing(_)));
    }
}
