//! PAIR (Prompt Automatic Iterative Refinement): a single-path loop where
//! each iteration conditions on the previous target response and score.
//!
//! Reference: <https://arxiv.org/abs/2310.08419>

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::attack::Attack;
use crate::error::{EngineError, EngineResult};
use crate::evaluator::Evaluator;
use crate::language::LanguageConfig;
use crate::model::{Message, Model, Prompt};
use crate::prompts;
use crate::record::{BestTracker, IterationRecord, RunResult};
use crate::scoring;

/// Linear iterative refinement attack driving an attacker/target/judge
/// trio through a bounded number of rounds.
pub struct PairAttack {
    attacker: Arc<dyn Model>,
    target: Arc<dyn Model>,
    evaluator: Arc<dyn Evaluator>,
    max_iterations: usize,
    language: LanguageConfig,
    name: Option<String>,
    description: Option<String>,
}

impl PairAttack {
    pub fn new(
        attacker: Arc<dyn Model>,
        target: Arc<dyn Model>,
        evaluator: Arc<dyn Evaluator>,
        max_iterations: usize,
    ) -> Self {
        Self {
            attacker,
            target,
            evaluator,
            max_iterations,
            language: LanguageConfig::default(),
            name: None,
            description: None,
        }
    }

    pub fn with_language(mut self, language: LanguageConfig) -> Self {
        self.language = language;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run the linear refinement loop for a single goal.
    #[instrument(skip(self), fields(goal = %truncate(goal, 80)))]
    pub async fn run(&self, goal: &str) -> EngineResult<RunResult> {
        let system_prompt = prompts::attacker_system_prompt(&self.language);
        let mut iterations: Vec<IterationRecord> = Vec::new();
        let mut tracker = BestTracker::new();
        let mut success = false;
        let mut conversation: Vec<Message> = Vec::new();

        for i in 0..self.max_iterations {
            let user_instruction = if i == 0 {
                prompts::initial_instruction(goal, &self.language)
            } else {
                let previous = &iterations[i - 1];
                prompts::refinement_instruction(
                    goal,
                    &self.language,
                    &previous.target_response,
                    scoring::scale_score(previous.score),
                    None,
                )
            };
            let attacker_prompt_text = format!("{system_prompt}\n\n{user_instruction}");

            let outcome = super::probe(
                self.attacker.as_ref(),
                self.target.as_ref(),
                self.evaluator.as_ref(),
                goal,
                attacker_prompt_text,
            )
            .await
            .map_err(|(role, source)| {
                tracing::error!(%role, iteration = i, error = %source, "model call failed, aborting run");
                EngineError::ModelCallFailed {
                    role,
                    goal: goal.to_string(),
                    iteration: i,
                    source: source.to_string(),
                    partial: iterations.clone(),
                }
            })?;

            conversation.push(Message {
                role: "attacker".into(),
                content: outcome.candidate.clone(),
            });
            conversation.push(Message {
                role: "target".into(),
                content: outcome.target_response.clone(),
            });

            let record = IterationRecord::new(
                i,
                outcome.candidate.clone(),
                outcome.target_response.clone(),
                outcome.success,
                outcome.score,
                conversation.clone(),
                serde_json::json!({
                    "improvement": outcome.improvement,
                    "eval_result": outcome.eval_raw,
                }),
            );

            debug!(iteration = i, score = record.score, success = record.success, "probe complete");

            tracker.observe(&record.attack_prompt, record.score);
            if record.success {
                success = true;
            }
            let stop = scoring::should_stop(record.success, record.iteration_index, self.max_iterations);
            iterations.push(record);
            if stop {
                break;
            }
        }

        info!(
            total_iterations = iterations.len(),
            success,
            best_score = tracker.best_score,
            "PAIR run complete"
        );

        Ok(RunResult {
            goal: goal.to_string(),
            success,
            best_attack_prompt: tracker.best_attack_prompt,
            best_score: tracker.best_score,
            total_iterations: iterations.len(),
            iterations,
            metadata: serde_json::json!({
                "attack_type": "PAIR",
                "language": self.language.code,
            }),
        })
    }
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Attack for PairAttack {
    async fn apply_async(&self, prompt: Prompt) -> Result<Prompt, EngineError> {
        let goal = prompt.extract_goal()?;
        let result = self.run(&goal).await?;
        prompt.format_result(&result.best_attack_prompt)
    }

    fn get_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "PAIRAttack".to_string())
    }

    fn get_description(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!("PAIR iterative attack with max {} iterations", self.max_iterations)
        })
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "max_iterations": self.max_iterations,
            "language": self.language.code,
            "attack_type": "PAIR",
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::evaluator::EvalResult;
    use crate::model::ModelResponse;

    struct ScriptedModel {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            }
        }

        fn constant(response: &str) -> Self {
            Self {
                responses: Mutex::new(vec![response.to_string()]),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn ainvoke(&self, _prompt: &Prompt) -> anyhow::Result<ModelResponse> {
            let mut responses = self.responses.lock().unwrap();
            let content = if responses.len() > 1 {
                responses.pop().unwrap()
            } else {
                responses.last().cloned().unwrap_or_default()
            };
            Ok(ModelResponse::new(content))
        }
    }

    struct ScriptedEvaluator {
        verdicts: Mutex<Vec<(bool, f64)>>,
    }

    impl ScriptedEvaluator {
        fn new(verdicts: Vec<(bool, f64)>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into_iter().rev().collect()),
            }
        }

        fn constant(success: bool, score: f64) -> Self {
            Self {
                verdicts: Mutex::new(vec![(success, score)]),
            }
        }
    }

    impl Evaluator for ScriptedEvaluator {
        fn evaluate(&self, _goal: &str, _response: &str) -> anyhow::Result<EvalResult> {
            let mut verdicts = self.verdicts.lock().unwrap();
            let (success, score) = if verdicts.len() > 1 {
                verdicts.pop().unwrap()
            } else {
                *verdicts.last().unwrap()
            };
            Ok(EvalResult::new(success, score))
        }
    }

    fn make_pair(
        attacker: ScriptedModel,
        target: ScriptedModel,
        evaluator: ScriptedEvaluator,
        max_iterations: usize,
    ) -> PairAttack {
        PairAttack::new(
            Arc::new(attacker),
            Arc::new(target),
            Arc::new(evaluator),
            max_iterations,
        )
    }

    #[tokio::test]
    async fn scenario_a_immediate_success() {
        let pair = make_pair(
            ScriptedModel::constant(r#"{"improvement":"x","prompt":"JB"}"#),
            ScriptedModel::constant("Sure, here is..."),
            ScriptedEvaluator::constant(true, 1.0),
            5,
        );
        let result = pair.run("do the thing").await.unwrap();
        assert_eq!(result.total_iterations, 1);
        assert!(result.success);
        assert_eq!(result.best_attack_prompt, "JB");
        assert_eq!(result.best_score, 1.0);
    }

    #[tokio::test]
    async fn scenario_b_budget_exhaustion() {
        let pair = make_pair(
            ScriptedModel::constant(r#"{"improvement":"x","prompt":"JB"}"#),
            ScriptedModel::constant("I refuse."),
            ScriptedEvaluator::constant(false, 0.3),
            5,
        );
        let result = pair.run("do the thing").await.unwrap();
        assert_eq!(result.total_iterations, 5);
        assert!(!result.success);
        assert_eq!(result.best_score, 0.3);
        assert_eq!(result.best_attack_prompt, "JB");
    }

    #[tokio::test]
    async fn scenario_c_best_tracking_keeps_earliest_tie() {
        let pair = make_pair(
            ScriptedModel::new(vec![
                r#"{"improvement":"x","prompt":"P0"}"#,
                r#"{"improvement":"x","prompt":"P1"}"#,
                r#"{"improvement":"x","prompt":"P2"}"#,
                r#"{"improvement":"x","prompt":"P3"}"#,
                r#"{"improvement":"x","prompt":"P4"}"#,
            ]),
            ScriptedModel::constant("some response"),
            ScriptedEvaluator::new(vec![
                (false, 0.2),
                (false, 0.7),
                (false, 0.7),
                (false, 0.1),
                (false, 0.5),
            ]),
            5,
        );
        let result = pair.run("goal").await.unwrap();
        assert_eq!(result.best_score, 0.7);
        assert_eq!(result.best_attack_prompt, "P1");
        assert!(!result.success);
        assert_eq!(result.total_iterations, 5);
    }

    #[tokio::test]
    async fn model_call_failure_propagates_with_partial_iterations() {
        struct FailingAfterOne {
            calls: Mutex<usize>,
        }

        #[async_trait]
        impl Model for FailingAfterOne {
            async fn ainvoke(&self, _prompt: &Prompt) -> anyhow::Result<ModelResponse> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls > 1 {
                    anyhow::bail!("simulated network timeout");
                }
                Ok(ModelResponse::new(r#"{"improvement":"x","prompt":"JB"}"#))
            }
        }

        let pair = make_pair_with_attacker(
            FailingAfterOne { calls: Mutex::new(0) },
            ScriptedModel::constant("I refuse."),
            ScriptedEvaluator::constant(false, 0.2),
            5,
        );
        let err = pair.run("goal").await.unwrap_err();
        match err {
            EngineError::ModelCallFailed { partial, iteration, .. } => {
                assert_eq!(partial.len(), 1);
                assert_eq!(iteration, 1);
            }
            other => panic!("expected ModelCallFailed, got {other:?}"),
        }
    }

    fn make_pair_with_attacker(
        attacker: impl Model + 'static,
        target: ScriptedModel,
        evaluator: ScriptedEvaluator,
        max_iterations: usize,
    ) -> PairAttack {
        PairAttack::new(
            Arc::new(attacker),
            Arc::new(target),
            Arc::new(evaluator),
            max_iterations,
        )
    }
}
