//! TAP (Tree of Attacks with Pruning): breadth-first exploration with
//! per-node branching and score-threshold pruning.
//!
//! Reference: <https://arxiv.org/abs/2312.02119>

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::attack::Attack;
use crate::error::{EngineError, EngineResult, ModelRole};
use crate::evaluator::Evaluator;
use crate::language::LanguageConfig;
use crate::model::{Model, Prompt};
use crate::prompts;
use crate::record::{BestTracker, IterationRecord, NodeId, RunResult, Tree, TreeNode};
use crate::scoring;

use super::ProbeOutcome;

/// Breadth-first tree search attack: bounded depth, bounded fan-out,
/// threshold pruning, and a global probe budget shared across branches.
pub struct TapAttack {
    attacker: Arc<dyn Model>,
    target: Arc<dyn Model>,
    evaluator: Arc<dyn Evaluator>,
    max_depth: usize,
    branching_factor: usize,
    prune_threshold: f64,
    max_iterations: usize,
    language: LanguageConfig,
    name: Option<String>,
    description: Option<String>,
}

impl TapAttack {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        attacker: Arc<dyn Model>,
        target: Arc<dyn Model>,
        evaluator: Arc<dyn Evaluator>,
        max_iterations: usize,
        max_depth: usize,
        branching_factor: usize,
        prune_threshold: f64,
    ) -> Self {
        Self {
            attacker,
            target,
            evaluator,
            max_depth,
            branching_factor,
            prune_threshold,
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

    /// Run the BFS tree search for a single goal.
    #[instrument(skip(self), fields(goal = %truncate(goal, 80)))]
    pub async fn run(&self, goal: &str) -> EngineResult<RunResult> {
        let system_prompt = prompts::attacker_system_prompt(&self.language);
        let mut iterations: Vec<IterationRecord> = Vec::new();
        let mut tree = Tree::new();
        let mut tracker = BestTracker::new();
        let mut success = false;
        let mut max_depth_reached = 0usize;

        let root_instruction = prompts::initial_instruction(goal, &self.language);
        let root_prompt_text = format!("{system_prompt}\n\n{root_instruction}");
        let root_outcome = super::probe(
            self.attacker.as_ref(),
            self.target.as_ref(),
            self.evaluator.as_ref(),
            goal,
            root_prompt_text,
        )
        .await
        .map_err(|(role, source)| {
            tracing::error!(%role, iteration = 0, error = %source, "model call failed, aborting run");
            EngineError::ModelCallFailed {
                role,
                goal: goal.to_string(),
                iteration: 0,
                source: source.to_string(),
                partial: iterations.clone(),
            }
        })?;

        // The root is never itself subject to pruning: it is the
        // unconditional starting point for depth-1 expansion regardless of
        // its own score. Pruning only filters which *children* seed the
        // next frontier.
        let root_id = tree.insert(TreeNode {
            attack_prompt: root_outcome.candidate.clone(),
            target_response: root_outcome.target_response.clone(),
            score: root_outcome.score,
            depth: 0,
            parent: None,
            children: Vec::new(),
            improvement: root_outcome.improvement.clone(),
            pruned: false,
        });

        let root_record = IterationRecord::new(
            0,
            root_outcome.candidate.clone(),
            root_outcome.target_response.clone(),
            root_outcome.success,
            root_outcome.score,
            Vec::new(),
            serde_json::json!({"depth": 0, "node": "root", "eval_result": root_outcome.eval_raw}),
        );
        tracker.observe(&root_record.attack_prompt, root_record.score);
        if root_record.success {
            success = true;
        }
        debug!(depth = 0, score = root_record.score, success = root_record.success, "root probed");
        iterations.push(root_record);

        let mut current_level: Vec<NodeId> = if success { Vec::new() } else { vec![root_id] };

        if !success {
            'depth_loop: for depth in 1..=self.max_depth {
                if current_level.is_empty() {
                    break;
                }
                let remaining_budget = self.max_iterations.saturating_sub(iterations.len());
                if remaining_budget == 0 {
                    break;
                }

                // Canonical (parent order, branch index) pairs, truncated
                // to the remaining global budget. This ordering is what
                // makes two deterministic runs byte-identical.
                let mut candidates: Vec<(usize, usize, NodeId)> = Vec::new();
                for (parent_order, &parent_id) in current_level.iter().enumerate() {
                    for branch in 0..self.branching_factor {
                        candidates.push((parent_order, branch, parent_id));
                    }
                }
                candidates.truncate(remaining_budget);
                if candidates.is_empty() {
                    break;
                }

                type BranchJoin = (usize, usize, NodeId, Result<ProbeOutcome, (ModelRole, anyhow::Error)>);
                let mut join_set: JoinSet<BranchJoin> = JoinSet::new();
                for (parent_order, branch, parent_id) in candidates.iter().copied() {
                    let parent_node = tree.get(parent_id).clone();
                    let attacker = Arc::clone(&self.attacker);
                    let target = Arc::clone(&self.target);
                    let evaluator = Arc::clone(&self.evaluator);
                    let goal_owned = goal.to_string();
                    let language = self.language.clone();
                    let system_prompt = system_prompt.clone();
                    join_set.spawn(async move {
                        let hint = language.hint_for_branch(branch).to_string();
                        let scaled_parent_score = scoring::scale_score(parent_node.score);
                        let user_instruction = prompts::branch_instruction(
                            &goal_owned,
                            &language,
                            &parent_node.attack_prompt,
                            &parent_node.target_response,
                            scaled_parent_score,
                            &hint,
                        );
                        let attacker_prompt_text = format!("{system_prompt}\n\n{user_instruction}");
                        let result = super::probe(
                            attacker.as_ref(),
                            target.as_ref(),
                            evaluator.as_ref(),
                            &goal_owned,
                            attacker_prompt_text,
                        )
                        .await;
                        (parent_order, branch, parent_id, result)
                    });
                }

                // Await every branch of this depth to completion before
                // deciding anything, success included: ordering must stay
                // reproducible even when latencies differ.
                let mut gathered = Vec::with_capacity(candidates.len());
                while let Some(joined) = join_set.join_next().await {
                    let entry = joined
                        .map_err(|e| EngineError::Internal(anyhow::anyhow!("TAP branch task panicked: {e}")))?;
                    gathered.push(entry);
                }
                gathered.sort_by_key(|(parent_order, branch, ..)| (*parent_order, *branch));

                let mut next_level: Vec<NodeId> = Vec::new();
                for (_, branch, parent_id, result) in gathered {
                    let outcome = match result {
                        Ok(o) => o,
                        Err((role, source)) => {
                            tracing::error!(
                                %role,
                                iteration = iterations.len(),
                                error = %source,
                                "model call failed, aborting run"
                            );
                            return Err(EngineError::ModelCallFailed {
                                role,
                                goal: goal.to_string(),
                                iteration: iterations.len(),
                                source: source.to_string(),
                                partial: iterations,
                            });
                        }
                    };

                    let pruned_here = outcome.score < self.prune_threshold;
                    let child_id = tree.insert(TreeNode {
                        attack_prompt: outcome.candidate.clone(),
                        target_response: outcome.target_response.clone(),
                        score: outcome.score,
                        depth,
                        parent: Some(parent_id),
                        children: Vec::new(),
                        improvement: outcome.improvement.clone(),
                        pruned: pruned_here,
                    });

                    let record = IterationRecord::new(
                        iterations.len(),
                        outcome.candidate.clone(),
                        outcome.target_response.clone(),
                        outcome.success,
                        outcome.score,
                        Vec::new(),
                        serde_json::json!({"depth": depth, "branch": branch, "eval_result": outcome.eval_raw}),
                    );
                    tracker.observe(&record.attack_prompt, record.score);
                    if record.success {
                        success = true;
                    }
                    iterations.push(record);

                    if !pruned_here {
                        next_level.push(child_id);
                    }
                }

                max_depth_reached = depth;
                if success {
                    break 'depth_loop;
                }
                current_level = next_level;
            }
        }

        info!(
            total_iterations = iterations.len(),
            success,
            best_score = tracker.best_score,
            max_depth_reached,
            "TAP run complete"
        );

        let metadata = if success {
            serde_json::json!({
                "attack_type": "TAP",
                "max_depth_reached": max_depth_reached,
                "success_depth": max_depth_reached,
            })
        } else {
            serde_json::json!({
                "attack_type": "TAP",
                "max_depth_reached": max_depth_reached,
                "prune_threshold": self.prune_threshold,
                "branching_factor": self.branching_factor,
            })
        };

        Ok(RunResult {
            goal: goal.to_string(),
            success,
            best_attack_prompt: tracker.best_attack_prompt,
            best_score: tracker.best_score,
            total_iterations: iterations.len(),
            iterations,
            metadata,
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
impl Attack for TapAttack {
    async fn apply_async(&self, prompt: Prompt) -> Result<Prompt, EngineError> {
        let goal = prompt.extract_goal()?;
        let result = self.run(&goal).await?;
        prompt.format_result(&result.best_attack_prompt)
    }

    fn get_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "TAPAttack".to_string())
    }

    fn get_description(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            format!(
                "TAP tree attack with depth={}, branching={}, prune_threshold={}",
                self.max_depth, self.branching_factor, self.prune_threshold
            )
        })
    }

    fn get_params(&self) -> serde_json::Value {
        serde_json::json!({
            "max_iterations": self.max_iterations,
            "max_depth": self.max_depth,
            "branching_factor": self.branching_factor,
            "prune_threshold": self.prune_threshold,
            "language": self.language.code,
            "attack_type": "TAP",
        })
    }
}
