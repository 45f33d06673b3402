//! Shared probing logic for the PAIR and TAP strategies: one probe is one
//! (attacker → target → judge) round producing a single observation.

pub mod pair;
pub mod tap;

use futures::StreamExt;

use crate::error::ModelRole;
use crate::evaluator::{EvalResult, Evaluator};
use crate::json_extract;
use crate::model::{Model, Prompt};

/// The observation produced by one probe, before it is wrapped into an
/// `IterationRecord` or `TreeNode` by the caller (which alone knows the
/// surrounding iteration index / depth / parent).
pub(crate) struct ProbeOutcome {
    pub candidate: String,
    pub improvement: String,
    pub target_response: String,
    pub success: bool,
    pub score: f64,
    pub eval_raw: EvalResult,
}

/// Run one (attacker → target → judge) round.
///
/// Attacker or target failures are returned tagged with which collaborator
/// failed, so the caller (which owns the accumulated `IterationRecord`s)
/// can build an `EngineError::ModelCallFailed` with the right partial
/// state. Evaluator failures are absorbed here per the engine's error
/// taxonomy: they become `score=0.0, success=false` and never propagate.
///
/// The evaluator is driven through a single-pair `stream_abatch` rather
/// than calling its synchronous `evaluate` directly, so a judge that does
/// blocking I/O in `evaluate` never stalls the runtime this probe is
/// awaited on.
pub(crate) async fn probe(
    attacker: &dyn Model,
    target: &dyn Model,
    evaluator: &dyn Evaluator,
    goal: &str,
    attacker_prompt_text: String,
) -> Result<ProbeOutcome, (ModelRole, anyhow::Error)> {
    let attacker_response = attacker
        .ainvoke(&Prompt::Text(attacker_prompt_text))
        .await
        .map_err(|e| (ModelRole::Attacker, e))?;

    let candidate = json_extract::extract_prompt(&attacker_response.content);
    let improvement = json_extract::extract_improvement(&attacker_response.content);

    let target_response = target
        .ainvoke(&Prompt::Text(candidate.clone()))
        .await
        .map_err(|e| (ModelRole::Target, e))?;

    let mut eval_stream =
        evaluator.stream_abatch(vec![goal.to_string()], vec![target_response.content.clone()]);
    let eval_result = match eval_stream.next().await {
        Some(Ok(r)) => r,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "evaluator failed; treating iteration as score=0, non-success");
            EvalResult {
                success: false,
                score: Some(0.0),
            }
        }
        None => {
            tracing::warn!("evaluator produced no result; treating iteration as score=0, non-success");
            EvalResult {
                success: false,
                score: Some(0.0),
            }
        }
    };
    let score = eval_result.resolve_score();

    Ok(ProbeOutcome {
        candidate,
        improvement,
        target_response: target_response.content,
        success: eval_result.success,
        score,
        eval_raw: eval_result,
    })
}
