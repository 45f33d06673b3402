//! The `Evaluator` (judge) collaborator contract.

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;

/// A judge's verdict on a single (goal, response) pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalResult {
    pub success: bool,
    /// Continuous score in `[0, 1]`. `None` when the judge didn't report one;
    /// the engine substitutes `1.0` on success and `0.0` otherwise (see
    /// `Evaluator::resolve_score`).
    pub score: Option<f64>,
}

impl EvalResult {
    pub fn new(success: bool, score: f64) -> Self {
        Self {
            success,
            score: Some(score),
        }
    }

    /// The score to use for best-tracking and pruning: the judge's score
    /// if present, else 1.0 on success / 0.0 on failure. Keeps best-tracking
    /// monotone even against judges that only report a boolean.
    pub fn resolve_score(&self) -> f64 {
        self.score.unwrap_or(if self.success { 1.0 } else { 0.0 })
    }
}

/// A judge model or rule-based scorer that rates a target's response
/// against a goal.
///
/// MUST produce a continuous score, not only a boolean: TAP pruning and
/// best-tracking rely on ordering between candidates, not just a pass/fail
/// split. The engine treats the score as ground truth and never re-derives
/// success from it.
///
/// `evaluate` is synchronous, mirroring the original's split between a
/// blocking `evaluate` and an async `stream_abatch`. The engine's own probes
/// never call `evaluate` directly from inside an async context — they drain
/// a single-pair `stream_abatch`, so a judge that does blocking I/O in
/// `evaluate` never stalls the runtime awaiting it.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, goal: &str, response: &str) -> anyhow::Result<EvalResult>;

    /// Batch form yielding results in input order as they become available.
    /// The default implementation evaluates sequentially via `evaluate`;
    /// collaborators with genuine async batch APIs may override for real
    /// concurrency.
    fn stream_abatch<'a>(
        &'a self,
        goals: Vec<String>,
        responses: Vec<String>,
    ) -> BoxStream<'a, anyhow::Result<EvalResult>> {
        let pairs: Vec<(String, String)> = goals.into_iter().zip(responses).collect();
        Box::pin(
            futures::stream::iter(pairs).map(move |(goal, response)| self.evaluate(&goal, &response)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_score_prefers_explicit_score() {
        let r = EvalResult::new(false, 0.42);
        assert_eq!(r.resolve_score(), 0.42);
    }

    #[test]
    fn resolve_score_defaults_on_success() {
        let r = EvalResult {
            success: true,
            score: None,
        };
        assert_eq!(r.resolve_score(), 1.0);
    }

    #[test]
    fn resolve_score_defaults_on_failure() {
        let r = EvalResult {
            success: false,
            score: None,
        };
        assert_eq!(r.resolve_score(), 0.0);
    }
}
