//! Batch façade: lifts a single-goal `Attack` to a stream over many goals
//! run concurrently, with strict input-order emission.
//!
//! Launches all runs concurrently, buffers each completion keyed by its
//! input index, and flushes the prefix of the buffer that is contiguous
//! from the next expected index. This is a completion-buffer, not a
//! naive "emit as they finish": two runs finishing out of order never
//! reorders the output.

use std::collections::BTreeMap;

use futures::stream::{BoxStream, FuturesUnordered};
use futures::StreamExt;

use crate::attack::Attack;
use crate::error::EngineError;
use crate::model::Prompt;

pub fn run_batch<'a, A: Attack>(
    attack: &'a A,
    prompts: Vec<Prompt>,
) -> BoxStream<'a, Result<Prompt, EngineError>> {
    let mut in_flight: FuturesUnordered<_> = prompts
        .into_iter()
        .enumerate()
        .map(|(idx, prompt)| async move { (idx, attack.apply_async(prompt).await) })
        .collect();

    Box::pin(futures::stream::unfold(
        (in_flight, BTreeMap::new(), 0usize),
        move |(mut in_flight, mut buffer, mut next_idx)| async move {
            loop {
                if let Some(result) = buffer.remove(&next_idx) {
                    next_idx += 1;
                    return Some((result, (in_flight, buffer, next_idx)));
                }
                match in_flight.next().await {
                    Some((idx, result)) => {
                        buffer.insert(idx, result);
                    }
                    None => return None,
                }
            }
        },
    ))
}
