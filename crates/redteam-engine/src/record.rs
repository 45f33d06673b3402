//! Immutable observations produced by a run: `IterationRecord`, the TAP
//! arena of `TreeNode`s, and the terminal `RunResult`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Message;

/// One probe: an attack prompt tried, the target's response, and the
/// judge's verdict. Immutable after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration_index: usize,
    pub attack_prompt: String,
    pub target_response: String,
    pub success: bool,
    pub score: f64,
    pub conversation_snapshot: Vec<Message>,
    pub metadata: Value,
}

impl IterationRecord {
    pub fn new(
        iteration_index: usize,
        attack_prompt: String,
        target_response: String,
        success: bool,
        score: f64,
        conversation_snapshot: Vec<Message>,
        metadata: Value,
    ) -> Self {
        Self {
            iteration_index,
            attack_prompt,
            target_response,
            success,
            score,
            conversation_snapshot,
            metadata,
        }
    }
}

/// Index into a `Tree`'s arena. Plain `usize` newtype, not a pointer, so
/// ancestry can be reconstructed without `Rc`/`RefCell` cycles.
pub type NodeId = usize;

/// A node in the TAP search tree. The parent link is a non-owning back
/// reference kept only for ancestry reconstruction; it is never traversed
/// for ownership. The arena (`Tree`) owns every node.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub attack_prompt: String,
    pub target_response: String,
    pub score: f64,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub improvement: String,
    pub pruned: bool,
}

/// Arena holding every `TreeNode` produced during a TAP run.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Insert a node and wire it to its parent's children list. Returns the
    /// new node's id.
    pub fn insert(&mut self, node: TreeNode) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent_id) = node.parent {
            self.nodes[parent_id].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The terminal output of a single-goal run, produced exactly once when
/// the strategy decides to stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub goal: String,
    pub success: bool,
    pub best_attack_prompt: String,
    pub best_score: f64,
    pub iterations: Vec<IterationRecord>,
    pub total_iterations: usize,
    pub metadata: Value,
}

/// Tracks the best-so-far candidate as iterations accumulate.
///
/// Updated on strict improvement only, so ties keep the earliest
/// occurrence — matching the invariant that `best_attack_prompt` is the
/// prompt of the earliest iteration whose score equals `best_score`.
#[derive(Debug, Clone)]
pub struct BestTracker {
    pub best_attack_prompt: String,
    pub best_score: f64,
    seen_any: bool,
}

impl BestTracker {
    pub fn new() -> Self {
        Self {
            best_attack_prompt: String::new(),
            best_score: 0.0,
            seen_any: false,
        }
    }

    pub fn observe(&mut self, attack_prompt: &str, score: f64) {
        if !self.seen_any || score > self.best_score {
            self.best_attack_prompt = attack_prompt.to_string();
            self.best_score = score;
            self.seen_any = true;
        }
    }
}

impl Default for BestTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_tracker_keeps_earliest_on_tie() {
        let mut tracker = BestTracker::new();
        tracker.observe("first", 0.7);
        tracker.observe("second", 0.7);
        assert_eq!(tracker.best_attack_prompt, "first");
        assert_eq!(tracker.best_score, 0.7);
    }

    #[test]
    fn best_tracker_updates_on_strict_improvement() {
        let mut tracker = BestTracker::new();
        tracker.observe("low", 0.2);
        tracker.observe("high", 0.9);
        assert_eq!(tracker.best_attack_prompt, "high");
        tracker.observe("lower", 0.1);
        assert_eq!(tracker.best_attack_prompt, "high");
    }

    #[test]
    fn tree_insert_wires_parent_children() {
        let mut tree = Tree::new();
        let root = tree.insert(TreeNode {
            attack_prompt: "root".into(),
            target_response: "resp".into(),
            score: 0.5,
            depth: 0,
            parent: None,
            children: Vec::new(),
            improvement: String::new(),
            pruned: false,
        });
        let child = tree.insert(TreeNode {
            attack_prompt: "child".into(),
            target_response: "resp2".into(),
            score: 0.6,
            depth: 1,
            parent: Some(root),
            children: Vec::new(),
            improvement: "more direct".into(),
            pruned: false,
        });
        assert_eq!(tree.get(root).children, vec![child]);
        assert_eq!(tree.get(child).parent, Some(root));
        assert_eq!(tree.get(child).depth, tree.get(root).depth + 1);
    }
}
