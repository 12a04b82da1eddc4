//! Structural pass: trigger/action presence, cycle detection, reachability.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::{BlockCategory, BlockId, Strategy};

use super::result::{Findings, ValidationCode, ValidationError};

/// Adjacency over block ids, in connection order. Dangling edges are kept;
/// the connection pass reports them.
pub(crate) fn adjacency(strategy: &Strategy) -> HashMap<&BlockId, Vec<&BlockId>> {
    let mut adj: HashMap<&BlockId, Vec<&BlockId>> = HashMap::new();
    for c in &strategy.connections {
        adj.entry(&c.source_block_id)
            .or_default()
            .push(&c.target_block_id);
    }
    adj
}

pub(crate) fn check(strategy: &Strategy, findings: &mut Findings) -> Option<Vec<BlockId>> {
    if strategy.triggers().next().is_none() {
        findings.push(ValidationError::error(
            ValidationCode::NoTrigger,
            "strategy has no trigger block",
        ));
    }
    if strategy.blocks_of(BlockCategory::Action).next().is_none() {
        findings.push(ValidationError::warning(
            ValidationCode::NoAction,
            "strategy has no action block",
        ));
    }

    let adj = adjacency(strategy);
    let cycle = find_cycle(strategy, &adj);
    if let Some(path) = &cycle {
        let rendered: Vec<&str> = path.iter().map(BlockId::as_str).collect();
        let mut finding = ValidationError::error(
            ValidationCode::CircularDependency,
            format!("circular dependency: {}", rendered.join(" -> ")),
        );
        if let Some(first) = path.first() {
            finding = finding.on_block(first);
        }
        findings.push(finding);
    }

    let reached = reachable(strategy, &adj);
    for block in &strategy.blocks {
        if block.is_trigger() || block.category == BlockCategory::Utility {
            continue;
        }
        if !reached.contains(&block.id) {
            findings.push(
                ValidationError::warning(
                    ValidationCode::UnreachableBlock,
                    format!("block '{}' is not reachable from any trigger", block.name),
                )
                .on_block(&block.id),
            );
        }
    }
    cycle
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Depth-first search from every trigger. Returns the first cycle found as
/// the path from its entry block back to itself (entry repeated at the end).
pub(crate) fn find_cycle<'a>(
    strategy: &'a Strategy,
    adj: &HashMap<&'a BlockId, Vec<&'a BlockId>>,
) -> Option<Vec<BlockId>> {
    let mut marks: HashMap<&'a BlockId, Mark> = HashMap::new();
    let mut stack: Vec<&'a BlockId> = Vec::new();

    for trigger in strategy.triggers() {
        if marks.contains_key(&trigger.id) {
            continue;
        }
        if let Some(path) = dfs(&trigger.id, adj, &mut marks, &mut stack) {
            return Some(path);
        }
    }
    None
}

fn dfs<'a>(
    node: &'a BlockId,
    adj: &HashMap<&'a BlockId, Vec<&'a BlockId>>,
    marks: &mut HashMap<&'a BlockId, Mark>,
    stack: &mut Vec<&'a BlockId>,
) -> Option<Vec<BlockId>> {
    marks.insert(node, Mark::OnStack);
    stack.push(node);

    for &next in adj.get(node).map(Vec::as_slice).unwrap_or_default() {
        match marks.get(next) {
            Some(Mark::OnStack) => {
                let start = stack.iter().position(|id| *id == next).unwrap_or(0);
                let mut path: Vec<BlockId> =
                    stack[start..].iter().map(|id| (*id).clone()).collect();
                path.push(next.clone());
                return Some(path);
            }
            Some(Mark::Done) => {}
            None => {
                if let Some(path) = dfs(next, adj, marks, stack) {
                    return Some(path);
                }
            }
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    None
}

/// Breadth-first set of blocks reachable from the trigger set.
pub(crate) fn reachable<'a>(
    strategy: &'a Strategy,
    adj: &HashMap<&'a BlockId, Vec<&'a BlockId>>,
) -> HashSet<BlockId> {
    let mut seen: HashSet<BlockId> = HashSet::new();
    let mut queue: VecDeque<&BlockId> = VecDeque::new();
    for trigger in strategy.triggers() {
        if seen.insert(trigger.id.clone()) {
            queue.push_back(&trigger.id);
        }
    }
    while let Some(id) = queue.pop_front() {
        for &next in adj.get(id).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    seen
}
