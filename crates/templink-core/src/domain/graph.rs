//! Linkage graph checks.
//!
//! The edge relation, viewed with edges pointing from the inheriting child to
//! the inherited template, must stay free of cycles and of "double linkage":
//! no entity may reach the same ancestor template through two distinct paths.
//! Both checks run as one depth-first sweep per root over the combined graph
//! of stored and proposed edges.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entity::{EntityId, LinkageEdge};
use crate::error::{LinkageError, LinkageResult};

/// Per-node traversal state within a single root's sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current traversal path.
    OnPath,
    /// Fully explored and left behind on this sweep.
    Closed,
}

/// Explicit traversal frame: a node and the index of its next parent to visit.
struct Frame {
    node: EntityId,
    next: usize,
}

/// The linkage graph in child-to-parent direction.
#[derive(Debug, Default)]
pub struct LinkageGraph {
    /// Parents of each child, in edge order.
    adjacency: BTreeMap<EntityId, Vec<EntityId>>,

    /// Nodes appearing on the template (parent) side of any edge.
    parents: BTreeSet<EntityId>,

    /// Nodes appearing on the target (child) side of any edge.
    children: BTreeSet<EntityId>,

    /// Every node touched by any edge.
    all: BTreeSet<EntityId>,
}

impl LinkageGraph {
    /// Build the graph from an edge set.
    pub fn from_edges(edges: impl IntoIterator<Item = LinkageEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            graph
                .adjacency
                .entry(edge.target_id)
                .or_default()
                .push(edge.template_id);
            graph.parents.insert(edge.template_id);
            graph.children.insert(edge.target_id);
            graph.all.insert(edge.template_id);
            graph.all.insert(edge.target_id);
        }
        graph
    }

    /// Roots of the graph: nodes that link to a template but are not
    /// themselves linked to by anything.
    pub fn roots(&self) -> Vec<EntityId> {
        self.children.difference(&self.parents).copied().collect()
    }

    /// Check the whole graph for cycles and double linkage.
    ///
    /// Sweeps from every root; nodes left unvisited afterwards can only sit
    /// on a root-less cycle, which is reported as a circular linkage. A
    /// double linkage whose convergence point sits inside such a cycle is
    /// reported the same way, since no sweep reaches it.
    pub fn check(&self) -> LinkageResult<()> {
        let mut visited = BTreeSet::new();

        for root in self.roots() {
            self.sweep(root, &mut visited)?;
        }

        if visited.len() < self.all.len() {
            return Err(LinkageError::CyclicLinkage);
        }

        Ok(())
    }

    /// Depth-first sweep from one root.
    ///
    /// `visited` accumulates across sweeps; the path marks are local to this
    /// sweep, so a template reachable from several roots is legal while a
    /// second path from the same root is not.
    fn sweep(&self, root: EntityId, visited: &mut BTreeSet<EntityId>) -> LinkageResult<()> {
        let mut marks: BTreeMap<EntityId, Mark> = BTreeMap::new();
        marks.insert(root, Mark::OnPath);
        visited.insert(root);

        let mut stack = vec![Frame { node: root, next: 0 }];

        while let Some(frame) = stack.last_mut() {
            let parents = self
                .adjacency
                .get(&frame.node)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            if let Some(&next) = parents.get(frame.next) {
                frame.next += 1;

                match marks.get(&next) {
                    Some(Mark::OnPath) => return Err(LinkageError::CyclicLinkage),
                    Some(Mark::Closed) => return Err(LinkageError::DiamondLinkage),
                    None => {
                        marks.insert(next, Mark::OnPath);
                        visited.insert(next);
                        stack.push(Frame { node: next, next: 0 });
                    }
                }
            } else {
                marks.insert(frame.node, Mark::Closed);
                stack.pop();
            }
        }

        Ok(())
    }
}
