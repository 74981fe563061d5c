//! Committer
//!
//! Once the work loop has visited every fiber of a pass, the commit applies
//! the recorded effects to the host tree in a single synchronous step:
//!
//! 1. Every queued deletion removes its host node from the parent's host
//!    node. Deletions always run before any placement or update.
//! 2. The new tree is walked depth-first, child before sibling. Placements
//!    append their host node to the parent's; updates apply the prop diff
//!    between the alternate and the fiber.
//! 3. The new tree becomes current and the previous tree is freed.
//!
//! Removed host nodes are handed to [`HostAdapter::discard_node`] once they
//! are out of the tree.
//!
//! There is no staging: a commit that fails halfway leaves the removals and
//! prop writes that got through in the host. The committed tree is updated to
//! match them, nodes appended by the failed commit are taken out again, and
//! the engine abandons the pass. The next render diffs against a tree that
//! describes the host as it is.

use tracing::{debug, trace, warn};

use crate::element::ElementType;
use crate::error::{EngineError, Result};
use crate::fiber::{EffectTag, FiberId};
use crate::host::{HostAdapter, HostError, NodeHandle};
use crate::reconciler::{apply_mutation, diff_props, replay_patch, PropPatch};
use crate::scheduler::Engine;

/// One effect applied by a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedEffect {
    pub fiber: FiberId,
    pub element_type: Option<ElementType>,
    pub tag: EffectTag,
    /// Host calls issued for this effect.
    pub mutations: usize,
}

/// Summary of a commit, in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub effects: Vec<CommittedEffect>,
}

impl CommitReport {
    /// Number of effects with the given tag.
    pub fn count(&self, tag: EffectTag) -> usize {
        self.effects.iter().filter(|e| e.tag == tag).count()
    }

    pub fn placements(&self) -> usize {
        self.count(EffectTag::Placement)
    }

    pub fn updates(&self) -> usize {
        self.count(EffectTag::Update)
    }

    pub fn deletions(&self) -> usize {
        self.count(EffectTag::Deletion)
    }

    /// Total host calls issued by the commit.
    pub fn host_mutations(&self) -> usize {
        self.effects.iter().map(|e| e.mutations).sum()
    }

    /// Tag applied to the first fiber of the given type, if any.
    pub fn tag_of(&self, ty: &ElementType) -> Option<EffectTag> {
        self.effects
            .iter()
            .find(|e| e.element_type.as_ref() == Some(ty))
            .map(|e| e.tag)
    }

    fn push(&mut self, fiber: FiberId, element_type: Option<ElementType>, tag: EffectTag, mutations: usize) {
        self.effects.push(CommittedEffect {
            fiber,
            element_type,
            tag,
            mutations,
        });
    }
}

/// Effects that reached the host during a commit.
#[derive(Debug, Default)]
struct Landed {
    /// Deletions whose host node was removed.
    removed: Vec<FiberId>,
    /// Placements whose host node was appended.
    appended: Vec<FiberId>,
    /// Updates whose whole patch was applied.
    updated: Vec<FiberId>,
    /// The update that failed midway, with the mutations that got through.
    partial: Option<(FiberId, PropPatch)>,
}

impl<H: HostAdapter> Engine<H> {
    /// Apply the finished work-in-progress tree and make it current.
    ///
    /// On failure the committed tree is brought in line with the host before
    /// the error is returned: removed fibers are unlinked and freed, applied
    /// prop writes are folded into the alternates, and appended placements
    /// are taken out of the host again.
    pub(crate) fn commit_root(&mut self) -> Result<CommitReport> {
        let Some(root) = self.wip_root else {
            return Ok(CommitReport::default());
        };
        let mut report = CommitReport::default();
        let mut landed = Landed::default();

        if let Err(err) = self.apply_effects(root, &mut report, &mut landed) {
            self.realign_committed_tree(&landed);
            return Err(err);
        }

        let previous = self.current_root.replace(root);
        self.wip_root = None;
        if let Some(previous) = previous {
            let freed = self.fibers.remove_subtree(previous).len();
            trace!(freed, "released previous tree");
        }

        debug!(
            placements = report.placements(),
            updates = report.updates(),
            deletions = report.deletions(),
            mutations = report.host_mutations(),
            "committed"
        );
        Ok(report)
    }

    fn apply_effects(
        &mut self,
        root: FiberId,
        report: &mut CommitReport,
        landed: &mut Landed,
    ) -> Result<()> {
        for index in 0..self.deletions.len() {
            let id = self.deletions[index];
            self.commit_deletion(id, report, landed)?;
        }
        self.deletions.clear();

        let mut stack: Vec<FiberId> = self.fibers[root].child.into_iter().collect();
        while let Some(id) = stack.pop() {
            self.commit_work(id, report, landed)?;
            let fiber = &self.fibers[id];
            stack.extend(fiber.sibling);
            stack.extend(fiber.child);
        }
        Ok(())
    }

    fn commit_deletion(
        &mut self,
        id: FiberId,
        report: &mut CommitReport,
        landed: &mut Landed,
    ) -> Result<()> {
        let tag = self.fibers[id].take_effect();
        debug_assert_eq!(tag, EffectTag::Deletion);
        let node = self.expect_host_node(id);
        let parent = self.parent_host_node(id);

        self.host
            .remove_child(parent, node)
            .map_err(|source| commit_error(id, report.host_mutations(), source))?;
        landed.removed.push(id);
        self.host.discard_node(node);
        report.push(id, self.fibers[id].ty.clone(), EffectTag::Deletion, 1);
        Ok(())
    }

    fn commit_work(
        &mut self,
        id: FiberId,
        report: &mut CommitReport,
        landed: &mut Landed,
    ) -> Result<()> {
        let tag = self.fibers[id].take_effect();
        let mutations = match tag {
            EffectTag::Placement => {
                let node = self.expect_host_node(id);
                let parent = self.parent_host_node(id);
                self.host
                    .append_child(parent, node)
                    .map_err(|source| commit_error(id, report.host_mutations(), source))?;
                landed.appended.push(id);
                1
            }
            EffectTag::Update => {
                let node = self.expect_host_node(id);
                let fiber = &self.fibers[id];
                let patch = match fiber.alternate.and_then(|alt| self.fibers.get(alt)) {
                    Some(alternate) => diff_props(&alternate.props, &fiber.props),
                    None => panic!("updated fiber {id:?} lost its alternate before commit"),
                };
                for (index, mutation) in patch.iter().enumerate() {
                    if let Err(source) = apply_mutation(&mut self.host, node, mutation) {
                        landed.partial = Some((id, patch[..index].iter().cloned().collect()));
                        return Err(commit_error(id, report.host_mutations() + index, source));
                    }
                }
                landed.updated.push(id);
                patch.len()
            }
            EffectTag::None | EffectTag::Deletion => return Ok(()),
        };
        report.push(id, self.fibers[id].ty.clone(), tag, mutations);
        Ok(())
    }

    /// Make the committed tree describe the host again after a failed commit.
    fn realign_committed_tree(&mut self, landed: &Landed) {
        for &id in &landed.removed {
            self.fibers.unlink(id);
            self.fibers.remove_subtree(id);
        }

        for &id in &landed.updated {
            if let Some(alternate) = self.fibers[id].alternate {
                let props = self.fibers[id].props.clone();
                self.fibers[alternate].props = props;
            }
        }
        if let Some((id, applied)) = &landed.partial {
            if let Some(alternate) = self.fibers[*id].alternate {
                replay_patch(&mut self.fibers[alternate].props, applied);
            }
        }

        let mut withdrawn = 0;
        for &id in &landed.appended {
            let Some(parent) = self.fibers[id].parent else {
                continue;
            };
            // Placements nested in another placement leave with it.
            let parent_fiber = &self.fibers[parent];
            if !parent_fiber.is_root() && parent_fiber.alternate.is_none() {
                continue;
            }
            let (parent_node, node) = (self.expect_host_node(parent), self.expect_host_node(id));
            match self.host.remove_child(parent_node, node) {
                Ok(()) => withdrawn += 1,
                Err(err) => warn!(fiber = ?id, error = %err, "could not withdraw placed node"),
            }
        }

        debug!(
            removed = landed.removed.len(),
            updated = landed.updated.len() + usize::from(landed.partial.is_some()),
            withdrawn,
            "realigned committed tree after failed commit"
        );
    }

    fn expect_host_node(&self, id: FiberId) -> NodeHandle {
        match self.fibers[id].host_node {
            Some(node) => node,
            None => panic!("fiber {id:?} reached commit without a host node"),
        }
    }

    fn parent_host_node(&self, id: FiberId) -> NodeHandle {
        match self.fibers[id].parent {
            Some(parent) => self.expect_host_node(parent),
            None => panic!("fiber {id:?} reached commit without a parent"),
        }
    }
}

fn commit_error(fiber: FiberId, applied: usize, source: HostError) -> EngineError {
    EngineError::Commit {
        fiber,
        applied,
        source,
    }
}
