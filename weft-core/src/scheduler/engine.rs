//! The reconciliation engine.
//!
//! [`Engine`] owns every piece of state that survives between idle ticks:
//! the fiber arena, the committed and in-progress roots, the next unit of
//! work, and the deletions queue. Nothing is global, so independent engines
//! can coexist (one per container, one per test).

use tracing::{debug, trace};

use super::deadline::{Deadline, FixedDeadline};
use crate::commit::CommitReport;
use crate::config::{ConfigError, EngineConfig};
use crate::element::Element;
use crate::error::Result;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};
use crate::host::{HostAdapter, NodeHandle};

/// What a single call to [`Engine::work_loop`] did.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Fibers processed during this tick.
    pub units_performed: usize,

    /// Set when the pass completed and was committed during this tick.
    pub committed: Option<CommitReport>,

    /// Whether a pass is still in progress after this tick.
    pub pending: bool,
}

/// Incremental reconciler bound to one host adapter.
///
/// # Example
///
/// ```rust
/// use weft_core::{create_element, Engine, MemoryHost, Props};
///
/// let mut host = MemoryHost::new();
/// let container = host.create_container("root");
/// let mut engine = Engine::new(host);
///
/// engine.render(create_element("p", Props::new(), vec!["hi".into()]), container);
/// engine.flush_sync().unwrap();
///
/// assert_eq!(engine.host().serialize(container), "<root><p>hi</p></root>");
/// ```
#[derive(Debug)]
pub struct Engine<H: HostAdapter> {
    pub(crate) host: H,
    pub(crate) config: EngineConfig,
    pub(crate) fibers: FiberArena,

    /// Root of the last committed tree.
    pub(crate) current_root: Option<FiberId>,

    /// Root of the tree being built.
    pub(crate) wip_root: Option<FiberId>,

    pub(crate) next_unit: Option<FiberId>,

    /// Old fibers whose host nodes must be removed by the next commit.
    pub(crate) deletions: Vec<FiberId>,

    pub(crate) last_commit: Option<CommitReport>,
}

impl<H: HostAdapter> Engine<H> {
    /// Create an engine with the default configuration.
    pub fn new(host: H) -> Self {
        Self::build(host, EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    ///
    /// Fails if the configuration does not pass [`EngineConfig::validate`].
    pub fn with_config(host: H, config: EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(host, config))
    }

    fn build(host: H, config: EngineConfig) -> Self {
        Self {
            host,
            config,
            fibers: FiberArena::new(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            last_commit: None,
        }
    }

    /// Start a new pass rendering `element` into `container`.
    ///
    /// A pass that has not committed yet is abandoned; the committed tree is
    /// never affected. No work happens until the next call to
    /// [`work_loop`](Self::work_loop).
    pub fn render(&mut self, element: Element, container: NodeHandle) {
        if self.wip_root.is_some() {
            debug!("render superseded an unfinished pass");
            self.abandon_work_in_progress();
        }

        let root = self
            .fibers
            .insert(Fiber::root(container, element, self.current_root));
        self.wip_root = Some(root);
        self.deletions.clear();
        self.next_unit = Some(root);
        debug!(root = ?root, container = container.raw(), "render scheduled");
    }

    /// Run units of work until the pass completes or the deadline says to
    /// yield, then commit if the pass is complete.
    ///
    /// At least one unit is performed per call while work is pending, so a
    /// host that only ever offers tiny budgets still makes progress. The
    /// deadline is consulted before every further unit.
    ///
    /// On error the pass is abandoned and the committed tree stays current.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<TickOutcome> {
        let mut units = 0;

        while let Some(id) = self.next_unit {
            if units > 0 && deadline.time_remaining_ms() < self.config.yield_threshold_ms {
                trace!(units, "yielding to host");
                break;
            }
            match self.perform_unit_of_work(id) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    self.abandon_work_in_progress();
                    return Err(err);
                }
            }
            units += 1;
        }

        let mut committed = None;
        if self.next_unit.is_none() && self.wip_root.is_some() {
            match self.commit_root() {
                Ok(report) => {
                    self.last_commit = Some(report.clone());
                    committed = Some(report);
                }
                Err(err) => {
                    self.abandon_work_in_progress();
                    return Err(err);
                }
            }
        }

        Ok(TickOutcome {
            units_performed: units,
            committed,
            pending: self.wip_root.is_some(),
        })
    }

    /// Run the pending pass to completion and commit it.
    ///
    /// Returns `None` when nothing was pending.
    pub fn flush_sync(&mut self) -> Result<Option<CommitReport>> {
        let outcome = self.work_loop(&FixedDeadline::unbounded())?;
        Ok(outcome.committed)
    }

    /// Drop the in-progress tree without touching the host tree.
    ///
    /// Deletion tags set by the abandoned pass are cleared from the old
    /// fibers. Host nodes created for placements are handed to
    /// [`HostAdapter::discard_node`] unless disabled in the config.
    pub fn abandon_work_in_progress(&mut self) {
        let Some(root) = self.wip_root.take() else {
            return;
        };
        self.next_unit = None;

        for id in self.deletions.drain(..) {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.effect_tag = EffectTag::None;
            }
        }

        let removed = self.fibers.remove_subtree(root);
        let mut discarded = 0;
        if self.config.discard_abandoned_nodes {
            for fiber in &removed {
                // Roots borrow the container and updates borrow committed
                // nodes; only placements own what they created.
                if fiber.is_root() || fiber.alternate.is_some() {
                    continue;
                }
                if let Some(node) = fiber.host_node {
                    self.host.discard_node(node);
                    discarded += 1;
                }
            }
        }
        debug!(freed = removed.len(), discarded, "abandoned work-in-progress tree");
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fibers(&self) -> &FiberArena {
        &self.fibers
    }

    /// Look up a live fiber.
    pub fn fiber(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    pub fn work_in_progress_root(&self) -> Option<FiberId> {
        self.wip_root
    }

    pub fn next_unit_of_work(&self) -> Option<FiberId> {
        self.next_unit
    }

    /// Fibers queued for deletion by the in-progress pass.
    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    /// Whether a pass is waiting to be finished or committed.
    pub fn has_pending_work(&self) -> bool {
        self.wip_root.is_some()
    }

    /// Report of the most recent successful commit.
    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.last_commit.as_ref()
    }

    /// Consume the engine, returning its host.
    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{create_element, Props};
    use crate::host::{HostCall, MemoryHost};
    use std::cell::Cell;

    fn setup() -> (Engine<MemoryHost>, NodeHandle) {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        (Engine::new(host), container)
    }

    fn list(n: usize) -> Element {
        create_element(
            "ul",
            Props::new(),
            (0..n).map(|i| create_element("li", Props::new(), vec![Element::from(i as i64)])),
        )
    }

    #[test]
    fn render_prepares_root_without_doing_work() {
        let (mut engine, container) = setup();
        engine.render(list(2), container);

        let root = engine.work_in_progress_root().unwrap();
        assert_eq!(engine.next_unit_of_work(), Some(root));
        assert_eq!(engine.fiber(root).unwrap().host_node(), Some(container));
        assert!(engine.current_root().is_none());
        assert!(engine.host().calls().is_empty());
    }

    #[test]
    fn expired_deadline_performs_one_unit_per_tick() {
        let (mut engine, container) = setup();
        // root, ul, 3 x li, 3 x text
        engine.render(list(3), container);

        let mut ticks = 0;
        loop {
            let outcome = engine.work_loop(&FixedDeadline::expired()).unwrap();
            ticks += 1;
            if outcome.committed.is_some() {
                assert_eq!(outcome.units_performed, 1);
                break;
            }
            assert_eq!(outcome.units_performed, 1);
            assert!(outcome.pending);
        }
        assert_eq!(ticks, 8);
        assert!(!engine.has_pending_work());
    }

    #[test]
    fn deadline_is_checked_between_units() {
        let (mut engine, container) = setup();
        engine.render(list(3), container);

        // Reports 2ms, then 1ms, then 0ms: two more units after the first.
        let budget = Cell::new(2.0);
        let deadline = || {
            let remaining = budget.get() - 1.0;
            budget.set(remaining);
            remaining + 1.0
        };
        let outcome = engine.work_loop(&deadline).unwrap();
        assert_eq!(outcome.units_performed, 3);
        assert!(outcome.pending);
        assert!(outcome.committed.is_none());
    }

    #[test]
    fn interrupted_pass_leaves_visited_fibers_linked() {
        let (mut engine, container) = setup();
        engine.render(list(3), container);
        engine.work_loop(&FixedDeadline::expired()).unwrap();
        engine.work_loop(&FixedDeadline::expired()).unwrap();

        // root and ul processed: ul's children are fully linked.
        let root = engine.work_in_progress_root().unwrap();
        let ul = engine.fiber(root).unwrap().child().unwrap();
        let items: Vec<_> = engine.fibers().children(ul).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(engine.next_unit_of_work(), Some(items[0]));
        for item in &items {
            assert_eq!(engine.fiber(*item).unwrap().parent(), Some(ul));
        }
        // Nothing reaches the host tree before commit.
        assert_eq!(engine.host().serialize(container), "<root></root>");
    }

    #[test]
    fn idle_ticks_without_render_are_noops() {
        let (mut engine, _) = setup();
        let outcome = engine.work_loop(&FixedDeadline::unbounded()).unwrap();
        assert_eq!(outcome.units_performed, 0);
        assert!(outcome.committed.is_none());
        assert!(!outcome.pending);
        assert_eq!(engine.flush_sync().unwrap(), None);
    }

    #[test]
    fn second_render_abandons_unfinished_pass() {
        let (mut engine, container) = setup();
        engine.render(list(2), container);
        engine.work_loop(&FixedDeadline::expired()).unwrap();
        engine.work_loop(&FixedDeadline::expired()).unwrap();
        let abandoned_root = engine.work_in_progress_root().unwrap();

        // The ul host node was created by the abandoned pass.
        let created: Vec<_> = engine
            .host()
            .calls()
            .iter()
            .filter_map(|c| match c {
                HostCall::CreateNode { node, .. } => Some(*node),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 1);

        engine.render(create_element("p", Props::new(), vec![]), container);
        assert!(engine.fiber(abandoned_root).is_none());
        assert!(!engine.host().contains(created[0]));

        engine.flush_sync().unwrap();
        assert_eq!(engine.host().serialize(container), "<root><p></p></root>");
    }

    #[test]
    fn abandoned_nodes_are_kept_when_discarding_is_disabled() {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        let config = EngineConfig {
            discard_abandoned_nodes: false,
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_config(host, config).unwrap();

        engine.render(list(1), container);
        engine.work_loop(&FixedDeadline::expired()).unwrap();
        engine.work_loop(&FixedDeadline::expired()).unwrap();
        engine.abandon_work_in_progress();

        assert!(!engine
            .host()
            .calls()
            .iter()
            .any(|c| matches!(c, HostCall::DiscardNode { .. })));
        assert!(!engine.has_pending_work());
    }

    #[test]
    fn committed_trees_are_freed_after_the_next_commit() {
        let (mut engine, container) = setup();
        engine.render(list(2), container);
        engine.flush_sync().unwrap();
        let first_root = engine.current_root().unwrap();
        let live_after_first = engine.fibers().len();

        engine.render(list(2), container);
        engine.flush_sync().unwrap();

        assert!(engine.fiber(first_root).is_none());
        assert_eq!(engine.fibers().len(), live_after_first);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            yield_threshold_ms: f64::NAN,
            ..EngineConfig::default()
        };
        let result = Engine::with_config(MemoryHost::new(), config);
        assert!(matches!(result, Err(ConfigError::InvalidYieldThreshold(_))));

        let config = EngineConfig {
            yield_threshold_ms: -1.0,
            ..EngineConfig::default()
        };
        assert!(Engine::with_config(MemoryHost::new(), config).is_err());
    }
}
