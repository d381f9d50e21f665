//! Level balancing for homomorphic circuits.
//!
//! Every edge of a leveled circuit must connect a producer and a consumer
//! at the same level. The balancer walks the circuit backwards from nodes
//! whose output level is fixed (usually outputs), assigns levels to the
//! nodes it reaches, and repairs mismatched edges:
//!
//! ```text
//! producer level > required   splice  p -> ModReduce(p, required) -> n
//! producer level < required   raise p, re-enqueue it, re-check p's other consumers
//! producer level unassigned   assign the required level, enqueue p
//! ```
//!
//! Levels of operation nodes only ever go up during a pass, and reductions
//! are only inserted while the worklist drains, so every pass terminates.
//! Reductions that a later raise made pointless (input level equal to
//! output level) are removed once the worklist is empty.

mod pass;

use std::fmt;

use tracing::info;

use crate::circuit::CircuitGraph;
use crate::error::Result;

use pass::Pass;

/// Configuration for the balancer.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// Push levels fixed on inputs forward through unassigned arithmetic
    /// nodes before balancing from the outputs.
    pub propagate_inputs: bool,
    /// Remove reductions whose input and output levels ended up equal.
    pub collapse_noop_reductions: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            propagate_inputs: true,
            collapse_noop_reductions: true,
        }
    }
}

impl BalancerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable forward propagation of input levels.
    pub fn with_propagate_inputs(mut self, propagate_inputs: bool) -> Self {
        self.propagate_inputs = propagate_inputs;
        self
    }

    /// Enable or disable removal of no-op reductions.
    pub fn with_collapse_noop_reductions(mut self, collapse: bool) -> Self {
        self.collapse_noop_reductions = collapse;
        self
    }
}

/// What a balancing run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceReport {
    /// Worklist drains started
    pub passes: usize,
    /// Nodes dequeued and processed
    pub processed: usize,
    /// Previously unassigned nodes given a level
    pub assigned: usize,
    /// Nodes whose level was raised
    pub raised: usize,
    /// Reductions spliced into the circuit
    pub inserted: usize,
    /// Existing reductions adjusted in place
    pub widened: usize,
    /// No-op reductions removed
    pub collapsed: usize,
}

impl BalanceReport {
    /// Whether the run changed the circuit's structure.
    pub fn is_structural_noop(&self) -> bool {
        self.inserted == 0 && self.widened == 0 && self.collapsed == 0
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pass(es), {} processed, {} assigned, {} raised, {} reduction(s) inserted, {} widened, {} collapsed",
            self.passes,
            self.processed,
            self.assigned,
            self.raised,
            self.inserted,
            self.widened,
            self.collapsed
        )
    }
}

/// The level balancer.
#[derive(Debug, Clone, Default)]
pub struct LevelBalancer {
    config: BalancerConfig,
}

impl LevelBalancer {
    /// Create a balancer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a balancer with custom configuration.
    pub fn with_config(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Balance the whole circuit.
    ///
    /// Optionally propagates input levels forward, then drains one pass per
    /// designated output in order, then one per remaining assigned node that
    /// no output reaches. Every output must carry a target level.
    pub fn balance(&self, graph: &mut CircuitGraph) -> Result<BalanceReport> {
        let mut pass = Pass::new(graph);
        if self.config.propagate_inputs {
            pass.propagate_inputs()?;
        }

        for output in pass.graph.outputs().to_vec() {
            pass.seed(&output)?;
            pass.drain()?;
        }

        for name in pass.graph.topological_order()?.into_iter().rev() {
            let node = pass.graph.get(&name)?;
            if !node.operands.is_empty() && node.output_depth.is_some() && node.input_depth.is_none() {
                pass.seed(&name)?;
                pass.drain()?;
            }
        }

        self.finish(pass)
    }

    /// Balance the part of the circuit reachable backwards from `root`.
    ///
    /// `root` must already have an output level.
    pub fn balance_from(&self, graph: &mut CircuitGraph, root: &str) -> Result<BalanceReport> {
        let mut pass = Pass::new(graph);
        pass.seed(root)?;
        pass.drain()?;
        self.finish(pass)
    }

    fn finish(&self, mut pass: Pass<'_>) -> Result<BalanceReport> {
        if self.config.collapse_noop_reductions {
            pass.collapse_noop_reductions()?;
        }
        info!(report = %pass.report, nodes = pass.graph.len(), "balanced circuit");
        Ok(pass.report)
    }
}
