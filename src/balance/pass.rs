//! One balancing pass: worklist, depth propagation and graph rewrites.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use super::BalanceReport;
use crate::circuit::{CircuitGraph, Depth, NodeKind, OpNode};
use crate::error::{LevelerError, Result};

/// Mutable state of a balancing pass over one graph.
///
/// The pass holds the only reference to the graph while it runs. Nodes are
/// tracked by name, so splices and new nodes never invalidate the worklist.
pub(super) struct Pass<'g> {
    pub(super) graph: &'g mut CircuitGraph,
    queue: VecDeque<String>,
    queued: HashSet<String>,
    pub(super) report: BalanceReport,
}

impl<'g> Pass<'g> {
    pub(super) fn new(graph: &'g mut CircuitGraph) -> Self {
        Self {
            graph,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            report: BalanceReport::default(),
        }
    }

    /// Start a drain from `root`, whose output level must already be fixed.
    pub(super) fn seed(&mut self, root: &str) -> Result<()> {
        if self.graph.get(root)?.output_depth.is_none() {
            return Err(LevelerError::RootDepthUnassigned {
                node: root.to_string(),
            });
        }
        self.report.passes += 1;
        self.enqueue(root);
        Ok(())
    }

    /// Process nodes until the worklist is empty.
    pub(super) fn drain(&mut self) -> Result<()> {
        while let Some(name) = self.queue.pop_front() {
            self.queued.remove(&name);
            self.process_node_depth(&name)?;
        }
        Ok(())
    }

    fn enqueue(&mut self, name: &str) {
        if self.queued.insert(name.to_string()) {
            self.queue.push_back(name.to_string());
        }
    }

    /// Give unassigned arithmetic nodes the lowest level among their operands.
    ///
    /// Walks producers before consumers, so levels fixed on inputs flow
    /// forward through the circuit. Returns the number of nodes assigned.
    pub(super) fn propagate_inputs(&mut self) -> Result<usize> {
        let mut assigned = 0;
        for name in self.graph.topological_order()? {
            let node = self.graph.get(&name)?;
            if node.output_depth.is_some()
                || !matches!(node.kind, NodeKind::Add | NodeKind::Multiply | NodeKind::Negate)
            {
                continue;
            }
            let levels = node
                .distinct_operands()
                .iter()
                .map(|op| self.graph.get(op).map(|p| p.output_depth))
                .collect::<Result<Option<Vec<Depth>>>>()?;
            if let Some(level) = levels.and_then(|l| l.into_iter().min()) {
                self.graph.get_mut(&name)?.output_depth = Some(level);
                assigned += 1;
            }
        }
        debug!(assigned, "propagated input levels");
        self.report.assigned += assigned;
        Ok(assigned)
    }

    /// Fix the input level of `name` and reconcile it with each operand.
    fn process_node_depth(&mut self, name: &str) -> Result<()> {
        self.report.processed += 1;
        let node = self.graph.get(name)?;
        let required = match node.required_input() {
            Some(level) => level,
            None if node.output_depth.is_none() => {
                return Err(LevelerError::RootDepthUnassigned {
                    node: name.to_string(),
                })
            }
            // inputs
            None => return Ok(()),
        };
        let operands = node.distinct_operands();
        trace!(node = name, level = %required, "processing");
        self.graph.get_mut(name)?.input_depth = Some(required);

        for operand in operands {
            let produced = self.graph.get(&operand)?.output_depth;
            match produced {
                None => {
                    self.graph.get_mut(&operand)?.output_depth = Some(required);
                    self.report.assigned += 1;
                    trace!(node = %operand, level = %required, "assigned");
                    self.enqueue(&operand);
                }
                Some(produced) if produced > required => {
                    self.reduce(&operand, name, produced, required)?;
                }
                Some(produced) if produced < required => {
                    self.raise(&operand, name, produced, required)?;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Make `producer` (at `produced`) meet `consumer`'s lower requirement.
    fn reduce(&mut self, producer: &str, consumer: &str, produced: Depth, required: Depth) -> Result<()> {
        if self.graph.get(consumer)?.kind.is_reduction() {
            // The consumer already reduces: start it from the producer's level.
            self.graph.get_mut(consumer)?.input_depth = Some(produced);
            self.report.widened += 1;
            debug!(reduction = consumer, from = %produced, "widened reduction input");
            return Ok(());
        }

        let node = self.graph.get(producer)?;
        if node.kind.is_reduction() && node.consumers.len() == 1 && node.consumers.contains(consumer) {
            self.graph.get_mut(producer)?.output_depth = Some(required);
            self.report.widened += 1;
            debug!(reduction = producer, to = %required, "widened reduction output");
            return Ok(());
        }

        self.insert_reduction(producer, consumer, produced, required)
    }

    /// Splice `producer -> reduction -> consumer`.
    fn insert_reduction(&mut self, producer: &str, consumer: &str, from: Depth, to: Depth) -> Result<()> {
        let name = self.graph.fresh_name(NodeKind::LevelReduce.name_prefix());
        let mut reduction = OpNode::level_reduce(name.as_str(), producer, from, to);
        reduction.consumers.insert(consumer.to_string());

        self.graph.replace_operand(consumer, producer, &name)?;
        self.graph.add_node(reduction)?;
        let producer_node = self.graph.get_mut(producer)?;
        producer_node.consumers.remove(consumer);
        producer_node.consumers.insert(name.clone());

        self.report.inserted += 1;
        debug!(reduction = %name, producer, consumer, from = %from, to = %to, "inserted reduction");
        Ok(())
    }

    /// Lift `producer` from `current` to `required` for `consumer`, then
    /// re-check the producer's already processed consumers against the new
    /// level. A processed consumer that needs more than `required` and is
    /// not pending is a conflict.
    fn raise(&mut self, producer: &str, consumer: &str, current: Depth, required: Depth) -> Result<()> {
        let node = self.graph.get(producer)?;
        if node.pinned {
            return Err(LevelerError::PinnedDepth {
                node: producer.to_string(),
                consumer: consumer.to_string(),
                pinned: current,
                required,
            });
        }
        let others: Vec<String> = node
            .consumers
            .iter()
            .filter(|c| c.as_str() != consumer)
            .cloned()
            .collect();

        self.graph.get_mut(producer)?.output_depth = Some(required);
        self.report.raised += 1;
        debug!(node = producer, from = %current, to = %required, by = consumer, "raised level");
        self.enqueue(producer);

        for other in others {
            // Consumers not processed yet raise or reduce the producer themselves.
            let node = self.graph.get(&other)?;
            let needed = match (node.input_depth, node.required_input()) {
                (Some(_), Some(level)) => level,
                _ => continue,
            };
            if needed < required {
                self.reduce(producer, &other, required, needed)?;
            } else if needed > required && !self.queued.contains(&other) {
                return Err(LevelerError::DepthConflict {
                    producer: producer.to_string(),
                    consumers: vec![consumer.to_string(), other],
                    producer_depth: required,
                    required_depth: needed,
                });
            }
        }
        Ok(())
    }

    /// Remove reductions whose input and output levels ended up equal.
    ///
    /// Only runs once the worklist is drained.
    pub(super) fn collapse_noop_reductions(&mut self) -> Result<usize> {
        let noops: Vec<String> = self
            .graph
            .nodes()
            .filter(|n| n.kind.is_reduction() && n.required_input() == n.output_depth)
            .map(|n| n.name.clone())
            .collect();

        for name in &noops {
            let node = self.graph.get(name)?;
            let source = node
                .operands
                .first()
                .cloned()
                .ok_or_else(|| LevelerError::arity(name.as_str(), 1, 0))?;
            let consumers: Vec<String> = node.consumers.iter().cloned().collect();

            for consumer in &consumers {
                self.graph.replace_operand(consumer, name, &source)?;
                self.graph.get_mut(&source)?.consumers.insert(consumer.clone());
            }
            self.graph.get_mut(&source)?.consumers.remove(name);
            self.graph.get_mut(name)?.consumers.clear();
            self.graph.remove_node(name)?;
            debug!(reduction = %name, source = %source, "collapsed no-op reduction");
        }

        self.report.collapsed += noops.len();
        Ok(noops.len())
    }
}
