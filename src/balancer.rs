//! Distributing weighted test units across parallel nodes.
//!
//! The balancer uses greedy Longest Processing Time first (LPT) list
//! scheduling:
//!
//! 1. **Sort** units by duration, longest first (ties by identifier).
//! 2. **Assign** each unit to the node with the smallest running total
//!    (ties to the lowest node index).
//!
//! Placing the largest units first keeps a late, large unit from landing on
//! an already loaded node. The resulting makespan is within
//! `4/3 - 1/(3N)` of optimal. It is not optimal, and does not try to be.
//!
//! # Example
//!
//! ```
//! use split_test::balancer::Balancer;
//! use split_test::timing::TimingMap;
//!
//! let mut timings = TimingMap::new();
//! for (id, seconds) in [("a", 5.0), ("b", 4.0), ("c", 3.0), ("d", 2.0)] {
//!     timings.record(id, seconds)?;
//! }
//!
//! let nodes = Balancer::new(2)?.balance(&timings);
//! assert_eq!(nodes[0].units(), ["a", "d"]);
//! assert_eq!(nodes[1].units(), ["b", "c"]);
//! assert_eq!(nodes[0].total(), 7.0);
//! # Ok::<(), split_test::SplitError>(())
//! ```

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{SplitError, SplitResult};
use crate::timing::TimingMap;

/// Units assigned to one parallel node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    units: Vec<String>,
    total: f64,
}

impl Node {
    fn assign(&mut self, id: &str, seconds: f64) {
        self.units.push(id.to_string());
        self.total += seconds;
    }

    /// Unit identifiers in assignment order.
    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Sum of the assigned durations, in seconds.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

/// Greedy LPT balancer for a fixed number of nodes.
pub struct Balancer {
    node_count: usize,
}

impl Balancer {
    /// Creates a balancer for `node_count` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidArgument`] if `node_count` is zero.
    pub fn new(node_count: usize) -> SplitResult<Self> {
        if node_count == 0 {
            return Err(SplitError::invalid("node count must be at least 1"));
        }
        Ok(Self { node_count })
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Partitions `timings` across the nodes.
    ///
    /// Always returns exactly `node_count` nodes. Nodes beyond the number of
    /// units stay empty. The output depends only on the input, never on
    /// hash order or previous calls.
    pub fn balance(&self, timings: &TimingMap) -> Vec<Node> {
        let mut units: Vec<(&str, f64)> = timings.iter().collect();
        units.sort_by(|(a_id, a_secs), (b_id, b_secs)| {
            b_secs.total_cmp(a_secs).then_with(|| a_id.cmp(b_id))
        });

        let mut nodes: Vec<Node> = (0..self.node_count).map(|_| Node::default()).collect();

        for (id, seconds) in units {
            let lightest = lightest_node(&nodes);
            nodes[lightest].assign(id, seconds);
        }

        nodes
    }
}

/// Convenience wrapper around [`Balancer::new`] and [`Balancer::balance`].
pub fn balance(timings: &TimingMap, node_count: usize) -> SplitResult<Vec<Node>> {
    Ok(Balancer::new(node_count)?.balance(timings))
}

/// Index of the node with the smallest total; the first one on ties.
fn lightest_node(nodes: &[Node]) -> usize {
    let mut best = 0;
    for (idx, node) in nodes.iter().enumerate().skip(1) {
        if node.total.total_cmp(&nodes[best].total) == Ordering::Less {
            best = idx;
        }
    }
    best
}

/// How evenly load is spread across nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStats {
    /// Mean seconds per node.
    pub mean: f64,

    /// Per-node deviation from the mean, in percent, rounded to 0.1.
    pub deviations: Vec<f64>,

    /// Largest absolute deviation, in percent.
    pub max_deviation: f64,
}

impl LoadStats {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let total: f64 = nodes.iter().map(Node::total).sum();
        let mean = if nodes.is_empty() {
            0.0
        } else {
            total / nodes.len() as f64
        };

        let deviations: Vec<f64> = nodes
            .iter()
            .map(|node| {
                if mean > 0.0 {
                    ((node.total - mean) / mean * 1000.0).round() / 10.0
                } else {
                    0.0
                }
            })
            .collect();
        let max_deviation = deviations.iter().map(|d| d.abs()).fold(0.0, f64::max);

        Self {
            mean,
            deviations,
            max_deviation,
        }
    }
}
