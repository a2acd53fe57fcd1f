//!
//! Topology snapshot
//!
//! A [Topology] is read once from the backend and never refreshed. Take a new
//! one with [`Numa::topology`] to observe hot-plugged memory or CPUs.
use crate::backend::BackendKind;
use crate::numa::Numa;
use numa_bridge_utils::bitmask::CpuBitmask;
use std::fmt::Write;
use tracing::info;

const GIB: i64 = 1024 * 1024 * 1024;

/// One node of a [Topology].
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Node index.
    pub id: usize,
    /// Total memory in bytes, `-1` when unknown.
    pub size: i64,
    /// Free memory in bytes at capture time, `-1` when unknown.
    pub free: i64,
    /// CPUs local to this node.
    pub cpus: CpuBitmask,
    /// Distance to every node, indexed by node.
    pub distances: Vec<i32>,
}

///
/// Nodes, CPUs and memory as seen by the backend at one point in time.
#[derive(Debug, Clone)]
pub struct Topology {
    kind: BackendKind,
    num_cpus: usize,
    nodes: Vec<NodeInfo>,
}

impl Topology {
    pub(crate) fn capture(numa: &Numa) -> Self {
        let api = numa.api();
        let num_nodes = numa.num_nodes();

        let nodes = (0..num_nodes as i32)
            .map(|node| {
                let mut cpus = numa.new_cpu_bitmask();
                api.node_to_cpus(node, &mut cpus);
                NodeInfo {
                    id: node as usize,
                    size: api.node_size(node),
                    free: api.free_size(node),
                    cpus,
                    distances: (0..num_nodes as i32)
                        .map(|other| api.distance(node, other))
                        .collect(),
                }
            })
            .collect();

        Topology {
            kind: numa.kind(),
            num_cpus: numa.num_cpus(),
            nodes,
        }
    }

    /// Backend the snapshot was read from.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Number of CPUs addressable by the process.
    pub fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Every node, in index order.
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    /// Node `id`, if it exists.
    pub fn node(&self, id: usize) -> Option<&NodeInfo> {
        self.nodes.get(id)
    }

    /// First node whose CPU set contains `cpu`.
    pub fn node_of_cpu(&self, cpu: usize) -> Option<usize> {
        self.nodes
            .iter()
            .find(|node| node.cpus.is_set(cpu))
            .map(|node| node.id)
    }

    /// Writes the snapshot to the `info` log.
    pub fn log(&self) {
        info!(
            "numa-bridge: {} topology: {} node(s), {} cpu(s)",
            self.kind,
            self.num_nodes(),
            self.num_cpus
        );
        for node in &self.nodes {
            info!(
                "numa-bridge:   node {}: cpus [{}], {} GiB, distances {:?}",
                node.id,
                node.cpus,
                gib(node.size),
                node.distances
            );
        }
    }

    /// Human readable summary, one line per node.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "NUMA ({}): {} node(s), {} cpu(s)",
            self.kind,
            self.num_nodes(),
            self.num_cpus
        );
        for node in &self.nodes {
            let _ = write!(
                s,
                "\n  node {}: {} cpu(s) [{}], {} GiB",
                node.id,
                node.cpus.count(),
                node.cpus,
                gib(node.size)
            );
        }
        s
    }
}

fn gib(bytes: i64) -> i64 {
    if bytes < 0 {
        bytes
    } else {
        bytes / GIB
    }
}
