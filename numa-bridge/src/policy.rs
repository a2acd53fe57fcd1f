//!
//! Thread placement policies
//!
//! Named combinations of the placement mutators, applied to the calling
//! thread in one call.
use crate::error::Result;
use crate::numa::Numa;
use std::fmt::{self, Display, Formatter};

/// Where the calling thread runs and allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Local allocation on any node. This is the state of a fresh thread.
    Default,
    /// Allocates on the node the thread runs on, leaving its CPUs as they are.
    LocalAlloc,
    /// Allocates on the given node while it has free memory.
    PreferredNode(usize),
    /// Runs only on the CPUs of the given node.
    BoundToNode(usize),
    /// Runs on the CPUs of every node.
    BoundToAllNodes,
}

impl AllocationPolicy {
    /// Applies this policy to the calling thread.
    pub fn apply(self, numa: &Numa) -> Result<()> {
        match self {
            AllocationPolicy::Default => {
                numa.set_local_alloc();
                numa.run_on_all_nodes();
            }
            AllocationPolicy::LocalAlloc => numa.set_local_alloc(),
            AllocationPolicy::PreferredNode(node) => numa.set_preferred(node)?,
            AllocationPolicy::BoundToNode(node) => numa.run_on_node(node)?,
            AllocationPolicy::BoundToAllNodes => numa.run_on_all_nodes(),
        }
        Ok(())
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::Default
    }
}

impl Display for AllocationPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AllocationPolicy::Default => f.write_str("default"),
            AllocationPolicy::LocalAlloc => f.write_str("local"),
            AllocationPolicy::PreferredNode(node) => write!(f, "preferred({})", node),
            AllocationPolicy::BoundToNode(node) => write!(f, "bound({})", node),
            AllocationPolicy::BoundToAllNodes => f.write_str("bound(all)"),
        }
    }
}
