//! Flow resolution between a group and the groups of an adjacent time step.

use crate::store::LifeCycle;
use crate::types::{Branch, Direction, Flow, GroupSet, LifecycleResult};

impl LifeCycle {
    /// Intersections of `target` with every group one step away in `direction`.
    ///
    /// Branches smaller than `min_branch_size` are dropped. A group at the
    /// first (last) time step has an empty backward (forward) flow.
    pub fn group_flow(
        &self,
        target: &str,
        direction: Direction,
        min_branch_size: usize,
    ) -> LifecycleResult<Flow> {
        let tid = self.tid_of(target)?;
        let target_set = self.group_ref(target)?;

        let mut branches = Vec::new();
        if let Some(adjacent) = direction.adjacent(tid, self.temporal_ids().len()) {
            for name in self.get_partition_at(adjacent) {
                let elements: GroupSet = target_set
                    .intersection(self.group_ref(name)?)
                    .cloned()
                    .collect();
                if elements.len() >= min_branch_size {
                    branches.push(Branch {
                        group: name.clone(),
                        elements,
                    });
                }
            }
        }

        Ok(Flow {
            target: target.to_string(),
            direction,
            branches,
        })
    }

    /// Flow of every group, ordered by temporal id then partition order.
    pub fn all_flows(
        &self,
        direction: Direction,
        min_branch_size: usize,
    ) -> LifecycleResult<Vec<Flow>> {
        let flows = self
            .group_ids()
            .iter()
            .map(|name| self.group_flow(name, direction, min_branch_size))
            .collect::<LifecycleResult<Vec<_>>>()?;

        tracing::debug!(
            "Resolved {} {} flows (min branch size {})",
            flows.len(),
            direction,
            min_branch_size
        );
        Ok(flows)
    }

    /// Full member sets of the groups named in a flow, in branch order.
    pub(crate) fn flow_references(&self, flow: &Flow) -> LifecycleResult<Vec<&GroupSet>> {
        flow.names().map(|name| self.group_ref(name)).collect()
    }
}
