//! Greedy topological ordering of one group's modules.

use rustc_hash::FxHashSet;

use super::{ScheduledModule, SetupError, StuckModule, StuckModules};
use crate::types::{DataKind, GroupKind};

/// Resolves the execution order for one cycle.
///
/// Repeated scan passes over the unsorted set: a module moves to the sorted
/// list once every one of its dependencies is satisfied, meaning produced by
/// an already-sorted module or present in `satisfied` from the start (the
/// cross-group requests). Productions of a sorted module become satisfied
/// immediately, so later modules of the same pass can ride on them. Modules
/// are appended in discovery order within a pass; there is no other
/// tie-break, which keeps the order deterministic for a fixed registration
/// order.
///
/// A full pass without progress while modules remain means the local graph
/// has a cycle (every externally-producible kind is already in `satisfied`),
/// which is a fatal setup error reporting the stuck modules and their unmet
/// kinds.
pub(crate) fn resolve_order(
    mut unsorted: Vec<ScheduledModule>,
    mut satisfied: FxHashSet<DataKind>,
    group: GroupKind,
) -> Result<Vec<ScheduledModule>, SetupError> {
    let mut sorted: Vec<ScheduledModule> = Vec::with_capacity(unsorted.len());

    loop {
        let before = unsorted.len();
        let mut remaining = Vec::with_capacity(unsorted.len());

        for entry in unsorted {
            let runnable = entry
                .descriptor
                .dependencies()
                .iter()
                .all(|kind| satisfied.contains(kind));
            if runnable {
                satisfied.extend(entry.descriptor.productions().iter().copied());
                sorted.push(entry);
            } else {
                remaining.push(entry);
            }
        }

        unsorted = remaining;
        if unsorted.is_empty() {
            return Ok(sorted);
        }
        if unsorted.len() == before {
            let stuck = unsorted
                .iter()
                .map(|entry| {
                    let mut missing: Vec<DataKind> = entry
                        .descriptor
                        .dependencies()
                        .iter()
                        .filter(|kind| !satisfied.contains(kind))
                        .copied()
                        .collect();
                    missing.sort();
                    StuckModule {
                        module: entry.descriptor.name().to_string(),
                        missing,
                    }
                })
                .collect();
            return Err(SetupError::UnsortableModules {
                group,
                stuck: StuckModules(stuck),
            });
        }
    }
}
