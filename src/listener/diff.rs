//! Port-keyed comparison of desired and current listeners.

use std::collections::{BTreeMap, BTreeSet};

use crate::listener::spec::ListenerSpec;

/// Changes needed to converge one load balancer's listeners.
///
/// A port whose protocol changes appears in both `to_create` and
/// `to_delete`: the old listener has to go before the new one can exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerDiff {
    pub to_create: Vec<ListenerSpec>,
    pub to_update: Vec<ListenerSpec>,
    pub to_delete: Vec<u16>,
}

impl ListenerDiff {
    /// Compare `desired` against `current`. Outputs are sorted by port.
    pub fn compute(desired: &[ListenerSpec], current: &[ListenerSpec]) -> Self {
        let current_by_port: BTreeMap<u16, &ListenerSpec> =
            current.iter().map(|l| (l.listener_port, l)).collect();
        let desired_by_port: BTreeMap<u16, &ListenerSpec> =
            desired.iter().map(|l| (l.listener_port, l)).collect();

        let mut diff = ListenerDiff::default();

        for (port, want) in &desired_by_port {
            match current_by_port.get(port) {
                None => diff.to_create.push((*want).clone()),
                Some(have) if have.protocol() != want.protocol() => {
                    diff.to_delete.push(*port);
                    diff.to_create.push((*want).clone());
                }
                Some(have) if !want.is_satisfied_by(have) => diff.to_update.push((*want).clone()),
                Some(_) => {}
            }
        }

        for port in current_by_port.keys() {
            if !desired_by_port.contains_key(port) {
                diff.to_delete.push(*port);
            }
        }
        diff.to_delete.sort_unstable();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Ports being moved to a different protocol.
    pub fn replaced_ports(&self) -> BTreeSet<u16> {
        let deleted: BTreeSet<u16> = self.to_delete.iter().copied().collect();
        self.to_create
            .iter()
            .map(|l| l.listener_port)
            .filter(|p| deleted.contains(p))
            .collect()
    }
}
