//! Deterministic reconciliation of position sets across devices
//!
//! Positions are keyed by commitment and merged last-writer-wins on the
//! creation timestamp. Ties resolve to the local copy so a device's own
//! in-flight updates are never clobbered by an equal-aged remote copy.

use common::types::position::Position;
use indexmap::IndexMap;

/// Merge a local position set with a remote one
///
/// The result is deterministic for a given pair of inputs: remote entries
/// keep their order, with local-only entries appended in local order.
pub fn merge_positions(local: &[Position], remote: &[Position]) -> Vec<Position> {
    let mut merged: IndexMap<String, Position> = remote
        .iter()
        .map(|p| (p.commitment.clone(), p.clone()))
        .collect();

    for position in local {
        match merged.get(&position.commitment) {
            Some(existing) if position.timestamp < existing.timestamp => {},
            _ => {
                merged.insert(position.commitment.clone(), position.clone());
            },
        }
    }

    merged.into_values().collect()
}
