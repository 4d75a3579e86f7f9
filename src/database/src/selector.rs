//! Nearest-node selection

use pgedge_shared::{Coordinate, DatabaseNode};
use tracing::debug;

use crate::geo::distance;
use crate::{Result, SelectionError};

/// A node paired with its distance from the client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedNode<'a> {
    pub node: &'a DatabaseNode,
    pub distance_km: f64,
}

/// Distance that never beats a real one
fn comparable(km: f64) -> f64 {
    if km.is_nan() {
        f64::INFINITY
    } else {
        km
    }
}

/// Return the node closest to `location`
///
/// Linear scan; a node only replaces the current candidate when it is
/// strictly closer, so the earliest node wins ties.
pub fn closest(nodes: &[DatabaseNode], location: Coordinate) -> Result<&DatabaseNode> {
    let (first, rest) = nodes.split_first().ok_or(SelectionError::EmptyNodeSet)?;

    let mut closest_node = first;
    let mut closest_distance = comparable(distance(location, first.location));

    for node in rest {
        let km = comparable(distance(location, node.location));
        if km < closest_distance {
            closest_node = node;
            closest_distance = km;
        }
    }

    debug!(
        "Closest node to {} is {} at {:.1} km",
        location,
        closest_node.label(),
        closest_distance
    );

    Ok(closest_node)
}

/// Every node with its distance, nearest first
///
/// The sort is stable so equal distances keep input order, and the head of
/// the list is always the node `closest` returns.
pub fn rank(nodes: &[DatabaseNode], location: Coordinate) -> Vec<RankedNode<'_>> {
    let mut ranked: Vec<RankedNode<'_>> = nodes
        .iter()
        .map(|node| RankedNode {
            node,
            distance_km: distance(location, node.location),
        })
        .collect();

    ranked.sort_by(|a, b| {
        comparable(a.distance_km).total_cmp(&comparable(b.distance_km))
    });

    ranked
}
