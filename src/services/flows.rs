use crate::catalog::Catalog;
use crate::models::fleet::{Device, EdgeType, FlowEdge, Status};
use crate::utils::truncate_count;
use rand::Rng;
use rand::rngs::StdRng;

pub const WAREHOUSE_NODE: &str = "Warehouse";

/// Distinct zones in first-seen roster order.
pub fn distinct_zones(devices: &[Device]) -> Vec<&str> {
    let mut zones: Vec<&str> = Vec::new();
    for device in devices {
        if !zones.contains(&device.zone.as_str()) {
            zones.push(device.zone.as_str());
        }
    }
    zones
}

/// Warehouse -> Zone dispatch edges followed by Zone -> Status edges.
///
/// Noise is applied per status edge, so a zone's four status counts need not add up to its total.
pub fn synthesize(catalog: &Catalog, devices: &[Device], rng: &mut StdRng) -> Vec<FlowEdge> {
    let zones = distinct_zones(devices);
    let mut edges = Vec::with_capacity(zones.len() * (1 + Status::ALL.len()));

    for zone in &zones {
        edges.push(FlowEdge {
            src: WAREHOUSE_NODE.to_string(),
            trg: zone.to_string(),
            count: rng.random_range(50..200),
            edge_type: EdgeType::Dispatch,
        });
    }

    for zone in &zones {
        let total = rng.random_range(30..150) as f64;
        for (status, weight) in Status::ALL.iter().zip(catalog.zone_status_weights) {
            edges.push(FlowEdge {
                src: zone.to_string(),
                trg: status.label().to_string(),
                count: truncate_count(total * weight * rng.random_range(0.8..1.2)),
                edge_type: EdgeType::Status,
            });
        }
    }
    edges
}
