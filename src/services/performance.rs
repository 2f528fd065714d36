use crate::catalog::{Catalog, status_delivery_factor};
use crate::models::fleet::{Device, PerformanceRecord};
use crate::services::roster::days_since_maintenance;
use crate::utils::{normal, round1, truncate_count};
use chrono::NaiveDateTime;
use rand::Rng;
use rand::rngs::StdRng;

const UPTIME_BASELINE_PCT: f64 = 95.0;
const UPTIME_DECAY_DAYS_PER_POINT: f64 = 10.0;

/// One performance record per roster device, in roster order.
pub fn synthesize(catalog: &Catalog, devices: &[Device], reference: NaiveDateTime, rng: &mut StdRng) -> Vec<PerformanceRecord> {
    devices
        .iter()
        .map(|device| {
            let city_factor = catalog.profile(device.city).map(|p| p.delivery_factor).unwrap_or(1.0);
            let status_factor = status_delivery_factor(device.status);

            let base_deliveries = rng.random_range(5..50) as f64;
            // Truncated, not rounded.
            let total_deliveries =
                truncate_count(base_deliveries * city_factor * status_factor * rng.random_range(0.8..1.2));

            let avg_speed = normal(rng, 35.0, 10.0).clamp(10.0, 65.0);

            let maintenance_days = days_since_maintenance(device, reference) as f64;
            let uptime = UPTIME_BASELINE_PCT - maintenance_days / UPTIME_DECAY_DAYS_PER_POINT;
            let uptime = (uptime + normal(rng, 0.0, 3.0)).clamp(70.0, 99.0);

            let fuel_efficiency = round1(normal(rng, 8.5, 1.5));
            let distance_traveled = (total_deliveries as f64 * rng.random_range(5.0..15.0)).round() as u64;

            PerformanceRecord {
                device_id: device.device_id.clone(),
                total_deliveries,
                avg_speed: round1(avg_speed),
                uptime_percent: round1(uptime),
                fuel_efficiency,
                distance_traveled,
            }
        })
        .collect()
}
