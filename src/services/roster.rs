use crate::catalog::{Catalog, Distributions};
use crate::models::fleet::{Device, DeviceId, Status};
use crate::utils::normal;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::distr::Distribution;
use rand::rngs::StdRng;

/// Jitter applied to the city centroid, in degrees.
pub const COORD_JITTER_DEG: f64 = 0.1;
/// Maintenance recency is drawn uniformly from `[0, MAINTENANCE_LOOKBACK_DAYS)`.
pub const MAINTENANCE_LOOKBACK_DAYS: i64 = 180;

/// Build the device roster every other table refers to.
///
/// All city draws happen up front; the remaining attributes are drawn per device in roster order.
pub fn build(
    catalog: &Catalog,
    dists: &Distributions,
    device_count: usize,
    reference: NaiveDateTime,
    rng: &mut StdRng,
) -> Vec<Device> {
    let city_picks: Vec<usize> = (0..device_count).map(|_| dists.city.sample(rng)).collect();

    let mut devices = Vec::with_capacity(device_count);
    for (index, city_index) in city_picks.into_iter().enumerate() {
        let profile = &catalog.cities[city_index];
        let (centroid_lat, centroid_lon) = profile.centroid;
        let lat = centroid_lat + normal(rng, 0.0, COORD_JITTER_DEG);
        let lon = centroid_lon + normal(rng, 0.0, COORD_JITTER_DEG);

        let status = Status::ALL[dists.status.sample(rng)];
        let zone = profile.zones[rng.random_range(0..profile.zones.len())];
        let days_ago = rng.random_range(0..MAINTENANCE_LOOKBACK_DAYS);
        let last_maintenance = (reference - Duration::days(days_ago)).date();

        devices.push(Device {
            device_id: DeviceId::from_sequence(index + 1),
            city: profile.city,
            lat,
            lon,
            status,
            zone: zone.to_string(),
            last_maintenance,
        });
    }
    devices
}

/// Whole days between the last maintenance and the reference date.
pub fn days_since_maintenance(device: &Device, reference: NaiveDateTime) -> i64 {
    (reference.date() - device.last_maintenance).num_days()
}
