use crate::catalog::{Catalog, Distributions};
use crate::models::fleet::{Device, Event, EventType};
use chrono::{Duration, NaiveDateTime, SubsecRound};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;

pub const WINDOW_HOURS: f64 = 168.0;
const ACTIVE_DEVICE_WEIGHT: u32 = 2;
const INACTIVE_DEVICE_WEIGHT: u32 = 1;

const MAINTENANCE_DETAILS: [&str; 6] = [
    "Scheduled oil change completed",
    "Brake pads replaced",
    "Tire rotation performed",
    "Battery swapped after diagnostics",
    "Coolant system flushed",
    "Transmission fluid topped up",
];
const INSPECTION_DETAILS: [&str; 6] = [
    "Cargo seals verified",
    "Safety equipment checked",
    "Load securing straps inspected",
    "Cabin and mirrors inspected",
    "Lights and indicators tested",
    "Weight distribution confirmed",
];
const ALERT_DETAILS: [&str; 6] = [
    "Engine temperature above threshold",
    "Harsh braking detected",
    "Unexpected stop outside delivery zone",
    "Low tire pressure reported",
    "Door opened while in transit",
    "Fuel level critically low",
];
const DETAIL_SUFFIXES: [&str; 5] = [
    "at the loading dock.",
    "before the next dispatch.",
    "during the evening shift.",
    "after driver report.",
    "per fleet policy.",
];

/// Draw `count` independent events over the trailing week, newest first.
pub fn synthesize(
    catalog: &Catalog,
    dists: &Distributions,
    devices: &[Device],
    count: usize,
    reference: NaiveDateTime,
    rng: &mut StdRng,
) -> Vec<Event> {
    let weights = devices.iter().map(|d| {
        if d.status.is_active() {
            ACTIVE_DEVICE_WEIGHT
        } else {
            INACTIVE_DEVICE_WEIGHT
        }
    });
    let Ok(device_picker) = WeightedIndex::new(weights) else {
        // empty roster
        return Vec::new();
    };

    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let hours_ago = rng.random_range(0.0..WINDOW_HOURS);
        let offset = Duration::microseconds((hours_ago * 3_600_000_000.0) as i64);
        let timestamp = (reference - offset).trunc_subsecs(0);

        let event_type = catalog.event_weights[dists.event_type.sample(rng)].0;
        let device = &devices[device_picker.sample(rng)];

        let details = if event_type.is_notable() {
            detail_sentence(event_type, rng)
        } else {
            String::new()
        };

        events.push(Event {
            timestamp,
            event_type,
            device_id: device.device_id.clone(),
            location: device.zone.clone(),
            details,
        });
    }

    // stable: equal timestamps keep draw order
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

fn detail_sentence(event_type: EventType, rng: &mut StdRng) -> String {
    let phrases: &[&str] = match event_type {
        EventType::Maintenance => &MAINTENANCE_DETAILS,
        EventType::Inspection => &INSPECTION_DETAILS,
        EventType::Alert => &ALERT_DETAILS,
        EventType::Departure | EventType::Arrival => return String::new(),
    };
    let phrase = phrases[rng.random_range(0..phrases.len())];
    let suffix = DETAIL_SUFFIXES[rng.random_range(0..DETAIL_SUFFIXES.len())];
    format!("{} {}", phrase, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::{City, DeviceId, Status};
    use chrono::{NaiveDate, Timelike};
    use rand::SeedableRng;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(17, 45, 0))
            .expect("valid reference")
    }

    fn device(n: usize, status: Status) -> Device {
        Device {
            device_id: DeviceId::from_sequence(n),
            city: City::Chicago,
            lat: 0.0,
            lon: 0.0,
            status,
            zone: format!("Zone {}", n),
            last_maintenance: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
        }
    }

    fn run(devices: &[Device], count: usize, seed: u64) -> Vec<Event> {
        let catalog = Catalog::fleet_default();
        let dists = catalog.distributions(reference().hour()).expect("valid catalog");
        let mut rng = StdRng::seed_from_u64(seed);
        synthesize(&catalog, &dists, devices, count, reference(), &mut rng)
    }

    #[test]
    fn details_only_for_notable_types() {
        let devices: Vec<_> = (1..=10).map(|n| device(n, Status::Moving)).collect();
        let events = run(&devices, 250, 42);
        assert_eq!(events.len(), 250);
        for event in &events {
            assert_eq!(event.details.is_empty(), !event.event_type.is_notable(), "{:?}", event);
        }
    }

    #[test]
    fn sorted_newest_first_within_window() {
        let devices: Vec<_> = (1..=10).map(|n| device(n, Status::Idling)).collect();
        let events = run(&devices, 250, 7);
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        let earliest = reference() - Duration::hours(168);
        assert!(events.iter().all(|e| e.timestamp <= reference() && e.timestamp >= earliest));
    }

    #[test]
    fn location_is_device_zone() {
        let devices: Vec<_> = (1..=10).map(|n| device(n, Status::OnRoute)).collect();
        for event in run(&devices, 50, 3) {
            let device = devices.iter().find(|d| d.device_id == event.device_id).expect("known device");
            assert_eq!(event.location, device.zone);
        }
    }

    #[test]
    fn active_devices_picked_about_twice_as_often() {
        let devices = vec![device(1, Status::Moving), device(2, Status::Inactive)];
        let events = run(&devices, 6_000, 11);
        let active = events.iter().filter(|e| e.device_id.0 == "D001").count() as f64;
        let inactive = events.len() as f64 - active;
        let ratio = active / inactive;
        assert!((1.7..2.3).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn empty_roster_yields_no_events() {
        assert!(run(&[], 250, 1).is_empty());
    }
}
