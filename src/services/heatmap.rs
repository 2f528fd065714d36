//! Idle-minutes heatmap: long (device, weekday) cells pivoted into a dense matrix.

use crate::catalog::Catalog;
use crate::models::fleet::{Device, DeviceId, IdleHeatmapRow, WEEKDAYS, is_weekend};
use crate::utils::{normal, truncate_count};
use chrono::Weekday;
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::HashMap;

pub const SUBSET_SIZE: usize = 50;
pub const MAX_IDLE_MINUTES: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleCell {
    pub device_id: DeviceId,
    pub day: Weekday,
    pub idle_minutes: u32,
}

/// Idle cells for the first `SUBSET_SIZE` roster devices, device-major and Monday..Sunday.
pub fn synthesize_cells(catalog: &Catalog, devices: &[Device], rng: &mut StdRng) -> Vec<IdleCell> {
    let subset = &devices[..devices.len().min(SUBSET_SIZE)];
    let mut cells = Vec::with_capacity(subset.len() * WEEKDAYS.len());
    for device in subset {
        let city_base = catalog.profile(device.city).map(|p| p.base_idle_minutes).unwrap_or(50.0);
        let base_idle = city_base + rng.random_range(-15..15) as f64;

        for day in WEEKDAYS {
            let mut idle = if is_weekend(day) {
                base_idle * rng.random_range(1.2..1.5)
            } else {
                base_idle * rng.random_range(0.9..1.1)
            };
            idle *= day_factor(day);
            let idle = (idle + normal(rng, 0.0, 10.0)).clamp(0.0, MAX_IDLE_MINUTES);

            cells.push(IdleCell {
                device_id: device.device_id.clone(),
                day,
                idle_minutes: truncate_count(idle),
            });
        }
    }
    cells
}

/// Long-to-wide pivot. Rows keep first-seen device order, columns are Monday..Sunday.
///
/// Fails when a (device, weekday) cell is missing or appears twice.
pub fn pivot(cells: &[IdleCell]) -> Result<Vec<IdleHeatmapRow>, String> {
    let mut order: Vec<DeviceId> = Vec::new();
    let mut grid: HashMap<DeviceId, [Option<u32>; 7]> = HashMap::new();

    for cell in cells {
        let slot = grid.entry(cell.device_id.clone()).or_insert_with(|| {
            order.push(cell.device_id.clone());
            [None; 7]
        });
        let column = cell.day.num_days_from_monday() as usize;
        if slot[column].replace(cell.idle_minutes).is_some() {
            return Err(format!("duplicate idle cell for {} on {}", cell.device_id, cell.day));
        }
    }

    order
        .into_iter()
        .map(|device_id| {
            let slots = grid.remove(&device_id).unwrap_or([None; 7]);
            let mut idle_minutes = [0u32; 7];
            for (column, value) in slots.iter().enumerate() {
                idle_minutes[column] =
                    value.ok_or_else(|| format!("missing idle cell for {} on {}", device_id, WEEKDAYS[column]))?;
            }
            Ok(IdleHeatmapRow {
                device_id,
                idle_minutes,
            })
        })
        .collect()
}

fn day_factor(day: Weekday) -> f64 {
    match day {
        Weekday::Mon => 1.1,
        Weekday::Tue => 1.0,
        Weekday::Wed => 0.9,
        Weekday::Thu => 1.0,
        Weekday::Fri => 1.2,
        Weekday::Sat => 1.3,
        Weekday::Sun => 1.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::{City, Status};
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn devices(n: usize) -> Vec<Device> {
        let cities = [City::NewYork, City::LosAngeles, City::Chicago, City::Houston, City::Phoenix];
        (1..=n)
            .map(|i| Device {
                device_id: DeviceId::from_sequence(i),
                city: cities[i % cities.len()],
                lat: 0.0,
                lon: 0.0,
                status: Status::Idling,
                zone: "North".to_string(),
                last_maintenance: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            })
            .collect()
    }

    #[test]
    fn dense_50_by_7_in_roster_order() {
        let roster = devices(75);
        let mut rng = StdRng::seed_from_u64(42);
        let cells = synthesize_cells(&Catalog::fleet_default(), &roster, &mut rng);
        assert_eq!(cells.len(), 350);
        let rows = pivot(&cells).expect("dense grid");
        assert_eq!(rows.len(), 50);
        for (row, device) in rows.iter().zip(&roster) {
            assert_eq!(row.device_id, device.device_id);
            assert!(row.idle_minutes.iter().all(|m| *m as f64 <= MAX_IDLE_MINUTES));
        }
    }

    #[test]
    fn small_roster_uses_every_device() {
        let mut rng = StdRng::seed_from_u64(42);
        let cells = synthesize_cells(&Catalog::fleet_default(), &devices(12), &mut rng);
        assert_eq!(pivot(&cells).expect("dense grid").len(), 12);
    }

    #[test]
    fn pivot_places_values_by_weekday() {
        let id = DeviceId::from_sequence(1);
        let cells: Vec<_> = WEEKDAYS
            .iter()
            .rev()
            .enumerate()
            .map(|(i, day)| IdleCell {
                device_id: id.clone(),
                day: *day,
                idle_minutes: i as u32,
            })
            .collect();
        let rows = pivot(&cells).expect("dense grid");
        assert_eq!(rows[0].idle_minutes, [6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn pivot_rejects_missing_and_duplicate_cells() {
        let id = DeviceId::from_sequence(1);
        let mut cells: Vec<_> = WEEKDAYS
            .iter()
            .map(|day| IdleCell {
                device_id: id.clone(),
                day: *day,
                idle_minutes: 10,
            })
            .collect();
        cells.pop();
        assert!(pivot(&cells).unwrap_err().contains("missing"));

        cells.push(cells[0].clone());
        assert!(pivot(&cells).unwrap_err().contains("duplicate"));
    }
}
