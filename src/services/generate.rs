use crate::catalog::Catalog;
use crate::config::Config;
use crate::services::{events, flows, heatmap, loads, performance, roster, summary};
use crate::tables::{self, Dataset};
use chrono::{NaiveDateTime, Timelike};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    pub seed: u64,
    pub device_count: usize,
    pub event_count: usize,
    /// Stands in for "now" everywhere: status mix, maintenance age, load window, event recency.
    pub reference: NaiveDateTime,
}

impl GeneratorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        GeneratorSettings {
            seed: cfg.seed,
            device_count: cfg.device_count,
            event_count: cfg.event_count,
            reference: cfg.reference_time,
        }
    }
}

/// Generate and persist all seven tables into `cfg.data_dir`.
pub fn run(cfg: &Config) -> Result<Dataset, String> {
    let catalog = Catalog::fleet_default();
    let settings = GeneratorSettings::from_config(cfg);

    // Fail on configuration problems before touching the output directory.
    catalog.validate().map_err(|e| format!("invalid catalog: {}", e))?;
    tables::ensure_dir(&cfg.data_dir).map_err(|e| format!("data directory unusable: {}", e))?;

    info!(
        "Generate: seed={}, devices={}, events={}, reference={}",
        settings.seed, settings.device_count, settings.event_count, settings.reference
    );
    let dataset = generate(&catalog, &settings)?;

    let written = tables::write_dataset(&cfg.data_dir, &dataset).map_err(|e| format!("writing tables failed: {}", e))?;
    for path in &written {
        debug!("Generate: wrote {}", path.display());
    }
    info!(
        "Generate: complete (files={}, devices={}, completed_loads={}, idling_hr={})",
        written.len(),
        dataset.devices.len(),
        dataset.summary.completed_loads,
        dataset.summary.total_idling_hr
    );
    Ok(dataset)
}

/// Build every table from one seeded stream. The draw order is fixed, so the same settings
/// always produce the same dataset.
pub fn generate(catalog: &Catalog, settings: &GeneratorSettings) -> Result<Dataset, String> {
    let dists = catalog
        .distributions(settings.reference.hour())
        .map_err(|e| format!("invalid catalog: {}", e))?;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let reference = settings.reference;

    let devices = roster::build(catalog, &dists, settings.device_count, reference, &mut rng);
    info!("Generate: roster of {} device(s)", devices.len());

    let performance = performance::synthesize(catalog, &devices, reference, &mut rng);
    let loads = loads::synthesize(reference.date(), &mut rng);
    let cells = heatmap::synthesize_cells(catalog, &devices, &mut rng);
    let heatmap = heatmap::pivot(&cells)?;
    let flows = flows::synthesize(catalog, &devices, &mut rng);
    let events = events::synthesize(catalog, &dists, &devices, settings.event_count, reference, &mut rng);
    info!(
        "Generate: performance={}, loads={}, heatmap={}x7, flows={}, events={}",
        performance.len(),
        loads.len(),
        heatmap.len(),
        flows.len(),
        events.len()
    );

    let summary = summary::reduce(&devices, &performance, &heatmap, &events, reference);

    Ok(Dataset {
        devices,
        performance,
        loads,
        heatmap,
        flows,
        events,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::{EventType, Status, WeekBucket};
    use crate::tables::ALL_FILES;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use std::fs;

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            seed: 42,
            device_count: 75,
            event_count: 250,
            reference: NaiveDate::from_ymd_opt(2025, 3, 14)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .expect("valid reference"),
        }
    }

    fn dataset() -> Dataset {
        generate(&Catalog::fleet_default(), &settings()).expect("generate")
    }

    fn inactive_count_at(hour: u32) -> usize {
        let at = GeneratorSettings {
            device_count: 300,
            reference: NaiveDate::from_ymd_opt(2025, 3, 14)
                .and_then(|d| d.and_hms_opt(hour, 0, 0))
                .expect("valid reference"),
            ..settings()
        };
        let data = generate(&Catalog::fleet_default(), &at).expect("generate");
        data.devices.iter().filter(|d| d.status == Status::Inactive).count()
    }

    #[test]
    fn status_mix_follows_reference_hour() {
        let night = inactive_count_at(3);
        let morning = inactive_count_at(9);
        assert!(night > 150, "night inactive {} of 300", night);
        assert!(morning < 45, "morning inactive {} of 300", morning);
    }

    #[test]
    fn performance_is_a_bijection_with_the_roster() {
        let data = dataset();
        let roster: BTreeSet<_> = data.devices.iter().map(|d| &d.device_id).collect();
        let perf: Vec<_> = data.performance.iter().map(|p| &p.device_id).collect();
        assert_eq!(perf.len(), roster.len());
        assert_eq!(perf.iter().copied().collect::<BTreeSet<_>>(), roster);
    }

    #[test]
    fn heatmap_is_dense_50_by_7() {
        let data = dataset();
        assert_eq!(data.heatmap.len(), 50);
        for (row, device) in data.heatmap.iter().zip(&data.devices) {
            assert_eq!(row.device_id, device.device_id);
            assert!(row.idle_minutes.iter().all(|m| *m <= 180));
        }
    }

    #[test]
    fn loads_cover_28_days_with_offset_buckets() {
        let data = dataset();
        assert_eq!(data.loads.len(), 28);
        assert_eq!(data.loads[6].week, WeekBucket::Current);
        assert_eq!(data.loads[7].week, WeekBucket::Last);
        assert_eq!(data.loads[14].week, WeekBucket::Older);
    }

    #[test]
    fn summary_matches_tables() {
        let data = dataset();
        let deliveries: u64 = data.performance.iter().map(|p| p.total_deliveries as u64).sum();
        assert_eq!(data.summary.completed_loads, deliveries);
        let idle: u64 = data.heatmap.iter().map(|r| r.total()).sum();
        assert_eq!(data.summary.total_idling_hr, ((idle as f64 / 60.0) * 10.0).round() / 10.0);
        let alerts = data.events.iter().filter(|e| e.event_type == EventType::Alert).count() as u32;
        assert_eq!(data.summary.critical_alerts, alerts);
    }

    #[test]
    fn events_reference_roster_devices() {
        let data = dataset();
        assert_eq!(data.events.len(), 250);
        for event in &data.events {
            assert!(data.devices.iter().any(|d| d.device_id == event.device_id));
            assert_eq!(event.details.is_empty(), !event.event_type.is_notable());
        }
    }

    #[test]
    fn replay_produces_identical_bytes() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        let catalog = Catalog::fleet_default();
        tables::write_dataset(first.path(), &generate(&catalog, &settings()).expect("generate")).expect("write");
        tables::write_dataset(second.path(), &generate(&catalog, &settings()).expect("generate")).expect("write");

        for file in ALL_FILES {
            let a = fs::read(first.path().join(file)).expect("first copy");
            let b = fs::read(second.path().join(file)).expect("second copy");
            assert!(!a.is_empty(), "{} is empty", file);
            assert_eq!(a, b, "{} differs between runs", file);
        }
    }

    #[test]
    fn different_seed_changes_output() {
        let mut other = settings();
        other.seed = 43;
        let catalog = Catalog::fleet_default();
        assert_ne!(
            generate(&catalog, &settings()).expect("generate"),
            generate(&catalog, &other).expect("generate")
        );
    }

    #[test]
    fn written_tables_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dataset();
        tables::write_dataset(dir.path(), &data).expect("write");
        let loaded = tables::read_dataset(dir.path()).expect("read");
        assert_eq!(loaded.devices.len(), data.devices.len());
        assert_eq!(loaded.heatmap, data.heatmap);
        assert_eq!(loaded.flows, data.flows);
        assert_eq!(loaded.events, data.events);
        assert_eq!(loaded.summary.completed_loads, data.summary.completed_loads);
    }
}
