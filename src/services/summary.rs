use crate::models::fleet::{Device, Event, EventType, IdleHeatmapRow, PerformanceRecord, Status, SummaryMetrics};
use crate::utils::{mean1, round1};
use chrono::NaiveDateTime;

/// Pure reduction over the generated tables; recompute whenever any input changes.
pub fn reduce(
    devices: &[Device],
    performance: &[PerformanceRecord],
    heatmap: &[IdleHeatmapRow],
    events: &[Event],
    generated_at: NaiveDateTime,
) -> SummaryMetrics {
    let idle_minutes: u64 = heatmap.iter().map(IdleHeatmapRow::total).sum();

    SummaryMetrics {
        active_devices: devices.iter().filter(|d| d.status.is_active()).count() as u32,
        idling_devices: devices.iter().filter(|d| d.status == Status::Idling).count() as u32,
        completed_loads: performance.iter().map(|p| p.total_deliveries as u64).sum(),
        total_idling_hr: round1(idle_minutes as f64 / 60.0),
        avg_deliveries: mean1(performance.iter().map(|p| p.total_deliveries as f64)),
        avg_speed: mean1(performance.iter().map(|p| p.avg_speed)),
        avg_uptime: mean1(performance.iter().map(|p| p.uptime_percent)),
        critical_alerts: events.iter().filter(|e| e.event_type == EventType::Alert).count() as u32,
        last_updated: generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::{City, DeviceId};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid instant")
    }

    fn device(n: usize, status: Status) -> Device {
        Device {
            device_id: DeviceId::from_sequence(n),
            city: City::NewYork,
            lat: 40.7,
            lon: -74.0,
            status,
            zone: "Queens".to_string(),
            last_maintenance: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
        }
    }

    fn perf(n: usize, deliveries: u32, speed: f64, uptime: f64) -> PerformanceRecord {
        PerformanceRecord {
            device_id: DeviceId::from_sequence(n),
            total_deliveries: deliveries,
            avg_speed: speed,
            uptime_percent: uptime,
            fuel_efficiency: 8.5,
            distance_traveled: 100,
        }
    }

    fn event(kind: EventType) -> Event {
        Event {
            timestamp: at(),
            event_type: kind,
            device_id: DeviceId::from_sequence(1),
            location: "Queens".to_string(),
            details: String::new(),
        }
    }

    #[test]
    fn reduces_all_tables() {
        let devices = vec![
            device(1, Status::Moving),
            device(2, Status::Idling),
            device(3, Status::Inactive),
            device(4, Status::OnRoute),
        ];
        let performance = vec![
            perf(1, 10, 30.0, 90.0),
            perf(2, 20, 40.0, 80.0),
            perf(3, 1, 20.0, 75.0),
            perf(4, 0, 35.5, 99.0),
        ];
        let heatmap = vec![
            IdleHeatmapRow {
                device_id: DeviceId::from_sequence(1),
                idle_minutes: [60, 60, 60, 60, 60, 60, 60],
            },
            IdleHeatmapRow {
                device_id: DeviceId::from_sequence(2),
                idle_minutes: [10, 0, 0, 0, 0, 0, 5],
            },
        ];
        let events = vec![event(EventType::Alert), event(EventType::Arrival), event(EventType::Alert)];

        let summary = reduce(&devices, &performance, &heatmap, &events, at());
        assert_eq!(summary.active_devices, 3);
        assert_eq!(summary.idling_devices, 1);
        assert_eq!(summary.completed_loads, 31);
        // 435 minutes
        assert_eq!(summary.total_idling_hr, 7.3);
        assert_eq!(summary.avg_deliveries, 7.8);
        assert_eq!(summary.avg_speed, 31.4);
        assert_eq!(summary.avg_uptime, 86.0);
        assert_eq!(summary.critical_alerts, 2);
        assert_eq!(summary.last_updated, at());
    }

    #[test]
    fn empty_tables_reduce_to_zeroes() {
        let summary = reduce(&[], &[], &[], &[], at());
        assert_eq!(summary.completed_loads, 0);
        assert_eq!(summary.avg_speed, 0.0);
        assert_eq!(summary.total_idling_hr, 0.0);
    }
}
