//! Record types for the seven fleet tables.
//!
//! Notes
//! - Every table row is a strongly typed struct; CSV column names come from the serde field names.
//! - `device_id` is the join key shared by devices, performance, heatmap and events.
//! - Timestamps are naive local instants relative to the generator's reference time.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =====================
// Identifiers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Roster position (1-based) rendered as `D001`, `D002`, ...
    pub fn from_sequence(position: usize) -> Self {
        DeviceId(format!("D{:03}", position))
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =====================
// Categorical values
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "New York")]
    NewYork,
    #[serde(rename = "Los Angeles")]
    LosAngeles,
    Chicago,
    Houston,
    Phoenix,
}

impl City {
    pub fn name(self) -> &'static str {
        match self {
            City::NewYork => "New York",
            City::LosAngeles => "Los Angeles",
            City::Chicago => "Chicago",
            City::Houston => "Houston",
            City::Phoenix => "Phoenix",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Moving,
    Idling,
    #[serde(rename = "On-route")]
    OnRoute,
    Inactive,
}

impl Status {
    /// Order used by every status probability vector and by the flow graph.
    pub const ALL: [Status; 4] = [Status::Moving, Status::Idling, Status::OnRoute, Status::Inactive];

    pub fn label(self) -> &'static str {
        match self {
            Status::Moving => "Moving",
            Status::Idling => "Idling",
            Status::OnRoute => "On-route",
            Status::Inactive => "Inactive",
        }
    }

    pub fn is_active(self) -> bool {
        self != Status::Inactive
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Departure,
    Arrival,
    Maintenance,
    Inspection,
    Alert,
}

impl EventType {
    pub fn label(self) -> &'static str {
        match self {
            EventType::Departure => "Departure",
            EventType::Arrival => "Arrival",
            EventType::Maintenance => "Maintenance",
            EventType::Inspection => "Inspection",
            EventType::Alert => "Alert",
        }
    }

    /// Maintenance, inspection and alert events carry a free-text detail.
    pub fn is_notable(self) -> bool {
        matches!(self, EventType::Maintenance | EventType::Inspection | EventType::Alert)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekBucket {
    Current,
    Last,
    Older,
}

impl WeekBucket {
    /// Buckets by day offset from the reference date, not by calendar week.
    pub fn from_offset(days_ago: u32) -> Self {
        match days_ago {
            0..=6 => WeekBucket::Current,
            7..=13 => WeekBucket::Last,
            _ => WeekBucket::Older,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Dispatch,
    Status,
}

/// Monday..Sunday, the column order of the idle heatmap.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

// =====================
// Table rows
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub city: City,
    pub lat: f64,
    pub lon: f64,
    pub status: Status,
    pub zone: String,
    pub last_maintenance: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub device_id: DeviceId,
    pub total_deliveries: u32,
    pub avg_speed: f64,
    pub uptime_percent: f64,
    pub fuel_efficiency: f64,
    pub distance_traveled: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub loads: u32,
    pub week: WeekBucket,
    pub day_of_week: String,
    pub is_weekend: bool,
}

/// One row of the dense device x weekday idle matrix. `idle_minutes` is Monday..Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleHeatmapRow {
    pub device_id: DeviceId,
    pub idle_minutes: [u32; 7],
}

impl IdleHeatmapRow {
    pub fn total(&self) -> u64 {
        self.idle_minutes.iter().map(|m| *m as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub src: String,
    pub trg: String,
    pub count: u32,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub event_type: EventType,
    pub device_id: DeviceId,
    pub location: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub active_devices: u32,
    pub idling_devices: u32,
    pub completed_loads: u64,
    pub total_idling_hr: f64,
    pub avg_deliveries: f64,
    pub avg_speed: f64,
    pub avg_uptime: f64,
    pub critical_alerts: u32,
    #[serde(with = "timestamp_format")]
    pub last_updated: NaiveDateTime,
}

/// `%Y-%m-%d %H:%M:%S` instead of chrono's default ISO `T` separator.
pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_ids_are_zero_padded() {
        assert_eq!(DeviceId::from_sequence(1).0, "D001");
        assert_eq!(DeviceId::from_sequence(75).0, "D075");
    }

    #[test]
    fn week_bucket_follows_day_offsets() {
        assert_eq!(WeekBucket::from_offset(0), WeekBucket::Current);
        assert_eq!(WeekBucket::from_offset(6), WeekBucket::Current);
        assert_eq!(WeekBucket::from_offset(7), WeekBucket::Last);
        assert_eq!(WeekBucket::from_offset(13), WeekBucket::Last);
        assert_eq!(WeekBucket::from_offset(14), WeekBucket::Older);
        assert_eq!(WeekBucket::from_offset(27), WeekBucket::Older);
    }

    #[test]
    fn only_inactive_is_inactive() {
        let active: Vec<_> = Status::ALL.iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, vec![&Status::Moving, &Status::Idling, &Status::OnRoute]);
    }

    #[test]
    fn notable_event_types() {
        assert!(!EventType::Departure.is_notable());
        assert!(!EventType::Arrival.is_notable());
        assert!(EventType::Maintenance.is_notable());
        assert!(EventType::Inspection.is_notable());
        assert!(EventType::Alert.is_notable());
    }

    #[test]
    fn event_labels_match_csv_values() {
        for kind in [
            EventType::Departure,
            EventType::Arrival,
            EventType::Maintenance,
            EventType::Inspection,
            EventType::Alert,
        ] {
            let encoded = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(encoded, format!("\"{}\"", kind.label()));
        }
    }
}
