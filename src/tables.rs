//! CSV persistence for the fleet tables.
//!
//! Every table is written to a temporary sibling file and renamed into place, so a failed run never
//! publishes a truncated table. Readers are strict: a missing file, an unexpected header or a
//! malformed row is an error that names the file.

use crate::models::fleet::{
    DailyLoad, Device, DeviceId, Event, FlowEdge, IdleHeatmapRow, PerformanceRecord, SummaryMetrics, WEEKDAYS,
    weekday_name,
};
use core::fmt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEVICES_FILE: &str = "device_master.csv";
pub const PERFORMANCE_FILE: &str = "performance.csv";
pub const LOADS_FILE: &str = "loads_by_day.csv";
pub const HEATMAP_FILE: &str = "idle_heatmap.csv";
pub const FLOWS_FILE: &str = "sankey_flows.csv";
pub const EVENTS_FILE: &str = "warehouse_events.csv";
pub const SUMMARY_FILE: &str = "summary_metrics.csv";

pub const ALL_FILES: [&str; 7] = [
    DEVICES_FILE,
    PERFORMANCE_FILE,
    LOADS_FILE,
    HEATMAP_FILE,
    FLOWS_FILE,
    EVENTS_FILE,
    SUMMARY_FILE,
];

#[derive(Debug)]
pub enum TableError {
    Io { path: PathBuf, source: std::io::Error },
    Csv { path: PathBuf, source: csv::Error },
    Schema { path: PathBuf, message: String },
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            TableError::Csv { path, source } => write!(f, "{}: {}", path.display(), source),
            TableError::Schema { path, message } => write!(f, "{}: {}", path.display(), message),
        }
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TableError::Io { source, .. } => Some(source),
            TableError::Csv { source, .. } => Some(source),
            TableError::Schema { .. } => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TableError + '_ {
    move |source| TableError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> TableError + '_ {
    move |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// All seven tables of one generator run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub devices: Vec<Device>,
    pub performance: Vec<PerformanceRecord>,
    pub loads: Vec<DailyLoad>,
    pub heatmap: Vec<IdleHeatmapRow>,
    pub flows: Vec<FlowEdge>,
    pub events: Vec<Event>,
    pub summary: SummaryMetrics,
}

/// Make sure `dir` exists and is a directory before anything is written into it.
pub fn ensure_dir(dir: &Path) -> Result<(), TableError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let meta = fs::metadata(dir).map_err(io_err(dir))?;
    if !meta.is_dir() {
        return Err(TableError::Schema {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }
    if meta.permissions().readonly() {
        return Err(TableError::Schema {
            path: dir.to_path_buf(),
            message: "directory is read-only".to_string(),
        });
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary sibling and an atomic rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TableError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let result = fs::write(&tmp, bytes)
        .map_err(io_err(&tmp))
        .and_then(|_| fs::rename(&tmp, path).map_err(io_err(path)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

pub fn encode_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<Vec<u8>, TableError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row).map_err(csv_err(path))?;
    }
    wtr.into_inner().map_err(|e| TableError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}

pub fn write_table<T: Serialize>(dir: &Path, file: &str, rows: &[T]) -> Result<PathBuf, TableError> {
    let path = dir.join(file);
    let bytes = encode_rows(&path, rows)?;
    write_atomic(&path, &bytes)?;
    Ok(path)
}

pub fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, TableError> {
    let path = dir.join(file);
    let mut rdr = csv::Reader::from_path(&path).map_err(csv_err(&path))?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row.map_err(csv_err(&path))?);
    }
    Ok(rows)
}

fn heatmap_header() -> Vec<&'static str> {
    let mut header = vec!["device_id"];
    header.extend(WEEKDAYS.iter().map(|d| weekday_name(*d)));
    header
}

/// The heatmap is stored wide: `device_id` followed by one column per weekday, Monday first.
pub fn encode_heatmap(path: &Path, rows: &[IdleHeatmapRow]) -> Result<Vec<u8>, TableError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(heatmap_header()).map_err(csv_err(path))?;
    for row in rows {
        let mut record = vec![row.device_id.0.clone()];
        record.extend(row.idle_minutes.iter().map(|m| m.to_string()));
        wtr.write_record(&record).map_err(csv_err(path))?;
    }
    wtr.into_inner().map_err(|e| TableError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}

pub fn write_heatmap(dir: &Path, rows: &[IdleHeatmapRow]) -> Result<PathBuf, TableError> {
    let path = dir.join(HEATMAP_FILE);
    let bytes = encode_heatmap(&path, rows)?;
    write_atomic(&path, &bytes)?;
    Ok(path)
}

pub fn read_heatmap(dir: &Path) -> Result<Vec<IdleHeatmapRow>, TableError> {
    let path = dir.join(HEATMAP_FILE);
    let mut rdr = csv::Reader::from_path(&path).map_err(csv_err(&path))?;
    let header = rdr.headers().map_err(csv_err(&path))?.clone();
    if header.iter().collect::<Vec<_>>() != heatmap_header() {
        return Err(TableError::Schema {
            path,
            message: format!("unexpected heatmap header: {:?}", header),
        });
    }

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err(&path))?;
        let schema_err = |message: String| TableError::Schema {
            path: path.clone(),
            message: format!("row {}: {}", index + 1, message),
        };
        let device_id = record.get(0).filter(|s| !s.is_empty()).ok_or_else(|| schema_err("missing device_id".into()))?;
        let mut idle_minutes = [0u32; 7];
        for (column, slot) in idle_minutes.iter_mut().enumerate() {
            let raw = record.get(column + 1).unwrap_or_default();
            *slot = raw
                .trim()
                .parse()
                .map_err(|_| schema_err(format!("invalid {} value {:?}", weekday_name(WEEKDAYS[column]), raw)))?;
        }
        rows.push(IdleHeatmapRow {
            device_id: DeviceId(device_id.to_string()),
            idle_minutes,
        });
    }
    Ok(rows)
}

/// Write every table; the summary goes last so it always reflects the tables beside it.
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>, TableError> {
    Ok(vec![
        write_table(dir, DEVICES_FILE, &dataset.devices)?,
        write_table(dir, PERFORMANCE_FILE, &dataset.performance)?,
        write_table(dir, LOADS_FILE, &dataset.loads)?,
        write_heatmap(dir, &dataset.heatmap)?,
        write_table(dir, FLOWS_FILE, &dataset.flows)?,
        write_table(dir, EVENTS_FILE, &dataset.events)?,
        write_table(dir, SUMMARY_FILE, std::slice::from_ref(&dataset.summary))?,
    ])
}

/// Load all seven tables. Any missing or malformed table aborts the load.
pub fn read_dataset(dir: &Path) -> Result<Dataset, TableError> {
    let missing: Vec<&str> = ALL_FILES.iter().copied().filter(|f| !dir.join(f).is_file()).collect();
    if !missing.is_empty() {
        return Err(TableError::Schema {
            path: dir.to_path_buf(),
            message: format!("missing table(s): {}", missing.join(", ")),
        });
    }

    let summary_path = dir.join(SUMMARY_FILE);
    let mut summaries: Vec<SummaryMetrics> = read_table(dir, SUMMARY_FILE)?;
    if summaries.len() != 1 {
        return Err(TableError::Schema {
            path: summary_path,
            message: format!("expected exactly one summary row, found {}", summaries.len()),
        });
    }

    Ok(Dataset {
        devices: read_table(dir, DEVICES_FILE)?,
        performance: read_table(dir, PERFORMANCE_FILE)?,
        loads: read_table(dir, LOADS_FILE)?,
        heatmap: read_heatmap(dir)?,
        flows: read_table(dir, FLOWS_FILE)?,
        events: read_table(dir, EVENTS_FILE)?,
        summary: summaries.remove(0),
    })
}
