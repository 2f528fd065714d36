//! Static dashboard built from the seven generated tables.
//!
//! The report only consumes files: it never shares state with the generator. Loading is all or
//! nothing, since none of the panels has a meaningful partial rendering.

use crate::config::Config;
use crate::models::fleet::{DeviceId, EdgeType, Status, WEEKDAYS, WeekBucket};
use crate::tables::{self, Dataset};
use crate::utils::round1;
use chrono::Datelike;
use handlebars::{Handlebars, handlebars_helper};
use log::info;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

pub const DASHBOARD_FILE: &str = "delivery_dashboard.html";
const MAP_WIDTH: f64 = 640.0;
const MAP_HEIGHT: f64 = 360.0;
const MARKER_BASE: f64 = 15.0;
const MARKER_SPAN: f64 = 25.0;
/// Status order used by the distribution panel.
const STATUS_ORDER: [Status; 4] = [Status::Moving, Status::OnRoute, Status::Idling, Status::Inactive];

#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub active_devices: u32,
    pub idling_devices: u32,
    pub completed_loads: u64,
    pub total_idling_hr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    pub device_id: String,
    pub city: &'static str,
    pub zone: String,
    pub status: &'static str,
    pub deliveries: u32,
    pub lat: f64,
    pub lon: f64,
    pub marker_size: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusShare {
    pub status: &'static str,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayLoads {
    pub day: &'static str,
    pub current: Option<u32>,
    pub last: Option<u32>,
    pub current_pct: f64,
    pub last_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub source_label: String,
    pub target_label: String,
    pub value: u32,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatCell {
    pub value: u32,
    pub intensity: f64,
    pub dark: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatRow {
    pub device_id: String,
    pub cells: Vec<HeatCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub timestamp: String,
    pub event_type: String,
    pub device_id: String,
    pub location: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: &'static str,
    pub last_updated: String,
    pub kpis: Kpis,
    pub map_center: (f64, f64),
    pub map_points: Vec<MapPoint>,
    pub flow_nodes: Vec<String>,
    pub flow_links: Vec<FlowLink>,
    pub heat_columns: Vec<&'static str>,
    pub heat_rows: Vec<HeatRow>,
    pub status_shares: Vec<StatusShare>,
    pub weekly_loads: Vec<WeekdayLoads>,
    pub events: Vec<EventRow>,
}

/// Load the tables from `cfg.data_dir` and write the dashboard into `cfg.output_dir`.
pub fn run(cfg: &Config) -> Result<PathBuf, String> {
    let dataset = tables::read_dataset(&cfg.data_dir).map_err(|e| format!("loading tables failed: {}", e))?;
    check_references(&dataset)?;
    info!(
        "Report: loaded {} device(s), {} event(s) from {}",
        dataset.devices.len(),
        dataset.events.len(),
        cfg.data_dir.display()
    );

    let dashboard = build(&dataset);
    let html = render(&dashboard)?;

    tables::ensure_dir(&cfg.output_dir).map_err(|e| format!("output directory unusable: {}", e))?;
    let path = cfg.output_dir.join(DASHBOARD_FILE);
    tables::write_atomic(&path, html.as_bytes()).map_err(|e| format!("writing dashboard failed: {}", e))?;
    info!("Report: wrote {} ({} bytes)", path.display(), html.len());
    Ok(path)
}

/// Every table keyed by `device_id` must point into the roster.
pub fn check_references(dataset: &Dataset) -> Result<(), String> {
    let roster: HashSet<&DeviceId> = dataset.devices.iter().map(|d| &d.device_id).collect();
    let unknown = dataset
        .performance
        .iter()
        .map(|p| ("performance", &p.device_id))
        .chain(dataset.heatmap.iter().map(|h| ("idle heatmap", &h.device_id)))
        .chain(dataset.events.iter().map(|e| ("events", &e.device_id)))
        .find(|(_, id)| !roster.contains(id));
    match unknown {
        Some((table, id)) => Err(format!("{} references unknown device {}", table, id)),
        None => Ok(()),
    }
}

pub fn build(dataset: &Dataset) -> Dashboard {
    let summary = &dataset.summary;
    Dashboard {
        title: "Delivery Fleet Efficiency Dashboard",
        last_updated: summary.last_updated.format(crate::models::fleet::TIMESTAMP_FORMAT).to_string(),
        kpis: Kpis {
            active_devices: summary.active_devices,
            idling_devices: summary.idling_devices,
            completed_loads: summary.completed_loads,
            total_idling_hr: summary.total_idling_hr,
        },
        map_center: map_center(dataset),
        map_points: map_points(dataset),
        flow_nodes: flow_nodes(dataset),
        flow_links: flow_links(dataset),
        heat_columns: WEEKDAYS.iter().map(|d| crate::models::fleet::weekday_name(*d)).collect(),
        heat_rows: heat_rows(dataset),
        status_shares: status_shares(dataset),
        weekly_loads: weekly_loads(dataset),
        events: dataset
            .events
            .iter()
            .map(|e| EventRow {
                timestamp: e.timestamp.format(crate::models::fleet::TIMESTAMP_FORMAT).to_string(),
                event_type: e.event_type.label().to_string(),
                device_id: e.device_id.0.clone(),
                location: e.location.clone(),
                details: e.details.clone(),
            })
            .collect(),
    }
}

fn map_center(dataset: &Dataset) -> (f64, f64) {
    let n = dataset.devices.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let lat: f64 = dataset.devices.iter().map(|d| d.lat).sum();
    let lon: f64 = dataset.devices.iter().map(|d| d.lon).sum();
    (lat / n as f64, lon / n as f64)
}

/// Roster left-joined with performance; devices without a record count zero deliveries.
fn map_points(dataset: &Dataset) -> Vec<MapPoint> {
    let deliveries: HashMap<&DeviceId, u32> = dataset
        .performance
        .iter()
        .map(|p| (&p.device_id, p.total_deliveries))
        .collect();
    let max_deliveries = deliveries.values().copied().max().unwrap_or(0);

    let bounds = |values: Vec<f64>| {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min, (max - min).max(f64::EPSILON))
    };
    let (lon_min, lon_span) = bounds(dataset.devices.iter().map(|d| d.lon).collect());
    let (lat_min, lat_span) = bounds(dataset.devices.iter().map(|d| d.lat).collect());

    dataset
        .devices
        .iter()
        .map(|d| {
            let delivered = deliveries.get(&d.device_id).copied().unwrap_or(0);
            MapPoint {
                device_id: d.device_id.0.clone(),
                city: d.city.name(),
                zone: d.zone.clone(),
                status: d.status.label(),
                deliveries: delivered,
                lat: d.lat,
                lon: d.lon,
                marker_size: marker_size(delivered, max_deliveries),
                x: round1((d.lon - lon_min) / lon_span * MAP_WIDTH),
                y: round1(MAP_HEIGHT - (d.lat - lat_min) / lat_span * MAP_HEIGHT),
            }
        })
        .collect()
}

/// 15 for an idle fleet, otherwise 15 plus up to 25 scaled by deliveries.
pub fn marker_size(deliveries: u32, max_deliveries: u32) -> f64 {
    if max_deliveries == 0 {
        MARKER_BASE
    } else {
        round1(MARKER_BASE + deliveries as f64 / max_deliveries as f64 * MARKER_SPAN)
    }
}

/// Node labels in first-appearance order over (src, trg) pairs.
pub fn flow_nodes(dataset: &Dataset) -> Vec<String> {
    let mut nodes: Vec<String> = Vec::new();
    for edge in &dataset.flows {
        for label in [&edge.src, &edge.trg] {
            if !nodes.contains(label) {
                nodes.push(label.clone());
            }
        }
    }
    nodes
}

fn flow_links(dataset: &Dataset) -> Vec<FlowLink> {
    let nodes = flow_nodes(dataset);
    let index = |label: &str| nodes.iter().position(|n| n == label).unwrap_or(0);
    dataset
        .flows
        .iter()
        .map(|e| FlowLink {
            source: index(&e.src),
            target: index(&e.trg),
            source_label: e.src.clone(),
            target_label: e.trg.clone(),
            value: e.count,
            kind: match e.edge_type {
                EdgeType::Dispatch => "dispatch",
                EdgeType::Status => "status",
            },
        })
        .collect()
}

fn heat_rows(dataset: &Dataset) -> Vec<HeatRow> {
    let max = dataset
        .heatmap
        .iter()
        .flat_map(|r| r.idle_minutes.iter().copied())
        .max()
        .unwrap_or(0);
    dataset
        .heatmap
        .iter()
        .map(|row| HeatRow {
            device_id: row.device_id.0.clone(),
            cells: row
                .idle_minutes
                .iter()
                .map(|v| HeatCell {
                    value: *v,
                    intensity: if max == 0 { 0.0 } else { (*v as f64 / max as f64 * 100.0).round() / 100.0 },
                    dark: max > 0 && *v as f64 > max as f64 / 2.0,
                })
                .collect(),
        })
        .collect()
}

pub fn status_shares(dataset: &Dataset) -> Vec<StatusShare> {
    let total = dataset.devices.len();
    STATUS_ORDER
        .iter()
        .map(|status| {
            let count = dataset.devices.iter().filter(|d| d.status == *status).count();
            StatusShare {
                status: status.label(),
                count,
                percent: if total == 0 { 0.0 } else { round1(count as f64 * 100.0 / total as f64) },
            }
        })
        .collect()
}

/// Current vs last week per weekday, Monday first. Older days are not compared.
pub fn weekly_loads(dataset: &Dataset) -> Vec<WeekdayLoads> {
    let pick = |bucket: WeekBucket, day: chrono::Weekday| {
        dataset
            .loads
            .iter()
            .find(|l| l.week == bucket && l.date.weekday() == day)
            .map(|l| l.loads)
    };
    let max = dataset
        .loads
        .iter()
        .filter(|l| l.week != WeekBucket::Older)
        .map(|l| l.loads)
        .max()
        .unwrap_or(0);
    let pct = |v: Option<u32>| match (v, max) {
        (Some(v), m) if m > 0 => round1(v as f64 * 100.0 / m as f64),
        _ => 0.0,
    };

    WEEKDAYS
        .iter()
        .map(|day| {
            let current = pick(WeekBucket::Current, *day);
            let last = pick(WeekBucket::Last, *day);
            WeekdayLoads {
                day: abbreviation(*day),
                current,
                last,
                current_pct: pct(current),
                last_pct: pct(last),
            }
        })
        .collect()
}

fn abbreviation(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Mon",
        chrono::Weekday::Tue => "Tue",
        chrono::Weekday::Wed => "Wed",
        chrono::Weekday::Thu => "Thu",
        chrono::Weekday::Fri => "Fri",
        chrono::Weekday::Sat => "Sat",
        chrono::Weekday::Sun => "Sun",
    }
}

pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    handlebars_helper!(fixed1: |v: f64| format!("{:.1}", v));
    handlebars.register_helper("fixed1", Box::new(fixed1));

    handlebars_helper!(status_class: |s: String| s.to_ascii_lowercase().replace('-', ""));
    handlebars.register_helper("status_class", Box::new(status_class));

    handlebars
}

pub fn render(dashboard: &Dashboard) -> Result<String, String> {
    get_handlebars()
        .render_template(TEMPLATE, dashboard)
        .map_err(|e| format!("rendering dashboard failed: {}", e))
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
  body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f4f6f8; color: #2c3e50; }
  header { background: linear-gradient(90deg, #3498db, #2c3e50); color: white; padding: 20px; border-radius: 8px; }
  .kpi-row, .row { display: flex; flex-wrap: wrap; gap: 20px; margin: 20px 0; }
  .card { background: white; border-radius: 8px; padding: 15px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); flex: 1; min-width: 200px; }
  .kpi-value { font-size: 28px; font-weight: bold; margin-top: 10px; }
  table { border-collapse: collapse; width: 100%; font-size: 13px; }
  th { background: #2c3e50; color: white; text-align: left; padding: 6px; }
  td { padding: 6px; border: 1px solid #e0e0e0; }
  .bar { height: 14px; display: inline-block; }
  .moving { fill: #2ECC40; background: #2ECC40; }
  .onroute { fill: #0074D9; background: #0074D9; }
  .idling { fill: #FF851B; background: #FF851B; }
  .inactive { fill: #AAAAAA; background: #AAAAAA; }
  .current { background: #1f77b4; }
  .last { background: #d62728; }
  .heat td { text-align: center; color: black; }
  .heat td.dark { color: white; }
</style>
</head>
<body>
<header>
  <h1>{{title}}</h1>
  <div>Last updated {{last_updated}}</div>
</header>

<section class="kpi-row">
  <div class="card"><div>Active Devices</div><div class="kpi-value">{{kpis.active_devices}}</div></div>
  <div class="card"><div>Idling Devices</div><div class="kpi-value">{{kpis.idling_devices}}</div></div>
  <div class="card"><div>Completed Loads</div><div class="kpi-value">{{kpis.completed_loads}}</div></div>
  <div class="card"><div>Idling Hours</div><div class="kpi-value">{{fixed1 kpis.total_idling_hr}}</div></div>
</section>

<section class="row">
  <div class="card" id="fleet-map">
    <h3>Fleet Location and Status</h3>
    <small>Centred on {{map_center.[0]}}, {{map_center.[1]}}</small>
    <svg viewBox="-20 -20 680 400" width="100%" role="img">
      {{#each map_points}}
      <circle class="{{status_class status}}" cx="{{x}}" cy="{{y}}" r="{{marker_size}}" fill-opacity="0.6"><title>{{device_id}} | {{city}} | {{lat}}, {{lon}} | {{zone}} | {{deliveries}} deliveries | {{status}}</title></circle>
      {{/each}}
    </svg>
  </div>
  <div class="card" id="delivery-flows">
    <h3>Delivery Flow Analysis</h3>
    <ol class="flow-nodes" start="0">
      {{#each flow_nodes}}<li>{{this}}</li>{{/each}}
    </ol>
    <table>
      <tr><th>Source</th><th>Target</th><th>Count</th><th>Type</th></tr>
      {{#each flow_links}}
      <tr><td>{{source}}: {{source_label}}</td><td>{{target}}: {{target_label}}</td><td>{{value}}</td><td>{{kind}}</td></tr>
      {{/each}}
    </table>
  </div>
</section>

<section class="row">
  <div class="card" id="idle-heatmap">
    <h3>Idle Time Heatmap by Device and Day</h3>
    <table class="heat">
      <tr><th>Device</th>{{#each heat_columns}}<th>{{this}}</th>{{/each}}</tr>
      {{#each heat_rows}}
      <tr><td>{{device_id}}</td>{{#each cells}}<td class="{{#if dark}}dark{{/if}}" style="background: rgba(68, 1, 84, {{intensity}})">{{value}}</td>{{/each}}</tr>
      {{/each}}
    </table>
  </div>
  <div class="card">
    <div id="status-distribution">
      <h3>Fleet Status Distribution</h3>
      <table>
        {{#each status_shares}}
        <tr><td>{{status}}</td><td>{{count}}</td><td><span class="bar {{status_class status}}" style="width: {{percent}}%"></span> {{fixed1 percent}}%</td></tr>
        {{/each}}
      </table>
    </div>
    <div id="weekly-loads">
      <h3>Weekly Load Comparison</h3>
      <table>
        <tr><th>Day</th><th>Current week</th><th>Last week</th></tr>
        {{#each weekly_loads}}
        <tr><td>{{day}}</td>
          <td>{{#if current}}<span class="bar current" style="width: {{current_pct}}%"></span> {{current}}{{/if}}</td>
          <td>{{#if last}}<span class="bar last" style="width: {{last_pct}}%"></span> {{last}}{{/if}}</td></tr>
        {{/each}}
      </table>
    </div>
  </div>
</section>

<section class="card" id="events">
  <h3>Recent Warehouse Events</h3>
  <table>
    <tr><th>timestamp</th><th>event_type</th><th>device_id</th><th>location</th><th>details</th></tr>
    {{#each events}}
    <tr><td>{{timestamp}}</td><td>{{event_type}}</td><td>{{device_id}}</td><td>{{location}}</td><td>{{details}}</td></tr>
    {{/each}}
  </table>
</section>
</body>
</html>
"##;
