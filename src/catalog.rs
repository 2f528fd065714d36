//! Fixed distributions that drive the generator: cities, status mixes and event weights.
//!
//! `Catalog::validate` runs before anything is written so that a malformed weight vector
//! aborts the run instead of producing a half-written dataset.

use crate::models::fleet::{City, EventType, Status};
use core::fmt;
use rand::distr::weighted::WeightedIndex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct CityProfile {
    pub city: City,
    pub centroid: (f64, f64),
    /// Relative selection weight when drawing a device's city.
    pub weight: f64,
    pub zones: Vec<&'static str>,
    /// Multiplier applied to base delivery counts.
    pub delivery_factor: f64,
    /// Baseline idle minutes per day before per-device variation.
    pub base_idle_minutes: f64,
}

/// Status mix applied while the reference hour lies in `[start_hour, end_hour)`.
#[derive(Debug, Clone)]
pub struct HourBucket {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Probabilities in `Status::ALL` order.
    pub probabilities: [f64; 4],
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub cities: Vec<CityProfile>,
    pub hour_buckets: Vec<HourBucket>,
    /// Used for hours not covered by any bucket.
    pub off_hours: [f64; 4],
    pub event_weights: [(EventType, f64); 5],
    /// Zone -> status proportions in `Status::ALL` order.
    pub zone_status_weights: [f64; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    NoCities,
    NoZones(City),
    InvalidWeight { what: String, value: f64 },
    NonPositiveTotal(String),
    ProbabilitiesDoNotSumToOne { what: String, sum: f64 },
    InvalidHourBucket { start_hour: u32, end_hour: u32 },
    OverlappingHourBuckets(u32),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NoCities => write!(f, "catalog has no cities"),
            CatalogError::NoZones(c) => write!(f, "city {} has no zones", c.name()),
            CatalogError::InvalidWeight { what, value } => {
                write!(f, "{} has invalid weight {}", what, value)
            }
            CatalogError::NonPositiveTotal(what) => write!(f, "{} weights do not sum to a positive value", what),
            CatalogError::ProbabilitiesDoNotSumToOne { what, sum } => {
                write!(f, "{} probabilities sum to {} instead of 1.0", what, sum)
            }
            CatalogError::InvalidHourBucket { start_hour, end_hour } => {
                write!(f, "hour bucket [{}, {}) is empty or outside 0..24", start_hour, end_hour)
            }
            CatalogError::OverlappingHourBuckets(hour) => write!(f, "hour {} is covered by more than one bucket", hour),
        }
    }
}

impl Error for CatalogError {}

impl Catalog {
    pub fn fleet_default() -> Self {
        Catalog {
            cities: vec![
                CityProfile {
                    city: City::NewYork,
                    centroid: (40.7128, -74.0060),
                    weight: 0.35,
                    zones: vec!["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"],
                    delivery_factor: 1.2,
                    base_idle_minutes: 45.0,
                },
                CityProfile {
                    city: City::LosAngeles,
                    centroid: (34.0522, -118.2437),
                    weight: 0.25,
                    zones: vec!["Downtown", "Westside", "San Fernando", "San Gabriel", "Harbor"],
                    delivery_factor: 1.1,
                    base_idle_minutes: 60.0,
                },
                CityProfile {
                    city: City::Chicago,
                    centroid: (41.8781, -87.6298),
                    weight: 0.15,
                    zones: vec!["North", "South", "West", "East", "Central"],
                    delivery_factor: 1.0,
                    base_idle_minutes: 50.0,
                },
                CityProfile {
                    city: City::Houston,
                    centroid: (29.7604, -95.3698),
                    weight: 0.15,
                    zones: vec!["Northside", "Southside", "East End", "Westside", "Downtown"],
                    delivery_factor: 0.9,
                    base_idle_minutes: 55.0,
                },
                CityProfile {
                    city: City::Phoenix,
                    centroid: (33.4484, -112.0740),
                    weight: 0.10,
                    zones: vec!["North Valley", "South Mountain", "East Valley", "West Valley", "Downtown"],
                    delivery_factor: 0.8,
                    base_idle_minutes: 65.0,
                },
            ],
            hour_buckets: vec![
                // morning rush
                HourBucket {
                    start_hour: 6,
                    end_hour: 10,
                    probabilities: [0.6, 0.15, 0.2, 0.05],
                },
                // midday, more idling
                HourBucket {
                    start_hour: 10,
                    end_hour: 16,
                    probabilities: [0.5, 0.25, 0.2, 0.05],
                },
                // evening
                HourBucket {
                    start_hour: 16,
                    end_hour: 20,
                    probabilities: [0.65, 0.1, 0.2, 0.05],
                },
            ],
            off_hours: [0.2, 0.1, 0.1, 0.6],
            event_weights: [
                (EventType::Departure, 0.4),
                (EventType::Arrival, 0.4),
                (EventType::Maintenance, 0.1),
                (EventType::Inspection, 0.05),
                (EventType::Alert, 0.05),
            ],
            zone_status_weights: [0.6, 0.25, 0.1, 0.05],
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.cities.is_empty() {
            return Err(CatalogError::NoCities);
        }
        for profile in &self.cities {
            if profile.zones.is_empty() {
                return Err(CatalogError::NoZones(profile.city));
            }
            check_weight(profile.city.name(), profile.weight)?;
        }
        check_total("city", self.cities.iter().map(|c| c.weight))?;

        let mut covered = [false; 24];
        for bucket in &self.hour_buckets {
            if bucket.start_hour >= bucket.end_hour || bucket.end_hour > 24 {
                return Err(CatalogError::InvalidHourBucket {
                    start_hour: bucket.start_hour,
                    end_hour: bucket.end_hour,
                });
            }
            for hour in bucket.start_hour..bucket.end_hour {
                if covered[hour as usize] {
                    return Err(CatalogError::OverlappingHourBuckets(hour));
                }
                covered[hour as usize] = true;
            }
            let what = format!("status mix for hours {}..{}", bucket.start_hour, bucket.end_hour);
            check_probabilities(&what, &bucket.probabilities)?;
        }
        check_probabilities("off-hours status mix", &self.off_hours)?;

        let event_weights: Vec<f64> = self.event_weights.iter().map(|(_, w)| *w).collect();
        check_probabilities("event type", &event_weights)?;
        check_probabilities("zone status", &self.zone_status_weights)?;
        Ok(())
    }

    pub fn profile(&self, city: City) -> Option<&CityProfile> {
        self.cities.iter().find(|p| p.city == city)
    }

    /// Status probabilities for the given hour of day.
    pub fn status_mix(&self, hour: u32) -> &[f64; 4] {
        self.hour_buckets
            .iter()
            .find(|b| hour >= b.start_hour && hour < b.end_hour)
            .map(|b| &b.probabilities)
            .unwrap_or(&self.off_hours)
    }
}

/// Weighted samplers compiled from a validated catalog.
#[derive(Debug, Clone)]
pub struct Distributions {
    pub city: WeightedIndex<f64>,
    pub status: WeightedIndex<f64>,
    pub event_type: WeightedIndex<f64>,
}

impl Catalog {
    /// Validates the catalog and compiles its samplers for the given reference hour.
    pub fn distributions(&self, hour: u32) -> Result<Distributions, CatalogError> {
        self.validate()?;
        let city = WeightedIndex::new(self.cities.iter().map(|c| c.weight))
            .map_err(|_| CatalogError::NonPositiveTotal("city".to_string()))?;
        let status = WeightedIndex::new(self.status_mix(hour).iter().copied())
            .map_err(|_| CatalogError::NonPositiveTotal("status".to_string()))?;
        let event_type = WeightedIndex::new(self.event_weights.iter().map(|(_, w)| *w))
            .map_err(|_| CatalogError::NonPositiveTotal("event type".to_string()))?;
        Ok(Distributions {
            city,
            status,
            event_type,
        })
    }
}

/// Delivery multiplier for a device's current status.
pub fn status_delivery_factor(status: Status) -> f64 {
    match status {
        Status::Moving => 1.1,
        Status::OnRoute => 1.0,
        Status::Idling => 0.7,
        Status::Inactive => 0.1,
    }
}

fn check_weight(what: &str, value: f64) -> Result<(), CatalogError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CatalogError::InvalidWeight {
            what: what.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_total(what: &str, weights: impl Iterator<Item = f64>) -> Result<f64, CatalogError> {
    let total: f64 = weights.sum();
    if total <= 0.0 {
        return Err(CatalogError::NonPositiveTotal(what.to_string()));
    }
    Ok(total)
}

fn check_probabilities(what: &str, probabilities: &[f64]) -> Result<(), CatalogError> {
    for p in probabilities {
        check_weight(what, *p)?;
    }
    let sum = check_total(what, probabilities.iter().copied())?;
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(CatalogError::ProbabilitiesDoNotSumToOne {
            what: what.to_string(),
            sum,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        assert_eq!(Catalog::fleet_default().validate(), Ok(()));
    }

    #[test]
    fn rejects_negative_city_weight() {
        let mut catalog = Catalog::fleet_default();
        catalog.cities[2].weight = -0.15;
        assert!(matches!(catalog.validate(), Err(CatalogError::InvalidWeight { .. })));
    }

    #[test]
    fn rejects_all_zero_city_weights() {
        let mut catalog = Catalog::fleet_default();
        for city in &mut catalog.cities {
            city.weight = 0.0;
        }
        assert_eq!(catalog.validate(), Err(CatalogError::NonPositiveTotal("city".to_string())));
    }

    #[test]
    fn rejects_status_mix_not_summing_to_one() {
        let mut catalog = Catalog::fleet_default();
        catalog.hour_buckets[1].probabilities = [0.5, 0.25, 0.2, 0.2];
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::ProbabilitiesDoNotSumToOne { .. })
        ));
    }

    #[test]
    fn rejects_overlapping_hour_buckets() {
        let mut catalog = Catalog::fleet_default();
        catalog.hour_buckets[1].start_hour = 9;
        assert_eq!(catalog.validate(), Err(CatalogError::OverlappingHourBuckets(9)));
    }

    #[test]
    fn rejects_city_without_zones() {
        let mut catalog = Catalog::fleet_default();
        catalog.cities[4].zones.clear();
        assert_eq!(catalog.validate(), Err(CatalogError::NoZones(City::Phoenix)));
    }

    #[test]
    fn distributions_refuse_invalid_catalog() {
        let mut catalog = Catalog::fleet_default();
        catalog.event_weights[4].1 = f64::NAN;
        assert!(catalog.distributions(12).is_err());
        assert!(Catalog::fleet_default().distributions(12).is_ok());
    }

    #[test]
    fn status_mix_switches_on_hour_boundaries() {
        let catalog = Catalog::fleet_default();
        assert_eq!(catalog.status_mix(5), &[0.2, 0.1, 0.1, 0.6]);
        assert_eq!(catalog.status_mix(6), &[0.6, 0.15, 0.2, 0.05]);
        assert_eq!(catalog.status_mix(10), &[0.5, 0.25, 0.2, 0.05]);
        assert_eq!(catalog.status_mix(19), &[0.65, 0.1, 0.2, 0.05]);
        assert_eq!(catalog.status_mix(20), &[0.2, 0.1, 0.1, 0.6]);
    }
}
