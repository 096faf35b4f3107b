//! Chart statistics derived from tree observations.
//!
//! Both views are computed in memory from a flat list fetched by the
//! repository. Aggregation never fails: malformed records are skipped.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Number of entries kept in the species ranking.
pub const TOP_SPECIES_LIMIT: usize = 10;

/// Hours of work assumed for each planted tree.
pub const HOURS_PER_TREE: f64 = 1.5;

/// Explanation returned alongside every hours estimate.
pub const ESTIMATE_MESSAGE: &str = "Estimate based on 1.5 hours per tree.";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Species and planting time of one stored record, as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeObservation {
    /// Species as stored; may be missing or blank.
    pub species: Option<String>,
    /// Raw `planted_at` text, parsed lazily by the aggregator.
    pub planted_at: Option<String>,
}

impl TreeObservation {
    /// Convenience constructor for fully populated observations.
    pub fn new(species: impl Into<String>, planted_at: impl Into<String>) -> Self {
        Self {
            species: Some(species.into()),
            planted_at: Some(planted_at.into()),
        }
    }
}

/// Occurrence count for one species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesCount {
    /// Trimmed species name.
    pub species: String,
    /// Records naming this species.
    pub count: u64,
}

/// Aggregated chart data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStatistics {
    /// Records per `YYYY-MM`, in ascending month order.
    pub monthly: BTreeMap<String, u64>,
    /// Most planted species, most frequent first.
    pub top_species: Vec<SpeciesCount>,
    /// Number of observations considered.
    pub total_records: u64,
    /// Observations without a usable timestamp.
    pub skipped_timestamps: u64,
}

/// Parse a store timestamp into UTC.
///
/// Offsets are honoured; timestamps without one are taken as UTC.
pub fn parse_planted_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

fn month_key(raw: Option<&str>) -> Option<String> {
    raw.and_then(parse_planted_at)
        .map(|instant| instant.format("%Y-%m").to_string())
}

fn monthly_counts(observations: &[TreeObservation]) -> (BTreeMap<String, u64>, u64) {
    let mut monthly = BTreeMap::new();
    let mut skipped = 0;
    for observation in observations {
        match month_key(observation.planted_at.as_deref()) {
            Some(key) => *monthly.entry(key).or_insert(0) += 1,
            None => skipped += 1,
        }
    }
    (monthly, skipped)
}

fn top_species(observations: &[TreeObservation]) -> Vec<SpeciesCount> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut ranked: Vec<SpeciesCount> = Vec::new();
    for species in observations
        .iter()
        .filter_map(|observation| observation.species.as_deref())
        .map(str::trim)
        .filter(|species| !species.is_empty())
    {
        match positions.get(species) {
            Some(&index) => {
                if let Some(entry) = ranked.get_mut(index) {
                    entry.count += 1;
                }
            }
            None => {
                positions.insert(species, ranked.len());
                ranked.push(SpeciesCount {
                    species: species.to_owned(),
                    count: 1,
                });
            }
        }
    }
    // `sort_by` is stable, so equal counts keep first-encounter order.
    ranked.sort_by(|left, right| right.count.cmp(&left.count));
    ranked.truncate(TOP_SPECIES_LIMIT);
    ranked
}

/// Summarise observations into monthly counts and the species ranking.
///
/// # Examples
/// ```
/// use canopy::domain::stats::{summarize, TreeObservation};
///
/// let stats = summarize(&[
///     TreeObservation::new("Oak", "2024-01-15T00:00:00Z"),
///     TreeObservation::new("Pine", "2024-02-01T00:00:00Z"),
/// ]);
/// assert_eq!(stats.monthly.get("2024-01"), Some(&1));
/// assert_eq!(stats.top_species[0].species, "Oak");
/// ```
pub fn summarize(observations: &[TreeObservation]) -> TreeStatistics {
    let (monthly, skipped_timestamps) = monthly_counts(observations);
    TreeStatistics {
        monthly,
        top_species: top_species(observations),
        total_records: observations.len() as u64,
        skipped_timestamps,
    }
}

/// Hours needed to plant `total` trees, rounded to one decimal place.
///
/// Unknown totals estimate to zero.
pub fn estimate_hours(total: Option<u64>) -> f64 {
    let trees = total.unwrap_or(0) as f64;
    (trees * HOURS_PER_TREE * 10.0).round() / 10.0
}

/// Hours estimate returned to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct HoursEstimate {
    /// Stored records, `0` when the store gave no count.
    pub total_trees: u64,
    /// Volunteer hours rounded to one decimal.
    pub estimated_hours: f64,
    /// Always [`ESTIMATE_MESSAGE`].
    pub message: String,
}

impl HoursEstimate {
    /// Build the estimate for a store count.
    pub fn for_total(total: Option<u64>) -> Self {
        Self {
            total_trees: total.unwrap_or(0),
            estimated_hours: estimate_hours(total),
            message: ESTIMATE_MESSAGE.to_owned(),
        }
    }
}
