//! Series materialization
//!
//! Raw `(key, year, amount)` observations are grouped by key and summed per
//! year exactly once, during the load phase. The resulting [`SeriesSet`] is
//! never mutated afterwards; detectors receive it by shared reference.
//!
//! Year ranges are not assumed contiguous. [`MaterializedSeries::reindexed`]
//! spreads a series over `[min_year, max_year]`, filling unobserved years
//! with zero, which is the shape every detector works on.

use crate::models::{Observation, SeriesKey};
use std::collections::BTreeMap;

/// Summed amount for one (key, year) pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YearTotal {
    pub amount: f64,
    /// Number of raw rows that contributed to `amount`
    pub rows: usize,
}

/// One series after aggregation: observed years only, in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedSeries {
    key: SeriesKey,
    years: BTreeMap<i32, YearTotal>,
}

impl MaterializedSeries {
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Observed years and their totals, ascending by year
    pub fn years(&self) -> &BTreeMap<i32, YearTotal> {
        &self.years
    }

    /// Number of distinct years that had at least one raw row
    pub fn observed_years(&self) -> usize {
        self.years.len()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.years.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.years.keys().next_back().copied()
    }

    /// Whether the series has enough history to be analyzed
    pub fn is_eligible(&self, min_years: usize) -> bool {
        self.observed_years() >= min_years
    }

    /// Amounts over the contiguous range `[first_year, last_year]`,
    /// with zero for years that have no underlying record.
    pub fn reindexed(&self) -> Vec<(i32, f64)> {
        let (Some(first), Some(last)) = (self.first_year(), self.last_year()) else {
            return Vec::new();
        };
        (first..=last)
            .map(|year| {
                let amount = self.years.get(&year).map(|t| t.amount).unwrap_or(0.0);
                (year, amount)
            })
            .collect()
    }
}

/// All series of a run, keyed and ordered by [`SeriesKey`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSet {
    series: BTreeMap<SeriesKey, MaterializedSeries>,
}

impl SeriesSet {
    /// Group observations by key and sum amounts per year.
    ///
    /// Row order does not affect the result: grouping goes through ordered
    /// maps and summation per (key, year) is the only reduction.
    pub fn materialize<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut series: BTreeMap<SeriesKey, MaterializedSeries> = BTreeMap::new();
        for obs in observations {
            let entry = series
                .entry(obs.key.clone())
                .or_insert_with(|| MaterializedSeries {
                    key: obs.key,
                    years: BTreeMap::new(),
                });
            let total = entry.years.entry(obs.year).or_default();
            total.amount += obs.amount;
            total.rows += 1;
        }
        Self { series }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&MaterializedSeries> {
        self.series.get(key)
    }

    /// Series in key order
    pub fn iter(&self) -> impl Iterator<Item = &MaterializedSeries> {
        self.series.values()
    }

    /// Series with at least `min_years` observed years, in key order
    pub fn eligible(&self, min_years: usize) -> impl Iterator<Item = &MaterializedSeries> {
        self.series.values().filter(move |s| s.is_eligible(min_years))
    }

    /// Sum of all series per year (observed rows only)
    pub fn yearly_totals(&self) -> BTreeMap<i32, f64> {
        let mut totals = BTreeMap::new();
        for s in self.series.values() {
            for (year, total) in &s.years {
                *totals.entry(*year).or_insert(0.0) += total.amount;
            }
        }
        totals
    }

    /// Flattened `(key, year, amount, rows)` rows, ordered by key then year
    pub fn rows(&self) -> impl Iterator<Item = (&SeriesKey, i32, YearTotal)> {
        self.series
            .values()
            .flat_map(|s| s.years.iter().map(move |(y, t)| (&s.key, *y, *t)))
    }
}
