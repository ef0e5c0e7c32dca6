//! Quintile scoring of RFM metrics
//!
//! Cut points are recomputed from the current run's records, so scores rank a
//! customer against the other customers of the same data set.

use std::fmt;

use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::error::RfmError;
use crate::rfm::RfmRecord;
use crate::segment::Segment;

/// Quantiles that split a metric into five buckets
pub const QUINTILES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

const RECENCY: usize = 0;
const FREQUENCY: usize = 1;
const MONETARY: usize = 2;

/// Ordinal 1-5 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Score {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Score {
    pub const ALL: [Score; 5] = [Score::One, Score::Two, Score::Three, Score::Four, Score::Five];

    pub fn new(value: u8) -> Option<Self> {
        match value {
            1 => Some(Score::One),
            2 => Some(Score::Two),
            3 => Some(Score::Three),
            4 => Some(Score::Four),
            5 => Some(Score::Five),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Combined frequency/monetary score, rounded down
    pub fn combine(f: Score, m: Score) -> Score {
        match (f.value() + m.value()) / 2 {
            1 => Score::One,
            2 => Score::Two,
            3 => Score::Three,
            4 => Score::Four,
            _ => Score::Five,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// The 20th, 40th, 60th and 80th percentiles of one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuintileCuts {
    pub cuts: [f64; 4],
}

impl QuintileCuts {
    /// Compute cut points with linear interpolation between closest ranks
    pub fn from_values(values: ArrayView1<'_, f64>) -> crate::Result<Self> {
        if values.is_empty() {
            return Err(RfmError::InsufficientData(
                "cannot compute quintiles of an empty metric".to_string(),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut cuts = [0.0; 4];
        for (cut, q) in cuts.iter_mut().zip(QUINTILES) {
            *cut = quantile_sorted(&sorted, q);
        }
        Ok(Self { cuts })
    }

    /// Bucket index 0-4: the first cut point `value` does not exceed, or 4
    fn bucket(&self, value: f64) -> usize {
        self.cuts
            .iter()
            .position(|&cut| value <= cut)
            .unwrap_or(self.cuts.len())
    }

    /// Higher values score higher
    pub fn ascending_score(&self, value: f64) -> Score {
        Score::ALL[self.bucket(value)]
    }

    /// Lower values score higher
    pub fn descending_score(&self, value: f64) -> Score {
        Score::ALL[Score::ALL.len() - 1 - self.bucket(value)]
    }
}

/// Quantile of pre-sorted, non-empty values, position `q * (n - 1)`
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Cut points for all three metrics of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfmQuintiles {
    pub recency: QuintileCuts,
    pub frequency: QuintileCuts,
    pub monetary: QuintileCuts,
}

impl RfmQuintiles {
    /// Compute cut points over every record of the run
    pub fn fit(records: &[RfmRecord]) -> crate::Result<Self> {
        let metrics = metric_matrix(records)?;
        let quintiles = Self {
            recency: QuintileCuts::from_values(metrics.column(RECENCY))?,
            frequency: QuintileCuts::from_values(metrics.column(FREQUENCY))?,
            monetary: QuintileCuts::from_values(metrics.column(MONETARY))?,
        };
        debug!(
            recency = ?quintiles.recency.cuts,
            frequency = ?quintiles.frequency.cuts,
            monetary = ?quintiles.monetary.cuts,
            "quintile cut points"
        );
        Ok(quintiles)
    }

    pub fn score(&self, record: &RfmRecord) -> ScoreSet {
        let r = self.recency.descending_score(record.recency as f64);
        let f = self.frequency.ascending_score(record.frequency as f64);
        let m = self.monetary.ascending_score(record.monetary);
        ScoreSet::new(r, f, m)
    }
}

/// Lay records out as an (n_customers, 3) matrix of recency, frequency, monetary
fn metric_matrix(records: &[RfmRecord]) -> crate::Result<Array2<f64>> {
    if records.is_empty() {
        return Err(RfmError::InsufficientData(
            "no customers to score".to_string(),
        ));
    }

    let mut data = Vec::with_capacity(records.len() * 3);
    for record in records {
        if !record.monetary.is_finite() {
            return Err(RfmError::InvalidMetric {
                metric: "monetary",
                value: record.monetary,
            });
        }
        data.extend_from_slice(&[
            record.recency as f64,
            record.frequency as f64,
            record.monetary,
        ]);
    }

    Ok(Array2::from_shape_vec((records.len(), 3), data)?)
}

/// Scores appended to a customer's metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSet {
    pub r: Score,
    pub f: Score,
    pub m: Score,
    pub fm: Score,
    pub segment: Segment,
}

impl ScoreSet {
    pub fn new(r: Score, f: Score, m: Score) -> Self {
        let fm = Score::combine(f, m);
        Self {
            r,
            f,
            m,
            fm,
            segment: Segment::classify(r, fm),
        }
    }

    /// Three-digit concatenation of r, f and m, e.g. `"534"`
    pub fn rfm_score(&self) -> String {
        format!("{}{}{}", self.r, self.f, self.m)
    }
}

/// A customer's metrics together with its scores
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub record: RfmRecord,
    pub scores: ScoreSet,
}

/// Score every record against cut points computed from all of them
pub fn score_records(records: Vec<RfmRecord>) -> crate::Result<Vec<ScoredCustomer>> {
    let quintiles = RfmQuintiles::fit(&records)?;
    Ok(records
        .into_iter()
        .map(|record| {
            let scores = quintiles.score(&record);
            ScoredCustomer { record, scores }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CustomerKey;
    use ndarray::Array1;

    fn record(id: &str, recency: i64, frequency: u64, monetary: f64) -> RfmRecord {
        RfmRecord {
            key: CustomerKey::new("KR", id),
            recency,
            frequency,
            monetary,
        }
    }

    fn cuts_of(values: Vec<f64>) -> QuintileCuts {
        QuintileCuts::from_values(Array1::from(values).view()).unwrap()
    }

    #[test]
    fn test_linear_interpolation() {
        let cuts = cuts_of(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let expected = [1.8, 2.6, 3.4, 4.2];
        for (cut, want) in cuts.cuts.iter().zip(expected) {
            assert!((cut - want).abs() < 1e-9, "{cut} != {want}");
        }

        // input order does not matter
        assert_eq!(cuts_of(vec![5.0, 3.0, 1.0, 4.0, 2.0]), cuts);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let cuts = QuintileCuts {
            cuts: [10.0, 20.0, 30.0, 40.0],
        };
        assert_eq!(cuts.ascending_score(10.0), Score::One);
        assert_eq!(cuts.ascending_score(10.5), Score::Two);
        assert_eq!(cuts.ascending_score(40.0), Score::Four);
        assert_eq!(cuts.ascending_score(40.1), Score::Five);

        assert_eq!(cuts.descending_score(10.0), Score::Five);
        assert_eq!(cuts.descending_score(30.0), Score::Three);
        assert_eq!(cuts.descending_score(99.0), Score::One);
    }

    #[test]
    fn test_constant_metric_collapses_to_first_bucket() {
        let cuts = cuts_of(vec![7.0; 6]);
        assert_eq!(cuts.cuts, [7.0; 4]);
        assert_eq!(cuts.ascending_score(7.0), Score::One);
        assert_eq!(cuts.descending_score(7.0), Score::Five);
    }

    #[test]
    fn test_single_customer() {
        let scored = score_records(vec![record("1", 3, 2, 100.0)]).unwrap();
        assert_eq!(scored.len(), 1);
        let scores = scored[0].scores;
        assert_eq!((scores.r, scores.f, scores.m), (Score::Five, Score::One, Score::One));
        assert_eq!(scores.fm, Score::One);
        assert_eq!(scores.segment, Segment::NewCustomers);
    }

    #[test]
    fn test_combine_rounds_down() {
        assert_eq!(Score::combine(Score::One, Score::One), Score::One);
        assert_eq!(Score::combine(Score::One, Score::Two), Score::One);
        assert_eq!(Score::combine(Score::Four, Score::Five), Score::Four);
        assert_eq!(Score::combine(Score::Five, Score::Five), Score::Five);
        assert_eq!(Score::combine(Score::Two, Score::Five), Score::Three);
    }

    #[test]
    fn test_rfm_score_string() {
        let scores = ScoreSet::new(Score::Five, Score::Three, Score::Four);
        assert_eq!(scores.rfm_score(), "534");
        assert_eq!(scores.fm, Score::Three);
    }

    #[test]
    fn test_monotonic_scores() {
        let records: Vec<RfmRecord> = (0..20)
            .map(|i| record(&i.to_string(), (i * 7 + 1) % 50, (i % 6 + 1) as u64, (i * i) as f64))
            .collect();
        let scored = score_records(records).unwrap();

        for a in &scored {
            for b in &scored {
                if a.record.recency < b.record.recency {
                    assert!(a.scores.r >= b.scores.r);
                }
                if a.record.frequency < b.record.frequency {
                    assert!(a.scores.f <= b.scores.f);
                }
                if a.record.monetary < b.record.monetary {
                    assert!(a.scores.m <= b.scores.m);
                }
            }
        }
    }

    #[test]
    fn test_monetary_scale_invariance() {
        let base: Vec<RfmRecord> = [-40.0, 0.0, 15.0, 15.0, 90.0, 120.0, 300.0, 1250.0, 7.0]
            .iter()
            .enumerate()
            .map(|(i, &m)| record(&i.to_string(), i as i64 + 1, 1, m))
            .collect();
        let base_m: Vec<Score> = score_records(base.clone())
            .unwrap()
            .iter()
            .map(|c| c.scores.m)
            .collect();

        for factor in [8.0, 3.7, 0.013] {
            let scaled: Vec<RfmRecord> = base
                .iter()
                .map(|r| RfmRecord {
                    monetary: r.monetary * factor,
                    ..r.clone()
                })
                .collect();
            let scaled_m: Vec<Score> = score_records(scaled)
                .unwrap()
                .iter()
                .map(|c| c.scores.m)
                .collect();
            assert_eq!(base_m, scaled_m, "factor {factor}");
        }
    }

    #[test]
    fn test_metric_matrix_layout() {
        let records = vec![record("a", 3, 2, 10.5), record("b", 1, 5, -4.0)];
        let matrix = metric_matrix(&records).unwrap();

        assert_eq!(matrix.dim(), (2, 3));
        assert_eq!(matrix.row(0).to_vec(), vec![3.0, 2.0, 10.5]);
        assert_eq!(matrix.column(2).to_vec(), vec![10.5, -4.0]);
    }

    #[test]
    fn test_shape_error_is_not_insufficient_data() {
        let err: RfmError = Array2::<f64>::from_shape_vec((2, 3), vec![0.0; 5])
            .unwrap_err()
            .into();
        assert!(matches!(err, RfmError::Shape(_)));
        assert!(err.to_string().starts_with("metric matrix shape error"));
    }

    #[test]
    fn test_no_records() {
        assert!(matches!(
            score_records(Vec::new()),
            Err(RfmError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_non_finite_monetary() {
        let result = score_records(vec![record("1", 1, 1, f64::NAN)]);
        assert!(matches!(result, Err(RfmError::InvalidMetric { .. })));
    }
}
