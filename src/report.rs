//! Segment summaries and drill-downs over scored customers

use std::cmp::Ordering;
use std::fmt;

use crate::score::ScoredCustomer;
use crate::segment::Segment;

/// Aggregate figures for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStats {
    pub segment: Segment,
    pub customers: usize,
    /// Percentage of all scored customers
    pub share: f64,
    pub total_monetary: f64,
    pub mean_monetary: f64,
}

/// Per-segment statistics, one entry per segment in canonical order
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub total_customers: usize,
    pub segments: Vec<SegmentStats>,
}

impl SegmentSummary {
    pub fn from_customers(customers: &[ScoredCustomer]) -> Self {
        let total_customers = customers.len();
        let segments = Segment::ALL
            .into_iter()
            .map(|segment| {
                let members: Vec<&ScoredCustomer> = in_segment(customers, segment).collect();
                let count = members.len();
                let total_monetary: f64 = members.iter().map(|c| c.record.monetary).sum();
                SegmentStats {
                    segment,
                    customers: count,
                    share: percentage(count, total_customers),
                    total_monetary,
                    mean_monetary: if count == 0 {
                        0.0
                    } else {
                        total_monetary / count as f64
                    },
                }
            })
            .collect();

        Self {
            total_customers,
            segments,
        }
    }

    pub fn get(&self, segment: Segment) -> Option<&SegmentStats> {
        self.segments.iter().find(|s| s.segment == segment)
    }
}

impl fmt::Display for SegmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>9} {:>7} {:>16} {:>14}",
            "segment", "customers", "share", "monetary", "mean"
        )?;
        for stats in &self.segments {
            writeln!(
                f,
                "{:<20} {:>9} {:>6.1}% {:>16.2} {:>14.2}",
                stats.segment.label(),
                stats.customers,
                stats.share,
                stats.total_monetary,
                stats.mean_monetary
            )?;
        }
        write!(f, "{:<20} {:>9}", "total", self.total_customers)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn in_segment(customers: &[ScoredCustomer], segment: Segment) -> impl Iterator<Item = &ScoredCustomer> {
    customers.iter().filter(move |c| c.scores.segment == segment)
}

/// Highest monetary first, then by customer key
fn by_monetary_desc(a: &&ScoredCustomer, b: &&ScoredCustomer) -> Ordering {
    b.record
        .monetary
        .total_cmp(&a.record.monetary)
        .then_with(|| a.record.key.cmp(&b.record.key))
}

/// The `n` customers of `segment` with the highest monetary
pub fn top_by_monetary(customers: &[ScoredCustomer], segment: Segment, n: usize) -> Vec<&ScoredCustomer> {
    let mut members: Vec<&ScoredCustomer> = in_segment(customers, segment).collect();
    members.sort_by(by_monetary_desc);
    members.truncate(n);
    members
}

/// Customers of `segment` spending more than the mean over all customers
pub fn above_mean_monetary(customers: &[ScoredCustomer], segment: Segment) -> Vec<&ScoredCustomer> {
    if customers.is_empty() {
        return Vec::new();
    }
    let mean = customers.iter().map(|c| c.record.monetary).sum::<f64>() / customers.len() as f64;

    let mut members: Vec<&ScoredCustomer> = in_segment(customers, segment)
        .filter(|c| c.record.monetary > mean)
        .collect();
    members.sort_by(by_monetary_desc);
    members
}

/// Which members of a segment a drill-down lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// The `n` highest spenders
    Top(usize),
    /// Every member above the overall mean monetary, without a count limit
    AboveMean,
}

/// Members of `segment` selected by `listing`, highest monetary first
pub fn list_segment(customers: &[ScoredCustomer], segment: Segment, listing: Listing) -> Vec<&ScoredCustomer> {
    match listing {
        Listing::Top(n) => top_by_monetary(customers, segment, n),
        Listing::AboveMean => above_mean_monetary(customers, segment),
    }
}

/// Customers holding the largest monetary and the largest frequency
#[derive(Debug, Clone, PartialEq)]
pub struct Extremes<'a> {
    pub top_monetary: Vec<&'a ScoredCustomer>,
    pub top_frequency: Vec<&'a ScoredCustomer>,
}

pub fn extremes(customers: &[ScoredCustomer]) -> Extremes<'_> {
    let max_monetary = customers
        .iter()
        .map(|c| c.record.monetary)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_frequency = customers.iter().map(|c| c.record.frequency).max();

    Extremes {
        top_monetary: customers
            .iter()
            .filter(|c| c.record.monetary == max_monetary)
            .collect(),
        top_frequency: customers
            .iter()
            .filter(|c| Some(c.record.frequency) == max_frequency)
            .collect(),
    }
}

/// One line per customer for terminal listings
pub fn format_customer(customer: &ScoredCustomer) -> String {
    let record = &customer.record;
    format!(
        "{:<12} {:<4} recency={:<4} frequency={:<5} monetary={:>14.2} rfm={} segment={}",
        record.key.customer_id,
        record.key.country,
        record.recency,
        record.frequency,
        record.monetary,
        customer.scores.rfm_score(),
        customer.scores.segment
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CustomerKey;
    use crate::rfm::RfmRecord;
    use crate::score::{Score, ScoreSet};

    fn customer(id: &str, frequency: u64, monetary: f64, r: u8, fm: u8) -> ScoredCustomer {
        let r = Score::new(r).unwrap();
        let fm = Score::new(fm).unwrap();
        ScoredCustomer {
            record: RfmRecord {
                key: CustomerKey::new("KR", id),
                recency: 10,
                frequency,
                monetary,
            },
            scores: ScoreSet::new(r, fm, fm),
        }
    }

    fn sample() -> Vec<ScoredCustomer> {
        vec![
            customer("1", 12, 9000.0, 5, 5),
            customer("2", 4, 300.0, 3, 3),
            customer("3", 5, 2500.0, 3, 3),
            customer("4", 1, 10.0, 1, 1),
            customer("5", 2, 900.0, 3, 3),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let customers = sample();
        let summary = SegmentSummary::from_customers(&customers);

        assert_eq!(summary.total_customers, 5);
        assert_eq!(summary.segments.len(), Segment::ALL.len());
        assert_eq!(
            summary.segments.iter().map(|s| s.customers).sum::<usize>(),
            5
        );

        let attention = summary.get(Segment::NeedAttention).unwrap();
        assert_eq!(attention.customers, 3);
        assert!((attention.share - 60.0).abs() < 1e-9);
        assert!((attention.mean_monetary - 1233.333333).abs() < 1e-3);

        let hibernating = summary.get(Segment::Hibernating).unwrap();
        assert_eq!(hibernating.customers, 0);
        assert_eq!(hibernating.mean_monetary, 0.0);
    }

    #[test]
    fn test_top_by_monetary() {
        let customers = sample();
        let top = top_by_monetary(&customers, Segment::NeedAttention, 2);
        let ids: Vec<&str> = top.iter().map(|c| c.record.key.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "5"]);
    }

    #[test]
    fn test_above_mean_monetary() {
        let customers = sample();
        // mean monetary is 2542
        let above = above_mean_monetary(&customers, Segment::NeedAttention);
        assert!(above.is_empty());

        let above = above_mean_monetary(&customers, Segment::Champions);
        assert_eq!(above.len(), 1);
    }

    #[test]
    fn test_above_mean_listing_is_not_truncated() {
        // mean monetary is 350, so 400, 500 and 600 qualify
        let customers: Vec<ScoredCustomer> = (1..=6)
            .map(|i| customer(&i.to_string(), 2, f64::from(i) * 100.0, 3, 3))
            .collect();

        let listed = list_segment(&customers, Segment::NeedAttention, Listing::AboveMean);
        let ids: Vec<&str> = listed.iter().map(|c| c.record.key.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["6", "5", "4"]);

        let listed = list_segment(&customers, Segment::NeedAttention, Listing::Top(2));
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_extremes() {
        let customers = sample();
        let found = extremes(&customers);
        assert_eq!(found.top_monetary.len(), 1);
        assert_eq!(found.top_monetary[0].record.key.customer_id, "1");
        assert_eq!(found.top_frequency[0].record.frequency, 12);
    }

    #[test]
    fn test_summary_display() {
        let text = SegmentSummary::from_customers(&sample()).to_string();
        assert!(text.contains("need attention"));
        assert!(text.lines().count() == Segment::ALL.len() + 2);
    }
}
