//! Segment classification from recency and combined frequency/monetary scores

use std::fmt;
use std::str::FromStr;

use crate::score::Score;

/// Named customer segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    NewCustomers,
    Promising,
    NeedAttention,
    AboutToSleep,
    AtRisk,
    CantLose,
    Hibernating,
    Lost,
}

impl Segment {
    /// Every segment, best first
    pub const ALL: [Segment; 11] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::NewCustomers,
        Segment::Promising,
        Segment::NeedAttention,
        Segment::AboutToSleep,
        Segment::AtRisk,
        Segment::CantLose,
        Segment::Hibernating,
        Segment::Lost,
    ];

    /// Map a recency score and a combined frequency/monetary score to a segment
    ///
    /// `(1, 5)` and `(2, 2)` are carved out of the surrounding at-risk and
    /// lost blocks; the arms for them must stay ahead of the block arms.
    pub fn classify(r: Score, fm: Score) -> Segment {
        use Score::*;

        match (r, fm) {
            (Two, Two) => Segment::Hibernating,
            (One, Five) => Segment::CantLose,
            (One | Two, One | Two) => Segment::Lost,
            (One | Two, Three | Four | Five) => Segment::AtRisk,
            (Three, One | Two) => Segment::AboutToSleep,
            (Three, Three) => Segment::NeedAttention,
            (Five, Five) => Segment::Champions,
            (Three | Four | Five, Four | Five) => Segment::LoyalCustomers,
            (Four, One) => Segment::Promising,
            (Five, One) => Segment::NewCustomers,
            (Four | Five, Two | Three) => Segment::PotentialLoyalists,
        }
    }

    /// Label used in exports
    pub fn label(self) -> &'static str {
        match self {
            Segment::Champions => "champions",
            Segment::LoyalCustomers => "loyal customers",
            Segment::PotentialLoyalists => "potential loyalists",
            Segment::NewCustomers => "new customers",
            Segment::Promising => "promising",
            Segment::NeedAttention => "need attention",
            Segment::AboutToSleep => "about to sleep",
            Segment::AtRisk => "at risk",
            Segment::CantLose => "can't lose",
            Segment::Hibernating => "hibernating",
            Segment::Lost => "lost",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Segment::Champions => "Bought recently, buy often and spend the most",
            Segment::LoyalCustomers => "Buy on a regular basis, responsive to promotions",
            Segment::PotentialLoyalists => "Recent customers with average frequency",
            Segment::NewCustomers => "Bought most recently, but not often",
            Segment::Promising => "Recent shoppers who have not spent much",
            Segment::NeedAttention => {
                "Above average recency, frequency and monetary, may not have bought very recently"
            }
            Segment::AboutToSleep => {
                "Below average recency and frequency, will be lost if not reactivated"
            }
            Segment::AtRisk => "Purchased often but a long time ago",
            Segment::CantLose => "Used to purchase frequently but have not returned for a long time",
            Segment::Hibernating => "Last purchase was long ago with a low number of orders",
            Segment::Lost => "Purchased a long time ago and never came back",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Segment::ALL
            .into_iter()
            .find(|segment| segment.label() == wanted)
            .ok_or_else(|| format!("unknown segment '{}'", wanted))
    }
}
