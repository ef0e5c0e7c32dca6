//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::config::{MalformedRowPolicy, PipelineConfig, WeekNumbering, DEFAULT_PERIOD_DAYS};
use crate::report::Listing;
use crate::segment::Segment;

/// Customer segmentation CLI using quintile-scored RFM analysis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input sales table
    #[arg(short, long, default_value = "sales.csv")]
    pub input: String,

    /// Output path for the RFM export
    #[arg(short, long, default_value = "rfm.csv")]
    pub output: String,

    /// Length of the trailing analysis window in days
    #[arg(short, long, default_value_t = DEFAULT_PERIOD_DAYS)]
    pub period: u32,

    /// Field separator of the input table
    #[arg(long, default_value_t = ';')]
    pub separator: char,

    /// Decimal mark of numeric input fields
    #[arg(long, default_value_t = ',')]
    pub decimal: char,

    /// How the week in `week.year` is numbered
    #[arg(long, value_enum, default_value_t = WeekNumbering::Monday)]
    pub week_numbering: WeekNumbering,

    /// What to do with rows that cannot be parsed
    #[arg(long, value_enum, default_value_t = MalformedRowPolicy::Fail)]
    pub on_malformed: MalformedRowPolicy,

    /// List the top customers of a segment, e.g. --segment "need attention"
    #[arg(long)]
    pub segment: Option<String>,

    /// Number of customers to list with --segment (ignored with --above-mean)
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// With --segment, only list customers above the mean monetary of all customers
    #[arg(long, requires = "segment")]
    pub above_mean: bool,

    /// Validate an existing export instead of running the pipeline
    #[arg(long)]
    pub verify: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the pipeline configuration from the arguments
    pub fn pipeline_config(&self) -> crate::Result<PipelineConfig> {
        let separator = u8::try_from(self.separator).map_err(|_| {
            crate::RfmError::InvalidConfig(format!(
                "separator {:?} is not a single-byte character",
                self.separator
            ))
        })?;

        let config = PipelineConfig {
            period_days: self.period,
            separator,
            decimal_mark: self.decimal,
            week_numbering: self.week_numbering,
            on_malformed: self.on_malformed,
        };
        config.validate()?;
        Ok(config)
    }

    /// How the --segment drill-down selects customers
    pub fn listing(&self) -> Listing {
        if self.above_mean {
            Listing::AboveMean
        } else {
            Listing::Top(self.top)
        }
    }

    /// Parse the segment requested with --segment
    pub fn segment_filter(&self) -> crate::Result<Option<Segment>> {
        self.segment
            .as_deref()
            .map(|label| label.parse::<Segment>().map_err(crate::RfmError::InvalidConfig))
            .transpose()
    }
}
