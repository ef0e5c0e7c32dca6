//! RfmForge: customer segmentation from sales records using RFM analysis
//!
//! Orders are restricted to a trailing window, aggregated per customer into
//! recency, frequency and monetary metrics, scored into dataset-relative
//! quintiles and mapped to one of eleven named segments.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod rfm;
pub mod score;
pub mod segment;
pub mod window;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{MalformedRowPolicy, PipelineConfig, WeekNumbering};
pub use data::{load_orders, orders_frame, CustomerKey, Ingested, Order};
pub use error::RfmError;
pub use export::{read_export, write_export};
pub use pipeline::{run, segment_orders, SegmentationRun};
pub use report::{Listing, SegmentSummary};
pub use rfm::{aggregate, RfmRecord};
pub use score::{score_records, RfmQuintiles, Score, ScoreSet, ScoredCustomer};
pub use segment::Segment;
pub use window::AnalysisWindow;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, RfmError>;
