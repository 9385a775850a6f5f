pub mod date_key;
pub mod grouping;

pub use date_key::{format_date_key, parse_date_key};
pub use grouping::{
    DatasetPipeline, DateBucket, Diagnostic, EmptySelectionPolicy, GroupOutcome, Grouping,
};
