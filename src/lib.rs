pub mod error;
pub mod normalizer;
pub mod vectorizer;
pub mod partitioner;
pub mod aggregator;
pub mod table;
pub mod pipeline;
pub mod export;
pub mod multiline;
pub mod sample;

pub use error::InputError;
pub use pipeline::{cluster_logs, identify_noise, run, ClusterOpts, NoiseReport};
pub use table::LogTable;
