pub mod clickstream;
pub mod graph;
