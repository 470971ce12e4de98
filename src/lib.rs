pub mod graph_utils;
pub mod gql;
pub mod persistence;
pub mod render;
pub mod session;
pub mod wiki;
