pub mod client;
pub mod opener;
