pub mod memory;
pub mod port;
