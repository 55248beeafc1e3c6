//! Port traits at the I/O seams: configuration, price data and parameter
//! search.

pub mod config_port;
pub mod data_port;
pub mod search_port;
