pub mod aggregate;
pub mod aliases;
pub mod attribution;
pub mod config;
pub mod dataset;
pub mod logging;
pub mod match_page;
pub mod merge;
pub mod normalize;
pub mod shots;
