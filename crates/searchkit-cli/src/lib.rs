//! CLI library components for the searchkit driver.

pub mod logging;
pub mod session;
