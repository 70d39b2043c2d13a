//! Operational jobs of cryptofolio.
//!
//! `market_data` talks to the price providers, `ops_shell` runs the
//! collection and registry jobs on top of it.

pub use market_data;
pub use ops_shell;
