// Library root: domain types, configuration, and the pure helpers shared by
// the scrape pipeline and any downstream consumer of its output files.

pub mod coerce;
pub mod config;
pub mod model;
pub mod slug;
