//! cwagent - host memory, swap and disk metrics agent library.
//!
//! Reads OS counters, turns them into unit-scaled metric records and
//! publishes them in bounded batches on a fixed schedule. The `cwagent`
//! binary wires these pieces to the command line.

pub mod agent;
pub mod collector;
pub mod config;
pub mod identity;
pub mod metrics;
pub mod publisher;
pub mod scheduler;

#[cfg(test)]
mod test_server;
