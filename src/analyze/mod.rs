//! Filter evaluation: keyword rules and the concurrent fan-out/fan-in that
//! merges their verdicts.

pub mod aggregate;
pub mod rules;

pub use aggregate::Aggregator;
pub use rules::{evaluate, excepts_hit, includes_ok, Filter};
