pub mod jumps;
pub mod partition;
pub mod statistics;
