pub mod collector;

pub use collector::{Collector, Entry, unused_port};
