//! Utility modules.
//!
//! Dense boolean vector helpers shared by the graph and the controller, and a
//! seeded random number generator for producing input streams.

pub mod bits;
mod random;

pub use random::Random;
