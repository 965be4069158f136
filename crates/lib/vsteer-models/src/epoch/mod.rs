pub mod barrier;
pub mod phase;
