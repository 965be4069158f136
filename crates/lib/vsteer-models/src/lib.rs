#![forbid(unsafe_code)]

pub mod control;
pub mod device;
pub mod epoch;
pub mod net;
pub mod partition;
pub mod telemetry;
