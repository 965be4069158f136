#![forbid(unsafe_code)]

pub mod groups;
pub mod logger;
pub mod result;
pub mod tables;
pub mod writer;
