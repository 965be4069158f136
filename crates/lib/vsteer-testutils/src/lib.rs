pub mod agent;
pub mod bucket;
pub mod records;
pub mod switch;
