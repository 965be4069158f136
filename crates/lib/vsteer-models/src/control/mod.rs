pub mod advisor;
pub mod controller;
pub mod packet;
