pub mod rx;
