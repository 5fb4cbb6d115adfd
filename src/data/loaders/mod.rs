// mod.rs - File loaders for input data

pub mod markers;
