pub mod classifier;
pub mod error;
pub mod media_hosting;
pub mod object_store;
pub mod staging;
