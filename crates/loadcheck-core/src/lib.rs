pub mod config;
pub mod db;
pub mod error;
pub mod model_load;
pub mod object_store;
pub mod partition;
pub mod pipeline;
pub mod quality;
pub mod queries;
pub mod sql;
pub mod staging;
pub mod step;
pub mod types;
pub mod warehouse;
