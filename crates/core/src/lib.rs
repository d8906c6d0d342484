pub mod age;
pub mod config;
pub mod model;
pub mod schema;

pub use config::Config;
pub use model::*;
