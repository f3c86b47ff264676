//! ZTS migration library - matching core and migration jobs shared by the CLI.

pub mod audit;
pub mod config;
pub mod disambiguate;
pub mod error;
pub mod fuzzy;
pub mod idmap;
pub mod jobs;
pub mod lookup;
pub mod matcher;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scan;
pub mod schema;
pub mod stats;
pub mod store;
pub mod xml;
