pub mod client;
pub mod enumerator;
pub mod error;
pub mod executor;
pub mod node;
pub mod query;

pub use client::{ClientSettings, SiteClient};
pub use enumerator::{EnumerateOptions, Enumerator, NodeErrorCallback, QueryBuildCallback};
pub use error::ScanError;
pub use executor::{Settled, Tally, run_sequential};
pub use node::{EnumerationResult, Node, NodeFailure};
pub use query::QuerySpec;
