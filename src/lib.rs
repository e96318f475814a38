//! upgrid - Up banking data as tabular grids
//!
//! Fetches transactions, accounts, categories and tags from the Up API,
//! following pagination up to a record cap, and maps each resource into a
//! header-plus-rows [`Grid`]. Failures come back as small error grids rather
//! than errors, the way spreadsheet formulas report them.

pub mod config;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod formulas;
pub mod grid;
pub mod output;
pub mod query;
pub mod resources;
pub mod tabulate;
pub mod token_store;

pub use config::UpConfig;
pub use error::{FixSuggestion, UpError};
pub use fetcher::Fetcher;
pub use formulas::Formulas;
pub use grid::{Cell, Grid};
pub use output::OutputFormat;
pub use tabulate::{Direction, ResourceKind};
pub use token_store::{
    CredentialProvider, EnvCredential, FileCache, MemoryCache, StaticCredential, TokenCache,
};
