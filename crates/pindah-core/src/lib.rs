//! pindah-core - Core types and traits for the pindah migration toolkit.

pub mod credentials;
pub mod error;
pub mod limit;
pub mod metadata;
pub mod records;
pub mod tokens;
pub mod traits;

pub use credentials::Credentials;
pub use error::Error;
pub use limit::page_limit;
pub use metadata::Metadata;
pub use records::{
    Channel, Connection, CsvEntity, EntityKind, EntityPage, PageMeta, Thing, User,
};
pub use tokens::AccessToken;
pub use traits::{PageSource, Platform};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
