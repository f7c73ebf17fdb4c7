//! Indexing pipeline components.
//!
//! - **discovery**: list a scope's files and find every scope
//! - **probe**: stat files for size and modification time
//! - **decode** / **metadata** / **placeholder**: local extraction stages
//! - **extract**: the local extractor built from those stages
//! - **remote**: the extractor backed by a remote image service
//! - **indexer**: orchestrates a run for one scope

pub mod decode;
pub mod discovery;
pub mod extract;
pub mod indexer;
pub mod metadata;
pub mod placeholder;
pub mod probe;
pub mod remote;
pub mod retry;
pub mod scope;

pub use discovery::{discover_scopes, list_files};
pub use extract::LocalExtractor;
pub use indexer::PhotoIndexer;
pub use metadata::MetadataExtractor;
pub use placeholder::PlaceholderGenerator;
pub use probe::probe;
pub use remote::{resolve_thumbnail_src, RemoteExtractor};
pub use scope::Scope;
