//! Input loading and import provenance.

mod loader;
mod source;

pub use loader::{Loader, LoaderConfig};
pub use source::{ImportBatch, Source};
