//! Loosely-typed camera metadata: tagged values and the provider seam.

mod provider;
mod value;

pub use provider::{MetadataError, MetadataProvider, StaticMetadata};
pub use value::{MetaValue, Metadata};
