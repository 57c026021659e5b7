//! Static catalog loading from JSON record files.

pub mod loader;

pub use loader::CatalogLoader;
