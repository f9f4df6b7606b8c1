//! Remote persistence for the project collection.
//!
//! `BlobStore` is the versioned blob store capability (read returns content
//! and version, writes require the current version). `GithubStore` backs it
//! with the GitHub contents API; `RemoteProjectStore` layers the project
//! semantics on top of any backend.

mod api_types;
pub mod blob;
mod github;
#[cfg(test)]
pub mod memory;
mod remote;

pub use blob::BlobStore;
pub use github::GithubStore;
pub use remote::{RemoteProjectStore, StoreLayout, UploadedAsset};
