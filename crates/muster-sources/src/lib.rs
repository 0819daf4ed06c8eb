//! # muster-sources
//!
//! Sources that feed the inventory: the cloud provider gateway and its
//! flattening adapter, plus the curated and replay sources.
//!
//! Every source implements [`muster_core::source::Source`] and is driven by
//! the reconciliation engine in `muster-core`.

pub mod cloud;
pub mod curated;
pub mod replay;

// Re-export the source contract so adapters can be written against this
// crate alone.
pub use muster_core::source::{Source, SourceError, SourceResult};

// Re-export source implementations
pub use cloud::{
    AuthConfig, CloudApi, CloudSource, GatewayConfig, HttpGateway, ReplayGateway, CLOUD_KINDS,
};
pub use curated::CuratedSource;
pub use replay::ReplaySource;
