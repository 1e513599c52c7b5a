//! # cloudtrim_provider
//!
//! Cloud provider API seam for cloudtrim.
//!
//! This crate defines the outbound calls the cost analysis engine makes
//! (instance listing, bucket listing, utilization telemetry and the price
//! catalog) as async traits, plus the implementations the workspace ships.
//!
//! # Implementations
//!
//! - **MockProvider**: scriptable in-memory provider for tests
//! - **SnapshotProvider**: serves a YAML/JSON inventory snapshot for offline audits
//! - **HttpPriceCatalog**: price catalog reached over HTTP
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudtrim_provider::{HttpPriceCatalog, ProviderClients, SnapshotProvider};
//!
//! let snapshot = SnapshotProvider::load("inventory.yaml")?;
//! let clients = ProviderClients::from_provider(snapshot)
//!     .with_price_catalog(Arc::new(HttpPriceCatalog::new("http://localhost:8080/products")));
//! # Ok::<(), cloudtrim_provider::ProviderError>(())
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod mock;
pub mod snapshot;

pub use api::{
    on_demand_price_document, BucketDescription, BucketPage, ComputeApi, Datapoint,
    InstanceDescription, InstancePage, MetricQuery, MetricsApi, PriceCatalogApi, PriceFilter,
    PriceQuery, ProviderClients, StorageApi,
};
pub use error::{ProviderError, ProviderResult};
pub use http::HttpPriceCatalog;
pub use mock::{CapturedCall, MockApi, MockProvider};
pub use snapshot::{Snapshot, SnapshotBucket, SnapshotInstance, SnapshotPrice, SnapshotProvider};
