pub mod client;
pub mod dataset;
pub mod expression;
pub mod rest;

pub use client::{ImageCollectionService, RegionTable};
pub use dataset::{AccessorParams, DatasetAccessor};
pub use rest::{RestClient, RestClientOptions};
