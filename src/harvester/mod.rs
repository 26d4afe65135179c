//! Harvester module for record fetching and processing
//!
//! This module contains the core harvest logic, including:
//! - HTTP fetching with a fixed client identity
//! - Field extraction from record pages
//! - Politeness pacing between requests
//! - Overall harvest coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pacing;

pub use coordinator::{run_harvest, Coordinator};
pub use extractor::{CatalogExtractor, FieldExtractor, FieldLabels, RawFields};
pub use fetcher::{build_http_client, FetchResult, Fetcher, FixtureFetcher, HttpFetcher};
pub use pacing::Pacer;
