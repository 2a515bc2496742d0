//! Collection price source.
//!
//! ## Architecture
//!
//! - `renderer` - `PageRenderer` capability plus the headless Chromium backend
//! - `opensea` - `OpenSeaSource`: collection URL, element selectors, retry and validation
//! - `error` - `FeedError`

pub mod error;
pub mod opensea;
pub mod renderer;

pub use error::*;
pub use opensea::{OpenSeaSource, SourceConfig, BEST_OFFER, DEFAULT_BASE_URL, FLOOR_PRICE};
pub use renderer::{
    ChromeConfig, ChromeRenderer, ElementQuery, MockRenderer, PageRenderer, DEFAULT_USER_AGENT,
};
