//! OpenSea collection page price source.
//!
//! Collection pages hydrate asynchronously and intermittently show zero or
//! placeholder values while they do. A read only counts when both prices
//! parse to a known currency and a non-zero amount; anything else is retried
//! within a fixed attempt budget.

use crate::error::FeedError;
use crate::renderer::{ElementQuery, PageRenderer};
use floorwatch_core::{CollectionPrices, Price, PriceSnapshot, NOT_AVAILABLE};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://opensea.io/collection";

/// Element name for the collection floor price.
pub const FLOOR_PRICE: &str = "floor_price";
/// Element name for the collection best offer.
pub const BEST_OFFER: &str = "best_offer";

const FLOOR_PRICE_SELECTOR: &str =
    r#"a[data-testid="collection-stats-floor-price"] div.flex.items-center"#;
const BEST_OFFER_SELECTOR: &str =
    r#"a[data-testid="collection-stats-best-offer"] div.flex.items-center"#;

/// Retry and timeout settings for the source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    /// Attempts per fetch, including the first.
    pub max_retries: u32,
    /// Bound on navigation and on each element wait.
    pub timeout: Duration,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 5,
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Reads floor price and best offer from OpenSea collection pages.
pub struct OpenSeaSource<R> {
    renderer: R,
    config: SourceConfig,
    elements: Vec<ElementQuery>,
}

impl<R: PageRenderer> OpenSeaSource<R> {
    pub fn new(renderer: R, config: SourceConfig) -> Self {
        Self {
            renderer,
            config,
            elements: vec![
                ElementQuery::new(FLOOR_PRICE, FLOOR_PRICE_SELECTOR),
                ElementQuery::new(BEST_OFFER, BEST_OFFER_SELECTOR),
            ],
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Page URL for a collection slug.
    pub fn collection_url(&self, collection: &str) -> Result<Url, FeedError> {
        let base = self.config.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, collection))?)
    }

    /// Fetch the current prices as display strings.
    pub async fn fetch(&self, collection: &str) -> Result<PriceSnapshot, FeedError> {
        self.get_collection_prices(collection)
            .await
            .map(|prices| PriceSnapshot::from(&prices))
    }

    /// Fetch both prices, retrying until a non-degenerate pair is read or the
    /// attempt budget runs out.
    pub async fn get_collection_prices(
        &self,
        collection: &str,
    ) -> Result<CollectionPrices, FeedError> {
        let url = self.collection_url(collection)?;
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = String::from("none");

        for attempt in 1..=max_retries {
            match self.try_get_prices(url.as_str()).await {
                Ok(prices) if !prices.is_degenerate() => return Ok(prices),
                Ok(prices) => {
                    warn!(
                        floor_price = %prices.floor_price,
                        best_offer = %prices.best_offer,
                        "Attempt {}/{}: got degenerate prices, retrying",
                        attempt,
                        max_retries
                    );
                    last_error = FeedError::Degenerate {
                        floor_price: prices.floor_price.to_string(),
                        best_offer: prices.best_offer.to_string(),
                    }
                    .to_string();
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, max_retries, e);
                    last_error = e.to_string();
                    if !e.is_transient() {
                        break;
                    }
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        error!(
            "All {} attempts failed. Last error: {}",
            max_retries, last_error
        );
        Err(FeedError::RetriesExhausted {
            attempts: max_retries,
            last_error,
        })
    }

    /// One render of the page. Parse failures come back as unknown prices.
    async fn try_get_prices(&self, url: &str) -> Result<CollectionPrices, FeedError> {
        info!("Accessing {}", url);
        let texts = self
            .renderer
            .render_and_extract(url, &self.elements, self.config.timeout)
            .await?;

        let floor_price = element_text(&texts, FLOOR_PRICE)?;
        let best_offer = element_text(&texts, BEST_OFFER)?;
        if floor_price == NOT_AVAILABLE || best_offer == NOT_AVAILABLE {
            return Err(FeedError::NotAvailable);
        }

        Ok(CollectionPrices {
            floor_price: parse_price(&floor_price),
            best_offer: parse_price(&best_offer),
        })
    }
}

/// Whitespace-collapsed text of a named element.
fn element_text(texts: &HashMap<String, String>, name: &str) -> Result<String, FeedError> {
    texts
        .get(name)
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .ok_or_else(|| FeedError::MissingElement(name.to_string()))
}

fn parse_price(text: &str) -> Price {
    text.parse().unwrap_or_else(|e| {
        error!("Error parsing price string '{}': {}", text, e);
        Price::unknown()
    })
}
