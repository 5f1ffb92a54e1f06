use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use triarb_core::{CurrencyPair, Order, Orderbook, Result, TriArbError, VenueId, VenueSettings};

use crate::rate_limiter::RateLimiter;
use crate::traits::ExchangeAdapter;

#[derive(Debug, Clone, Default)]
pub struct VenueStatus {
    pub request_count: u64,
    pub error_count: u64,
    pub last_request: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct VenueHandle {
    adapter: Arc<dyn ExchangeAdapter>,
    limiter: Arc<RateLimiter>,
    settings: Option<VenueSettings>,
    status: VenueStatus,
}

/// Owns every venue adapter together with its rate limiter and loaded settings.
pub struct ExchangeManager {
    venues: RwLock<HashMap<VenueId, VenueHandle>>,
    fetch_timeout: Duration,
}

impl ExchangeManager {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self {
            venues: RwLock::new(HashMap::new()),
            fetch_timeout,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub async fn add_adapter(&self, adapter: Arc<dyn ExchangeAdapter>, request_delay: Duration) {
        let venue_id = adapter.venue_id();
        info!("Adding adapter for venue: {} (min interval {:?})", venue_id, request_delay);

        let mut venues = self.venues.write().await;
        venues.insert(
            venue_id,
            VenueHandle {
                adapter,
                limiter: Arc::new(RateLimiter::new(request_delay)),
                settings: None,
                status: VenueStatus::default(),
            },
        );
    }

    /// Fetches and stores the settings of one venue.
    pub async fn load_settings(&self, venue_id: &VenueId) -> Result<VenueSettings> {
        let adapter = self.adapter(venue_id).await?;
        let settings = adapter.get_settings().await?;

        if settings.venue != *venue_id {
            return Err(TriArbError::InvalidData(format!(
                "Adapter for {} reported settings of {}",
                venue_id, settings.venue
            )));
        }

        debug!(
            "Loaded settings for {}: {} pairs, fee rate {}",
            venue_id,
            settings.available_pairs.len(),
            settings.fee_rate
        );

        let mut venues = self.venues.write().await;
        if let Some(handle) = venues.get_mut(venue_id) {
            handle.settings = Some(settings.clone());
        }
        Ok(settings)
    }

    /// Loads the settings of every registered venue. A venue that fails is left out
    /// of the scan; an empty result is an error.
    pub async fn load_all_settings(&self) -> Result<Vec<VenueSettings>> {
        let mut loaded = Vec::new();

        for venue_id in self.venues().await {
            match self.load_settings(&venue_id).await {
                Ok(settings) => loaded.push(settings),
                Err(e) => warn!("Skipping venue {}: failed to load settings: {}", venue_id, e),
            }
        }

        if loaded.is_empty() {
            return Err(TriArbError::InvalidData(
                "No venue settings could be loaded".to_string(),
            ));
        }

        info!("Loaded settings for {} venues", loaded.len());
        Ok(loaded)
    }

    pub async fn settings(&self, venue_id: &VenueId) -> Option<VenueSettings> {
        let venues = self.venues.read().await;
        venues.get(venue_id).and_then(|handle| handle.settings.clone())
    }

    /// Best bid/ask for `pair` on `venue_id`, spaced by the venue's rate limiter and
    /// bounded by the fetch timeout.
    pub async fn fetch_orderbook(&self, venue_id: &VenueId, pair: &CurrencyPair) -> Result<Orderbook> {
        let (adapter, limiter) = {
            let venues = self.venues.read().await;
            let handle = venues
                .get(venue_id)
                .ok_or_else(|| TriArbError::UnknownVenue(venue_id.clone()))?;
            (handle.adapter.clone(), handle.limiter.clone())
        };

        limiter.acquire().await;
        debug!("Fetching orderbook for {} on {}", pair, venue_id);

        let result = match tokio::time::timeout(self.fetch_timeout, adapter.get_orderbook(pair)).await {
            Ok(Ok(book)) if book.pair == *pair => Ok(book),
            Ok(Ok(book)) => Err(TriArbError::QuoteFetchFailed {
                venue: venue_id.clone(),
                pair: pair.clone(),
                reason: format!("venue answered for {}", book.pair),
            }),
            Ok(Err(e)) => Err(TriArbError::QuoteFetchFailed {
                venue: venue_id.clone(),
                pair: pair.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(TriArbError::Timeout(format!(
                "orderbook {} on {} after {:?}",
                pair, venue_id, self.fetch_timeout
            ))),
        };

        self.record_request(venue_id, result.as_ref().err()).await;
        result
    }

    pub async fn post_order(&self, venue_id: &VenueId, order: &Order) -> Result<Order> {
        let (adapter, limiter, settings) = {
            let venues = self.venues.read().await;
            let handle = venues
                .get(venue_id)
                .ok_or_else(|| TriArbError::UnknownVenue(venue_id.clone()))?;
            let settings = handle.settings.clone().ok_or_else(|| {
                TriArbError::Exchange(format!("Settings for {} not loaded", venue_id))
            })?;
            (handle.adapter.clone(), handle.limiter.clone(), settings)
        };

        limiter.acquire().await;
        info!("Posting order on {}: {}", venue_id, order);

        let result = adapter.post_order(order, &settings).await;
        if let Err(e) = &result {
            error!("Failed to post order on {}: {}", venue_id, e);
        }
        self.record_request(venue_id, result.as_ref().err()).await;
        result
    }

    pub async fn venues(&self) -> Vec<VenueId> {
        let venues = self.venues.read().await;
        let mut ids: Vec<VenueId> = venues.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn venue_status(&self, venue_id: &VenueId) -> Option<VenueStatus> {
        let venues = self.venues.read().await;
        venues.get(venue_id).map(|handle| handle.status.clone())
    }

    async fn adapter(&self, venue_id: &VenueId) -> Result<Arc<dyn ExchangeAdapter>> {
        let venues = self.venues.read().await;
        venues
            .get(venue_id)
            .map(|handle| handle.adapter.clone())
            .ok_or_else(|| TriArbError::UnknownVenue(venue_id.clone()))
    }

    async fn record_request(&self, venue_id: &VenueId, error: Option<&TriArbError>) {
        let mut venues = self.venues.write().await;
        if let Some(handle) = venues.get_mut(venue_id) {
            handle.status.request_count += 1;
            handle.status.last_request = Some(Utc::now());
            if let Some(e) = error {
                handle.status.error_count += 1;
                handle.status.last_error = Some(e.to_string());
            }
        }
    }
}

impl std::fmt::Debug for ExchangeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeManager")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
