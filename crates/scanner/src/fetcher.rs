use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use triarb_core::prelude::*;
use triarb_exchange::ExchangeManager;
use triarb_graph::{Tree, VertexId};
use triarb_monitoring::{MetricsCollector, StructuredLogger};

/// Outcome of one vertex refresh. `order` is `None` when the quote could not be obtained.
#[derive(Debug, Clone)]
pub struct VertexQuote {
    pub vertex: VertexId,
    pub order: Option<Order>,
}

impl VertexQuote {
    pub fn is_quoted(&self) -> bool {
        self.order.is_some()
    }
}

/// Refreshes a batch of vertices: one orderbook request per distinct `(venue, pair)`,
/// venues in parallel, requests to one venue one after another behind its rate limiter.
pub struct VertexFetcher {
    exchanges: Arc<ExchangeManager>,
    metrics: Option<Arc<MetricsCollector>>,
    logger: StructuredLogger,
}

type VenueRequests = Vec<(CurrencyPair, Vec<VertexId>)>;

impl VertexFetcher {
    pub fn new(exchanges: Arc<ExchangeManager>) -> Self {
        Self {
            exchanges,
            metrics: None,
            logger: StructuredLogger::new("fetcher"),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetches quotes for `vertices`. Every requested vertex gets exactly one entry in the
    /// result; failures never abort the rest of the batch and are not retried.
    pub async fn fetch_vertices(&self, tree: &Tree, vertices: &[VertexId]) -> Vec<VertexQuote> {
        let mut by_venue: BTreeMap<VenueId, VenueRequests> = BTreeMap::new();

        for &id in vertices {
            let key = tree.vertex(id).key();
            let requests = by_venue.entry(key.venue.clone()).or_default();
            match requests.iter_mut().find(|(pair, _)| *pair == key.pair) {
                Some((_, ids)) => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                None => requests.push((key.pair.clone(), vec![id])),
            }
        }

        debug!(
            "Fetching {} vertices across {} venues",
            vertices.len(),
            by_venue.len()
        );

        let tasks = by_venue
            .into_iter()
            .map(|(venue, requests)| self.fetch_venue(tree, venue, requests));

        join_all(tasks).await.into_iter().flatten().collect()
    }

    async fn fetch_venue(&self, tree: &Tree, venue: VenueId, requests: VenueRequests) -> Vec<VertexQuote> {
        let fee_rate = self
            .exchanges
            .settings(&venue)
            .await
            .map(|settings| settings.fee_rate);
        let venue_label = venue.to_string();
        let mut quotes = Vec::new();

        for (pair, ids) in requests {
            match self.exchanges.fetch_orderbook(&venue, &pair).await {
                Ok(book) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_quote_request(&venue_label, book.latency_ms().max(0) as f64 / 1000.0);
                    }

                    for id in ids {
                        let side = tree.vertex(id).key().side;
                        let order = match book.quote_for(side) {
                            Ok(order) => Some(match fee_rate {
                                Some(fee_rate) => order.with_fee_rate(fee_rate),
                                None => order,
                            }),
                            Err(e) => {
                                warn!("No {} quote for {} on {}: {}", side, pair, venue, e);
                                None
                            }
                        };
                        quotes.push(VertexQuote { vertex: id, order });
                    }
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_quote_error(&venue_label, error_kind(&e));
                    }
                    self.logger
                        .log_quote_failure(&venue_label, &pair.to_string(), &e.to_string());
                    quotes.extend(ids.into_iter().map(|vertex| VertexQuote { vertex, order: None }));
                }
            }
        }

        quotes
    }
}

fn error_kind(error: &TriArbError) -> &'static str {
    match error {
        TriArbError::Timeout(_) => "timeout",
        TriArbError::QuoteFetchFailed { .. } => "fetch",
        TriArbError::UnknownVenue(_) => "unknown_venue",
        _ => "other",
    }
}
