use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::Result;
use crate::matching::{IngestStats, MatchingService};
use crate::notifications::OutboxDispatcher;
use crate::providers::{
    NewProviderRequest, NormalizedListing, ProviderError, ProviderRegistry,
    ProviderRequestRepository, SearchQuery,
};
use crate::watch_rules::{WatchRuleRepository, WatchSearchRule};

use super::runner_model::{ProviderOutcome, ProviderRunStatus, RuleRunSummary};

/// Executes one due rule end to end: fan out to its configured providers
/// through the retry wrapper, then fold every successful provider's
/// listings through the matching engine inside a single transaction.
pub struct RuleRunner {
    pool: Arc<DbPool>,
    registry: Arc<ProviderRegistry>,
    matching: Arc<MatchingService>,
    outbox: Arc<OutboxDispatcher>,
    rules: WatchRuleRepository,
    requests: ProviderRequestRepository,
    clock: Arc<dyn Clock>,
    listing_limit: u32,
}

impl RuleRunner {
    pub fn new(
        pool: Arc<DbPool>,
        registry: Arc<ProviderRegistry>,
        matching: Arc<MatchingService>,
        outbox: Arc<OutboxDispatcher>,
        clock: Arc<dyn Clock>,
        listing_limit: u32,
    ) -> Self {
        Self {
            pool,
            registry,
            matching,
            outbox,
            rules: WatchRuleRepository::new(),
            requests: ProviderRequestRepository::new(),
            clock,
            listing_limit,
        }
    }

    pub async fn run_rule_once(&self, rule: &WatchSearchRule) -> Result<RuleRunSummary> {
        let result = self.fetch_and_ingest(rule).await;

        // The cadence advances whether the run succeeded or not, otherwise
        // a broken rule comes due again on every tick.
        let now = self.clock.now();
        let mut conn = crate::db::get_connection(&self.pool)?;
        self.rules
            .complete_run(&mut conn, &rule.id, now.naive_utc(), rule.poll_interval())?;

        let (stats, providers) = result?;

        // Markers written by the ingest transaction are visible now that it
        // has committed; a dispatch failure leaves them for the sweep.
        if let Err(e) = self.outbox.run_after_commit(&mut conn, now).await {
            warn!("Outbox dispatch after rule {} failed: {}", rule.id, e);
        }

        let outcome = RuleRunSummary::outcome_from(&providers);
        info!(
            "Rule {} run {}: {} fetched, {} matches, {} notifications",
            rule.id,
            outcome.as_str(),
            stats.fetched,
            stats.matches_created,
            stats.notifications_created
        );
        Ok(RuleRunSummary {
            rule_id: rule.id.clone(),
            outcome,
            stats,
            providers,
        })
    }

    async fn fetch_and_ingest(
        &self,
        rule: &WatchSearchRule,
    ) -> Result<(IngestStats, Vec<ProviderOutcome>)> {
        let mut query = rule.parsed_query()?;
        // Deterministic providers key their output off the rule.
        query.seed = Some(rule.id.clone());
        let sources = rule.sources_or(&query, &self.registry.default_sources());

        let mut providers = Vec::with_capacity(sources.len());
        let mut collected: Vec<NormalizedListing> = Vec::new();

        for source in &sources {
            let outcome = self.fetch_from_provider(source, &query).await;
            match outcome {
                Ok(listings) => {
                    providers.push(ProviderOutcome {
                        provider: source.clone(),
                        status: ProviderRunStatus::Succeeded {
                            fetched: listings.len(),
                        },
                    });
                    collected.extend(listings);
                }
                Err(ProviderError::Disabled { provider, reason }) => {
                    info!("Skipping disabled provider {} for rule {}", provider, rule.id);
                    providers.push(ProviderOutcome {
                        provider: source.clone(),
                        status: ProviderRunStatus::Skipped { reason },
                    });
                }
                Err(e) => {
                    // One provider's failure never aborts its siblings.
                    warn!("Provider {} failed for rule {}: {}", source, rule.id, e);
                    providers.push(ProviderOutcome {
                        provider: source.clone(),
                        status: ProviderRunStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        let now = self.clock.now();
        let stats = if collected.is_empty() {
            IngestStats::default()
        } else {
            let matching = self.matching.clone();
            let rule_for_tx = rule.clone();
            let query_for_tx = query.clone();
            self.pool.execute(move |conn| {
                matching.ingest_and_match(conn, &rule_for_tx, &query_for_tx, &collected, now)
            })?
        };

        Ok((stats, providers))
    }

    /// One provider call wrapped in the shared retry policy. Every attempt
    /// is logged to the request journal with its 1-based attempt number.
    async fn fetch_from_provider(
        &self,
        source: &str,
        query: &SearchQuery,
    ) -> std::result::Result<Vec<NormalizedListing>, ProviderError> {
        let provider = self.registry.resolve(source)?;
        let policy = self.registry.retry_policy(source);
        let attempts_total = policy.max_attempts;

        policy
            .run(|attempt| {
                let provider = provider.clone();
                let query = query.clone();
                let pool = self.pool.clone();
                let clock = self.clock.clone();
                let limit = self.listing_limit;
                let requests = &self.requests;
                async move {
                    let started = Instant::now();
                    let outcome = provider.search(&query, limit).await;
                    let duration_ms = started.elapsed().as_millis() as i64;

                    let request = NewProviderRequest::new(
                        provider.id(),
                        provider.default_endpoint(),
                        attempt,
                        attempts_total,
                        clock.now().naive_utc(),
                    );
                    let request = match &outcome {
                        Ok(_) => request.with_success(200, duration_ms),
                        Err(e) => request.with_error(e.status_code(), duration_ms, &e.to_string()),
                    };
                    match pool.get() {
                        Ok(mut conn) => {
                            if let Err(log_err) = requests.log_request(&mut conn, request) {
                                warn!("Failed to journal provider request: {}", log_err);
                            }
                        }
                        Err(e) => warn!("No connection to journal provider request: {}", e),
                    }
                    outcome
                }
            })
            .await
    }
}
