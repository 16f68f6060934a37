use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::Arc,
};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::{
    backend::StatsSource,
    config::FanoutConfig,
    stats::{
        merge_chart_series, merge_trailing_series, AccountId, Granularity, StatsWindow,
        TimeSeries, UsageSummary,
    },
    utils::unix_now,
    AggregateError, BackendError,
};

/// Outcome of one account fetch, in completion order
type Completion<T> = (AccountId, Result<T, AggregateError>);

/// Fans usage queries out over an owner's accounts and merges the answers.
///
/// Every fetch runs as its own task, at most `max_concurrent_fetches` at a
/// time. A failed fetch never cancels its siblings; the call returns once all
/// of them have finished.
pub struct Aggregator {
    source: Arc<dyn StatsSource>,
    max_concurrent_fetches: usize,
}

impl Aggregator {
    pub fn new(source: Arc<dyn StatsSource>, config: &FanoutConfig) -> Self {
        Self {
            source,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
        }
    }

    /// Merged series of all `accounts` over `window`.
    ///
    /// With no accounts the zero-filled placeholder for the window is
    /// returned. If any fetch fails, the first failure to complete is
    /// returned and every successful series is discarded.
    #[instrument(skip(self, accounts), fields(accounts = accounts.len()))]
    pub async fn aggregate(
        &self,
        accounts: &[AccountId],
        window: StatsWindow,
    ) -> Result<TimeSeries, AggregateError> {
        window.validate().map_err(AggregateError::InvalidWindow)?;

        if accounts.is_empty() {
            debug!("No accounts, answering with placeholder series");
            return Ok(window.placeholder(unix_now()));
        }

        let completions = self
            .fan_out(accounts, move |source, account| async move {
                source.fetch_series(&account, &window).await
            })
            .await;

        let series = first_error_wins(completions)?;

        Ok(match window.trailing_bucket_count() {
            Some(count) => merge_trailing_series(&series, count),
            None => merge_chart_series(&series),
        })
    }

    /// Merged chart series for a `minute`, `hour` or `day` chart type.
    ///
    /// The type is checked before anything is fetched.
    pub async fn merge_chart(
        &self,
        accounts: &[AccountId],
        chart_type: &str,
        start: i64,
        end: i64,
    ) -> Result<TimeSeries, AggregateError> {
        let granularity: Granularity = chart_type
            .parse()
            .map_err(AggregateError::InvalidChartType)?;

        self.aggregate(accounts, StatsWindow::chart(granularity, start, end))
            .await
    }

    /// One account's series as reported by the backend, without merging
    #[instrument(skip(self))]
    pub async fn account_series(
        &self,
        account: &str,
        window: StatsWindow,
    ) -> Result<TimeSeries, AggregateError> {
        window.validate().map_err(AggregateError::InvalidWindow)?;

        self.source
            .fetch_series(account, &window)
            .await
            .map_err(|e| AggregateError::fetch(account, e))
    }

    /// Current bandwidth and total traffic of every account that answers.
    ///
    /// Best effort: failing accounts are left out of the summary.
    #[instrument(skip(self, accounts), fields(accounts = accounts.len()))]
    pub async fn usage_summary(&self, accounts: &[AccountId]) -> UsageSummary {
        let completions = self
            .fan_out(accounts, |source, account| async move {
                source.fetch_base_stats(&account).await
            })
            .await;

        let mut summary = UsageSummary::default();
        for (account, result) in completions {
            match result {
                Ok(stats) => summary.insert(account, stats),
                Err(e) => warn!("Skipping base stats of {}: {}", account, e),
            }
        }

        summary
    }

    /// Runs `fetch` once per distinct account and waits for all of them.
    ///
    /// The collector is allocated up front and only written by this task as
    /// completions arrive.
    async fn fan_out<T, F, Fut>(&self, accounts: &[AccountId], fetch: F) -> Vec<Completion<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn StatsSource>, AccountId) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let mut seen = HashSet::with_capacity(accounts.len());
        let accounts: Vec<&AccountId> = accounts.iter().filter(|a| seen.insert(*a)).collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let mut completions = Vec::with_capacity(accounts.len());

        let mut pending: FuturesUnordered<_> = accounts
            .into_iter()
            .map(|account| {
                let account = account.clone();
                let source = Arc::clone(&self.source);
                let semaphore = Arc::clone(&semaphore);
                let fetch = fetch.clone();
                let task_account = account.clone();

                let handle = tokio::spawn(async move {
                    // The semaphore is never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    fetch(source, task_account).await
                });

                async move { (account, handle.await) }
            })
            .collect();

        while let Some((account, joined)) = pending.next().await {
            let result = match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    debug!("Fetch for {} failed: {}", account, e);
                    Err(AggregateError::fetch(account.clone(), e))
                }
                Err(e) => {
                    warn!("Fetch task for {} did not finish: {}", account, e);
                    Err(AggregateError::task_failed(account.clone(), e.to_string()))
                }
            };
            completions.push((account, result));
        }

        completions
    }
}

/// All results keyed by account, or the earliest completed failure
fn first_error_wins<T>(
    completions: Vec<Completion<T>>,
) -> Result<HashMap<AccountId, T>, AggregateError> {
    let mut collected = HashMap::with_capacity(completions.len());

    for (account, result) in completions {
        collected.insert(account, result?);
    }

    Ok(collected)
}
