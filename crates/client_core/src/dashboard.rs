use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use shared::{
    domain::DEMO_ORG_ID,
    protocol::{InsightsData, InsightsResponse, KpiMetric, KpiResponse},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{error::ApiClientError, repository::DashboardRepository};

/// Shown when a failed load carries no usable message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Everything the dashboard screen renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub is_loading: bool,
    pub metrics: Vec<KpiMetric>,
    pub insights: Option<InsightsData>,
    pub error: Option<String>,
}

/// What the screen should show for a given state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashboardPhase<'a> {
    Loading,
    Failed(&'a str),
    Ready {
        metrics: &'a [KpiMetric],
        insights: Option<&'a InsightsData>,
    },
}

impl DashboardState {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn loaded(kpis: KpiResponse, insights: InsightsResponse) -> Self {
        Self {
            is_loading: false,
            metrics: kpis.metrics,
            insights: Some(insights.insights),
            error: None,
        }
    }

    /// Terminal failure state. Previously loaded data is never carried over.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        };

        Self {
            is_loading: false,
            metrics: Vec::new(),
            insights: None,
            error: Some(message),
        }
    }

    pub fn phase(&self) -> DashboardPhase<'_> {
        if self.is_loading {
            DashboardPhase::Loading
        } else if let Some(message) = &self.error {
            DashboardPhase::Failed(message)
        } else {
            DashboardPhase::Ready {
                metrics: &self.metrics,
                insights: self.insights.as_ref(),
            }
        }
    }
}

struct LoadContext {
    repository: DashboardRepository,
    org_id: String,
    state: watch::Sender<DashboardState>,
    generation: AtomicU64,
}

impl LoadContext {
    /// Publishes `next` only while `generation` is still the newest load.
    fn publish(&self, generation: u64, next: DashboardState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = next;
            true
        })
    }

    async fn load(&self, generation: u64) {
        let next = match self.fetch().await {
            Ok((kpis, insights)) => {
                info!(
                    org_id = %self.org_id,
                    metrics = kpis.metrics.len(),
                    risk_score = insights.insights.risk_score,
                    "dashboard loaded"
                );
                DashboardState::loaded(kpis, insights)
            }
            Err(err) => {
                error!(org_id = %self.org_id, error = %err, "dashboard load failed");
                DashboardState::failed(err.to_string())
            }
        };

        if !self.publish(generation, next) {
            debug!(generation, "discarding superseded dashboard result");
        }
    }

    async fn fetch(&self) -> Result<(KpiResponse, InsightsResponse), ApiClientError> {
        let kpis = self.repository.fetch_kpis(&self.org_id).await?;
        let insights = self.repository.fetch_insights(&self.org_id).await?;
        Ok((kpis, insights))
    }
}

/// Owns the dashboard state and the load that produces it.
///
/// The first load starts as soon as the view-model is built, so construction
/// must happen inside a tokio runtime. When loads overlap, the most recently
/// started one wins: starting a load aborts the previous one and results of
/// superseded loads are dropped. Dropping the view-model cancels any load in
/// flight.
pub struct DashboardViewModel {
    context: Arc<LoadContext>,
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl DashboardViewModel {
    pub fn new(repository: DashboardRepository) -> Self {
        let (state, _) = watch::channel(DashboardState::loading());
        let view_model = Self {
            context: Arc::new(LoadContext {
                repository,
                org_id: DEMO_ORG_ID.to_string(),
                state,
                generation: AtomicU64::new(0),
            }),
            inflight: Mutex::new(None),
        };
        view_model.load_dashboard();
        view_model
    }

    pub fn org_id(&self) -> &str {
        &self.context.org_id
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.context.state.subscribe()
    }

    pub fn state(&self) -> DashboardState {
        self.context.state.borrow().clone()
    }

    /// Replaces whatever is shown with the loading state, then fetches KPIs
    /// followed by insights.
    pub fn load_dashboard(&self) {
        let mut inflight = self.lock_inflight();

        let generation = self.context.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.context.publish(generation, DashboardState::loading());

        let context = Arc::clone(&self.context);
        let task = tokio::spawn(async move { context.load(generation).await });

        if let Some(previous) = inflight.replace(task) {
            previous.abort();
        }
    }

    /// Abandons the load in flight. Its result, if any, is never published.
    pub fn cancel(&self) {
        let mut inflight = self.lock_inflight();
        self.context.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = inflight.take() {
            task.abort();
        }
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DashboardViewModel {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
