//! Owns [`ViewState`] and the fetch-validate-publish cycle.
//!
//! Every load is tagged with a sequence number. Only the newest load may
//! publish; older ones are cancelled and their late results dropped.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::WeatherError,
    location::{GeolocationSource, resolve_current_location},
    model::{ActiveTab, Coordinate, ErrorInfo, LocationQuery, ViewState, WeatherSnapshot},
    provider::WeatherProvider,
};

#[derive(Debug)]
struct Inflight {
    seq: u64,
    cancel: CancellationToken,
    last_query: Option<LocationQuery>,
}

#[derive(Debug)]
struct Ticket {
    seq: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct Coordinator {
    provider: Arc<dyn WeatherProvider>,
    state: watch::Sender<ViewState>,
    inflight: Mutex<Inflight>,
    shutdown: CancellationToken,
}

impl Coordinator {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        let shutdown = CancellationToken::new();
        Self {
            provider,
            state,
            inflight: Mutex::new(Inflight {
                seq: 0,
                cancel: shutdown.child_token(),
                last_query: None,
            }),
            shutdown,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Fetch current conditions and forecast for `query` and publish them.
    ///
    /// Failures land in `ViewState::error` and leave the old snapshot alone.
    pub async fn load_weather(&self, query: LocationQuery) {
        let Some(ticket) = self.begin(Some(&query)) else {
            return;
        };
        let _loading = LoadingGuard { coordinator: self, seq: ticket.seq };

        let result = self.fetch_snapshot(&query, &ticket.cancel).await;
        self.finish(ticket.seq, result);
    }

    /// Startup path: locate the host, then load weather for it.
    pub async fn start(&self, source: &dyn GeolocationSource) {
        let Some(ticket) = self.begin(None) else {
            return;
        };
        let _loading = LoadingGuard { coordinator: self, seq: ticket.seq };

        let query = match resolve_current_location(source, &ticket.cancel).await {
            Ok(query) => query,
            Err(err) => {
                self.finish(ticket.seq, Err(err.into()));
                return;
            }
        };

        let coordinate = query.coordinate;
        self.publish(ticket.seq, |s| s.last_known_location = Some(coordinate));
        self.remember(ticket.seq, &query);

        let result = self.fetch_snapshot(&query, &ticket.cancel).await;
        self.finish(ticket.seq, result);
    }

    pub async fn on_location_resolved(&self, coordinate: Coordinate) {
        if !self.shutdown.is_cancelled() {
            self.state.send_modify(|s| s.last_known_location = Some(coordinate));
        }
        self.load_weather(LocationQuery::new(coordinate, None)).await;
    }

    pub async fn on_search_selected(&self, query: LocationQuery) {
        self.load_weather(query).await;
    }

    /// Reload whatever was requested last.
    pub async fn refresh(&self) {
        let query = {
            let inflight = self.inflight.lock();
            if self.shutdown.is_cancelled() {
                return;
            }
            match inflight.last_query.clone() {
                Some(query) => query,
                None => {
                    let info = ErrorInfo::from(&WeatherError::NothingToRefresh);
                    self.state.send_modify(|s| s.error = Some(info));
                    return;
                }
            }
        };
        self.load_weather(query).await;
    }

    /// Fire-and-forget [`Coordinator::load_weather`].
    pub fn spawn_load(self: &Arc<Self>, query: LocationQuery) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.load_weather(query).await })
    }

    pub fn select_tab(&self, tab: ActiveTab) {
        self.state.send_if_modified(|s| {
            let changed = s.active_tab != tab;
            s.active_tab = tab;
            changed
        });
    }

    /// Cancel in-flight work. Nothing is published after this returns.
    pub fn shutdown(&self) {
        let inflight = self.inflight.lock();
        self.shutdown.cancel();
        inflight.cancel.cancel();
        self.state.send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
        tracing::debug!(seq = inflight.seq, "Coordinator shut down");
    }

    fn begin(&self, query: Option<&LocationQuery>) -> Option<Ticket> {
        let mut inflight = self.inflight.lock();
        if self.shutdown.is_cancelled() {
            tracing::debug!("Ignoring load after shutdown");
            return None;
        }

        inflight.cancel.cancel();
        inflight.seq += 1;
        inflight.cancel = self.shutdown.child_token();
        if let Some(query) = query {
            inflight.last_query = Some(query.clone());
        }

        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        tracing::debug!(seq = inflight.seq, "Weather load started");
        Some(Ticket {
            seq: inflight.seq,
            cancel: inflight.cancel.clone(),
        })
    }

    fn remember(&self, seq: u64, query: &LocationQuery) {
        let mut inflight = self.inflight.lock();
        if inflight.seq == seq {
            inflight.last_query = Some(query.clone());
        }
    }

    /// Apply `update` only if `seq` is still the newest load.
    fn publish(&self, seq: u64, update: impl FnOnce(&mut ViewState)) -> bool {
        let inflight = self.inflight.lock();
        if inflight.seq != seq || self.shutdown.is_cancelled() {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    async fn fetch_snapshot(
        &self,
        query: &LocationQuery,
        cancel: &CancellationToken,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let coordinate = query.coordinate;

        // Wait for both so the current-conditions error wins when both fail.
        let (current, forecast) = match tokio::join!(
            self.provider.current(coordinate, cancel),
            self.provider.forecast(coordinate, cancel),
        ) {
            (Ok(current), Ok(forecast)) => (current, forecast),
            (Err(err), _) | (Ok(_), Err(err)) => return Err(err),
        };

        Ok(WeatherSnapshot {
            city: query.display_name(current.location_name.as_deref()),
            current: current.conditions,
            forecast,
            fetched_at: Utc::now(),
        })
    }

    fn finish(&self, seq: u64, result: Result<WeatherSnapshot, WeatherError>) {
        match result {
            Ok(snapshot) => {
                let city = snapshot.city.clone();
                let published = self.publish(seq, |s| {
                    s.snapshot = Some(snapshot);
                    s.error = None;
                    s.is_loading = false;
                });
                if published {
                    tracing::info!(seq, %city, "Published weather snapshot");
                } else {
                    tracing::debug!(seq, %city, "Discarding superseded weather result");
                }
            }
            Err(WeatherError::Cancelled) => {
                tracing::debug!(seq, "Weather load cancelled");
            }
            Err(err) => {
                let info = ErrorInfo::from(&err);
                if self.publish(seq, |s| {
                    s.error = Some(info);
                    s.is_loading = false;
                }) {
                    tracing::warn!(seq, error = %err, "Weather load failed");
                } else {
                    tracing::debug!(seq, error = %err, "Discarding superseded weather failure");
                }
            }
        }
    }
}

/// Clears `is_loading` for its load on every exit path, unwinding included.
struct LoadingGuard<'a> {
    coordinator: &'a Coordinator,
    seq: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let inflight = self.coordinator.inflight.lock();
        if inflight.seq != self.seq || self.coordinator.shutdown.is_cancelled() {
            return;
        }
        self.coordinator
            .state
            .send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
    }
}
