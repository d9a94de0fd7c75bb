use crate::domain::message::EnrichedMessage;
use async_trait::async_trait;
use dashmap::DashMap;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

/// Event pushed to a principal's live connections.
#[derive(Clone, Debug)]
pub enum ChatEvent {
    NewMessage(Arc<EnrichedMessage>),
}

/// Best-effort push of newly persisted messages to live sessions. Persistence
/// is the channel of record; this layer carries no delivery guarantee, no
/// queueing, and no retry.
#[async_trait]
pub trait Fanout: Send + Sync + std::fmt::Debug {
    /// Registers a live connection under the principal id. Multiple concurrent
    /// receivers per principal are allowed and all see every event.
    async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<ChatEvent>;

    /// Delivers the event to all live connections for the principal, dropping
    /// it silently when none are registered. Must never block the send path.
    async fn publish(&self, user_id: Uuid, event: ChatEvent);
}

#[derive(Clone, Debug)]
struct Metrics {
    published_total: Counter<u64>,
    active_channels: UpDownCounter<i64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("parentline-server");
        Self {
            published_total: meter
                .u64_counter("fanout_published_total")
                .with_description("Realtime events published, labelled by delivery outcome")
                .build(),
            active_channels: meter
                .i64_up_down_counter("fanout_active_channels")
                .with_description("Number of live per-user event channels")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("fanout_gc_reclaimed_total")
                .with_description("Stale event channels reclaimed by GC")
                .build(),
        }
    }
}

/// In-process fan-out registry: one broadcast channel per connected principal,
/// reclaimed by a periodic GC once every receiver has disconnected.
#[derive(Debug)]
pub struct LocalFanout {
    channels: Arc<DashMap<Uuid, broadcast::Sender<ChatEvent>>>,
    channel_capacity: usize,
    metrics: Metrics,
}

impl LocalFanout {
    #[must_use]
    pub fn new(channel_capacity: usize, gc_interval_secs: u64, shutdown: tokio::sync::watch::Receiver<bool>) -> Self {
        let channels = Arc::new(DashMap::new());
        let metrics = Metrics::new();

        tokio::spawn(
            Self::run_gc(Arc::clone(&channels), metrics.clone(), gc_interval_secs, shutdown)
                .instrument(tracing::info_span!("fanout_gc")),
        );

        Self { channels, channel_capacity, metrics }
    }

    async fn run_gc(
        channels: Arc<DashMap<Uuid, broadcast::Sender<ChatEvent>>>,
        metrics: Metrics,
        interval_secs: u64,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let reclaimed = Self::gc_sweep(&channels, &metrics);
                    if reclaimed > 0 {
                        tracing::debug!(reclaimed, "Reclaimed stale fan-out channels");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    fn gc_sweep(channels: &DashMap<Uuid, broadcast::Sender<ChatEvent>>, metrics: &Metrics) -> u64 {
        let mut reclaimed = 0;
        channels.retain(|_, sender| {
            let active = sender.receiver_count() > 0;
            if !active {
                metrics.active_channels.add(-1, &[]);
                reclaimed += 1;
            }
            active
        });

        if reclaimed > 0 {
            metrics.gc_reclaimed_total.add(reclaimed, &[]);
        }
        reclaimed
    }
}

#[async_trait]
impl Fanout for LocalFanout {
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        let tx = self
            .channels
            .entry(user_id)
            .or_insert_with(|| {
                self.metrics.active_channels.add(1, &[]);
                let (tx, _rx) = broadcast::channel(self.channel_capacity);
                tx
            })
            .value()
            .clone();

        tx.subscribe()
    }

    #[tracing::instrument(skip(self, event), fields(user_id = %user_id))]
    async fn publish(&self, user_id: Uuid, event: ChatEvent) {
        let delivered = self.channels.get(&user_id).is_some_and(|tx| tx.send(event).is_ok());

        let status = if delivered { "delivered" } else { "dropped" };
        self.metrics.published_total.add(1, &[KeyValue::new("status", status)]);
        if !delivered {
            tracing::debug!("No live connections for recipient, event dropped");
        }
    }
}
