use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use cadence_core::Response;

use crate::stages::Pipeline;
use crate::types::{Job, ManagerState, ManagerStatus, Operation};

/// Lifecycle controller for the background pipeline loop.
///
/// A constructed service object — callers hold it (usually in an `Arc`) and
/// pass it wherever lifecycle commands arrive; tests can run as many
/// independent managers as they like. All lifecycle mutation happens under
/// one lock, so concurrent Start/Stop/Restart calls serialize and the final
/// state is deterministic; the transient `Stopping` state can never stick.
pub struct JobManager {
    pipeline: Arc<Pipeline>,
    tick: Duration,
    inner: Mutex<ManagerInner>,
    completed_ticks: Arc<AtomicU64>,
}

struct ManagerInner {
    state: ManagerState,
    shutdown_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl JobManager {
    pub fn new(pipeline: Arc<Pipeline>, tick: Duration) -> Self {
        Self {
            pipeline,
            tick,
            inner: Mutex::new(ManagerInner {
                state: ManagerState::Stopped,
                shutdown_tx: None,
                handle: None,
            }),
            completed_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn status(&self) -> ManagerStatus {
        let inner = self.inner.lock().await;
        self.status_of(&inner)
    }

    /// Dispatch a lifecycle command.
    pub async fn apply(&self, op: Operation) -> Response<ManagerStatus> {
        match op {
            Operation::Start => self.start().await,
            Operation::Stop => self.stop().await,
            Operation::Restart => self.restart().await,
        }
    }

    /// Begin the periodic loop. Starting an already-running manager is a
    /// no-op success.
    pub async fn start(&self) -> Response<ManagerStatus> {
        let mut inner = self.inner.lock().await;
        if inner.state == ManagerState::Running {
            return Response::ok_with(self.status_of(&inner), "manager already running");
        }
        self.start_locked(&mut inner);
        Response::ok(self.status_of(&inner))
    }

    /// Signal the loop to stop and wait for it (and any in-flight tick) to
    /// finish. Stopping an already-stopped manager is a no-op success.
    pub async fn stop(&self) -> Response<ManagerStatus> {
        let mut inner = self.inner.lock().await;
        if inner.state == ManagerState::Stopped {
            return Response::ok_with(self.status_of(&inner), "manager already stopped");
        }
        self.stop_locked(&mut inner).await;
        Response::ok(self.status_of(&inner))
    }

    /// Stop (if running) then start, under a single lock acquisition so no
    /// other lifecycle command can interleave. Always ends Running.
    pub async fn restart(&self) -> Response<ManagerStatus> {
        let mut inner = self.inner.lock().await;
        if inner.state == ManagerState::Running {
            self.stop_locked(&mut inner).await;
        }
        self.start_locked(&mut inner);
        Response::ok(self.status_of(&inner))
    }

    fn status_of(&self, inner: &ManagerInner) -> ManagerStatus {
        ManagerStatus {
            state: inner.state,
            completed_ticks: self.completed_ticks.load(Ordering::Relaxed),
        }
    }

    fn start_locked(&self, inner: &mut ManagerInner) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pipeline = Arc::clone(&self.pipeline);
        let ticks = Arc::clone(&self.completed_ticks);
        let tick = self.tick;
        inner.handle = Some(tokio::spawn(run_loop(pipeline, tick, shutdown_rx, ticks)));
        inner.shutdown_tx = Some(shutdown_tx);
        inner.state = ManagerState::Running;
        info!(tick_secs = tick.as_secs(), "job manager started");
    }

    async fn stop_locked(&self, inner: &mut ManagerInner) {
        inner.state = ManagerState::Stopping;
        if let Some(tx) = inner.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "job manager loop terminated abnormally");
            }
        }
        inner.state = ManagerState::Stopped;
        info!("job manager stopped");
    }
}

/// The background loop: run the full stage sequence on every tick until the
/// shutdown channel flips. Ticks never overlap — a tick runs to completion
/// before the interval is polled again.
async fn run_loop(
    pipeline: Arc<Pipeline>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
    completed_ticks: Arc<AtomicU64>,
) {
    info!("job manager loop started");
    // First fire one full period after start, so a restart does not
    // double-run the cycle at the boundary.
    let mut interval = interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_tick(&pipeline, &mut shutdown).await;
                completed_ticks.fetch_add(1, Ordering::Relaxed);
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("job manager loop shutting down");
                    break;
                }
            }
        }
    }
}

/// One tick: Schedule → Generate → Publish, sequentially. A stage's
/// failures are already captured per item; the aggregate is logged and the
/// shutdown signal is checked between stages so a stop request skips the
/// remaining stages instead of aborting one mid-flight.
async fn run_tick(pipeline: &Pipeline, shutdown: &mut watch::Receiver<bool>) {
    let today = Utc::now().date_naive();
    for job in [Job::Schedule, Job::Generate, Job::Publish] {
        if *shutdown.borrow() {
            info!(job = %job, "stop requested, skipping remaining stages of this tick");
            return;
        }
        let responses = pipeline.run_job(job, today).await;
        let failed = responses.iter().filter(|r| !r.success).count();
        info!(job = %job, items = responses.len(), failed, "stage complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_campaigns::{Campaign, CampaignStore, PostStatus};
    use cadence_channels::{
        OutboundPost, PublishError, PublishReceipt, Publisher, PublisherRegistry,
    };
    use cadence_content::{ContentGenerator, GeneratedContent, GenerateRequest, GeneratorError};
    use cadence_core::CampaignId;
    use rusqlite::Connection;

    struct StaticGenerator;

    #[async_trait]
    impl ContentGenerator for StaticGenerator {
        fn name(&self) -> &str {
            "static"
        }
        async fn generate(&self, req: &GenerateRequest) -> Result<GeneratedContent, GeneratorError> {
            Ok(GeneratedContent {
                body: format!("copy for {}", req.event_id),
            })
        }
    }

    struct OkPublisher(&'static str);

    #[async_trait]
    impl Publisher for OkPublisher {
        fn name(&self) -> &str {
            self.0
        }
        async fn publish(&self, post: &OutboundPost) -> Result<PublishReceipt, PublishError> {
            Ok(PublishReceipt {
                channel: post.channel.clone(),
                remote_id: None,
            })
        }
    }

    fn manager(tick: Duration) -> (JobManager, Arc<CampaignStore>) {
        let store = Arc::new(CampaignStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let mut registry = PublisherRegistry::new();
        registry.register(Box::new(OkPublisher("alpha")));
        let pipeline = Pipeline::new(
            Arc::clone(&store),
            Arc::new(StaticGenerator),
            Arc::new(registry),
            Duration::from_millis(100),
        );
        (JobManager::new(Arc::new(pipeline), tick), store)
    }

    fn today_campaign(id: &str) -> Campaign {
        let today = Utc::now().date_naive();
        Campaign {
            id: CampaignId::from(id),
            name: format!("campaign {id}"),
            theme: "daily special".to_string(),
            start: today,
            end: today,
            channels: vec!["alpha".to_string()],
            lead_days: 0,
            color: String::new(),
            medias: Vec::new(),
            recurrence: None,
        }
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (m, _store) = manager(Duration::from_millis(20));

        let first = m.start().await;
        assert!(first.success);
        assert_eq!(first.data.unwrap().state, ManagerState::Running);

        let second = m.start().await;
        assert!(second.success);
        assert_eq!(second.data.unwrap().state, ManagerState::Running);
        assert!(!second.messages.is_empty());

        m.stop().await;
        assert_eq!(m.status().await.state, ManagerState::Stopped);
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_noop_success() {
        let (m, _store) = manager(Duration::from_millis(20));
        let r = m.stop().await;
        assert!(r.success);
        assert!(!r.messages.is_empty());
        assert_eq!(m.status().await.state, ManagerState::Stopped);
    }

    #[tokio::test]
    async fn restart_always_ends_running() {
        let (m, _store) = manager(Duration::from_millis(20));

        // from Stopped
        let r = m.apply(Operation::Restart).await;
        assert!(r.success);
        assert_eq!(r.data.unwrap().state, ManagerState::Running);

        // from Running
        let r = m.apply(Operation::Restart).await;
        assert_eq!(r.data.unwrap().state, ManagerState::Running);

        let r = m.apply(Operation::Stop).await;
        assert_eq!(r.data.unwrap().state, ManagerState::Stopped);
    }

    #[tokio::test]
    async fn loop_drives_events_through_all_stages() {
        let (m, store) = manager(Duration::from_millis(20));
        store.save_campaign(&today_campaign("c1")).unwrap();

        m.start().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = m.stop().await.data.unwrap();

        assert!(status.completed_ticks >= 1);
        let today = Utc::now().date_naive();
        let post = store.get_post(&CampaignId::from("c1"), today).unwrap();
        assert_eq!(post.status, PostStatus::Published);
    }
}
