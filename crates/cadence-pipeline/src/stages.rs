use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures_util::future::join_all;
use tracing::{error, warn};

use cadence_campaigns::{Campaign, CampaignStore, Post, PostStatus};
use cadence_channels::{OutboundPost, PublisherRegistry};
use cadence_content::{ContentGenerator, GenerateRequest, GeneratorError};
use cadence_core::{CampaignId, Response};

use crate::types::{Job, StageItem};

/// Runs the three pipeline stages over the campaign store.
///
/// Stages never throw out of the batch: every work item becomes exactly one
/// `Response`, failures included. Work items are selected in ascending event
/// start order so earlier-due work is attempted first.
pub struct Pipeline {
    store: Arc<CampaignStore>,
    generator: Arc<dyn ContentGenerator>,
    publishers: Arc<PublisherRegistry>,
    /// Budget for a single collaborator call (generation or one channel
    /// delivery). Mandatory — a hung collaborator becomes a failed item,
    /// never a hung tick.
    collaborator_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        store: Arc<CampaignStore>,
        generator: Arc<dyn ContentGenerator>,
        publishers: Arc<PublisherRegistry>,
        collaborator_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            publishers,
            collaborator_timeout,
        }
    }

    /// Invoke one named stage.
    pub async fn run_job(&self, job: Job, today: NaiveDate) -> Vec<Response<StageItem>> {
        match job {
            Job::Schedule => self.run_schedule(today).await,
            Job::Generate => self.run_generate().await,
            Job::Publish => self.run_publish(today).await,
        }
    }

    /// Mark every event of every in-window campaign as scheduled.
    ///
    /// A campaign is in window when `start - lead_days ≤ today ≤ end`.
    /// Re-scheduling an already-scheduled event is a no-op success.
    pub async fn run_schedule(&self, today: NaiveDate) -> Vec<Response<StageItem>> {
        let campaigns = match self.store.list_campaigns() {
            Ok(c) => c,
            Err(e) => return vec![Response::failed(format!("failed to list campaigns: {e}"))],
        };

        let mut responses = Vec::new();
        let mut work = Vec::new();
        for campaign in &campaigns {
            if !in_schedule_window(campaign, today) {
                continue;
            }
            match self.store.list_events_for_campaign(&campaign.id) {
                Ok(events) => work.extend(events),
                Err(e) => responses.push(Response::failed(format!(
                    "failed to list events for campaign {}: {e}",
                    campaign.id
                ))),
            }
        }
        work.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.0.cmp(&b.id.0)));

        for event in work {
            let item = StageItem {
                campaign_id: event.campaign_id.clone(),
                event_id: event.id.clone(),
                channel: None,
                detail: "scheduled".to_string(),
            };
            match self.store.mark_event_scheduled(&event.id) {
                Ok(true) => responses.push(Response::ok(item)),
                Ok(false) => responses.push(Response::ok_with(
                    StageItem {
                        detail: "already scheduled".to_string(),
                        ..item
                    },
                    format!("event {} already scheduled", event.id),
                )),
                Err(e) => responses.push(Response::failed(format!(
                    "schedule {}: {e}",
                    event.id
                ))),
            }
        }
        responses
    }

    /// Draft content for every scheduled event that has none yet.
    pub async fn run_generate(&self) -> Vec<Response<StageItem>> {
        let events = match self.store.list_events_awaiting_content() {
            Ok(e) => e,
            Err(e) => return vec![Response::failed(format!("failed to list work set: {e}"))],
        };

        let mut campaigns = HashMap::new();
        let mut responses = Vec::new();
        for event in events {
            let campaign = match self.campaign_cached(&mut campaigns, &event.campaign_id) {
                Ok(c) => c,
                Err(e) => {
                    responses.push(Response::failed(format!(
                        "generate {}: {e}",
                        event.id
                    )));
                    continue;
                }
            };

            let req = GenerateRequest {
                campaign_id: event.campaign_id.clone(),
                event_id: event.id.clone(),
                theme: campaign.theme.clone(),
                medias: campaign.medias.clone(),
                event_date: event.start,
            };

            let outcome =
                tokio::time::timeout(self.collaborator_timeout, self.generator.generate(&req))
                    .await
                    .unwrap_or_else(|_| {
                        Err(GeneratorError::Timeout {
                            ms: self.collaborator_timeout.as_millis() as u64,
                        })
                    });

            match outcome {
                Ok(content) => {
                    let now = Utc::now().to_rfc3339();
                    let post = Post {
                        campaign_id: event.campaign_id.clone(),
                        event_id: event.id.clone(),
                        event_date: event.start,
                        body: content.body,
                        status: PostStatus::Draft,
                        created_at: now.clone(),
                        updated_at: now,
                    };
                    match self.store.upsert_post(&post) {
                        Ok(()) => responses.push(Response::ok(StageItem {
                            campaign_id: event.campaign_id.clone(),
                            event_id: event.id.clone(),
                            channel: None,
                            detail: "draft created".to_string(),
                        })),
                        Err(e) => responses.push(Response::failed(format!(
                            "generate {}: failed to persist draft: {e}",
                            event.id
                        ))),
                    }
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "content generation failed");
                    responses.push(Response::failed(format!("generate {}: {e}", event.id)));
                }
            }
        }
        responses
    }

    /// Deliver every due draft post to its campaign's channels.
    ///
    /// Each (event, channel) pair yields its own `Response`; all channels
    /// of one event are attempted concurrently. The post is marked
    /// Published only when every channel succeeded, so a partially failed
    /// event is retried on the next run.
    pub async fn run_publish(&self, today: NaiveDate) -> Vec<Response<StageItem>> {
        let due = match self.store.list_publishable_events(today) {
            Ok(d) => d,
            Err(e) => return vec![Response::failed(format!("failed to list work set: {e}"))],
        };

        let mut campaigns = HashMap::new();
        let mut responses = Vec::new();
        for (event, post) in due {
            let campaign = match self.campaign_cached(&mut campaigns, &event.campaign_id) {
                Ok(c) => c,
                Err(e) => {
                    responses.push(Response::failed(format!("publish {}: {e}", event.id)));
                    continue;
                }
            };

            // channels is a set: duplicates collapse, first occurrence wins
            let mut seen = HashSet::new();
            let channels: Vec<&String> = campaign
                .channels
                .iter()
                .filter(|c| seen.insert(c.as_str()))
                .collect();

            if channels.is_empty() {
                // nowhere to deliver — complete the event instead of
                // re-selecting it forever
                if let Err(e) =
                    self.store
                        .set_post_status(&event.campaign_id, &event.id, PostStatus::Published)
                {
                    error!(event_id = %event.id, error = %e, "failed to finalise channel-less post");
                }
                responses.push(Response::ok_with(
                    StageItem {
                        campaign_id: event.campaign_id.clone(),
                        event_id: event.id.clone(),
                        channel: None,
                        detail: "no channels configured".to_string(),
                    },
                    format!("campaign {} has no channels", event.campaign_id),
                ));
                continue;
            }

            let deliveries = channels.iter().map(|channel| {
                let outbound = OutboundPost {
                    campaign_id: event.campaign_id.clone(),
                    event_id: event.id.clone(),
                    channel: (*channel).clone(),
                    body: post.body.clone(),
                    medias: campaign.medias.clone(),
                };
                async move {
                    let Some(publisher) = self.publishers.get(&outbound.channel) else {
                        return Response::failed(format!(
                            "publish {}: no publisher registered for channel {}",
                            outbound.event_id, outbound.channel
                        ));
                    };
                    match tokio::time::timeout(
                        self.collaborator_timeout,
                        publisher.publish(&outbound),
                    )
                    .await
                    {
                        Err(_) => Response::failed(format!(
                            "publish {} to {} timed out after {}ms",
                            outbound.event_id,
                            outbound.channel,
                            self.collaborator_timeout.as_millis()
                        )),
                        Ok(Err(e)) => Response::failed(format!(
                            "publish {} to {}: {e}",
                            outbound.event_id, outbound.channel
                        )),
                        Ok(Ok(receipt)) => Response::ok(StageItem {
                            campaign_id: outbound.campaign_id.clone(),
                            event_id: outbound.event_id.clone(),
                            channel: Some(outbound.channel.clone()),
                            detail: receipt
                                .remote_id
                                .map(|id| format!("delivered as {id}"))
                                .unwrap_or_else(|| "delivered".to_string()),
                        }),
                    }
                }
            });
            let results = join_all(deliveries).await;

            if results.iter().all(|r| r.success) {
                if let Err(e) =
                    self.store
                        .set_post_status(&event.campaign_id, &event.id, PostStatus::Published)
                {
                    error!(event_id = %event.id, error = %e, "failed to mark post published");
                }
            }
            responses.extend(results);
        }
        responses
    }

    fn campaign_cached(
        &self,
        cache: &mut HashMap<CampaignId, Campaign>,
        id: &CampaignId,
    ) -> Result<Campaign, cadence_campaigns::CampaignError> {
        if let Some(c) = cache.get(id) {
            return Ok(c.clone());
        }
        let campaign = self.store.get_campaign(id)?;
        cache.insert(id.clone(), campaign.clone());
        Ok(campaign)
    }
}

/// Scheduling begins `lead_days` before the campaign starts and ends with
/// the campaign itself.
fn in_schedule_window(campaign: &Campaign, today: NaiveDate) -> bool {
    let lead = campaign.lead_days.max(0) as u64;
    let window_open = campaign
        .start
        .checked_sub_days(chrono::Days::new(lead))
        .unwrap_or(NaiveDate::MIN);
    window_open <= today && today <= campaign.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_campaigns::{Frequency, RecurrenceRule};
    use cadence_channels::{PublishError, PublishReceipt, Publisher};
    use cadence_content::GeneratedContent;
    use cadence_core::EventId;
    use rusqlite::Connection;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> Arc<CampaignStore> {
        Arc::new(CampaignStore::new(Connection::open_in_memory().unwrap()).unwrap())
    }

    fn campaign(id: &str, start: NaiveDate, end: NaiveDate, count: Option<u32>) -> Campaign {
        Campaign {
            id: CampaignId::from(id),
            name: format!("campaign {id}"),
            theme: "launch week".to_string(),
            start,
            end,
            channels: vec!["alpha".to_string()],
            lead_days: 0,
            color: String::new(),
            medias: vec!["img/hero.png".to_string()],
            recurrence: count.map(|count| RecurrenceRule {
                frequency: Frequency::Daily,
                interval: 1,
                by_day: Vec::new(),
                count: Some(count),
                until: None,
            }),
        }
    }

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

    /// Fails one specific event with a timeout, succeeds for the rest.
    struct FlakyGenerator {
        fail_for: EventId,
    }

    #[async_trait]
    impl ContentGenerator for FlakyGenerator {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn generate(&self, req: &GenerateRequest) -> Result<GeneratedContent, GeneratorError> {
            if req.event_id == self.fail_for {
                return Err(GeneratorError::Timeout { ms: 10 });
            }
            Ok(GeneratedContent {
                body: format!("copy for {}", req.event_id),
            })
        }
    }

    /// Never completes within any sane budget.
    struct SlowGenerator;

    #[async_trait]
    impl ContentGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }
        async fn generate(&self, _req: &GenerateRequest) -> Result<GeneratedContent, GeneratorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(GeneratedContent {
                body: "too late".to_string(),
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
                remote_id: Some(format!("remote-{}", post.event_id)),
            })
        }
    }

    struct RejectingPublisher(&'static str);

    #[async_trait]
    impl Publisher for RejectingPublisher {
        fn name(&self) -> &str {
            self.0
        }
        async fn publish(&self, _post: &OutboundPost) -> Result<PublishReceipt, PublishError> {
            Err(PublishError::Rejected("content policy".to_string()))
        }
    }

    fn pipeline(
        store: Arc<CampaignStore>,
        generator: Arc<dyn ContentGenerator>,
        publishers: PublisherRegistry,
    ) -> Pipeline {
        Pipeline::new(
            store,
            generator,
            Arc::new(publishers),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn schedule_marks_events_and_is_idempotent() {
        let s = store();
        s.save_campaign(&campaign("c1", date(2025, 1, 1), date(2025, 1, 1), Some(3)))
            .unwrap();
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), PublisherRegistry::new());

        let first = p.run_schedule(date(2025, 1, 1)).await;
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|r| r.success));

        let second = p.run_schedule(date(2025, 1, 1)).await;
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|r| r.success));
        assert!(second.iter().all(|r| !r.messages.is_empty()));

        // outside the window nothing is selected
        let none = p.run_schedule(date(2024, 12, 1)).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn schedule_respects_lead_time() {
        let s = store();
        let mut c = campaign("c1", date(2025, 1, 10), date(2025, 1, 10), None);
        c.lead_days = 5;
        s.save_campaign(&c).unwrap();
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), PublisherRegistry::new());

        assert!(p.run_schedule(date(2025, 1, 4)).await.is_empty());
        assert_eq!(p.run_schedule(date(2025, 1, 5)).await.len(), 1);
    }

    #[tokio::test]
    async fn schedule_attempts_oldest_events_first() {
        let s = store();
        let mut early = campaign("early", date(2025, 1, 2), date(2025, 1, 15), None);
        early.lead_days = 30;
        let mut late = campaign("late", date(2025, 1, 5), date(2025, 1, 15), None);
        late.lead_days = 30;
        s.save_campaign(&late).unwrap();
        s.save_campaign(&early).unwrap();
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), PublisherRegistry::new());

        let responses = p.run_schedule(date(2025, 1, 10)).await;
        let order: Vec<String> = responses
            .iter()
            .map(|r| r.data.as_ref().unwrap().event_id.to_string())
            .collect();
        assert_eq!(order, vec!["early:0", "late:0"]);
    }

    #[tokio::test]
    async fn generate_partial_failure_keeps_the_batch() {
        let s = store();
        s.save_campaign(&campaign("c1", date(2025, 1, 1), date(2025, 1, 1), Some(5)))
            .unwrap();
        let p = pipeline(
            s.clone(),
            Arc::new(FlakyGenerator {
                fail_for: EventId::from("c1:2"),
            }),
            PublisherRegistry::new(),
        );
        p.run_schedule(date(2025, 1, 1)).await;

        let responses = p.run_generate().await;
        assert_eq!(responses.len(), 5);
        assert_eq!(responses.iter().filter(|r| r.success).count(), 4);
        let failed = responses.iter().find(|r| !r.success).unwrap();
        assert!(failed.messages[0].contains("timed out"));
        assert!(failed.messages[0].contains("c1:2"));

        // only the failed event is re-selected next run
        let retry = p.run_generate().await;
        assert_eq!(retry.len(), 1);
    }

    #[tokio::test]
    async fn generate_bounds_slow_collaborators() {
        let s = store();
        s.save_campaign(&campaign("c1", date(2025, 1, 1), date(2025, 1, 1), None))
            .unwrap();
        let p = Pipeline::new(
            s.clone(),
            Arc::new(SlowGenerator),
            Arc::new(PublisherRegistry::new()),
            Duration::from_millis(10),
        );
        p.run_schedule(date(2025, 1, 1)).await;

        let responses = p.run_generate().await;
        assert_eq!(responses.len(), 1);
        assert!(!responses[0].success);
        assert!(responses[0].messages[0].contains("timed out"));
    }

    #[tokio::test]
    async fn publish_yields_one_response_per_channel_pair() {
        let s = store();
        let mut c = campaign("c1", date(2025, 1, 1), date(2025, 1, 1), None);
        c.channels = vec!["alpha".to_string(), "beta".to_string()];
        s.save_campaign(&c).unwrap();

        let mut registry = PublisherRegistry::new();
        registry.register(Box::new(OkPublisher("alpha")));
        registry.register(Box::new(RejectingPublisher("beta")));
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), registry);

        p.run_schedule(date(2025, 1, 1)).await;
        p.run_generate().await;

        let responses = p.run_publish(date(2025, 1, 1)).await;
        assert_eq!(responses.len(), 2);
        let ok: Vec<_> = responses.iter().filter(|r| r.success).collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].data.as_ref().unwrap().channel.as_deref(), Some("alpha"));
        let failed = responses.iter().find(|r| !r.success).unwrap();
        assert!(failed.messages[0].contains("beta"));

        // partial failure leaves the post draft so the event is retried
        let post = s.get_post(&CampaignId::from("c1"), date(2025, 1, 1)).unwrap();
        assert_eq!(post.status, PostStatus::Draft);

        let mut registry = PublisherRegistry::new();
        registry.register(Box::new(OkPublisher("alpha")));
        registry.register(Box::new(OkPublisher("beta")));
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), registry);

        let retry = p.run_publish(date(2025, 1, 1)).await;
        assert_eq!(retry.len(), 2);
        assert!(retry.iter().all(|r| r.success));
        let post = s.get_post(&CampaignId::from("c1"), date(2025, 1, 1)).unwrap();
        assert_eq!(post.status, PostStatus::Published);

        assert!(p.run_publish(date(2025, 1, 1)).await.is_empty());
    }

    #[tokio::test]
    async fn publish_waits_for_the_event_date() {
        let s = store();
        s.save_campaign(&campaign("c1", date(2025, 1, 10), date(2025, 1, 10), None))
            .unwrap();
        let mut registry = PublisherRegistry::new();
        registry.register(Box::new(OkPublisher("alpha")));
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), registry);

        p.run_schedule(date(2025, 1, 8)).await;
        p.run_generate().await;

        assert!(p.run_publish(date(2025, 1, 9)).await.is_empty());
        assert_eq!(p.run_publish(date(2025, 1, 10)).await.len(), 1);
    }

    #[tokio::test]
    async fn publish_missing_publisher_is_an_item_failure() {
        let s = store();
        let mut c = campaign("c1", date(2025, 1, 1), date(2025, 1, 1), None);
        c.channels = vec!["ghost".to_string()];
        s.save_campaign(&c).unwrap();
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), PublisherRegistry::new());

        p.run_schedule(date(2025, 1, 1)).await;
        p.run_generate().await;

        let responses = p.run_publish(date(2025, 1, 1)).await;
        assert_eq!(responses.len(), 1);
        assert!(!responses[0].success);
        assert!(responses[0].messages[0].contains("ghost"));
    }

    #[tokio::test]
    async fn publish_completes_channel_less_events() {
        let s = store();
        let mut c = campaign("c1", date(2025, 1, 1), date(2025, 1, 1), None);
        c.channels = Vec::new();
        s.save_campaign(&c).unwrap();
        let p = pipeline(s.clone(), Arc::new(StaticGenerator), PublisherRegistry::new());

        p.run_schedule(date(2025, 1, 1)).await;
        p.run_generate().await;

        let responses = p.run_publish(date(2025, 1, 1)).await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0].success);
        assert!(p.run_publish(date(2025, 1, 1)).await.is_empty());
    }
}
