//! Campaign dispatch tests
//!
//! Drive `CampaignSender` against in-memory repositories with the simulated
//! transport acting as the dispatch spy.

use axum_helpers::AuthUser;
use domain_newsletter::content::ContentDefaults;
use domain_newsletter::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "send-test-secret-0123456789abcdef0123";
const SITE: &str = "https://pedal.example";

struct Harness {
    repos: Repositories,
    analytics: Arc<InMemoryAnalyticsRepository>,
    transport: SimulatedTransport,
    tokens: UnsubscribeTokens,
    sender: CampaignSender,
}

fn harness(transport: SimulatedTransport, settings: SendSettings) -> Harness {
    let analytics = Arc::new(InMemoryAnalyticsRepository::new());
    let repos = Repositories {
        subscribers: Arc::new(InMemorySubscriberRepository::new()),
        templates: Arc::new(InMemoryTemplateRepository::new()),
        campaigns: Arc::new(InMemoryCampaignRepository::new()),
        analytics: analytics.clone(),
    };
    let tokens = UnsubscribeTokens::new(SECRET, SITE, false).unwrap();
    let defaults = ContentDefaults::from(&NewsletterConfig::default());
    let sender = CampaignSender::new(
        repos.clone(),
        Arc::new(transport.clone()),
        tokens.clone(),
        defaults,
        settings,
    );

    Harness {
        repos,
        analytics,
        transport,
        tokens,
        sender,
    }
}

fn admin() -> AuthUser {
    AuthUser::admin("admin-1", "admin@pedal.example")
}

impl Harness {
    async fn add_subscribers(&self, count: usize) -> Vec<Subscriber> {
        let mut added = Vec::with_capacity(count);
        for i in 0..count {
            let subscriber = Subscriber::new(&SubscribeRequest {
                email: format!("rider{}@example.com", i),
                first_name: Some(format!("Rider{}", i)),
                last_name: None,
                source: None,
                user_id: None,
            });
            added.push(self.repos.subscribers.insert(subscriber).await.unwrap());
        }
        added
    }

    async fn add_campaign(&self, content: &str, template_id: Option<Uuid>) -> Campaign {
        let campaign = Campaign::new(
            CreateCampaign {
                name: "Spring".into(),
                subject: "Hello".into(),
                content: content.into(),
                template_id,
                ..Default::default()
            },
            Some("admin-1".into()),
        );
        self.repos.campaigns.insert(campaign).await.unwrap()
    }

    async fn campaign(&self, id: Uuid) -> Campaign {
        self.repos.campaigns.get_by_id(id).await.unwrap().unwrap()
    }

    async fn bulk(&self, campaign_id: Uuid) -> NewsletterResult<BulkSendResponse> {
        let request = SendRequest {
            campaign_id: Some(campaign_id),
            ..Default::default()
        };
        match self.sender.send(&admin(), request).await? {
            SendOutcome::Bulk(result) => Ok(result),
            SendOutcome::Test(_) => panic!("expected a bulk send"),
        }
    }
}

#[tokio::test]
async fn test_bulk_send_reaches_every_active_subscriber() {
    let h = harness(SimulatedTransport::new(), SendSettings { batch_size: 2, concurrency: 2 });
    let subscribers = h.add_subscribers(5).await;
    let campaign = h.add_campaign("<p>Fuzz pedals</p>", None).await;

    let result = h.bulk(campaign.id).await.unwrap();

    assert!(result.completed);
    assert_eq!(result.recipient_count, 5);
    assert_eq!(result.send_results.successful, 5);
    assert_eq!(result.send_results.failed, 0);
    assert_eq!(result.send_results.details.len(), 5);

    let sent = h.transport.sent().await;
    let recipients: HashSet<String> = sent.iter().map(|e| e.to.clone()).collect();
    let expected: HashSet<String> = subscribers.iter().map(|s| s.email.clone()).collect();
    assert_eq!(recipients, expected);

    let stored = h.campaign(campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Sent);
    assert!(stored.sent_at.is_some());
    assert_eq!(stored.delivered_count, 5);
    assert_eq!(stored.send_cursor, subscribers.last().map(|s| s.id));

    let events = h.repos.analytics.count_for_campaign(campaign.id, EventType::Sent).await.unwrap();
    assert_eq!(events, 5);
}

#[tokio::test]
async fn test_each_message_carries_its_own_unsubscribe_link() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    h.add_subscribers(3).await;
    let campaign = h
        .add_campaign(r#"<p>News</p><a href="{{unsubscribeUrl}}">Unsubscribe</a>"#, None)
        .await;

    h.bulk(campaign.id).await.unwrap();

    for email in h.transport.sent().await {
        let url = h.tokens.build_unsubscribe_url(&email.to, Some(campaign.id));
        let escaped = html_escape::encode_double_quoted_attribute(&url);
        assert!(email.html.contains(escaped.as_ref()), "link for {}", email.to);
        assert!(!email.html.contains("{{unsubscribeUrl}}"));
    }
}

#[tokio::test]
async fn test_failures_are_counted_and_campaign_still_ends_sent() {
    let transport = SimulatedTransport::new().failing_for(["rider1@example.com", "rider3@example.com"]);
    let h = harness(transport, SendSettings { batch_size: 2, concurrency: 1 });
    h.add_subscribers(5).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let result = h.bulk(campaign.id).await.unwrap();

    assert_eq!(result.send_results.successful + result.send_results.failed, 5);
    assert_eq!(result.send_results.failed, 2);
    assert_eq!(result.recipient_count, 5);

    let failed: Vec<&DeliveryDetail> = result
        .send_results
        .details
        .iter()
        .filter(|d| d.status == DeliveryStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|d| d.error.is_some() && d.message_id.is_none()));

    let stored = h.campaign(campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Sent);
    assert_eq!(stored.delivered_count, 3);
    assert_eq!(stored.failed_count, 2);

    let events = h.analytics.events().await;
    assert_eq!(events.iter().filter(|e| e.event_type == EventType::Sent).count(), 3);
}

#[tokio::test]
async fn test_all_deliveries_failing_still_completes() {
    let h = harness(SimulatedTransport::failing("provider down"), SendSettings::default());
    h.add_subscribers(3).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let result = h.bulk(campaign.id).await.unwrap();

    assert_eq!(result.send_results.successful, 0);
    assert_eq!(result.send_results.failed, 3);
    assert_eq!(h.campaign(campaign.id).await.status, CampaignStatus::Sent);
}

#[tokio::test]
async fn test_sent_campaign_is_never_dispatched_again() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    h.add_subscribers(2).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;
    h.bulk(campaign.id).await.unwrap();
    assert_eq!(h.transport.sent_count().await, 2);

    let err = h.bulk(campaign.id).await.unwrap_err();
    assert!(matches!(err, NewsletterError::StateConflict(_)));

    let test_err = h
        .sender
        .send(
            &admin(),
            SendRequest {
                campaign_id: Some(campaign.id),
                test_email: Some("qa@example.com".into()),
                send_test: Some(true),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(test_err, NewsletterError::StateConflict(_)));

    assert_eq!(h.transport.sent_count().await, 2);
}

#[tokio::test]
async fn test_no_recipients_leaves_campaign_untouched() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    let subscribers = h.add_subscribers(1).await;
    let mut only = subscribers[0].clone();
    only.deactivate(None);
    h.repos.subscribers.update(only).await.unwrap();

    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let err = h.bulk(campaign.id).await.unwrap_err();
    assert!(matches!(err, NewsletterError::NoRecipients));

    let stored = h.campaign(campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Draft);
    assert_eq!(stored.recipient_count, 0);
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_sends_dispatch_once() {
    let transport = SimulatedTransport::new().with_delay(Duration::from_millis(10));
    let h = harness(transport, SendSettings { batch_size: 2, concurrency: 1 });
    h.add_subscribers(5).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let (first, second) = tokio::join!(h.bulk(campaign.id), h.bulk(campaign.id));

    let (ok, err) = match (first, second) {
        (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
        (a, b) => panic!("expected exactly one winner, got {:?} and {:?}", a.is_ok(), b.is_ok()),
    };
    assert!(matches!(err, NewsletterError::StateConflict(_)));
    assert_eq!(ok.send_results.successful, 5);

    assert_eq!(h.transport.sent_count().await, 5);
    assert_eq!(h.campaign(campaign.id).await.status, CampaignStatus::Sent);
}

#[tokio::test]
async fn test_test_send_touches_nothing_but_the_transport() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    h.add_subscribers(3).await;
    let campaign = h.add_campaign("Hi {{content}} there", None).await;

    let outcome = h
        .sender
        .send(
            &admin(),
            SendRequest {
                campaign_id: Some(campaign.id),
                test_email: Some("A@B.com".into()),
                send_test: Some(true),
            },
        )
        .await
        .unwrap();

    let SendOutcome::Test(result) = outcome else {
        panic!("expected a test send");
    };
    assert_eq!(result.recipient, "a@b.com");
    assert_eq!(result.subject, "Hello");

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].subject, "Hello");
    assert!(!sent[0].html.contains("{{content}}"));
    assert_eq!(sent[0].html, "Hi  there");

    let stored = h.campaign(campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Draft);
    assert_eq!(stored.recipient_count, 0);
    assert_eq!(stored.delivered_count, 0);
}

#[tokio::test]
async fn test_test_send_requires_an_address() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    for test_email in [None, Some("   ".to_string()), Some("not-an-email".to_string())] {
        let err = h
            .sender
            .send(
                &admin(),
                SendRequest {
                    campaign_id: Some(campaign.id),
                    test_email,
                    send_test: Some(true),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::Validation(_)));
    }
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_failed_test_send_surfaces_transport_error() {
    let h = harness(SimulatedTransport::failing("smtp timeout"), SendSettings::default());
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let err = h
        .sender
        .send(
            &admin(),
            SendRequest {
                campaign_id: Some(campaign.id),
                test_email: Some("qa@example.com".into()),
                send_test: Some(true),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NewsletterError::Transport(ref msg) if msg.contains("smtp timeout")));
}

#[tokio::test]
async fn test_template_header_falls_back_to_default() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    let template = h
        .repos
        .templates
        .insert(Template::new(CreateTemplate {
            name: "Plain".into(),
            html_content: "<p>{{headerText}}</p>{{content}}".into(),
            category: "newsletter".into(),
            ..Default::default()
        }))
        .await
        .unwrap();
    let campaign = h.add_campaign("Body text", Some(template.id)).await;

    h.sender
        .send(
            &admin(),
            SendRequest {
                campaign_id: Some(campaign.id),
                test_email: Some("qa@example.com".into()),
                send_test: Some(true),
            },
        )
        .await
        .unwrap();

    let sent = h.transport.sent().await;
    assert_eq!(sent[0].html, "<p>Newsletter</p>Body text");
}

#[tokio::test]
async fn test_cancelled_send_resumes_without_duplicates() {
    let transport = SimulatedTransport::new().with_delay(Duration::from_millis(40));
    let h = harness(transport, SendSettings { batch_size: 2, concurrency: 1 });
    let subscribers = h.add_subscribers(6).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let sender = h.sender.clone();
    let campaign_id = campaign.id;
    let running = tokio::spawn(async move {
        sender
            .send(&admin(), SendRequest { campaign_id: Some(campaign_id), ..Default::default() })
            .await
    });

    // Wait until the first batch is under way
    while h.transport.sent_count().await == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(h.sender.cancel(&admin(), Some(campaign.id)).unwrap());

    let SendOutcome::Bulk(interrupted) = running.await.unwrap().unwrap() else {
        panic!("expected a bulk send");
    };
    assert!(!interrupted.completed);
    assert!(interrupted.send_results.successful < 6);

    let paused = h.campaign(campaign.id).await;
    assert_eq!(paused.status, CampaignStatus::Sending);
    assert_eq!(paused.recipient_count, 6);
    assert!(paused.send_cursor.is_some());
    assert!(!h.sender.control().is_running(campaign.id));

    let resumed = h.sender.resume(&admin(), Some(campaign.id)).await.unwrap();
    assert!(resumed.completed);
    assert_eq!(
        interrupted.send_results.successful + resumed.send_results.successful,
        6
    );

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 6);
    let unique: HashSet<&str> = sent.iter().map(|e| e.to.as_str()).collect();
    assert_eq!(unique.len(), 6);
    assert!(subscribers.iter().all(|s| unique.contains(s.email.as_str())));

    let done = h.campaign(campaign.id).await;
    assert_eq!(done.status, CampaignStatus::Sent);
    assert_eq!(done.delivered_count, 6);
}

#[tokio::test]
async fn test_resume_requires_sending_status() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let err = h.sender.resume(&admin(), Some(campaign.id)).await.unwrap_err();
    assert!(matches!(err, NewsletterError::StateConflict(_)));
}

#[tokio::test]
async fn test_stats_reflect_counters() {
    let h = harness(SimulatedTransport::new(), SendSettings::default());
    h.add_subscribers(2).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;
    h.bulk(campaign.id).await.unwrap();

    let stats = h.sender.stats(&admin(), Some(campaign.id)).await.unwrap();
    assert_eq!(stats.campaign_id, campaign.id);
    assert_eq!(stats.status, CampaignStatus::Sent);
    assert_eq!(stats.recipient_count, 2);
    assert_eq!(stats.delivered_count, 2);
    assert!(stats.sent_at.is_some());

    let err = h
        .sender
        .stats(&AuthUser::new("u", "u@example.com", vec![]), Some(campaign.id))
        .await
        .unwrap_err();
    assert!(matches!(err, NewsletterError::Unauthorized(_)));
}

#[tokio::test]
async fn test_resume_skips_subscribers_who_joined_while_paused() {
    let transport = SimulatedTransport::new().with_delay(Duration::from_millis(40));
    let h = harness(transport, SendSettings { batch_size: 2, concurrency: 1 });
    h.add_subscribers(6).await;
    let campaign = h.add_campaign("<p>Body</p>", None).await;

    let sender = h.sender.clone();
    let campaign_id = campaign.id;
    let running = tokio::spawn(async move {
        sender
            .send(&admin(), SendRequest { campaign_id: Some(campaign_id), ..Default::default() })
            .await
    });

    while h.transport.sent_count().await == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(h.sender.cancel(&admin(), Some(campaign.id)).unwrap());
    running.await.unwrap().unwrap();

    let late = Subscriber::new(&SubscribeRequest {
        email: "late@example.com".into(),
        first_name: None,
        last_name: None,
        source: None,
        user_id: None,
    });
    h.repos.subscribers.insert(late).await.unwrap();

    let resumed = h.sender.resume(&admin(), Some(campaign.id)).await.unwrap();
    assert!(resumed.completed);
    assert!(!h.transport.was_sent_to("late@example.com").await);

    let done = h.campaign(campaign.id).await;
    assert_eq!(done.recipient_count, 6);
    assert_eq!(done.delivered_count + done.failed_count, 6);
    assert_eq!(h.transport.sent_count().await, 6);
}
