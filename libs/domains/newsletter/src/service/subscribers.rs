use std::sync::Arc;

use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{
    AnalyticsEvent, EventType, SubscribeOutcome, SubscribeRequest, Subscriber, SubscriberFilter,
    UnsubscribeOutcome, UpdateSubscriber, looks_like_email, normalize_email,
};
use crate::repository::{AnalyticsRepository, CampaignRepository, SubscriberRepository};
use crate::transport::{ContactRegistration, EmailTransport};
use uuid::Uuid;

#[derive(Clone)]
pub struct SubscriberService {
    subscribers: Arc<dyn SubscriberRepository>,
    campaigns: Arc<dyn CampaignRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
    transport: Arc<dyn EmailTransport>,
}

impl SubscriberService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        campaigns: Arc<dyn CampaignRepository>,
        analytics: Arc<dyn AnalyticsRepository>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self {
            subscribers,
            campaigns,
            analytics,
            transport,
        }
    }

    /// Subscribe, or reactivate a previously unsubscribed address.
    /// Subscribing an already active address is not an error.
    pub async fn subscribe(&self, input: SubscribeRequest) -> NewsletterResult<SubscribeOutcome> {
        let email = normalize_email(&input.email);
        if !looks_like_email(&email) {
            return Err(NewsletterError::Validation("Valid email is required".into()));
        }

        if let Some(mut existing) = self.subscribers.find_by_email(&email).await? {
            if existing.is_active {
                return Ok(SubscribeOutcome {
                    subscriber: existing,
                    already_subscribed: true,
                    reactivated: false,
                });
            }

            existing.reactivate(&input);
            let subscriber = self.subscribers.update(existing).await?;
            tracing::info!(subscriber_id = %subscriber.id, "Reactivated subscriber");
            self.register_contact(&subscriber).await;

            return Ok(SubscribeOutcome {
                subscriber,
                already_subscribed: false,
                reactivated: true,
            });
        }

        let subscriber = match self.subscribers.insert(Subscriber::new(&input)).await {
            Ok(subscriber) => subscriber,
            // Lost a race with a concurrent subscribe for the same address
            Err(NewsletterError::StateConflict(_)) => {
                let existing = self
                    .subscribers
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| NewsletterError::Internal("Subscriber vanished after conflict".into()))?;
                return Ok(SubscribeOutcome {
                    subscriber: existing,
                    already_subscribed: true,
                    reactivated: false,
                });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(subscriber_id = %subscriber.id, source = %subscriber.source, "New subscriber");
        self.register_contact(&subscriber).await;

        Ok(SubscribeOutcome {
            subscriber,
            already_subscribed: false,
            reactivated: false,
        })
    }

    async fn register_contact(&self, subscriber: &Subscriber) {
        let contact = ContactRegistration {
            email: subscriber.email.clone(),
            first_name: subscriber.first_name.clone(),
            last_name: subscriber.last_name.clone(),
            source: subscriber.source.clone(),
        };

        if let Err(e) = self.transport.register_contact(&contact).await {
            tracing::warn!(
                subscriber_id = %subscriber.id,
                transport = self.transport.name(),
                error = %e,
                "Contact registration failed, subscription kept"
            );
        }
    }

    pub async fn get_by_email(&self, email: &str) -> NewsletterResult<Subscriber> {
        let email = normalize_email(email);
        self.subscribers
            .find_by_email(&email)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Subscriber", email))
    }

    pub async fn list(&self, filter: SubscriberFilter) -> NewsletterResult<Vec<Subscriber>> {
        self.subscribers.list(filter).await
    }

    pub async fn update(&self, input: UpdateSubscriber) -> NewsletterResult<Subscriber> {
        let mut subscriber = self
            .subscribers
            .get_by_id(input.id)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Subscriber", input.id))?;

        if let Some(email) = input.email.as_deref() {
            let email = normalize_email(email);
            if !looks_like_email(&email) {
                return Err(NewsletterError::Validation("Valid email is required".into()));
            }
            let taken = self
                .subscribers
                .find_by_email(&email)
                .await?
                .is_some_and(|other| other.id != subscriber.id);
            if taken {
                return Err(NewsletterError::StateConflict(
                    "Email is already used by another subscriber".into(),
                ));
            }
        }

        subscriber.apply_update(input);
        let subscriber = self.subscribers.update(subscriber).await?;
        tracing::info!(subscriber_id = %subscriber.id, "Updated subscriber");
        Ok(subscriber)
    }

    /// Deactivate by email. Repeating the call is harmless and only the
    /// first one is attributed to `campaign_id`.
    pub async fn unsubscribe(
        &self,
        email: &str,
        reason: Option<String>,
        campaign_id: Option<Uuid>,
    ) -> NewsletterResult<UnsubscribeOutcome> {
        let mut subscriber = self.get_by_email(email).await?;

        if !subscriber.is_active {
            return Ok(UnsubscribeOutcome {
                subscriber,
                already_unsubscribed: true,
            });
        }

        subscriber.deactivate(reason);
        let subscriber = self.subscribers.update(subscriber).await?;
        tracing::info!(subscriber_id = %subscriber.id, campaign_id = ?campaign_id, "Unsubscribed");

        if let Some(campaign_id) = campaign_id {
            self.attribute_unsubscribe(campaign_id, &subscriber).await;
        }

        Ok(UnsubscribeOutcome {
            subscriber,
            already_unsubscribed: false,
        })
    }

    async fn attribute_unsubscribe(&self, campaign_id: Uuid, subscriber: &Subscriber) {
        if let Err(e) = self.campaigns.increment_unsubscribes(campaign_id).await {
            tracing::warn!(campaign_id = %campaign_id, error = %e, "Could not attribute unsubscribe");
            return;
        }

        let event = AnalyticsEvent::new(
            EventType::Unsubscribed,
            Some(campaign_id),
            Some(subscriber.id),
            subscriber.email.clone(),
        );
        if let Err(e) = self.analytics.record(event).await {
            tracing::warn!(campaign_id = %campaign_id, error = %e, "Failed to record unsubscribe event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        InMemoryAnalyticsRepository, InMemoryCampaignRepository, InMemorySubscriberRepository,
        MockSubscriberRepository,
    };
    use crate::transport::SimulatedTransport;

    fn request(email: &str) -> SubscribeRequest {
        SubscribeRequest {
            email: email.into(),
            first_name: None,
            last_name: None,
            source: None,
            user_id: None,
        }
    }

    fn service_with(transport: SimulatedTransport) -> SubscriberService {
        SubscriberService::new(
            Arc::new(InMemorySubscriberRepository::new()),
            Arc::new(InMemoryCampaignRepository::new()),
            Arc::new(InMemoryAnalyticsRepository::new()),
            Arc::new(transport),
        )
    }

    #[tokio::test]
    async fn test_subscribe_normalizes_and_registers_contact() {
        let transport = SimulatedTransport::new();
        let service = service_with(transport.clone());

        let outcome = service.subscribe(request("  Rider@Example.com ")).await.unwrap();
        assert_eq!(outcome.subscriber.email, "rider@example.com");
        assert!(!outcome.already_subscribed);
        assert_eq!(transport.contacts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_not_an_error() {
        let service = service_with(SimulatedTransport::new());
        let first = service.subscribe(request("a@example.com")).await.unwrap();
        let second = service.subscribe(request("A@example.com")).await.unwrap();

        assert!(second.already_subscribed);
        assert_eq!(first.subscriber.id, second.subscriber.id);
    }

    #[tokio::test]
    async fn test_contact_registration_failure_keeps_subscription() {
        let service = service_with(SimulatedTransport::failing("mailerlite down"));
        let outcome = service.subscribe(request("a@example.com")).await.unwrap();
        assert!(outcome.subscriber.is_active);
    }

    #[tokio::test]
    async fn test_unsubscribe_then_resubscribe_reactivates() {
        let service = service_with(SimulatedTransport::new());
        let original = service.subscribe(request("a@example.com")).await.unwrap().subscriber;

        let out = service.unsubscribe("a@example.com", Some("busy".into()), None).await.unwrap();
        assert!(!out.subscriber.is_active);
        assert_eq!(out.subscriber.unsubscribe_reason.as_deref(), Some("busy"));

        let back = service.subscribe(request("a@example.com")).await.unwrap();
        assert!(back.reactivated);
        assert_eq!(back.subscriber.id, original.id);
        assert!(back.subscriber.unsubscribed_at.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_email_is_not_found() {
        let service = service_with(SimulatedTransport::new());
        let err = service.unsubscribe("ghost@example.com", None, None).await.unwrap_err();
        assert!(matches!(err, NewsletterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email() {
        let service = service_with(SimulatedTransport::new());
        service.subscribe(request("a@example.com")).await.unwrap();
        let b = service.subscribe(request("b@example.com")).await.unwrap().subscriber;

        let err = service
            .update(UpdateSubscriber {
                id: b.id,
                email: Some("A@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_subscriber() {
        let mut repo = MockSubscriberRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));

        let service = SubscriberService::new(
            Arc::new(repo),
            Arc::new(InMemoryCampaignRepository::new()),
            Arc::new(InMemoryAnalyticsRepository::new()),
            Arc::new(SimulatedTransport::new()),
        );

        let err = service
            .update(UpdateSubscriber {
                id: Uuid::now_v7(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::NotFound { .. }));
    }
}
