use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr,
};
use uuid::Uuid;

use crate::entity::{campaign, event, subscriber, template};
use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{AnalyticsEvent, Campaign, CampaignStatus, EventType, Subscriber, SubscriberFilter, Template};
use crate::repository::{
    AnalyticsRepository, CampaignRepository, Repositories, SubscriberRepository, TemplateRepository,
    edit_conflict,
};
use std::sync::Arc;

impl Repositories {
    pub fn postgres(db: DatabaseConnection) -> Self {
        Self {
            subscribers: Arc::new(PgSubscriberRepository::new(db.clone())),
            templates: Arc::new(PgTemplateRepository::new(db.clone())),
            campaigns: Arc::new(PgCampaignRepository::new(db.clone())),
            analytics: Arc::new(PgAnalyticsRepository::new(db)),
        }
    }
}

fn map_write_err(err: DbErr, entity: &'static str, key: impl ToString) -> NewsletterError {
    match err {
        DbErr::RecordNotUpdated => NewsletterError::not_found(entity, key),
        err => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => NewsletterError::StateConflict(format!(
                "{} {} is already registered",
                entity,
                key.to_string()
            )),
            _ => err.into(),
        },
    }
}

pub struct PgSubscriberRepository {
    db: DatabaseConnection,
}

impl PgSubscriberRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    async fn find_by_email(&self, email: &str) -> NewsletterResult<Option<Subscriber>> {
        let model = subscriber::Entity::find()
            .filter(subscriber::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Subscriber>> {
        let model = subscriber::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: SubscriberFilter) -> NewsletterResult<Vec<Subscriber>> {
        let mut query = subscriber::Entity::find();
        if let Some(active) = filter.active {
            query = query.filter(subscriber::Column::IsActive.eq(active));
        }

        let models = query
            .order_by_desc(subscriber::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_active_after(
        &self,
        after: Option<Uuid>,
        through: Option<Uuid>,
    ) -> NewsletterResult<Vec<Subscriber>> {
        let mut query = subscriber::Entity::find().filter(subscriber::Column::IsActive.eq(true));
        if let Some(cursor) = after {
            query = query.filter(subscriber::Column::Id.gt(cursor));
        }
        if let Some(bound) = through {
            query = query.filter(subscriber::Column::Id.lte(bound));
        }

        let models = query
            .order_by_asc(subscriber::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, input: Subscriber) -> NewsletterResult<Subscriber> {
        let email = input.email.clone();
        let active: subscriber::ActiveModel = input.into();
        let model = active
            .insert(&self.db)
            .await
            .map_err(|e| map_write_err(e, "Email", &email))?;

        tracing::info!(subscriber_id = %model.id, "Created subscriber");
        Ok(model.into())
    }

    async fn update(&self, input: Subscriber) -> NewsletterResult<Subscriber> {
        let id = input.id;
        let email = input.email.clone();
        let active: subscriber::ActiveModel = input.into();
        let model = active.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => NewsletterError::not_found("Subscriber", id),
            e => map_write_err(e, "Email", &email),
        })?;
        Ok(model.into())
    }
}

pub struct PgTemplateRepository {
    db: DatabaseConnection,
}

impl PgTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn list(&self, include_deleted: bool) -> NewsletterResult<Vec<Template>> {
        let mut query = template::Entity::find();
        if !include_deleted {
            query = query.filter(template::Column::DeletedAt.is_null());
        }

        let models = query
            .order_by_desc(template::Column::IsDefault)
            .order_by_asc(template::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Template>> {
        let model = template::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> NewsletterResult<Option<Template>> {
        let model = template::Entity::find()
            .filter(template::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn insert(&self, input: Template) -> NewsletterResult<Template> {
        let active: template::ActiveModel = input.into();
        let model = active.insert(&self.db).await?;
        tracing::info!(template_id = %model.id, name = %model.name, "Created template");
        Ok(model.into())
    }

    async fn update(&self, input: Template) -> NewsletterResult<Template> {
        let id = input.id;
        let active: template::ActiveModel = input.into();
        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_write_err(e, "Template", id))?;
        Ok(model.into())
    }
}

pub struct PgCampaignRepository {
    db: DatabaseConnection,
}

impl PgCampaignRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require(&self, id: Uuid) -> NewsletterResult<Campaign> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Campaign", id))
    }

    /// Resolve a conditional write that touched no rows into the right error.
    async fn rejected(&self, id: Uuid, action: &str) -> NewsletterError {
        match self.get_by_id(id).await {
            Ok(Some(current)) => NewsletterError::StateConflict(format!(
                "Cannot {} a campaign that is {}",
                action, current.status
            )),
            Ok(None) => NewsletterError::not_found("Campaign", id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn list(&self) -> NewsletterResult<Vec<Campaign>> {
        let models = campaign::Entity::find()
            .order_by_desc(campaign::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> NewsletterResult<Option<Campaign>> {
        let model = campaign::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn insert(&self, input: Campaign) -> NewsletterResult<Campaign> {
        let active: campaign::ActiveModel = input.into();
        let model = active.insert(&self.db).await?;
        tracing::info!(campaign_id = %model.id, "Created campaign");
        Ok(model.into())
    }

    async fn update(&self, input: Campaign, expected: CampaignStatus) -> NewsletterResult<Campaign> {
        let id = input.id;
        let full: campaign::ActiveModel = input.into();

        // Counters and cursor belong to the send path and are left untouched
        let editable = campaign::ActiveModel {
            name: full.name,
            subject: full.subject,
            preview_text: full.preview_text,
            content: full.content,
            template_id: full.template_id,
            scheduled_at: full.scheduled_at,
            status: full.status,
            tags: full.tags,
            updated_at: full.updated_at,
            ..Default::default()
        };

        let result = campaign::Entity::update_many()
            .set(editable)
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(expected))
            .filter(campaign::Column::Status.ne(CampaignStatus::Sent))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(match self.get_by_id(id).await? {
                Some(current) => edit_conflict(current.status),
                None => NewsletterError::not_found("Campaign", id),
            });
        }

        self.require(id).await
    }

    async fn cancel_draft(&self, id: Uuid) -> NewsletterResult<Campaign> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Cancelled),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(CampaignStatus::Draft))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(match self.get_by_id(id).await? {
                Some(_) => NewsletterError::StateConflict("Can only delete draft campaigns".into()),
                None => NewsletterError::not_found("Campaign", id),
            });
        }

        tracing::info!(campaign_id = %id, "Cancelled campaign");
        self.require(id).await
    }

    async fn begin_sending(
        &self,
        id: Uuid,
        recipient_count: i32,
        send_bound: Uuid,
    ) -> NewsletterResult<Campaign> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Sending),
                recipient_count: Set(recipient_count),
                delivered_count: Set(0),
                failed_count: Set(0),
                send_cursor: Set(None),
                send_bound: Set(Some(send_bound)),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.is_in([CampaignStatus::Draft, CampaignStatus::Scheduled]))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self.rejected(id, "send").await);
        }

        self.require(id).await
    }

    async fn record_progress(
        &self,
        id: Uuid,
        cursor: Uuid,
        delivered: i32,
        failed: i32,
    ) -> NewsletterResult<()> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                send_cursor: Set(Some(cursor)),
                delivered_count: Set(delivered),
                failed_count: Set(failed),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(CampaignStatus::Sending))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self.rejected(id, "checkpoint").await);
        }
        Ok(())
    }

    async fn mark_sent(&self, id: Uuid) -> NewsletterResult<Campaign> {
        let now = Utc::now();
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Sent),
                sent_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(CampaignStatus::Sending))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self.rejected(id, "complete").await);
        }

        self.require(id).await
    }

    async fn increment_unsubscribes(&self, id: Uuid) -> NewsletterResult<()> {
        let result = campaign::Entity::update_many()
            .col_expr(
                campaign::Column::UnsubscribeCount,
                Expr::cust("unsubscribe_count + 1"),
            )
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(NewsletterError::not_found("Campaign", id));
        }
        Ok(())
    }
}

pub struct PgAnalyticsRepository {
    db: DatabaseConnection,
}

impl PgAnalyticsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn record(&self, input: AnalyticsEvent) -> NewsletterResult<()> {
        let active: event::ActiveModel = input.into();
        event::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn count_for_campaign(&self, campaign_id: Uuid, event_type: EventType) -> NewsletterResult<u64> {
        let count = event::Entity::find()
            .filter(event::Column::CampaignId.eq(campaign_id))
            .filter(event::Column::EventType.eq(event_type.to_string()))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateCampaign;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn campaign_model(status: CampaignStatus) -> campaign::Model {
        let campaign = Campaign::new(
            CreateCampaign {
                name: "Launch".into(),
                subject: "Hello".into(),
                content: "<p>Hi</p>".into(),
                ..Default::default()
            },
            None,
        );
        let now = Utc::now().into();
        campaign::Model {
            id: campaign.id,
            name: campaign.name,
            subject: campaign.subject,
            preview_text: None,
            content: campaign.content,
            template_id: None,
            status,
            scheduled_at: None,
            sent_at: None,
            recipient_count: 0,
            delivered_count: 0,
            failed_count: 0,
            send_cursor: None,
            send_bound: None,
            open_count: 0,
            click_count: 0,
            unsubscribe_count: 0,
            bounce_count: 0,
            created_by: None,
            tags: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_begin_sending_loser_gets_state_conflict() {
        let current = campaign_model(CampaignStatus::Sending);
        let id = current.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![current]])
            .into_connection();

        let repo = PgCampaignRepository::new(db);
        let err = repo.begin_sending(id, 10, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, NewsletterError::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_begin_sending_winner_returns_campaign() {
        let mut current = campaign_model(CampaignStatus::Sending);
        current.recipient_count = 10;
        let id = current.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![current]])
            .into_connection();

        let repo = PgCampaignRepository::new(db);
        let campaign = repo.begin_sending(id, 10, Uuid::now_v7()).await.unwrap();
        assert_eq!(campaign.status, CampaignStatus::Sending);
        assert_eq!(campaign.recipient_count, 10);
    }

    #[tokio::test]
    async fn test_update_with_stale_status_is_rejected() {
        let current = campaign_model(CampaignStatus::Sending);
        let stale: Campaign = campaign_model(CampaignStatus::Draft).into();
        let stale = Campaign { id: current.id, ..stale };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![current]])
            .into_connection();

        let repo = PgCampaignRepository::new(db);
        let err = repo.update(stale, CampaignStatus::Draft).await.unwrap_err();
        assert!(matches!(err, NewsletterError::StateConflict(ref m) if m.contains("sending")));
    }

    #[tokio::test]
    async fn test_increment_unsubscribes_missing_campaign() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PgCampaignRepository::new(db);
        let err = repo.increment_unsubscribes(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, NewsletterError::NotFound { .. }));
    }
}
