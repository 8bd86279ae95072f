use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NewsletterSubscribers::Table)
                    .if_not_exists()
                    .col(pk_uuid(NewsletterSubscribers::Id))
                    // Always stored trimmed and lowercased
                    .col(
                        ColumnDef::new(NewsletterSubscribers::Email)
                            .string_len(320)
                            .not_null()
                            .unique_key(),
                    )
                    .col(text_null(NewsletterSubscribers::FirstName))
                    .col(text_null(NewsletterSubscribers::LastName))
                    .col(ColumnDef::new(NewsletterSubscribers::UserId).uuid().null())
                    .col(
                        ColumnDef::new(NewsletterSubscribers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(NewsletterSubscribers::Source)
                            .string_len(64)
                            .not_null()
                            .default("website"),
                    )
                    .col(
                        timestamp_with_time_zone(NewsletterSubscribers::SubscriptionDate)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(
                        NewsletterSubscribers::UnsubscribedAt,
                    ))
                    .col(text_null(NewsletterSubscribers::UnsubscribeReason))
                    .col(
                        timestamp_with_time_zone(NewsletterSubscribers::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(NewsletterSubscribers::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NewsletterTemplates::Table)
                    .if_not_exists()
                    .col(pk_uuid(NewsletterTemplates::Id))
                    .col(
                        ColumnDef::new(NewsletterTemplates::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(text(NewsletterTemplates::Description).default(""))
                    .col(text(NewsletterTemplates::HtmlContent))
                    .col(
                        ColumnDef::new(NewsletterTemplates::Category)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NewsletterTemplates::Variables)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(NewsletterTemplates::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(timestamp_with_time_zone_null(NewsletterTemplates::DeletedAt))
                    .col(
                        timestamp_with_time_zone(NewsletterTemplates::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(NewsletterTemplates::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NewsletterCampaigns::Table)
                    .if_not_exists()
                    .col(pk_uuid(NewsletterCampaigns::Id))
                    .col(
                        ColumnDef::new(NewsletterCampaigns::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NewsletterCampaigns::Subject)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(text_null(NewsletterCampaigns::PreviewText))
                    .col(text(NewsletterCampaigns::Content))
                    .col(ColumnDef::new(NewsletterCampaigns::TemplateId).uuid().null())
                    .col(
                        ColumnDef::new(NewsletterCampaigns::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(timestamp_with_time_zone_null(NewsletterCampaigns::ScheduledAt))
                    .col(timestamp_with_time_zone_null(NewsletterCampaigns::SentAt))
                    .col(integer(NewsletterCampaigns::RecipientCount).default(0))
                    .col(integer(NewsletterCampaigns::DeliveredCount).default(0))
                    .col(integer(NewsletterCampaigns::FailedCount).default(0))
                    .col(ColumnDef::new(NewsletterCampaigns::SendCursor).uuid().null())
                    .col(ColumnDef::new(NewsletterCampaigns::SendBound).uuid().null())
                    .col(integer(NewsletterCampaigns::OpenCount).default(0))
                    .col(integer(NewsletterCampaigns::ClickCount).default(0))
                    .col(integer(NewsletterCampaigns::UnsubscribeCount).default(0))
                    .col(integer(NewsletterCampaigns::BounceCount).default(0))
                    .col(text_null(NewsletterCampaigns::CreatedBy))
                    .col(
                        ColumnDef::new(NewsletterCampaigns::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        timestamp_with_time_zone(NewsletterCampaigns::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(NewsletterCampaigns::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_newsletter_campaigns_template")
                            .from(NewsletterCampaigns::Table, NewsletterCampaigns::TemplateId)
                            .to(NewsletterTemplates::Table, NewsletterTemplates::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NewsletterEvents::Table)
                    .if_not_exists()
                    .col(pk_uuid(NewsletterEvents::Id))
                    .col(ColumnDef::new(NewsletterEvents::CampaignId).uuid().null())
                    .col(ColumnDef::new(NewsletterEvents::SubscriberId).uuid().null())
                    .col(
                        ColumnDef::new(NewsletterEvents::Email)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NewsletterEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NewsletterEvents::Metadata).json_binary().null())
                    .col(
                        timestamp_with_time_zone(NewsletterEvents::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_newsletter_subscribers_active")
                    .table(NewsletterSubscribers::Table)
                    .col(NewsletterSubscribers::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_newsletter_campaigns_status")
                    .table(NewsletterCampaigns::Table)
                    .col(NewsletterCampaigns::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_newsletter_events_campaign")
                    .table(NewsletterEvents::Table)
                    .col(NewsletterEvents::CampaignId)
                    .col(NewsletterEvents::EventType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NewsletterEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NewsletterCampaigns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NewsletterTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NewsletterSubscribers::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum NewsletterSubscribers {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    UserId,
    IsActive,
    Source,
    SubscriptionDate,
    UnsubscribedAt,
    UnsubscribeReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NewsletterTemplates {
    Table,
    Id,
    Name,
    Description,
    HtmlContent,
    Category,
    Variables,
    IsDefault,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NewsletterCampaigns {
    Table,
    Id,
    Name,
    Subject,
    PreviewText,
    Content,
    TemplateId,
    Status,
    ScheduledAt,
    SentAt,
    RecipientCount,
    DeliveredCount,
    FailedCount,
    SendCursor,
    SendBound,
    OpenCount,
    ClickCount,
    UnsubscribeCount,
    BounceCount,
    CreatedBy,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NewsletterEvents {
    Table,
    Id,
    CampaignId,
    SubscriberId,
    Email,
    EventType,
    Metadata,
    CreatedAt,
}
