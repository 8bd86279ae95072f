use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::{
    AdminUser, AppError, AuditEvent, AuditOutcome, JwtAuth, ValidatedJson,
    errors::responses::{
        BadGatewayResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse, StateConflictResponse, UnauthorizedResponse,
    },
    extract_ip_from_headers, extract_user_agent, optional_jwt_auth_middleware,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::config::NewsletterConfig;
use crate::content::ContentDefaults;
use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{
    AnalyticsEvent, BulkSendResponse, Campaign, CampaignRef, CampaignStats, CampaignStatus,
    CreateCampaign, CreateTemplate, DeliveryDetail, DeliveryStatus, EventType, IdQuery,
    SendOutcome, SendRequest, SendResults, SubscribeRequest, Subscriber, SubscriberFilter,
    Template, TemplateQuery, TestSendResult, UnsubscribeOutcome, UnsubscribeQuery,
    UpdateCampaign, UpdateSubscriber, UpdateTemplate,
};
use crate::repository::Repositories;
use crate::service::{CampaignSender, CampaignService, SendSettings, SubscriberService, TemplateService};
use crate::token::UnsubscribeTokens;
use crate::transport::EmailTransport;

pub const TAG: &str = "newsletter";

/// OpenAPI documentation for the newsletter API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_subscribers,
        subscribe,
        update_subscriber,
        unsubscribe_by_query,
        get_campaigns,
        create_campaign,
        update_campaign,
        delete_campaign,
        get_templates,
        create_template,
        update_template,
        delete_template,
        send_campaign,
        campaign_stats,
        resume_send,
        cancel_send,
        unsubscribe_page,
        unsubscribe_action,
    ),
    components(
        schemas(
            Subscriber, SubscribeRequest, UpdateSubscriber, SubscribeResponse, UnsubscribeResponse,
            Campaign, CampaignStatus, CreateCampaign, UpdateCampaign, CampaignStats,
            Template, CreateTemplate, UpdateTemplate,
            SendRequest, CampaignRef, SendOutcome, TestSendResult, BulkSendResponse, SendResults,
            DeliveryDetail, DeliveryStatus, CancelResponse, AnalyticsEvent, EventType,
            UnsubscribeQuery
        ),
        responses(
            BadRequestValidationResponse,
            StateConflictResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            BadGatewayResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Newsletter subscribers, templates, campaigns and sending")
    )
)]
pub struct ApiDoc;

/// Everything the newsletter routes need, cheap to clone.
#[derive(Clone)]
pub struct NewsletterState {
    pub subscribers: SubscriberService,
    pub templates: TemplateService,
    pub campaigns: CampaignService,
    pub sender: CampaignSender,
    pub tokens: UnsubscribeTokens,
    pub auth: JwtAuth,
}

impl NewsletterState {
    pub fn new(
        repos: Repositories,
        transport: Arc<dyn EmailTransport>,
        config: &NewsletterConfig,
        auth: JwtAuth,
    ) -> NewsletterResult<Self> {
        let tokens = UnsubscribeTokens::from_config(config)?;

        Ok(Self {
            subscribers: SubscriberService::new(
                repos.subscribers.clone(),
                repos.campaigns.clone(),
                repos.analytics.clone(),
                transport.clone(),
            ),
            templates: TemplateService::new(repos.templates.clone()),
            campaigns: CampaignService::new(repos.campaigns.clone(), repos.templates.clone()),
            sender: CampaignSender::new(
                repos,
                transport,
                tokens.clone(),
                ContentDefaults::from(config),
                SendSettings::from(config),
            ),
            tokens,
            auth,
        })
    }
}

/// Routes relative to the newsletter mount point (`/api/newsletter`).
///
/// Tokens are decoded for every request; admin routes then demand an
/// [`AdminUser`], public ones ignore the caller.
pub fn router(state: NewsletterState) -> Router {
    let auth = state.auth.clone();

    Router::new()
        .route(
            "/",
            get(list_subscribers)
                .post(subscribe)
                .put(update_subscriber)
                .delete(unsubscribe_by_query),
        )
        .route(
            "/campaigns",
            get(get_campaigns)
                .post(create_campaign)
                .put(update_campaign)
                .delete(delete_campaign),
        )
        .route(
            "/templates",
            get(get_templates)
                .post(create_template)
                .put(update_template)
                .delete(delete_template),
        )
        .route("/send", post(send_campaign).get(campaign_stats))
        .route("/send/resume", post(resume_send))
        .route("/send/cancel", post(cancel_send))
        .route("/unsubscribe", get(unsubscribe_page).post(unsubscribe_action))
        .layer(middleware::from_fn_with_state(auth, optional_jwt_auth_middleware))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub message: String,
    pub subscriber: Subscriber,
    pub already_subscribed: bool,
    pub reactivated: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub message: String,
}

impl From<UnsubscribeOutcome> for UnsubscribeResponse {
    fn from(outcome: UnsubscribeOutcome) -> Self {
        let message = if outcome.already_unsubscribed {
            "You are already unsubscribed"
        } else {
            "You have been unsubscribed"
        };
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelResponse {
    pub cancelled: bool,
}

fn audit(
    headers: &HeaderMap,
    user_id: Option<String>,
    action: &str,
    resource: String,
    details: serde_json::Value,
) {
    AuditEvent::new(user_id, action, Some(resource), AuditOutcome::Success)
        .with_ip(extract_ip_from_headers(headers))
        .with_user_agent(extract_user_agent(headers))
        .with_details(details)
        .log();
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// List subscribers
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(SubscriberFilter),
    responses(
        (status = 200, description = "Subscribers, newest first", body = Vec<Subscriber>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_subscribers(
    State(state): State<NewsletterState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<SubscriberFilter>,
) -> NewsletterResult<Json<Vec<Subscriber>>> {
    Ok(Json(state.subscribers.list(filter).await?))
}

/// Subscribe an email address
///
/// Subscribing an active address again is not an error; an unsubscribed
/// address is reactivated.
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "New subscriber", body = SubscribeResponse),
        (status = 200, description = "Already subscribed or reactivated", body = SubscribeResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn subscribe(
    State(state): State<NewsletterState>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<SubscribeRequest>,
) -> NewsletterResult<impl IntoResponse> {
    let outcome = state.subscribers.subscribe(input).await?;

    let (status, message) = if outcome.already_subscribed {
        (StatusCode::OK, "Already subscribed")
    } else if outcome.reactivated {
        (StatusCode::OK, "Welcome back! Your subscription has been reactivated")
    } else {
        (StatusCode::CREATED, "Successfully subscribed")
    };

    if !outcome.already_subscribed {
        audit(
            &headers,
            None,
            "subscriber.subscribe",
            format!("subscriber:{}", outcome.subscriber.id),
            json!({ "source": outcome.subscriber.source, "reactivated": outcome.reactivated }),
        );
    }

    Ok((
        status,
        Json(SubscribeResponse {
            message: message.to_string(),
            subscriber: outcome.subscriber,
            already_subscribed: outcome.already_subscribed,
            reactivated: outcome.reactivated,
        }),
    ))
}

/// Update a subscriber
#[utoipa::path(
    put,
    path = "",
    tag = TAG,
    request_body = UpdateSubscriber,
    responses(
        (status = 200, description = "Subscriber updated", body = Subscriber),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_subscriber(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<UpdateSubscriber>,
) -> NewsletterResult<Json<Subscriber>> {
    let subscriber = state.subscribers.update(input).await?;

    audit(
        &headers,
        Some(admin.id),
        "subscriber.update",
        format!("subscriber:{}", subscriber.id),
        json!({ "isActive": subscriber.is_active }),
    );

    Ok(Json(subscriber))
}

/// Unsubscribe by email
#[utoipa::path(
    delete,
    path = "",
    tag = TAG,
    params(UnsubscribeQuery),
    responses(
        (status = 200, description = "Unsubscribed", body = UnsubscribeResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn unsubscribe_by_query(
    State(state): State<NewsletterState>,
    headers: HeaderMap,
    Query(query): Query<UnsubscribeQuery>,
) -> NewsletterResult<Json<UnsubscribeResponse>> {
    let outcome = verified_unsubscribe(&state, query, &headers).await?;
    Ok(Json(outcome.into()))
}

/// Shared by every public unsubscribe route: a token, when present, must
/// belong to the email.
async fn verified_unsubscribe(
    state: &NewsletterState,
    query: UnsubscribeQuery,
    headers: &HeaderMap,
) -> NewsletterResult<UnsubscribeOutcome> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| NewsletterError::Validation("Email is required".into()))?;

    if let Some(token) = query.token.as_deref() {
        if !state.tokens.verify(email, token) {
            tracing::debug!("Rejected unsubscribe with invalid token");
            return Err(NewsletterError::Validation("Invalid unsubscribe token".into()));
        }
    }

    let outcome = state
        .subscribers
        .unsubscribe(email, query.reason, query.campaign)
        .await?;

    if !outcome.already_unsubscribed {
        audit(
            headers,
            None,
            "subscriber.unsubscribe",
            format!("subscriber:{}", outcome.subscriber.id),
            json!({ "campaignId": query.campaign, "tokenSupplied": query.token.is_some() }),
        );
    }

    Ok(outcome)
}

/// Unsubscribe confirmation page (link target in every email)
#[utoipa::path(
    get,
    path = "/unsubscribe",
    tag = TAG,
    params(UnsubscribeQuery),
    responses(
        (status = 200, description = "Confirmation page", content_type = "text/html", body = String),
        (status = 400, description = "Missing email or invalid token", content_type = "text/html", body = String),
        (status = 404, description = "Unknown email", content_type = "text/html", body = String)
    )
)]
async fn unsubscribe_page(
    State(state): State<NewsletterState>,
    headers: HeaderMap,
    Query(query): Query<UnsubscribeQuery>,
) -> Response {
    match verified_unsubscribe(&state, query, &headers).await {
        Ok(outcome) => {
            let body = if outcome.already_unsubscribed {
                format!(
                    "<p><strong>{}</strong> is already unsubscribed.</p>",
                    html_escape::encode_text(&outcome.subscriber.email)
                )
            } else {
                format!(
                    "<p><strong>{}</strong> will no longer receive our newsletter.</p>",
                    html_escape::encode_text(&outcome.subscriber.email)
                )
            };
            Html(render_page("You have been unsubscribed", &body)).into_response()
        }
        Err(err) => {
            let error = AppError::from(err);
            let status = error.status();
            let body = format!("<p>{}</p>", html_escape::encode_text(&error.into_body().error));
            (status, Html(render_page("Unable to unsubscribe", &body))).into_response()
        }
    }
}

fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <title>{title}</title>\n</head>\n\
         <body style=\"font-family:Arial,sans-serif;max-width:480px;margin:64px auto;text-align:center;\">\n  \
         <h1>{title}</h1>\n  {body}\n</body>\n</html>",
        title = html_escape::encode_text(title),
        body = body,
    )
}

/// Unsubscribe (JSON)
#[utoipa::path(
    post,
    path = "/unsubscribe",
    tag = TAG,
    request_body = UnsubscribeQuery,
    responses(
        (status = 200, description = "Unsubscribed", body = UnsubscribeResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn unsubscribe_action(
    State(state): State<NewsletterState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<UnsubscribeQuery>,
) -> NewsletterResult<Json<UnsubscribeResponse>> {
    let outcome = verified_unsubscribe(&state, body, &headers).await?;
    Ok(Json(outcome.into()))
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

/// List campaigns, or fetch one with `?id=`
#[utoipa::path(
    get,
    path = "/campaigns",
    tag = TAG,
    params(IdQuery),
    responses(
        (status = 200, description = "All campaigns, newest first, or the single campaign when `id` is given", body = Vec<Campaign>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_campaigns(
    State(state): State<NewsletterState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<IdQuery>,
) -> NewsletterResult<Response> {
    match query.id {
        Some(id) => Ok(Json(state.campaigns.get(id).await?).into_response()),
        None => Ok(Json(state.campaigns.list().await?).into_response()),
    }
}

/// Create a campaign
#[utoipa::path(
    post,
    path = "/campaigns",
    tag = TAG,
    request_body = CreateCampaign,
    responses(
        (status = 201, description = "Campaign created", body = Campaign),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_campaign(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateCampaign>,
) -> NewsletterResult<impl IntoResponse> {
    let campaign = state.campaigns.create(input, Some(admin.id.clone())).await?;

    audit(
        &headers,
        Some(admin.id),
        "campaign.create",
        format!("campaign:{}", campaign.id),
        json!({ "name": campaign.name, "status": campaign.status.to_string() }),
    );

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Update a campaign
#[utoipa::path(
    put,
    path = "/campaigns",
    tag = TAG,
    request_body = UpdateCampaign,
    responses(
        (status = 200, description = "Campaign updated", body = Campaign),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_campaign(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<UpdateCampaign>,
) -> NewsletterResult<Json<Campaign>> {
    let campaign = state.campaigns.update(input).await?;

    audit(
        &headers,
        Some(admin.id),
        "campaign.update",
        format!("campaign:{}", campaign.id),
        json!({ "status": campaign.status.to_string() }),
    );

    Ok(Json(campaign))
}

/// Cancel a draft campaign
#[utoipa::path(
    delete,
    path = "/campaigns",
    tag = TAG,
    params(IdQuery),
    responses(
        (status = 200, description = "Campaign cancelled", body = Campaign),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_campaign(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> NewsletterResult<Json<Campaign>> {
    let id = query
        .id
        .ok_or_else(|| NewsletterError::Validation("Campaign ID is required".into()))?;
    let campaign = state.campaigns.delete(id).await?;

    audit(
        &headers,
        Some(admin.id),
        "campaign.delete",
        format!("campaign:{}", campaign.id),
        json!({ "name": campaign.name }),
    );

    Ok(Json(campaign))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// List templates, or fetch one with `?id=`
#[utoipa::path(
    get,
    path = "/templates",
    tag = TAG,
    params(TemplateQuery),
    responses(
        (status = 200, description = "Templates, or the single template when `id` is given", body = Vec<Template>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_templates(
    State(state): State<NewsletterState>,
    Query(query): Query<TemplateQuery>,
) -> NewsletterResult<Response> {
    match query.id {
        Some(id) => Ok(Json(state.templates.get(id).await?).into_response()),
        None => Ok(Json(state.templates.list(query.include_deleted.unwrap_or(false)).await?).into_response()),
    }
}

/// Create a template
#[utoipa::path(
    post,
    path = "/templates",
    tag = TAG,
    request_body = CreateTemplate,
    responses(
        (status = 201, description = "Template created", body = Template),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_template(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateTemplate>,
) -> NewsletterResult<impl IntoResponse> {
    let template = state.templates.create(input).await?;

    audit(
        &headers,
        Some(admin.id),
        "template.create",
        format!("template:{}", template.id),
        json!({ "name": template.name, "category": template.category }),
    );

    Ok((StatusCode::CREATED, Json(template)))
}

/// Update a template
///
/// Default templates need `allowDefaultEdit: true`.
#[utoipa::path(
    put,
    path = "/templates",
    tag = TAG,
    request_body = UpdateTemplate,
    responses(
        (status = 200, description = "Template updated", body = Template),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_template(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<UpdateTemplate>,
) -> NewsletterResult<Json<Template>> {
    let default_override = input.allow_default_edit;
    let template = state.templates.update(input).await?;

    audit(
        &headers,
        Some(admin.id),
        "template.update",
        format!("template:{}", template.id),
        json!({ "isDefault": template.is_default, "allowDefaultEdit": default_override }),
    );

    Ok(Json(template))
}

/// Soft-delete a template
#[utoipa::path(
    delete,
    path = "/templates",
    tag = TAG,
    params(IdQuery),
    responses(
        (status = 200, description = "Template deleted", body = Template),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_template(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> NewsletterResult<Json<Template>> {
    let id = query
        .id
        .ok_or_else(|| NewsletterError::Validation("Template ID is required".into()))?;
    let template = state.templates.delete(id).await?;

    audit(
        &headers,
        Some(admin.id),
        "template.delete",
        format!("template:{}", template.id),
        json!({ "name": template.name }),
    );

    Ok(Json(template))
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// Send a campaign, or a single test copy with `sendTest: true`
///
/// A bulk send answers 200 even when individual deliveries failed; check
/// `sendResults.failed`.
#[utoipa::path(
    post,
    path = "/send",
    tag = TAG,
    request_body = SendRequest,
    responses(
        (status = 200, description = "Test or bulk send result", body = SendOutcome),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 502, response = BadGatewayResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn send_campaign(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SendRequest>,
) -> NewsletterResult<Json<SendOutcome>> {
    let campaign_id = request.campaign_id;
    let outcome = state.sender.send(&admin, request).await?;

    let details = match &outcome {
        SendOutcome::Test(result) => json!({ "test": true, "recipient": result.recipient }),
        SendOutcome::Bulk(result) => json!({
            "test": false,
            "recipients": result.recipient_count,
            "successful": result.send_results.successful,
            "failed": result.send_results.failed,
            "completed": result.completed,
        }),
    };
    audit(
        &headers,
        Some(admin.id),
        "campaign.send",
        format!("campaign:{}", campaign_id.map(|id| id.to_string()).unwrap_or_default()),
        details,
    );

    Ok(Json(outcome))
}

/// Delivery counters and status of a campaign
#[utoipa::path(
    get,
    path = "/send",
    tag = TAG,
    params(CampaignRef),
    responses(
        (status = 200, description = "Campaign counters", body = CampaignStats),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn campaign_stats(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<CampaignRef>,
) -> NewsletterResult<Json<CampaignStats>> {
    Ok(Json(state.sender.stats(&admin, query.campaign_id).await?))
}

/// Resume an interrupted bulk send from its last checkpoint
#[utoipa::path(
    post,
    path = "/send/resume",
    tag = TAG,
    request_body = CampaignRef,
    responses(
        (status = 200, description = "Send continued", body = BulkSendResponse),
        (status = 400, response = StateConflictResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn resume_send(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<CampaignRef>,
) -> NewsletterResult<Json<BulkSendResponse>> {
    let result = state.sender.resume(&admin, body.campaign_id).await?;

    audit(
        &headers,
        Some(admin.id),
        "campaign.resume",
        format!("campaign:{}", result.campaign_id),
        json!({
            "successful": result.send_results.successful,
            "failed": result.send_results.failed,
            "completed": result.completed,
        }),
    );

    Ok(Json(result))
}

/// Stop an in-flight send at its next batch boundary
#[utoipa::path(
    post,
    path = "/send/cancel",
    tag = TAG,
    request_body = CampaignRef,
    responses(
        (status = 200, description = "Whether a running send was signalled", body = CancelResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn cancel_send(
    State(state): State<NewsletterState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<CampaignRef>,
) -> NewsletterResult<Json<CancelResponse>> {
    let cancelled = state.sender.cancel(&admin, body.campaign_id)?;

    audit(
        &headers,
        Some(admin.id),
        "campaign.cancel_send",
        format!("campaign:{}", body.campaign_id.map(|id| id.to_string()).unwrap_or_default()),
        json!({ "cancelled": cancelled }),
    );

    Ok(Json(CancelResponse { cancelled }))
}
