use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{NewsletterError, NewsletterResult};
use crate::models::{CreateTemplate, Template, UpdateTemplate};
use crate::repository::TemplateRepository;

const CLASSIC_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{subject}}</title>
</head>
<body style="margin:0;padding:0;background:#f4f4f4;font-family:Arial,sans-serif;">
  <table width="100%" cellpadding="0" cellspacing="0">
    <tr>
      <td align="center">
        <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;">
          <tr>
            <td style="background:#1a1a1a;color:#ffffff;padding:24px;text-align:center;">
              <h1 style="margin:0;">{{headerText}}</h1>
            </td>
          </tr>
          <tr>
            <td style="padding:32px;color:#333333;line-height:1.6;">{{content}}</td>
          </tr>
          <tr>
            <td style="padding:24px;font-size:12px;color:#888888;text-align:center;">
              <p><a href="{{websiteUrl}}">Visit our website</a></p>
              <p>{{companyAddress}}</p>
              <p><a href="{{unsubscribeUrl}}">Unsubscribe</a></p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const ANNOUNCEMENT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{{subject}}</title>
</head>
<body style="margin:0;padding:0;background:#ffffff;font-family:Helvetica,Arial,sans-serif;">
  <div style="max-width:600px;margin:0 auto;">
    <div style="padding:32px 24px;text-align:center;border-bottom:4px solid #e4572e;">
      <p style="margin:0;text-transform:uppercase;letter-spacing:2px;color:#e4572e;">{{headerText}}</p>
      <h1 style="margin:8px 0 0;">{{subject}}</h1>
    </div>
    <div style="padding:32px 24px;line-height:1.6;">{{content}}</div>
    <div style="padding:24px;text-align:center;">
      <a href="{{websiteUrl}}" style="background:#e4572e;color:#ffffff;padding:12px 24px;text-decoration:none;">Shop now</a>
    </div>
    <div style="padding:24px;font-size:12px;color:#888888;text-align:center;">
      <p>{{companyAddress}}</p>
      <p><a href="{{unsubscribeUrl}}">Unsubscribe</a></p>
    </div>
  </div>
</body>
</html>"#;

fn default_templates() -> Vec<Template> {
    let now = Utc::now();
    let build = |name: &str, description: &str, category: &str, html: &str, header: &str| Template {
        id: Uuid::now_v7(),
        name: name.to_string(),
        description: Some(description.to_string()),
        html_content: html.to_string(),
        category: category.to_string(),
        variables: BTreeMap::from([("headerText".to_string(), header.to_string())]),
        is_default: true,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };

    vec![
        build(
            "Classic Newsletter",
            "Header, body and footer with unsubscribe link",
            "newsletter",
            CLASSIC_HTML,
            "Newsletter",
        ),
        build(
            "Product Announcement",
            "Launch layout with a call to action",
            "announcement",
            ANNOUNCEMENT_HTML,
            "New Release",
        ),
    ]
}

#[derive(Clone)]
pub struct TemplateService {
    templates: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(templates: Arc<dyn TemplateRepository>) -> Self {
        Self { templates }
    }

    /// Insert the built-in templates that are missing. Matching is by name,
    /// so running it on every start is safe.
    pub async fn seed_defaults(&self) -> NewsletterResult<usize> {
        let mut inserted = 0;
        for template in default_templates() {
            if self.templates.find_by_name(&template.name).await?.is_none() {
                tracing::info!(name = %template.name, "Seeding default template");
                self.templates.insert(template).await?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub async fn list(&self, include_deleted: bool) -> NewsletterResult<Vec<Template>> {
        self.templates.list(include_deleted).await
    }

    pub async fn get(&self, id: Uuid) -> NewsletterResult<Template> {
        self.templates
            .get_by_id(id)
            .await?
            .ok_or_else(|| NewsletterError::not_found("Template", id))
    }

    pub async fn create(&self, input: CreateTemplate) -> NewsletterResult<Template> {
        if input.name.trim().is_empty()
            || input.html_content.trim().is_empty()
            || input.category.trim().is_empty()
        {
            return Err(NewsletterError::Validation(
                "Name, HTML content, and category are required".into(),
            ));
        }

        let template = self.templates.insert(Template::new(input)).await?;
        tracing::info!(template_id = %template.id, "Created template");
        Ok(template)
    }

    pub async fn update(&self, input: UpdateTemplate) -> NewsletterResult<Template> {
        let mut template = self.get(input.id).await?;

        if template.is_default && !input.allow_default_edit {
            return Err(NewsletterError::StateConflict(
                "Cannot modify default templates".into(),
            ));
        }
        if input.name.as_deref().is_some_and(|n| n.trim().is_empty())
            || input.html_content.as_deref().is_some_and(|h| h.trim().is_empty())
        {
            return Err(NewsletterError::Validation(
                "Name and HTML content cannot be empty".into(),
            ));
        }

        template.apply_update(input);
        let template = self.templates.update(template).await?;
        tracing::info!(template_id = %template.id, "Updated template");
        Ok(template)
    }

    /// Soft delete. The row stays, renamed, so campaigns bound to it still
    /// render.
    pub async fn delete(&self, id: Uuid) -> NewsletterResult<Template> {
        let mut template = self.get(id).await?;

        if template.is_default {
            return Err(NewsletterError::StateConflict(
                "Cannot delete default templates".into(),
            ));
        }
        if template.is_deleted() {
            return Ok(template);
        }

        template.mark_deleted();
        let template = self.templates.update(template).await?;
        tracing::info!(template_id = %id, "Soft-deleted template");
        Ok(template)
    }
}
