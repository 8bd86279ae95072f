use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "newsletter_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub html_content: String,
    pub category: String,
    pub variables: Json,
    pub is_default: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Template {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            html_content: model.html_content,
            category: model.category,
            // Non-string values are dropped rather than failing the whole row
            variables: serde_json::from_value(model.variables).unwrap_or_default(),
            is_default: model.is_default,
            deleted_at: model.deleted_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Template> for ActiveModel {
    fn from(template: crate::models::Template) -> Self {
        let variables = serde_json::Value::Object(
            template
                .variables
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        );

        Self {
            id: Set(template.id),
            name: Set(template.name),
            description: Set(template.description),
            html_content: Set(template.html_content),
            category: Set(template.category),
            variables: Set(variables),
            is_default: Set(template.is_default),
            deleted_at: Set(template.deleted_at.map(Into::into)),
            created_at: Set(template.created_at.into()),
            updated_at: Set(template.updated_at.into()),
        }
    }
}
