use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, env_optional, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_newsletter::{MailerLiteConfig, NewsletterConfig};

pub use core_config::Environment;

/// Everything the API reads from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    /// `None` when `DATABASE_URL` is unset; the service then keeps its data
    /// in memory
    pub database: Option<PostgresConfig>,
    pub server: ServerConfig,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub newsletter: NewsletterConfig,
    pub mailerlite: MailerLiteConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();

        let database = match env_optional("DATABASE_URL") {
            Some(_) => Some(PostgresConfig::from_env()?),
            None if environment.is_production() => {
                return Err(eyre::eyre!("DATABASE_URL is required in production"));
            }
            None => None,
        };

        Ok(Self {
            app: app_info!(),
            database,
            server: ServerConfig::from_env()?,
            environment,
            jwt: JwtConfig::from_env()?,
            newsletter: NewsletterConfig::from_env()?,
            mailerlite: MailerLiteConfig::from_env()?,
        })
    }
}
