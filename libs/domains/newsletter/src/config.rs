use core_config::{ConfigError, Environment, FromEnv, env_flag, env_optional, env_or_default, env_parse};

const DEV_UNSUBSCRIBE_SECRET: &str = "dev-only-unsubscribe-secret-change-me-0001";
const MIN_SECRET_LEN: usize = 32;

/// Settings for rendering, token signing and bulk dispatch.
#[derive(Clone, Debug)]
pub struct NewsletterConfig {
    /// Base of unsubscribe links, default for `{{websiteUrl}}`
    pub site_url: String,
    pub company_address: String,
    pub header_text: String,
    pub unsubscribe_secret: String,
    /// Keep verifying base64 tokens found in already-delivered mail
    pub accept_legacy_tokens: bool,
    pub batch_size: usize,
    pub concurrency: usize,
}

impl NewsletterConfig {
    fn resolve_secret(environment: Environment) -> Result<String, ConfigError> {
        match env_optional("UNSUBSCRIBE_SECRET") {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => Ok(secret),
            Some(_) => Err(ConfigError::parse(
                "UNSUBSCRIBE_SECRET",
                format!("must be at least {} characters", MIN_SECRET_LEN),
            )),
            None if environment.is_production() => {
                Err(ConfigError::MissingEnvVar("UNSUBSCRIBE_SECRET".to_string()))
            }
            None => {
                tracing::warn!("UNSUBSCRIBE_SECRET not set, using development secret");
                Ok(DEV_UNSUBSCRIBE_SECRET.to_string())
            }
        }
    }
}

impl FromEnv for NewsletterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let batch_size = env_parse("SEND_BATCH_SIZE", 50usize)?;
        if batch_size == 0 {
            return Err(ConfigError::parse("SEND_BATCH_SIZE", "must be greater than 0"));
        }
        let concurrency = env_parse("SEND_CONCURRENCY", 4usize)?;
        if concurrency == 0 {
            return Err(ConfigError::parse("SEND_CONCURRENCY", "must be greater than 0"));
        }

        Ok(Self {
            site_url: env_or_default("SITE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            company_address: env_or_default(
                "COMPANY_ADDRESS",
                "Pedal Works, 123 Fuzz Lane, Portland, OR",
            ),
            header_text: env_or_default("NEWSLETTER_HEADER_TEXT", "Newsletter"),
            unsubscribe_secret: Self::resolve_secret(environment)?,
            accept_legacy_tokens: env_flag("UNSUBSCRIBE_ACCEPT_LEGACY", true)?,
            batch_size,
            concurrency,
        })
    }
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".to_string(),
            company_address: "Pedal Works, 123 Fuzz Lane, Portland, OR".to_string(),
            header_text: "Newsletter".to_string(),
            unsubscribe_secret: DEV_UNSUBSCRIBE_SECRET.to_string(),
            accept_legacy_tokens: true,
            batch_size: 50,
            concurrency: 4,
        }
    }
}

/// MailerLite credentials. Without an API key the service runs against the
/// simulated transport.
#[derive(Clone, Debug)]
pub struct MailerLiteConfig {
    pub api_key: Option<String>,
    pub group_id: Option<String>,
    pub api_base: String,
    /// Transactional send endpoint (MailerSend, MailerLite's delivery API)
    pub send_url: String,
    pub from_email: String,
    pub from_name: String,
}

impl MailerLiteConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl FromEnv for MailerLiteConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_optional("MAILERLITE_API_KEY"),
            group_id: env_optional("MAILERLITE_GROUP_ID"),
            api_base: env_or_default("MAILERLITE_API_BASE", "https://connect.mailerlite.com/api")
                .trim_end_matches('/')
                .to_string(),
            send_url: env_or_default("MAILERLITE_SEND_URL", "https://api.mailersend.com/v1/email"),
            from_email: env_or_default("NEWSLETTER_FROM_EMAIL", "newsletter@pedalworks.example"),
            from_name: env_or_default("NEWSLETTER_FROM_NAME", "Pedal Works"),
        })
    }
}
