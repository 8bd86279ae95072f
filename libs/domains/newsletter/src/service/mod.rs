pub mod campaigns;
pub mod sender;
pub mod subscribers;
pub mod templates;

pub use campaigns::CampaignService;
pub use sender::{CampaignSender, SendControl, SendSettings};
pub use subscribers::SubscriberService;
pub use templates::TemplateService;
