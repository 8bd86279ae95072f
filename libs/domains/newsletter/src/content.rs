//! Placeholder substitution for campaign bodies.
//!
//! A document is parsed once into literal runs and named slots. Merging
//! resolves every slot except `{{unsubscribeUrl}}`, which stays open until
//! [`MergedDocument::personalize`] is called for a specific recipient.
//!
//! Values are escaped according to where they land: plain text is HTML
//! escaped, URLs are attribute escaped, and the campaign body is inserted as
//! trusted HTML.

use crate::models::{Campaign, Template};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Subject,
    Content,
    HeaderText,
    WebsiteUrl,
    CompanyAddress,
    UnsubscribeUrl,
    /// Anything else between braces. Left in the output verbatim.
    Unknown(String),
}

impl Slot {
    fn from_name(name: &str) -> Self {
        match name {
            "subject" => Slot::Subject,
            "content" => Slot::Content,
            "headerText" => Slot::HeaderText,
            "websiteUrl" => Slot::WebsiteUrl,
            "companyAddress" => Slot::CompanyAddress,
            "unsubscribeUrl" => Slot::UnsubscribeUrl,
            other => Slot::Unknown(other.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            Slot::Subject => "subject",
            Slot::Content => "content",
            Slot::HeaderText => "headerText",
            Slot::WebsiteUrl => "websiteUrl",
            Slot::CompanyAddress => "companyAddress",
            Slot::UnsubscribeUrl => "unsubscribeUrl",
            Slot::Unknown(name) => name,
        }
    }

    fn verbatim(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A document split into literals and slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    segments: Vec<Segment>,
}

impl ParsedDocument {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                break;
            };
            let name = &after[..close];

            // "{{ a {{subject}}": the inner opener starts the slot
            if name.contains("{{") {
                literal.push_str(&rest[..open + 2]);
                rest = after;
                continue;
            }

            literal.push_str(&rest[..open]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Slot(Slot::from_name(name)));
            rest = &after[close + 2..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(slot) => Some(slot),
            Segment::Literal(_) => None,
        })
    }
}

/// Site-wide fallbacks for slots a template does not override.
#[derive(Debug, Clone)]
pub struct ContentDefaults {
    pub header_text: String,
    pub website_url: String,
    pub company_address: String,
}

impl From<&crate::config::NewsletterConfig> for ContentDefaults {
    fn from(config: &crate::config::NewsletterConfig) -> Self {
        Self {
            header_text: config.header_text.clone(),
            website_url: config.site_url.clone(),
            company_address: config.company_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MergedSegment {
    Html(String),
    UnsubscribeUrl,
}

/// Campaign body with everything resolved except the recipient's
/// unsubscribe link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    segments: Vec<MergedSegment>,
}

impl MergedDocument {
    fn build(parsed: ParsedDocument, mut resolve: impl FnMut(&Slot) -> Option<String>) -> Self {
        fn push_html(segments: &mut Vec<MergedSegment>, html: String) {
            if let Some(MergedSegment::Html(last)) = segments.last_mut() {
                last.push_str(&html);
            } else {
                segments.push(MergedSegment::Html(html));
            }
        }

        let mut segments: Vec<MergedSegment> = Vec::new();

        for segment in parsed.segments {
            match segment {
                Segment::Literal(text) => push_html(&mut segments, text),
                Segment::Slot(Slot::UnsubscribeUrl) => segments.push(MergedSegment::UnsubscribeUrl),
                Segment::Slot(slot) => {
                    let value = resolve(&slot).unwrap_or_else(|| slot.verbatim());
                    push_html(&mut segments, value);
                }
            }
        }

        Self { segments }
    }

    /// Fill in the recipient's unsubscribe link.
    pub fn personalize(&self, unsubscribe_url: &str) -> String {
        let url = html_escape::encode_double_quoted_attribute(unsubscribe_url);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                MergedSegment::Html(html) => out.push_str(html),
                MergedSegment::UnsubscribeUrl => out.push_str(&url),
            }
        }
        out
    }

    pub fn has_unsubscribe_link(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, MergedSegment::UnsubscribeUrl))
    }
}

fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

fn url(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

/// Merge a campaign into its template, or use its own content when it has
/// none.
///
/// Without a template the body is used as written: only `{{unsubscribeUrl}}`
/// is resolved, and a `{{content}}` reference to itself resolves to nothing.
pub fn merge(campaign: &Campaign, template: Option<&Template>, defaults: &ContentDefaults) -> MergedDocument {
    let Some(template) = template else {
        return MergedDocument::build(ParsedDocument::parse(&campaign.content), |slot| match slot {
            Slot::Content => Some(String::new()),
            _ => None,
        });
    };

    let variable = |key: &str, fallback: &str| -> String {
        template
            .variables
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    MergedDocument::build(ParsedDocument::parse(&template.html_content), |slot| match slot {
        Slot::Subject => Some(text(&campaign.subject)),
        Slot::Content => Some(campaign.content.clone()),
        Slot::HeaderText => Some(text(&variable("headerText", &defaults.header_text))),
        Slot::WebsiteUrl => Some(url(&variable("websiteUrl", &defaults.website_url))),
        Slot::CompanyAddress => Some(text(&variable("companyAddress", &defaults.company_address))),
        Slot::UnsubscribeUrl | Slot::Unknown(_) => None,
    })
}
