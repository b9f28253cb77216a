//! Outbound email through a transactional email HTTP API.
//!
//! The provider takes a JSON body `{from, to, subject, html}` with a bearer
//! key. Sending is behind [`EmailSender`] so handlers and tests do not care
//! which provider, if any, is configured.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::EmailConfig;
use crate::error::AppError;
use crate::models::Feedback;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Request body expected by the provider.
#[derive(Serialize)]
struct ProviderPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[rocket::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}

pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[rocket::async_trait]
impl EmailSender for HttpEmailSender {
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        let payload = ProviderPayload {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
        };

        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Email provider returned {}: {}",
                status, text
            )));
        }

        info!(recipients = message.to.len(), "Email sent");
        Ok(())
    }
}

/// Used when no provider key is configured; every send fails.
pub struct DisabledEmailSender;

#[rocket::async_trait]
impl EmailSender for DisabledEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        warn!(subject = %message.subject, "Email requested but no provider is configured");
        Err(AppError::ExternalService(
            "Email service is not configured".to_string(),
        ))
    }
}

pub fn sender_from_config(config: Option<&EmailConfig>) -> Arc<dyn EmailSender> {
    match config {
        Some(config) => Arc::new(HttpEmailSender::new(config.clone())),
        None => Arc::new(DisabledEmailSender),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn paragraphs(text: &str) -> String {
    escape_html(text.trim()).replace('\n', "<br>")
}

/// Reply to a feedback submission, quoting the original message.
pub fn feedback_reply_email(feedback: &Feedback, reply: &str) -> EmailMessage {
    let html = format!(
        "<div style=\"font-family: sans-serif; line-height: 1.5\">\
         <p>Hi {name},</p>\
         <p>Thank you for your feedback. Here is our response:</p>\
         <p>{reply}</p>\
         <hr>\
         <p style=\"color: #666\">Your original message:</p>\
         <blockquote style=\"color: #666\">{original}</blockquote>\
         <p>The Fitness Hub team</p>\
         </div>",
        name = escape_html(feedback.full_name.trim()),
        reply = paragraphs(reply),
        original = paragraphs(&feedback.content),
    );

    EmailMessage {
        to: vec![feedback.email.clone()],
        subject: "Re: Your feedback to Fitness Hub".to_string(),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feedback() -> Feedback {
        Feedback {
            id: 1,
            user_id: None,
            full_name: "Sam <Lifter>".to_string(),
            email: "sam@example.com".to_string(),
            content: "Love the plans.\nMore yoga please!".to_string(),
            rating: Some(5),
            created_at: Utc::now(),
            replied_at: None,
        }
    }

    #[test]
    fn reply_is_addressed_to_submitter() {
        let email = feedback_reply_email(&feedback(), "Yoga is coming soon.");

        assert_eq!(email.to, vec!["sam@example.com".to_string()]);
        assert!(email.subject.starts_with("Re:"));
        assert!(email.html.contains("Yoga is coming soon."));
        assert!(email.html.contains("Love the plans.<br>More yoga please!"));
    }

    #[test]
    fn user_text_is_escaped() {
        let email = feedback_reply_email(&feedback(), "<script>x</script>");

        assert!(email.html.contains("Sam &lt;Lifter&gt;"));
        assert!(!email.html.contains("<script>"));
    }

    #[tokio::test]
    async fn disabled_sender_refuses() {
        let email = feedback_reply_email(&feedback(), "Thanks");
        let err = DisabledEmailSender.send(&email).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[test]
    fn payload_matches_provider_shape() {
        let email = feedback_reply_email(&feedback(), "Thanks");
        let payload = ProviderPayload {
            from: "hello@example.com",
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["from"], "hello@example.com");
        assert_eq!(json["to"][0], "sam@example.com");
        assert!(json["html"].as_str().unwrap().contains("Thanks"));
    }
}
