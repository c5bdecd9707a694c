//! # Skybell Mail
//!
//! Email delivery and body templating for Skybell notifications.
//!
//! ## Features
//!
//! - **`EmailSender`**: one-call delivery of an HTML message
//! - **SMTP**: `SmtpSender` over lettre with STARTTLS, implicit TLS or plain
//! - **Templates**: `TemplateRenderer` with a strict Handlebars implementation
//!   and built-in confirmation and weather update templates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skybell_mail::*;
//! use serde_json::json;
//!
//! let sender = SmtpSender::new(
//!     SmtpConfig::new("smtp.example.com", "Skybell <weather@example.com>")
//!         .credentials("user", "password"),
//! )?;
//! let renderer = HandlebarsRenderer::with_builtin_templates()?;
//!
//! let body = renderer.render(WEATHER_UPDATE_TEMPLATE, &json!({
//!     "city": "Kyiv",
//!     "temperature": 21.0,
//!     "humidity": 40,
//!     "description": "Sunny",
//!     "unsubscribe_url": "https://example.com/unsubscribe/abc",
//! }))?;
//! sender.send_message("alice@example.com", "Weather update", &body).await?;
//! ```

mod error;
mod sender;
mod smtp;
mod template;

pub use error::{MailError, Result};
pub use sender::{EmailSender, MemorySender, SentMessage};
pub use smtp::{SmtpConfig, SmtpSecurity, SmtpSender};
pub use template::{
    CONFIRMATION_TEMPLATE, HandlebarsRenderer, TemplateRenderer, WEATHER_UPDATE_TEMPLATE,
};
