use super::{CONFIRMATION_SUBJECT, WEATHER_UPDATE_SUBJECT, confirm_link, update_context};
use crate::domain::{Subscription, WeatherUpdate};
use crate::events::{AppEvent, AppPublisher, PayloadHandler, register_handler};
use async_trait::async_trait;
use serde_json::json;
use skybell_events::{Envelope, HandlerError};
use skybell_mail::{CONFIRMATION_TEMPLATE, EmailSender, TemplateRenderer, WEATHER_UPDATE_TEMPLATE};
use std::sync::Arc;
use tracing::debug;

/// Sends the confirmation link for a new subscription.
pub struct ConfirmationEmailHandler {
    sender: Arc<dyn EmailSender>,
    renderer: Arc<dyn TemplateRenderer>,
    base_url: String,
}

impl ConfirmationEmailHandler {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        renderer: Arc<dyn TemplateRenderer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            renderer,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PayloadHandler<Subscription> for ConfirmationEmailHandler {
    async fn handle(
        &self,
        subscription: &Subscription,
        _envelope: &Envelope<AppEvent>,
    ) -> Result<(), HandlerError> {
        let body = self
            .renderer
            .render(
                CONFIRMATION_TEMPLATE,
                &json!({
                    "city": subscription.city,
                    "frequency": subscription.frequency.label().to_lowercase(),
                    "confirm_url": confirm_link(&self.base_url, &subscription.confirmation_token),
                }),
            )
            .map_err(HandlerError::failed)?;

        self.sender
            .send_message(&subscription.email, CONFIRMATION_SUBJECT, &body)
            .await
            .map_err(HandlerError::failed)?;

        debug!(email = %subscription.email, "Sent confirmation email");
        Ok(())
    }

    fn name(&self) -> &str {
        "confirmation_email"
    }
}

/// Sends one weather update email per event.
pub struct WeatherUpdateHandler {
    sender: Arc<dyn EmailSender>,
    renderer: Arc<dyn TemplateRenderer>,
    base_url: String,
}

impl WeatherUpdateHandler {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        renderer: Arc<dyn TemplateRenderer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            renderer,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PayloadHandler<WeatherUpdate> for WeatherUpdateHandler {
    async fn handle(
        &self,
        update: &WeatherUpdate,
        _envelope: &Envelope<AppEvent>,
    ) -> Result<(), HandlerError> {
        let body = self
            .renderer
            .render(WEATHER_UPDATE_TEMPLATE, &update_context(update, &self.base_url))
            .map_err(HandlerError::failed)?;

        self.sender
            .send_message(&update.email, WEATHER_UPDATE_SUBJECT, &body)
            .await
            .map_err(HandlerError::failed)?;

        debug!(email = %update.email, city = %update.city, "Sent weather update");
        Ok(())
    }

    fn name(&self) -> &str {
        "weather_update_email"
    }
}

/// Register both notification handlers on `publisher`.
pub fn register_notification_handlers(
    publisher: &AppPublisher,
    sender: Arc<dyn EmailSender>,
    renderer: Arc<dyn TemplateRenderer>,
    base_url: &str,
) {
    register_handler::<Subscription, _>(
        publisher,
        ConfirmationEmailHandler::new(sender.clone(), renderer.clone(), base_url),
    );
    register_handler::<WeatherUpdate, _>(
        publisher,
        WeatherUpdateHandler::new(sender, renderer, base_url),
    );
}
