//! Mail service: turns domain events into rendered, delivered emails.

use crate::artifacts::ArtifactGenerator;
use crate::config::{MailSettings, MailTemplate};
use crate::error::NotificationError;
use crate::humanize::humanize_ttl;
use crate::models::{
    MailKind, Order, OrderCreatedNotification, TicketNotification, TokenNotification, format_price,
};
use crate::providers::{EmailContent, EmailProvider};
use crate::screenings::ScreeningLookup;
use crate::templates::ContentRenderer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{Context, ServiceError};
use tracing::{debug, info, instrument};

pub struct MailService {
    provider: Arc<dyn EmailProvider>,
    renderer: Arc<dyn ContentRenderer>,
    artifacts: Arc<dyn ArtifactGenerator>,
    screenings: Arc<dyn ScreeningLookup>,
    settings: MailSettings,
}

impl MailService {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        renderer: Arc<dyn ContentRenderer>,
        artifacts: Arc<dyn ArtifactGenerator>,
        screenings: Arc<dyn ScreeningLookup>,
        settings: MailSettings,
    ) -> Self {
        Self {
            provider,
            renderer,
            artifacts,
            screenings,
            settings,
        }
    }

    fn template(&self, kind: MailKind) -> Result<&MailTemplate, ServiceError> {
        self.settings
            .get(kind)
            .ok_or_else(|| ServiceError::internal(format!("no template configured for {kind}")))
    }

    /// Mail the tickets of a new order, with QR codes for the order and each ticket.
    #[instrument(skip(self, ctx, email, order), fields(order_id = %order.id, screening_id = order.screening_id))]
    pub async fn send_order_created(&self, ctx: &Context, email: &str, order: &Order) -> Result<(), ServiceError> {
        let mail = self.template(MailKind::OrderCreated)?;
        let screening = self.screenings.screening_info(ctx, order.screening_id).await?;

        let tickets = order
            .tickets
            .iter()
            .map(|ticket| {
                Ok(TicketNotification {
                    id: ticket.id.clone(),
                    id_qr: self.artifacts.generate(&ticket.id)?,
                    row: ticket.place.row,
                    seat: ticket.place.seat,
                    price: format_price(ticket.price),
                })
            })
            .collect::<Result<Vec<_>, NotificationError>>()?;

        let notification = OrderCreatedNotification {
            order_id: order.id.clone(),
            order_id_qr: self.artifacts.generate(&order.id)?,
            qr_mime_type: self.artifacts.mime_type().to_string(),
            screening,
            tickets,
        };

        self.deliver(ctx, email, mail, &notification).await
    }

    /// Mail a callback link together with how long it stays valid.
    #[instrument(skip(self, ctx, email, url), fields(kind = %kind))]
    pub async fn send_token(
        &self,
        ctx: &Context,
        email: &str,
        url: &str,
        kind: MailKind,
        ttl: Duration,
    ) -> Result<(), ServiceError> {
        let mail = self.template(kind)?;
        let notification = TokenNotification {
            url: url.to_string(),
            ttl: humanize_ttl(ttl),
        };

        self.deliver(ctx, email, mail, &notification).await
    }

    /// Render and send. A failed send is always returned to the caller.
    async fn deliver<T: Serialize>(
        &self,
        ctx: &Context,
        email: &str,
        mail: &MailTemplate,
        data: &T,
    ) -> Result<(), ServiceError> {
        let data = serde_json::to_value(data).map_err(NotificationError::from)?;
        let rendered = self.renderer.render(&mail.template, &data)?;

        // a send that already started is allowed to finish; a new one is not started
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let sent = self
            .provider
            .send(&EmailContent {
                to_email: email.to_string(),
                subject: mail.subject.clone(),
                html_body: rendered.html,
                text_body: rendered.text,
            })
            .await?;

        debug!(message_id = ?sent.message_id, "Provider accepted mail");
        info!(template = %mail.template, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artifacts::QrCodeGenerator;
    use crate::models::{Cinema, Coordinates, Place, Screening, Ticket};
    use crate::providers::{MockEmailProvider, SentEmail};
    use crate::screenings::MockScreeningLookup;
    use crate::templates::TemplateEngine;
    use chrono::{TimeZone, Utc};
    use stream_worker::ErrorKind;

    pub(crate) fn screening() -> Screening {
        Screening {
            start_time: "18:30".to_string(),
            start_date: "01.03".to_string(),
            movie_name: "Solaris".to_string(),
            movie_poster_url: "https://cdn.example/solaris.jpg".to_string(),
            cinema: Cinema {
                address: "Tverskaya 1".to_string(),
                name: "Oktyabr".to_string(),
                coordinates: Coordinates {
                    longitude: 37.6173,
                    latitude: 55.7558,
                },
            },
            hall_name: "Hall 2".to_string(),
        }
    }

    pub(crate) fn order() -> Order {
        Order {
            id: "O1".to_string(),
            tickets: vec![Ticket {
                id: "T1".to_string(),
                place: Place { row: 3, seat: 5 },
                price: 1050,
            }],
            screening_id: 42,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    pub(crate) fn accepted() -> SentEmail {
        SentEmail {
            message_id: Some("queued as 1".to_string()),
            accepted: true,
        }
    }

    pub(crate) fn mail_service(provider: MockEmailProvider, screenings: MockScreeningLookup) -> MailService {
        MailService::new(
            Arc::new(provider),
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(QrCodeGenerator::default()),
            Arc::new(screenings),
            MailSettings::new(),
        )
    }

    #[tokio::test]
    async fn test_order_created_mail() {
        let mut screenings = MockScreeningLookup::new();
        screenings
            .expect_screening_info()
            .withf(|_, id| *id == 42)
            .times(1)
            .returning(|_, _| Ok(screening()));

        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|email| {
                email.to_email == "a@b.com"
                    && email.subject == "Your tickets"
                    && email.html_body.contains("Ticket T1")
                    && email.html_body.contains("10.50")
                    && email.html_body.contains("Row 3, seat 5")
                    && email.html_body.contains("data:image/svg+xml;base64,")
                    && email.text_body.contains("price 10.50")
                    && email.text_body.contains("01.03 at 18:30")
            })
            .times(1)
            .returning(|_| Ok(accepted()));

        let service = mail_service(provider, screenings);
        service
            .send_order_created(&Context::background(), "a@b.com", &order())
            .await
            .unwrap();
    }

    /// Fixed-output generator standing in for a raster image format.
    struct PngArtifacts;

    impl ArtifactGenerator for PngArtifacts {
        fn mime_type(&self) -> &'static str {
            "image/png"
        }

        fn generate(&self, id: &str) -> crate::error::NotificationResult<String> {
            Ok(format!("png-{id}"))
        }
    }

    #[tokio::test]
    async fn test_images_use_generator_mime_type() {
        let mut screenings = MockScreeningLookup::new();
        screenings.expect_screening_info().returning(|_, _| Ok(screening()));
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|email| {
                email.html_body.contains("data:image/png;base64,png-O1")
                    && email.html_body.contains("data:image/png;base64,png-T1")
                    && !email.html_body.contains("image/svg+xml")
            })
            .times(1)
            .returning(|_| Ok(accepted()));

        let service = MailService::new(
            Arc::new(provider),
            Arc::new(TemplateEngine::new().unwrap()),
            Arc::new(PngArtifacts),
            Arc::new(screenings),
            MailSettings::new(),
        );
        service
            .send_order_created(&Context::background(), "a@b.com", &order())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_screening_not_found_sends_nothing() {
        let mut screenings = MockScreeningLookup::new();
        screenings
            .expect_screening_info()
            .returning(|_, _| Err(ServiceError::not_found("hall not found")));
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let err = mail_service(provider, screenings)
            .send_order_created(&Context::background(), "a@b.com", &order())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_send_failure_is_propagated() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .times(1)
            .returning(|_| Err(NotificationError::ProviderError("SMTP send failed".to_string())));

        let err = mail_service(provider, MockScreeningLookup::new())
            .send_token(
                &Context::background(),
                "a@b.com",
                "https://cinema.example/verify/abc",
                MailKind::EmailVerification,
                Duration::from_secs(300),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_token_mail() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|email| {
                email.subject == "Password change"
                    && email.text_body.contains("https://cinema.example/password/abc")
                    && email.text_body.contains("expires in 5 minutes")
            })
            .times(1)
            .returning(|_| Ok(accepted()));

        mail_service(provider, MockScreeningLookup::new())
            .send_token(
                &Context::background(),
                "a@b.com",
                "https://cinema.example/password/abc",
                MailKind::ChangingPassword,
                Duration::from_secs(300),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_done_context_starts_no_send() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let ctx = Context::background();
        ctx.cancel();
        let err = mail_service(provider, MockScreeningLookup::new())
            .send_token(&ctx, "a@b.com", "u", MailKind::EmailVerification, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Canceled);
    }
}
