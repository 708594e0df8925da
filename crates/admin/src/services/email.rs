//! Restock email delivery over SMTP.
//!
//! Recipients are BCC'd in batches of [`BCC_BATCH_SIZE`] so customers never
//! see each other's addresses; each batch is one message addressed to the
//! sender.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::{
        smtp::{Error as SmtpError, authentication::Credentials},
        stub::{AsyncStubTransport, Error as StubError},
    },
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::Email;

use crate::config::EmailConfig;
use crate::scraper::html::escape_text;

/// Maximum BCC recipients per message.
pub const BCC_BATCH_SIZE: usize = 50;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Stub transport configured to reject.
    #[error("Stub transport error: {0}")]
    Stub(#[from] StubError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// What a restock email announces.
#[derive(Debug, Clone)]
pub struct RestockProduct<'a> {
    pub title: &'a str,
    /// Storefront URL, when the product is published.
    pub url: Option<&'a str>,
}

/// Email service for customer notifications.
#[derive(Clone)]
pub struct EmailService {
    mailer: Mailer,
    from_address: String,
}

#[derive(Clone)]
enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Accepts or rejects every message without delivering it.
    Stub(AsyncStubTransport),
}

impl Mailer {
    async fn send(&self, message: Message) -> Result<(), EmailError> {
        match self {
            Self::Smtp(mailer) => {
                mailer.send(message).await?;
            }
            Self::Stub(mailer) => mailer.send(message).await?,
        }
        Ok(())
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Mailer::Smtp(mailer),
            from_address: config.from_address.clone(),
        })
    }

    /// An email service that accepts every message and delivers nothing.
    #[must_use]
    pub fn stub(from_address: &str) -> Self {
        Self {
            mailer: Mailer::Stub(AsyncStubTransport::new_ok()),
            from_address: from_address.to_string(),
        }
    }

    /// An email service whose every send fails.
    #[must_use]
    pub fn rejecting_stub(from_address: &str) -> Self {
        Self {
            mailer: Mailer::Stub(AsyncStubTransport::new_error()),
            from_address: from_address.to_string(),
        }
    }

    /// Send the restock announcement to every recipient, one message per
    /// batch. Returns the number of recipients emailed.
    ///
    /// Stops at the first failed batch; earlier batches stay sent.
    ///
    /// # Errors
    ///
    /// Returns error if a message cannot be built or sent.
    #[instrument(skip(self, recipients), fields(product = %product.title, recipients = recipients.len()))]
    pub async fn send_restock_batch(
        &self,
        recipients: &[Email],
        product: &RestockProduct<'_>,
    ) -> Result<usize, EmailError> {
        let mut sent = 0;
        for batch in recipient_batches(recipients) {
            let message = build_restock_message(&self.from_address, batch, product)?;
            self.mailer.send(message).await?;
            sent += batch.len();
        }

        tracing::info!(sent, "Restock email sent");
        Ok(sent)
    }
}

/// Split recipients into BCC batches.
pub fn recipient_batches(recipients: &[Email]) -> std::slice::Chunks<'_, Email> {
    recipients.chunks(BCC_BATCH_SIZE)
}

/// Build one restock message addressed to the sender with `batch` in BCC.
///
/// # Errors
///
/// Returns error if an address does not parse or the message cannot be built.
pub fn build_restock_message(
    from_address: &str,
    batch: &[Email],
    product: &RestockProduct<'_>,
) -> Result<Message, EmailError> {
    let from: Mailbox = from_address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(from_address.to_string()))?;

    let mut builder = Message::builder()
        .from(from.clone())
        .to(from)
        .subject(format!("{} is back in stock", product.title));
    for recipient in batch {
        let mailbox: Mailbox = recipient
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(recipient.to_string()))?;
        builder = builder.bcc(mailbox);
    }

    let (text_body, html_body) = restock_bodies(product);

    Ok(builder.multipart(
        MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text_body),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html_body),
            ),
    )?)
}

/// Plain text and HTML bodies for a restock announcement.
fn restock_bodies(product: &RestockProduct<'_>) -> (String, String) {
    let title = product.title;
    let safe_title = escape_text(title);

    let (text_link, html_link) = product.url.map_or_else(
        || (String::new(), String::new()),
        |url| {
            (
                format!("\n\nShop now: {url}"),
                format!(r#"<p><a href="{}">Shop now</a></p>"#, escape_text(url)),
            )
        },
    );

    let text = format!(
        "Good news! {title} matches your wishlist and is back in stock.{text_link}\n\n\
         You are receiving this because you saved a wishlist keyword."
    );
    let html = format!(
        "<p>Good news! <strong>{safe_title}</strong> matches your wishlist and is back in stock.</p>\
         {html_link}\
         <p><small>You are receiving this because you saved a wishlist keyword.</small></p>"
    );

    (text, html)
}
