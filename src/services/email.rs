use lettre::{
    Message, SmtpTransport, Transport,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
};
use log::{info, error, warn};

pub struct EmailService;

impl EmailService {
    pub async fn send_welcome_email(email: &str, name: &str) -> bool {
        let display_name = if name.is_empty() { "there" } else { name };
        let body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h1>Welcome to UrbanNest! 🏠</h1>
                <p>Hi {},</p>
                <p>Your account is ready and comes with <strong>1 free listing credit</strong>.</p>
                <p>With UrbanNest, you can:</p>
                <ul>
                    <li>List properties for sale or rent</li>
                    <li>Browse verified listings across the city</li>
                    <li>Get featured placement with a verification plan</li>
                </ul>
                <p>Best regards,<br><strong>UrbanNest Team</strong></p>
            </body>
            </html>
            "#,
            display_name
        );

        match Self::try_send(email, "Welcome to UrbanNest! 🏠", body).await {
            Ok(_) => {
                info!("Welcome email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send welcome email to {}: {}", email, e);
                false
            }
        }
    }

    pub async fn send_listing_submitted(email: &str, title: &str) -> bool {
        let body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h2>Listing received</h2>
                <p>Your listing <strong>{}</strong> has been submitted and is pending review.</p>
                <p>We'll email you as soon as it goes live.</p>
                <p>Best regards,<br><strong>UrbanNest Team</strong></p>
            </body>
            </html>
            "#,
            title
        );

        match Self::try_send(email, "Your listing is under review", body).await {
            Ok(_) => {
                info!("Submission email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send submission email to {}: {}", email, e);
                false
            }
        }
    }

    pub async fn send_listing_approved(email: &str, title: &str, listing_url: &str) -> bool {
        let body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h2>Your listing is live 🎉</h2>
                <p><strong>{}</strong> has been approved and is now visible to buyers.</p>
                <p><a href="{}">View your listing</a></p>
                <p>Best regards,<br><strong>UrbanNest Team</strong></p>
            </body>
            </html>
            "#,
            title, listing_url
        );

        match Self::try_send(email, "Your listing is live 🎉", body).await {
            Ok(_) => {
                info!("Approval email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send approval email to {}: {}", email, e);
                false
            }
        }
    }

    pub async fn send_listing_rejected(email: &str, title: &str, reason: &str) -> bool {
        let body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h2>Listing not approved</h2>
                <p>Unfortunately <strong>{}</strong> did not pass review.</p>
                <p>Reason: {}</p>
                <p>You can edit the listing and it will be reviewed again.</p>
                <p>Best regards,<br><strong>UrbanNest Team</strong></p>
            </body>
            </html>
            "#,
            title, reason
        );

        match Self::try_send(email, "Your listing needs changes", body).await {
            Ok(_) => {
                info!("Rejection email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send rejection email to {}: {}", email, e);
                false
            }
        }
    }

    pub async fn send_payment_receipt(email: &str, description: &str, amount: f64) -> bool {
        let body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h2>Payment received</h2>
                <p>Thanks! We've received your payment.</p>
                <p><strong>{}</strong> — ₹{:.2}</p>
                <p>Best regards,<br><strong>UrbanNest Team</strong></p>
            </body>
            </html>
            "#,
            description, amount
        );

        match Self::try_send(email, "Payment confirmation", body).await {
            Ok(_) => {
                info!("Receipt email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send receipt email to {}: {}", email, e);
                false
            }
        }
    }

    async fn try_send(
        email: &str,
        subject: &str,
        html_body: String,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mail_user = crate::config::Config::mail_user();
        let mail_password = crate::config::Config::mail_password();

        if mail_user.is_empty() || mail_password.is_empty() {
            warn!("Email credentials not configured. Skipping email send.");
            return Err("Email not configured".into());
        }

        let from_mailbox: Mailbox = crate::config::Config::mail_from().parse()?;
        let to_mailbox: Mailbox = email.parse()?;

        let email_message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)?;

        let creds = Credentials::new(mail_user, mail_password);
        let mailer = SmtpTransport::relay(&crate::config::Config::mail_host())?
            .credentials(creds)
            .build();

        mailer.send(&email_message)?;
        Ok(())
    }
}
