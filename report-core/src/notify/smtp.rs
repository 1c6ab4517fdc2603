use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info};

use crate::{error::NotifyError, model::EmailMessage, provider::sanitize_text};

use super::{Notifier, validate_recipient};

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sends plain-text mail from a fixed sender over any lettre transport.
pub struct MailNotifier<T> {
    from: Mailbox,
    transport: T,
}

/// STARTTLS relay with login. Built without connection pooling, so every
/// send opens a session and quits it when done.
pub type SmtpNotifier = MailNotifier<AsyncSmtpTransport<Tokio1Executor>>;

impl<T> std::fmt::Debug for MailNotifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailNotifier").field("from", &self.from.to_string()).finish()
    }
}

impl SmtpNotifier {
    pub fn relay(settings: &SmtpSettings, from: &str) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Connection(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(settings.user.clone(), settings.password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Self::new(from, transport)
    }
}

impl<T> MailNotifier<T> {
    pub fn new(from: &str, transport: T) -> Result<Self, NotifyError> {
        let from = Mailbox::new(None, validate_recipient(from)?);
        Ok(Self { from, transport })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build_message(&self, message: &EmailMessage, to: Address) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to))
            .subject(sanitize_text(&message.subject))
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.replace('\r', "").trim().to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

#[async_trait]
impl<T> Notifier for MailNotifier<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: Into<NotifyError>,
{
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let to = validate_recipient(&message.recipient).inspect_err(|e| {
            error!("Refusing to send report: {}", e);
        })?;
        let email = self.build_message(message, to)?;

        self.transport.send(email).await.map_err(|e| {
            let err: NotifyError = e.into();
            error!("Sending report to {} failed: {}", message.recipient, err);
            err
        })?;

        info!("Report email successfully sent to {}", message.recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettre::transport::stub::AsyncStubTransport;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
    };

    fn message(recipient: &str) -> EmailMessage {
        EmailMessage {
            recipient: recipient.into(),
            subject: "Ankara Daily Weather Report".into(),
            body: "WEATHER REPORT (Daily)\r\nCondition: clear sky\r\n".into(),
        }
    }

    #[tokio::test]
    async fn sends_one_message_with_envelope() {
        let notifier =
            MailNotifier::new("reports@example.com", AsyncStubTransport::new_ok()).unwrap();

        notifier.send(&message("test@example.com")).await.unwrap();

        let sent = notifier.transport().messages().await;
        assert_eq!(sent.len(), 1);

        let (envelope, raw) = &sent[0];
        assert_eq!(
            envelope.from().map(|a| a.to_string()),
            Some("reports@example.com".to_string())
        );
        let to: Vec<String> = envelope.to().iter().map(|a| a.to_string()).collect();
        assert_eq!(to, vec!["test@example.com".to_string()]);
        assert!(raw.contains("Subject: Ankara Daily Weather Report"), "{raw}");
        assert!(raw.contains("text/plain"), "{raw}");
        assert!(raw.contains("Condition: clear sky"), "{raw}");
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_transport() {
        let notifier =
            MailNotifier::new("reports@example.com", AsyncStubTransport::new_ok()).unwrap();

        let err = notifier.send(&message("not-an-address")).await.unwrap_err();

        assert!(matches!(err, NotifyError::InvalidRecipient { .. }));
        assert!(notifier.transport().messages().await.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_delivery_error() {
        let notifier =
            MailNotifier::new("reports@example.com", AsyncStubTransport::new_error()).unwrap();

        let err = notifier.send(&message("test@example.com")).await.unwrap_err();
        assert!(err.is_delivery(), "{err:?}");
    }

    #[tokio::test]
    async fn subject_line_breaks_are_flattened() {
        let notifier =
            MailNotifier::new("reports@example.com", AsyncStubTransport::new_ok()).unwrap();
        let mut msg = message("test@example.com");
        msg.subject = "Ankara\r\nBcc: evil@example.com".into();

        notifier.send(&msg).await.unwrap();

        let sent = notifier.transport().messages().await;
        let (envelope, raw) = &sent[0];
        assert_eq!(envelope.to().len(), 1);
        assert!(!raw.contains("\r\nBcc:"), "{raw}");
    }

    #[derive(Clone, Copy)]
    enum RelayScript {
        RejectAuth,
        RejectRecipient,
    }

    /// Minimal plaintext SMTP peer for one session.
    async fn fake_relay(script: RelayScript) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            write.write_all(b"220 relay.test ESMTP\r\n").await.unwrap();

            while let Ok(Some(line)) = lines.next_line().await {
                let command = line.to_ascii_uppercase();
                let reply = if command.starts_with("EHLO") {
                    match script {
                        RelayScript::RejectAuth => "250-relay.test\r\n250 AUTH PLAIN LOGIN\r\n",
                        RelayScript::RejectRecipient => "250 relay.test\r\n",
                    }
                } else if command.starts_with("AUTH") {
                    "535 5.7.8 Authentication credentials invalid\r\n"
                } else if command.starts_with("MAIL FROM") {
                    "250 2.1.0 OK\r\n"
                } else if command.starts_with("RCPT TO") {
                    "550 5.1.1 Mailbox unavailable\r\n"
                } else if command.starts_with("QUIT") {
                    let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
                    break;
                } else {
                    "250 OK\r\n"
                };
                if write.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        port
    }

    fn plaintext_notifier(port: u16, with_login: bool) -> SmtpNotifier {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("127.0.0.1").port(port);
        if with_login {
            builder = builder.credentials(Credentials::new("user".into(), "wrong".into()));
        }
        MailNotifier::new("reports@example.com", builder.build()).unwrap()
    }

    #[tokio::test]
    async fn relay_auth_rejection_is_authentication_error() {
        let port = fake_relay(RelayScript::RejectAuth).await;
        let notifier = plaintext_notifier(port, true);

        let err = notifier.send(&message("test@example.com")).await.unwrap_err();

        assert!(matches!(err, NotifyError::Authentication(ref m) if m.contains("535")), "{err:?}");
        assert!(err.is_delivery());
    }

    #[tokio::test]
    async fn relay_recipient_rejection_is_rejected_error() {
        let port = fake_relay(RelayScript::RejectRecipient).await;
        let notifier = plaintext_notifier(port, false);

        let err = notifier.send(&message("test@example.com")).await.unwrap_err();

        assert!(matches!(err, NotifyError::Rejected(ref m) if m.contains("550")), "{err:?}");
    }

    #[tokio::test]
    async fn closed_relay_port_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let notifier = plaintext_notifier(port, false);

        let err = notifier.send(&message("test@example.com")).await.unwrap_err();

        assert!(matches!(err, NotifyError::Connection(_)), "{err:?}");
    }

    #[test]
    fn relay_rejects_invalid_sender() {
        let settings = SmtpSettings {
            host: "smtp.example.com".into(),
            port: 587,
            user: "user".into(),
            password: "secret".into(),
        };
        assert!(SmtpNotifier::relay(&settings, "not an address").is_err());
        assert!(!format!("{settings:?}").contains("secret"));
    }
}
