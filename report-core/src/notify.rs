use async_trait::async_trait;
use lettre::Address;
use std::fmt::Debug;

use crate::{error::NotifyError, model::EmailMessage};

pub mod smtp;

pub use smtp::{MailNotifier, SmtpNotifier, SmtpSettings};

/// Delivers one message per call. No retries.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Check an address is `local@domain.tld` and safe to put in a header.
///
/// The local part allows `[A-Za-z0-9_.+-]`, domain labels `[A-Za-z0-9-]`, and
/// the domain needs at least one dot. The result must also parse as a
/// [`lettre::Address`].
pub fn validate_recipient(address: &str) -> Result<Address, NotifyError> {
    let invalid = |reason: &str| NotifyError::InvalidRecipient {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if address.contains(['\n', '\r']) {
        return Err(invalid("line breaks are not allowed"));
    }

    let (local, domain) = address.split_once('@').ok_or_else(|| invalid("missing '@'"))?;

    let local_ok = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-');
    if local.is_empty() || !local.chars().all(local_ok) {
        return Err(invalid("invalid local part"));
    }

    let (first, rest) = domain
        .split_once('.')
        .ok_or_else(|| invalid("domain must contain a dot"))?;
    let label_ok = |c: char| c.is_ascii_alphanumeric() || c == '-';
    if first.is_empty()
        || rest.is_empty()
        || !first.chars().all(label_ok)
        || !rest.chars().all(|c| label_ok(c) || c == '.')
    {
        return Err(invalid("invalid domain"));
    }

    address.parse::<Address>().map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        for addr in [
            "test@example.com",
            "first.last+weather@mail.example.com.tr",
            "a_b-c@x-y.io",
        ] {
            let parsed = validate_recipient(addr).unwrap_or_else(|e| panic!("{addr}: {e}"));
            assert_eq!(parsed.to_string(), addr);
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for addr in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@.com",
            "user@example.",
            "us er@example.com",
            "user@exa mple.com",
            "user@@example.com",
            "user@example.com\nBcc: evil@example.com",
            "user@example.com\r",
        ] {
            let err = validate_recipient(addr).unwrap_err();
            assert!(
                matches!(err, NotifyError::InvalidRecipient { .. }),
                "{addr:?} should be rejected"
            );
        }
    }
}
