use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub mail: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidName);
        }
        if self.password.is_empty() {
            return Err(Error::InvalidUpdateData);
        }
        validate_mail(&self.mail)
    }
}

/// Syntactic mail check: one '@', non-empty local part, domain with a dot.
pub fn validate_mail(mail: &str) -> Result<()> {
    let mut parts = mail.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(Error::InvalidMail),
    };
    if local.is_empty() || domain.is_empty() {
        return Err(Error::InvalidMail);
    }
    let (head, tail) = match domain.rsplit_once('.') {
        Some(split) => split,
        None => return Err(Error::InvalidMail),
    };
    if head.is_empty() || tail.is_empty() || mail.contains(char::is_whitespace) {
        return Err(Error::InvalidMail);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_mail() {
        assert!(validate_mail("ada@calc.uk").is_ok());
        assert!(validate_mail("a.b@sub.example.org").is_ok());
        assert!(validate_mail("").is_err());
        assert!(validate_mail("no-at-sign").is_err());
        assert!(validate_mail("two@@signs.com").is_err());
        assert!(validate_mail("@example.com").is_err());
        assert!(validate_mail("user@nodot").is_err());
        assert!(validate_mail("user@.com").is_err());
        assert!(validate_mail("spa ce@example.com").is_err());
    }

    #[test]
    fn test_account_validation() {
        let mut account = Account {
            id: Uuid::new_v4(),
            name: "ada".to_string(),
            mail: "ada@calc.uk".to_string(),
            password: "hash".to_string(),
            created_at: Utc::now(),
        };
        assert!(account.validate().is_ok());
        account.name = "  ".to_string();
        assert!(matches!(account.validate(), Err(Error::InvalidName)));
    }
}
