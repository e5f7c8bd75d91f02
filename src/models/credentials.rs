//! SMTP credentials for the email notifier.

use std::fmt;

use serde::Deserialize;

/// One recipient or several.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(addr) => vec![addr.clone()],
            Self::Many(addrs) => addrs.clone(),
        }
    }
}

/// Contents of `credentials.json`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(alias = "recipients")]
    pub recipient: Recipients,
    pub smtp_host: String,
    pub smtp_port: u16,
}

// Keeps the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .field("recipient", &self.recipient)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}
