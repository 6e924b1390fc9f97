use std::fmt;

use async_trait::async_trait;
use coach_crypto::AdminSecret;

use crate::error::{ServerError, ServerResult};

/// Credential presented with an admin request.
#[derive(Clone)]
pub enum Credentials {
    Presented(String),
    Missing,
}

impl Credentials {
    pub fn from_option(credential: Option<String>) -> Self {
        match credential {
            Some(value) if !value.is_empty() => Self::Presented(value),
            _ => Self::Missing,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presented(_) => f.write_str("Presented(<redacted>)"),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// Admin operation being requested.
///
/// Authorization happens before the request is validated, so `target` is
/// the account id exactly as the caller sent it.
#[derive(Clone, Debug)]
pub enum AdminAction {
    AdjustCredits { target: String },
    ReadAccount { target: String },
    ProvisionAccount { target: String },
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdjustCredits { target } => write!(f, "adjust-credits:{target:?}"),
            Self::ReadAccount { target } => write!(f, "read-account:{target:?}"),
            Self::ProvisionAccount { target } => write!(f, "provision-account:{target:?}"),
        }
    }
}

#[async_trait]
pub trait AdminAuthorizer: Send + Sync {
    /// `Ok(())` if `credentials` may perform `action`, else `Unauthorized`.
    async fn authorize(&self, credentials: &Credentials, action: &AdminAction) -> ServerResult<()>;
}

/// Admin access gated on a single shared secret.
#[derive(Debug)]
pub struct SharedSecretAuth {
    secret: AdminSecret,
}

impl SharedSecretAuth {
    pub fn new(secret: AdminSecret) -> Self {
        Self { secret }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_enabled()
    }
}

#[async_trait]
impl AdminAuthorizer for SharedSecretAuth {
    async fn authorize(&self, credentials: &Credentials, action: &AdminAction) -> ServerResult<()> {
        let granted = match credentials {
            Credentials::Presented(value) => self.secret.matches(value),
            Credentials::Missing => false,
        };
        if granted {
            tracing::debug!(%action, "admin action authorized");
            Ok(())
        } else {
            tracing::warn!(%action, "admin credential rejected");
            Err(ServerError::Unauthorized(format!("credential rejected for {action}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> AdminAction {
        AdminAction::AdjustCredits {
            target: "u1".into(),
        }
    }

    #[test]
    fn action_display() {
        assert_eq!(action().to_string(), "adjust-credits:\"u1\"");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::from_option(Some("hunter2".into()));
        assert!(!format!("{creds:?}").contains("hunter2"));
        assert!(matches!(Credentials::from_option(Some(String::new())), Credentials::Missing));
    }

    #[tokio::test]
    async fn shared_secret_auth() {
        let auth = SharedSecretAuth::new(AdminSecret::new("s3cret"));
        auth.authorize(&Credentials::Presented("s3cret".into()), &action())
            .await
            .unwrap();

        let err = auth
            .authorize(&Credentials::Presented("guess".into()), &action())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
        assert!(!err.to_string().contains("guess"));

        assert!(auth.authorize(&Credentials::Missing, &action()).await.is_err());
    }

    #[tokio::test]
    async fn disabled_secret_rejects_everything() {
        let auth = SharedSecretAuth::new(AdminSecret::disabled());
        assert!(!auth.is_enabled());
        assert!(auth
            .authorize(&Credentials::Presented(String::new()), &action())
            .await
            .is_err());
    }
}
