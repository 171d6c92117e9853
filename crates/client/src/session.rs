use std::sync::Arc;

use crate::api::StorefrontApi;
use crate::credentials::{CredentialStore, StoredCredentials};
use crate::error::Result;
use crate::types::{AuthSession, User};

/// Which screen the client should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    Home { user: User },
}

/// Start/login/register/logout flow on top of the credential store.
pub struct AppSession {
    api: Arc<dyn StorefrontApi>,
    credentials: Arc<dyn CredentialStore>,
}

impl AppSession {
    pub fn new(api: Arc<dyn StorefrontApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { api, credentials }
    }

    pub fn api(&self) -> &Arc<dyn StorefrontApi> {
        &self.api
    }

    /// Home when a login is stored, login screen otherwise.
    ///
    /// The token is not checked here; the first rejected call clears it.
    pub fn start(&self) -> Result<Screen> {
        Ok(match self.credentials.load()? {
            Some(stored) => Screen::Home { user: stored.user },
            None => Screen::Login,
        })
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.credentials.load()?.map(|c| c.user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Screen> {
        let session = self.api.login(email, password).await?;
        self.remember(session)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Screen> {
        let session = self.api.register(name, email, password).await?;
        self.remember(session)
    }

    pub fn logout(&self) -> Result<Screen> {
        self.credentials.clear()?;
        tracing::info!("logged out");
        Ok(Screen::Login)
    }

    fn remember(&self, session: AuthSession) -> Result<Screen> {
        self.credentials.save(&StoredCredentials {
            token: session.token,
            user: session.user.clone(),
        })?;
        tracing::info!(user_id = %session.user.id, "logged in");
        Ok(Screen::Home { user: session.user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::credentials::FileCredentialStore;
    use crate::error::ClientError;
    use chrono::Utc;
    use storefront_core::UserId;

    fn user() -> User {
        User {
            id: UserId::new(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store(dir: &tempfile::TempDir) -> Arc<dyn CredentialStore> {
        Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")))
    }

    #[tokio::test]
    async fn login_then_logout_returns_to_login_screen() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = store(&dir);
        let sam = user();

        let mut api = MockStorefrontApi::new();
        let returned = sam.clone();
        api.expect_login()
            .times(1)
            .returning(move |_, _| Ok(AuthSession { token: "t0k3n".to_string(), user: returned.clone() }));

        let session = AppSession::new(Arc::new(api), credentials.clone());
        assert_eq!(session.start().unwrap(), Screen::Login);

        let screen = session.login("sam@example.com", "secret1").await.unwrap();
        assert_eq!(screen, Screen::Home { user: sam.clone() });
        assert_eq!(session.start().unwrap(), Screen::Home { user: sam });
        assert_eq!(credentials.load().unwrap().unwrap().token, "t0k3n");

        assert_eq!(session.logout().unwrap(), Screen::Login);
        assert_eq!(session.start().unwrap(), Screen::Login);
        assert!(credentials.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_login_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = store(&dir);

        let mut api = MockStorefrontApi::new();
        api.expect_login().returning(|_, _| {
            Err(ClientError::Api {
                status: 401,
                code: "unauthorized".to_string(),
                message: "invalid email or password".to_string(),
            })
        });

        let session = AppSession::new(Arc::new(api), credentials);
        let err = session.login("sam@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "invalid email or password");
        assert_eq!(session.start().unwrap(), Screen::Login);
    }
}
