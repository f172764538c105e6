use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Credential, IdentityProvider, ProviderProfile};
use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, Role, User};
use crate::database::repository::UsersRepository;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Missing, invalid or unverifiable credential. Deliberately carries no cause.
    #[error("must be authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Resolves access tokens to stored users, creating the user on first login.
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UsersRepository>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UsersRepository>) -> Self {
        Self { provider, users }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub async fn resolve(&self, credential: &Credential) -> Result<User, IdentityError> {
        if credential.is_empty() {
            return Err(IdentityError::Unauthenticated);
        }

        let profile = self.provider.user_info(credential).await.map_err(|e| {
            debug!("Access token rejected by identity provider: {}", e);
            IdentityError::Unauthenticated
        })?;

        self.find_or_create(&profile).await
    }

    /// Returns the user bound to the profile's subject, creating a Reader if none exists.
    pub async fn find_or_create(&self, profile: &ProviderProfile) -> Result<User, IdentityError> {
        if profile.sub.is_empty() {
            return Err(IdentityError::Unauthenticated);
        }

        if let Some(user) = self.users.find_by_google_sub(&profile.sub).await? {
            return Ok(user);
        }

        let new_user = NewUser {
            google_sub: profile.sub.clone(),
            name: profile.name.clone(),
            profile_picture_url: profile.picture.clone(),
            role: Role::default(),
        };

        match self.users.create(new_user).await {
            Ok(user) => {
                info!("Created user {} on first login", user.id);
                Ok(user)
            }
            Err(DatabaseError::UniqueViolation(constraint)) => {
                // A concurrent first login inserted the row; read the winner.
                warn!("Concurrent first login detected ({}), re-reading user", constraint);
                self.users
                    .find_by_google_sub(&profile.sub)
                    .await?
                    .ok_or_else(|| {
                        IdentityError::Store(DatabaseError::NotFound(
                            "user vanished after unique violation".to_string(),
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;
    use crate::testing::{MemoryUsers, StaticTokenProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(sub: &str) -> ProviderProfile {
        ProviderProfile {
            sub: sub.to_string(),
            name: "Ada".to_string(),
            picture: "http://img/ada.png".to_string(),
        }
    }

    fn resolver_with(users: Arc<dyn UsersRepository>) -> IdentityResolver {
        let provider = StaticTokenProvider::new().with_token("valid-token", profile("sub-ada"));
        IdentityResolver::new(Arc::new(provider), users)
    }

    #[tokio::test]
    async fn empty_token_is_unauthenticated() {
        let resolver = resolver_with(Arc::new(MemoryUsers::new()));
        let result = resolver.resolve(&Credential::new("")).await;
        assert!(matches!(result, Err(IdentityError::Unauthenticated)));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let users = Arc::new(MemoryUsers::new());
        let resolver = resolver_with(users.clone());
        let result = resolver.resolve(&Credential::new("forged")).await;
        assert!(matches!(result, Err(IdentityError::Unauthenticated)));
        assert!(users.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_login_creates_reader_from_profile() {
        let users = Arc::new(MemoryUsers::new());
        let resolver = resolver_with(users.clone());

        let user = resolver.resolve(&Credential::new("valid-token")).await.unwrap();

        assert_eq!(user.google_sub, "sub-ada");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.profile_picture_url, "http://img/ada.png");
        assert_eq!(user.role, Role::Reader);
        assert_eq!(users.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolving_twice_returns_same_user() {
        let users = Arc::new(MemoryUsers::new());
        let resolver = resolver_with(users.clone());

        let first = resolver.resolve(&Credential::new("valid-token")).await.unwrap();
        let second = resolver.resolve(&Credential::new("valid-token")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(users.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_user_keeps_role() {
        let users = Arc::new(MemoryUsers::new());
        users.insert(User {
            role: Role::Writer,
            ..MemoryUsers::user(7, "sub-ada", "Ada")
        });
        let resolver = resolver_with(users);

        let user = resolver.resolve(&Credential::new("valid-token")).await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.role, Role::Writer);
    }

    /// Hides existing rows from the first `stale` subject lookups, the way two
    /// concurrent first logins both miss before either has inserted.
    struct StaleLookups {
        inner: MemoryUsers,
        stale: AtomicUsize,
    }

    #[async_trait]
    impl UsersRepository for StaleLookups {
        async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
            self.inner.create(user).await
        }
        async fn get(&self, id: i64) -> Result<Option<User>, DatabaseError> {
            self.inner.get(id).await
        }
        async fn get_all(&self) -> Result<Vec<User>, DatabaseError> {
            self.inner.get_all().await
        }
        async fn update(&self, user: &User) -> Result<User, DatabaseError> {
            self.inner.update(user).await
        }
        async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
            self.inner.delete(id).await
        }
        async fn find_by_google_sub(&self, sub: &str) -> Result<Option<User>, DatabaseError> {
            let remaining = self.stale.load(Ordering::SeqCst);
            if remaining > 0 {
                self.stale.store(remaining - 1, Ordering::SeqCst);
                return Ok(None);
            }
            self.inner.find_by_google_sub(sub).await
        }
    }

    #[tokio::test]
    async fn losing_a_first_login_race_rereads_the_winner() {
        let users = Arc::new(StaleLookups {
            inner: MemoryUsers::new(),
            stale: AtomicUsize::new(2),
        });
        let resolver = resolver_with(users.clone());
        let token = Credential::new("valid-token");

        let (a, b) = tokio::join!(resolver.resolve(&token), resolver.resolve(&token));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(users.get_all().await.unwrap().len(), 1);
    }
}
