use async_trait::async_trait;

use quiz_core::model::CurrentUser;

use crate::error::IdentityError;

/// Source of the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` when nobody is signed in, or
    /// `IdentityError::Provider` if the lookup itself failed.
    async fn current_user(&self) -> Result<CurrentUser, IdentityError>;
}

/// Identity fixed at construction time, e.g. from flags or environment.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<CurrentUser>,
}

impl StaticIdentity {
    #[must_use]
    pub fn signed_in(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<CurrentUser, IdentityError> {
        self.user.clone().ok_or(IdentityError::NotSignedIn)
    }
}
