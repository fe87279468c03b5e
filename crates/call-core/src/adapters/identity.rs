//! Identity provider seam (in-app browser login SDK)

use async_trait::async_trait;

use crate::error::IdentityError;
use crate::types::UserProfile;

/// Login SDK wrapper
///
/// Injected into [`crate::ShopCallApp`] rather than reached through a global,
/// so tests can substitute a double.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Load and initialise the SDK. `false` means the provider is unusable
    /// and callers must fail closed.
    async fn initialize(&self) -> bool;

    /// Whether a user session is present
    fn is_authenticated(&self) -> bool;

    /// Begin sign-in. On the web this redirects away from the page, so
    /// callers should treat a successful return as "navigation pending".
    async fn sign_in(&self) -> Result<(), IdentityError>;

    /// Profile of the signed-in user.
    ///
    /// `Ok(None)` means nobody is signed in; `Err(ProfileUnavailable)` means
    /// somebody is but the profile could not be fetched.
    async fn current_user(&self) -> Result<Option<UserProfile>, IdentityError>;

    /// End the session. Implementations reset client state as a side effect.
    async fn sign_out(&self);
}
