//! Application bootstrap: identity first, then the call controller
//!
//! Mirrors what the widget does on page load. Initialise the identity SDK,
//! send unauthenticated users to sign-in, fetch the profile of
//! authenticated ones, and hand that profile to a [`CallSessionController`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::adapters::{CallAdapters, IdentityProvider};
use crate::config::ShopCallConfig;
use crate::controller::CallSessionController;
use crate::error::{IdentityError, ShopCallResult};
use crate::types::UserProfile;

/// Errors that stop the widget before a call can be placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The identity SDK failed to load; fatal for this page load
    InitializationFailed,
    /// Signed in, but the profile could not be read
    ProfileUnavailable,
    /// Sign-in could not be started
    SignInFailed(String),
}

impl AppError {
    /// Message shown to the user next to the reload control
    pub fn message(&self) -> &str {
        match self {
            AppError::InitializationFailed => "Unable to connect to the login service (initialization failed)",
            AppError::ProfileUnavailable => "Unable to load your profile",
            AppError::SignInFailed(_) => "Unable to start sign-in",
        }
    }

    /// Whether the only way forward is reloading the page
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::InitializationFailed)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::SignInFailed(detail) => write!(f, "{}: {}", self.message(), detail),
            _ => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for AppError {}

/// Outcome of [`ShopCallApp::bootstrap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Sign-in started; the identity provider now owns the page
    Redirecting,
    /// Ready to call on behalf of this user
    Ready(UserProfile),
    /// Stopped with an error the user must act on
    Failed(AppError),
}

/// Entry point tying the identity provider to call controllers
pub struct ShopCallApp {
    config: ShopCallConfig,
    identity: Arc<dyn IdentityProvider>,
}

impl ShopCallApp {
    /// Create the app with an injected identity provider
    pub fn new(config: ShopCallConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { config, identity }
    }

    /// Load configuration from `path` (plus `SHOPCALL__*` overrides) and
    /// create the app
    pub fn from_config_file(path: &Path, identity: Arc<dyn IdentityProvider>) -> ShopCallResult<Self> {
        let config = ShopCallConfig::load(Some(path))?;
        Ok(Self::new(config, identity))
    }

    /// Configuration in use
    pub fn config(&self) -> &ShopCallConfig {
        &self.config
    }

    /// Run the page-load flow. Never retries; every retry is a user reload.
    pub async fn bootstrap(&self) -> AppState {
        if !self.identity.initialize().await {
            error!("Identity provider initialization failed");
            return AppState::Failed(AppError::InitializationFailed);
        }

        if !self.identity.is_authenticated() {
            info!("No identity session, starting sign-in");
            return match self.identity.sign_in().await {
                Ok(()) => AppState::Redirecting,
                Err(e) => {
                    warn!("Sign-in failed: {}", e);
                    AppState::Failed(AppError::SignInFailed(e.to_string()))
                }
            };
        }

        match self.identity.current_user().await {
            Ok(Some(profile)) => {
                info!("Signed in as {}", profile.display_name);
                AppState::Ready(profile)
            }
            Ok(None) => {
                warn!("Authenticated session returned no profile");
                AppState::Failed(AppError::ProfileUnavailable)
            }
            Err(IdentityError::InitializationFailed(detail)) => {
                error!("Identity provider lost initialization: {}", detail);
                AppState::Failed(AppError::InitializationFailed)
            }
            Err(e) => {
                warn!("Failed to get profile: {}", e);
                AppState::Failed(AppError::ProfileUnavailable)
            }
        }
    }

    /// Build a controller that calls the configured shop peer as `profile`
    pub fn controller(&self, profile: UserProfile, adapters: CallAdapters) -> CallSessionController {
        CallSessionController::new(profile, &self.config, adapters)
    }

    /// End any call, then sign out. The provider resets client state.
    pub async fn sign_out(&self, controller: Option<&CallSessionController>) {
        if let Some(controller) = controller {
            controller.end();
        }
        self.identity.sign_out().await;
    }
}
