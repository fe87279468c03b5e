//! Page-load flow: identity provider to call controller

mod common;

use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use shopcall_call_core::{
    AppError, AppState, CallAdapters, CallStatus, ConfigError, IdentityError, ShopCallApp,
    ShopCallConfig, ShopCallError,
};

fn app(identity: Arc<MockIdentity>) -> ShopCallApp {
    ShopCallApp::new(ShopCallConfig::default(), identity)
}

#[tokio::test]
async fn test_initialization_failure_is_fatal() {
    let identity = Arc::new(MockIdentity {
        init_ok: false,
        ..MockIdentity::signed_in(customer())
    });

    let state = app(identity.clone()).bootstrap().await;

    assert_eq!(state, AppState::Failed(AppError::InitializationFailed));
    assert!(AppError::InitializationFailed.is_fatal());
    assert_eq!(identity.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unauthenticated_user_is_redirected() {
    let identity = Arc::new(MockIdentity {
        authenticated: false,
        profile: Ok(None),
        ..MockIdentity::signed_in(customer())
    });

    let state = app(identity.clone()).bootstrap().await;

    assert_eq!(state, AppState::Redirecting);
    assert_eq!(identity.sign_in_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sign_in_failure_is_surfaced() {
    let identity = Arc::new(MockIdentity {
        authenticated: false,
        sign_in_result: Err(IdentityError::SignIn("popup blocked".into())),
        ..MockIdentity::signed_in(customer())
    });

    match app(identity).bootstrap().await {
        AppState::Failed(err @ AppError::SignInFailed(_)) => {
            assert!(!err.is_fatal());
            assert!(err.to_string().contains("popup blocked"));
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_authenticated_user_is_ready() {
    let identity = Arc::new(MockIdentity::signed_in(customer()));

    let state = app(identity.clone()).bootstrap().await;

    assert_eq!(state, AppState::Ready(customer()));
    assert_eq!(identity.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_profile_errors_are_distinct_from_signed_out() {
    let failing = Arc::new(MockIdentity {
        profile: Err(IdentityError::ProfileUnavailable("HTTP 500".into())),
        ..MockIdentity::signed_in(customer())
    });
    assert_eq!(
        app(failing).bootstrap().await,
        AppState::Failed(AppError::ProfileUnavailable)
    );

    let empty = Arc::new(MockIdentity {
        profile: Ok(None),
        ..MockIdentity::signed_in(customer())
    });
    let state = app(empty).bootstrap().await;
    assert_eq!(state, AppState::Failed(AppError::ProfileUnavailable));
    assert!(!AppError::ProfileUnavailable.message().is_empty());
}

#[tokio::test]
async fn test_ready_profile_drives_controller_and_sign_out_ends_call() {
    let identity = Arc::new(MockIdentity::signed_in(customer()));
    let app = app(identity.clone());

    let AppState::Ready(profile) = app.bootstrap().await else {
        panic!("expected ready state");
    };

    let h = Harness::new();
    let adapters = CallAdapters::new(h.capture.clone(), h.transport.clone(), h.playback.clone())
        .with_speech(h.speech.clone());
    let controller = app.controller(profile.clone(), adapters);

    assert_eq!(controller.remote_peer_id(), app.config().admin_peer_id);
    assert_eq!(controller.profile(), &profile);

    controller.start().await.unwrap();
    assert_eq!(controller.status(), CallStatus::Ringing);

    app.sign_out(Some(&controller)).await;

    assert_eq!(controller.status(), CallStatus::Idle);
    assert!(h.transport.last_call().is_closed());
    assert_eq!(identity.sign_out_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_app_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "admin_peer_id = \"shop-night-desk\"").unwrap();

    let identity = Arc::new(MockIdentity::signed_in(customer()));
    let app = ShopCallApp::from_config_file(file.path(), identity).unwrap();

    assert_eq!(app.config().admin_peer_id, "shop-night-desk");
}

#[test]
fn test_invalid_config_file_is_a_config_error() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "admin_peer_id = \"  \"").unwrap();

    let identity = Arc::new(MockIdentity::signed_in(customer()));
    let result = ShopCallApp::from_config_file(file.path(), identity);

    assert!(matches!(
        result,
        Err(ShopCallError::Config(ConfigError::Invalid { field: "admin_peer_id", .. }))
    ));
}
