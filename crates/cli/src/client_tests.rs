use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn base_url_defaults_to_loopback_4173() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("PHOTON_URL");
    std::env::remove_var("PHOTON_HOST");
    std::env::remove_var("PHOTON_PORT");
    assert_eq!(PhotonClient::base_url(), "http://127.0.0.1:4173");
}

#[test]
fn base_url_honors_host_and_port_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("PHOTON_URL");
    std::env::set_var("PHOTON_HOST", "0.0.0.0");
    std::env::set_var("PHOTON_PORT", "5000");
    assert_eq!(PhotonClient::base_url(), "http://0.0.0.0:5000");
    std::env::remove_var("PHOTON_HOST");
    std::env::remove_var("PHOTON_PORT");
}

#[test]
fn base_url_honors_full_url_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("PHOTON_URL", "http://example.invalid:9000");
    assert_eq!(PhotonClient::base_url(), "http://example.invalid:9000");
    std::env::remove_var("PHOTON_URL");
}

#[tokio::test]
async fn connect_fails_fast_when_nothing_listens() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("PHOTON_URL");
    std::env::set_var("PHOTON_HOST", "127.0.0.1");
    std::env::set_var("PHOTON_PORT", "1"); // reserved, nothing binds here
    let result = PhotonClient::connect().await;
    assert!(matches!(result, Err(ClientError::DaemonNotRunning(_))));
    std::env::remove_var("PHOTON_HOST");
    std::env::remove_var("PHOTON_PORT");
}
