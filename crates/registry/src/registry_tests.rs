use super::*;
use crate::env::FakeEnv;
use crate::loader::FakePhotonLoader;
use photon_core::descriptor::{MethodDescriptor, ParamType, Visibility};
use photon_core::CancellationToken;
use std::fs;
use tokio::sync::mpsc;

fn method(name: &str) -> MethodDescriptor {
    MethodDescriptor {
        name: name.to_string(),
        input_schema: serde_json::json!({}),
        output_format: None,
        layout_hints: serde_json::Value::Null,
        button_label: None,
        icon: None,
        linked_ui: None,
        visibility: vec![Visibility::Model],
        autorun: false,
        is_test: false,
        is_template: false,
    }
}

fn param(env_key: &str, optional: bool, default: Option<&str>) -> ConfigParam {
    ConfigParam {
        name: env_key.to_lowercase(),
        env_key: env_key.to_string(),
        param_type: ParamType::String,
        optional,
        has_default: default.is_some(),
        default: default.map(|d| serde_json::Value::String(d.to_string())),
    }
}

fn sample_context() -> (InvocationContext, mpsc::Receiver<photon_core::InvocationEvent>) {
    let (tx, rx) = mpsc::channel(8);
    (InvocationContext::new(tx, None, CancellationToken::new()), rx)
}

async fn new_registry(working_dir: &std::path::Path) -> (Registry, Arc<FakePhotonLoader>, Arc<FakeEnv>) {
    let loader = Arc::new(FakePhotonLoader::new());
    let env = Arc::new(FakeEnv::new());
    let config_store = Arc::new(ConfigStore::new(working_dir.join("config.json")));
    let registry = Registry::new(
        loader.clone(),
        env.clone(),
        config_store,
        working_dir.to_path_buf(),
        Vec::new(),
    )
    .unwrap();
    (registry, loader, env)
}

#[tokio::test]
async fn discover_loads_photon_with_no_params() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("git-box.photon.ts"), "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    let path = dir.path().join("git-box.photon.ts");
    loader.set_module(
        &path,
        LoadedModule { methods: vec![method("clone")], ..Default::default() },
    );

    registry.discover().await;
    let descriptor = registry.find_by_name("git-box").expect("descriptor present");
    assert!(descriptor.state.is_ready());
    assert_eq!(descriptor.methods.len(), 1);
}

#[tokio::test]
async fn discover_flags_needs_config_for_unsatisfied_param() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    loader.set_precheck_params(&path, vec![param("GIT_BOX_API_KEY", false, None)]);

    registry.discover().await;
    let descriptor = registry.find_by_name("git-box").unwrap();
    match descriptor.state {
        PhotonState::NeedsConfig { missing } => assert_eq!(missing, vec!["GIT_BOX_API_KEY".to_string()]),
        other => panic!("expected needs-config, got {other:?}"),
    }
}

#[tokio::test]
async fn configure_sets_env_and_loads_previously_unconfigured_photon() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, env) = new_registry(dir.path()).await;

    loader.set_precheck_params(&path, vec![param("GIT_BOX_API_KEY", false, None)]);
    registry.discover().await;
    assert!(!registry.find_by_name("git-box").unwrap().state.is_ready());

    loader.set_module(&path, LoadedModule { methods: vec![method("clone")], ..Default::default() });
    let descriptor = registry
        .configure("git-box", HashMap::from([("GIT_BOX_API_KEY".to_string(), "secret".to_string())]))
        .await
        .unwrap();

    assert!(descriptor.state.is_ready());
    assert_eq!(env.get("GIT_BOX_API_KEY"), Some("secret".to_string()));
}

#[tokio::test]
async fn load_backfills_default_into_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, env) = new_registry(dir.path()).await;

    loader.set_precheck_params(&path, vec![param("GIT_BOX_REGION", true, Some("us-east-1"))]);
    loader.set_module(&path, LoadedModule::default());

    registry.discover().await;
    assert_eq!(env.get("GIT_BOX_REGION"), Some("us-east-1".to_string()));
}

#[tokio::test]
async fn reload_failure_retains_previous_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    loader.set_module(&path, LoadedModule { methods: vec![method("clone")], ..Default::default() });
    registry.discover().await;
    let before = registry.find_by_name("git-box").unwrap();
    assert!(before.state.is_ready());

    loader.set_load_error(&path, crate::loader::LoaderError::Failed("boom".into()));
    let candidate = PhotonCandidate { name: "git-box".to_string(), path: path.clone() };
    let err = registry.reload(&candidate).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::LoadError(_)));

    let after = registry.find_by_name("git-box").unwrap();
    match after.state {
        PhotonState::Errored { .. } => {}
        other => panic!("expected errored, got {other:?}"),
    }
    // methods retained from the prior successful load (no torn state).
    assert_eq!(after.methods.len(), 1);
}

#[tokio::test]
async fn invoke_against_unready_photon_is_unconfigured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    loader.set_precheck_params(&path, vec![param("GIT_BOX_API_KEY", false, None)]);
    registry.discover().await;

    let id = PhotonId::from_path(&path);
    let (ctx, _rx) = sample_context();
    let err = registry.invoke(&id, "clone", serde_json::json!({}), ctx).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::Unconfigured { .. }));
}

#[tokio::test]
async fn invoke_unknown_method_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    loader.set_module(&path, LoadedModule { methods: vec![method("clone")], ..Default::default() });
    registry.discover().await;

    let id = PhotonId::from_path(&path);
    let (ctx, _rx) = sample_context();
    let err = registry.invoke(&id, "nonexistent", serde_json::json!({}), ctx).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::NotFound(_)));
}

#[tokio::test]
async fn remove_drops_descriptor_and_persists_envelope_without_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git-box.photon.ts");
    fs::write(&path, "").unwrap();
    let (registry, loader, _env) = new_registry(dir.path()).await;

    loader.set_module(&path, LoadedModule::default());
    registry.discover().await;
    registry
        .configure("git-box", HashMap::from([("X".to_string(), "1".to_string())]))
        .await
        .unwrap();

    registry.remove("git-box").unwrap();
    assert!(registry.find_by_name("git-box").is_none());

    let store = ConfigStore::new(dir.path().join("config.json"));
    let envelope = store.load().unwrap();
    assert!(!envelope.photons.contains_key("git-box"));
}
