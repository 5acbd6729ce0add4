//! HTTP sandbox integration tests.
//!
//! These tests run the real HTTP client against an in-process axum server
//! standing in for the sandbox API and the sandbox's file server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use zerocut::cli::ImageCreateArgs;
use zerocut::commands::ImageCreate;
use zerocut::materials::digest::sha256_hex;
use zerocut::materials::MaterialSynchronizer;
use zerocut::session::{Session, SessionOrigin};
use zerocut::{
    ConfigLocations, ConfigStore, HttpProbe, HttpSandboxConnector, Lifecycle, SessionManager,
    ZerocutError,
};

const TERMINAL: &str = "term-1";
const LAUNCHED: &str = "sbx-http";

// ============================================================================
// Fake sandbox server
// ============================================================================

#[derive(Default)]
struct Fake {
    base: String,
    live: Mutex<HashSet<String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    invocations: Mutex<Vec<(String, Value)>>,
    launches: Mutex<Vec<Value>>,
    closed: Mutex<Vec<String>>,
    auth: Mutex<Vec<String>>,
}

type Shared = Arc<Fake>;

impl Fake {
    fn descriptor(&self, id: &str) -> Value {
        json!({ "sandboxId": id, "terminalId": TERMINAL, "baseUrl": self.base })
    }

    fn record_auth(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            self.auth.lock().unwrap().push(value.to_string());
        }
    }

    fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn asset_url(&self, name: &str) -> String {
        format!("{}/zerocut/{TERMINAL}/materials/{name}", self.base)
    }
}

async fn launch(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    fake.record_auth(&headers);
    fake.launches.lock().unwrap().push(body);
    fake.live.lock().unwrap().insert(LAUNCHED.to_string());
    Json(fake.descriptor(LAUNCHED))
}

async fn connect(
    State(fake): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let live = fake.live.lock().unwrap().contains(&id);
    if live {
        Ok(Json(fake.descriptor(&id)))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn invoke(
    State(fake): State<Shared>,
    Path((_id, operation)): Path<(String, String)>,
    Json(params): Json<Value>,
) -> Json<Value> {
    fake.invocations.lock().unwrap().push((operation, params));
    Json(json!({ "urls": [format!("{}/download/result.png", fake.base)] }))
}

async fn close(
    State(fake): State<Shared>,
    Path((id, _terminal)): Path<(String, String)>,
) -> StatusCode {
    fake.closed.lock().unwrap().push(id);
    StatusCode::NO_CONTENT
}

async fn upload(
    State(fake): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> StatusCode {
    let Some(path) = query.get("path") else {
        return StatusCode::BAD_REQUEST;
    };
    fake.files.lock().unwrap().insert(path.clone(), body.to_vec());
    fake.uploads.lock().unwrap().push(path.clone());
    StatusCode::OK
}

async fn asset(
    State(fake): State<Shared>,
    Path((terminal, name)): Path<(String, String)>,
) -> Response {
    let key = format!("/home/user/cerevox-zerocut/projects/{terminal}/materials/{name}");
    let stored = fake.files.lock().unwrap().get(&key).cloned();
    match stored {
        Some(bytes) => (StatusCode::OK, [("x-content-hash", sha256_hex(&bytes))]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn download(Path(_name): Path<String>) -> Vec<u8> {
    b"generated-bytes".to_vec()
}

async fn start() -> Shared {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let fake = Arc::new(Fake {
        base: format!("http://{}", listener.local_addr().unwrap()),
        ..Default::default()
    });

    let app = Router::new()
        .route("/sandboxes", post(launch))
        .route("/sandboxes/{id}/connect", post(connect))
        .route("/sandboxes/{id}/ai/{operation}", post(invoke))
        .route("/sandboxes/{id}/terminals/{terminal}", delete(close))
        .route("/files", put(upload))
        .route("/zerocut/{terminal}/materials/{name}", get(asset))
        .route("/download/{name}", get(download))
        .with_state(Arc::clone(&fake));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fake
}

fn store_in(dir: &TempDir) -> ConfigStore {
    let store = ConfigStore::new(ConfigLocations::new(
        dir.path().join("home/.zerocut/config.json"),
        dir.path().join("cwd/.zerocut/config.json"),
    ));
    store.set_blocking("apiKey", "sk-test-key").unwrap();
    store
}

fn connector(fake: &Fake) -> HttpSandboxConnector {
    HttpSandboxConnector::new(Some(fake.base.clone())).unwrap()
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_launch_persists_id_and_transforms_credential() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(store_in(&dir), connector(&fake));

    let session = manager.acquire().await.unwrap();
    assert_eq!(session.origin(), SessionOrigin::Launched);
    assert_eq!(session.sandbox_id(), LAUNCHED);
    assert_eq!(session.terminal_id(), TERMINAL);
    assert_eq!(
        manager.store().get_string_blocking("sandboxId").as_deref(),
        Some(LAUNCHED)
    );

    assert_eq!(fake.auth.lock().unwrap().as_slice(), ["Bearer us-test-key"]);
    let launches = fake.launches.lock().unwrap().clone();
    assert_eq!(launches, vec![json!({"region": "us", "timeout": 60})]);

    manager.release(session).await;
    assert_eq!(fake.closed.lock().unwrap().as_slice(), [LAUNCHED]);
}

#[tokio::test]
async fn test_stale_id_relaunches() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.set_blocking("sandboxId", "sbx-gone").unwrap();
    let manager = SessionManager::new(store, connector(&fake));

    let session = manager.acquire().await.unwrap();
    assert_eq!(session.origin(), SessionOrigin::Launched);
    assert_eq!(
        manager.store().get_string_blocking("sandboxId").as_deref(),
        Some(LAUNCHED)
    );
    manager.release(session).await;

    let again = manager.acquire().await.unwrap();
    assert_eq!(again.origin(), SessionOrigin::Reconnected);
    assert_eq!(fake.launches.lock().unwrap().len(), 1);
    manager.release(again).await;
}

// ============================================================================
// Material Sync Tests
// ============================================================================

async fn launched_session(
    fake: &Fake,
    dir: &TempDir,
) -> (SessionManager<HttpSandboxConnector>, Session) {
    let manager = SessionManager::new(store_in(dir), connector(fake));
    let session = manager.acquire().await.unwrap();
    (manager, session)
}

#[tokio::test]
async fn test_upload_once_then_reuse() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let materials = dir.path().join("materials");
    std::fs::create_dir_all(&materials).unwrap();
    std::fs::write(materials.join("cat.png"), b"meow").unwrap();

    let (manager, session) = launched_session(&fake, &dir).await;
    let sync = MaterialSynchronizer::new(&materials, HttpProbe::new().unwrap());

    let first = sync.resolve(&session, "cat.png").await.unwrap();
    assert_eq!(first, fake.asset_url("cat.png"));
    assert_eq!(
        fake.uploads(),
        vec!["/home/user/cerevox-zerocut/projects/term-1/materials/cat.png".to_string()]
    );

    let second = sync.resolve(&session, "cat.png").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(fake.uploads().len(), 1);

    std::fs::write(materials.join("cat.png"), b"purr").unwrap();
    let third = sync.resolve(&session, "cat.png").await.unwrap();
    assert_eq!(third, first);
    assert_eq!(fake.uploads().len(), 2);

    manager.release(session).await;
}

#[tokio::test]
async fn test_remote_reference_untouched() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let (manager, session) = launched_session(&fake, &dir).await;
    let sync = MaterialSynchronizer::new(dir.path(), HttpProbe::new().unwrap());

    let url = "https://cdn.example/cat.png";
    assert_eq!(sync.resolve(&session, url).await.unwrap(), url);
    assert!(fake.uploads().is_empty());

    manager.release(session).await;
}

#[tokio::test]
async fn test_missing_local_material() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let (manager, session) = launched_session(&fake, &dir).await;
    let sync = MaterialSynchronizer::new(dir.path(), HttpProbe::new().unwrap());

    let err = sync.resolve(&session, "ghost.png").await.unwrap_err();
    assert!(matches!(err, ZerocutError::LocalMaterial { .. }));

    manager.release(session).await;
}

// ============================================================================
// Full Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_image_create_with_output() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("proj");
    std::fs::create_dir_all(project.join("materials")).unwrap();
    std::fs::write(project.join("materials/cat.png"), b"meow").unwrap();

    let store = store_in(&dir);
    store
        .set_blocking("projectDir", project.to_string_lossy().as_ref())
        .unwrap();
    let lifecycle = Lifecycle::new(store, connector(&fake), Arc::new(HttpProbe::new().unwrap()));

    let action = ImageCreate::new(ImageCreateArgs {
        prompt: Some("a cat".into()),
        refs: vec!["cat.png".into()],
        output: Some("out/result.png".into()),
        ..Default::default()
    });
    let outcome = lifecycle.run(&action).await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        std::fs::read(project.join("materials/out/result.png")).unwrap(),
        b"generated-bytes"
    );

    let invocations = fake.invocations.lock().unwrap().clone();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, "generateImage");
    assert_eq!(invocations[0].1["image"], json!([fake.asset_url("cat.png")]));

    assert_eq!(fake.closed.lock().unwrap().as_slice(), [LAUNCHED]);
    assert_eq!(
        lifecycle.manager().store().get_string_blocking("region").as_deref(),
        Some("us")
    );
}

#[tokio::test]
async fn test_generation_error_still_releases() {
    let fake = start().await;
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("proj");

    let store = store_in(&dir);
    store
        .set_blocking("projectDir", project.to_string_lossy().as_ref())
        .unwrap();
    let lifecycle = Lifecycle::new(store, connector(&fake), Arc::new(HttpProbe::new().unwrap()));

    let action = ImageCreate::new(ImageCreateArgs {
        prompt: Some("a cat".into()),
        refs: vec!["missing.png".into()],
        ..Default::default()
    });
    let outcome = lifecycle.run(&action).await;

    assert!(!outcome.is_success());
    assert!(fake.invocations.lock().unwrap().is_empty());
    assert_eq!(fake.closed.lock().unwrap().len(), 1);
}
