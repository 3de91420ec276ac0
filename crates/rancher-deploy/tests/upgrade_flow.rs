//! End-to-end upgrade flow against a scripted in-process Rancher.
//!
//! Exercises the real HTTP client and the deploy controller together:
//! the mock serves the stack and service lookups, accepts the upgrade
//! action, walks the service through a scripted sequence of states as
//! it is polled, and accepts `finishupgrade`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

use rancher_client::{ClientOpts, RancherClient};
use rancher_upgrade::{Deploy, DeployConfig, DeployError, Target};

/// One recorded API call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
enum ApiCall {
    ListStacks {
        name: Option<String>,
        env: Option<String>,
    },
    ListServices {
        name: Option<String>,
        stack_id: Option<String>,
    },
    GetService(String),
    Upgrade(String),
    FinishUpgrade(String),
}

/// Scripted Rancher installation: one stack (`web`), one service
/// (`api`), and a queue of states the service reports while polled.
/// Once the queue drains, every further poll sees `upgrading`.
#[derive(Clone)]
struct ScriptedRancher {
    calls: Arc<Mutex<Vec<ApiCall>>>,
    upgrade_bodies: Arc<Mutex<Vec<Value>>>,
    states: Arc<Mutex<VecDeque<&'static str>>>,
    service_exists: bool,
}

impl ScriptedRancher {
    fn new(states: &[&'static str]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            upgrade_bodies: Arc::new(Mutex::new(Vec::new())),
            states: Arc::new(Mutex::new(states.iter().copied().collect())),
            service_exists: true,
        }
    }

    fn without_service(states: &[&'static str]) -> Self {
        Self {
            service_exists: false,
            ..Self::new(states)
        }
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn upgrade_bodies(&self) -> Vec<Value> {
        self.upgrade_bodies.lock().unwrap().clone()
    }
}

fn service_json(state: &str) -> Value {
    json!({
        "id": "1svc1",
        "name": "api",
        "state": state,
        "kind": "service",
        "launchConfig": {"imageUuid": "docker:registry.test/api:1.2.2"},
        "secondaryLaunchConfigs": [{"name": "sidecar"}],
    })
}

async fn list_stacks(
    State(mock): State<ScriptedRancher>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    mock.record(ApiCall::ListStacks {
        name: query.get("name").cloned(),
        env: query.get("env").cloned(),
    });
    Json(json!({"data": [{"id": "1s1", "name": "web"}]}))
}

async fn list_services(
    State(mock): State<ScriptedRancher>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    mock.record(ApiCall::ListServices {
        name: query.get("name").cloned(),
        stack_id: query.get("stackId").cloned(),
    });
    if !mock.service_exists {
        return Json(json!({"data": []}));
    }
    Json(json!({"data": [service_json("active")]}))
}

async fn get_service(
    State(mock): State<ScriptedRancher>,
    Path(id): Path<String>,
) -> Json<Value> {
    mock.record(ApiCall::GetService(id));
    let state = mock.states.lock().unwrap().pop_front().unwrap_or("upgrading");
    Json(service_json(state))
}

async fn service_action(
    State(mock): State<ScriptedRancher>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> impl IntoResponse {
    match query.get("action").map(String::as_str) {
        Some("upgrade") => {
            mock.record(ApiCall::Upgrade(id));
            if let Ok(parsed) = serde_json::from_slice::<Value>(&body) {
                mock.upgrade_bodies.lock().unwrap().push(parsed);
            }
            Json(service_json("upgrading")).into_response()
        }
        Some("finishupgrade") => {
            mock.record(ApiCall::FinishUpgrade(id));
            Json(service_json("active")).into_response()
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    }
}

fn app(mock: ScriptedRancher) -> Router {
    Router::new()
        .route("/stacks", get(list_stacks))
        .route("/services", get(list_services))
        .route("/services/{id}", get(get_service).post(service_action))
        .with_state(mock)
}

async fn serve(mock: ScriptedRancher) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(mock)).await.unwrap();
    });
    format!("http://{addr}")
}

fn deploy_config(reference: &str, env: Option<&str>) -> DeployConfig {
    DeployConfig::new(
        Target::parse(reference, env.map(|e| e.to_string())),
        "registry.test/api:1.2.3",
    )
    .with_poll_interval(Duration::from_millis(25))
    .with_upgrade_timeout(Duration::from_secs(5))
}

fn client(base: &str) -> RancherClient {
    RancherClient::new(ClientOpts::new(base, "key", "secret")).unwrap()
}

#[tokio::test]
async fn full_flow_upgrades_and_finishes_stack_scoped_service() {
    let mock = ScriptedRancher::new(&["upgrading", "upgrading", "upgraded"]);
    let base = serve(mock.clone()).await;

    let deploy = Deploy::new(client(&base), deploy_config("web/api", Some("default")));
    deploy.run().await.unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            ApiCall::ListStacks {
                name: Some("web".to_string()),
                env: Some("default".to_string()),
            },
            ApiCall::ListServices {
                name: Some("api".to_string()),
                stack_id: Some("1s1".to_string()),
            },
            ApiCall::Upgrade("1svc1".to_string()),
            ApiCall::GetService("1svc1".to_string()),
            ApiCall::GetService("1svc1".to_string()),
            ApiCall::GetService("1svc1".to_string()),
            ApiCall::FinishUpgrade("1svc1".to_string()),
        ]
    );

    let bodies = mock.upgrade_bodies();
    assert_eq!(bodies.len(), 1);
    let strategy = &bodies[0]["inServiceStrategy"];
    assert_eq!(strategy["batchSize"], 1);
    assert_eq!(strategy["intervalMillis"], 1000);
    assert_eq!(strategy["startFirst"], false);
    assert_eq!(
        strategy["launchConfig"]["imageUuid"],
        "docker:registry.test/api:1.2.2"
    );
    assert_eq!(strategy["secondaryLaunchConfigs"][0]["name"], "sidecar");
}

#[tokio::test]
async fn plain_service_reference_skips_the_stack_lookup() {
    let mock = ScriptedRancher::new(&["upgraded"]);
    let base = serve(mock.clone()).await;

    let deploy = Deploy::new(client(&base), deploy_config("api", None));
    deploy.run().await.unwrap();

    assert_eq!(
        mock.calls()[0],
        ApiCall::ListServices {
            name: Some("api".to_string()),
            stack_id: None,
        }
    );
}

#[tokio::test]
async fn stalled_upgrade_times_out_without_finishing() {
    let mock = ScriptedRancher::new(&[]);
    let base = serve(mock.clone()).await;

    let config = deploy_config("web/api", None).with_upgrade_timeout(Duration::from_millis(100));
    let deploy = Deploy::new(client(&base), config);

    let err = deploy.run().await.unwrap_err();

    assert!(matches!(err, DeployError::Timeout(name) if name == "api"));
    let calls = mock.calls();
    assert!(
        calls.iter().any(|call| matches!(call, ApiCall::GetService(_))),
        "service should have been polled at least once"
    );
    assert!(
        !calls.iter().any(|call| matches!(call, ApiCall::FinishUpgrade(_))),
        "finishupgrade must not run after a timeout"
    );
}

#[tokio::test]
async fn missing_service_fails_before_any_upgrade_action() {
    let mock = ScriptedRancher::without_service(&[]);
    let base = serve(mock.clone()).await;

    let deploy = Deploy::new(client(&base), deploy_config("api", None));
    let err = deploy.run().await.unwrap_err();

    assert!(matches!(err, DeployError::ServiceNotFound(name) if name == "api"));
    assert_eq!(
        mock.calls(),
        vec![ApiCall::ListServices {
            name: Some("api".to_string()),
            stack_id: None,
        }]
    );
}
