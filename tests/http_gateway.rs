//! HttpGateway against a local stand-in for the JIRA and Zephyr APIs.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use allure_zephyr::{
    BulkStatusUpdate, ConnectionConfig, CycleId, Error, ExecutionId, Gateway, HttpGateway, IssueId,
    IssueKey, JobToken, NewCycle, NewExecution, VersionId,
};

/// Basic auth for `bot:secret`.
const AUTH: &str = "Basic Ym90OnNlY3JldA==";

#[derive(Clone, Default)]
struct Seen {
    bodies: Arc<Mutex<Vec<Value>>>,
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(AUTH)
}

async fn versions(Path(project): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if project != "10000" {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!([
            { "id": "10100", "name": "2.3.0", "released": true },
            { "id": "10200", "name": "2.4.0", "released": false }
        ])),
    )
}

async fn issue(Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    match key.as_str() {
        "ABC-1" => (StatusCode::OK, Json(json!({ "id": "20001", "key": "ABC-1" }))),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "errorMessages": ["Issue Does Not Exist"] }))),
    }
}

async fn cycles(
    State(seen): State<Seen>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<Value> {
    seen.queries.lock().unwrap().push((
        params.get("projectId").cloned().unwrap_or_default(),
        params.get("versionId").cloned().unwrap_or_default(),
    ));
    Json(json!({
        "7": { "name": "Nightly", "totalExecutions": 3 },
        "recordsCount": 1
    }))
}

async fn create_cycle(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.bodies.lock().unwrap().push(body);
    Json(json!({ "jobProgressToken": "0001" }))
}

async fn create_execution(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.bodies.lock().unwrap().push(body);
    Json(json!({ "901": { "id": 901, "executionStatus": "-1" } }))
}

async fn bulk_status(State(seen): State<Seen>, Json(body): Json<Value>) -> StatusCode {
    let ok = body["status"] != json!(9);
    seen.bodies.lock().unwrap().push(body);
    if ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn job_progress(Path(token): Path<String>) -> Json<Value> {
    match token.as_str() {
        "done" => Json(json!({ "progress": 1.0, "message": "" })),
        _ => Json(json!({ "message": "" })),
    }
}

async fn serve() -> (HttpGateway, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/rest/api/2/project/{project}/versions", get(versions))
        .route("/rest/api/2/issue/{key}", get(issue))
        .route("/rest/zapi/latest/cycle", get(cycles).post(create_cycle))
        .route("/rest/zapi/latest/execution", post(create_execution))
        .route("/rest/zapi/latest/execution/updateBulkStatus", put(bulk_status))
        .route("/rest/zapi/latest/execution/jobProgress/{token}", get(job_progress))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let gateway = HttpGateway::new(&ConnectionConfig {
        project: "10000".to_string(),
        jira_api_url: format!("http://{}/rest/api/2/", addr),
        zephyr_api_url: format!("http://{}/rest/zapi/latest", addr),
        username: "bot".to_string(),
        password: "secret".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap();
    (gateway, seen)
}

#[tokio::test]
async fn lists_versions_with_basic_auth() {
    let (gateway, _) = serve().await;
    let versions = gateway.list_versions("10000").await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].id, "10200");
    assert_eq!(versions[1].name, "2.4.0");
}

#[tokio::test]
async fn non_200_is_remote_call_error() {
    let (gateway, _) = serve().await;
    let err = gateway.list_versions("99999").await.unwrap_err();
    match err {
        Error::RemoteCall { operation, status } => {
            assert_eq!(status, 404);
            assert!(operation.contains("99999"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn resolves_issue_ids() {
    let (gateway, _) = serve().await;
    assert_eq!(
        gateway.issue_id(&IssueKey::from("ABC-1")).await.unwrap(),
        IssueId::from("20001")
    );
    assert!(matches!(
        gateway.issue_id(&IssueKey::from("ABC-2")).await,
        Err(Error::RemoteCall { status: 404, .. })
    ));
}

#[tokio::test]
async fn lists_cycles_with_query() {
    let (gateway, seen) = serve().await;
    let listing = gateway
        .list_cycles("10000", &VersionId::Unscheduled)
        .await
        .unwrap();
    assert!(listing.contains_key("7"));
    assert!(listing.contains_key("recordsCount"));
    assert_eq!(
        seen.queries.lock().unwrap()[0],
        ("10000".to_string(), "-1".to_string())
    );
}

#[tokio::test]
async fn creates_cycle_and_reads_token() {
    let (gateway, seen) = serve().await;
    let created = gateway
        .create_cycle(&NewCycle {
            cloned_cycle_id: None,
            name: "Nightly".to_string(),
            build: None,
            environment: None,
            description: None,
            project_id: "10000".to_string(),
            version_id: VersionId::Id("10200".to_string()),
            start_date: String::new(),
            end_date: String::new(),
            clone_custom_fields: false,
        })
        .await
        .unwrap();
    assert_eq!(created.job_progress_token, Some(JobToken::from("0001")));

    let body = seen.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["versionId"], json!("10200"));
    assert_eq!(body["cloneCustomFields"], json!(false));
}

#[tokio::test]
async fn creates_execution_from_response_key() {
    let (gateway, seen) = serve().await;
    let id = gateway
        .create_execution(&NewExecution {
            cycle_id: CycleId::from("7"),
            issue_id: IssueId::from("20001"),
            project_id: "10000".to_string(),
            version_id: VersionId::Unscheduled,
        })
        .await
        .unwrap();
    assert_eq!(id, ExecutionId::from("901"));

    let body = seen.bodies.lock().unwrap()[0].clone();
    assert_eq!(
        body,
        json!({ "cycleId": "7", "issueId": "20001", "projectId": "10000", "versionId": -1 })
    );
}

#[tokio::test]
async fn bulk_status_checks_code() {
    let (gateway, seen) = serve().await;
    gateway
        .update_bulk_status(&BulkStatusUpdate {
            executions: vec![ExecutionId::from("901"), ExecutionId::from("902")],
            status: 1,
        })
        .await
        .unwrap();
    assert_eq!(
        seen.bodies.lock().unwrap()[0],
        json!({ "executions": ["901", "902"], "status": 1 })
    );

    let err = gateway
        .update_bulk_status(&BulkStatusUpdate {
            executions: vec![ExecutionId::from("901")],
            status: 9,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteCall { status: 400, .. }));
}

#[tokio::test]
async fn job_progress_may_be_missing() {
    let (gateway, _) = serve().await;
    assert_eq!(gateway.job_progress(&JobToken::from("done")).await.unwrap(), Some(1.0));
    assert_eq!(gateway.job_progress(&JobToken::from("pending")).await.unwrap(), None);
}
