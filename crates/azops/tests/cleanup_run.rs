//! End-to-end cleanup runs against a mock Resource Manager endpoint.

use std::sync::Arc;

use azops::cleanup::{
    ActivityEvaluator, Classifier, CleanupRunner, CleanupStatus, NameFilter, DEFAULT_UNSAFE_TYPES,
};
use azops::report::write_report;
use azops_cloud::{ArmClient, StaticTokenCredential};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUB: &str = "sub-1";

fn arm(server: &MockServer) -> ArmClient {
    ArmClient::new(Arc::new(StaticTokenCredential::new("test-token")))
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
}

fn runner(delete_mode: bool) -> CleanupRunner {
    let classifier = Classifier::new(
        NameFilter::new(["proj-*"]).unwrap(),
        30,
        DEFAULT_UNSAFE_TYPES,
        delete_mode,
    );
    CleanupRunner::new(
        classifier,
        ActivityEvaluator::default(),
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    )
}

fn group_path(rg: &str) -> String {
    format!("/subscriptions/{SUB}/resourceGroups/{rg}")
}

async fn mount_groups(server: &MockServer, names: &[&str]) {
    let value: Vec<_> = names
        .iter()
        .map(|n| json!({"id": group_path(n), "name": n, "location": "westeurope"}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{SUB}/resourcegroups")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
        .mount(server)
        .await;
}

async fn mount_resources(server: &MockServer, rg: &str, resource_type: &str, changed: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{}/resources", group_path(rg))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": format!("{}/providers/{resource_type}/r1", group_path(rg)),
                "name": "r1",
                "type": resource_type,
                "changedTime": changed
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_locks(server: &MockServer, rg: &str, locked: bool) {
    let value = if locked {
        json!([{"name": "keep", "properties": {"level": "CanNotDelete"}}])
    } else {
        json!([])
    };
    Mock::given(method("GET"))
        .and(path(format!(
            "{}/providers/Microsoft.Authorization/locks",
            group_path(rg)
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn report_mode_tags_stale_group() {
    let server = MockServer::start().await;
    mount_groups(&server, &["proj-test-01", "prod-core"]).await;
    mount_resources(
        &server,
        "proj-test-01",
        "Microsoft.Storage/storageAccounts",
        "2024-04-17T00:00:00Z",
    )
    .await;
    mount_locks(&server, "proj-test-01", false).await;

    Mock::given(method("PATCH"))
        .and(path(format!(
            "{}/providers/Microsoft.Resources/tags/default",
            group_path("proj-test-01")
        )))
        .and(body_partial_json(json!({
            "operation": "Merge",
            "properties": {"tags": {"cleanup-candidate": "2024-06-01"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let subs = vec![arm(&server).subscription(SUB)];
    let report = runner(false).run(&subs).await;

    assert_eq!(report.len(), 1);
    let record = &report.records()[0];
    assert_eq!(record.resource_group, "proj-test-01");
    assert_eq!(record.days_inactive, Some(45));
    assert_eq!(record.status, CleanupStatus::MarkedForCleanup);
}

#[tokio::test]
async fn delete_mode_respects_locks_and_critical_types() {
    let server = MockServer::start().await;
    mount_groups(&server, &["proj-vm", "proj-locked", "proj-stale"]).await;
    mount_resources(
        &server,
        "proj-vm",
        "Microsoft.Compute/virtualMachines",
        "2024-01-01T00:00:00Z",
    )
    .await;
    mount_resources(
        &server,
        "proj-locked",
        "Microsoft.Web/sites",
        "2024-01-01T00:00:00Z",
    )
    .await;
    mount_resources(
        &server,
        "proj-stale",
        "Microsoft.Web/sites",
        "2024-01-01T00:00:00Z",
    )
    .await;
    mount_locks(&server, "proj-vm", true).await;
    mount_locks(&server, "proj-locked", true).await;
    mount_locks(&server, "proj-stale", false).await;

    Mock::given(method("DELETE"))
        .and(path(group_path("proj-stale")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let subs = vec![arm(&server).subscription(SUB)];
    let report = runner(true).run(&subs).await;

    let statuses: Vec<_> = report
        .records()
        .iter()
        .map(|r| (r.resource_group.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("proj-vm", CleanupStatus::SkippedCriticalResources),
            ("proj-locked", CleanupStatus::SkippedLocked),
            ("proj-stale", CleanupStatus::Deleted),
        ]
    );
}

#[tokio::test]
async fn api_failure_becomes_failed_row_and_report_is_written() {
    let server = MockServer::start().await;
    mount_groups(&server, &["proj-broken", "proj-ok"]).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/resources", group_path("proj-broken"))))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": "InternalServerError", "message": "backend unavailable"}
        })))
        .mount(&server)
        .await;
    mount_resources(
        &server,
        "proj-ok",
        "Microsoft.Web/sites",
        "2024-01-01T00:00:00Z",
    )
    .await;
    mount_locks(&server, "proj-ok", true).await;

    let subs = vec![arm(&server).subscription(SUB)];
    let report = runner(false).run(&subs).await;

    assert_eq!(report.records()[0].status, CleanupStatus::Failed);
    assert_eq!(report.records()[1].status, CleanupStatus::SkippedLocked);

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("report.csv");
    write_report(&csv, report.records()).await.unwrap();

    let written = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines[0],
        "Subscription,ResourceGroup,Location,LastModified,DaysInactive,Status"
    );
    assert!(lines[1].ends_with(",FAILED"));
    assert!(lines[2].starts_with("sub-1,proj-ok,westeurope,2024-01-01T00:00:00Z,152,"));
}
