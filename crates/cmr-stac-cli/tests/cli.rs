//! Integration tests for the `cmr-stac-cli` binary.
//!
//! Offline subcommands run as-is; the ones that talk to CMR point the
//! internal CMR address at a mock server through the `CMR_LB_*` variables.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

fn schemas_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/schemas")
}

fn cmr_fixture(name: &str) -> String {
    fs::read_to_string(fixtures_dir().join("cmr").join(name)).expect("read CMR fixture")
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("cmr-stac-cli").expect("binary builds");
    cmd.env_remove("RUST_LOG")
        .env("CMR_STAC_SCHEMA_DIR", schemas_dir())
        .env("CMR_STAC_BASE_URL", "https://gateway.test/stac");
    cmd
}

fn cli_against(server: &mockito::Server) -> Command {
    let mut cmd = cli();
    cmd.env("CMR_LB_PROTOCOL", "http")
        .env("CMR_LB_HOST", server.host_with_port())
        .env("CMR_LB_ROOT", "");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn translate_prints_cmr_params_and_url() {
    let output = cli()
        .args([
            "translate",
            "--vocabulary",
            "stac-query",
            "--provider",
            "USGS_EROS",
            "--param",
            "limit=10",
            "--param",
            "sortby=-properties.datetime",
        ])
        .output()
        .expect("command runs");

    assert!(output.status.success());
    let document = stdout_json(&output);
    assert_eq!(document["cmr_params"]["page_size"], 10);
    assert_eq!(document["cmr_params"]["provider"], "USGS_EROS");
    assert_eq!(document["cmr_params"]["sort_key"], serde_json::json!(["-start_date"]));
    let url = document["url"].as_str().expect("url");
    assert!(url.starts_with("https://cmr.earthdata.nasa.gov/search/granules.json?"));
}

#[test]
fn translate_reads_search_body() {
    let dir = tempdir().expect("temp dir");
    let body = dir.path().join("search.json");
    fs::write(
        &body,
        r#"{"collections": ["C1", "C2"], "bbox": [-10, -5, 10, 5]}"#,
    )
    .expect("write body");

    let output = cli()
        .args(["translate", "--vocabulary", "stac-search", "--body"])
        .arg(&body)
        .output()
        .expect("command runs");

    assert!(output.status.success());
    let document = stdout_json(&output);
    assert_eq!(
        document["cmr_params"]["collection_concept_id"],
        serde_json::json!(["C1", "C2"])
    );
    assert_eq!(document["cmr_params"]["bounding_box"], "-10,-5,10,5");
}

#[test]
fn unsortable_property_exits_with_client_error() {
    cli()
        .args(["translate", "--param", "sortby=bar"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Property [bar] does not support sorting"));
}

#[test]
fn limit_above_maximum_is_a_client_error() {
    cli()
        .env("CMR_STAC_MAX_LIMIT", "5")
        .args(["translate", "--param", "limit=6"])
        .assert()
        .code(2);
}

#[test]
fn malformed_param_flag_is_rejected() {
    cli()
        .args(["translate", "--param", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn catalog_lists_providers() {
    let output = cli()
        .args(["catalog", "--provider", "LPDAAC", "--provider", "USGS_EROS"])
        .output()
        .expect("command runs");

    assert!(output.status.success());
    let document = stdout_json(&output);
    assert_eq!(document["id"], "root");
    let children: Vec<&str> = document["links"]
        .as_array()
        .expect("links")
        .iter()
        .filter(|link| link["rel"] == "child")
        .filter_map(|link| link["href"].as_str())
        .collect();
    assert_eq!(
        children,
        vec![
            "https://gateway.test/stac/LPDAAC",
            "https://gateway.test/stac/USGS_EROS"
        ]
    );
}

#[test]
fn base_url_flag_overrides_environment() {
    cli()
        .args(["--base-url", "https://other.test/stac/", "catalog", "--provider", "LPDAAC"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"href\": \"https://other.test/stac\""));
}

#[test]
fn validate_accepts_rendered_catalog() {
    let catalog = cli()
        .args(["catalog", "--provider", "LPDAAC"])
        .output()
        .expect("command runs");
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("catalog.json");
    fs::write(&path, &catalog.stdout).expect("write catalog");

    cli()
        .args(["validate", "--schema", "catalog"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is a valid catalog"));
}

#[test]
fn validate_reports_violations_and_exits_one() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("item.json");
    fs::write(&path, r#"{"type": "Feature", "id": "G1"}"#).expect("write item");

    cli()
        .args(["validate", "--schema", "item", "--schema-dir"])
        .arg(schemas_dir())
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("stac_version"));
}

#[test]
fn search_prints_feature_collection() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/granules.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("page_size".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("CMR-Hits", "2")
        .with_body(cmr_fixture("granules.json"))
        .create();

    let output = cli_against(&server)
        .args([
            "search",
            "--provider",
            "USGS_EROS",
            "--validate",
            "--param",
            "limit=2",
        ])
        .output()
        .expect("command runs");

    mock.assert();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let document = stdout_json(&output);
    assert_eq!(document["type"], "FeatureCollection");
    assert_eq!(document["features"].as_array().expect("features").len(), 2);
    assert_eq!(
        document["context"],
        serde_json::json!({"returned": 2, "limit": 2, "matched": 2})
    );
}

#[test]
fn upstream_failure_exits_with_one() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/granules.json")
        .match_query(Matcher::Any)
        .with_status(503)
        .create();

    cli_against(&server)
        .args(["search", "--provider", "USGS_EROS"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("503"));
}

#[test]
fn collections_prints_provider_catalog() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/collections.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("has_granules".into(), "true".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("CMR-Hits", "2")
        .with_body(cmr_fixture("collections.json"))
        .create();

    let output = cli_against(&server)
        .args(["collections", "--provider", "USGS_EROS"])
        .output()
        .expect("command runs");

    mock.assert();
    assert!(output.status.success());
    let document = stdout_json(&output);
    assert_eq!(document["id"], "USGS_EROS");
    assert_eq!(
        document["collections"].as_array().expect("collections").len(),
        2
    );
}

#[test]
fn catalog_without_providers_asks_cmr() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/ingest/providers")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"provider-id":"LPDAAC_ECS","short-name":"LPDAAC"}]"#)
        .create();

    let output = cli_against(&server)
        .arg("catalog")
        .output()
        .expect("command runs");

    mock.assert();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let document = stdout_json(&output);
    let children: Vec<&str> = document["links"]
        .as_array()
        .expect("links")
        .iter()
        .filter(|link| link["rel"] == "child")
        .filter_map(|link| link["href"].as_str())
        .collect();
    assert_eq!(children, vec!["https://gateway.test/stac/LPDAAC_ECS"]);
}

fn mock_collection_lookup(server: &mut mockito::Server, body: String) -> mockito::Mock {
    server
        .mock("GET", "/collections.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("provider_id".into(), "USGS_EROS".into()),
            Matcher::UrlEncoded("short_name".into(), "Landsat7_ETM_Plus_C1".into()),
            Matcher::UrlEncoded("version".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

#[test]
fn collection_prints_one_collection() {
    let mut server = mockito::Server::new();
    let mock = mock_collection_lookup(&mut server, cmr_fixture("collections.json"));

    let output = cli_against(&server)
        .args(["collection", "--provider", "USGS_EROS", "Landsat7_ETM_Plus_C1.v1"])
        .output()
        .expect("command runs");

    mock.assert();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let document = stdout_json(&output);
    assert_eq!(document["id"], "Landsat7_ETM_Plus_C1.v1");
    assert_eq!(document["type"], "Collection");
}

#[test]
fn unknown_collection_exits_with_one() {
    let mut server = mockito::Server::new();
    mock_collection_lookup(&mut server, r#"{"feed":{"entry":[]}}"#.to_string());

    cli_against(&server)
        .args(["collection", "--provider", "USGS_EROS", "Landsat7_ETM_Plus_C1.v1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn translate_resolves_stac_collection_ids() {
    let mut server = mockito::Server::new();
    let mock = mock_collection_lookup(&mut server, cmr_fixture("collections.json"));

    let output = cli_against(&server)
        .args([
            "translate",
            "--provider",
            "USGS_EROS",
            "--param",
            "collections=Landsat7_ETM_Plus_C1.v1",
        ])
        .output()
        .expect("command runs");

    mock.assert();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let document = stdout_json(&output);
    assert_eq!(
        document["cmr_params"]["collection_concept_id"],
        serde_json::json!(["C1379757686-USGS_EROS"])
    );
}

#[test]
fn wfs_translation_matches_search_target() {
    let output = cli()
        .args(["translate", "--vocabulary", "wfs", "--param", "limit=3"])
        .output()
        .expect("command runs");

    assert!(output.status.success());
    let document = stdout_json(&output);
    let url = document["url"].as_str().expect("url");
    assert!(url.contains("/search/granules.json?"), "{url}");
}
