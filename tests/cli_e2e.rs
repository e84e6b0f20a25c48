//! End-to-end CLI tests for the bookmarks binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::{EMPTY_LISTING, listing_page, single_detail};
use support::socket_guard::start_mock_server_or_skip;

const LOGGED_IN_ROOT: &str = r#"<li class="item header-logout"><a href="/logout.php">Log out</a></li>"#;

fn bookmarks(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bookmarks").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("BOOKMARKS_PASSWORD");
    cmd
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/bookmark.php"))
        .and(query_param("rest", "show"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["101", "0", "102"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookmark.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_LISTING))
        .with_priority(10)
        .mount(server)
        .await;
    for id in ["101", "102"] {
        Mock::given(method("GET"))
            .and(path("/member_illust.php"))
            .and(query_param("illust_id", id))
            .respond_with(ResponseTemplate::new(200).set_body_string(single_detail(id)))
            .mount(server)
            .await;
    }
}

/// Serves a logged-out root, the login form and an empty listing.
async fn mount_login_flow(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<a>Sign up</a>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<input type="hidden" name="post_key" value="ffffffffffffffffffffffffffffffff">"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bookmark.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_LISTING))
        .mount(server)
        .await;
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    bookmarks(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Harvest bookmarked items"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    bookmarks(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bookmarks"));
}

/// Test that an unknown scope is rejected by argument parsing.
#[test]
fn test_binary_invalid_scope_returns_error() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    bookmarks(temp_dir.path())
        .args(["--scope", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that an unknown config key fails with its line number.
#[test]
fn test_binary_rejects_bad_config_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "page_workers = 2\nturbo = true\n").unwrap();

    bookmarks(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key: 'turbo' on line 2"));
}

/// Test a full run on a restored session: JSON lines on stdout, sentinel dropped.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_prints_items_as_json_lines() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGGED_IN_ROOT))
        .mount(&mock_server)
        .await;
    mount_listing(&mock_server).await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let output = bookmarks(temp_dir.path())
        .args(["-q", "--scope", "show", "--base-url", &mock_server.uri()])
        .arg("--cookie-file")
        .arg(temp_dir.path().join("cookies.txt"))
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    let mut ids: Vec<&str> = lines.iter().map(|line| line["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["101", "102"]);
    assert_eq!(lines[0]["kind"], "single");
    assert_eq!(lines[0]["image_urls"].as_array().unwrap().len(), 1);
}

/// Test that a logged-out session logs in from the environment and saves cookies.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_logs_in_and_saves_cookies() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_flow(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "PHPSESSID=fresh; Path=/")
                .set_body_string(r#"{"error":false,"message":"","body":{"success":{}}}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let cookie_path = temp_dir.path().join("cookies.txt");
    bookmarks(temp_dir.path())
        .env("BOOKMARKS_PASSWORD", "secret")
        .args(["-q", "--user", "alice", "--base-url", &mock_server.uri()])
        .arg("--cookie-file")
        .arg(&cookie_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let saved = fs::read_to_string(&cookie_path).unwrap();
    assert!(saved.contains("PHPSESSID\tfresh"), "cookie file: {saved}");
}

/// Test that a rejected login exits non-zero with the server message.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_reports_rejected_login() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<input type="hidden" name="post_key" value="ffffffffffffffffffffffffffffffff">"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"error":true,"message":"Account locked","body":[]}"#),
        )
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    bookmarks(temp_dir.path())
        .env("BOOKMARKS_PASSWORD", "secret")
        .args(["-q", "--user", "alice", "--base-url", &mock_server.uri()])
        .arg("--cookie-file")
        .arg(temp_dir.path().join("cookies.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Account locked"));
}

/// Test that piped credentials are read from stdin and the password is not
/// written back to the terminal.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_reads_piped_credentials_without_echo() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_string_contains("pixiv_id=alice"))
        .and(body_string_contains("password=pipedpass7"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "PHPSESSID=piped; Path=/")
                .set_body_string(r#"{"error":false,"message":"","body":{"success":{}}}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_login_flow(&mock_server).await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let cookie_path = temp_dir.path().join("cookies.txt");
    bookmarks(temp_dir.path())
        .args(["-q", "--base-url", &mock_server.uri()])
        .arg("--cookie-file")
        .arg(&cookie_path)
        .write_stdin("alice\npipedpass7\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Password: "))
        .stderr(predicate::str::contains("pipedpass7").not());

    let saved = fs::read_to_string(&cookie_path).unwrap();
    assert!(saved.contains("PHPSESSID\tpiped"), "cookie file: {saved}");
}
