//! Integration tests for the outreach CLI
//!
//! These tests drive the binary end to end: configuration, pure readings,
//! live tracking and enrollment failure paths.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create an outreach Command isolated from the caller's environment
fn outreach(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outreach");
    cmd.current_dir(dir.path())
        .env_remove("OUTREACH_SECONDS_PER_ITEM")
        .env_remove("OUTREACH_TICK_INTERVAL_MS")
        .env_remove("OUTREACH_WEBHOOK_URL")
        .env_remove("RUST_LOG")
        .timeout(Duration::from_secs(20));
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_config(dir: &TempDir, content: &str) {
    let config_dir = dir.path().join(".outreach");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("outreach.toml"), content).unwrap();
}

/// Parse JSON-lines stdout into values.
fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_outreach_help() {
        let dir = create_temp_project();
        outreach(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("track"))
            .stdout(predicate::str::contains("enroll"));
    }

    #[test]
    fn test_outreach_version() {
        let dir = create_temp_project();
        outreach(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = create_temp_project();
        outreach(&dir).arg("launch").assert().failure();
    }

    #[test]
    fn test_phases_lists_default_catalog() {
        let dir = create_temp_project();
        outreach(&dir)
            .arg("phases")
            .assert()
            .success()
            .stdout(predicate::str::contains("Qualifying"))
            .stdout(predicate::str::contains("Enrichment"))
            .stdout(predicate::str::contains("Personalization"))
            .stdout(predicate::str::contains("Completed"))
            .stdout(predicate::str::contains("#3B82F6"))
            .stdout(predicate::str::contains("25.0%"));
    }

    #[test]
    fn test_phases_uses_configured_catalog() {
        let dir = create_temp_project();
        write_config(
            &dir,
            r##"
[[phases]]
name = "Sourcing"
color = "#112233"

[[phases]]
name = "Done"
color = "#445566"
"##,
        );

        outreach(&dir)
            .arg("phases")
            .assert()
            .success()
            .stdout(predicate::str::contains("Sourcing"))
            .stdout(predicate::str::contains("50.0%"))
            .stdout(predicate::str::contains("Qualifying").not());
    }
}

// =============================================================================
// Simulation Tests
// =============================================================================

mod simulation {
    use super::*;

    #[test]
    fn test_simulate_first_phase() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["simulate", "--items", "3", "--elapsed", "15"])
            .assert()
            .success()
            .stdout(predicate::str::contains("12.5%"))
            .stdout(predicate::str::contains("Qualifying"))
            .stdout(predicate::str::contains("105s"));
    }

    #[test]
    fn test_simulate_json() {
        let dir = create_temp_project();
        let output = outreach(&dir)
            .args(["simulate", "--items", "3", "--elapsed", "45", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["percent"], 37.5);
        assert_eq!(json["phase_index"], 1);
        assert_eq!(json["phase_name"], "Enrichment");
        assert_eq!(json["seconds_remaining"], 75);
    }

    #[test]
    fn test_simulate_past_the_end_is_clamped() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["simulate", "--items", "1", "--elapsed", "500"])
            .assert()
            .success()
            .stdout(predicate::str::contains("100.0%"))
            .stdout(predicate::str::contains("Completed"))
            .stdout(predicate::str::contains("0s"));
    }

    #[test]
    fn test_simulate_out_of_range_elapsed_is_rejected() {
        let dir = create_temp_project();
        for elapsed in ["--elapsed=1e13", "--elapsed=-1e30"] {
            outreach(&dir)
                .args(["simulate", "--items", "1", elapsed])
                .assert()
                .failure()
                .code(1)
                .stderr(predicate::str::contains("out of range"));
        }
    }

    #[test]
    fn test_simulate_zero_items_is_complete() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["simulate", "--items", "0", "--elapsed", "0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("100.0%"));
    }

    #[test]
    fn test_seconds_per_item_flag_overrides_env() {
        let dir = create_temp_project();
        outreach(&dir)
            .env("OUTREACH_SECONDS_PER_ITEM", "100")
            .args([
                "--seconds-per-item",
                "10",
                "simulate",
                "--items",
                "2",
                "--elapsed",
                "5",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("25.0%"));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = create_temp_project();
        write_config(&dir, "[progress]\nseconds_per_item = 100.0\n");
        outreach(&dir)
            .env("OUTREACH_SECONDS_PER_ITEM", "10")
            .args(["simulate", "--items", "1", "--elapsed", "5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("50.0%"));
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let dir = create_temp_project();
        outreach(&dir)
            .env("OUTREACH_SECONDS_PER_ITEM", "forty")
            .args(["simulate", "--items", "1", "--elapsed", "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("OUTREACH_SECONDS_PER_ITEM"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_without_file() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No outreach.toml found"))
            .stdout(predicate::str::contains("seconds_per_item = 40"));
    }

    #[test]
    fn test_config_init_creates_file() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created outreach.toml"));

        let path = dir.path().join(".outreach/outreach.toml");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("seconds_per_item"));
        assert!(content.contains("Qualifying"));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = create_temp_project();
        write_config(&dir, "[progress]\nseconds_per_item = 5.0\n");

        outreach(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join(".outreach/outreach.toml")).unwrap();
        assert!(content.contains("5.0"));
    }

    #[test]
    fn test_config_validate_defaults() {
        let dir = create_temp_project();
        outreach(&dir)
            .args(["config", "init"])
            .assert()
            .success();

        outreach(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        write_config(
            &dir,
            "[progress]\nseconds_per_item = 0.0\ntick_interval_ms = 5000\n",
        );

        outreach(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("seconds_per_item"))
            .stdout(predicate::str::contains("tick_interval_ms"));
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = create_temp_project();
        write_config(&dir, "[progress\nbroken");

        outreach(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("outreach.toml"));
    }

    #[test]
    fn test_invalid_phase_color_fails() {
        let dir = create_temp_project();
        write_config(&dir, "[[phases]]\nname = \"Only\"\ncolor = \"blue\"\n");

        outreach(&dir).arg("phases").assert().failure();
    }
}

// =============================================================================
// Tracking Tests
// =============================================================================

mod tracking {
    use super::*;

    #[test]
    fn test_track_zero_items_completes_immediately() {
        let dir = create_temp_project();
        let output = outreach(&dir)
            .args(["track", "--campaign-id", "cmp-0", "--items", "0", "--ui", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let events = json_lines(&output.stdout);
        let completed: Vec<_> = events
            .iter()
            .filter(|e| e["event"] == "completed")
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0]["campaign_id"], "cmp-0");
        assert_eq!(completed[0]["campaign_name"], "Campaign");
        assert_eq!(completed[0]["total_items"], 0);
    }

    #[test]
    fn test_track_runs_to_completion() {
        let dir = create_temp_project();
        outreach(&dir)
            .env("OUTREACH_TICK_INTERVAL_MS", "5")
            .args([
                "--seconds-per-item",
                "0.1",
                "track",
                "--campaign-id",
                "cmp-1",
                "--campaign-name",
                "Alpha",
                "--items",
                "2",
                "--ui",
                "minimal",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Processing Campaign: Alpha (2 leads)"))
            .stdout(predicate::str::contains("processed: 2 leads"))
            .stdout(predicate::str::contains("Tracking stopped").not());
    }

    #[test]
    fn test_readings_are_monotonic() {
        let dir = create_temp_project();
        let output = outreach(&dir)
            .env("OUTREACH_TICK_INTERVAL_MS", "5")
            .args([
                "--seconds-per-item",
                "0.1",
                "track",
                "--campaign-id",
                "cmp-2",
                "--items",
                "3",
                "--ui",
                "json",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let readings: Vec<_> = json_lines(&output.stdout)
            .into_iter()
            .filter(|e| e["event"] == "reading")
            .collect();
        assert!(!readings.is_empty());

        let percents: Vec<f64> = readings
            .iter()
            .map(|r| r["percent"].as_f64().unwrap())
            .collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100.0);

        let phases: Vec<u64> = readings
            .iter()
            .map(|r| r["phase_index"].as_u64().unwrap())
            .collect();
        assert!(phases.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*phases.last().unwrap(), 3);
    }

    #[test]
    fn test_multiple_surfaces_complete_once() {
        let dir = create_temp_project();
        let output = outreach(&dir)
            .env("OUTREACH_TICK_INTERVAL_MS", "5")
            .args([
                "--seconds-per-item",
                "0.1",
                "track",
                "--campaign-id",
                "cmp-3",
                "--items",
                "1",
                "--ui",
                "json",
                "--surfaces",
                "3",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let events = json_lines(&output.stdout);
        let completed = events.iter().filter(|e| e["event"] == "completed").count();
        assert_eq!(completed, 1);

        let surfaces: std::collections::BTreeSet<u64> = events
            .iter()
            .filter(|e| e["event"] == "reading")
            .map(|e| e["surface"].as_u64().unwrap())
            .collect();
        assert_eq!(surfaces.len(), 3);
    }

    #[test]
    fn test_logs_go_to_stderr() {
        let dir = create_temp_project();
        let output = outreach(&dir)
            .args([
                "--verbose",
                "--log-format",
                "json",
                "track",
                "--campaign-id",
                "cmp-4",
                "--items",
                "0",
                "--ui",
                "json",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        // Stdout stays pure JSON events.
        for event in json_lines(&output.stdout) {
            assert!(event["event"].is_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("session.start"));
        assert!(stderr.contains("loop.completed"));
    }
}

// =============================================================================
// Enrollment Tests
// =============================================================================

mod enrollment {
    use super::*;

    fn write_leads(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("leads.json");
        fs::write(&path, content).unwrap();
        path
    }

    /// Answer a single HTTP request with `status` and hand back the request body.
    fn serve_once(status: &'static str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/enroll", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let body = loop {
                let n = stream.read(&mut chunk).unwrap();
                assert!(n > 0, "connection closed before the request ended");
                buf.extend_from_slice(&chunk[..n]);
                let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length: usize = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse().unwrap())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).into_owned();
                }
            };
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
            );
            stream.write_all(response.as_bytes()).unwrap();
            body
        });
        (url, server)
    }

    #[test]
    fn test_enroll_accepted_batch_tracks_to_completion() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, r#"[{"id": "rec1"}, {"id": "rec2"}]"#);
        let (url, server) = serve_once("200 OK");

        let output = outreach(&dir)
            .env("OUTREACH_TICK_INTERVAL_MS", "5")
            .args([
                "--seconds-per-item",
                "0.05",
                "enroll",
                "--webhook",
                &url,
                "--campaign-id",
                "cmp-7",
                "--campaign-name",
                "Launch",
                "--ui",
                "json",
                "--leads",
            ])
            .arg(&leads)
            .output()
            .unwrap();
        assert!(output.status.success());

        let events = json_lines(&output.stdout);
        let completed: Vec<_> = events
            .iter()
            .filter(|e| e["event"] == "completed")
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0]["campaign_id"], "cmp-7");
        assert_eq!(completed[0]["campaign_name"], "Launch");
        assert_eq!(completed[0]["total_items"], 2);

        let body: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(body["campaignId"], "cmp-7");
        assert_eq!(body["lead"][0]["id"], "rec1");
        assert_eq!(body["lead"][1]["id"], "rec2");
    }

    #[test]
    fn test_enroll_error_status_is_reported() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, r#"[{"id": "rec1"}]"#);
        let (url, server) = serve_once("500 Internal Server Error");

        outreach(&dir)
            .args([
                "enroll",
                "--webhook",
                &url,
                "--campaign-id",
                "cmp-8",
                "--ui",
                "json",
                "--leads",
            ])
            .arg(&leads)
            .assert()
            .failure()
            .stdout(predicate::str::contains("completed").not())
            .stderr(predicate::str::contains("Failed to add leads to campaign"));
        server.join().unwrap();
    }

    #[test]
    fn test_enroll_requires_webhook() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, r#"[{"id": "rec1"}]"#);

        outreach(&dir)
            .args(["enroll", "--campaign-id", "cmp-1", "--leads"])
            .arg(&leads)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No webhook URL"));
    }

    #[test]
    fn test_enroll_rejects_empty_batch() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, "[]");

        outreach(&dir)
            .args([
                "enroll",
                "--webhook",
                "http://127.0.0.1:9/enroll",
                "--campaign-id",
                "cmp-1",
                "--ui",
                "minimal",
                "--leads",
            ])
            .arg(&leads)
            .assert()
            .failure()
            .stderr(predicate::str::contains("no leads to enroll"));
    }

    #[test]
    fn test_enroll_reports_bad_leads_file() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, "{ not json");

        outreach(&dir)
            .env("OUTREACH_WEBHOOK_URL", "http://127.0.0.1:9/enroll")
            .args(["enroll", "--campaign-id", "cmp-1", "--leads"])
            .arg(&leads)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse leads file"));
    }

    #[test]
    fn test_enroll_unreachable_webhook_fails() {
        let dir = create_temp_project();
        let leads = write_leads(&dir, r#"[{"id": "rec1", "fields": {"Email": "a@example.com"}}]"#);

        outreach(&dir)
            .args([
                "enroll",
                "--webhook",
                "http://127.0.0.1:9/enroll",
                "--campaign-id",
                "cmp-1",
                "--ui",
                "minimal",
                "--leads",
            ])
            .arg(&leads)
            .assert()
            .failure()
            .stdout(predicate::str::contains("processed").not())
            .stderr(predicate::str::contains("Failed to add leads to campaign"));
    }
}
