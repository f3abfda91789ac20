//! Integration tests for headless `refcheck play`.
//!
//! stdin is closed (or scripted) by assert_cmd, so every run here either
//! advances on its own or is driven by control lines.


use std::fs;
use std::time::Duration;

use fixtures::{
    SPEECH_MODEL_PATH, can_bind_localhost, error_response, refcheck, refcheck_against,
    speech_body, temp_home,
};
use predicates::prelude::*;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_silent_deck_auto_advances_to_the_end() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[1 / 7]"))
        .stdout(predicate::str::contains("[7 / 7]"))
        .stdout(predicate::str::contains("(no narration)"))
        .stdout(predicate::str::contains("Presentation finished"));
}

#[test]
fn test_enabled_narration_without_key_plays_silently() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--narration", "--dwell-ms", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no narration)"))
        .stdout(predicate::str::contains("Presentation finished"))
        .stderr(predicate::str::contains("No Gemini API key configured"));
}

#[tokio::test]
async fn test_narrated_deck_requests_every_slide() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    // 0.1 s of audio per slide.
    Mock::given(method("POST"))
        .and(path(SPEECH_MODEL_PATH))
        .and(body_string_contains("Say naturally and professionally"))
        .respond_with(ResponseTemplate::new(200).set_body_json(speech_body(2_400)))
        .expect(7)
        .mount(&mock_server)
        .await;

    refcheck_against(home.path(), &mock_server.uri())
        .args(["play", "--narration", "--dwell-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(narration 0:00 / 0:00)"))
        .stdout(predicate::str::contains("[7 / 7]"))
        .stdout(predicate::str::contains("(no narration)").not())
        .stdout(predicate::str::contains("Presentation finished"));
}

#[tokio::test]
async fn test_failed_narration_with_closed_controls_stops() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    fs::write(
        home.path().join("config.toml"),
        "[retry]\nmax_attempts = 1\nbase_delay_ms = 1\n",
    )
    .unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SPEECH_MODEL_PATH))
        .respond_with(error_response(500, "INTERNAL", "backend error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    refcheck_against(home.path(), &mock_server.uri())
        .args(["play", "--narration", "--dwell-ms", "0"])
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("(no narration)"))
        .stdout(predicate::str::contains("Controls closed; stopped at slide 1 / 7"));
}

#[test]
fn test_pause_with_closed_controls_stops() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "60000"])
        .write_stdin("p\n")
        .timeout(Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Controls closed; stopped at slide 1 / 7"));
}

#[test]
fn test_quit_stops_on_current_slide() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "0"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped at slide 1 / 7"))
        .stdout(predicate::str::contains("Presentation finished").not());
}

#[test]
fn test_next_controls_walk_the_deck() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "0"])
        .write_stdin("n\nn\nn\nn\nn\nn\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[7 / 7]"))
        .stdout(predicate::str::contains("Presentation finished"));
}

#[test]
fn test_closed_controls_stop_manual_playback() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Controls closed; stopped at slide 1 / 7"));
}

#[test]
fn test_unknown_control_is_reported() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "0"])
        .write_stdin("x\nq\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown control"))
        .stdout(predicate::str::contains("Stopped at slide 1 / 7"));
}

#[test]
fn test_mute_control_is_echoed() {
    let home = temp_home();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "0"])
        .write_stdin("m\nm\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Muted"))
        .stdout(predicate::str::contains("Unmuted"));
}

#[test]
fn test_custom_deck_plays() {
    let home = temp_home();
    let deck_path = home.path().join("deck.toml");
    fs::write(
        &deck_path,
        r#"
[[slides]]
title = "Consent"
script = "Collect written consent."

[[slides]]
title = "Wrap-up"
script = "Keep notes factual."
"#,
    )
    .unwrap();

    refcheck(home.path())
        .args(["play", "--dwell-ms", "1", "--deck"])
        .arg(&deck_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[2 / 2] Wrap-up"))
        .stdout(predicate::str::contains("Presentation finished"));
}
