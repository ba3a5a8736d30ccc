use std::path::PathBuf;
use std::process::Command;

use egemaps_engine::signal::wav::write_wav;
use egemaps_engine::testing::SyntheticSpec;
use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_egemaps_cli"))
}

fn temp_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(format!("cli_{}_{}", std::process::id(), name))
}

fn voice_wav(name: &str, spec: SyntheticSpec) -> String {
    let path = temp_file(name);
    write_wav(&path, &spec.to_audio_i16()).expect("write test wav");
    path.to_string_lossy().into_owned()
}

#[test]
fn analyze_prints_feature_json() {
    let input = voice_wav("voice.wav", SyntheticSpec::voice(140.0));
    let output = cli()
        .args(["analyze", "--input", &input])
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert!(output.status.success(), "CLI exited with {:?}", output.status.code());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["sample_rate"], 16_000);
    let features = json["features"].as_object().expect("features object");
    assert_eq!(features.len(), 88);
    assert!(features["F0semitoneFrom27.5Hz_sma3nz_amean"].is_number());
    assert!(json.get("summary").is_none());
}

#[test]
fn analyze_with_summary_and_contours() {
    let input = voice_wav("voice_detail.wav", SyntheticSpec::voice(200.0));
    let output = cli()
        .args(["analyze", "--input", &input, "--summary", "--lld"])
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let mean_hz = json["summary"]["pitch"]["mean_hz"].as_f64().expect("mean pitch");
    assert!((mean_hz - 200.0).abs() < 4.0, "mean pitch {}", mean_hz);
    let frames = json["frame_count"].as_u64().expect("frame count") as usize;
    assert_eq!(
        json["lld_time_series"]["timestamps_ms"].as_array().map(Vec::len),
        Some(frames)
    );
}

#[test]
fn flat_output_uses_sentinel() {
    let input = voice_wav("silence.wav", SyntheticSpec::silence());
    let output = cli()
        .args(["analyze", "--input", &input, "--flat", "NaN"])
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 88);
    assert_eq!(lines[0], "NaN");
}

#[test]
fn short_input_reports_engine_error() {
    let input = voice_wav("short.wav", SyntheticSpec::voice(140.0).with_duration_ms(200));
    let output = cli()
        .args(["analyze", "--input", &input])
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert_eq!(output.status.code(), Some(2));

    let json: Value = serde_json::from_slice(&output.stdout).expect("error JSON on stdout");
    assert_eq!(json["code"], 3004);
}

#[test]
fn missing_input_fails() {
    let output = cli()
        .args(["analyze", "--input", "/nonexistent/input.wav"])
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn names_lists_all_features() {
    let output = cli().arg("names").output().expect("failed to run egemaps_cli names");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert_eq!(stdout.lines().count(), 88);
    assert_eq!(stdout.lines().last(), Some("equivalentSoundLevel_dBp"));
}

#[test]
fn synth_writes_analyzable_wav() {
    let path = temp_file("synth.wav");
    let output = cli()
        .args(["synth", "--pattern", "sine", "--frequency", "220", "--output"])
        .arg(&path)
        .output()
        .expect("failed to run egemaps_cli synth");
    assert!(output.status.success());

    let output = cli()
        .args(["analyze", "--input"])
        .arg(&path)
        .output()
        .expect("failed to run egemaps_cli analyze");
    assert!(output.status.success());
}

#[test]
fn version_names_engine() {
    let output = cli().arg("version").output().expect("failed to run egemaps_cli version");
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.starts_with("egemaps_engine/"));
}
