//! CLI integration tests.
//!
//! Each test drives the compiled binary against its own temporary
//! directory holding a holder file and a light-KDF config.

use std::path::{Path, PathBuf};
use std::process::Command;

const MASTER_KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";
const SALT: &str = "c2FsdHNhbHRzYWx0c2FsdA==";

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// RAII guard that removes a temporary directory on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "keyholder_test_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create temp dir");
        let config = r#"{
            "key_lock_kdf": { "m_cost": 256, "t_cost": 1, "p_cost": 1 },
            "passphrase_kdf": { "m_cost": 256, "t_cost": 1, "p_cost": 1 }
        }"#;
        std::fs::write(path.join("config.json"), config).expect("write config");
        Self(path)
    }

    fn file(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Runs the binary with `holder` as holder file.
/// Returns (exit_code, stdout, stderr).
fn run_with(dir: &TempDir, holder: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_keyholder"))
        .arg("--holder")
        .arg(holder)
        .arg("--config")
        .arg(dir.file("config.json"))
        .args(args)
        .env_remove("KEYHOLDER_MASTER_KEY")
        .env("NO_COLOR", "1")
        .output()
        .expect("run keyholder binary");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn run(dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    run_with(dir, &dir.file("holder.json"), args)
}

/// Like [`run`], with the key-store master key configured.
fn run_keyed(dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let mut full = vec!["--master-key", MASTER_KEY];
    full.extend_from_slice(args);
    run(dir, &full)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout is JSON")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

// -----------------------------------------------------------------------
// Clap parsing
// -----------------------------------------------------------------------

#[test]
fn help_flag_exits_zero() {
    let dir = TempDir::new("help");
    let (code, stdout, _) = run(&dir, &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("keygen"));
    assert!(stdout.contains("passphrase"));
}

#[test]
fn unknown_command_fails() {
    let dir = TempDir::new("unknown");
    let (code, _, stderr) = run(&dir, &["nonexistent"]);
    assert_ne!(code, 0);
    assert!(!stderr.is_empty());
}

#[test]
fn missing_holder_file_is_json_error() {
    let dir = TempDir::new("missing");
    let (code, _, stderr) = run(&dir, &["--json", "pubkey"]);
    assert_eq!(code, 1);
    let parsed: serde_json::Value = serde_json::from_str(stderr.trim()).expect("stderr is JSON");
    assert!(parsed["error"].as_str().unwrap_or_default().contains("not found"));
}

// -----------------------------------------------------------------------
// Key management
// -----------------------------------------------------------------------

#[test]
fn keygen_then_list() {
    let dir = TempDir::new("keygen");
    let (code, stdout, _) = run(&dir, &["--json", "keygen", "--user", "alice"]);
    assert_eq!(code, 0);
    let created = json(&stdout);
    assert_eq!(created["primary"], true);
    assert_eq!(created["fingerprint"].as_str().map(str::len), Some(64));

    let (code, _, _) = run(&dir, &["--json", "keygen", "--user", "alice"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run(&dir, &["--json", "pubkey"]);
    assert_eq!(code, 0);
    let rows = json(&stdout);
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["primary"], "yes");
    assert_eq!(rows[1]["primary"], "no");
}

#[test]
fn keygen_for_other_user_rejected() {
    let dir = TempDir::new("other_user");
    assert_eq!(run(&dir, &["keygen", "--user", "alice"]).0, 0);
    let (code, _, stderr) = run(&dir, &["keygen", "--user", "bob"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("alice"));
}

#[test]
fn locked_key_needs_master_key() {
    let dir = TempDir::new("no_master");
    let (code, _, stderr) = run(&dir, &["keygen", "--user", "alice", "--passphrase", "pw"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("master key"));
}

// -----------------------------------------------------------------------
// Messages and signatures
// -----------------------------------------------------------------------

#[test]
fn encrypt_decrypt_own_key() {
    let dir = TempDir::new("roundtrip");
    assert_eq!(
        run_keyed(&dir, &["keygen", "--user", "alice", "--passphrase", "pw"]).0,
        0
    );

    let plain = dir.file("plain.txt");
    let sealed = dir.file("sealed.asc");
    std::fs::write(&plain, "line one\r\nline two\n").expect("write plain");

    let (code, _, stderr) = run_keyed(&dir, &["encrypt", "--in", path_str(&plain), "--out", path_str(&sealed)]);
    assert_eq!(code, 0, "{stderr}");
    let armored = std::fs::read_to_string(&sealed).expect("read sealed");
    assert!(armored.starts_with("-----BEGIN KEYHOLDER MESSAGE-----"));

    let (code, stdout, _) = run_keyed(&dir, &["--json", "decrypt", "--in", path_str(&sealed)]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["text"], "line one\nline two\n");
}

#[test]
fn binary_payload_is_exact() {
    let dir = TempDir::new("binary");
    assert_eq!(run(&dir, &["keygen", "--user", "alice"]).0, 0);

    let plain = dir.file("plain.bin");
    let sealed = dir.file("sealed.asc");
    let payload: Vec<u8> = vec![0x00, 0x0d, 0x0a, 0xff, 0x0a];
    std::fs::write(&plain, &payload).expect("write plain");

    assert_eq!(
        run(&dir, &["encrypt", "--binary", "--in", path_str(&plain), "--out", path_str(&sealed)]).0,
        0
    );
    let (code, stdout, _) = run(&dir, &["--json", "decrypt", "--binary", "--in", path_str(&sealed)]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["data_hex"], "000d0aff0a");
}

#[test]
fn signed_message_between_holders() {
    let dir = TempDir::new("two_holders");
    let alice = dir.file("alice.json");
    let bob = dir.file("bob.json");
    assert_eq!(run_with(&dir, &alice, &["keygen", "--user", "alice"]).0, 0);
    assert_eq!(run_with(&dir, &bob, &["keygen", "--user", "bob"]).0, 0);

    let alice_pub = dir.file("alice.pub");
    let bob_pub = dir.file("bob.pub");
    let (_, stdout, _) = run_with(&dir, &alice, &["pubkey", "--export"]);
    std::fs::write(&alice_pub, stdout).expect("write alice.pub");
    let (_, stdout, _) = run_with(&dir, &bob, &["pubkey", "--export"]);
    std::fs::write(&bob_pub, stdout).expect("write bob.pub");

    let plain = dir.file("note.txt");
    let sealed = dir.file("note.asc");
    std::fs::write(&plain, "meet at noon\n").expect("write note");
    let (code, _, stderr) = run_with(
        &dir,
        &alice,
        &[
            "encrypt", "--sign", "--to", path_str(&bob_pub),
            "--in", path_str(&plain), "--out", path_str(&sealed),
        ],
    );
    assert_eq!(code, 0, "{stderr}");

    let (code, stdout, _) = run_with(
        &dir,
        &bob,
        &["--json", "decrypt", "--verify-with", path_str(&alice_pub), "--in", path_str(&sealed)],
    );
    assert_eq!(code, 0);
    let out = json(&stdout);
    assert_eq!(out["text"], "meet at noon\n");
    assert_eq!(out["signature"], "success");

    // Bob's own key did not sign: decryption still works.
    let (code, stdout, _) = run_with(
        &dir,
        &bob,
        &["--json", "decrypt", "--verify-with", path_str(&bob_pub), "--in", path_str(&sealed)],
    );
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["signature"], "failure");

    // Alice cannot read a message sealed for Bob.
    let (code, _, _) = run_with(&dir, &alice, &["decrypt", "--in", path_str(&sealed)]);
    assert_eq!(code, 1);
}

#[test]
fn sign_and_verify() {
    let dir = TempDir::new("sign");
    assert_eq!(run(&dir, &["keygen", "--user", "alice"]).0, 0);

    let doc = dir.file("doc.txt");
    let sig = dir.file("doc.sig");
    std::fs::write(&doc, "terms\n").expect("write doc");
    assert_eq!(
        run(&dir, &["sign", "--in", path_str(&doc), "--out", path_str(&sig)]).0,
        0
    );

    let (code, stdout, _) = run(
        &dir,
        &["--json", "verify", "--signature", path_str(&sig), "--in", path_str(&doc)],
    );
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["valid"], true);

    std::fs::write(&doc, "altered terms\n").expect("rewrite doc");
    let (code, stdout, _) = run(
        &dir,
        &["--json", "verify", "--signature", path_str(&sig), "--in", path_str(&doc)],
    );
    assert_eq!(code, 1);
    assert_eq!(json(&stdout)["valid"], false);
}

// -----------------------------------------------------------------------
// Passphrases
// -----------------------------------------------------------------------

#[test]
fn passphrase_is_deterministic() {
    let dir = TempDir::new("derive");
    let args = ["--json", "passphrase", "--password", "hunter2", "--salt", SALT];
    let (code, first, _) = run(&dir, &args);
    assert_eq!(code, 0);
    let (_, second, _) = run(&dir, &args);
    assert_eq!(first, second);
    assert_eq!(json(&first)["passphrase"].as_str().map(str::len), Some(64));
}

#[test]
fn passphrase_login_stores_sealed_passphrase() {
    let dir = TempDir::new("login");
    let (_, stdout, _) = run(&dir, &["--json", "passphrase", "--password", "hunter2", "--salt", SALT]);
    let derived = json(&stdout)["passphrase"].as_str().unwrap_or_default().to_string();

    // Lock the key with the derived passphrase, then drop the stored copy
    // so only a login can unlock it.
    assert_eq!(
        run_keyed(&dir, &["keygen", "--user", "carol", "--passphrase", derived.as_str()]).0,
        0
    );
    let holder_path = dir.file("holder.json");
    let mut holder: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&holder_path).expect("read holder"))
            .expect("holder JSON");
    holder["keys"][0]
        .as_object_mut()
        .expect("key object")
        .remove("passphrase");
    std::fs::write(&holder_path, holder.to_string()).expect("write holder");

    let doc = dir.file("doc.txt");
    std::fs::write(&doc, "x").expect("write doc");
    assert_eq!(run_keyed(&dir, &["sign", "--in", path_str(&doc)]).0, 1);

    let (code, _, _) = run_keyed(&dir, &["passphrase", "--password", "wrong", "--salt", SALT, "--login"]);
    assert_eq!(code, 1);

    let (code, _, stderr) = run_keyed(&dir, &["passphrase", "--password", "hunter2", "--salt", SALT, "--login"]);
    assert_eq!(code, 0, "{stderr}");
    assert_eq!(run_keyed(&dir, &["sign", "--in", path_str(&doc)]).0, 0);
}
