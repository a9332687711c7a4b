use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_midips").to_string()
}

#[test]
fn cli_create_apply_roundtrip() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.bin");
    let target = dir.path().join("target.bin");
    let patch = dir.path().join("patch.ips");
    let work = dir.path().join("work.bin");

    std::fs::write(&source, b"abcde12345abcde12345").unwrap();
    std::fs::write(&target, b"abcdeXXXXXabcde1234!").unwrap();
    std::fs::write(&work, b"abcde12345abcde12345").unwrap();

    let st = Command::new(bin())
        .arg("--quiet")
        .arg("create")
        .arg("--source")
        .arg(&source)
        .arg("--target")
        .arg(&target)
        .arg("--output")
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert!(std::fs::read(&patch).unwrap().starts_with(b"PATCH"));

    let st = Command::new(bin())
        .arg("--quiet")
        .arg("apply")
        .arg("--patch")
        .arg(&patch)
        .arg("--file")
        .arg(&work)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&work).unwrap(),
        std::fs::read(&target).unwrap()
    );
}

#[test]
fn cli_short_aliases_and_log_file() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("a.bin");
    let target = dir.path().join("b.bin");
    let patch = dir.path().join("p.ips");
    let log = dir.path().join("hunks.txt");

    std::fs::write(&source, [0u8; 8]).unwrap();
    std::fs::write(&target, [0, 0, 7, 7, 7, 0, 0, 0]).unwrap();

    let st = Command::new(bin())
        .arg("c")
        .arg("-c")
        .arg(&source)
        .arg("-t")
        .arg(&target)
        .arg("-o")
        .arg(&patch)
        .arg("-l")
        .arg(&log)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "Offset: 2\tSize: 1\n");
    assert_eq!(
        std::fs::read(&patch).unwrap(),
        b"PATCH\x00\x00\x02\x00\x00\x00\x03\x07"
    );
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("a.bin");
    let patch = dir.path().join("p.ips");
    std::fs::write(&source, b"same").unwrap();
    std::fs::write(&patch, b"keep me").unwrap();

    let create = |force: bool| {
        let mut cmd = Command::new(bin());
        if force {
            cmd.arg("--force");
        }
        cmd.arg("--quiet")
            .arg("create")
            .arg("-c")
            .arg(&source)
            .arg("-t")
            .arg(&source)
            .arg("-o")
            .arg(&patch)
            .status()
            .unwrap()
    };

    assert!(!create(false).success());
    assert_eq!(std::fs::read(&patch).unwrap(), b"keep me");

    assert!(create(true).success());
    assert_eq!(std::fs::read(&patch).unwrap(), b"PATCH");
}

#[test]
fn cli_force_does_not_clobber_an_input() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("a.bin");
    let target = dir.path().join("b.bin");
    std::fs::write(&source, b"original").unwrap();
    std::fs::write(&target, b"modified").unwrap();

    let out = Command::new(bin())
        .args(["--force", "create", "-c"])
        .arg(&source)
        .arg("-t")
        .arg(&target)
        .arg("-o")
        .arg(&source)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("is also an input file"));
    assert_eq!(std::fs::read(&source).unwrap(), b"original");
}

#[test]
fn cli_apply_rejects_non_ips_input() {
    let dir = tempdir().unwrap();
    let patch = dir.path().join("bad.ips");
    let work = dir.path().join("work.bin");
    std::fs::write(&patch, b"NOTAPATCH").unwrap();
    std::fs::write(&work, b"untouched").unwrap();

    let out = Command::new(bin())
        .args(["apply", "-p"])
        .arg(&patch)
        .arg("-a")
        .arg(&work)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("not a valid IPS patch"));
    assert_eq!(std::fs::read(&work).unwrap(), b"untouched");
}

#[test]
fn cli_inspect_lists_hunks() {
    let dir = tempdir().unwrap();
    let patch = dir.path().join("p.ips");
    std::fs::write(
        &patch,
        b"PATCH\x00\x00\x01\x00\x02\xAB\xCD\x00\x00\x10\x00\x00\x00\x04\x11",
    )
    .unwrap();

    let out = Command::new(bin())
        .arg("inspect")
        .arg(&patch)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(
        stdout,
        "Hunk(0x1, 0x2, 0x0, {0xAB, 0xCD})\nHunk(0x10, 0x0, 0x4, 0x11)\n"
    );
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("a.bin");
    let target = dir.path().join("b.bin");
    let patch = dir.path().join("p.ips");
    std::fs::write(&source, [1u8; 32]).unwrap();
    std::fs::write(&target, [2u8; 32]).unwrap();

    let out = Command::new(bin())
        .args(["--quiet", "--json", "create", "-c"])
        .arg(&source)
        .arg("-t")
        .arg(&target)
        .arg("-o")
        .arg(&patch)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(stats["command"], "create");
    assert_eq!(stats["written"], 1);
    assert_eq!(stats["patch_size"], 13);
}
