//! Tests for the `shelf` binary

use super::common::TestContext;
use predicates::prelude::*;
use std::fs;

fn publish(ctx: &TestContext, name: &str, version: &str) {
    let source = ctx.source(name, &[("bin/run", "#!/bin/sh\necho hi\n"), ("README", name)]);
    ctx.shelf()
        .arg("publish")
        .arg(&source)
        .args(["--name", name, "--version", version])
        .args(["--remote", ctx.remote().as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Published"));
}

fn listing(ctx: &TestContext, entries: &[(&str, &str)]) {
    let mut yaml = String::from("dependencies:\n");
    for (name, version) in entries {
        yaml.push_str(&format!(
            "  - name: {}\n    version: \"{}\"\n    remote: \"{}\"\n    local: vendor/{}\n",
            name,
            version,
            ctx.remote(),
            name
        ));
    }
    ctx.write_listing(&yaml);
}

#[test]
fn test_publish_install_verify() {
    let ctx = TestContext::new();
    publish(&ctx, "tool", "1.0.0");
    listing(&ctx, &[("tool", "1.0.0")]);

    ctx.shelf()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 installed"));

    assert_eq!(
        fs::read_to_string(ctx.project().join("vendor/tool/README")).unwrap(),
        "tool"
    );

    ctx.shelf()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 up to date"));

    ctx.shelf()
        .arg("verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("verified successfully"));
}

#[test]
fn test_publish_twice_fails() {
    let ctx = TestContext::new();
    publish(&ctx, "tool", "1.0.0");

    let source = ctx.source("tool", &[("README", "changed")]);
    ctx.shelf()
        .arg("publish")
        .arg(&source)
        .args(["--name", "tool", "--version", "1.0.0"])
        .args(["--remote", ctx.remote().as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Already exists"));
}

#[test]
fn test_install_reports_failures_with_exit_code() {
    let ctx = TestContext::new();
    publish(&ctx, "present", "1");
    listing(&ctx, &[("present", "1"), ("missing", "1")]);

    ctx.shelf()
        .arg("install")
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing 1: Not found"))
        .stderr(predicate::str::contains("1 of 2 dependencies failed"));

    assert!(ctx.project().join("vendor/present/README").exists());
}

#[test]
fn test_verify_detects_damage() {
    let ctx = TestContext::new();
    publish(&ctx, "tool", "1");
    listing(&ctx, &[("tool", "1")]);
    ctx.shelf().arg("install").assert().success();

    // Same size, different bytes
    fs::write(ctx.project().join("vendor/tool/README"), "TOOL").unwrap();

    ctx.shelf()
        .arg("verify")
        .assert()
        .failure()
        .stdout(predicate::str::contains("checksum mismatch"));

    // Quick verification only compares sizes
    ctx.shelf().args(["verify", "--quick"]).assert().success();

    // Install repairs it
    ctx.shelf()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 reinstalled"));
    assert_eq!(
        fs::read_to_string(ctx.project().join("vendor/tool/README")).unwrap(),
        "tool"
    );
}

#[test]
fn test_invalid_listing_is_rejected() {
    let ctx = TestContext::new();
    ctx.write_listing(
        "dependencies:\n  - { name: a, version: \"1\", remote: \"memory://r\", local: x }\n  - { name: a, version: \"2\", remote: \"memory://r\", local: x }\n",
    );

    ctx.shelf()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid dependency listing"));
}

#[test]
fn test_missing_listing() {
    let ctx = TestContext::new();
    ctx.shelf()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("shelf.yaml"));
}
