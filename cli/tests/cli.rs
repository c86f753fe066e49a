/*
 * cli.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Process-level tests for the gemlet binary. Only invalid input is exercised, so no
 * test here touches the network.
 */

use std::process::Command;

fn gemlet(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_gemlet"))
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run gemlet")
}

#[test]
fn wrong_scheme_exits_with_usage_error() {
    let out = gemlet(&["not-gemini://example.org/"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("scheme"));
}

#[test]
fn overlong_uri_rejected_without_resolving() {
    // .invalid never resolves, so reaching the network would show up as exit status 1
    let long = format!("gemini://host.invalid/{}", "a".repeat(1024));
    let out = gemlet(&[&long]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_argument_is_a_usage_error() {
    let out = gemlet(&[]);
    assert_eq!(out.status.code(), Some(2));
}
