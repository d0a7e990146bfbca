//! Build script for prdigest: embeds version information for `--version`.
//!
//! The reported string is `{CARGO_PKG_VERSION} ({git describe}) {rustc -V}`,
//! dropping whichever parts cannot be determined. Builds from a source tarball
//! without git therefore still get a usable version line.

use std::process::Command;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

/// Runs a command and returns its trimmed stdout, or `None` if it failed or
/// printed nothing.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn build_info() -> String {
    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        command_output("git", &["describe", "--tags", "--always", "--dirty"])
            .map(|desc| format!("({desc})")),
        command_output("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
