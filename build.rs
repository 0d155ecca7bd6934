//! Embeds the release version as `WORKTABS_VERSION`.
//!
//! CI sets `WORKTABS_RELEASE_VERSION` from the git tag (`v1.2.3`); local builds
//! fall back to the `0.0.0-dev` marker in Cargo.toml and get `cfg(dev_build)`,
//! which moves data and config under `worktabs-dev`.

const RELEASE_VAR: &str = "WORKTABS_RELEASE_VERSION";

fn main() {
    println!("cargo:rerun-if-env-changed={RELEASE_VAR}");
    println!("cargo:rustc-check-cfg=cfg(dev_build)");

    let version = match std::env::var(RELEASE_VAR) {
        Ok(tag) => release_version(&tag),
        Err(_) => env!("CARGO_PKG_VERSION").to_string(),
    };

    if version.ends_with("-dev") {
        println!("cargo:rustc-cfg=dev_build");
    }
    println!("cargo:rustc-env=WORKTABS_VERSION={version}");
}

/// `v1.2.3` and `1.2.3` both become `1.2.3`. A tag that does not start with a
/// digit after the prefix fails the build.
fn release_version(tag: &str) -> String {
    let version = tag.trim().trim_start_matches('v');
    if !version.starts_with(|c: char| c.is_ascii_digit()) {
        panic!("{RELEASE_VAR}={tag:?} is not a version tag");
    }
    version.to_string()
}
