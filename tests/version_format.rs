//! Checks on the version string embedded by `build.rs`.

const VERSION: &str = env!("WORKTABS_VERSION");

/// Split `1.2.3-rc.1` into its numeric core and optional pre-release suffix.
fn split(version: &str) -> (Vec<&str>, Option<&str>) {
    let (core, pre) = match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    };
    (core.split('.').collect(), pre)
}

#[test]
fn core_is_three_numeric_components() {
    let (core, _) = split(VERSION);
    assert_eq!(core.len(), 3, "unexpected version {VERSION:?}");
    for part in core {
        assert!(
            part.parse::<u64>().is_ok(),
            "component {part:?} of {VERSION:?} is not numeric"
        );
    }
}

#[test]
fn tag_prefix_is_stripped() {
    assert!(!VERSION.starts_with('v'), "got {VERSION:?}");
}

#[test]
fn local_builds_carry_the_dev_marker() {
    let (_, pre) = split(VERSION);
    if pre == Some("dev") {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(VERSION.starts_with("0.0.0"));
    }
}
