//! Integration tests for system and project detection.

use tempfile::TempDir;

use agentwire_core::detection::{
    DetectionCache, DetectionSpec, StaticProbe, detect_in_project, detect_on_system,
};
use agentwire_core::fs::expand::expand_path_with;
use agentwire_core::fs::path_exists;
use agentwire_core::platform::Platform;
use agentwire_core::registry::AgentRegistry;

#[test]
fn failing_command_and_existing_path_detects() {
    let temp = TempDir::new().expect("create temp dir");
    let app = temp.path().join("Cursor.app");
    std::fs::create_dir(&app).expect("mkdir");
    let probe = StaticProbe::new(Vec::<String>::new());

    let spec = DetectionSpec::new()
        .command("cursor")
        .path(app.to_string_lossy());
    assert!(detect_on_system(&spec, Platform::Darwin, &probe));
}

#[test]
fn all_failing_checks_do_not_detect() {
    let temp = TempDir::new().expect("create temp dir");
    let probe = StaticProbe::new(["something-else"]);

    let spec = DetectionSpec::new()
        .command("cursor")
        .path(temp.path().join("missing").to_string_lossy());
    assert!(!detect_on_system(&spec, Platform::Linux, &probe));
}

#[test]
fn empty_spec_does_not_detect() {
    let temp = TempDir::new().expect("create temp dir");
    let probe = StaticProbe::new(["cursor"]);

    assert!(!detect_on_system(&DetectionSpec::new(), Platform::Windows, &probe));
    assert!(!detect_in_project(&DetectionSpec::new(), temp.path()));
}

#[test]
fn wildcard_paths_match_prefixed_entries() {
    let temp = TempDir::new().expect("create temp dir");
    std::fs::create_dir_all(temp.path().join("JetBrains/PhpStorm2024.3")).expect("mkdir");
    let probe = StaticProbe::new(Vec::<String>::new());

    let hit = DetectionSpec::new().path(temp.path().join("JetBrains/PhpStorm*").to_string_lossy());
    let miss = DetectionSpec::new().path(temp.path().join("JetBrains/Rider*").to_string_lossy());

    assert!(detect_on_system(&hit, Platform::Linux, &probe));
    assert!(!detect_on_system(&miss, Platform::Linux, &probe));
}

#[test]
fn variables_and_home_are_expanded() {
    let temp = TempDir::new().expect("create temp dir");
    std::fs::create_dir_all(temp.path().join("Programs/Cursor")).expect("mkdir");
    let root = temp.path().to_string_lossy().into_owned();
    let lookup = |name: &str| (name == "LOCALAPPDATA").then(|| root.clone());

    let windows_style = expand_path_with("%LOCALAPPDATA%/Programs/Cursor", None, lookup)
        .expect("expanded");
    assert!(path_exists(&windows_style));

    let unix_style = expand_path_with("${LOCALAPPDATA}/Programs/Cursor", None, lookup)
        .expect("expanded");
    assert_eq!(unix_style, windows_style);

    let home = expand_path_with("~/Programs/*", Some(temp.path()), lookup).expect("expanded");
    assert!(path_exists(&home));

    assert!(expand_path_with("%UNSET_VAR%/x", None, lookup).is_none());
    assert!(expand_path_with("~/x", None, lookup).is_none());
}

#[test]
fn project_markers_select_agents() {
    let temp = TempDir::new().expect("create temp dir");
    std::fs::create_dir(temp.path().join(".junie")).expect("mkdir");
    std::fs::write(temp.path().join("CLAUDE.md"), "# Claude").expect("write");
    std::fs::write(temp.path().join("opencode.json"), "{}").expect("write");
    // A file where a directory marker is expected does not count.
    std::fs::write(temp.path().join(".cursor"), "").expect("write");

    let registry = AgentRegistry::with_default_agents();
    let names: Vec<_> = registry
        .detect_in_project(temp.path())
        .into_iter()
        .map(|a| a.name())
        .collect();

    assert_eq!(names, vec!["claude-code", "junie", "opencode"]);
}

#[test]
fn system_sweep_is_memoized_per_platform() {
    let registry = AgentRegistry::with_default_agents();
    let mut cache = DetectionCache::new();

    let probe = StaticProbe::new(["claude", "opencode"]);
    let linux: Vec<_> = registry
        .detect_on_system(Platform::Linux, &probe, &mut cache)
        .into_iter()
        .map(|a| a.name())
        .collect();
    assert!(linux.contains(&"claude-code"));
    assert!(linux.contains(&"opencode"));
    assert_eq!(cache.get("claude-code", Platform::Linux), Some(true));
    assert_eq!(cache.get("claude-code", Platform::Darwin), None);

    // A different probe does not change memoized answers.
    let nothing = StaticProbe::new(Vec::<String>::new());
    let again = registry.detect_on_system(Platform::Linux, &nothing, &mut cache);
    assert!(again.iter().any(|a| a.name() == "claude-code"));

    cache.clear();
    let fresh = registry.detect_on_system(Platform::Linux, &nothing, &mut cache);
    assert!(!fresh.iter().any(|a| a.name() == "claude-code"));
}
