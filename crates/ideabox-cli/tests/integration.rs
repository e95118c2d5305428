#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ideabox(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ideabox").unwrap();
    cmd.current_dir(dir.path())
        .env("IDEABOX_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    ideabox(dir).arg("init").assert().success();
}

fn create(dir: &TempDir, title: &str, area: &str) {
    ideabox(dir)
        .args(["create", title, "--area", area])
        .assert()
        .success();
}

fn json_output(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let out = ideabox(dir).arg("--json").args(args).output().unwrap();
    assert!(out.status.success(), "{:?} failed: {}", args, String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

// ---------------------------------------------------------------------------
// ideabox init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_stage_tree() {
    let dir = TempDir::new().unwrap();
    ideabox(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: ideas/config.yaml"));

    for stage in ["backlog", "active", "done"] {
        assert!(dir.path().join("ideas").join(stage).is_dir());
    }
    let config = read(&dir, "ideas/config.yaml");
    assert!(config.contains("model-selector"));
}

#[test]
fn init_is_idempotent_and_keeps_config() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join("ideas/config.yaml"), "areas: [cli]\n").unwrap();
    ideabox(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  ideas/config.yaml"));
    assert_eq!(read(&dir, "ideas/config.yaml"), "areas: [cli]\n");
}

#[test]
fn commands_fail_before_init() {
    let dir = TempDir::new().unwrap();
    ideabox(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ideabox init"));
}

// ---------------------------------------------------------------------------
// ideabox create / list / show
// ---------------------------------------------------------------------------

#[test]
fn create_writes_front_matter_into_backlog() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    ideabox(&dir)
        .args([
            "create",
            "Color Themes",
            "--area",
            "global",
            "--effort",
            "medium",
            "--file",
            "src/theme.rs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created idea: color-themes"));

    let doc = read(&dir, "ideas/backlog/color-themes/idea.md");
    assert!(doc.starts_with("---\n"));
    assert!(doc.contains("title: Color Themes"));
    assert!(doc.contains("status: idea"));
    assert!(doc.contains("effort: medium"));
    assert!(doc.contains("src/theme.rs"));
}

#[test]
fn create_duplicate_title_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Color Themes", "global");

    ideabox(&dir)
        .args(["create", "color themes", "--area", "header"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn create_rejects_unknown_area_and_level() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    ideabox(&dir)
        .args(["create", "Sidebar", "--area", "sidebar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("area"));
    ideabox(&dir)
        .args(["create", "Sidebar", "--area", "global", "--risk", "extreme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("low, medium, high"));
    assert!(!dir.path().join("ideas/backlog/sidebar").exists());
}

#[test]
fn list_filters_and_json() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Footer Clock", "footer");
    create(&dir, "Header Tabs", "header");

    ideabox(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("footer-clock"))
        .stdout(predicate::str::contains("header-tabs"));

    let listed = json_output(&dir, &["list", "--area", "footer"]);
    let items = listed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "footer-clock");
    assert_eq!(items[0]["stage"], "backlog");

    let active = json_output(&dir, &["list", "--stage", "active"]);
    assert!(active.as_array().unwrap().is_empty());
}

#[test]
fn list_rejects_unknown_stage() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    ideabox(&dir)
        .args(["list", "--stage", "archived"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backlog"));
}

#[test]
fn show_missing_idea_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    ideabox(&dir)
        .args(["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ---------------------------------------------------------------------------
// lifecycle
// ---------------------------------------------------------------------------

#[test]
fn color_themes_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Color Themes", "global");
    std::fs::write(
        dir.path().join("ideas/backlog/color-themes/notes.md"),
        "palette ideas",
    )
    .unwrap();

    ideabox(&dir)
        .args(["promote", "color-themes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backlog -> active"))
        .stderr(predicate::str::contains("without being marked ready"));
    assert!(dir.path().join("ideas/active/color-themes/PRD.md").exists());
    assert!(!dir.path().join("ideas/backlog/color-themes").exists());

    ideabox(&dir)
        .args(["park", "color-themes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status ready"));
    assert_eq!(
        read(&dir, "ideas/backlog/color-themes/notes.md"),
        "palette ideas"
    );

    ideabox(&dir)
        .args(["complete", "color-themes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status is ready"));
    assert!(dir.path().join("ideas/backlog/color-themes/idea.md").exists());
}

#[test]
fn ready_then_promote_without_id() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Hotkeys", "input");
    create(&dir, "Not Yet", "input");

    ideabox(&dir).args(["ready", "hotkeys"]).assert().success();
    ideabox(&dir).arg("promote").assert().success();
    ideabox(&dir).arg("complete").assert().success();

    let doc = read(&dir, "ideas/done/hotkeys/idea.md");
    assert!(doc.contains("status: done"));
    assert!(dir.path().join("ideas/backlog/not-yet/idea.md").exists());
}

#[test]
fn promote_without_id_ignores_unready_ideas() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Only One", "global");

    ideabox(&dir)
        .arg("promote")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no ready idea to promote"));
    assert!(dir.path().join("ideas/backlog/only-one/idea.md").exists());
}

#[test]
fn ambiguous_park_asks_for_an_id() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Alpha", "global");
    create(&dir, "Beta", "global");
    ideabox(&dir).args(["promote", "alpha"]).assert().success();
    ideabox(&dir).args(["promote", "beta"]).assert().success();

    ideabox(&dir)
        .arg("park")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass an id"));
    assert!(dir.path().join("ideas/active/alpha").is_dir());
    assert!(dir.path().join("ideas/active/beta").is_dir());
}

#[test]
fn json_errors_carry_a_kind() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Solo", "global");

    let out = ideabox(&dir)
        .args(["--json", "complete", "solo"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .find(|l| l.starts_with('{'))
        .expect("json error line");
    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(value["error"]["kind"], "invalid_transition");
}

#[test]
fn promote_json_lists_advisories() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    ideabox(&dir)
        .args(["create", "Top", "--area", "global", "--depends-on", "base", "--ready"])
        .assert()
        .success();

    let t = json_output(&dir, &["promote", "top"]);
    assert_eq!(t["from"], "backlog");
    assert_eq!(t["to"], "active");
    assert_eq!(t["record"]["status"], "active");
    let kinds: Vec<&str> = t["advisories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"missing_dependency"));
    assert!(kinds.contains(&"requirements_created"));
    assert!(!kinds.contains(&"promoted_from_idea"));
}

// ---------------------------------------------------------------------------
// ideabox edit
// ---------------------------------------------------------------------------

#[test]
fn edit_backlog_keeps_id() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Color Themes", "global");

    ideabox(&dir)
        .args(["edit", "color-themes", "--title", "Colour Themes", "--impact", "high"])
        .assert()
        .success();
    let doc = read(&dir, "ideas/backlog/color-themes/idea.md");
    assert!(doc.contains("title: Colour Themes"));
    assert!(doc.contains("impact: high"));
}

#[test]
fn edit_active_only_appends_files() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Busy", "global");
    ideabox(&dir).args(["promote", "busy"]).assert().success();

    ideabox(&dir)
        .args(["edit", "busy", "--add-file", "src/busy.rs"])
        .assert()
        .success();
    ideabox(&dir)
        .args(["edit", "busy", "--title", "Renamed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot edit 'title'"));

    let doc = read(&dir, "ideas/active/busy/idea.md");
    assert!(doc.contains("src/busy.rs"));
    assert!(doc.contains("title: Busy"));
}

#[test]
fn edit_without_fields_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Quiet", "global");
    ideabox(&dir)
        .args(["edit", "quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

// ---------------------------------------------------------------------------
// ideabox check / repair
// ---------------------------------------------------------------------------

#[test]
fn check_reports_mismatch_and_repair_clears_it() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Drifted", "global");
    let path = dir.path().join("ideas/backlog/drifted/idea.md");
    let doc = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, doc.replace("status: idea", "status: done")).unwrap();

    ideabox(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("status_mismatch"));
    ideabox(&dir)
        .args(["promote", "drifted"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity"));

    ideabox(&dir)
        .args(["repair", "drifted", "--trust", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drifted: done / done"));
    assert!(dir.path().join("ideas/done/drifted/idea.md").exists());

    ideabox(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));
}

#[test]
fn check_reports_folder_without_metadata() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let stray = dir.path().join("ideas/backlog/color-themes");
    std::fs::create_dir_all(&stray).unwrap();
    std::fs::write(stray.join("notes.md"), "orphan").unwrap();

    ideabox(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("orphaned"));
    ideabox(&dir)
        .args(["create", "Color Themes", "--area", "global"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists in backlog"));
    assert!(!stray.join("idea.md").exists());
}

#[test]
fn repair_rejects_unknown_trust() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    ideabox(&dir)
        .args(["repair", "anything", "--trust", "folder"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// ideabox artifact
// ---------------------------------------------------------------------------

#[test]
fn artifact_add_list_show() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Mockups", "header");
    let src = dir.path().join("sketch.txt");
    std::fs::write(&src, "boxes and arrows").unwrap();

    ideabox(&dir)
        .args(["artifact", "add", "mockups"])
        .arg(&src)
        .assert()
        .success();
    ideabox(&dir)
        .args(["artifact", "add", "mockups"])
        .arg(&src)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ideabox(&dir)
        .args(["artifact", "list", "mockups"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sketch.txt"));
    ideabox(&dir)
        .args(["artifact", "show", "mockups", "sketch.txt"])
        .assert()
        .success()
        .stdout("boxes and arrows");
}

#[test]
fn artifact_add_refuses_metadata_name() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    create(&dir, "Sneaky", "global");
    let src = dir.path().join("x.md");
    std::fs::write(&src, "---\n---\n").unwrap();

    ideabox(&dir)
        .args(["artifact", "add", "sneaky", "--name", "idea.md"])
        .arg(&src)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid artifact filename"));
}

// ---------------------------------------------------------------------------
// ideabox config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    ideabox(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_flags_empty_areas() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join("ideas/config.yaml"), "areas: []\n").unwrap();
    ideabox(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}
