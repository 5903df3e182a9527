//! Integration tests for `repoman release`, `release-prepare` and `release-perform`

use crate::helpers::{TestWorkspace, git, repoman, rev_parse, run_repoman};
use anyhow::Result;

const CHANGELOG: &str = "# Changelog\n\n## astro-01-02-03 (2024-01-01)\n\nFirst release\n";

/// astro published at astro-01-02-03 and checked out with a committer identity
fn released_astro() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("CHANGELOG.md", CHANGELOG)], Some("astro-01-02-03"))?;
  run_repoman(&ws.path, &["checkout", "astro"])?;
  ws.configure_identity("astro")?;
  Ok(ws)
}

fn remote_tags(ws: &TestWorkspace, name: &str) -> Result<String> {
  let output = git(&ws.remote_path(name), &["tag", "-l"])?;
  Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[test]
fn test_prepare_records_intent_and_changelog() -> Result<()> {
  let ws = released_astro()?;
  let head = rev_parse(&ws.package_path("astro"), "HEAD")?;

  let output = run_repoman(&ws.path, &["release-prepare", "astro", "Fix the thing", "--patch"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Prepared release astro-01-02-04"), "stdout: {}", stdout);

  let intent: serde_json::Value = serde_json::from_str(&ws.read_file("astro/target/repoman/release.json")?)?;
  assert_eq!(intent["tag"], "astro-01-02-04");
  assert_eq!(intent["current_ref"], head.as_str());

  let changelog = ws.read_file("astro/CHANGELOG.md")?;
  let new_entry = changelog.find("## astro-01-02-04").expect("new entry");
  let old_entry = changelog.find("## astro-01-02-03").expect("old entry");
  assert!(new_entry < old_entry);
  assert!(changelog.contains("Fix the thing"));

  // Nothing is tagged until perform
  assert!(!remote_tags(&ws, "astro")?.contains("astro-01-02-04"));
  Ok(())
}

#[test]
fn test_perform_commits_tags_and_pushes() -> Result<()> {
  let ws = released_astro()?;
  run_repoman(&ws.path, &["release-prepare", "astro", "Fix the thing", "--patch"])?;

  let output = run_repoman(&ws.path, &["release-perform", "astro"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("completed and pushed"), "stdout: {}", stdout);

  let package = ws.package_path("astro");
  let subject = git(&package, &["log", "-1", "--format=%s"])?;
  assert_eq!(
    String::from_utf8_lossy(&subject.stdout).trim(),
    "[repoman-release] Prepare release astro-01-02-04"
  );
  assert_eq!(rev_parse(&package, "astro-01-02-04")?, rev_parse(&package, "HEAD")?);
  assert!(remote_tags(&ws, "astro")?.contains("astro-01-02-04"));

  Ok(())
}

#[test]
fn test_perform_twice_is_rejected() -> Result<()> {
  let ws = released_astro()?;
  run_repoman(&ws.path, &["release", "astro", "Fix the thing", "--patch"])?;

  let output = repoman(&ws.path, &["release-perform", "astro"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("tag already exists"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_perform_without_prepare_is_rejected() -> Result<()> {
  let ws = released_astro()?;

  let output = repoman(&ws.path, &["release-perform", "astro"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("no release is currently prepared"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_release_without_bump_at_tag_is_rejected() -> Result<()> {
  let ws = released_astro()?;

  let output = repoman(&ws.path, &["release", "astro", "Nothing new"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("no bump was requested"), "stderr: {}", stderr);
  assert!(!ws.file_exists("astro/target/repoman/release.json"));

  Ok(())
}

#[test]
fn test_prepare_rejects_dirty_tree() -> Result<()> {
  let ws = released_astro()?;
  std::fs::write(ws.package_path("astro").join("CHANGELOG.md"), "edited\n")?;

  let output = repoman(&ws.path, &["release-prepare", "astro", "Fix", "--patch"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("dirty working tree"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_release_tags_dependencies_without_push() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let pinned = ws.add_package("facilities", &[("VERSION", "1\n")], Some("facilities-01-00-00"))?;
  ws.push_commit("facilities", &[("VERSION", "2\n")], "Bump")?;
  ws.add_package(
    "astro",
    &[("packageList.txt", "facilities facilities-01-00-00\n")],
    Some("astro-01-00-00"),
  )?;

  run_repoman(&ws.path, &["checkout", "astro"])?;
  ws.configure_identity("astro")?;
  ws.configure_identity("facilities")?;

  let output = run_repoman(&ws.path, &["release", "astro", "Minor release", "--minor", "--no-push"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Tagged dependency: facilities"), "stdout: {}", stdout);
  assert!(stdout.contains("(not pushed)"), "stdout: {}", stdout);

  assert_eq!(rev_parse(&ws.package_path("facilities"), "astro-01-01-00")?, pinned);
  assert!(!remote_tags(&ws, "astro")?.contains("astro-01-01-00"));
  assert!(!remote_tags(&ws, "facilities")?.contains("astro-01-01-00"));

  Ok(())
}

#[test]
fn test_release_requires_checked_out_package() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = repoman(&ws.path, &["release", "astro", "Fix", "--patch"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("is not checked out"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_prepare_ignores_tags_of_longer_package_names() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("VERSION", "1\n")], Some("astro-01-02-03"))?;
  ws.push_commit("astro", &[("VERSION", "2\n")], "Bump")?;
  // Left behind when astro-tools was released with astro as a dependency
  ws.push_tag("astro", "astro-tools-01-00-00")?;

  run_repoman(&ws.path, &["checkout", "astro"])?;
  ws.configure_identity("astro")?;
  run_repoman(&ws.path, &["release-prepare", "astro", "Follow-up"])?;

  let intent: serde_json::Value = serde_json::from_str(&ws.read_file("astro/target/repoman/release.json")?)?;
  assert_eq!(intent["tag"], "astro-01-02-04");
  Ok(())
}
