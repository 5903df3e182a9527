//! Integration tests for `repoman checkout` and `repoman checkout-list`

use crate::helpers::{TestWorkspace, repoman, rev_parse, run_repoman};
use anyhow::Result;

#[test]
fn test_checkout_follows_remote_default_branch() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let head = ws.add_package("astro", &[("README", "astro\n")], None)?;

  run_repoman(&ws.path, &["checkout", "astro", "--bom", "bom.json"])?;

  assert_eq!(ws.read_file("astro/README")?, "astro\n");
  assert_eq!(rev_parse(&ws.package_path("astro"), "HEAD")?, head);

  let bom: serde_json::Value = serde_json::from_str(&ws.read_file("bom.json")?)?;
  assert_eq!(bom["astro"]["commit"], head.as_str());
  assert_eq!(bom["astro"]["branch"], "main");
  assert!(bom["astro"]["tag"].is_null());

  Ok(())
}

#[test]
fn test_checkout_tag() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let tagged = ws.add_package("astro", &[("VERSION", "1\n")], Some("astro-01-00-00"))?;
  ws.push_commit("astro", &[("VERSION", "2\n")], "Bump")?;

  run_repoman(&ws.path, &["checkout", "astro", "astro-01-00-00", "--bom", "bom.json"])?;

  assert_eq!(ws.read_file("astro/VERSION")?, "1\n");
  let bom: serde_json::Value = serde_json::from_str(&ws.read_file("bom.json")?)?;
  assert_eq!(bom["astro"]["commit"], tagged.as_str());
  assert_eq!(bom["astro"]["tag"], "astro-01-00-00");
  assert!(bom["astro"]["branch"].is_null());

  Ok(())
}

#[test]
fn test_checkout_prefers_first_existing_candidate() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("VERSION", "1\n")], Some("release-1"))?;
  ws.push_commit("astro", &[("VERSION", "2\n")], "Bump")?;

  run_repoman(
    &ws.path,
    &["checkout", "astro", "--prefer", "feature-x", "--prefer", "release-1"],
  )?;

  assert_eq!(ws.read_file("astro/VERSION")?, "1\n");
  Ok(())
}

#[test]
fn test_checkout_expands_package_list() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let pinned = ws.add_package("facilities", &[("VERSION", "1\n")], Some("facilities-01-00-00"))?;
  ws.push_commit("facilities", &[("VERSION", "2\n")], "Bump")?;
  ws.add_package(
    "astro",
    &[("packageList.txt", "# dependencies\nfacilities facilities-01-00-00\n")],
    None,
  )?;

  run_repoman(&ws.path, &["checkout", "astro"])?;

  assert!(ws.file_exists("astro/packageList.txt"));
  assert_eq!(ws.read_file("facilities/VERSION")?, "1\n");
  assert_eq!(rev_parse(&ws.package_path("facilities"), "HEAD")?, pinned);

  Ok(())
}

#[test]
fn test_checkout_ignore_pins_uses_head() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("facilities", &[("VERSION", "1\n")], Some("facilities-01-00-00"))?;
  let latest = ws.push_commit("facilities", &[("VERSION", "2\n")], "Bump")?;
  ws.add_package("astro", &[("packageList.txt", "facilities facilities-01-00-00\n")], None)?;

  run_repoman(&ws.path, &["checkout", "astro", "--ignore-pins"])?;

  assert_eq!(rev_parse(&ws.package_path("facilities"), "HEAD")?, latest);
  Ok(())
}

#[test]
fn test_checkout_list() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("README", "astro\n")], Some("astro-01-02-03"))?;
  ws.add_package("facilities", &[("README", "facilities\n")], None)?;
  std::fs::write(
    ws.path.join("list.txt"),
    "astro astro-01-02-03  # pinned\n\nfacilities main\n",
  )?;

  let output = run_repoman(&ws.path, &["checkout-list", "list.txt", "--bom", "bom.json"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Checked out 2 package(s)"), "stdout: {}", stdout);

  let bom: serde_json::Value = serde_json::from_str(&ws.read_file("bom.json")?)?;
  let names: Vec<_> = bom.as_object().unwrap().keys().cloned().collect();
  assert_eq!(names, ["astro", "facilities"]);

  Ok(())
}

#[test]
fn test_checkout_is_repeatable() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("VERSION", "1\n")], None)?;

  run_repoman(&ws.path, &["checkout", "astro"])?;
  let latest = ws.push_commit("astro", &[("VERSION", "2\n")], "Bump")?;
  run_repoman(&ws.path, &["checkout", "astro", "origin/main", "--force"])?;

  assert_eq!(rev_parse(&ws.package_path("astro"), "HEAD")?, latest);
  assert_eq!(ws.read_file("astro/VERSION")?, "2\n");
  Ok(())
}

#[test]
fn test_unreachable_remote_is_system_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = repoman(&ws.path, &["checkout", "missing"])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Unable to fetch missing"), "stderr: {}", stderr);
  assert!(stderr.contains("missing.git"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_malformed_package_list_is_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  std::fs::write(ws.path.join("list.txt"), "astro\n")?;

  let output = repoman(&ws.path, &["checkout-list", "list.txt"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Malformed manifest line 1"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_forced_checkout_moves_branch_to_upstream() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("astro", &[("VERSION", "1\n")], None)?;

  run_repoman(&ws.path, &["checkout", "astro"])?;
  let upstream = ws.push_commit("astro", &[("VERSION", "2\n")], "Bump")?;
  run_repoman(&ws.path, &["checkout", "astro", "main", "--force", "--bom", "bom.json"])?;

  let package = ws.package_path("astro");
  assert_eq!(rev_parse(&package, "HEAD")?, upstream);
  assert_eq!(rev_parse(&package, "main")?, upstream);
  assert_eq!(ws.read_file("astro/VERSION")?, "2\n");

  let bom: serde_json::Value = serde_json::from_str(&ws.read_file("bom.json")?)?;
  assert_eq!(bom["astro"]["commit"], upstream.as_str());
  assert_eq!(bom["astro"]["branch"], "main");
  Ok(())
}

#[test]
fn test_checkout_in_place() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let head = ws.add_package("astro", &[("README", "astro\n")], None)?;

  run_repoman(&ws.path, &["checkout", "astro", "--in-place"])?;

  assert_eq!(ws.read_file("README")?, "astro\n");
  assert_eq!(rev_parse(&ws.path, "HEAD")?, head);
  assert!(ws.file_exists("repoman.toml"));
  assert!(!ws.file_exists("astro"));
  Ok(())
}
