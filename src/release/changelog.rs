//! Release notes in the package changelog

use crate::core::error::{RepoResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};

/// First changelog candidate that exists in the package
pub fn find_changelog(package_dir: &Path, candidates: &[String]) -> Option<PathBuf> {
  candidates
    .iter()
    .map(|name| package_dir.join(name))
    .find(|path| path.is_file())
}

pub fn render_entry(tag: &str, date: &str, message: &str) -> String {
  format!("## {} ({})\n\n{}\n\n", tag, date, message.trim_end())
}

/// Insert `entry` above the first version heading, or append it when the
/// file has none. A version heading is a Markdown heading containing a digit.
pub fn insert_entry(existing: &str, entry: &str) -> String {
  let mut offset = 0;
  for line in existing.split_inclusive('\n') {
    if line.starts_with('#') && line.chars().any(|c| c.is_ascii_digit()) {
      return format!("{}{}{}", &existing[..offset], entry, &existing[offset..]);
    }
    offset += line.len();
  }

  let mut content = existing.to_string();
  if !content.is_empty() {
    if !content.ends_with('\n') {
      content.push('\n');
    }
    if !content.ends_with("\n\n") {
      content.push('\n');
    }
  }
  content.push_str(entry);
  content
}

/// Add a release entry dated today (UTC) to the changelog at `path`
pub fn update_changelog(path: &Path, tag: &str, message: &str) -> RepoResult<()> {
  let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
  let existing =
    fs::read_to_string(path).with_context(|| format!("Failed to read changelog {}", path.display()))?;
  let updated = insert_entry(&existing, &render_entry(tag, &date, message));
  fs::write(path, updated).with_context(|| format!("Failed to write changelog {}", path.display()))
}
