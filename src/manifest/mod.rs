//! Package manifests (`packageList.txt`)
//!
//! A manifest is a line-oriented file of `<name>[/<subpath>] <ref>` entries
//! with optional `#` comments. The in-memory form keeps every line's original
//! bytes, so a manifest that is read and written back without changes is
//! byte-identical, and an update only touches the lines it has to.

mod spec;

pub use spec::PackageSpec;

use crate::core::error::{ParseError, RepoError, RepoResult, ResultExt};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One physical line of a manifest, terminator included
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLine {
  Entry {
    spec: PackageSpec,
    /// Trailing comment starting at `#`
    comment: Option<String>,
    raw: String,
  },
  /// Blank or comment-only line
  Verbatim(String),
}

impl ManifestLine {
  fn raw(&self) -> &str {
    match self {
      ManifestLine::Entry { raw, .. } => raw,
      ManifestLine::Verbatim(raw) => raw,
    }
  }

  fn raw_mut(&mut self) -> &mut String {
    match self {
      ManifestLine::Entry { raw, .. } => raw,
      ManifestLine::Verbatim(raw) => raw,
    }
  }
}

/// Ordered manifest contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
  lines: Vec<ManifestLine>,
}

impl Manifest {
  /// Parse manifest text. Fails on the first malformed line.
  pub fn parse(text: &str) -> Result<Self, ParseError> {
    let mut lines = Vec::new();

    for (index, raw) in text.split_inclusive('\n').enumerate() {
      let (content, _) = split_terminator(raw);
      let (body, comment) = strip_comment(content);
      let tokens: Vec<&str> = body.split_whitespace().collect();

      let malformed = |reason: &str| ParseError {
        path: None,
        line_number: index + 1,
        line: content.to_string(),
        reason: reason.to_string(),
      };

      match tokens.as_slice() {
        [] => lines.push(ManifestLine::Verbatim(raw.to_string())),
        [key, reference] => {
          let spec = PackageSpec::parse_key(key, Some(reference.to_string()))
            .map_err(|e| malformed(&e.to_string()))?;
          lines.push(ManifestLine::Entry {
            spec,
            comment: comment.map(str::to_string),
            raw: raw.to_string(),
          });
        }
        [_] => return Err(malformed("expected `<package> <ref>`, found only a package")),
        _ => return Err(malformed("expected `<package> <ref>`, found extra tokens")),
      }
    }

    Ok(Self { lines })
  }

  /// Render the manifest; unchanged lines come out byte-for-byte
  pub fn serialize(&self) -> String {
    self.lines.iter().map(ManifestLine::raw).collect()
  }

  /// Specs of all entries, in file order
  pub fn specs(&self) -> Vec<PackageSpec> {
    self
      .lines
      .iter()
      .filter_map(|line| match line {
        ManifestLine::Entry { spec, .. } => Some(spec.clone()),
        ManifestLine::Verbatim(_) => None,
      })
      .collect()
  }

  pub fn lines(&self) -> &[ManifestLine] {
    &self.lines
  }

  pub fn is_empty(&self) -> bool {
    self.specs().is_empty()
  }

  /// Merge new specs into the manifest.
  ///
  /// Matching entries (by `name[/subpath]`) get the new ref and keep their
  /// comment and terminator; entries not mentioned are left alone; unknown
  /// specs are appended in the order given. Every spec must carry a ref.
  pub fn update(&mut self, new_specs: &[PackageSpec]) -> RepoResult<()> {
    if let Some(spec) = new_specs.iter().find(|s| s.reference.is_none()) {
      return Err(RepoError::message(format!(
        "Cannot write {} to a manifest without a ref",
        spec.key()
      )));
    }

    let mut by_key: IndexMap<String, &PackageSpec> = IndexMap::new();
    for spec in new_specs {
      by_key.insert(spec.key(), spec);
    }

    let mut matched = HashSet::new();
    for line in &mut self.lines {
      let ManifestLine::Entry { spec, comment, raw } = line else {
        continue;
      };
      let key = spec.key();
      let Some(new_spec) = by_key.get(&key) else {
        continue;
      };
      matched.insert(key);
      if *spec == **new_spec {
        continue;
      }

      let (_, terminator) = split_terminator(raw);
      let rewritten = format!("{}{}", format_entry(new_spec, comment.as_deref()), terminator);
      *spec = (*new_spec).clone();
      *raw = rewritten;
    }

    let terminator = self.preferred_terminator();
    for (key, spec) in by_key {
      if matched.contains(&key) {
        continue;
      }
      if let Some(last) = self.lines.last_mut()
        && !last.raw().ends_with('\n')
      {
        last.raw_mut().push_str(terminator);
      }
      self.lines.push(ManifestLine::Entry {
        spec: spec.clone(),
        comment: None,
        raw: format!("{}{}", format_entry(spec, None), terminator),
      });
    }

    Ok(())
  }

  /// Read and parse a manifest file
  pub fn read(path: &Path) -> RepoResult<Self> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    Self::parse(&text).map_err(|mut e| {
      e.path = Some(path.to_path_buf());
      RepoError::Parse(e)
    })
  }

  pub fn write(&self, path: &Path) -> RepoResult<()> {
    fs::write(path, self.serialize()).with_context(|| format!("Failed to write manifest {}", path.display()))
  }

  /// Line terminator used by the file, `\n` when it has none
  fn preferred_terminator(&self) -> &'static str {
    let crlf = self
      .lines
      .iter()
      .map(ManifestLine::raw)
      .find(|raw| raw.ends_with('\n'))
      .is_some_and(|raw| raw.ends_with("\r\n"));
    if crlf { "\r\n" } else { "\n" }
  }
}

impl fmt::Display for Manifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.serialize())
  }
}

/// Manifest file inside a package directory, if there is one
pub fn find_manifest(dir: &Path, file_name: &str) -> Option<PathBuf> {
  let path = dir.join(file_name);
  path.is_file().then_some(path)
}

/// Read-modify-write a manifest file
pub fn update_file(path: &Path, specs: &[PackageSpec]) -> RepoResult<()> {
  let mut manifest = Manifest::read(path)?;
  manifest.update(specs)?;
  manifest.write(path)
}

fn split_terminator(raw: &str) -> (&str, &str) {
  if let Some(content) = raw.strip_suffix("\r\n") {
    (content, "\r\n")
  } else if let Some(content) = raw.strip_suffix('\n') {
    (content, "\n")
  } else {
    (raw, "")
  }
}

/// Split at the first unescaped `#`. `\#` in the body becomes a literal `#`.
fn strip_comment(content: &str) -> (String, Option<&str>) {
  let mut body = String::with_capacity(content.len());
  let mut chars = content.char_indices().peekable();

  while let Some((idx, c)) = chars.next() {
    match c {
      '\\' if chars.peek().is_some_and(|(_, next)| *next == '#') => {
        body.push('#');
        chars.next();
      }
      '#' => return (body, Some(&content[idx..])),
      _ => body.push(c),
    }
  }

  (body, None)
}

fn format_entry(spec: &PackageSpec, comment: Option<&str>) -> String {
  let escape = |token: &str| token.replace('#', "\\#");
  let reference = spec.reference.as_deref().unwrap_or_default();
  match comment {
    Some(comment) => format!("{} {} {}", escape(&spec.key()), escape(reference), comment),
    None => format!("{} {}", escape(&spec.key()), escape(reference)),
  }
}
