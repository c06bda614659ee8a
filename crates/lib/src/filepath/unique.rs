//! Cache-busted filenames.
//!
//! A unique filepath pattern contains one of the tokens [`HASH_TOKEN`] or
//! [`DATE_TOKEN`]. Generating a filepath substitutes the token with a digest of
//! the output content or with a timestamp; looking one up replaces the token
//! with a wildcard and scans the pattern's directory for an existing file.
//!
//! Lookup accepts any non-empty run of the token's characters in place of the
//! token. [`find_generated_filepaths`] is stricter and only matches names this
//! crate could have generated, so it is safe to use for cleanup.
//!
//! None of these operations fail. A missing match is reported as an empty path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use tracing::trace;

use crate::consts::{DATE_STAMP_MIN_DIGITS, DATE_TOKEN, FILENAME_HASH_LEN, HASH_TOKEN};
use crate::util::hash::hash_bytes;

/// Last stamp handed out, so `%date%` stamps strictly increase.
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Returns true if `pattern` contains a `%hash%` or `%date%` token.
pub fn is_unique_filepath(pattern: &str) -> bool {
  token_of(pattern).is_some()
}

fn token_of(pattern: &str) -> Option<&'static str> {
  [HASH_TOKEN, DATE_TOKEN].into_iter().find(|t| pattern.contains(t))
}

/// Generate a concrete filepath from `pattern`.
///
/// - With `content` and `%hash%`, the token becomes a hex digest of the content.
/// - With `content` and `%date%`, the token becomes a millisecond timestamp.
/// - Without `content`, the token is removed.
/// - Patterns without a recognized token are returned unchanged.
pub fn generate_unique_filepath(pattern: &str, content: Option<&[u8]>) -> PathBuf {
  let Some(token) = token_of(pattern) else {
    return PathBuf::from(pattern);
  };

  let replacement = match content {
    None => String::new(),
    Some(bytes) if token == HASH_TOKEN => hash_bytes(bytes).short(FILENAME_HASH_LEN).to_string(),
    Some(_) => date_stamp().to_string(),
  };

  PathBuf::from(pattern.replacen(token, &replacement, 1))
}

/// Milliseconds since the Unix epoch, bumped past the previous stamp when two
/// are requested within the same millisecond.
fn date_stamp() -> u64 {
  let now = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0);
  let next = |prev: u64| now.max(prev + 1);
  match LAST_STAMP.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(next(prev))) {
    Ok(prev) | Err(prev) => next(prev),
  }
}

/// How strictly a token position is matched during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
  /// Any non-empty run of hex digits or decimal digits.
  Loose,
  /// Exactly what [`generate_unique_filepath`] produces for the token.
  Generated,
}

/// Find the first existing file matching `pattern`, or an empty path.
///
/// Relative patterns are resolved against `cwd`. Candidates are considered in
/// filename order.
pub fn find_unique_filepath(pattern: &str, cwd: &Path) -> PathBuf {
  find_unique_filepaths(pattern, cwd).into_iter().next().unwrap_or_default()
}

/// Find every existing file matching `pattern`, sorted by filename.
pub fn find_unique_filepaths(pattern: &str, cwd: &Path) -> Vec<PathBuf> {
  scan(pattern, cwd, Shape::Loose)
}

/// Find every existing file that [`generate_unique_filepath`] could have
/// produced from `pattern`, sorted by filename.
///
/// `%hash%` matches exactly [`FILENAME_HASH_LEN`] hex digits and `%date%` at
/// least [`DATE_STAMP_MIN_DIGITS`] decimal digits.
pub fn find_generated_filepaths(pattern: &str, cwd: &Path) -> Vec<PathBuf> {
  scan(pattern, cwd, Shape::Generated)
}

fn scan(pattern: &str, cwd: &Path, shape: Shape) -> Vec<PathBuf> {
  let Some(token) = token_of(pattern) else {
    return Vec::new();
  };

  let pattern_path = cwd.join(pattern);
  let (Some(dir), Some(file_name)) = (pattern_path.parent(), pattern_path.file_name()) else {
    return Vec::new();
  };
  let file_name = file_name.to_string_lossy();

  // The token must sit in the filename; directories are never wildcarded.
  let Some(matcher) = matcher_for(&file_name, token, shape) else {
    trace!(pattern = %pattern, "token outside filename, no lookup");
    return Vec::new();
  };

  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) => {
      trace!(dir = %dir.display(), error = %e, "cannot scan directory");
      return Vec::new();
    }
  };

  let mut matches: Vec<PathBuf> = entries
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
    .filter(|entry| matcher.is_match(&entry.file_name().to_string_lossy()))
    .map(|entry| dir.join(entry.file_name()))
    .collect();
  matches.sort();
  matches
}

fn matcher_for(file_name: &str, token: &str, shape: Shape) -> Option<Regex> {
  let (prefix, suffix) = file_name.split_once(token)?;
  let wildcard = match (token == HASH_TOKEN, shape) {
    (true, Shape::Generated) => format!("[0-9a-f]{{{}}}", FILENAME_HASH_LEN),
    (true, Shape::Loose) => "[0-9a-f]+".to_string(),
    (false, Shape::Generated) => format!("[0-9]{{{},}}", DATE_STAMP_MIN_DIGITS),
    (false, Shape::Loose) => "[0-9]+".to_string(),
  };
  Regex::new(&format!("^{}{}{}$", regex::escape(prefix), wildcard, regex::escape(suffix))).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  mod is_unique {
    use super::*;

    #[test]
    fn hash_pattern() {
      assert!(is_unique_filepath("foo-%hash%.js"));
    }

    #[test]
    fn date_pattern() {
      assert!(is_unique_filepath("foo-%date%.js"));
    }

    #[test]
    fn other_pattern() {
      assert!(!is_unique_filepath("foo-%foo%.js"));
      assert!(!is_unique_filepath("foo.js"));
    }
  }

  mod generate {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
      let a = generate_unique_filepath("foo-%hash%.js", Some("var foo = 'foo'".as_bytes()));
      let b = generate_unique_filepath("foo-%hash%.js", Some("var foo = 'foo'".as_bytes()));
      assert_eq!(a, b);
      let name = a.to_string_lossy().into_owned();
      assert!(name.starts_with("foo-") && name.ends_with(".js"));
      assert_eq!(name.len(), "foo-.js".len() + FILENAME_HASH_LEN);
    }

    #[test]
    fn hash_differs_with_content() {
      let a = generate_unique_filepath("foo-%hash%.js", Some("var foo = 'foo'".as_bytes()));
      let b = generate_unique_filepath("foo-%hash%.js", Some("var foo = 'bar'".as_bytes()));
      assert_ne!(a, b);
    }

    #[test]
    fn date_is_numeric() {
      let path = generate_unique_filepath("foo-%date%.js", Some("var foo = 'foo'".as_bytes()));
      let name = path.to_string_lossy();
      let stamp = name.strip_prefix("foo-").and_then(|s| s.strip_suffix(".js")).unwrap();
      assert!(!stamp.is_empty());
      assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn date_strictly_increases() {
      let stamp = |p: PathBuf| -> u64 {
        let name = p.to_string_lossy().into_owned();
        name.trim_start_matches("foo-").trim_end_matches(".js").parse().unwrap()
      };
      let first = stamp(generate_unique_filepath("foo-%date%.js", Some("a".as_bytes())));
      let second = stamp(generate_unique_filepath("foo-%date%.js", Some("a".as_bytes())));
      assert!(second > first);
    }

    #[test]
    fn token_removed_without_content() {
      assert_eq!(generate_unique_filepath("foo-%hash%.js", None), PathBuf::from("foo-.js"));
      assert_eq!(generate_unique_filepath("foo-%date%.js", None), PathBuf::from("foo-.js"));
    }

    #[test]
    fn unknown_token_passes_through() {
      assert_eq!(
        generate_unique_filepath("foo-%foo%.js", None),
        PathBuf::from("foo-%foo%.js")
      );
      assert_eq!(
        generate_unique_filepath("foo-%foo%.js", Some("content".as_bytes())),
        PathBuf::from("foo-%foo%.js")
      );
    }

    #[test]
    fn keeps_directories() {
      assert_eq!(
        generate_unique_filepath("www/js/main-%hash%.js", None),
        PathBuf::from("www/js/main-.js")
      );
    }
  }

  mod find {
    use super::*;

    fn fixture() -> TempDir {
      let temp = TempDir::new().unwrap();
      fs::write(temp.path().join("foo-bar-0f7807e7171c078a8c5bfb565e35ef88.js"), "").unwrap();
      fs::write(temp.path().join("foo-bar-baz-0f7807e7.js"), "").unwrap();
      fs::write(temp.path().join("foo-1476970291385.css"), "").unwrap();
      temp
    }

    #[test]
    fn finds_matching_hash_file() {
      let temp = fixture();
      assert_eq!(
        find_unique_filepath("foo-bar-%hash%.js", temp.path()),
        temp.path().join("foo-bar-0f7807e7171c078a8c5bfb565e35ef88.js")
      );
    }

    #[test]
    fn finds_matching_date_file() {
      let temp = fixture();
      assert_eq!(
        find_unique_filepath("foo-%date%.css", temp.path()),
        temp.path().join("foo-1476970291385.css")
      );
    }

    #[test]
    fn empty_when_no_match() {
      let temp = fixture();
      assert_eq!(find_unique_filepath("bar-%hash%.js", temp.path()), PathBuf::new());
    }

    #[test]
    fn empty_when_directory_missing() {
      let temp = fixture();
      assert_eq!(find_unique_filepath("missing/foo-%hash%.js", temp.path()), PathBuf::new());
    }

    #[test]
    fn empty_without_token() {
      let temp = fixture();
      assert_eq!(find_unique_filepath("foo-bar.js", temp.path()), PathBuf::new());
    }

    #[test]
    fn finds_in_subdirectory() {
      let temp = fixture();
      fs::create_dir(temp.path().join("js")).unwrap();
      fs::write(temp.path().join("js/main-abc123.js"), "").unwrap();
      assert_eq!(
        find_unique_filepath("js/main-%hash%.js", temp.path()),
        temp.path().join("js/main-abc123.js")
      );
    }

    #[test]
    fn empty_token_position_never_matches() {
      let temp = TempDir::new().unwrap();
      fs::write(temp.path().join(".css"), "").unwrap();
      fs::write(temp.path().join("foo-.js"), "").unwrap();
      assert_eq!(find_unique_filepath("%hash%.css", temp.path()), PathBuf::new());
      assert_eq!(find_unique_filepath("foo-%date%.js", temp.path()), PathBuf::new());
    }

    #[test]
    fn generated_lookup_requires_full_digest() {
      let temp = fixture();
      fs::write(temp.path().join("face.css"), "").unwrap();
      fs::write(temp.path().join("foo-404.css"), "").unwrap();
      fs::write(temp.path().join("0f7807e7171c078a8c5bfb565e35ef88.css"), "").unwrap();

      assert_eq!(
        find_generated_filepaths("foo-bar-%hash%.js", temp.path()),
        vec![temp.path().join("foo-bar-0f7807e7171c078a8c5bfb565e35ef88.js")]
      );
      assert_eq!(
        find_generated_filepaths("%hash%.css", temp.path()),
        vec![temp.path().join("0f7807e7171c078a8c5bfb565e35ef88.css")]
      );
      assert_eq!(
        find_generated_filepaths("foo-%date%.css", temp.path()),
        vec![temp.path().join("foo-1476970291385.css")]
      );
    }

    #[test]
    fn all_matches_sorted() {
      let temp = fixture();
      fs::write(temp.path().join("foo-bar-00aa.js"), "").unwrap();
      let found = find_unique_filepaths("foo-bar-%hash%.js", temp.path());
      assert_eq!(
        found,
        vec![
          temp.path().join("foo-bar-00aa.js"),
          temp.path().join("foo-bar-0f7807e7171c078a8c5bfb565e35ef88.js"),
        ]
      );
    }
  }
}
