//! Glob resolution and file selection.
//!
//! Patterns arrive relative to some directory (the project root, a package
//! directory, the staging directory) and may carry a leading `!` to mark an
//! exclusion. [`resolve_relative_globs`] and [`resolve_package_globs`] turn them
//! into absolute patterns; [`Selector`] compiles absolute patterns and walks the
//! filesystem for matches.
//!
//! An empty pattern list selects nothing.

use crate::bundler::{
    error::{Error, Result},
    manifest::DEPENDENCY_ROOT,
};
use glob::{MatchOptions, Pattern};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Prefix marking a pattern as an exclusion.
pub const EXCLUDE_MARKER: char = '!';

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves per-package patterns against `base/node_modules/<package>/`.
///
/// Packages are visited in name order and each package's patterns keep their
/// declared order. A leading `!` stays at the front of the resolved pattern.
pub fn resolve_package_globs(base: &Path, packages: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    packages
        .iter()
        .flat_map(|(package, patterns)| {
            let package_dir = base.join(DEPENDENCY_ROOT).join(package);
            resolve_relative_globs(&package_dir, patterns)
        })
        .collect()
}

/// Resolves plain patterns against a single base directory.
pub fn resolve_relative_globs(base: &Path, patterns: &[String]) -> Vec<String> {
    let prefix = escape_literal(&base.to_string_lossy());
    let prefix = prefix.trim_end_matches('/');

    patterns
        .iter()
        .filter_map(|raw| {
            let (excluded, pattern) = split_exclusion(raw);
            let pattern = pattern.trim_start_matches("./");
            if pattern.is_empty() {
                return None;
            }
            let marker = if excluded { "!" } else { "" };
            Some(format!("{marker}{prefix}/{pattern}"))
        })
        .collect()
}

/// Resolves each name to its literal directory under `base/node_modules`.
pub fn package_dirs<'a>(base: &Path, packages: impl IntoIterator<Item = &'a String>) -> Vec<PathBuf> {
    packages
        .into_iter()
        .map(|package| base.join(DEPENDENCY_ROOT).join(package))
        .collect()
}

/// Splits a leading exclusion marker off a pattern.
pub fn split_exclusion(pattern: &str) -> (bool, &str) {
    match pattern.strip_prefix(EXCLUDE_MARKER) {
        Some(rest) => (true, rest),
        None => (false, pattern),
    }
}

/// Escapes every glob metacharacter in a literal path.
pub fn escape_literal(literal: &str) -> String {
    Pattern::escape(literal)
        .replace('{', "[{]")
        .replace('}', "[}]")
}

/// Expands `{a,b}` alternatives into separate patterns.
///
/// Braces inside `[...]` classes are literal. Groups nest and multiple groups
/// multiply out, so `a{b,c}{d,e}` yields four patterns.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut in_class = false;
    let mut depth = 0usize;
    let mut open = None;
    let mut splits = Vec::new();
    let mut close = None;

    for (i, c) in chars.iter().enumerate() {
        match c {
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' if !in_class => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            ',' if !in_class && depth == 1 => splits.push(i),
            '}' if !in_class && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let (Some(open), Some(close)) = (open, close) else {
        return vec![pattern.to_string()];
    };

    let prefix: String = chars[..open].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();

    let mut bounds = Vec::with_capacity(splits.len() + 2);
    bounds.push(open);
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alternative: String = chars[w[0] + 1..w[1]].iter().collect();
            expand_braces(&format!("{prefix}{alternative}{suffix}"))
        })
        .collect()
}

/// Returns the unescaped path if `pattern` contains no live metacharacters.
fn literal_path(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            // single-character class produced by `escape_literal`
            '[' if i + 2 < chars.len() && chars[i + 2] == ']' => {
                out.push(chars[i + 1]);
                i += 3;
            }
            '*' | '?' | '[' | ']' | '{' | '}' => return None,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Some(out)
}

/// Directory holding every path `pattern` could match.
fn walk_root(pattern: &str) -> PathBuf {
    let mut root = String::new();
    for component in pattern.split('/') {
        match literal_path(component) {
            Some(literal) => {
                root.push_str(&literal);
                root.push('/');
            }
            None => break,
        }
    }
    if root.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(root)
    }
}

#[derive(Debug)]
struct Include {
    pattern: Pattern,
    literal: Option<PathBuf>,
}

/// Compiled include/exclude pattern set.
///
/// A path is selected when it matches at least one include and no exclude.
#[derive(Debug)]
pub struct Selector {
    includes: Vec<Include>,
    excludes: Vec<Pattern>,
    walk_roots: Vec<PathBuf>,
    pruned: Vec<PathBuf>,
}

impl Selector {
    /// Compiles absolute patterns as produced by the resolve functions.
    pub fn new(resolved: &[String]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        let mut walk_roots = BTreeSet::new();

        for raw in resolved {
            let (excluded, body) = split_exclusion(raw);
            for expanded in expand_braces(body) {
                let pattern = Pattern::new(&expanded).map_err(|e| Error::Pattern {
                    pattern: raw.clone(),
                    reason: e.to_string(),
                })?;

                if excluded {
                    excludes.push(pattern);
                    continue;
                }

                let literal = literal_path(&expanded).map(PathBuf::from);
                if literal.is_none() {
                    walk_roots.insert(walk_root(&expanded));
                }
                includes.push(Include { pattern, literal });
            }
        }

        Ok(Self {
            includes,
            excludes,
            walk_roots: walk_roots.into_iter().collect(),
            pruned: Vec::new(),
        })
    }

    /// Never descends into (or selects) the given directories.
    pub fn with_pruned(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.pruned.extend(dirs);
        self
    }

    /// True when nothing can ever be selected.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Checks a single absolute path against the pattern set.
    pub fn is_match(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        let included = self.includes.iter().any(|include| match &include.literal {
            Some(literal) => literal == path,
            None => include.pattern.matches_with(&text, MATCH_OPTIONS),
        });
        included
            && !self
                .excludes
                .iter()
                .any(|pattern| pattern.matches_with(&text, MATCH_OPTIONS))
    }

    fn is_pruned(&self, path: &Path) -> bool {
        self.pruned.iter().any(|dir| path.starts_with(dir))
    }

    /// Selected files and symlinks, sorted. Directories are never returned.
    ///
    /// Blocking; call from `spawn_blocking` in async contexts.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut selected = BTreeSet::new();

        for include in &self.includes {
            if let Some(literal) = &include.literal {
                match std::fs::symlink_metadata(literal) {
                    Ok(meta) if !meta.is_dir() && !self.is_pruned(literal) => {
                        if self.is_match(literal) {
                            selected.insert(literal.clone());
                        }
                    }
                    Ok(_) => log::debug!("Skipping directory selector {}", literal.display()),
                    Err(_) => log::debug!("Selector matched nothing: {}", literal.display()),
                }
            }
        }

        for root in &self.walk_roots {
            if !root.exists() {
                continue;
            }
            let walker = WalkDir::new(root)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.is_pruned(entry.path()));

            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    continue;
                }
                if self.is_match(entry.path()) {
                    selected.insert(entry.into_path());
                }
            }
        }

        Ok(selected.into_iter().collect())
    }

    /// Top-most selected entries of any type, sorted.
    ///
    /// A selected directory is reported once and not descended into, which is
    /// what deletion wants.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut selected = BTreeSet::new();

        for include in &self.includes {
            if let Some(literal) = &include.literal
                && literal.symlink_metadata().is_ok()
                && !self.is_pruned(literal)
                && self.is_match(literal)
            {
                selected.insert(literal.clone());
            }
        }

        for root in &self.walk_roots {
            if !root.exists() {
                continue;
            }
            let mut walker = WalkDir::new(root)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter();

            while let Some(entry) = walker.next() {
                let entry = entry?;
                let path = entry.path();
                if self.is_pruned(path) {
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
                if self.is_match(path) {
                    selected.insert(path.to_path_buf());
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                }
            }
        }

        // drop entries nested under another selected entry
        let mut top_most: Vec<PathBuf> = Vec::with_capacity(selected.len());
        for path in selected {
            if !top_most.iter().any(|parent| path.starts_with(parent)) {
                top_most.push(path);
            }
        }
        Ok(top_most)
    }
}
