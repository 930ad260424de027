//! Include/exclude predicate (component H, §6 contract) — a per-tree ordered stack of
//! `(include | exclude, pattern)` rules evaluated rsync-style: `*` within a path segment,
//! `**` across segments, a leading `/` anchors to the tree root, a trailing `/` restricts
//! the rule to directories. A path is excluded iff its first matching rule excludes it;
//! an unmatched path is included.
//!
//! Out of scope per §1 ("glob-pattern include/exclude matching... treated as collaborators");
//! this module is a complete, working implementation of the contract §6 fixes, not a richer
//! engine than the spec calls for.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

#[derive(Clone, Debug)]
pub struct Rule {
    mode: FilterMode,
    anchored: bool,
    dir_only: bool,
    segments: Vec<String>,
}

impl Rule {
    /// Parse one stack entry: `"+pattern"` (include) or `"-pattern"` (exclude).
    pub fn parse(spec: &str) -> Option<Rule> {
        let (mode, pattern) = match spec.split_at_checked(1) {
            Some(("+", rest)) => (FilterMode::Include, rest),
            Some(("-", rest)) => (FilterMode::Exclude, rest),
            _ => return None,
        };
        let anchored = pattern.starts_with('/');
        let dir_only = pattern.ends_with('/') && pattern.len() > 1;
        let trimmed = pattern
            .strip_prefix('/')
            .unwrap_or(pattern)
            .strip_suffix('/')
            .unwrap_or(pattern.strip_prefix('/').unwrap_or(pattern));
        let segments = trimmed.split('/').map(|s| s.to_string()).collect();
        Some(Rule {
            mode,
            anchored,
            dir_only,
            segments,
        })
    }

    fn matches(&self, path_segments: &[&str], is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.anchored {
            segments_match(&self.segments, path_segments)
        } else {
            (0..=path_segments.len()).any(|start| segments_match(&self.segments, &path_segments[start..]))
        }
    }
}

/// Match pattern segments against path segments, treating a literal `**` segment as
/// "zero or more whole path segments" and any other segment as a single-segment glob
/// (`*` and `?` wildcards, no slash crossing).
fn segments_match(pattern: &[String], path: &[&str]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(p) if p == "**" => {
            (0..=path.len()).any(|skip| segments_match(&pattern[1..], &path[skip..]))
        }
        Some(p) => {
            !path.is_empty() && glob_segment(p, path[0]) && segments_match(&pattern[1..], &path[1..])
        }
    }
}

/// Single path-segment glob: `*` matches any run of characters, `?` matches exactly one.
fn glob_segment(pattern: &str, text: &str) -> bool {
    fn inner(pat: &[char], text: &[char]) -> bool {
        match pat.first() {
            None => text.is_empty(),
            Some('*') => (0..=text.len()).any(|i| inner(&pat[1..], &text[i..])),
            Some('?') => !text.is_empty() && inner(&pat[1..], &text[1..]),
            Some(c) => text.first() == Some(c) && inner(&pat[1..], &text[1..]),
        }
    }
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    inner(&pat, &txt)
}

/// An ordered stack of include/exclude rules, evaluated first-match-wins.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    rules: Vec<Rule>,
}

impl Filter {
    pub fn from_specs(specs: &[String]) -> Self {
        Filter {
            rules: specs.iter().filter_map(|s| Rule::parse(s)).collect(),
        }
    }

    /// Evaluate the predicate for a tree-relative path. `path` uses `/`-separated
    /// segments regardless of platform (callers normalize before calling).
    pub fn include(&self, path_segments: &[&str], is_dir: bool) -> bool {
        for rule in &self.rules {
            if rule.matches(path_segments, is_dir) {
                return rule.mode == FilterMode::Include;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(path: &str) -> Vec<&str> {
        path.split('/').collect()
    }

    #[test]
    fn unanchored_matches_anywhere() {
        let f = Filter::from_specs(&["-*.log".to_string()]);
        assert!(!f.include(&seg("a/b/debug.log"), false));
        assert!(f.include(&seg("a/b/debug.txt"), false));
    }

    #[test]
    fn anchored_matches_only_at_root() {
        let f = Filter::from_specs(&["-/build".to_string()]);
        assert!(!f.include(&seg("build"), true));
        assert!(f.include(&seg("a/build"), true));
    }

    #[test]
    fn doublestar_crosses_segments() {
        let f = Filter::from_specs(&["-**/node_modules".to_string()]);
        assert!(!f.include(&seg("a/b/node_modules"), true));
        assert!(!f.include(&seg("node_modules"), true));
    }

    #[test]
    fn dir_only_trailing_slash() {
        let f = Filter::from_specs(&["-tmp/".to_string()]);
        assert!(!f.include(&seg("tmp"), true));
        assert!(f.include(&seg("tmp"), false));
    }

    #[test]
    fn first_match_wins_include_before_exclude() {
        let f = Filter::from_specs(&["+keep.log".to_string(), "-*.log".to_string()]);
        assert!(f.include(&seg("keep.log"), false));
        assert!(!f.include(&seg("other.log"), false));
    }

    #[test]
    fn unmatched_path_is_included() {
        let f = Filter::from_specs(&["-*.log".to_string()]);
        assert!(f.include(&seg("a/b/readme.md"), false));
    }
}
