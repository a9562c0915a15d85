//! Glob-style path matching for component patterns
//!
//! Paths are `/`-separated and matching is case-sensitive. A pattern is
//! handled in one of four ways:
//!
//! - exact string equality always matches
//! - a pattern containing `**` is split at the first occurrence into a
//!   prefix and a suffix (one adjacent `/` stripped from each side)
//! - a pattern containing `*` (but no `**`) is a single-segment shell glob:
//!   `*` and `?` never match `/`, `[...]` classes and `\` escapes work as in
//!   a POSIX shell
//! - anything else only matches itself
//!
//! Matching is total: a malformed pattern simply fails to match.
//!
//! # Example
//!
//! ```
//! use gitreport::matcher::matches;
//!
//! assert!(matches("src/api/users.go", "src/api/**"));
//! assert!(!matches("src/apiextra/x.go", "src/api/**"));
//! assert!(matches("x.ts", "*.ts"));
//! assert!(!matches("a/x.ts", "*.ts"));
//! ```

/// Check whether `path` matches `pattern`.
pub fn matches(path: &str, pattern: &str) -> bool {
    CompiledPattern::new(pattern).matches(path)
}

/// A pattern analysed once and matched against many paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    raw: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    /// Bare `**`
    Any,
    /// Only the prefix side of `**` is non-empty
    Prefix(Part),
    /// Only the suffix side of `**` is non-empty
    Suffix(Part),
    /// Both sides of `**` are non-empty
    PrefixSuffix(Part, Part),
    /// Single-segment glob over the whole path
    Glob,
    /// No wildcard at all
    Literal,
}

/// One side of a `**` split.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    /// Contains `*` but no further `**`; matched segment-aligned
    Glob(String),
}

impl Part {
    fn new(text: &str) -> Self {
        if text.contains('*') && !text.contains("**") {
            Part::Glob(text.to_string())
        } else {
            Part::Literal(text.to_string())
        }
    }

    /// `path` begins with this part, either exactly or at a segment boundary.
    fn is_prefix_of(&self, path: &str) -> bool {
        match self {
            Part::Literal(prefix) => path.starts_with(prefix.as_str()),
            Part::Glob(glob) => segment_heads(path).any(|head| glob_match(glob, head)),
        }
    }

    /// `path` equals this part or continues it with a `/`.
    fn is_directory_of(&self, path: &str) -> bool {
        match self {
            Part::Literal(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Part::Glob(_) => self.is_prefix_of(path),
        }
    }

    /// `path` ends with this part.
    fn is_suffix_of(&self, path: &str) -> bool {
        match self {
            Part::Literal(suffix) => path.ends_with(suffix.as_str()),
            Part::Glob(glob) => segment_tails(path).any(|tail| glob_match(glob, tail)),
        }
    }
}

impl CompiledPattern {
    pub fn new(pattern: &str) -> Self {
        let kind = if let Some(idx) = pattern.find("**") {
            let before = &pattern[..idx];
            let after = &pattern[idx + 2..];
            let prefix = before.strip_suffix('/').unwrap_or(before);
            let suffix = after.strip_prefix('/').unwrap_or(after);

            match (prefix.is_empty(), suffix.is_empty()) {
                (true, true) => PatternKind::Any,
                (true, false) => PatternKind::Suffix(Part::new(suffix)),
                (false, true) => PatternKind::Prefix(Part::new(prefix)),
                (false, false) => PatternKind::PrefixSuffix(Part::new(prefix), Part::new(suffix)),
            }
        } else if pattern.contains('*') {
            PatternKind::Glob
        } else {
            PatternKind::Literal
        };

        Self {
            raw: pattern.to_string(),
            kind,
        }
    }

    /// The pattern text as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        if path == self.raw {
            return true;
        }
        match &self.kind {
            PatternKind::Any => true,
            PatternKind::Suffix(suffix) => suffix.is_suffix_of(path),
            PatternKind::Prefix(prefix) => prefix.is_directory_of(path),
            PatternKind::PrefixSuffix(prefix, suffix) => {
                prefix.is_prefix_of(path) && suffix.is_suffix_of(path)
            }
            PatternKind::Glob => glob_match(&self.raw, path),
            PatternKind::Literal => false,
        }
    }
}

/// `path` and every leading run of whole segments, longest first.
fn segment_heads(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.rmatch_indices('/').map(move |(i, _)| &path[..i]))
}

/// `path` and every trailing run of whole segments, longest first.
fn segment_tails(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.match_indices('/').map(move |(i, _)| &path[i + 1..]))
}

/// The pattern is syntactically invalid (unterminated class or escape).
#[derive(Debug)]
struct BadPattern;

/// Shell-glob match of the whole of `name` where `*` and `?` stop at `/`.
///
/// The pattern is consumed chunk by chunk (a chunk being the text between
/// stars), so evaluation is iterative and bounded by `pattern × name`.
pub(crate) fn glob_match(mut pattern: &str, mut name: &str) -> bool {
    'chunks: while !pattern.is_empty() {
        let (star, chunk, rest) = scan_chunk(pattern);
        pattern = rest;

        if star && chunk.is_empty() {
            // Trailing star eats the rest of the segment
            return !name.contains('/');
        }

        match match_chunk(chunk, name) {
            // The last chunk must consume the whole name
            Ok(Some(t)) if t.is_empty() || !pattern.is_empty() => {
                name = t;
                continue;
            }
            Err(BadPattern) => return false,
            _ => {}
        }

        if star {
            for (i, c) in name.char_indices() {
                if c == '/' {
                    break;
                }
                match match_chunk(chunk, &name[i + c.len_utf8()..]) {
                    Ok(Some(t)) => {
                        if pattern.is_empty() && !t.is_empty() {
                            continue;
                        }
                        name = t;
                        continue 'chunks;
                    }
                    Ok(None) => {}
                    Err(BadPattern) => return false,
                }
            }
        }

        return false;
    }

    name.is_empty()
}

/// Split off leading stars and the chunk that follows them.
fn scan_chunk(pattern: &str) -> (bool, &str, &str) {
    let trimmed = pattern.trim_start_matches('*');
    let star = trimmed.len() != pattern.len();

    let bytes = trimmed.as_bytes();
    let mut in_class = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 < bytes.len() {
                    i += 1;
                }
            }
            b'[' => in_class = true,
            b']' => in_class = false,
            b'*' if !in_class => break,
            _ => {}
        }
        i += 1;
    }

    (star, &trimmed[..i], &trimmed[i..])
}

/// Match `chunk` (no stars) against the start of `s`.
///
/// Returns the unmatched remainder of `s`, `None` on mismatch. The whole
/// chunk is always parsed so that malformed classes are reported even
/// after a mismatch.
fn match_chunk<'a>(mut chunk: &str, mut s: &'a str) -> Result<Option<&'a str>, BadPattern> {
    let mut failed = false;

    while let Some(c) = chunk.chars().next() {
        match c {
            '[' => {
                let r = if failed { None } else { s.chars().next() };
                match r {
                    Some(ch) => s = &s[ch.len_utf8()..],
                    None => failed = true,
                }
                chunk = &chunk[1..];

                let negated = chunk.starts_with('^') || chunk.starts_with('!');
                if negated {
                    chunk = &chunk[1..];
                }

                let mut matched = false;
                let mut ranges = 0;
                loop {
                    if ranges > 0 {
                        if let Some(rest) = chunk.strip_prefix(']') {
                            chunk = rest;
                            break;
                        }
                    }
                    let (lo, rest) = class_char(chunk)?;
                    chunk = rest;
                    let mut hi = lo;
                    if let Some(rest) = chunk.strip_prefix('-') {
                        let (upper, rest) = class_char(rest)?;
                        hi = upper;
                        chunk = rest;
                    }
                    if r.is_some_and(|ch| lo <= ch && ch <= hi) {
                        matched = true;
                    }
                    ranges += 1;
                }

                if r == Some('/') || matched == negated {
                    failed = true;
                }
            }
            '?' => {
                match s.chars().next() {
                    Some(ch) if !failed && ch != '/' => s = &s[ch.len_utf8()..],
                    _ => failed = true,
                }
                chunk = &chunk[1..];
            }
            _ => {
                let literal = if c == '\\' {
                    chunk = &chunk[1..];
                    chunk.chars().next().ok_or(BadPattern)?
                } else {
                    c
                };
                if !failed && s.starts_with(literal) {
                    s = &s[literal.len_utf8()..];
                } else {
                    failed = true;
                }
                chunk = &chunk[literal.len_utf8()..];
            }
        }
    }

    Ok(if failed { None } else { Some(s) })
}

/// One (possibly escaped) character inside a `[...]` class.
fn class_char(chunk: &str) -> Result<(char, &str), BadPattern> {
    let mut chars = chunk.chars();
    let c = match chars.next() {
        None | Some('-') | Some(']') => return Err(BadPattern),
        Some('\\') => chars.next().ok_or(BadPattern)?,
        Some(c) => c,
    };
    let rest = chars.as_str();
    // A class must be closed
    if rest.is_empty() {
        return Err(BadPattern);
    }
    Ok((c, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_star_matches_everything() {
        for path in ["", "a", "a/b/c.go", "deeply/nested/dir/file.rs", "/abs"] {
            assert!(matches(path, "**"), "'**' should match {:?}", path);
        }
    }

    #[test]
    fn test_exact_match_is_reflexive() {
        for path in ["src/main.rs", "a[1].go", "weird/*/name", "x?y", "[", "a\\b"] {
            assert!(matches(path, path), "{:?} should match itself", path);
        }
    }

    #[test]
    fn test_prefix_respects_segment_boundary() {
        assert!(matches("src/api/users.go", "src/api/**"));
        assert!(matches("src/api/v1/deep/users.go", "src/api/**"));
        assert!(matches("src/api", "src/api/**"));
        assert!(!matches("src/apiextra/x.go", "src/api/**"));
        assert!(!matches("lib/src/api/x.go", "src/api/**"));
    }

    #[test]
    fn test_suffix_only_patterns() {
        assert!(matches("a/b/c.go", "**/c.go"));
        assert!(matches("c.go", "**/c.go"));
        // Plain ends-with: no segment alignment for literal suffixes
        assert!(matches("abc.go", "**/c.go"));
        assert!(!matches("a/b/c.rs", "**/c.go"));
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert!(matches("src/a/b/test.go", "src/**/test.go"));
        assert!(matches("src/test.go", "src/**/test.go"));
        assert!(!matches("lib/a/test.go", "src/**/test.go"));
        assert!(!matches("src/a/main.go", "src/**/test.go"));
    }

    #[test]
    fn test_only_first_double_star_is_special() {
        // Suffix "b/**" is compared literally
        assert!(matches("a/x/b/**", "a/**/b/**"));
        assert!(!matches("a/x/b/c.go", "a/**/b/**"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(matches("x.ts", "*.ts"));
        assert!(!matches("a/x.ts", "*.ts"));
        assert!(matches("src/lib.rs", "src/*.rs"));
        assert!(!matches("src/nested/lib.rs", "src/*.rs"));
        assert!(matches("src/a/mod.rs", "src/*/mod.rs"));
        assert!(matches("src/", "src/*"));
    }

    #[test]
    fn test_glob_inside_double_star_parts() {
        assert!(matches("a/b/main.go", "**/*.go"));
        assert!(matches("main.go", "**/*.go"));
        assert!(!matches("a/b/main.rs", "**/*.go"));
        assert!(matches("src/x/y/z.go", "src/*/**"));
        assert!(!matches("lib/x/y.go", "src/*/**"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        assert!(matches("src/ab.go", "*/a?.go"));
        assert!(!matches("src/a/.go", "*/a?.go"));
        assert!(matches("main.c", "*.[ch]"));
        assert!(matches("main.h", "*.[ch]"));
        assert!(!matches("main.o", "*.[ch]"));
        assert!(matches("file3.txt", "file[0-9]*"));
        assert!(!matches("filex.txt", "file[0-9]*"));
        assert!(matches("b.go", "[!a]*"));
        assert!(!matches("a.go", "[^a]*"));
    }

    #[test]
    fn test_escapes() {
        assert!(matches("a*", "a\\*"));
        assert!(!matches("ab", "a\\*"));
    }

    #[test]
    fn test_no_wildcard_requires_equality() {
        assert!(!matches("src/main.rs", "src"));
        assert!(!matches("src/main.rs", "src/"));
        assert!(!matches("ab.go", "a?.go"));
    }

    #[test]
    fn test_malformed_patterns_never_panic() {
        for pattern in ["*[", "*[a", "*[]", "*\\", "[-]*", "*[a-", "**[", "*[\\"] {
            assert!(!matches("some/path.go", pattern), "{:?}", pattern);
            assert!(matches(pattern, pattern));
        }
    }

    #[test]
    fn test_multibyte_paths() {
        assert!(matches("docs/日本語.md", "docs/*.md"));
        assert!(matches("docs/ü.md", "*/?.md"));
        assert!(matches("ünïcode/ß/x", "ünïcode/**"));
    }

    #[test]
    fn test_long_paths_stay_fast() {
        let path = format!("{}b", "a".repeat(5000));
        let pattern = format!("{}c", "*a".repeat(40));
        assert!(!matches(&path, &pattern));
    }

    #[test]
    fn test_compiled_pattern_reuse() {
        let compiled = CompiledPattern::new("src/api/**");
        assert_eq!(compiled.as_str(), "src/api/**");
        assert!(compiled.matches("src/api/a.go"));
        assert!(compiled.matches("src/api/b.go"));
        assert!(!compiled.matches("src/web/a.go"));
    }
}
