//! Parser for `git log --numstat` output
//!
//! The log producer emits one header line per commit, fields separated by
//! NUL, followed by numstat lines (`<added>\t<deleted>\t<path>`) until the
//! next header. [`LogParser`] turns that text into [`LogEntry`] values
//! lazily, holding at most one commit in memory.
//!
//! Malformed headers, unparsable timestamps and binary-file stat lines are
//! skipped with a debug log; parsing always continues.

use chrono::DateTime;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::{debug, trace};

use crate::models::{ChangeType, Commit, FileChange, LogEntry};

/// Separator between header fields.
pub const FIELD_DELIMITER: char = '\0';

/// `--pretty` format producing headers understood by [`LogParser`].
pub const PRETTY_FORMAT: &str = "%H%x00%an%x00%ae%x00%ai%x00%s%x00";

/// Layout of the `%ai` author date.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const RENAME_ARROW: &str = " => ";

/// Why a line of log output was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("header has {0} fields, expected at least 5")]
    TooFewFields(usize),

    #[error("unparsable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("binary file '{0}'")]
    BinaryFile(String),

    #[error("malformed stat line '{0}'")]
    MalformedStat(String),
}

/// Counters collected while parsing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    /// Commits emitted
    pub commits: usize,
    /// File changes emitted
    pub changes: usize,
    /// Headers dropped (too few fields or bad timestamp)
    pub skipped_headers: usize,
    /// Stat lines dropped (binary, malformed, or without a valid header)
    pub skipped_lines: usize,
}

impl ParseStats {
    pub fn skipped(&self) -> usize {
        self.skipped_headers + self.skipped_lines
    }
}

/// Lazy iterator over the commits in a log stream.
///
/// Create a new parser for every log invocation; it cannot be rewound.
pub struct LogParser<R> {
    reader: R,
    buf: Vec<u8>,
    current: Option<LogEntry>,
    stats: ParseStats,
}

impl<R: BufRead> LogParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            current: None,
            stats: ParseStats::default(),
        }
    }

    /// Counters for everything read so far.
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Read one line without its terminator. Invalid UTF-8 is replaced.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    fn emit(&mut self, entry: LogEntry) -> LogEntry {
        self.stats.commits += 1;
        self.stats.changes += entry.changes.len();
        entry
    }

    fn handle_stat_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let Some(entry) = self.current.as_mut() else {
            trace!("Ignoring stat line outside a commit: {:?}", line);
            self.stats.skipped_lines += 1;
            return;
        };
        match parse_stat_line(&entry.commit.hash, line) {
            Ok(change) => entry.changes.push(change),
            Err(reason) => {
                debug!("Skipping stat line in {}: {}", entry.commit.hash, reason);
                self.stats.skipped_lines += 1;
            }
        }
    }
}

impl<R: BufRead> Iterator for LogParser<R> {
    type Item = io::Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    let last = self.current.take()?;
                    return Some(Ok(self.emit(last)));
                }
                Err(e) => return Some(Err(e)),
            };

            if !line.contains(FIELD_DELIMITER) {
                self.handle_stat_line(&line);
                continue;
            }

            // A new header closes the previous commit. If the header is
            // rejected, its stat lines are dropped along with it.
            let finished = self.current.take();
            match parse_header(&line) {
                Ok(commit) => {
                    self.current = Some(LogEntry {
                        commit,
                        changes: Vec::new(),
                    });
                }
                Err(reason) => {
                    debug!("Skipping commit header: {}", reason);
                    self.stats.skipped_headers += 1;
                }
            }

            if let Some(entry) = finished {
                return Some(Ok(self.emit(entry)));
            }
        }
    }
}

/// Parse a NUL-separated header line into a commit.
pub fn parse_header(line: &str) -> Result<Commit, SkipReason> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < 5 {
        return Err(SkipReason::TooFewFields(fields.len()));
    }

    let raw_date = fields[3].trim();
    let timestamp = DateTime::parse_from_str(raw_date, TIMESTAMP_FORMAT)
        .map_err(|_| SkipReason::BadTimestamp(raw_date.to_string()))?;

    Ok(Commit {
        hash: fields[0].trim().to_string(),
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        timestamp,
        message: fields[4].to_string(),
    })
}

/// Parse one numstat line belonging to `commit_hash`.
pub fn parse_stat_line(commit_hash: &str, line: &str) -> Result<FileChange, SkipReason> {
    let mut fields = line.splitn(3, '\t');
    let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SkipReason::MalformedStat(line.to_string()));
    };
    if path.is_empty() {
        return Err(SkipReason::MalformedStat(line.to_string()));
    }

    // Binary files report "-" for both counts
    let (Ok(additions), Ok(deletions)) = (added.trim().parse::<u64>(), deleted.trim().parse::<u64>())
    else {
        return Err(SkipReason::BinaryFile(path.to_string()));
    };

    let path = unquote_path(path).unwrap_or_else(|| path.to_string());
    let (filepath, change_type) = match resolve_rename(&path) {
        Some(new_path) => (
            unquote_path(&new_path).unwrap_or(new_path),
            ChangeType::Renamed,
        ),
        None => (path, ChangeType::infer(additions, deletions)),
    };

    Ok(FileChange {
        commit_hash: commit_hash.to_string(),
        filepath,
        additions,
        deletions,
        change_type,
    })
}

/// Decode a path git wrapped in double quotes.
///
/// Even with `core.quotepath=off`, names containing control characters,
/// `"` or `\` are C-quoted. Returns `None` when `path` is not quoted or the
/// quoting is malformed, in which case the raw text is kept.
pub fn unquote_path(path: &str) -> Option<String> {
    let inner = path.strip_prefix('"')?.strip_suffix('"')?;
    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let escape = *bytes.get(i + 1)?;
        i += 2;
        let decoded = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'"' => b'"',
            b'\\' => b'\\',
            // Three octal digits, one byte of the raw name
            b'0'..=b'3' => {
                let digits = bytes.get(i..i + 2)?;
                if !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                    return None;
                }
                i += 2;
                (escape - b'0') * 64 + (digits[0] - b'0') * 8 + (digits[1] - b'0')
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

/// Destination path of a rename, or `None` if `path` is not a rename.
///
/// Handles both `old => new` and the compact `dir/{old => new}/file` form.
/// A path that legitimately contains `" => "` is misread as a rename.
pub fn resolve_rename(path: &str) -> Option<String> {
    let arrow = path.find(RENAME_ARROW)?;

    let braces = path[..arrow]
        .rfind('{')
        .zip(path[arrow..].find('}').map(|i| arrow + i));

    let Some((open, close)) = braces else {
        return Some(path[arrow + RENAME_ARROW.len()..].to_string());
    };

    let new_inner = &path[arrow + RENAME_ARROW.len()..close];
    let joined = format!("{}{}{}", &path[..open], new_inner, &path[close + 1..]);

    // `{old => }` leaves an empty segment behind
    let normalized = joined.replace("//", "/");
    Some(normalized.trim_start_matches('/').to_string())
}
