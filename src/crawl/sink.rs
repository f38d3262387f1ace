// src/crawl/sink.rs
// =============================================================================
// This module remembers every name we have found and appends new ones to the
// output file.
//
// The output file is the source of truth: at startup it is read back in full
// to rebuild the in-memory "seen" set, which is how duplicates are avoided
// across restarts. After that the file only ever grows.
//
// File format: one name per line, quoted CSV-style only when needed (the name
// contains a comma, a quote, a line break, or is empty). A record only counts
// once its terminating newline is on disk; a half-written tail left by a crash
// is cut off when the file is opened again.
//
// Rust concepts:
// - HashSet: O(1) membership checks for deduplication
// - OpenOptions: Opening a file in append mode
// - Iterators with state: Parsing quoted records character by character
// =============================================================================

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// A discovered result string.
pub type Name = String;

pub struct NameSink {
    path: PathBuf,
    seen: HashSet<Name>,
}

impl NameSink {
    /// Open the output file, loading every name already stored in it.
    ///
    /// A trailing record without its newline (torn by a crash mid-append) is
    /// not loaded and is truncated away, so the next append starts on a clean
    /// line.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Read raw bytes: a torn write may also have split a UTF-8 character
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // First run: nothing stored yet
                return Ok(Self {
                    path,
                    seen: HashSet::new(),
                });
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read output {}", path.display()))
            }
        };

        let contents = valid_utf8_prefix(&data)
            .with_context(|| format!("Output {} is not valid UTF-8", path.display()))?;
        let records = parse_records(contents);

        // Anything past the last complete record is a torn tail
        if records.complete_len < data.len() {
            tracing::warn!(
                "⚠️ Dropping {} bytes of unfinished record at the end of {}",
                data.len() - records.complete_len,
                path.display()
            );
            truncate(&path, records.complete_len)?;
        }

        Ok(Self {
            path,
            seen: records.names.into_iter().collect(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Names in `results` not stored yet, in their original order.
    ///
    /// Repeats inside `results` are dropped too.
    pub fn filter_new(&self, results: &[Name]) -> Vec<Name> {
        // Names already taken from this batch
        let mut batch = HashSet::new();
        results
            .iter()
            .filter(|name| !self.contains(name) && batch.insert(name.as_str()))
            .cloned()
            .collect()
    }

    /// Append `names` to the output file and mark them as seen.
    ///
    /// The batch is written in one go and synced before returning. A crash
    /// mid-write can only lose (part of) this batch.
    pub fn save(&mut self, names: &[Name]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        // Build the whole batch first so it goes out in a single write
        let mut buffer = String::new();
        for name in names {
            write_record(&mut buffer, name);
        }

        // create(true) makes the first save also create the file
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open output {}", self.path.display()))?;

        // sync_all() waits until the data is on disk, not just in the OS cache
        file.write_all(buffer.as_bytes())
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        // Only mark names as seen once they are durable
        self.seen.extend(names.iter().cloned());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

// The longest valid UTF-8 prefix. Only an incomplete character at the very
// end is tolerated; garbage in the middle of the file is an error.
fn valid_utf8_prefix(data: &[u8]) -> Result<&str> {
    match std::str::from_utf8(data) {
        Ok(text) => Ok(text),
        Err(e) if e.error_len().is_none() => Ok(std::str::from_utf8(&data[..e.valid_up_to()])?),
        Err(e) => bail!("invalid byte at offset {}", e.valid_up_to()),
    }
}

fn truncate(path: &Path, len: usize) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open output {}", path.display()))?;
    file.set_len(len as u64)
        .and_then(|_| file.sync_all())
        .with_context(|| format!("Failed to repair output {}", path.display()))
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty() || name.contains([',', '"', '\r', '\n'])
}

fn write_record(out: &mut String, name: &str) {
    if needs_quotes(name) {
        // Inner quotes are doubled: say "hi" -> "say ""hi"""
        out.push('"');
        out.push_str(&name.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(name);
    }
    out.push('\n');
}

/// Names parsed from the output file.
#[derive(Debug, PartialEq, Eq)]
struct Records {
    names: Vec<Name>,
    /// Byte length of the file up to and including the last newline that
    /// ends a complete record
    complete_len: usize,
}

// Splits file contents back into names. Quoted records may span lines. A
// record missing its final newline is left out of `names` and out of
// `complete_len`.
fn parse_records(contents: &str) -> Records {
    let mut names = Vec::new();
    let mut complete_len = 0;
    let mut chars = contents.char_indices().peekable();

    while chars.peek().is_some() {
        let mut field = String::new();
        let mut quoted = false;
        let mut closed = false;
        let mut terminated = false;

        // A quoted field runs until a lone closing quote, newlines included
        if matches!(chars.peek(), Some((_, '"'))) {
            quoted = true;
            chars.next();
            while let Some((_, c)) = chars.next() {
                if c == '"' {
                    if matches!(chars.peek(), Some((_, '"'))) {
                        chars.next();
                        field.push('"');
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    field.push(c);
                }
            }
        }

        // Rest of the line; for quoted records anything after the closing
        // quote is ignored
        for (i, c) in chars.by_ref() {
            if c == '\n' {
                terminated = true;
                complete_len = i + 1;
                break;
            }
            if !quoted {
                field.push(c);
            }
        }

        // No newline means we hit the end of the file mid-record
        if !terminated {
            break;
        }

        if quoted {
            if closed {
                names.push(field);
            }
        } else {
            // Blank lines are not names; "\r\n" line endings are accepted
            let trimmed = field.trim_end_matches('\r');
            if !trimmed.is_empty() {
                names.push(trimmed.to_string());
            }
        }
    }

    Records {
        names,
        complete_len,
    }
}
