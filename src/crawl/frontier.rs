// src/crawl/frontier.rs
// =============================================================================
// This module holds the prefixes that still have to be queried.
//
// How it works:
// 1. A fresh crawl starts with one prefix per alphabet symbol
// 2. The crawler pops the top prefix (last in, first out = depth-first)
// 3. If the answer was truncated, every one-symbol extension is pushed
// 4. After every iteration the whole stack is written to the checkpoint file
//
// The checkpoint is a JSON array, bottom of the stack first. Restarting with
// the same file resumes with exactly the same traversal order.
//
// Rust concepts:
// - Vec as a stack: push() and pop() both work on the end
// - Atomic file replacement: write a temp file, then rename over the old one
// =============================================================================

use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::Alphabet;

/// A partial query string; one node of the search tree.
pub type Prefix = String;

/// Stack of prefixes not yet queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    stack: Vec<Prefix>,
}

impl Frontier {
    /// One single-symbol prefix per alphabet symbol.
    ///
    /// Symbols are pushed in alphabet order, so the last symbol is on top and
    /// is explored first.
    pub fn seed(alphabet: &Alphabet) -> Self {
        Self {
            stack: alphabet.symbols().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Resume from `checkpoint`, or seed when there is none yet.
    pub fn restore(checkpoint: &CheckpointFile, alphabet: &Alphabet) -> Result<Self> {
        // A saved stack (even an empty one) wins over a fresh seed
        Ok(match checkpoint.load()? {
            Some(stack) => Self { stack },
            None => Self::seed(alphabet),
        })
    }

    pub fn pop(&mut self) -> Option<Prefix> {
        self.stack.pop()
    }

    /// Push every one-symbol extension of `prefix`.
    ///
    /// Pushed in reverse so the first alphabet symbol is popped first.
    pub fn push_children(&mut self, prefix: &str, alphabet: &Alphabet) {
        for c in alphabet.symbols().iter().rev() {
            // child = prefix + symbol
            let mut child = String::with_capacity(prefix.len() + c.len_utf8());
            child.push_str(prefix);
            child.push(*c);
            self.stack.push(child);
        }
    }

    pub fn checkpoint(&self, checkpoint: &CheckpointFile) -> Result<()> {
        checkpoint.save(&self.stack)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// On-disk snapshot of the frontier.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored stack, or None if no checkpoint was ever written.
    pub fn load(&self) -> Result<Option<Vec<Prefix>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            // No file yet: this is the very first run
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read checkpoint {}", self.path.display())
                })
            }
        };

        let stack = serde_json::from_slice(&data)
            .with_context(|| format!("Corrupt checkpoint {}", self.path.display()))?;
        Ok(Some(stack))
    }

    /// Replace the checkpoint with `stack`.
    pub fn save(&self, stack: &[Prefix]) -> Result<()> {
        // Write next to the real file so the rename stays on one filesystem
        let tmp = self.tmp_path();
        let json = serde_json::to_vec(stack)?;

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        // rename() replaces the old checkpoint in one step: readers see either
        // the old stack or the new one, never half of each
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace checkpoint {}", self.path.display()))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
