// src/crawl/driver.rs
// =============================================================================
// The crawl loop.
//
// One iteration:
// 1. Pop a prefix from the frontier (depth-first)
// 2. Fetch it through the rate-limited fetcher
// 3. Append names we have never seen to the output file
// 4. If the response was a full page, push the prefix's children
// 5. Checkpoint the frontier
//
// Step 3 is synced to disk before step 5. A crash between them re-queries
// the prefix on restart, which is harmless; the opposite order could mark a
// prefix done whose names were never written.
// =============================================================================

use anyhow::Result;

use super::{CheckpointFile, Frontier, Name, NameSink, Prefix};
use crate::config::Alphabet;
use crate::fetch::{Clock, FetchStats, Fetcher, QueryEndpoint};

/// What a single iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub prefix: Prefix,
    pub new_names: Vec<Name>,
    /// True when children of `prefix` were pushed
    pub expanded: bool,
}

/// Totals for one `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub queries: u64,
    pub names_added: u64,
    pub names_total: usize,
    pub fetch: FetchStats,
}

pub struct Crawler<E, C> {
    fetcher: Fetcher<E, C>,
    frontier: Frontier,
    checkpoint: CheckpointFile,
    sink: NameSink,
    alphabet: Alphabet,
    page_cap: usize,
}

impl<E: QueryEndpoint, C: Clock> Crawler<E, C> {
    pub fn new(
        fetcher: Fetcher<E, C>,
        frontier: Frontier,
        checkpoint: CheckpointFile,
        sink: NameSink,
        alphabet: Alphabet,
        page_cap: usize,
    ) -> Self {
        Self {
            fetcher,
            frontier,
            checkpoint,
            sink,
            alphabet,
            page_cap,
        }
    }

    /// Run one iteration. Returns None once the frontier is drained.
    pub async fn step(&mut self) -> Result<Option<StepReport>> {
        // Empty stack means the crawl is finished
        let Some(prefix) = self.frontier.pop() else {
            return Ok(None);
        };

        // Never fails: throttling and network errors are retried inside
        let outcome = self.fetcher.fetch(&prefix).await;

        // Keep only names we have not written before
        let new_names = self.sink.filter_new(&outcome.results);
        if !new_names.is_empty() {
            // Must hit the disk before the checkpoint below
            self.sink.save(&new_names)?;
            tracing::info!("✅ Saved {} names from '{}'", new_names.len(), prefix);
        }

        // A full page means the endpoint truncated the list: go one level deeper.
        // Anything shorter is trusted to be complete, so the prefix is a leaf.
        let expanded = outcome.count == self.page_cap;
        if expanded {
            self.frontier.push_children(&prefix, &self.alphabet);
        }

        // Record "work not yet done" so a restart resumes right here
        self.frontier.checkpoint(&self.checkpoint)?;

        Ok(Some(StepReport {
            prefix,
            new_names,
            expanded,
        }))
    }

    /// Step until the frontier is empty.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let mut queries = 0;
        let mut names_added = 0;

        // Any I/O error stops the loop via `?`
        while let Some(report) = self.step().await? {
            queries += 1;
            names_added += report.new_names.len() as u64;
            tracing::debug!(
                prefix = %report.prefix,
                expanded = report.expanded,
                pending = self.pending(),
                "prefix done"
            );
        }

        Ok(CrawlSummary {
            queries,
            names_added,
            names_total: self.sink.len(),
            fetch: self.fetcher.stats(),
        })
    }

    pub fn pending(&self) -> usize {
        self.frontier.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fetch::{FetchError, QueryOutcome, RateGate};
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    const PAGE_CAP: usize = 10;

    // In-memory endpoint: fixed answers per prefix, empty for anything else
    #[derive(Default)]
    struct FakeEndpoint {
        answers: HashMap<String, QueryOutcome>,
        queried: Mutex<Vec<String>>,
    }

    impl FakeEndpoint {
        fn answer(mut self, prefix: &str, count: usize, names: &[&str]) -> Self {
            let outcome = QueryOutcome {
                results: names.iter().map(|n| n.to_string()).collect(),
                count,
            };
            self.answers.insert(prefix.to_string(), outcome);
            self
        }

        fn queried(&self) -> Vec<String> {
            self.queried.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryEndpoint for Arc<FakeEndpoint> {
        async fn query(&self, prefix: &str) -> Result<QueryOutcome, FetchError> {
            self.queried.lock().unwrap().push(prefix.to_string());
            Ok(self.answers.get(prefix).cloned().unwrap_or_default())
        }
    }

    fn crawler(
        endpoint: &Arc<FakeEndpoint>,
        dir: &Path,
        alphabet: &Alphabet,
    ) -> Crawler<Arc<FakeEndpoint>, ManualClock> {
        let checkpoint = CheckpointFile::new(dir.join("progress.txt"));
        let frontier = Frontier::restore(&checkpoint, alphabet).unwrap();
        let sink = NameSink::open(dir.join("all_names.csv")).unwrap();
        let gate = RateGate::new(100, Duration::from_secs(60));
        let fetcher = Fetcher::new(Arc::clone(endpoint), ManualClock::new(), gate);
        Crawler::new(fetcher, frontier, checkpoint, sink, alphabet.clone(), PAGE_CAP)
    }

    fn a_names() -> Vec<String> {
        (1..=10).map(|n| format!("a{}", n)).collect()
    }

    // "a" is truncated, "aa" has three names, every other prefix is empty
    fn scenario() -> FakeEndpoint {
        let a = a_names();
        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        FakeEndpoint::default()
            .answer("a", PAGE_CAP, &a)
            .answer("aa", 3, &["aa1", "aa2", "aa3"])
    }

    fn output_set(dir: &Path) -> BTreeSet<String> {
        fs::read_to_string(dir.join("all_names.csv"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(scenario());
        let mut crawler = crawler(&endpoint, dir.path(), &Alphabet::default());

        let summary = crawler.run().await.unwrap();

        let mut expected: BTreeSet<String> = a_names().into_iter().collect();
        expected.extend(["aa1", "aa2", "aa3"].map(String::from));
        assert_eq!(output_set(dir.path()), expected);
        assert_eq!(summary.names_total, 13);
        assert_eq!(summary.names_added, 13);
        // 26 seeds plus the 26 children of "a"
        assert_eq!(summary.queries, 52);
        assert!(!endpoint.queried().iter().any(|p| p.len() > 2));
        assert_eq!(fs::read_to_string(dir.path().join("progress.txt")).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_deepening_visits_children_in_order() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(scenario());
        let mut crawler = crawler(&endpoint, dir.path(), &Alphabet::default());

        crawler.run().await.unwrap();

        let queried = endpoint.queried();
        let a_at = queried.iter().position(|p| p == "a").unwrap();
        let children: Vec<String> = ('a'..='z').map(|c| format!("a{}", c)).collect();
        // Seeds pop from "z" down, so "a" is last and its children follow it
        assert_eq!(a_at, 25);
        assert_eq!(&queried[a_at + 1..], children.as_slice());
        let seeds: Vec<String> = ('a'..='z').rev().map(|c| c.to_string()).collect();
        assert_eq!(&queried[..26], seeds.as_slice());
    }

    #[tokio::test]
    async fn test_query_order_is_deterministic() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let one = Arc::new(scenario());
        let two = Arc::new(scenario());

        crawler(&one, first.path(), &Alphabet::default()).run().await.unwrap();
        crawler(&two, second.path(), &Alphabet::default()).run().await.unwrap();

        assert_eq!(one.queried(), two.queried());
        assert_eq!(
            fs::read_to_string(first.path().join("all_names.csv")).unwrap(),
            fs::read_to_string(second.path().join("all_names.csv")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let dir = tempdir().unwrap();
        let endpoint = Arc::new(scenario());
        crawler(&endpoint, dir.path(), &Alphabet::default()).run().await.unwrap();
        let before = fs::read_to_string(dir.path().join("all_names.csv")).unwrap();
        let queries = endpoint.queried().len();

        let summary = crawler(&endpoint, dir.path(), &Alphabet::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.queries, 0);
        assert_eq!(summary.names_total, 13);
        assert_eq!(endpoint.queried().len(), queries);
        assert_eq!(fs::read_to_string(dir.path().join("all_names.csv")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_overlapping_results_are_written_once() {
        let dir = tempdir().unwrap();
        let alphabet: Alphabet = "ab".parse().unwrap();
        let endpoint = Arc::new(
            FakeEndpoint::default()
                .answer("a", 3, &["ann", "bob", "ann"])
                .answer("b", 2, &["bob", "bea"]),
        );

        crawler(&endpoint, dir.path(), &alphabet).run().await.unwrap();

        let raw = fs::read_to_string(dir.path().join("all_names.csv")).unwrap();
        let mut lines: Vec<&str> = raw.lines().collect();
        // "b" is popped first
        assert_eq!(lines, vec!["bob", "bea", "ann"]);
        lines.sort();
        lines.dedup();
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_resume_after_interruption_matches_full_run() {
        let full_dir = tempdir().unwrap();
        let full = Arc::new(scenario());
        crawler(&full, full_dir.path(), &Alphabet::default())
            .run()
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let endpoint = Arc::new(scenario());
        {
            // Stop part way through the children of "a"
            let mut interrupted = crawler(&endpoint, dir.path(), &Alphabet::default());
            for _ in 0..28 {
                interrupted.step().await.unwrap();
            }
            assert!(interrupted.pending() > 0);
            assert_eq!(interrupted.sink.len(), 13);
        }

        let mut resumed = crawler(&endpoint, dir.path(), &Alphabet::default());
        assert_eq!(resumed.sink.len(), 13);
        resumed.run().await.unwrap();

        assert_eq!(output_set(dir.path()), output_set(full_dir.path()));
        assert_eq!(endpoint.queried(), full.queried());
    }

    #[tokio::test]
    async fn test_step_on_drained_frontier() {
        let dir = tempdir().unwrap();
        CheckpointFile::new(dir.path().join("progress.txt"))
            .save(&[])
            .unwrap();
        let endpoint = Arc::new(FakeEndpoint::default());
        let mut crawler = crawler(&endpoint, dir.path(), &Alphabet::default());

        assert_eq!(crawler.step().await.unwrap(), None);
        assert!(endpoint.queried().is_empty());
    }

    #[tokio::test]
    async fn test_step_reports_expansion() {
        let dir = tempdir().unwrap();
        let alphabet: Alphabet = "xy".parse().unwrap();
        let endpoint = Arc::new(FakeEndpoint::default().answer("y", PAGE_CAP, &["yo"]));
        let mut crawler = crawler(&endpoint, dir.path(), &alphabet);

        let report = crawler.step().await.unwrap().unwrap();

        assert_eq!(report.prefix, "y");
        assert_eq!(report.new_names, vec!["yo"]);
        assert!(report.expanded);
        assert_eq!(
            fs::read_to_string(dir.path().join("progress.txt")).unwrap(),
            r#"["x","yy","yx"]"#
        );
    }

    #[tokio::test]
    async fn test_failed_output_write_is_fatal_and_keeps_checkpoint() {
        let dir = tempdir().unwrap();
        let alphabet: Alphabet = "ab".parse().unwrap();
        let checkpoint = dir.path().join("progress.txt");
        CheckpointFile::new(&checkpoint)
            .save(&["a".to_string(), "b".to_string()])
            .unwrap();
        let endpoint = Arc::new(FakeEndpoint::default().answer("b", 1, &["bob"]));
        let mut crawl = crawler(&endpoint, dir.path(), &alphabet);

        // A directory where the output file should be makes the append fail
        let output = dir.path().join("all_names.csv");
        fs::create_dir(&output).unwrap();

        let err = crawl.step().await.unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to open output"));
        // "b" was not marked done on disk
        assert_eq!(fs::read_to_string(&checkpoint).unwrap(), r#"["a","b"]"#);

        // After the operator fixes the disk, a restart queries "b" again
        fs::remove_dir(&output).unwrap();
        let mut restarted = crawler(&endpoint, dir.path(), &alphabet);
        let report = restarted.step().await.unwrap().unwrap();
        assert_eq!(report.prefix, "b");
        assert_eq!(report.new_names, vec!["bob"]);
        assert_eq!(endpoint.queried(), vec!["b", "b"]);
    }

    #[tokio::test]
    async fn test_resume_after_torn_output_matches_full_run() {
        let full_dir = tempdir().unwrap();
        let full = Arc::new(scenario());
        crawler(&full, full_dir.path(), &Alphabet::default())
            .run()
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let endpoint = Arc::new(scenario());
        {
            // Query the seeds down to "b", leaving "a" on the stack
            let mut interrupted = crawler(&endpoint, dir.path(), &Alphabet::default());
            for _ in 0..25 {
                interrupted.step().await.unwrap();
            }
        }
        // Crash while appending the names of "a": only part of one line landed
        fs::write(dir.path().join("all_names.csv"), "a1\na").unwrap();

        crawler(&endpoint, dir.path(), &Alphabet::default())
            .run()
            .await
            .unwrap();

        assert_eq!(output_set(dir.path()), output_set(full_dir.path()));
        let raw = fs::read_to_string(dir.path().join("all_names.csv")).unwrap();
        assert_eq!(raw.lines().count(), 13);
    }
}
