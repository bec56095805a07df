//! # State Invariant Definitions & Verification
//!
//! Invariants over [`PowerFuturesSnapshot`] that must hold after every
//! action. Compose them with [`InvariantSet`].
//!
//! Every check is linear in the number of records and batches, apart from
//! the id-uniqueness checks which are quadratic on the small pools the
//! generators use.

extern crate std;

use std::string::String;
use std::vec::Vec;

use super::PowerFuturesSnapshot;

// ── Invariant Trait ──────────────────────────────────────────────────────────

pub trait Invariant {
    /// Human-readable name for error messages.
    fn name(&self) -> &str;

    /// `Err(description)` on violation.
    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String>;
}

// ── Built-in Invariants ──────────────────────────────────────────────────────

/// **Index uniqueness**: each record id appears in the key index once.
pub struct IndexHasNoDuplicates;

impl Invariant for IndexHasNoDuplicates {
    fn name(&self) -> &str {
        "key index has no duplicate ids"
    }

    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String> {
        for (i, id) in snapshot.index.iter().enumerate() {
            if snapshot.index[i + 1..].contains(id) {
                return Err(std::format!("id {:?} indexed more than once", id));
            }
        }
        Ok(())
    }
}

/// **Index completeness**: every indexed id resolves to a record and every
/// listed record is indexed.
pub struct IndexMatchesRecords;

impl Invariant for IndexMatchesRecords {
    fn name(&self) -> &str {
        "key index == stored records"
    }

    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String> {
        for id in &snapshot.index {
            if snapshot.record(id).is_none() {
                return Err(std::format!("indexed id {:?} has no record", id));
            }
        }
        if snapshot.records.len() != snapshot.index.len() {
            return Err(std::format!(
                "{} records listed for {} indexed ids",
                snapshot.records.len(),
                snapshot.index.len()
            ));
        }
        Ok(())
    }
}

/// **Single open batch**: every batch before the current one is closed.
pub struct OnlyCurrentBatchOpen;

impl Invariant for OnlyCurrentBatchOpen {
    fn name(&self) -> &str {
        "at most the current batch is open"
    }

    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String> {
        for b in &snapshot.batches {
            if b.id != snapshot.current_batch && !b.closed {
                return Err(std::format!(
                    "batch {} is open while {} is current",
                    b.id,
                    snapshot.current_batch
                ));
            }
        }
        Ok(())
    }
}

/// **Sequential batch ids**: batches `1..=current` all exist.
pub struct BatchIdsSequential;

impl Invariant for BatchIdsSequential {
    fn name(&self) -> &str {
        "batch ids are 1..=current"
    }

    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String> {
        if snapshot.current_batch == 0 {
            return Err(String::from("no batch after initialisation"));
        }
        for (i, b) in snapshot.batches.iter().enumerate() {
            if b.id != i as u64 + 1 || !b.exists {
                return Err(std::format!("batch {} missing", i + 1));
            }
        }
        Ok(())
    }
}

/// **Batch membership**: each record sits in exactly one batch log, the log of
/// the batch it names, and each log's length matches its submission counter.
pub struct BatchLogsConsistent;

impl Invariant for BatchLogsConsistent {
    fn name(&self) -> &str {
        "batch logs partition the records"
    }

    fn check(&self, snapshot: &PowerFuturesSnapshot) -> Result<(), String> {
        let mut seen = 0usize;
        for b in &snapshot.batches {
            if b.log.len() != b.submissions as usize {
                return Err(std::format!(
                    "batch {} logs {} ids but counts {}",
                    b.id,
                    b.log.len(),
                    b.submissions
                ));
            }
            for id in &b.log {
                match snapshot.record(id) {
                    Some(r) if r.batch_id == b.id => seen += 1,
                    Some(r) => {
                        return Err(std::format!(
                            "id {:?} logged in batch {} but stored for batch {}",
                            id,
                            b.id,
                            r.batch_id
                        ))
                    }
                    None => return Err(std::format!("batch {} logs unknown id {:?}", b.id, id)),
                }
            }
        }
        if seen != snapshot.records.len() {
            return Err(std::format!(
                "{} records but {} batch log entries",
                snapshot.records.len(),
                seen
            ));
        }
        Ok(())
    }
}

// ── Invariant Set ────────────────────────────────────────────────────────────

pub struct InvariantSet {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Every built-in invariant.
    pub fn power_futures_defaults() -> Self {
        let mut set = Self::new();
        set.add(Box::new(IndexHasNoDuplicates));
        set.add(Box::new(IndexMatchesRecords));
        set.add(Box::new(OnlyCurrentBatchOpen));
        set.add(Box::new(BatchIdsSequential));
        set.add(Box::new(BatchLogsConsistent));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// `(invariant_name, violation_message)` for every failure.
    pub fn check_all(&self, snapshot: &PowerFuturesSnapshot) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for inv in &self.invariants {
            if let Err(msg) = inv.check(snapshot) {
                violations.push((inv.name().to_string(), msg));
            }
        }
        violations
    }

    /// Panics with a report listing every violation.
    pub fn assert_all(&self, snapshot: &PowerFuturesSnapshot) {
        let violations = self.check_all(snapshot);
        if !violations.is_empty() {
            let mut report = String::from("Invariant violations detected:\n");
            for (name, msg) in &violations {
                report.push_str(&std::format!("  ✗ [{}]: {}\n", name, msg));
            }
            panic!("{}", report);
        }
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl Default for InvariantSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Transition Invariants ────────────────────────────────────────────────────

/// Relationship between the snapshots before and after one action.
pub trait TransitionInvariant {
    fn name(&self) -> &str;
    fn check(&self, before: &PowerFuturesSnapshot, after: &PowerFuturesSnapshot)
        -> Result<(), String>;
}

/// **Append-only index**: the index after an action starts with the index
/// before it.
pub struct IndexAppendOnly;

impl TransitionInvariant for IndexAppendOnly {
    fn name(&self) -> &str {
        "key index is append-only"
    }

    fn check(
        &self,
        before: &PowerFuturesSnapshot,
        after: &PowerFuturesSnapshot,
    ) -> Result<(), String> {
        if after.index.len() < before.index.len()
            || after.index[..before.index.len()] != before.index[..]
        {
            return Err(String::from("existing index entries were reordered or removed"));
        }
        Ok(())
    }
}

/// **Monotonic batches**: the current batch id never decreases, and a closed
/// batch never reopens.
pub struct BatchesMonotonic;

impl TransitionInvariant for BatchesMonotonic {
    fn name(&self) -> &str {
        "batches only move forward"
    }

    fn check(
        &self,
        before: &PowerFuturesSnapshot,
        after: &PowerFuturesSnapshot,
    ) -> Result<(), String> {
        if after.current_batch < before.current_batch {
            return Err(std::format!(
                "current batch went from {} to {}",
                before.current_batch,
                after.current_batch
            ));
        }
        for b in &before.batches {
            let reopened = after
                .batches
                .iter()
                .any(|a| a.id == b.id && b.closed && !a.closed);
            if reopened {
                return Err(std::format!("batch {} reopened", b.id));
            }
        }
        Ok(())
    }
}

pub struct TransitionInvariantSet {
    invariants: Vec<Box<dyn TransitionInvariant>>,
}

impl TransitionInvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    pub fn power_futures_defaults() -> Self {
        let mut set = Self::new();
        set.add(Box::new(IndexAppendOnly));
        set.add(Box::new(BatchesMonotonic));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn TransitionInvariant>) {
        self.invariants.push(invariant);
    }

    pub fn assert_all(&self, before: &PowerFuturesSnapshot, after: &PowerFuturesSnapshot) {
        for inv in &self.invariants {
            if let Err(msg) = inv.check(before, after) {
                panic!("Transition invariant [{}] violated: {}", inv.name(), msg);
            }
        }
    }
}

impl Default for TransitionInvariantSet {
    fn default() -> Self {
        Self::new()
    }
}
