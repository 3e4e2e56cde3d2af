//! In-memory store
//!
//! Mirrors the Redis data model closely enough to exercise the producer and
//! the worker loop without a server: hashes, one index set, and streams with
//! consumer groups (delivery cursor, pending list, acknowledgment, blocking
//! reads). Failures can be injected to drive error paths.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{ReadGroup, Store, StreamMessage};
use crate::error::{Result, StoreError};

#[derive(Default)]
struct StreamState {
    entries: Vec<StreamMessage>,
    groups: HashMap<String, GroupState>,
}

#[derive(Default)]
struct GroupState {
    /// Index of the next entry never delivered to this group
    next_index: usize,
    /// Delivered but unacknowledged entries: entry ID -> consumer
    pending: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    jobs: HashMap<String, HashMap<String, String>>,
    index: HashSet<String>,
    streams: HashMap<String, StreamState>,
    next_entry_seq: u64,
    failing_inserts: usize,
    failing_reads: usize,
    failing_appends: usize,
    failing_updates: usize,
    failing_lookups: usize,
}

/// Store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    appended: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =============================================================================
    // Inspection and seeding
    // =============================================================================

    /// Returns the raw record of a job, if it exists
    pub fn job(&self, job_id: &str) -> Option<HashMap<String, String>> {
        self.state().jobs.get(job_id).cloned()
    }

    /// Writes a record directly, bypassing the index
    pub fn seed_job(&self, job_id: &str, fields: &[(&str, &str)]) {
        let mut state = self.state();
        let record = state.jobs.entry(job_id.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.to_string(), value.to_string());
        }
    }

    /// Adds IDs to the job index directly
    pub fn seed_index(&self, job_ids: &[&str]) {
        let mut state = self.state();
        for id in job_ids {
            state.index.insert(id.to_string());
        }
    }

    /// Returns the IDs in the job index
    pub fn index_members(&self) -> HashSet<String> {
        self.state().index.clone()
    }

    /// Returns every entry ever appended to a stream
    pub fn stream_entries(&self, stream: &str) -> Vec<StreamMessage> {
        self.state()
            .streams
            .get(stream)
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    /// Returns the IDs of delivered but unacknowledged entries of a group
    pub fn pending(&self, stream: &str, group: &str) -> Vec<String> {
        self.state()
            .streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.pending.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends an entry with raw byte values, e.g. to simulate foreign writers
    pub fn append_raw(&self, stream: &str, fields: Vec<(String, Vec<u8>)>) -> String {
        let id = {
            let mut state = self.state();
            state.next_entry_seq += 1;
            let id = format!("{}-0", state.next_entry_seq);
            let message = StreamMessage {
                id: id.clone(),
                fields: fields.into_iter().collect(),
            };
            state
                .streams
                .entry(stream.to_string())
                .or_default()
                .entries
                .push(message);
            id
        };

        self.appended.notify_waiters();
        id
    }

    // =============================================================================
    // Failure injection
    // =============================================================================

    /// Makes the next `count` job inserts fail
    pub fn fail_inserts(&self, count: usize) {
        self.state().failing_inserts = count;
    }

    /// Makes the next `count` group reads fail
    pub fn fail_reads(&self, count: usize) {
        self.state().failing_reads = count;
    }

    /// Makes the next `count` stream appends fail
    pub fn fail_appends(&self, count: usize) {
        self.state().failing_appends = count;
    }

    /// Makes the next `count` job record updates fail
    pub fn fail_updates(&self, count: usize) {
        self.state().failing_updates = count;
    }

    /// Makes the next `count` job record reads fail
    pub fn fail_lookups(&self, count: usize) {
        self.state().failing_lookups = count;
    }

    fn take_failure(counter: &mut usize, operation: &str) -> Result<()> {
        if *counter > 0 {
            *counter -= 1;
            return Err(StoreError::unavailable(format!(
                "injected {} failure",
                operation
            )));
        }
        Ok(())
    }

    /// Delivers up to `count` new entries to a consumer
    fn deliver(&self, read: &ReadGroup<'_>) -> Result<Vec<StreamMessage>> {
        let mut state = self.state();
        Self::take_failure(&mut state.failing_reads, "read")?;

        let stream = state
            .streams
            .get_mut(read.stream)
            .ok_or_else(|| StoreError::unavailable(format!("NOGROUP no stream {}", read.stream)))?;
        let group = stream
            .groups
            .get_mut(read.group)
            .ok_or_else(|| StoreError::unavailable(format!("NOGROUP no group {}", read.group)))?;

        let end = (group.next_index + read.count).min(stream.entries.len());
        let delivered: Vec<StreamMessage> = stream.entries[group.next_index..end].to_vec();
        group.next_index = end;

        for message in &delivered {
            group
                .pending
                .insert(message.id.clone(), read.consumer.to_string());
        }

        Ok(delivered)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut state = self.state();
        Self::take_failure(&mut state.failing_inserts, "insert")?;

        let record = state.jobs.entry(job_id.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.to_string(), value.clone());
        }
        state.index.insert(job_id.to_string());
        Ok(())
    }

    async fn update_job(&self, job_id: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut state = self.state();
        Self::take_failure(&mut state.failing_updates, "update")?;

        let record = state.jobs.entry(job_id.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.to_string(), value.clone());
        }
        Ok(())
    }

    async fn job_fields(&self, job_id: &str) -> Result<HashMap<String, String>> {
        let mut state = self.state();
        Self::take_failure(&mut state.failing_lookups, "lookup")?;

        Ok(state.jobs.get(job_id).cloned().unwrap_or_default())
    }

    async fn job_ids(&self) -> Result<Vec<String>> {
        Ok(self.state().index.iter().cloned().collect())
    }

    async fn jobs_fields(&self, job_ids: &[String]) -> Result<Vec<HashMap<String, String>>> {
        let state = self.state();
        Ok(job_ids
            .iter()
            .map(|id| state.jobs.get(id).cloned().unwrap_or_default())
            .collect())
    }

    async fn create_group(&self, stream: &str, group: &str) -> Result<()> {
        let mut state = self.state();
        state
            .streams
            .entry(stream.to_string())
            .or_default()
            .groups
            .entry(group.to_string())
            .or_default();
        Ok(())
    }

    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> Result<String> {
        Self::take_failure(&mut self.state().failing_appends, "append")?;

        let raw = fields
            .iter()
            .map(|(field, value)| (field.to_string(), value.as_bytes().to_vec()))
            .collect();
        Ok(self.append_raw(stream, raw))
    }

    async fn read_group(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>> {
        let deadline = Instant::now() + read.block;

        loop {
            // Register for wakeups before checking, so an append between the
            // check and the wait is not missed
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let delivered = self.deliver(&read)?;
            if !delivered.is_empty() {
                return Ok(delivered);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn read_pending(&self, read: ReadGroup<'_>) -> Result<Vec<StreamMessage>> {
        let mut state = self.state();
        Self::take_failure(&mut state.failing_reads, "read")?;

        let stream = state
            .streams
            .get(read.stream)
            .ok_or_else(|| StoreError::unavailable(format!("NOGROUP no stream {}", read.stream)))?;
        let group = stream
            .groups
            .get(read.group)
            .ok_or_else(|| StoreError::unavailable(format!("NOGROUP no group {}", read.group)))?;

        Ok(stream
            .entries
            .iter()
            .filter(|message| {
                group
                    .pending
                    .get(&message.id)
                    .is_some_and(|consumer| consumer == read.consumer)
            })
            .take(read.count)
            .cloned()
            .collect())
    }

    async fn ack(&self, stream: &str, group: &str, entry_id: &str) -> Result<()> {
        let mut state = self.state();
        if let Some(group) = state
            .streams
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
        {
            group.pending.remove(entry_id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
