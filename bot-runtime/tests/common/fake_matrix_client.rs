//! In-memory [`bot_core::MatrixClient`] for integration tests.
//!
//! Serves scripted `/sync` results in order and records every call. Once the script is exhausted it
//! cancels its token and fails, so a sync loop under test ends with `Exit` instead of polling forever.

use async_trait::async_trait;
use bot_core::{BotError, MatrixClient, Presence, Result, SyncResponse};
use bot_runtime::CancellationToken;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

/// One recorded `/sync` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCall {
    pub filter: Option<String>,
    pub since: Option<String>,
    pub timeout_ms: u64,
}

impl SyncCall {
    pub fn new(since: Option<&str>, timeout_ms: u64) -> Self {
        Self {
            filter: None,
            since: since.map(str::to_string),
            timeout_ms,
        }
    }
}

#[derive(Default)]
pub struct FakeMatrixClient {
    pub cancel: CancellationToken,
    script: Mutex<VecDeque<Result<SyncResponse>>>,
    sync_calls: Mutex<Vec<SyncCall>>,
    joined: Mutex<BTreeSet<String>>,
    joined_rooms_failures: Mutex<usize>,
    leave_failures: Mutex<BTreeSet<String>>,
    joins: Mutex<Vec<String>>,
    leaves: Mutex<Vec<String>>,
    notices: Mutex<Vec<(String, String)>>,
}

impl FakeMatrixClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful `/sync` response.
    pub fn push(&self, response: SyncResponse) -> &Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queues a failed `/sync` call.
    pub fn push_error(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(BotError::Client(message.to_string())));
        self
    }

    pub fn set_joined(&self, rooms: &[&str]) {
        *self.joined.lock().unwrap() = rooms.iter().map(|r| r.to_string()).collect();
    }

    /// Makes the next `count` calls to `joined_rooms` fail.
    pub fn fail_joined_rooms(&self, count: usize) {
        *self.joined_rooms_failures.lock().unwrap() = count;
    }

    /// Makes every `leave_room` for `room_id` fail.
    pub fn fail_leave(&self, room_id: &str) {
        self.leave_failures.lock().unwrap().insert(room_id.to_string());
    }

    pub fn sync_calls(&self) -> Vec<SyncCall> {
        self.sync_calls.lock().unwrap().clone()
    }

    pub fn joins(&self) -> Vec<String> {
        self.joins.lock().unwrap().clone()
    }

    pub fn leaves(&self) -> Vec<String> {
        self.leaves.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatrixClient for FakeMatrixClient {
    async fn sync(
        &self,
        filter: Option<&str>,
        since: Option<&str>,
        _full_state: bool,
        _set_presence: Option<Presence>,
        timeout_ms: u64,
    ) -> Result<SyncResponse> {
        self.sync_calls.lock().unwrap().push(SyncCall {
            filter: filter.map(str::to_string),
            since: since.map(str::to_string),
            timeout_ms,
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                self.cancel.cancel();
                Err(BotError::Client("script exhausted".to_string()))
            }
        }
    }

    async fn joined_rooms(&self) -> Result<Vec<String>> {
        {
            let mut failures = self.joined_rooms_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(BotError::Client("HTTP 502: Bad Gateway".to_string()));
            }
        }
        Ok(self.joined.lock().unwrap().iter().cloned().collect())
    }

    async fn leave_room(&self, room_id: &str) -> Result<()> {
        if self.leave_failures.lock().unwrap().contains(room_id) {
            return Err(BotError::Client("HTTP 403: Forbidden".to_string()));
        }
        self.joined.lock().unwrap().remove(room_id);
        self.leaves.lock().unwrap().push(room_id.to_string());
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        self.joined.lock().unwrap().insert(room_id.to_string());
        self.joins.lock().unwrap().push(room_id.to_string());
        Ok(())
    }

    async fn send_notice(&self, room_id: &str, text: &str) -> Result<()> {
        self.notices
            .lock()
            .unwrap()
            .push((room_id.to_string(), text.to_string()));
        Ok(())
    }
}
