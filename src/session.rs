//! Builder-session registry.
//!
//! A front end starts a block-placing agent session for a user before
//! handing it build plans. The registry records which sessions exist so a
//! second start request for the same session is answered with
//! [`StartStatus::AlreadyRunning`] instead of spawning a duplicate agent.
//!
//! The registry is an ordinary value the host owns and shares (usually in an
//! `Arc`); there is no process-global state. [`SessionPolicy::SingleProcess`]
//! keeps the "one agent per process" behaviour when the target world only
//! supports a single builder.
//!
//! The registry does not launch agents itself; callers act on `Started`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// How many sessions may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// One session per user identifier.
    #[default]
    PerUser,
    /// One session in total, whoever asked first.
    SingleProcess,
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

/// Wire shape of a start response: `{"status": "started"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub status: StartStatus,
}

impl From<StartStatus> for StartResponse {
    fn from(status: StartStatus) -> Self {
        Self { status }
    }
}

#[derive(Debug, Clone)]
struct Session {
    started_at: Instant,
}

/// Registry of running builder sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    policy: SessionPolicy,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Record a session for `user` unless one is already running.
    ///
    /// Check and insert happen under one lock, so concurrent callers can
    /// never both see `Started` for the same slot.
    pub fn start(&self, user: &str) -> StartStatus {
        let mut sessions = self.sessions.lock();
        let occupied = match self.policy {
            SessionPolicy::PerUser => sessions.contains_key(user),
            SessionPolicy::SingleProcess => !sessions.is_empty(),
        };
        if occupied {
            return StartStatus::AlreadyRunning;
        }
        sessions.insert(
            user.to_string(),
            Session {
                started_at: Instant::now(),
            },
        );
        info!("Builder session started for '{}'", user);
        StartStatus::Started
    }

    /// Forget the session for `user`. Returns whether one existed.
    pub fn stop(&self, user: &str) -> bool {
        let removed = self.sessions.lock().remove(user).is_some();
        if removed {
            info!("Builder session stopped for '{}'", user);
        }
        removed
    }

    pub fn is_running(&self, user: &str) -> bool {
        self.sessions.lock().contains_key(user)
    }

    /// Users with a running session, sorted.
    pub fn active_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.sessions.lock().keys().cloned().collect();
        users.sort();
        users
    }

    /// Seconds since `user`'s session started.
    pub fn uptime_secs(&self, user: &str) -> Option<u64> {
        self.sessions
            .lock()
            .get(user)
            .map(|s| s.started_at.elapsed().as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn second_start_for_same_user_is_already_running() {
        let reg = SessionRegistry::new(SessionPolicy::PerUser);
        assert_eq!(reg.start("steve"), StartStatus::Started);
        assert_eq!(reg.start("steve"), StartStatus::AlreadyRunning);
        assert_eq!(reg.start("alex"), StartStatus::Started);
        assert_eq!(reg.active_users(), vec!["alex", "steve"]);
    }

    #[test]
    fn single_process_allows_one_session_total() {
        let reg = SessionRegistry::new(SessionPolicy::SingleProcess);
        assert_eq!(reg.start("steve"), StartStatus::Started);
        assert_eq!(reg.start("alex"), StartStatus::AlreadyRunning);
        assert!(!reg.is_running("alex"));
    }

    #[test]
    fn stop_frees_the_slot() {
        let reg = SessionRegistry::new(SessionPolicy::SingleProcess);
        reg.start("steve");
        assert!(reg.stop("steve"));
        assert!(!reg.stop("steve"));
        assert_eq!(reg.start("alex"), StartStatus::Started);
        assert_eq!(reg.uptime_secs("alex"), Some(0));
    }

    #[test]
    fn start_response_wire_shape() {
        let started = serde_json::to_string(&StartResponse::from(StartStatus::Started)).unwrap();
        assert_eq!(started, r#"{"status":"started"}"#);
        let running =
            serde_json::to_string(&StartResponse::from(StartStatus::AlreadyRunning)).unwrap();
        assert_eq!(running, r#"{"status":"already_running"}"#);
    }

    #[test]
    fn concurrent_starts_yield_one_winner() {
        let reg = Arc::new(SessionRegistry::new(SessionPolicy::PerUser));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.start("steve"))
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|s| *s == StartStatus::Started)
            .count();
        assert_eq!(started, 1);
    }
}
