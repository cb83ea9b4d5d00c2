//! Process-wide session cache plus per-session turn serialization.
//!
//! A turn reads the session, grounds against it, and writes it back across several awaits.
//! Two turns for the same session id must not interleave those steps, or both would transition
//! from the same stale state. Every turn therefore holds the session's [`SessionGuard`] from
//! load to persist.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use moka::sync::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use lectern_domain::session::Session;

use crate::{Error, Result};

pub struct SessionStore {
	cache: Cache<String, Session>,
	locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}
impl SessionStore {
	pub fn new(cfg: &lectern_config::Session) -> Self {
		let cache = Cache::builder()
			.max_capacity(cfg.max_sessions)
			.time_to_live(Duration::from_secs(cfg.ttl_seconds))
			.build();

		Self { cache, locks: Arc::new(DashMap::new()) }
	}

	pub fn get(&self, session_id: &str) -> Option<Session> {
		self.cache.get(session_id)
	}

	/// Stores `session`, restarting its time to live.
	pub fn put(&self, session: Session) {
		self.cache.insert(session.id().to_string(), session);
	}

	pub fn remove(&self, session_id: &str) {
		self.cache.invalidate(session_id);
	}

	/// The cached session, or a fresh one. A session owned by another user is never handed out.
	pub fn load_or_create(&self, session_id: &str, user_id: &str) -> Result<Session> {
		match self.cache.get(session_id) {
			Some(session) if session.user_id() != user_id => Err(Error::SessionDenied {
				message: "Session belongs to a different user.".to_string(),
			}),
			Some(session) => Ok(session),
			None => Ok(Session::new(session_id, user_id)),
		}
	}

	/// Waits until no other turn holds `session_id`.
	pub async fn lock(&self, session_id: &str) -> SessionGuard {
		let lock = self
			.locks
			.entry(session_id.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();
		let guard = lock.lock_owned().await;

		SessionGuard { guard: Some(guard), key: session_id.to_string(), locks: self.locks.clone() }
	}

	pub fn active_locks(&self) -> usize {
		self.locks.len()
	}
}

pub struct SessionGuard {
	guard: Option<OwnedMutexGuard<()>>,
	key: String,
	locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}
impl Drop for SessionGuard {
	fn drop(&mut self) {
		drop(self.guard.take());

		// Only the map itself still references the lock when nobody holds or awaits it.
		self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
	}
}
