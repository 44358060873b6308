//! Backend authentication session.
//!
//! The session is an explicit value owned by a `SessionManager` that is handed
//! to the gateway. Lifecycle:
//!
//! - acquired lazily by the first call, then shared by every later call
//! - invalidated when the backend rejects it, and re-acquired by the caller
//! - a failed login is never cached: the next call logs in again
//! - released on shutdown

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::transport::{Endpoint, RpcTransport};

/// Login material. The password only ever leaves through `execute_kw`
/// arguments; `Debug` never prints it.
#[derive(Clone)]
pub struct Credentials {
    database: String,
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(database: &str, username: &str, password: &str) -> Self {
        Self {
            database: database.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: the backend user id the login exchange returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: i64,
    /// Incremented on every successful login; used to avoid dropping a
    /// session that another caller already refreshed.
    pub generation: u64,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Session>,
    logins: u64,
}

#[derive(Debug)]
pub struct SessionManager {
    credentials: Credentials,
    slot: Mutex<Slot>,
}

impl SessionManager {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return the live session, logging in first if there is none.
    ///
    /// Concurrent first callers wait on the same lock, so only one login
    /// exchange happens.
    pub async fn acquire(&self, transport: &dyn RpcTransport) -> Result<Session, GatewayError> {
        let mut slot = self.slot.lock().await;
        if let Some(session) = &slot.current {
            return Ok(session.clone());
        }

        let uid = self.login(transport).await?;
        slot.logins += 1;
        let session = Session {
            uid,
            generation: slot.logins,
            acquired_at: Utc::now(),
        };
        tracing::info!(
            uid,
            generation = session.generation,
            database = %self.credentials.database,
            "backend session acquired"
        );
        slot.current = Some(session.clone());
        Ok(session)
    }

    /// Drop `stale` if it is still the current session.
    pub async fn invalidate(&self, stale: &Session) {
        let mut slot = self.slot.lock().await;
        if slot.current.as_ref().map(|s| s.generation) == Some(stale.generation) {
            tracing::warn!(uid = stale.uid, generation = stale.generation, "backend session invalidated");
            slot.current = None;
        }
    }

    /// Forget the session (shutdown).
    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.current.take() {
            tracing::info!(uid = session.uid, "backend session released");
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.slot.lock().await.current.clone()
    }

    async fn login(&self, transport: &dyn RpcTransport) -> Result<i64, GatewayError> {
        let args = vec![
            Value::from(self.credentials.database.clone()),
            Value::from(self.credentials.username.clone()),
            Value::from(self.credentials.password.clone()),
            json!({}),
        ];

        let result = match transport.call(Endpoint::Common, "authenticate", args).await {
            Ok(v) => v,
            Err(e @ GatewayError::Fault { .. }) => {
                return Err(GatewayError::Authentication(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        // The backend answers `false` for bad credentials rather than faulting.
        match result.as_i64() {
            Some(uid) if uid > 0 => Ok(uid),
            _ => Err(GatewayError::Authentication(format!(
                "login rejected for user '{}' on database '{}'",
                self.credentials.username, self.credentials.database
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Answers `authenticate` from a queue of canned results.
    struct ScriptedLogin {
        answers: StdMutex<Vec<Result<Value, GatewayError>>>,
        calls: StdMutex<u32>,
    }

    impl ScriptedLogin {
        fn new(mut answers: Vec<Result<Value, GatewayError>>) -> Self {
            answers.reverse();
            Self {
                answers: StdMutex::new(answers),
                calls: StdMutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedLogin {
        async fn call(&self, endpoint: Endpoint, method: &str, _args: Vec<Value>) -> Result<Value, GatewayError> {
            assert_eq!(endpoint, Endpoint::Common);
            assert_eq!(method, "authenticate");
            *self.calls.lock().unwrap() += 1;
            self.answers.lock().unwrap().pop().expect("unexpected login call")
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Credentials::new("db", "admin", "secret"))
    }

    #[tokio::test]
    async fn session_is_memoized_after_first_login() {
        let transport = ScriptedLogin::new(vec![Ok(json!(2))]);
        let sessions = manager();

        let a = sessions.acquire(&transport).await.unwrap();
        let b = sessions.acquire(&transport).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.uid, 2);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn failed_login_is_not_cached() {
        let transport = ScriptedLogin::new(vec![Ok(json!(false)), Ok(json!(5))]);
        let sessions = manager();

        let err = sessions.acquire(&transport).await.unwrap_err();
        assert!(matches!(err, GatewayError::Authentication(_)));
        assert!(!err.to_string().contains("secret"));

        let session = sessions.acquire(&transport).await.unwrap();
        assert_eq!(session.uid, 5);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_only_drops_matching_generation() {
        let transport = ScriptedLogin::new(vec![Ok(json!(2)), Ok(json!(2))]);
        let sessions = manager();

        let first = sessions.acquire(&transport).await.unwrap();
        sessions.invalidate(&first).await;
        let second = sessions.acquire(&transport).await.unwrap();
        assert_eq!(second.generation, first.generation + 1);

        // A late invalidation with the old session must not drop the new one.
        sessions.invalidate(&first).await;
        assert_eq!(sessions.current().await, Some(second));
    }

    #[tokio::test]
    async fn release_clears_session() {
        let transport = ScriptedLogin::new(vec![Ok(json!(3))]);
        let sessions = manager();
        sessions.acquire(&transport).await.unwrap();
        sessions.release().await;
        assert_eq!(sessions.current().await, None);
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let dbg = format!("{:?}", Credentials::new("db", "admin", "secret"));
        assert!(!dbg.contains("secret"));
    }
}
