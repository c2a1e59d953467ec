//! Connection lifecycle: `Connected -> Closed`.
//!
//! A [`Connection`] only exists once a session has been established, so the
//! "not yet connected" state has no value. Closing is terminal: the session
//! is dropped and every later call fails with
//! [`ProbeError::ConnectionClosed`].

use tracing::{debug, info};

use super::kind::DbKind;
use super::traits::Session;
use super::value::Row;
use crate::error::{ProbeError, Result};

/// Observable state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

/// A session owned by one logical database target.
pub struct Connection<S: Session> {
    kind: DbKind,
    session: Option<S>,
}

impl<S: Session> Connection<S> {
    /// Wrap a freshly established session.
    pub fn established(kind: DbKind, session: S) -> Self {
        Self {
            kind,
            session: Some(session),
        }
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Closed
        }
    }

    /// The underlying session while connected.
    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut S> {
        let kind = self.kind;
        self.session
            .as_mut()
            .ok_or_else(|| ProbeError::ConnectionClosed(kind.display_name().to_string()))
    }

    /// Run a query and collect its rows.
    pub async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        debug!("[{}] query: {} params={:?}", self.kind, sql.trim(), params);
        self.session_mut()?.query(sql, params).await
    }

    /// Run a statement and commit.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("[{}] execute: {}", self.kind, sql.trim());
        self.session_mut()?.execute(sql).await
    }

    /// Close the session. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => {
                session.close().await?;
                info!("Closed {} connection", self.kind.display_name());
                Ok(())
            }
            None => Ok(()),
        }
    }
}
