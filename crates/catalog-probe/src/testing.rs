//! Scripted in-memory session for exercising catalog readers without a server.
//!
//! Responses are matched on SQL fragments: the first scripted fragment
//! contained in the statement wins. Every call is recorded in a shared
//! [`Journal`] that stays readable after the session is closed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::error::{ProbeError, Result};

/// One recorded session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query { sql: String, params: Vec<String> },
    /// Statement run and committed.
    Execute(String),
    Close,
}

/// Shared record of calls made on a [`FakeSession`].
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    fn push(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Committed statements, in order.
    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Execute(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// Queries with their bound parameters, in order.
    pub fn queries(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Query { sql, params } => Some((sql, params)),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> bool {
        self.calls().contains(&Call::Close)
    }
}

/// A [`Session`] answering from a script.
#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    journal: Journal,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `fragment` with `rows`.
    pub fn with_rows(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.responses.push((fragment.to_string(), rows));
        self
    }

    /// Fail statements containing `fragment`.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.failures.push(fragment.to_string());
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match self.failures.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(ProbeError::query(format!(
                "scripted failure on '{}'",
                fragment
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        self.journal.push(Call::Query {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        });
        self.check_failure(sql)?;
        Ok(self
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.check_failure(sql)?;
        self.journal.push(Call::Execute(sql.to_string()));
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.journal.push(Call::Close);
        Ok(())
    }
}

/// Row of text cells; `None` cells are NULL.
pub fn text_row(cells: &[Option<&str>]) -> Row {
    Row::new(
        cells
            .iter()
            .map(|c| c.map(CatalogValue::from).unwrap_or(CatalogValue::Null))
            .collect(),
    )
}

/// Row with a single integer cell.
pub fn int_row(value: i64) -> Row {
    Row::new(vec![CatalogValue::Int(value)])
}
