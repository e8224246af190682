//! In-memory row source for exercising extractors without a database server

use crate::{Result, Row, RowSource, RowStream, SchemataError, Value};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

enum Response {
    Rows { columns: Arc<[String]>, rows: Vec<Vec<Value>> },
    Error(String),
}

/// Canned responses keyed by a fragment of SQL text.
///
/// A query is answered by the first registered fragment it contains, so
/// register the more specific fragments first. Unmatched SQL fails with
/// [`SchemataError::Query`]. Every executed statement is recorded.
#[derive(Default)]
pub struct MockRowSource {
    responses: Vec<(String, Response)>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `fragment` with `rows`.
    pub fn on(mut self, fragment: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        self.responses
            .push((fragment.to_string(), Response::Rows { columns, rows }));
        self
    }

    /// Fail queries containing `fragment` with a query error.
    pub fn fail_on(mut self, fragment: &str, message: &str) -> Self {
        self.responses
            .push((fragment.to_string(), Response::Error(message.to_string())));
        self
    }

    /// Statements executed so far, with their parameters
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RowSource for MockRowSource {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        self.calls.lock().push((sql.to_string(), params.to_vec()));

        let response = self
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, response)| response);

        match response {
            Some(Response::Rows { columns, rows }) => {
                let columns = columns.clone();
                let rows = rows
                    .iter()
                    .map(move |values| Ok(Row::new(columns.clone(), values.clone())));
                Ok(stream::iter(rows).boxed())
            }
            Some(Response::Error(message)) => Err(SchemataError::Query(message.clone())),
            None => Err(SchemataError::Query(format!("no canned result for: {}", sql))),
        }
    }
}
