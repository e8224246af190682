//! Row-streaming primitive used by every extractor

use crate::{Result, Row, SchemataError, Value};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

/// Lazily produced rows of one query
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// Executes parameterized SQL and yields rows one at a time.
///
/// Parameters are positional; their spelling inside `sql` comes from the
/// engine's [`NamingStrategy`](crate::NamingStrategy). Each row carries the
/// ordered column names of the result plus a parallel value vector.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Driver identifier, used in log fields
    fn driver_name(&self) -> &str;

    /// Execute `sql` and return its rows as a stream.
    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>>;
}

#[async_trait]
impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn driver_name(&self) -> &str {
        (**self).driver_name()
    }

    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        (**self).stream_rows(sql, params).await
    }
}

/// Run a query and collect every row.
pub async fn fetch_all(source: &dyn RowSource, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let start = std::time::Instant::now();
    let rows: Vec<Row> = source.stream_rows(sql, params).await?.try_collect().await?;
    tracing::debug!(
        driver = source.driver_name(),
        rows = rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "catalog query completed"
    );
    Ok(rows)
}

/// Wraps a [`RowSource`] so extraction stops when a token is cancelled.
///
/// The token is only observed between rows: a row already being decoded is
/// finished, the next pull yields [`SchemataError::Cancelled`] and the
/// stream ends.
pub struct CancellableSource<S> {
    inner: S,
    token: CancellationToken,
}

impl<S: RowSource> CancellableSource<S> {
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: RowSource> RowSource for CancellableSource<S> {
    fn driver_name(&self) -> &str {
        self.inner.driver_name()
    }

    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        if self.token.is_cancelled() {
            return Err(SchemataError::Cancelled);
        }
        let rows = self.inner.stream_rows(sql, params).await?;
        let token = &self.token;
        let guarded = stream::unfold(Some(rows), move |state| async move {
            let mut rows = state?;
            if token.is_cancelled() {
                tracing::debug!("row stream cancelled");
                return Some((Err(SchemataError::Cancelled), None));
            }
            let item = rows.next().await?;
            Some((item, Some(rows)))
        });
        Ok(guarded.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRowSource;

    fn source() -> MockRowSource {
        MockRowSource::new().on(
            "FROM numbers",
            &["n"],
            vec![vec![Value::Int64(1)], vec![Value::Int64(2)], vec![Value::Int64(3)]],
        )
    }

    #[tokio::test]
    async fn test_fetch_all_collects_rows() {
        let rows = fetch_all(&source(), "SELECT n FROM numbers", &[]).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get_by_name("n"), Some(&Value::Int64(3)));
    }

    #[tokio::test]
    async fn test_cancel_between_rows() {
        let token = CancellationToken::new();
        let cancellable = CancellableSource::new(source(), token.clone());

        let mut rows = cancellable.stream_rows("SELECT n FROM numbers", &[]).await.unwrap();
        assert!(rows.next().await.unwrap().is_ok());

        token.cancel();
        assert!(matches!(rows.next().await, Some(Err(SchemataError::Cancelled))));
        assert!(rows.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_query() {
        let token = CancellationToken::new();
        token.cancel();
        let cancellable = CancellableSource::new(source(), token);

        let result = cancellable.stream_rows("SELECT n FROM numbers", &[]).await;
        assert!(matches!(result, Err(SchemataError::Cancelled)));
    }
}
