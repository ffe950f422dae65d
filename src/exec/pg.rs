//! Postgres session backed by sqlx.

use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::{Arguments, Postgres, Transaction};
use tracing::debug;

use crate::ast::Value;
use crate::error::{RelqError, RelqResult};
use crate::params::ParamDirection;

use super::{Batch, IsolationLevel, Session};

/// A pooled Postgres connection with an optional open transaction.
pub struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    pub async fn connect(url: &str) -> RelqResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| RelqError::Connection(e.to_string()))?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }
}

fn bind_value(args: &mut PgArguments, value: &Value) -> RelqResult<()> {
    match value {
        Value::Null => args.add(Option::<String>::None),
        Value::Bool(v) => args.add(*v),
        Value::Int(v) => args.add(*v),
        Value::Float(v) => args.add(*v),
        Value::Decimal(v) => args.add(*v),
        Value::String(v) => args.add(v.clone()),
        Value::Uuid(v) => args.add(*v),
        Value::DateTime(v) => args.add(*v),
        Value::Bytes(v) => args.add(v.clone()),
        Value::Json(v) => args.add(v.clone()),
        Value::Array(items) => args.add(
            serde_json::to_value(items).map_err(|e| RelqError::Execution(e.to_string()))?,
        ),
    }
    Ok(())
}

impl Session for PgSession {
    async fn execute(&mut self, batch: &Batch) -> RelqResult<u64> {
        let mut args = PgArguments::default();
        for param in batch.params.iter() {
            if param.direction == ParamDirection::Input {
                bind_value(&mut args, &param.value)?;
            }
        }
        debug!(params = batch.params.len(), "executing batch");
        let query = sqlx::query_with(&batch.sql, args);
        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        };
        result
            .map(|r| r.rows_affected())
            .map_err(|e| RelqError::Execution(e.to_string()))
    }

    async fn begin(&mut self, isolation: IsolationLevel) -> RelqResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RelqError::Connection(e.to_string()))?;
        if isolation != IsolationLevel::default() {
            sqlx::query(isolation.set_statement())
                .execute(&mut *tx)
                .await
                .map_err(|e| RelqError::Connection(e.to_string()))?;
        }
        self.tx = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> RelqResult<()> {
        match self.tx.take() {
            Some(tx) => tx
                .commit()
                .await
                .map_err(|e| RelqError::Execution(e.to_string())),
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> RelqResult<()> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| RelqError::Execution(e.to_string())),
            None => Ok(()),
        }
    }
}
