//! Batch planning and transactional execution of compiled statements.
//!
//! Translation produces [`ExecutionStatement`]s; the [`Coordinator`] groups
//! them into batches under configurable statement/parameter caps and drives
//! them through a [`Session`]. Multi-batch work always runs inside one
//! transaction; a single batch only does when asked to.

pub mod pg;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{RelqError, RelqResult};
use crate::params::{ParameterSet, rewrite_placeholder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Plain SQL text.
    Text,
    /// Stored-procedure invocation. Never merged into a text batch.
    Procedure,
}

/// One compiled write statement, ready for batching.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatement {
    pub sql: String,
    pub kind: ScriptKind,
    /// Rolls the surrounding transaction back when it affects zero rows.
    pub must_affect: bool,
    pub params: ParameterSet,
    /// Never merged with neighbors (e.g. identity-returning inserts).
    pub standalone: bool,
}

impl ExecutionStatement {
    pub fn text(sql: String, params: ParameterSet) -> Self {
        Self {
            sql,
            kind: ScriptKind::Text,
            must_affect: false,
            params,
            standalone: false,
        }
    }

    pub fn procedure(name: String, params: ParameterSet) -> Self {
        Self {
            sql: name,
            kind: ScriptKind::Procedure,
            must_affect: false,
            params,
            standalone: true,
        }
    }

    pub fn require_rows(mut self) -> Self {
        self.must_affect = true;
        self
    }

    pub fn isolated(mut self) -> Self {
        self.standalone = true;
        self
    }
}

/// Transaction isolation level requested from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// `SET TRANSACTION` statement for this level.
    pub fn set_statement(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => {
                "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"
            }
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Batching caps. Caps below one are coerced to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum statements merged into one batch.
    pub group_statements: usize,
    /// Maximum parameters carried by one batch.
    pub group_parameters: usize,
    /// Force a transaction even for a single batch.
    pub transactional: bool,
    /// Isolation level for the transaction, when one is opened.
    pub isolation: IsolationLevel,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            group_statements: 100,
            group_parameters: 2000,
            transactional: false,
            isolation: IsolationLevel::default(),
        }
    }
}

/// A unit of work sent to the session in one round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub sql: String,
    pub params: ParameterSet,
    pub must_affect: bool,
}

/// Group statements into batches.
///
/// Standalone statements, procedures, and required (`must_affect`)
/// statements flush the open batch and travel alone: the zero-row check is
/// per statement and a merged rows-affected total cannot carry it. Merged
/// statements have their parameter sets folded together; renamed collisions
/// are rewritten in the statement text. Merging assumes named (`@`)
/// placeholders; positional dialects should run with `group_statements = 1`.
pub fn plan_batches(statements: Vec<ExecutionStatement>, options: &BatchOptions) -> Vec<Batch> {
    let statement_cap = options.group_statements.max(1);
    let parameter_cap = options.group_parameters.max(1);

    let mut batches = Vec::new();
    let mut sql = String::new();
    let mut params = ParameterSet::new();
    let mut count = 0usize;

    macro_rules! flush {
        () => {
            if count > 0 {
                batches.push(Batch {
                    sql: std::mem::take(&mut sql),
                    params: std::mem::take(&mut params),
                    must_affect: false,
                });
                count = 0;
            }
        };
    }

    for stmt in statements {
        if stmt.standalone || stmt.must_affect || stmt.kind == ScriptKind::Procedure {
            flush!();
            batches.push(Batch {
                sql: stmt.sql,
                params: stmt.params,
                must_affect: stmt.must_affect,
            });
            continue;
        }

        if count > 0
            && (count >= statement_cap || params.len() + stmt.params.len() > parameter_cap)
        {
            flush!();
        }

        let renames = params.merge(stmt.params);
        let mut text = stmt.sql;
        for (old, new) in renames {
            text = rewrite_placeholder(&text, &old, &new, "@");
        }
        if count > 0 {
            sql.push_str(";\n");
        }
        sql.push_str(&text);
        count += 1;
    }
    flush!();
    batches
}

/// Cooperative cancellation flag, checked between batches only; a running
/// batch is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A database connection that can run batches and scope them in a
/// transaction.
pub trait Session {
    async fn execute(&mut self, batch: &Batch) -> RelqResult<u64>;
    async fn begin(&mut self, isolation: IsolationLevel) -> RelqResult<()>;
    async fn commit(&mut self) -> RelqResult<()>;
    async fn rollback(&mut self) -> RelqResult<()>;
}

/// Drives planned batches through a session with transactional semantics.
#[derive(Debug, Default)]
pub struct Coordinator {
    options: BatchOptions,
}

impl Coordinator {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    /// Execute `statements` and return the total affected-row count.
    ///
    /// A required statement affecting zero rows rolls the transaction back
    /// and reports zero without error. A driver failure rolls back and
    /// propagates. Cancellation is honored between batches and rolls back
    /// with [`RelqError::Cancelled`].
    pub async fn execute<S: Session>(
        &self,
        session: &mut S,
        statements: Vec<ExecutionStatement>,
        cancel: Option<&CancelSignal>,
    ) -> RelqResult<u64> {
        let batches = plan_batches(statements, &self.options);
        if batches.is_empty() {
            return Ok(0);
        }

        if batches.len() == 1 && !self.options.transactional {
            let batch = &batches[0];
            let affected = session.execute(batch).await?;
            if batch.must_affect && affected == 0 {
                warn!("required statement affected no rows");
                return Ok(0);
            }
            return Ok(affected);
        }

        session.begin(self.options.isolation).await?;
        let mut total = 0u64;
        for (index, batch) in batches.iter().enumerate() {
            if index > 0 && cancel.is_some_and(CancelSignal::is_cancelled) {
                warn!(completed = index, "execution cancelled between batches");
                session.rollback().await?;
                return Err(RelqError::Cancelled);
            }
            match session.execute(batch).await {
                Ok(affected) => {
                    if batch.must_affect && affected == 0 {
                        warn!(batch = index, "required statement affected no rows, rolling back");
                        session.rollback().await?;
                        return Ok(0);
                    }
                    total += affected;
                }
                Err(err) => {
                    let _ = session.rollback().await;
                    return Err(err);
                }
            }
        }
        session.commit().await?;
        debug!(batches = batches.len(), rows = total, "batch execution committed");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::Value;

    fn stmt(sql: &str) -> ExecutionStatement {
        ExecutionStatement::text(sql.to_string(), ParameterSet::new())
    }

    fn stmt_with_param(sql: &str, name: &str, value: Value) -> ExecutionStatement {
        let mut params = ParameterSet::new();
        params.add(name, value);
        ExecutionStatement::text(sql.to_string(), params)
    }

    #[test]
    fn test_plan_coalesces_up_to_statement_cap() {
        let options = BatchOptions {
            group_statements: 2,
            ..Default::default()
        };
        let batches = plan_batches(vec![stmt("A"), stmt("B"), stmt("C")], &options);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].sql, "A;\nB");
        assert_eq!(batches[1].sql, "C");
    }

    #[test]
    fn test_standalone_flushes_and_travels_alone() {
        let options = BatchOptions::default();
        let batches = plan_batches(
            vec![stmt("A"), stmt("ISO").isolated(), stmt("B")],
            &options,
        );
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].sql, "A");
        assert_eq!(batches[1].sql, "ISO");
        assert_eq!(batches[2].sql, "B");
    }

    #[test]
    fn test_procedure_is_never_merged() {
        let options = BatchOptions::default();
        let batches = plan_batches(
            vec![
                stmt("A"),
                ExecutionStatement::procedure("usp_Recalc".to_string(), ParameterSet::new()),
                stmt("B"),
            ],
            &options,
        );
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].sql, "usp_Recalc");
    }

    #[test]
    fn test_merge_rewrites_renamed_placeholders() {
        let options = BatchOptions::default();
        let batches = plan_batches(
            vec![
                stmt_with_param("UPDATE [U] SET [N] = @name0", "name0", Value::from("a")),
                stmt_with_param("UPDATE [U] SET [N] = @name0", "name0", Value::from("b")),
            ],
            &options,
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].sql,
            "UPDATE [U] SET [N] = @name0;\nUPDATE [U] SET [N] = @name0_1"
        );
        assert_eq!(batches[0].params.len(), 2);
        assert_eq!(
            batches[0].params.get("name0_1").unwrap().value,
            Value::from("b")
        );
    }

    #[test]
    fn test_parameter_cap_splits_batches() {
        let options = BatchOptions {
            group_parameters: 1,
            ..Default::default()
        };
        let batches = plan_batches(
            vec![
                stmt_with_param("A @x0", "x0", Value::Int(1)),
                stmt_with_param("B @y0", "y0", Value::Int(2)),
            ],
            &options,
        );
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_zero_caps_are_coerced_to_one() {
        let options = BatchOptions {
            group_statements: 0,
            group_parameters: 0,
            ..Default::default()
        };
        let batches = plan_batches(vec![stmt("A"), stmt("B")], &options);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_required_statement_is_never_merged() {
        // A merged batch only reports one rows-affected total, so a required
        // statement must keep its own batch for the zero-row check to hold.
        let options = BatchOptions::default();
        let batches = plan_batches(
            vec![stmt("A"), stmt("B").require_rows(), stmt("C")],
            &options,
        );
        assert_eq!(batches.len(), 3);
        assert!(!batches[0].must_affect);
        assert!(batches[1].must_affect);
        assert_eq!(batches[1].sql, "B");
    }

    #[derive(Default)]
    struct MockSession {
        executed: Vec<Batch>,
        results: VecDeque<RelqResult<u64>>,
        begun: usize,
        isolation: Option<IsolationLevel>,
        committed: usize,
        rolled_back: usize,
    }

    impl Session for MockSession {
        async fn execute(&mut self, batch: &Batch) -> RelqResult<u64> {
            self.executed.push(batch.clone());
            self.results.pop_front().unwrap_or(Ok(1))
        }

        async fn begin(&mut self, isolation: IsolationLevel) -> RelqResult<()> {
            self.begun += 1;
            self.isolation = Some(isolation);
            Ok(())
        }

        async fn commit(&mut self) -> RelqResult<()> {
            self.committed += 1;
            Ok(())
        }

        async fn rollback(&mut self) -> RelqResult<()> {
            self.rolled_back += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_single_batch_skips_transaction() {
        let coordinator = Coordinator::new(BatchOptions::default());
        let mut session = MockSession::default();
        let total = coordinator
            .execute(&mut session, vec![stmt("A"), stmt("B")], None)
            .await
            .unwrap();
        // Both statements merge into one batch; one round trip, no begin.
        assert_eq!(total, 1);
        assert_eq!(session.executed.len(), 1);
        assert_eq!(session.begun, 0);
        assert_eq!(session.committed, 0);
    }

    #[tokio::test]
    async fn test_transactional_flag_forces_transaction() {
        let coordinator = Coordinator::new(BatchOptions {
            transactional: true,
            isolation: IsolationLevel::Serializable,
            ..Default::default()
        });
        let mut session = MockSession::default();
        coordinator
            .execute(&mut session, vec![stmt("A")], None)
            .await
            .unwrap();
        assert_eq!(session.begun, 1);
        assert_eq!(session.isolation, Some(IsolationLevel::Serializable));
        assert_eq!(session.committed, 1);
    }

    #[tokio::test]
    async fn test_required_rows_zero_rolls_back_at_default_thresholds() {
        // The required statement keeps its own batch even though the caps
        // would let it merge, so the zero-row outcome is visible.
        let coordinator = Coordinator::new(BatchOptions::default());
        let mut session = MockSession::default();
        session.results = VecDeque::from([Ok(1), Ok(0)]);
        let total = coordinator
            .execute(
                &mut session,
                vec![stmt("A"), stmt("B").require_rows()],
                None,
            )
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert_eq!(session.rolled_back, 1);
        assert_eq!(session.committed, 0);
    }

    #[tokio::test]
    async fn test_driver_error_rolls_back_and_propagates() {
        let coordinator = Coordinator::new(BatchOptions {
            group_statements: 1,
            ..Default::default()
        });
        let mut session = MockSession::default();
        session.results =
            VecDeque::from([Ok(1), Err(RelqError::Execution("deadlock".to_string()))]);
        let err = coordinator
            .execute(&mut session, vec![stmt("A"), stmt("B")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelqError::Execution(_)));
        assert_eq!(session.rolled_back, 1);
        assert_eq!(session.committed, 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_batches() {
        let coordinator = Coordinator::new(BatchOptions {
            group_statements: 1,
            ..Default::default()
        });
        let mut session = MockSession::default();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let err = coordinator
            .execute(&mut session, vec![stmt("A"), stmt("B")], Some(&cancel))
            .await
            .unwrap_err();
        // The first batch runs; the signal is honored before the second.
        assert!(matches!(err, RelqError::Cancelled));
        assert_eq!(session.executed.len(), 1);
        assert_eq!(session.rolled_back, 1);
    }

    #[tokio::test]
    async fn test_commit_totals_affected_rows() {
        let coordinator = Coordinator::new(BatchOptions {
            group_statements: 1,
            ..Default::default()
        });
        let mut session = MockSession::default();
        session.results = VecDeque::from([Ok(3), Ok(4)]);
        let total = coordinator
            .execute(&mut session, vec![stmt("A"), stmt("B")], None)
            .await
            .unwrap();
        assert_eq!(total, 7);
        assert_eq!(session.committed, 1);
    }
}
