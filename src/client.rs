//! The execution boundary.
//!
//! Tables never execute SQL themselves. They hand finished transactions to an
//! [`ExecutionClient`], which applies every command of a transaction
//! atomically and reports back exactly once through a callback.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::channel::oneshot;
use rusqlite::{params_from_iter, Connection};

use crate::config::SqliteConfig;
use crate::error::{DatabaseError, Result};
use crate::sqlite::{Command, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    /// The transaction could not be opened or committed
    TransactionError,
    /// A command failed; nothing in the transaction was applied
    CommandError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub status: ResponseStatus,
    /// Rows changed by each command, in command order. Empty on failure.
    pub rows_affected: Vec<usize>,
}

impl TransactionResponse {
    pub fn ok(rows_affected: Vec<usize>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            rows_affected,
        }
    }

    pub fn failed(status: ResponseStatus) -> Self {
        debug_assert_ne!(status, ResponseStatus::Ok);
        Self {
            status,
            rows_affected: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// Outcome reported to table callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    Success,
    Failed,
}

impl From<&TransactionResponse> for ExecutionResult {
    fn from(response: &TransactionResponse) -> Self {
        if response.is_ok() {
            ExecutionResult::Success
        } else {
            ExecutionResult::Failed
        }
    }
}

pub type TransactionCallback = Box<dyn FnOnce(TransactionResponse) + Send + 'static>;
pub type ResultCallback = Box<dyn FnOnce(ExecutionResult) + Send + 'static>;

/// Runs transactions against storage.
///
/// Implementations must apply all commands of a transaction or none of them,
/// must not block the caller, and must invoke `callback` exactly once.
pub trait ExecutionClient: Send + Sync {
    fn run_transaction(&self, transaction: Transaction, callback: TransactionCallback);
}

/// Awaitable dispatch on top of the callback interface
#[async_trait]
pub trait ExecutionClientExt {
    async fn run(&self, transaction: Transaction) -> Result<TransactionResponse>;
}

#[async_trait]
impl<C> ExecutionClientExt for C
where
    C: ExecutionClient + ?Sized,
{
    async fn run(&self, transaction: Transaction) -> Result<TransactionResponse> {
        let (sender, receiver) = oneshot::channel();
        self.run_transaction(
            transaction,
            Box::new(move |response| {
                // The receiver may have been dropped by a cancelled caller
                let _ = sender.send(response);
            }),
        );
        receiver.await.map_err(|_| DatabaseError::ClientClosed)
    }
}

struct Job {
    transaction: Transaction,
    callback: TransactionCallback,
}

/// SQLite execution client.
///
/// Owns a single connection on a worker thread; transactions run in the
/// order they were dispatched.
pub struct SqliteClient {
    sender: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SqliteClient {
    pub fn open(config: &SqliteConfig) -> anyhow::Result<Self> {
        if config.db_path.is_empty() {
            return Err(DatabaseError::Config("db_path must not be empty".to_string()).into());
        }

        tracing::info!(path = %config.db_path, "opening sqlite execution client");
        let connection = if config.is_in_memory() {
            Connection::open_in_memory().context("Failed to open in-memory database")?
        } else {
            Connection::open(&config.db_path)
                .with_context(|| format!("Failed to open SQLite database at '{}'", config.db_path))?
        };
        connection
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .context("Failed to set busy timeout")?;
        if config.enforce_foreign_keys {
            connection
                .pragma_update(None, "foreign_keys", "ON")
                .context("Failed to enable foreign keys")?;
        }

        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = std::thread::Builder::new()
            .name("sqlite-execution".to_string())
            .spawn(move || {
                let mut connection = connection;
                for job in receiver {
                    let response = execute_transaction(&mut connection, &job.transaction);
                    let callback = job.callback;
                    // A panicking callback must not take queued jobs down with the worker
                    if panic::catch_unwind(AssertUnwindSafe(move || callback(response))).is_err() {
                        tracing::warn!("transaction callback panicked");
                    }
                }
                tracing::debug!("sqlite execution worker stopped");
            })
            .context("Failed to spawn sqlite worker")?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl ExecutionClient for SqliteClient {
    fn run_transaction(&self, transaction: Transaction, callback: TransactionCallback) {
        tracing::debug!(commands = transaction.len(), "dispatching transaction");
        let job = Job {
            transaction,
            callback,
        };
        let Some(sender) = &self.sender else {
            (job.callback)(TransactionResponse::failed(ResponseStatus::TransactionError));
            return;
        };
        if let Err(mpsc::SendError(job)) = sender.send(job) {
            tracing::warn!("sqlite worker is gone, failing transaction");
            (job.callback)(TransactionResponse::failed(ResponseStatus::TransactionError));
        }
    }
}

impl Drop for SqliteClient {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued jobs and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn execute_command(tx: &rusqlite::Transaction<'_>, command: &Command) -> rusqlite::Result<usize> {
    tx.execute(&command.statement, params_from_iter(command.params.values.iter()))
}

fn execute_transaction(connection: &mut Connection, transaction: &Transaction) -> TransactionResponse {
    let tx = match connection.transaction() {
        Ok(tx) => tx,
        Err(error) => {
            tracing::warn!(%error, "failed to begin transaction");
            return TransactionResponse::failed(ResponseStatus::TransactionError);
        }
    };

    let mut rows_affected = Vec::with_capacity(transaction.len());
    for command in &transaction.commands {
        match execute_command(&tx, command) {
            Ok(rows) => rows_affected.push(rows),
            Err(error) => {
                tracing::warn!(%error, statement = %command.statement, "command failed, rolling back");
                // Dropping `tx` rolls back everything applied so far
                return TransactionResponse::failed(ResponseStatus::CommandError);
            }
        }
    }

    if let Some(version) = transaction.version {
        if let Err(error) = tx.pragma_update(None, "user_version", version) {
            tracing::warn!(%error, version, "failed to record schema version");
            return TransactionResponse::failed(ResponseStatus::TransactionError);
        }
    }

    if let Err(error) = tx.commit() {
        tracing::warn!(%error, "failed to commit transaction");
        return TransactionResponse::failed(ResponseStatus::TransactionError);
    }
    TransactionResponse::ok(rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::bind_string;

    fn run_blocking(client: &SqliteClient, transaction: Transaction) -> TransactionResponse {
        let (sender, receiver) = mpsc::channel();
        client.run_transaction(
            transaction,
            Box::new(move |response| sender.send(response).unwrap()),
        );
        receiver.recv().unwrap()
    }

    #[test]
    fn commits_all_commands() {
        let client = SqliteClient::open(&SqliteConfig::in_memory()).unwrap();

        let mut transaction = Transaction::new();
        transaction.push(Command::execute("CREATE TABLE t (v TEXT NOT NULL)"));
        let mut insert = Command::run("INSERT INTO t (v) VALUES (?),(?)");
        bind_string(&mut insert, 0, "a").unwrap();
        bind_string(&mut insert, 1, "b").unwrap();
        transaction.push(insert);

        let response = run_blocking(&client, transaction);
        assert!(response.is_ok());
        assert_eq!(response.rows_affected, vec![0, 2]);
    }

    #[test]
    fn failing_command_rolls_back() {
        let client = SqliteClient::open(&SqliteConfig::in_memory()).unwrap();

        let mut transaction = Transaction::new();
        transaction.push(Command::execute("CREATE TABLE t (v TEXT NOT NULL)"));
        transaction.push(Command::run("INSERT INTO missing (v) VALUES (1)"));
        let response = run_blocking(&client, transaction);
        assert_eq!(response.status, ResponseStatus::CommandError);
        assert_eq!(ExecutionResult::from(&response), ExecutionResult::Failed);

        // The CREATE TABLE was rolled back with the failing insert
        let mut transaction = Transaction::new();
        transaction.push(Command::run("INSERT INTO t (v) VALUES ('x')"));
        assert_eq!(
            run_blocking(&client, transaction).status,
            ResponseStatus::CommandError
        );
    }

    #[test]
    fn rejects_empty_path() {
        assert!(SqliteClient::open(&SqliteConfig::new("")).is_err());
    }
}
