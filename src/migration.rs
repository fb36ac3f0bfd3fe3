//! Version-keyed schema migrations.
//!
//! Each table declares the versions it recognizes and, per version, the
//! ordered DDL that brings it to that version from any prior state. Versions
//! a table does not declare are no-ops, so a shared migration entry point can
//! walk every version without knowing which ones touched which table.

use std::collections::BTreeMap;

use crate::error::{DatabaseError, Result};
use crate::query::{
    add_column_sql, create_index_sql, create_table_if_not_exists_sql, create_table_sql,
    drop_table_sql, ColumnDefinition, TableDefinition,
};
use crate::sqlite::{Command, Transaction};
use crate::tables::Table;

/// One DDL operation of a version migration
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationStep {
    Drop,
    CreateTable(TableDefinition),
    CreateTableIfNotExists(TableDefinition),
    CreateIndex(String),
    AddColumn(ColumnDefinition),
}

impl MigrationStep {
    fn to_command(&self, table_name: &str) -> Command {
        let statement = match self {
            MigrationStep::Drop => drop_table_sql(table_name),
            MigrationStep::CreateTable(table) => create_table_sql(table),
            MigrationStep::CreateTableIfNotExists(table) => create_table_if_not_exists_sql(table),
            MigrationStep::CreateIndex(column) => create_index_sql(table_name, column),
            MigrationStep::AddColumn(column) => add_column_sql(table_name, column),
        };
        Command::execute(statement)
    }
}

/// Whether a version keeps the rows already in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStrategy {
    /// Drop and recreate; only valid while the table can be fully re-derived
    /// from upstream data.
    Recreate,
    /// Create-if-absent and add columns; existing rows survive.
    Additive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionMigration {
    pub strategy: MigrationStrategy,
    pub steps: Vec<MigrationStep>,
}

impl VersionMigration {
    /// Drop the table, create it from `table` and index `indexes` in order.
    pub fn recreate(table: TableDefinition, indexes: &[&str]) -> Self {
        let mut steps = vec![MigrationStep::Drop, MigrationStep::CreateTable(table)];
        steps.extend(
            indexes
                .iter()
                .map(|column| MigrationStep::CreateIndex(column.to_string())),
        );
        Self {
            strategy: MigrationStrategy::Recreate,
            steps,
        }
    }

    pub fn additive(steps: Vec<MigrationStep>) -> Result<Self> {
        let drops_table = steps.contains(&MigrationStep::Drop);
        debug_assert!(!drops_table, "additive migrations must not drop the table");
        if drops_table {
            return Err(DatabaseError::DestructiveAdditiveMigration);
        }

        Ok(Self {
            strategy: MigrationStrategy::Additive,
            steps,
        })
    }
}

/// The recognized versions of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Migrations {
    table_name: String,
    versions: BTreeMap<u32, VersionMigration>,
}

impl Migrations {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            versions: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: u32, migration: VersionMigration) -> Self {
        let previous = self.versions.insert(version, migration);
        debug_assert!(previous.is_none(), "version {version} declared twice");
        self
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.versions.keys().copied()
    }

    pub fn get(&self, version: u32) -> Option<&VersionMigration> {
        self.versions.get(&version)
    }

    /// Append the commands for `to_version` to `transaction`.
    ///
    /// Returns how many commands were appended; zero for unrecognized
    /// versions.
    pub fn migrate(&self, transaction: &mut Transaction, to_version: u32) -> usize {
        let Some(migration) = self.versions.get(&to_version) else {
            tracing::trace!(
                table = %self.table_name,
                version = to_version,
                "no migration for version"
            );
            return 0;
        };

        tracing::info!(
            table = %self.table_name,
            version = to_version,
            strategy = ?migration.strategy,
            "migrating table"
        );
        for step in &migration.steps {
            transaction.push(step.to_command(&self.table_name));
        }
        migration.steps.len()
    }
}

/// Migrate every table through each version in `from_version + 1..=to_version`.
///
/// Versions are applied in ascending order and, within a version, in the
/// order `tables` is given. The transaction is stamped with `to_version` so
/// the external version store can record it once the transaction commits.
/// A backwards range is rejected and leaves `transaction` untouched.
pub fn migrate_tables(
    transaction: &mut Transaction,
    tables: &[&dyn Table],
    from_version: u32,
    to_version: u32,
) -> Result<()> {
    debug_assert!(from_version <= to_version, "cannot migrate backwards");
    if from_version > to_version {
        return Err(DatabaseError::BackwardsMigration {
            from: from_version,
            to: to_version,
        });
    }

    if let Some(first) = from_version.checked_add(1) {
        for version in first..=to_version {
            for table in tables {
                table.migrate(transaction, version);
            }
        }
    }
    transaction.version = Some(to_version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DataType, DefaultValue};

    fn table_v1() -> TableDefinition {
        TableDefinition::new("things")
            .add_column(ColumnDefinition::new("id", DataType::Text).not_null())
    }

    fn migrations() -> Migrations {
        Migrations::new("things")
            .version(1, VersionMigration::recreate(table_v1(), &["id"]))
            .version(
                4,
                VersionMigration::additive(vec![
                    MigrationStep::CreateTableIfNotExists(table_v1()),
                    MigrationStep::AddColumn(
                        ColumnDefinition::new("weight", DataType::Integer)
                            .not_null()
                            .with_default(DefaultValue::Integer(0)),
                    ),
                ])
                .unwrap(),
            )
    }

    fn statements(transaction: &Transaction) -> Vec<&str> {
        transaction
            .commands
            .iter()
            .map(|c| c.statement.as_str())
            .collect()
    }

    #[test]
    fn recreate_drops_then_creates_then_indexes() {
        let mut transaction = Transaction::new();
        assert_eq!(migrations().migrate(&mut transaction, 1), 3);
        assert_eq!(
            statements(&transaction),
            vec![
                "DROP TABLE IF EXISTS things",
                "CREATE TABLE things (id TEXT NOT NULL)",
                "CREATE INDEX things_id_index ON things (id)",
            ]
        );
    }

    #[test]
    fn additive_keeps_rows() {
        let mut transaction = Transaction::new();
        migrations().migrate(&mut transaction, 4);
        assert_eq!(
            statements(&transaction),
            vec![
                "CREATE TABLE IF NOT EXISTS things (id TEXT NOT NULL)",
                "ALTER TABLE things ADD COLUMN weight INTEGER NOT NULL DEFAULT 0",
            ]
        );
        assert_eq!(
            migrations().get(4).map(|m| m.strategy),
            Some(MigrationStrategy::Additive)
        );
    }

    #[test]
    fn gaps_are_no_ops() {
        let migrations = migrations();
        assert_eq!(migrations.versions().collect::<Vec<_>>(), vec![1, 4]);

        let mut transaction = Transaction::new();
        for version in [0, 2, 3, 5, u32::MAX] {
            assert_eq!(migrations.migrate(&mut transaction, version), 0);
        }
        assert!(transaction.is_empty());
    }

    #[test]
    fn migrating_is_deterministic() {
        let mut first = Transaction::new();
        let mut second = Transaction::new();
        migrations().migrate(&mut first, 1);
        migrations().migrate(&mut second, 1);
        assert_eq!(first, second);
    }

    /// A table that only recognizes the versions it is built with
    struct SparseTable {
        migrations: Migrations,
    }

    impl SparseTable {
        fn new() -> Self {
            Self {
                migrations: Migrations::new("things")
                    .version(2, VersionMigration::recreate(table_v1(), &[])),
            }
        }
    }

    impl Table for SparseTable {
        fn table_name(&self) -> &'static str {
            "things"
        }

        fn migrate(&self, transaction: &mut Transaction, to_version: u32) {
            self.migrations.migrate(transaction, to_version);
        }
    }

    #[test]
    fn migrate_tables_walks_the_range_and_stamps_version() {
        let table = SparseTable::new();
        let mut transaction = Transaction::new();
        migrate_tables(&mut transaction, &[&table as &dyn Table], 0, 3).unwrap();

        assert_eq!(transaction.len(), 2);
        assert_eq!(transaction.version, Some(3));
    }

    #[test]
    fn migrate_tables_at_max_version_is_a_no_op() {
        let table = SparseTable {
            migrations: Migrations::new("things")
                .version(u32::MAX, VersionMigration::recreate(table_v1(), &[])),
        };
        let mut transaction = Transaction::new();
        migrate_tables(&mut transaction, &[&table as &dyn Table], u32::MAX, u32::MAX).unwrap();

        assert!(transaction.is_empty());
        assert_eq!(transaction.version, Some(u32::MAX));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn backwards_range_is_rejected_in_release_builds() {
        let table = SparseTable::new();
        let mut transaction = Transaction::new();
        let result = migrate_tables(&mut transaction, &[&table as &dyn Table], 5, 1);

        assert!(matches!(
            result,
            Err(DatabaseError::BackwardsMigration { from: 5, to: 1 })
        ));
        assert!(transaction.is_empty());
        assert_eq!(transaction.version, None);
    }

    #[test]
    #[should_panic(expected = "cannot migrate backwards")]
    #[cfg(debug_assertions)]
    fn backwards_range_is_fatal_in_debug_builds() {
        let table = SparseTable::new();
        let mut transaction = Transaction::new();
        let _ = migrate_tables(&mut transaction, &[&table as &dyn Table], 5, 1);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn additive_drop_is_rejected_in_release_builds() {
        let result = VersionMigration::additive(vec![
            MigrationStep::Drop,
            MigrationStep::CreateTable(table_v1()),
        ]);
        assert!(matches!(
            result,
            Err(DatabaseError::DestructiveAdditiveMigration)
        ));
    }

    #[test]
    #[should_panic(expected = "additive migrations must not drop the table")]
    #[cfg(debug_assertions)]
    fn additive_drop_is_fatal_in_debug_builds() {
        let _ = VersionMigration::additive(vec![MigrationStep::Drop]);
    }
}
