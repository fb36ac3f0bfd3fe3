use std::sync::Arc;

use crate::client::{ExecutionClient, ExecutionClientExt, ExecutionResult, ResultCallback};
use crate::error::Result;
use crate::migration::{Migrations, VersionMigration};
use crate::query::{
    delete_all, insert_or_replace_sql, ColumnDefinition, ConflictClause, DataType, ForeignKey,
    ForeignKeyAction, TableDefinition,
};
use crate::sqlite::{bind_string, Command, CommandType, Transaction};
use crate::tables::{CreativeAd, Table};

pub const TABLE_NAME: &str = "geo_targets";

const COLUMNS: [&str; 2] = ["campaign_id", "geo_target"];

/// Geo targets per campaign, one row per (campaign, geo target) pair
pub struct GeoTargets {
    client: Arc<dyn ExecutionClient>,
    migrations: Migrations,
}

impl GeoTargets {
    pub fn new(client: Arc<dyn ExecutionClient>) -> Self {
        let migrations = Migrations::new(TABLE_NAME)
            .version(1, VersionMigration::recreate(table_v1(), &["geo_target"]))
            // The composite primary key already serves campaign_id lookups
            .version(3, VersionMigration::recreate(table_v3(), &[]));

        Self { client, migrations }
    }

    pub fn migrations(&self) -> &Migrations {
        &self.migrations
    }

    /// Append one `INSERT OR REPLACE` covering every geo target of
    /// `creative_ads`. Appends nothing when there are no rows to write.
    pub fn insert_or_update(
        &self,
        transaction: &mut Transaction,
        creative_ads: &[CreativeAd],
    ) -> Result<()> {
        if creative_ads.iter().all(|ad| ad.geo_targets.is_empty()) {
            return Ok(());
        }

        let mut command = Command::new(CommandType::Run);
        let statement = self.build_insert_or_update_query(&mut command, creative_ads)?;
        command.statement = statement;
        transaction.push(command);
        Ok(())
    }

    /// Clear the table in its own transaction and report the outcome to
    /// `callback` once the client finishes.
    pub fn delete(&self, callback: ResultCallback) {
        let mut transaction = Transaction::new();
        delete_all(&mut transaction, TABLE_NAME);

        tracing::info!(table = TABLE_NAME, "deleting all rows");
        self.client.run_transaction(
            transaction,
            Box::new(move |response| callback(ExecutionResult::from(&response))),
        );
    }

    pub async fn delete_async(&self) -> Result<ExecutionResult> {
        let mut transaction = Transaction::new();
        delete_all(&mut transaction, TABLE_NAME);

        tracing::info!(table = TABLE_NAME, "deleting all rows");
        let response = self.client.run(transaction).await?;
        Ok(ExecutionResult::from(&response))
    }

    fn bind_parameters(&self, command: &mut Command, creative_ads: &[CreativeAd]) -> Result<usize> {
        let mut count = 0;
        let mut index = 0;
        for creative_ad in creative_ads {
            for geo_target in &creative_ad.geo_targets {
                bind_string(command, index, &creative_ad.campaign_id)?;
                bind_string(command, index + 1, geo_target)?;
                index += COLUMNS.len();
                count += 1;
            }
        }
        Ok(count)
    }

    fn build_insert_or_update_query(
        &self,
        command: &mut Command,
        creative_ads: &[CreativeAd],
    ) -> Result<String> {
        let count = self.bind_parameters(command, creative_ads)?;
        insert_or_replace_sql(command, TABLE_NAME, &COLUMNS, count)
    }
}

impl Table for GeoTargets {
    fn table_name(&self) -> &'static str {
        TABLE_NAME
    }

    fn migrate(&self, transaction: &mut Transaction, to_version: u32) {
        self.migrations.migrate(transaction, to_version);
    }
}

fn table_v1() -> TableDefinition {
    TableDefinition::new(TABLE_NAME)
        .add_column(ColumnDefinition::new("creative_instance_id", DataType::Text).not_null())
        .add_column(ColumnDefinition::new("geo_target", DataType::Text).not_null())
        .with_unique(
            &["creative_instance_id", "geo_target"],
            Some(ConflictClause::Replace),
        )
        .add_foreign_key(
            ForeignKey::new(
                "creative_instance_id",
                "creative_ad_notifications",
                "creative_instance_id",
            )
            .named("fk_creative_instance_id")
            .on_delete(ForeignKeyAction::Cascade),
        )
}

fn table_v3() -> TableDefinition {
    TableDefinition::new(TABLE_NAME)
        .add_column(ColumnDefinition::new("campaign_id", DataType::Text).not_null())
        .add_column(ColumnDefinition::new("geo_target", DataType::Text).not_null())
        .with_primary_key(&COLUMNS)
        .with_unique(&COLUMNS, Some(ConflictClause::Replace))
}
