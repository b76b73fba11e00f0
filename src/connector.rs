use async_trait::async_trait;
use std::collections::HashMap;

/// Balance table: asset symbol -> account identifier -> decimal quantity
///
/// Values are always non-negative. A refresh merges into the table; entries
/// that fail to refresh keep their last observed value.
pub type BalanceTable = HashMap<String, HashMap<String, f64>>;

/// Contract between the exporter process and a balance data source
///
/// Each connector instance owns its balance table and its authentication
/// state. The exporter schedules `retrieve_accounts` on a fixed interval and
/// reads snapshots through `get_accounts` in between.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Identifier of the backing exchange or provider
    fn exchange(&self) -> &str;

    /// Read-only snapshot of the current balance table
    fn get_accounts(&self) -> BalanceTable;

    /// Refresh the balance table and return it
    ///
    /// Failed sub-requests leave their entries untouched. This never fails:
    /// the worst case is a table identical to the previous cycle.
    async fn retrieve_accounts(&mut self) -> &BalanceTable;
}
