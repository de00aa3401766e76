//! Read-only view of retired allowances.

use crate::clients::InventoryClient;
use crate::inventory::InventoryError;
use crate::model::RetirementRecord;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

#[derive(Clone)]
pub struct HistoryReader {
    inventory: InventoryClient,
}

impl HistoryReader {
    pub fn new(inventory: InventoryClient) -> Self {
        Self { inventory }
    }

    /// Newest claim first, ties by descending serial. `None` means
    /// [`DEFAULT_LIMIT`]; larger limits are capped at [`MAX_LIMIT`].
    pub async fn list_retired(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RetirementRecord>, InventoryError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        self.inventory.list_retired(limit).await
    }
}
