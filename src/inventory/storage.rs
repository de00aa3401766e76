//! redb-backed inventory store.
//!
//! `allowances` is the source of truth. The other tables are secondary indexes
//! written in the same transaction as the units they describe:
//!
//! | table          | key                      | value            |
//! |----------------|--------------------------|------------------|
//! | `allowances`   | serial key               | JSON unit        |
//! | `available`    | serial key               | `()`             |
//! | `order_units`  | (order id, serial key)   | `()`             |
//! | `open_orders`  | order id                 | claim micros     |
//! | `retired`      | (claim micros, serial)   | `()`             |
//! | `payments`     | tx hash                  | order id         |
//!
//! Every mutation runs inside one write transaction. redb admits a single writer
//! at a time, so "pick the lowest N available serials and mark them reserved" can
//! never hand the same unit to two orders. A failed operation aborts, leaving
//! nothing behind.

use crate::model::{
    AllowanceStatus, AllowanceUnit, OrderClaim, OrderId, OrderStatus, OrderView,
    RetirementRecord, SerialNumber, StockLevels, TxHash, WalletAddress,
};
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Units: key = zero-padded serial, value = JSON
const ALLOWANCES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("allowances");

/// Index: serial -> () for every available unit
const AVAILABLE_TABLE: TableDefinition<&str, ()> = TableDefinition::new("available");

/// Index: (order_id, serial) -> ()
const ORDER_UNITS_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("order_units");

/// Index: order_id -> claim timestamp (micros) for reserved orders
const OPEN_ORDERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("open_orders");

/// Index: (claim timestamp micros, serial) -> () for retired units
const RETIRED_TABLE: TableDefinition<(i64, &str), ()> = TableDefinition::new("retired");

/// Payment references already used: tx_hash -> order_id
const PAYMENTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("payments");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("insufficient inventory, only {available} available")]
    InsufficientInventory { requested: u32, available: u64 },

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("order {order_id} already exists")]
    DuplicateOrder { order_id: OrderId },

    #[error("order {order_id} is {status}, expected {expected}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    },

    #[error("transaction {tx_hash} is already recorded for order {order_id}")]
    PaymentReused { tx_hash: TxHash, order_id: String },

    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Handle to the inventory database. Cloning shares the same database; it is
/// closed when the last clone is dropped.
#[derive(Clone)]
pub struct InventoryStorage {
    db: Arc<Database>,
}

impl InventoryStorage {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (for tests and dry runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ALLOWANCES_TABLE)?;
            let _ = write_txn.open_table(AVAILABLE_TABLE)?;
            let _ = write_txn.open_table(ORDER_UNITS_TABLE)?;
            let _ = write_txn.open_table(OPEN_ORDERS_TABLE)?;
            let _ = write_txn.open_table(RETIRED_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Runs `f` in a write transaction, committing on `Ok` and aborting on `Err`.
    fn write<T>(&self, f: impl FnOnce(&WriteTransaction) -> StorageResult<T>) -> StorageResult<T> {
        let txn = self.db.begin_write()?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort()?;
                Err(e)
            }
        }
    }

    // ========== Provisioning ==========

    /// Inserts units that do not exist yet. Existing units are left untouched.
    ///
    /// Returns how many units were created.
    pub fn provision(&self, serials: &[SerialNumber]) -> StorageResult<usize> {
        self.write(|txn| {
            let mut units = txn.open_table(ALLOWANCES_TABLE)?;
            let mut available = txn.open_table(AVAILABLE_TABLE)?;
            let mut created = 0;
            for serial in serials {
                let key = serial.key();
                if units.get(key.as_str())?.is_some() {
                    continue;
                }
                let value = serde_json::to_vec(&AllowanceUnit::available(*serial))?;
                units.insert(key.as_str(), value.as_slice())?;
                available.insert(key.as_str(), ())?;
                created += 1;
            }
            Ok(created)
        })
    }

    // ========== Order transitions ==========

    /// Claims the `count` lowest available serials for `order_id`.
    ///
    /// All-or-nothing: if fewer than `count` are available nothing changes and
    /// [`StorageError::InsufficientInventory`] reports how many there were.
    pub fn claim(
        &self,
        order_id: OrderId,
        count: u32,
        wallet: &WalletAddress,
        message: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<Vec<SerialNumber>> {
        let order_key = order_id.to_string();
        self.write(|txn| {
            let mut order_units = txn.open_table(ORDER_UNITS_TABLE)?;
            if Self::order_keys(&order_units, &order_key)?.next().is_some() {
                return Err(StorageError::DuplicateOrder { order_id });
            }

            let mut available = txn.open_table(AVAILABLE_TABLE)?;
            let picked = available
                .iter()?
                .take(count as usize)
                .map(|entry| entry.map(|(key, _)| key.value().to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            if picked.len() < count as usize {
                return Err(StorageError::InsufficientInventory {
                    requested: count,
                    available: available.len()?,
                });
            }

            let claim = OrderClaim {
                order_id,
                wallet: wallet.clone(),
                message: message.to_string(),
                claimed_at: at,
                tx_hash: None,
                reward_tx_hash: None,
            };

            let mut units = txn.open_table(ALLOWANCES_TABLE)?;
            let mut serials = Vec::with_capacity(picked.len());
            for key in &picked {
                let mut unit = Self::load_unit(&units, key)?;
                if unit.status != AllowanceStatus::Available {
                    return Err(StorageError::Corrupt {
                        key: key.clone(),
                        reason: format!("indexed as available but {}", unit.status),
                    });
                }
                unit.status = AllowanceStatus::Reserved;
                unit.claim = Some(claim.clone());
                Self::store_unit(&mut units, key, &unit)?;
                available.remove(key.as_str())?;
                order_units.insert((order_key.as_str(), key.as_str()), ())?;
                serials.push(unit.serial);
            }

            let mut open_orders = txn.open_table(OPEN_ORDERS_TABLE)?;
            open_orders.insert(order_key.as_str(), micros(at))?;

            Ok(serials)
        })
    }

    /// Stamps `tx_hash` on every unit of a pending order.
    pub fn stamp_payment(&self, order_id: OrderId, tx_hash: &TxHash) -> StorageResult<OrderView> {
        let order_key = order_id.to_string();
        self.write(|txn| {
            let (keys, mut units_vec) = Self::load_order_units(txn, &order_key)?;
            let view = Self::require_status(order_id, &units_vec, OrderStatus::Pending)?;

            let mut payments = txn.open_table(PAYMENTS_TABLE)?;
            if let Some(existing) = payments.get(tx_hash.as_str())? {
                return Err(StorageError::PaymentReused {
                    tx_hash: tx_hash.clone(),
                    order_id: existing.value().to_string(),
                });
            }
            payments.insert(tx_hash.as_str(), order_key.as_str())?;

            let mut units = txn.open_table(ALLOWANCES_TABLE)?;
            for (key, unit) in keys.iter().zip(units_vec.iter_mut()) {
                if let Some(claim) = unit.claim.as_mut() {
                    claim.tx_hash = Some(tx_hash.clone());
                }
                Self::store_unit(&mut units, key, unit)?;
            }

            Ok(OrderView {
                status: OrderStatus::PaidButNotRetired,
                tx_hash: Some(tx_hash.clone()),
                ..view
            })
        })
    }

    /// Retires every unit of a paid order.
    pub fn retire(&self, order_id: OrderId) -> StorageResult<OrderView> {
        let order_key = order_id.to_string();
        self.write(|txn| {
            let (keys, mut units_vec) = Self::load_order_units(txn, &order_key)?;
            let view = Self::require_status(order_id, &units_vec, OrderStatus::PaidButNotRetired)?;

            let claimed_at = view.claimed_at.map(micros).unwrap_or_default();
            let mut units = txn.open_table(ALLOWANCES_TABLE)?;
            let mut retired = txn.open_table(RETIRED_TABLE)?;
            for (key, unit) in keys.iter().zip(units_vec.iter_mut()) {
                unit.status = AllowanceStatus::Retired;
                Self::store_unit(&mut units, key, unit)?;
                retired.insert((claimed_at, key.as_str()), ())?;
            }

            let mut open_orders = txn.open_table(OPEN_ORDERS_TABLE)?;
            open_orders.remove(order_key.as_str())?;

            Ok(OrderView {
                status: OrderStatus::Completed,
                ..view
            })
        })
    }

    /// Records the reward transaction on a completed order.
    pub fn attach_reward(&self, order_id: OrderId, reward_tx_hash: &str) -> StorageResult<()> {
        let order_key = order_id.to_string();
        self.write(|txn| {
            let (keys, mut units_vec) = Self::load_order_units(txn, &order_key)?;
            Self::require_status(order_id, &units_vec, OrderStatus::Completed)?;

            let mut units = txn.open_table(ALLOWANCES_TABLE)?;
            for (key, unit) in keys.iter().zip(units_vec.iter_mut()) {
                if let Some(claim) = unit.claim.as_mut() {
                    claim.reward_tx_hash = Some(reward_tx_hash.to_string());
                }
                Self::store_unit(&mut units, key, unit)?;
            }
            Ok(())
        })
    }

    /// Returns the order's reserved units to the available pool.
    ///
    /// Retired units are never touched. Releasing an order that has nothing
    /// reserved (already released, never existed) is a no-op returning 0.
    pub fn release(&self, order_id: OrderId) -> StorageResult<usize> {
        let order_key = order_id.to_string();
        self.write(|txn| Self::release_in(txn, &order_key))
    }

    /// Releases the order only while it is still pending.
    ///
    /// Used by the reservation hold, which must not undo an order whose payment
    /// reference arrived in the meantime.
    pub fn release_if_pending(&self, order_id: OrderId) -> StorageResult<usize> {
        let order_key = order_id.to_string();
        self.write(|txn| {
            let (_, units) = Self::load_order_units(txn, &order_key)?;
            match OrderView::project(order_id, &units) {
                Some(view) if view.status == OrderStatus::Pending => {
                    Self::release_in(txn, &order_key)
                }
                _ => Ok(0),
            }
        })
    }

    fn release_in(txn: &WriteTransaction, order_key: &str) -> StorageResult<usize> {
        let mut order_units = txn.open_table(ORDER_UNITS_TABLE)?;
        let keys = Self::order_keys(&order_units, order_key)?.collect::<Result<Vec<_>, _>>()?;

        let mut units = txn.open_table(ALLOWANCES_TABLE)?;
        let mut available = txn.open_table(AVAILABLE_TABLE)?;
        let mut released = 0;
        for key in &keys {
            let mut unit = Self::load_unit(&units, key)?;
            if unit.status != AllowanceStatus::Reserved {
                continue;
            }
            unit.status = AllowanceStatus::Available;
            unit.claim = None;
            Self::store_unit(&mut units, key, &unit)?;
            available.insert(key.as_str(), ())?;
            order_units.remove((order_key, key.as_str()))?;
            released += 1;
        }

        if released > 0 {
            let mut open_orders = txn.open_table(OPEN_ORDERS_TABLE)?;
            open_orders.remove(order_key)?;
        }
        Ok(released)
    }

    // ========== Queries ==========

    /// Current units of an order, in serial order.
    pub fn order_units(&self, order_id: OrderId) -> StorageResult<Vec<AllowanceUnit>> {
        let read_txn = self.db.begin_read()?;
        let order_units = read_txn.open_table(ORDER_UNITS_TABLE)?;
        let units = read_txn.open_table(ALLOWANCES_TABLE)?;

        let order_key = order_id.to_string();
        let mut result = Vec::new();
        for key in Self::order_keys(&order_units, &order_key)? {
            result.push(Self::load_unit(&units, &key?)?);
        }
        Ok(result)
    }

    pub fn order_view(&self, order_id: OrderId) -> StorageResult<Option<OrderView>> {
        let units = self.order_units(order_id)?;
        Ok(OrderView::project(order_id, &units))
    }

    /// Retired units, newest claim first.
    pub fn list_retired(&self, limit: usize) -> StorageResult<Vec<RetirementRecord>> {
        let read_txn = self.db.begin_read()?;
        let retired = read_txn.open_table(RETIRED_TABLE)?;
        let units = read_txn.open_table(ALLOWANCES_TABLE)?;

        let mut records = Vec::new();
        for entry in retired.iter()?.rev().take(limit) {
            let (key, _) = entry?;
            let (_, serial_key) = key.value();
            let unit = Self::load_unit(&units, serial_key)?;
            let claim = unit.claim.ok_or_else(|| StorageError::Corrupt {
                key: serial_key.to_string(),
                reason: "retired without a claim".to_string(),
            })?;
            records.push(RetirementRecord {
                serial_number: unit.serial,
                order_id: claim.order_id,
                wallet: claim.wallet,
                message: claim.message,
                timestamp: claim.claimed_at,
                tx_hash: claim.tx_hash,
                reward_tx_hash: claim.reward_tx_hash,
            });
        }
        Ok(records)
    }

    pub fn stock(&self) -> StorageResult<StockLevels> {
        let read_txn = self.db.begin_read()?;
        let units = read_txn.open_table(ALLOWANCES_TABLE)?.len()?;
        let available = read_txn.open_table(AVAILABLE_TABLE)?.len()?;
        let retired = read_txn.open_table(RETIRED_TABLE)?.len()?;
        Ok(StockLevels {
            available,
            retired,
            reserved: units.saturating_sub(available + retired),
        })
    }

    /// Orders holding reserved units (pending or paid), oldest first.
    pub fn in_flight(&self) -> StorageResult<Vec<OrderView>> {
        let open = {
            let read_txn = self.db.begin_read()?;
            let open_orders = read_txn.open_table(OPEN_ORDERS_TABLE)?;
            let mut open = Vec::new();
            for entry in open_orders.iter()? {
                let (key, claimed) = entry?;
                open.push((claimed.value(), key.value().to_string()));
            }
            open.sort();
            open
        };

        let mut views = Vec::new();
        for (_, order_key) in open {
            let order_id = order_key.parse::<OrderId>().map_err(|e| StorageError::Corrupt {
                key: order_key.clone(),
                reason: e.to_string(),
            })?;
            if let Some(view) = self.order_view(order_id)? {
                views.push(view);
            }
        }
        Ok(views)
    }

    /// In-flight orders past their deadline: pending ones claimed before
    /// `pending_before`, paid ones claimed before `paid_before`.
    pub fn expired(
        &self,
        pending_before: DateTime<Utc>,
        paid_before: DateTime<Utc>,
    ) -> StorageResult<Vec<OrderView>> {
        Ok(self
            .in_flight()?
            .into_iter()
            .filter(|view| {
                let Some(claimed_at) = view.claimed_at else {
                    return false;
                };
                match view.status {
                    OrderStatus::Pending => claimed_at < pending_before,
                    OrderStatus::PaidButNotRetired => claimed_at < paid_before,
                    _ => false,
                }
            })
            .collect())
    }

    // ========== Helpers ==========

    fn order_keys<'a>(
        table: &'a impl ReadableTable<(&'static str, &'static str), ()>,
        order_key: &'a str,
    ) -> StorageResult<impl Iterator<Item = StorageResult<String>> + 'a> {
        let range_start: (&str, &str) = (order_key, "");
        let range_end: (&str, &str) = (order_key, "\u{ffff}");
        Ok(table.range(range_start..=range_end)?.map(|entry| {
            let (key, _) = entry?;
            let (_, serial_key) = key.value();
            Ok(serial_key.to_string())
        }))
    }

    fn load_unit(
        table: &impl ReadableTable<&'static str, &'static [u8]>,
        key: &str,
    ) -> StorageResult<AllowanceUnit> {
        let guard = table.get(key)?.ok_or_else(|| StorageError::Corrupt {
            key: key.to_string(),
            reason: "indexed unit is missing".to_string(),
        })?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    fn store_unit(
        table: &mut redb::Table<&'static str, &'static [u8]>,
        key: &str,
        unit: &AllowanceUnit,
    ) -> StorageResult<()> {
        let value = serde_json::to_vec(unit)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Keys and units of an order inside a write transaction.
    fn load_order_units(
        txn: &WriteTransaction,
        order_key: &str,
    ) -> StorageResult<(Vec<String>, Vec<AllowanceUnit>)> {
        let order_units = txn.open_table(ORDER_UNITS_TABLE)?;
        let units = txn.open_table(ALLOWANCES_TABLE)?;
        let keys = Self::order_keys(&order_units, order_key)?.collect::<Result<Vec<_>, _>>()?;
        let loaded = keys
            .iter()
            .map(|key| Self::load_unit(&units, key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((keys, loaded))
    }

    fn require_status(
        order_id: OrderId,
        units: &[AllowanceUnit],
        expected: OrderStatus,
    ) -> StorageResult<OrderView> {
        let view =
            OrderView::project(order_id, units).ok_or(StorageError::OrderNotFound(order_id))?;
        if view.status != expected {
            return Err(StorageError::InvalidState {
                order_id,
                status: view.status,
                expected,
            });
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn tx(n: u8) -> TxHash {
        TxHash::parse(&format!("0x{}", format!("{n:02x}").repeat(32))).unwrap()
    }

    fn seeded(n: u64) -> InventoryStorage {
        let storage = InventoryStorage::open_in_memory().unwrap();
        let serials: Vec<_> = (1..=n).map(|i| SerialNumber(100 + i)).collect();
        assert_eq!(storage.provision(&serials).unwrap(), n as usize);
        storage
    }

    fn assert_consistent(storage: &InventoryStorage, order_id: OrderId) {
        for unit in storage.order_units(order_id).unwrap() {
            assert!(unit.is_consistent(), "inconsistent unit {unit:?}");
        }
    }

    #[test]
    fn provision_is_idempotent() {
        let storage = seeded(5);
        let again: Vec<_> = (1..=7).map(|i| SerialNumber(100 + i)).collect();
        assert_eq!(storage.provision(&again).unwrap(), 2);
        assert_eq!(storage.stock().unwrap().available, 7);
    }

    #[test]
    fn claim_takes_lowest_serials_in_order() {
        let storage = seeded(5);
        let order = OrderId::new();
        let serials = storage
            .claim(order, 3, &wallet(), "hello", Utc::now())
            .unwrap();
        assert_eq!(serials, vec![SerialNumber(101), SerialNumber(102), SerialNumber(103)]);

        let view = storage.order_view(order).unwrap().unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.wallet, Some(wallet()));
        assert_consistent(&storage, order);

        let stock = storage.stock().unwrap();
        assert_eq!((stock.available, stock.reserved, stock.retired), (2, 3, 0));
    }

    #[test]
    fn claim_orders_serials_numerically_across_digit_counts() {
        let storage = InventoryStorage::open_in_memory().unwrap();
        storage
            .provision(&[SerialNumber(1_000_000_000_000), SerialNumber(999_999_999_999)])
            .unwrap();

        let first = storage
            .claim(OrderId::new(), 1, &wallet(), "", Utc::now())
            .unwrap();
        assert_eq!(first, vec![SerialNumber(999_999_999_999)]);
        let second = storage
            .claim(OrderId::new(), 1, &wallet(), "", Utc::now())
            .unwrap();
        assert_eq!(second, vec![SerialNumber(1_000_000_000_000)]);
    }

    #[test]
    fn short_claim_changes_nothing() {
        let storage = seeded(2);
        let err = storage
            .claim(OrderId::new(), 3, &wallet(), "", Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "insufficient inventory, only 2 available");
        assert!(matches!(
            err,
            StorageError::InsufficientInventory {
                requested: 3,
                available: 2
            }
        ));
        assert_eq!(storage.stock().unwrap().available, 2);
    }

    #[test]
    fn claim_rejects_reused_order_id() {
        let storage = seeded(4);
        let order = OrderId::new();
        storage.claim(order, 1, &wallet(), "", Utc::now()).unwrap();
        let err = storage.claim(order, 1, &wallet(), "", Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrder { .. }));
        assert_eq!(storage.order_units(order).unwrap().len(), 1);
    }

    #[test]
    fn payment_then_retire_completes_order() {
        let storage = seeded(3);
        let order = OrderId::new();
        storage.claim(order, 2, &wallet(), "msg", Utc::now()).unwrap();

        let paid = storage.stamp_payment(order, &tx(1)).unwrap();
        assert_eq!(paid.status, OrderStatus::PaidButNotRetired);
        assert_consistent(&storage, order);

        let done = storage.retire(order).unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        storage.attach_reward(order, "0xreward").unwrap();

        let view = storage.order_view(order).unwrap().unwrap();
        assert_eq!(view.status, OrderStatus::Completed);
        assert_eq!(view.reward_tx_hash.as_deref(), Some("0xreward"));
        assert_eq!(storage.stock().unwrap().retired, 2);
        assert!(storage.in_flight().unwrap().is_empty());
    }

    #[test]
    fn payment_requires_pending_order() {
        let storage = seeded(3);
        let missing = storage.stamp_payment(OrderId::new(), &tx(1)).unwrap_err();
        assert!(matches!(missing, StorageError::OrderNotFound(_)));

        let order = OrderId::new();
        storage.claim(order, 1, &wallet(), "", Utc::now()).unwrap();
        storage.stamp_payment(order, &tx(1)).unwrap();
        let twice = storage.stamp_payment(order, &tx(2)).unwrap_err();
        assert!(matches!(
            twice,
            StorageError::InvalidState {
                status: OrderStatus::PaidButNotRetired,
                ..
            }
        ));
    }

    #[test]
    fn one_payment_cannot_serve_two_orders() {
        let storage = seeded(3);
        let first = OrderId::new();
        let second = OrderId::new();
        storage.claim(first, 1, &wallet(), "", Utc::now()).unwrap();
        storage.claim(second, 1, &wallet(), "", Utc::now()).unwrap();

        storage.stamp_payment(first, &tx(9)).unwrap();
        let err = storage.stamp_payment(second, &tx(9)).unwrap_err();
        assert!(matches!(err, StorageError::PaymentReused { .. }));
        assert_eq!(
            storage.order_view(second).unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn retire_requires_payment() {
        let storage = seeded(1);
        let order = OrderId::new();
        storage.claim(order, 1, &wallet(), "", Utc::now()).unwrap();
        assert!(matches!(
            storage.retire(order),
            Err(StorageError::InvalidState { .. })
        ));
    }

    #[test]
    fn release_clears_claims_and_is_idempotent() {
        let storage = seeded(3);
        let order = OrderId::new();
        let serials = storage.claim(order, 2, &wallet(), "x", Utc::now()).unwrap();
        storage.stamp_payment(order, &tx(3)).unwrap();

        assert_eq!(storage.release(order).unwrap(), 2);
        assert_eq!(storage.release(order).unwrap(), 0);
        assert!(storage.order_view(order).unwrap().is_none());
        assert_eq!(storage.stock().unwrap().available, 3);

        // Released units are claimable again, lowest first
        let next = OrderId::new();
        let again = storage.claim(next, 2, &wallet(), "", Utc::now()).unwrap();
        assert_eq!(again, serials);
    }

    #[test]
    fn release_never_touches_retired_units() {
        let storage = seeded(2);
        let order = OrderId::new();
        storage.claim(order, 2, &wallet(), "", Utc::now()).unwrap();
        storage.stamp_payment(order, &tx(4)).unwrap();
        storage.retire(order).unwrap();

        assert_eq!(storage.release(order).unwrap(), 0);
        assert_eq!(
            storage.order_view(order).unwrap().unwrap().status,
            OrderStatus::Completed
        );
    }

    #[test]
    fn release_if_pending_skips_paid_orders() {
        let storage = seeded(2);
        let order = OrderId::new();
        storage.claim(order, 1, &wallet(), "", Utc::now()).unwrap();
        storage.stamp_payment(order, &tx(5)).unwrap();
        assert_eq!(storage.release_if_pending(order).unwrap(), 0);

        let pending = OrderId::new();
        storage.claim(pending, 1, &wallet(), "", Utc::now()).unwrap();
        assert_eq!(storage.release_if_pending(pending).unwrap(), 1);
    }

    #[test]
    fn history_is_newest_first() {
        let storage = seeded(5);
        let t0 = Utc::now();
        let older = OrderId::new();
        let newer = OrderId::new();
        storage.claim(older, 2, &wallet(), "old", t0).unwrap();
        storage
            .claim(newer, 2, &wallet(), "new", t0 + Duration::seconds(10))
            .unwrap();
        for (order, n) in [(older, 1), (newer, 2)] {
            storage.stamp_payment(order, &tx(n)).unwrap();
            storage.retire(order).unwrap();
        }

        let history = storage.list_retired(50).unwrap();
        let messages: Vec<_> = history.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["new", "new", "old", "old"]);
        assert_eq!(history[0].serial_number, SerialNumber(104));
        assert_eq!(storage.list_retired(1).unwrap().len(), 1);
    }

    #[test]
    fn expired_orders_respect_separate_deadlines() {
        let storage = seeded(4);
        let now = Utc::now();
        let stale_pending = OrderId::new();
        let stale_paid = OrderId::new();
        let fresh = OrderId::new();
        storage
            .claim(stale_pending, 1, &wallet(), "", now - Duration::minutes(20))
            .unwrap();
        storage
            .claim(stale_paid, 1, &wallet(), "", now - Duration::minutes(20))
            .unwrap();
        storage.stamp_payment(stale_paid, &tx(6)).unwrap();
        storage.claim(fresh, 1, &wallet(), "", now).unwrap();

        let expired = storage
            .expired(now - Duration::minutes(15), now - Duration::minutes(30))
            .unwrap();
        let ids: Vec<_> = expired.iter().map(|v| v.order_id).collect();
        assert_eq!(ids, vec![stale_pending]);
        assert_eq!(storage.in_flight().unwrap().len(), 3);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.redb");
        let order = OrderId::new();
        {
            let storage = InventoryStorage::open(&path).unwrap();
            storage.provision(&[SerialNumber(1), SerialNumber(2)]).unwrap();
            storage.claim(order, 1, &wallet(), "kept", Utc::now()).unwrap();
        }
        let storage = InventoryStorage::open(&path).unwrap();
        let view = storage.order_view(order).unwrap().unwrap();
        assert_eq!(view.message.as_deref(), Some("kept"));
        assert_eq!(storage.stock().unwrap().available, 1);
    }
}
