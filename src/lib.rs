//! # Allowance Desk
//!
//! Reservation and fulfilment of climate-offset allowances paid for on chain.
//!
//! A caller reserves N allowance units, submits the payment transaction, and a
//! background monitor watches the transaction until the units are retired or
//! released back to stock.
//!
//! ## Module Tour
//!
//! ### 1. Data ([`model`])
//! Allowance units, identifiers, and the [`OrderView`](model::OrderView)
//! projection. An order is never stored; its status is derived from its units.
//!
//! ### 2. State ([`inventory`])
//! The redb-backed inventory store behind the
//! [`InventoryLedger`](inventory::InventoryLedger) actor. Every mutation of an
//! order's units happens in one write transaction.
//!
//! ### 3. Interface ([`clients`])
//! Typed wrappers around the actors' generic service clients.
//!
//! ### 4. Workflow ([`reservation`], [`payment`], [`monitor`], [`history`])
//! Validation and claiming, payment verification and rewards, per-order
//! monitor tasks with the stale-reservation sweeper, and the retirement
//! history.
//!
//! ### 5. Orchestration ([`lifecycle`], [`api`], [`config`])
//! Start-up wiring and shutdown, the HTTP surface, and configuration.
//!
//! ## Running
//!
//! ```bash
//! SEED_SERIAL_RANGES="1000 - 1099" RUST_LOG=info cargo run
//! ```

pub mod api;
pub mod clients;
pub mod config;
pub mod history;
pub mod inventory;
pub mod lifecycle;
pub mod model;
pub mod monitor;
pub mod payment;
pub mod reservation;
