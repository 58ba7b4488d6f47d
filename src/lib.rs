//! Shop Orders
//!
//! Order lifecycle and temp order merge engine for a multi-shop order backend.
//!
//! ## Features
//! - Orders with line items whose stored total always matches the items
//! - At most one active (`created` / `in_progress`) order per customer and shop,
//!   enforced by the database and not only by a lookup
//! - Public temp orders submitted through a shop's share link
//! - Atomic merge of a temp order into a new or existing order
//!
//! Every service operation runs in exactly one transaction; see [`store`].

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod pricing;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{OrderError, Result};
pub use pricing::{PriceCalculator, TotalOverflow};
pub use services::{ActiveOrderGuard, MergeCoordinator, OrderLifecycleService, Services, TempOrderLifecycleService};
