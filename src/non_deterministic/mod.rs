//! Non-deterministic behaviour
//!
//! The [`untestable`] processor reads the wall clock, sleeps for random
//! intervals and rolls dice to decide whether stock, credit and shipping are
//! available. The [`testable`] processor takes its clock, its randomness and
//! every external service as injected collaborators.

pub mod testable;
pub mod untestable;

pub use testable::{
    BusinessHours, CacheManager, CreditService, EmailService, FileProcessor, FileSystem,
    InventoryService, LineRequest, LocalFileSystem, OrderProcessor, OrderRejection, OrderRequest,
    ShippingAddress, ShippingService, create_order_processor,
};
