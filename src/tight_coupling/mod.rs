//! Tight coupling
//!
//! The [`untestable`] order flow constructs its SQLite database, mail sender
//! and exporter inline. The [`testable`] flow talks to [`OrderRepository`],
//! [`NotificationService`] and [`OrderExporter`] traits, and small factory
//! functions choose the concrete types.

pub mod testable;
pub mod untestable;

pub use testable::{
    EmailNotificationService, JsonOrderExporter, NewOrder, NotificationService, OrderExporter,
    OrderManager, OrderProcessing, OrderProcessor, OrderRecord, OrderRepository, OrderSettings,
    SqliteOrderRepository, create_notification_service, create_order_exporter,
    create_order_manager, create_order_repository,
};
