//! Puwasa POS - billing core for the desktop point-of-sale client.
//!
//! Implements the cashier workflow around one sale: the in-memory cart, the
//! bill lifecycle against the remote billing backend (create, attach
//! details, complete, hold/resume, cancel), inventory lookup feeding the
//! cart, cash-register session calls, and the print bridge that hands bill
//! snapshots to the external render helper.
//!
//! The embedding desktop shell owns the UI and the single-flight
//! `isProcessing` exclusion; everything here runs one operation at a time
//! per session and reports failures as human-readable messages, never
//! retrying on its own.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod billing;
pub mod cart;
pub mod config;
pub mod inventory;
pub mod print;
pub mod register;
pub mod session;

pub use api::{ApiClient, ApiResponse};
pub use billing::{BillingController, CheckoutSummary, TempBillSummary};
pub use cart::{Cart, CustomerRef, Discount, ItemCandidate, LineItem};
pub use config::{ApiConfig, DeviceIdentity, PrintPaths};
pub use print::{BillUpdate, HelperSpec, PrintBridge, PrintOutcome, ReceiptInput, WriteStage};
pub use session::{AuthTokens, Cashier, LocationRef, SessionContext, SharedSession};

/// Initialize structured logging (console + daily rolling file). Call once
/// at startup from the embedding shell.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,puwasa_pos_lib=debug"));

    let log_dir = config::default_data_dir().join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "pos");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the process; dropping it
    // flushes logs.
    std::mem::forget(guard);

    info!("Puwasa POS billing core v{}", env!("CARGO_PKG_VERSION"));
}
