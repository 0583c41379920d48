//! Print bridge for receipt output.
//!
//! Converts a bill snapshot into the fixed-path JSON artifact and hands it
//! to the external render helper, which produces the PDF the till actually
//! prints. Two modes:
//!
//! - **write-only**: persist the JSON record and notify observers whether
//!   the write was an interim save (balance 0) or a settled one; used by
//!   the Save action, no process is spawned;
//! - **render** (default): invoke the helper against the previously written
//!   artifact and treat the PDF's existence as the only "printed" signal.
//!
//! The JSON write is the primary success signal; a render failure degrades
//! `printed`, never `success`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::billing::CheckoutSummary;
use crate::cart::Cart;
use crate::config::PrintPaths;

/// Bound on one render-helper invocation.
const HELPER_TIMEOUT: Duration = Duration::from_secs(120);

/// Buffered bill-update events before slow observers start losing them.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Input snapshot and canonical artifact
// ---------------------------------------------------------------------------

/// Loose bill snapshot handed to the bridge. Every field is optional; the
/// defaults are applied once, in [`normalize`], so the written artifact is
/// always complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptInput {
    #[serde(rename = "BillID", default)]
    pub bill_id: Option<String>,
    #[serde(rename = "CashierID", default)]
    pub cashier_id: Option<String>,
    #[serde(rename = "CustomerName", default)]
    pub customer_name: Option<String>,
    #[serde(rename = "CustomerFName", default)]
    pub customer_fname: Option<String>,
    #[serde(rename = "CustomerLName", default)]
    pub customer_lname: Option<String>,
    #[serde(rename = "Total", default)]
    pub total: Option<f64>,
    #[serde(rename = "Discount", default)]
    pub discount: Option<f64>,
    #[serde(rename = "CashAmount", default)]
    pub cash_amount: Option<f64>,
    #[serde(rename = "CardAmount", default)]
    pub card_amount: Option<f64>,
    #[serde(rename = "Balance", default)]
    pub balance: Option<f64>,
    #[serde(rename = "Details", default)]
    pub details: Vec<ReceiptLineInput>,
    /// Stop after writing the JSON artifact; do not invoke the helper.
    #[serde(rename = "WriteOnly", default)]
    pub write_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptLineInput {
    #[serde(rename = "ItemName", default)]
    pub item_name: Option<String>,
    #[serde(rename = "QTY", default)]
    pub qty: Option<f64>,
    #[serde(rename = "UnitPrice", default)]
    pub unit_price: Option<f64>,
}

impl ReceiptInput {
    /// Snapshot a completed checkout for printing.
    pub fn from_sale(cart: &Cart, summary: &CheckoutSummary, cashier_id: Option<i64>) -> Self {
        let customer = cart.customer();
        Self {
            bill_id: Some(summary.bill_id.to_string()),
            cashier_id: cashier_id.map(|id| id.to_string()),
            customer_name: customer.map(|c| c.display_name()),
            customer_fname: customer.map(|c| c.first_name.clone()),
            customer_lname: customer.map(|c| c.last_name.clone()),
            total: Some(summary.total),
            discount: Some(summary.total_discount),
            cash_amount: Some(summary.cash_amount),
            card_amount: Some(summary.card_amount),
            balance: Some(summary.balance),
            details: cart
                .items()
                .iter()
                .map(|line| ReceiptLineInput {
                    item_name: Some(line.name.clone()),
                    qty: Some(f64::from(line.quantity)),
                    unit_price: Some(line.unit_price),
                })
                .collect(),
            write_only: false,
        }
    }
}

/// The canonical bill record written to the JSON artifact. Field names are
/// the fixed schema the render helper parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillJson {
    #[serde(rename = "BillID")]
    pub bill_id: String,
    pub date: String,
    #[serde(rename = "CashierID")]
    pub cashier_id: String,
    #[serde(rename = "CustomerName")]
    pub customer_name: String,
    #[serde(rename = "CustomerFName")]
    pub customer_fname: String,
    #[serde(rename = "CustomerLName")]
    pub customer_lname: String,
    #[serde(rename = "Total")]
    pub total: f64,
    #[serde(rename = "Discount")]
    pub discount: f64,
    #[serde(rename = "CashAmount")]
    pub cash_amount: f64,
    #[serde(rename = "CardAmount")]
    pub card_amount: f64,
    #[serde(rename = "Balance")]
    pub balance: f64,
    #[serde(rename = "Details")]
    pub details: Vec<BillJsonLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillJsonLine {
    #[serde(rename = "ItemName")]
    pub item_name: String,
    #[serde(rename = "QTY")]
    pub qty: u32,
    #[serde(rename = "UnitPrice")]
    pub unit_price: f64,
}

/// Apply the artifact defaults: unknown names, quantity 1, zero amounts,
/// and a generated `INV-<year>-<millis>` id when none was supplied.
fn normalize(input: &ReceiptInput, now: DateTime<Local>) -> BillJson {
    let bill_id = input
        .bill_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("INV-{}-{}", now.year(), now.timestamp_millis()));

    BillJson {
        bill_id,
        date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        cashier_id: input.cashier_id.clone().unwrap_or_else(|| "1".to_string()),
        customer_name: input
            .customer_name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        customer_fname: input.customer_fname.clone().unwrap_or_default(),
        customer_lname: input.customer_lname.clone().unwrap_or_default(),
        total: input.total.unwrap_or(0.0),
        discount: input.discount.unwrap_or(0.0),
        cash_amount: input.cash_amount.unwrap_or(0.0),
        card_amount: input.card_amount.unwrap_or(0.0),
        balance: input.balance.unwrap_or(0.0),
        details: input
            .details
            .iter()
            .map(|line| BillJsonLine {
                item_name: line
                    .item_name
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                qty: line
                    .qty
                    .filter(|q| q.is_finite() && *q >= 1.0)
                    .map(|q| q.round() as u32)
                    .unwrap_or(1),
                unit_price: line.unit_price.unwrap_or(0.0),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Bill-update notifications
// ---------------------------------------------------------------------------

/// Whether a write-only save represents a settled bill or an in-progress one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStage {
    Interim,
    Final,
}

/// Event emitted after each write-only save, for any observer (status
/// display, dashboard tile) to consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillUpdate {
    #[serde(rename = "BillID")]
    pub bill_id: String,
    #[serde(rename = "Balance")]
    pub balance: f64,
    #[serde(rename = "writeStage")]
    pub stage: WriteStage,
}

// ---------------------------------------------------------------------------
// Helper invocation
// ---------------------------------------------------------------------------

/// The external render helper: a direct executable, optionally backed by a
/// list of interpreters to try when the file itself cannot be spawned
/// (script helpers on hosts without the .py association, for instance).
#[derive(Debug, Clone)]
pub struct HelperSpec {
    pub path: PathBuf,
    pub interpreters: Vec<String>,
}

impl HelperSpec {
    /// A helper that is invoked directly.
    pub fn executable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interpreters: Vec::new(),
        }
    }

    /// A script helper with interpreter fallbacks, tried in order.
    pub fn script(path: impl Into<PathBuf>, interpreters: Vec<String>) -> Self {
        Self {
            path: path.into(),
            interpreters,
        }
    }

    /// Ordered candidate commands: the helper itself first, then each
    /// interpreter wrapping it.
    fn candidates(&self, json_path: &std::path::Path) -> Vec<HelperCommand> {
        let mut commands = vec![HelperCommand {
            program: self.path.clone().into_os_string(),
            args: vec![json_path.as_os_str().to_os_string()],
            label: self.path.display().to_string(),
        }];
        for interpreter in &self.interpreters {
            commands.push(HelperCommand {
                program: OsString::from(interpreter),
                args: vec![
                    self.path.as_os_str().to_os_string(),
                    json_path.as_os_str().to_os_string(),
                ],
                label: format!("{interpreter} {}", self.path.display()),
            });
        }
        commands
    }
}

#[derive(Debug)]
struct HelperCommand {
    program: OsString,
    args: Vec<OsString>,
    label: String,
}

#[derive(Debug, Error)]
enum HelperError {
    #[error("timed out after {0} seconds")]
    TimedOut(u64),
    #[error("no runnable helper command ({0})")]
    Exhausted(String),
}

/// One helper process that actually ran to completion.
#[derive(Debug)]
struct HelperRun {
    label: String,
    exit_ok: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Try each candidate command in order. A command that cannot be spawned
/// falls through to the next one; a command that runs is the result, pass
/// or fail. All candidates unspawnable reports every attempt.
async fn invoke_helper(
    spec: &HelperSpec,
    json_path: &std::path::Path,
    cwd: &std::path::Path,
    timeout: Duration,
) -> Result<HelperRun, HelperError> {
    let mut attempts: Vec<String> = Vec::new();

    for candidate in spec.candidates(json_path) {
        let mut command = Command::new(&candidate.program);
        command
            .args(&candidate.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %candidate.label, error = %e, "Helper command failed to start, trying next");
                attempts.push(format!("{}: {e}", candidate.label));
                continue;
            }
        };

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(command = %candidate.label, error = %e, "Helper command could not be awaited");
                attempts.push(format!("{}: {e}", candidate.label));
                continue;
            }
            Err(_) => return Err(HelperError::TimedOut(timeout.as_secs())),
        };

        return Ok(HelperRun {
            label: candidate.label,
            exit_ok: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Err(HelperError::Exhausted(attempts.join("; ")))
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Structured result of one print attempt. `success` tracks the durable
/// JSON record; `printed` tracks the rendered PDF.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOutcome {
    pub success: bool,
    pub printed: bool,
    pub bill_snapshot: BillJson,
    pub json_artifact_path: PathBuf,
    pub pdf_artifact_path: Option<PathBuf>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub message: Option<String>,
    pub write_success: Option<bool>,
    pub written_mtime: Option<String>,
}

/// Hands bill snapshots to the out-of-process render helper.
#[derive(Debug)]
pub struct PrintBridge {
    paths: PrintPaths,
    helper: HelperSpec,
    timeout: Duration,
    updates: broadcast::Sender<BillUpdate>,
}

impl PrintBridge {
    pub fn new(paths: PrintPaths, helper: HelperSpec) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            paths,
            helper,
            timeout: HELPER_TIMEOUT,
            updates,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Listen for write-only save notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BillUpdate> {
        self.updates.subscribe()
    }

    /// Run one print attempt for the given snapshot.
    pub async fn print_receipt(&self, input: &ReceiptInput) -> PrintOutcome {
        let bill = normalize(input, Local::now());
        let mut outcome = PrintOutcome {
            success: true,
            printed: false,
            bill_snapshot: bill,
            json_artifact_path: self.paths.json_path.clone(),
            pdf_artifact_path: None,
            stdout: None,
            stderr: None,
            message: None,
            write_success: None,
            written_mtime: None,
        };

        if input.write_only {
            self.write_artifact(&mut outcome).await;
            self.notify_observers(&outcome.bill_snapshot);
            return outcome;
        }

        self.render(&mut outcome).await;
        outcome
    }

    /// Write-only flow: persist the JSON record, report the write result
    /// and the artifact's modification time.
    async fn write_artifact(&self, outcome: &mut PrintOutcome) {
        if let Err(e) = tokio::fs::create_dir_all(&self.paths.dir).await {
            error!(dir = %self.paths.dir.display(), error = %e, "Failed to create printing folder");
            outcome.success = false;
            outcome.write_success = Some(false);
            outcome.message = Some(format!("Failed to write bill record: {e}"));
            return;
        }

        let body = match serde_json::to_string_pretty(&outcome.bill_snapshot) {
            Ok(body) => body,
            Err(e) => {
                outcome.success = false;
                outcome.write_success = Some(false);
                outcome.message = Some(format!("Failed to encode bill record: {e}"));
                return;
            }
        };

        match tokio::fs::write(&self.paths.json_path, body).await {
            Ok(()) => {
                outcome.write_success = Some(true);
                outcome.written_mtime = artifact_mtime(&self.paths.json_path).await;
                info!(path = %self.paths.json_path.display(), bill_id = %outcome.bill_snapshot.bill_id, "Bill record updated");
            }
            Err(e) => {
                error!(path = %self.paths.json_path.display(), error = %e, "Failed to write bill record");
                outcome.success = false;
                outcome.write_success = Some(false);
                outcome.message = Some(format!("Failed to write bill record: {e}"));
            }
        }
    }

    /// Best-effort bill-update notification; an empty audience is logged,
    /// never surfaced.
    fn notify_observers(&self, bill: &BillJson) {
        let stage = if bill.balance != 0.0 {
            WriteStage::Final
        } else {
            WriteStage::Interim
        };
        let update = BillUpdate {
            bill_id: bill.bill_id.clone(),
            balance: bill.balance,
            stage,
        };
        if self.updates.send(update).is_err() {
            debug!("No observers for bill update");
        }
    }

    /// Render flow: hand the existing JSON artifact to the helper and check
    /// for the PDF. The artifact is NOT rewritten here; only a prior
    /// write-only (or save) call produces it.
    async fn render(&self, outcome: &mut PrintOutcome) {
        if !self.helper.path.exists() {
            let message = format!("Print helper not found at {}", self.helper.path.display());
            warn!("{message}");
            outcome.message = Some(message);
            return;
        }

        if !self.paths.logo_path.exists() {
            warn!(path = %self.paths.logo_path.display(), "Logo not found, continuing without it");
        }

        info!(
            helper = %self.helper.path.display(),
            artifact = %self.paths.json_path.display(),
            "Invoking print helper"
        );

        let run = match invoke_helper(
            &self.helper,
            &self.paths.json_path,
            &self.paths.dir,
            self.timeout,
        )
        .await
        {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "Print helper invocation failed");
                outcome.message = Some(format!("Print helper failed: {e}"));
                return;
            }
        };

        if !run.stdout.is_empty() {
            outcome.stdout = Some(run.stdout.clone());
        }
        if !run.stderr.is_empty() {
            outcome.stderr = Some(run.stderr.clone());
        }

        if !run.exit_ok {
            let code = run
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "terminated".to_string());
            warn!(command = %run.label, code = %code, "Print helper exited with an error");
            outcome.message = Some(format!("Print helper failed with exit status {code}"));
            return;
        }

        if self.paths.pdf_path.exists() {
            outcome.printed = true;
            outcome.pdf_artifact_path = Some(self.paths.pdf_path.clone());
            info!(pdf = %self.paths.pdf_path.display(), "Receipt rendered");
        } else {
            outcome.message = Some("Print helper completed but the PDF was not created".to_string());
            warn!("Print helper completed but the PDF was not created");
        }
    }
}

async fn artifact_mtime(path: &std::path::Path) -> Option<String> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    let modified = metadata.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CustomerRef, ItemCandidate};
    use tempfile::TempDir;

    fn bridge_in(dir: &TempDir, helper: HelperSpec) -> PrintBridge {
        PrintBridge::new(PrintPaths::in_dir(dir.path()), helper)
            .with_timeout(Duration::from_secs(10))
    }

    fn missing_helper(dir: &TempDir) -> HelperSpec {
        HelperSpec::executable(dir.path().join("print.exe"))
    }

    #[cfg(unix)]
    fn script_helper(dir: &TempDir, body: &str, executable: bool) -> HelperSpec {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("render.sh");
        std::fs::write(&path, body).expect("write helper script");
        let mode = if executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .expect("set helper permissions");
        HelperSpec::executable(path)
    }

    #[test]
    fn normalize_applies_artifact_defaults() {
        let now = Local::now();
        let bill = normalize(&ReceiptInput::default(), now);

        assert!(bill.bill_id.starts_with(&format!("INV-{}-", now.year())));
        assert_eq!(bill.cashier_id, "1");
        assert_eq!(bill.customer_name, "Unknown");
        assert_eq!(bill.total, 0.0);
        assert_eq!(bill.date.len(), 19);

        let sparse = ReceiptInput {
            details: vec![ReceiptLineInput::default()],
            ..ReceiptInput::default()
        };
        let bill = normalize(&sparse, now);
        assert_eq!(bill.details[0].item_name, "Unknown");
        assert_eq!(bill.details[0].qty, 1);
        assert_eq!(bill.details[0].unit_price, 0.0);
    }

    #[test]
    fn artifact_uses_the_fixed_field_names() {
        let input = ReceiptInput {
            bill_id: Some("77".into()),
            total: Some(180.0),
            details: vec![ReceiptLineInput {
                item_name: Some("Madol Doova".into()),
                qty: Some(2.0),
                unit_price: Some(100.0),
            }],
            ..ReceiptInput::default()
        };
        let value = serde_json::to_value(normalize(&input, Local::now())).expect("serialize");

        assert_eq!(value["BillID"], "77");
        assert_eq!(value["Total"], 180.0);
        assert!(value.get("date").is_some());
        assert_eq!(value["Details"][0]["ItemName"], "Madol Doova");
        assert_eq!(value["Details"][0]["QTY"], 2);
        assert_eq!(value["Details"][0]["UnitPrice"], 100.0);
    }

    #[test]
    fn from_sale_snapshots_cart_and_summary() {
        let mut cart = Cart::new();
        cart.add_item(&ItemCandidate {
            inventory_id: 1,
            name: "Atlas".into(),
            unit_price: 90.0,
        });
        cart.set_customer(Some(CustomerRef {
            id: 5,
            first_name: "Amara".into(),
            last_name: "Silva".into(),
        }));

        let summary = CheckoutSummary {
            bill_id: 31,
            balance: 10.0,
            subtotal: 90.0,
            total_discount: 0.0,
            total: 90.0,
            cash_amount: 100.0,
            card_amount: 0.0,
            message: None,
        };

        let input = ReceiptInput::from_sale(&cart, &summary, Some(4));
        assert_eq!(input.bill_id.as_deref(), Some("31"));
        assert_eq!(input.cashier_id.as_deref(), Some("4"));
        assert_eq!(input.customer_name.as_deref(), Some("Amara Silva"));
        assert_eq!(input.balance, Some(10.0));
        assert_eq!(input.details.len(), 1);
        assert_eq!(input.details[0].unit_price, Some(90.0));
        assert!(!input.write_only);
    }

    #[tokio::test]
    async fn write_only_persists_artifact_and_notifies_interim() {
        let dir = TempDir::new().expect("tempdir");
        let bridge = bridge_in(&dir, missing_helper(&dir));
        let mut updates = bridge.subscribe();

        let input = ReceiptInput {
            bill_id: Some("X1".into()),
            balance: Some(0.0),
            write_only: true,
            ..ReceiptInput::default()
        };
        let outcome = bridge.print_receipt(&input).await;

        assert!(outcome.success);
        assert!(!outcome.printed);
        assert_eq!(outcome.write_success, Some(true));
        assert!(outcome.written_mtime.is_some());

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&outcome.json_artifact_path).expect("read artifact"),
        )
        .expect("parse artifact");
        assert_eq!(written["BillID"], "X1");
        assert_eq!(written["CustomerName"], "Unknown");

        let update = updates.try_recv().expect("bill update event");
        assert_eq!(update.bill_id, "X1");
        assert_eq!(update.stage, WriteStage::Interim);
    }

    #[tokio::test]
    async fn write_only_with_nonzero_balance_notifies_final() {
        let dir = TempDir::new().expect("tempdir");
        let bridge = bridge_in(&dir, missing_helper(&dir));
        let mut updates = bridge.subscribe();

        let input = ReceiptInput {
            bill_id: Some("X2".into()),
            balance: Some(50.0),
            write_only: true,
            ..ReceiptInput::default()
        };
        bridge.print_receipt(&input).await;

        let update = updates.try_recv().expect("bill update event");
        assert_eq!(update.balance, 50.0);
        assert_eq!(update.stage, WriteStage::Final);
    }

    #[tokio::test]
    async fn render_without_helper_reports_not_found_and_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let bridge = bridge_in(&dir, missing_helper(&dir));

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.success);
        assert!(!outcome.printed);
        assert!(outcome
            .message
            .as_deref()
            .is_some_and(|m| m.contains("not found")));
        // Render mode never writes the JSON artifact
        assert!(!outcome.json_artifact_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn render_reports_printed_when_pdf_appears() {
        let dir = TempDir::new().expect("tempdir");
        let helper = script_helper(&dir, "#!/bin/sh\ntouch last_python_bill.pdf\n", true);
        let bridge = bridge_in(&dir, helper);

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.success);
        assert!(outcome.printed);
        assert_eq!(
            outcome.pdf_artifact_path.as_deref(),
            Some(dir.path().join("last_python_bill.pdf").as_path())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_without_pdf_is_a_distinct_warning() {
        let dir = TempDir::new().expect("tempdir");
        let helper = script_helper(&dir, "#!/bin/sh\nexit 0\n", true);
        let bridge = bridge_in(&dir, helper);

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.success);
        assert!(!outcome.printed);
        assert!(outcome
            .message
            .as_deref()
            .is_some_and(|m| m.contains("PDF was not created")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn helper_error_exit_captures_stderr() {
        let dir = TempDir::new().expect("tempdir");
        let helper = script_helper(&dir, "#!/bin/sh\necho boom >&2\nexit 3\n", true);
        let bridge = bridge_in(&dir, helper);

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.success);
        assert!(!outcome.printed);
        assert!(outcome
            .message
            .as_deref()
            .is_some_and(|m| m.contains("exit status 3")));
        assert_eq!(outcome.stderr.as_deref(), Some("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unspawnable_helper_falls_back_to_interpreter() {
        let dir = TempDir::new().expect("tempdir");
        // Not executable: the direct spawn fails, `sh` picks it up.
        let mut helper = script_helper(&dir, "touch last_python_bill.pdf\n", false);
        helper.interpreters = vec!["sh".to_string()];
        let bridge = bridge_in(&dir, helper);

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.printed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn all_candidates_unspawnable_reports_every_attempt() {
        let dir = TempDir::new().expect("tempdir");
        let mut helper = script_helper(&dir, "touch last_python_bill.pdf\n", false);
        helper.interpreters = vec!["definitely-not-an-interpreter".to_string()];
        let bridge = bridge_in(&dir, helper);

        let outcome = bridge.print_receipt(&ReceiptInput::default()).await;

        assert!(outcome.success);
        assert!(!outcome.printed);
        let message = outcome.message.expect("exhausted message");
        assert!(message.contains("no runnable helper command"));
        assert!(message.contains("definitely-not-an-interpreter"));
    }
}
