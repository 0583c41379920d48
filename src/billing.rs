//! Bill lifecycle controller.
//!
//! Sequences the remote calls that move a cart through the bill states:
//! create, attach details, complete payment, or hold as a temporary bill
//! and resume it later. Each step runs only after the previous one reported
//! `status=true`; failures surface the backend's message and are never
//! retried automatically (the operator re-triggers the action).
//!
//! The wire contract stores line discounts as absolute currency amounts
//! capped at the line subtotal, while the cart edits percentages; the
//! conversion happens exactly once, in [`detail_items`], and resumed bills
//! keep their absolute amounts (see `cart::Discount`).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::cart::{round2, Cart, CustomerRef, Discount, LineItem};

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreateBillPayload {
    #[serde(rename = "LocationID")]
    pub location_id: i64,
    #[serde(rename = "CustomerID")]
    pub customer_id: i64,
    #[serde(rename = "CashierID")]
    pub cashier_id: i64,
}

/// One line of the `/billing/details` call. `Discount` is the absolute
/// currency amount for the whole line, never a percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillItemPayload {
    #[serde(rename = "InventoryID")]
    pub inventory_id: i64,
    #[serde(rename = "Discount")]
    pub discount: f64,
    #[serde(rename = "QTY")]
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize)]
struct BillDetailsPayload {
    #[serde(rename = "BillID")]
    bill_id: i64,
    #[serde(rename = "Items")]
    items: Vec<BillItemPayload>,
}

#[derive(Debug, Clone, Serialize)]
struct CompleteBillPayload {
    #[serde(rename = "CashAmount")]
    cash_amount: f64,
    #[serde(rename = "CardAmount")]
    card_amount: f64,
}

/// Convert the cart's lines into the detail payload: quantity as-is,
/// discount resolved to an absolute amount capped at the line subtotal and
/// rounded to 2 decimal places.
pub fn detail_items(cart: &Cart) -> Vec<BillItemPayload> {
    cart.items()
        .iter()
        .map(|line| BillItemPayload {
            inventory_id: line.inventory_id,
            discount: round2(line.discount_amount()),
            qty: line.quantity,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stored bills (resume path)
// ---------------------------------------------------------------------------

/// A held bill as the backend returns it from `GET /billing/billing/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredBill {
    #[serde(rename = "BillID")]
    pub bill_id: i64,
    #[serde(rename = "CustomerID", default)]
    pub customer_id: Option<i64>,
    #[serde(rename = "LocationID", default)]
    pub location_id: Option<i64>,
    #[serde(rename = "Total", default)]
    pub total: f64,
    #[serde(rename = "Discount", default)]
    pub discount: f64,
    #[serde(rename = "Details", alias = "Items", default)]
    pub details: Vec<StoredBillLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredBillLine {
    #[serde(rename = "InventoryID")]
    pub inventory_id: i64,
    #[serde(rename = "ItemName", default)]
    pub item_name: Option<String>,
    #[serde(rename = "UnitPrice", default)]
    pub unit_price: f64,
    #[serde(rename = "Discount", default)]
    pub discount: f64,
    #[serde(rename = "QTY", alias = "Qty", default = "default_qty")]
    pub qty: u32,
}

fn default_qty() -> u32 {
    1
}

impl StoredBillLine {
    /// Re-express the stored line as a cart line. The stored unit price and
    /// absolute discount amount are authoritative; the discount stays an
    /// amount and is never reconverted to a percentage.
    pub fn into_line_item(self) -> LineItem {
        LineItem {
            inventory_id: self.inventory_id,
            name: self.item_name.unwrap_or_else(|| "Unknown".to_string()),
            unit_price: self.unit_price.max(0.0),
            quantity: self.qty.max(1),
            discount: Discount::amount(self.discount),
        }
    }
}

// ---------------------------------------------------------------------------
// Temporary bill listing
// ---------------------------------------------------------------------------

/// Summary row of a held bill from `GET /billing/tempbills/{locationId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TempBillSummary {
    #[serde(rename = "BillID")]
    pub bill_id: i64,
    #[serde(rename = "CustomerID", default)]
    pub customer_id: Option<i64>,
    #[serde(rename = "LocationID", default)]
    pub location_id: Option<i64>,
    #[serde(rename = "Total", default)]
    pub total: f64,
    #[serde(rename = "Discount", default)]
    pub discount: f64,
    #[serde(
        rename = "createdDateTime",
        alias = "CreatedDateTime",
        alias = "createdAt",
        alias = "CreatedAt",
        default
    )]
    pub created: Option<String>,
}

impl TempBillSummary {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_created(self.created.as_deref()?)
    }
}

/// Parse the backend's creation timestamp, which arrives either as RFC 3339
/// or as a bare `YYYY-MM-DD HH:MM:SS` string.
fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

/// Newest-first by creation time; ties (and unparseable timestamps) break by
/// descending bill id.
fn sort_newest_first(bills: &mut [TempBillSummary]) {
    bills.sort_by(|a, b| {
        (b.created_at(), b.bill_id).cmp(&(a.created_at(), a.bill_id))
    });
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Result of a completed checkout, carrying what the receipt needs.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub bill_id: i64,
    /// Change due to the customer, or the outstanding amount; the sign is
    /// displayed, not interpreted.
    pub balance: f64,
    pub subtotal: f64,
    pub total_discount: f64,
    pub total: f64,
    pub cash_amount: f64,
    pub card_amount: f64,
    pub message: Option<String>,
}

/// Orchestrates the remote billing calls for one cashier session.
#[derive(Debug, Clone)]
pub struct BillingController {
    api: ApiClient,
}

impl BillingController {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Create an empty bill; nothing can be attached until this succeeds.
    pub async fn create_bill(
        &self,
        location_id: i64,
        customer_id: i64,
        cashier_id: i64,
    ) -> Result<i64, String> {
        let payload = serde_json::to_value(CreateBillPayload {
            location_id,
            customer_id,
            cashier_id,
        })
        .map_err(|e| e.to_string())?;

        let resp = self
            .api
            .post("/billing/billing", &payload, true)
            .await?
            .require_status()?;

        let bill_id = resp
            .data_i64()
            .ok_or_else(|| "Billing backend did not return a bill id".to_string())?;
        info!(bill_id, location_id, "Bill created");
        Ok(bill_id)
    }

    /// Send the full current cart contents in one call.
    pub async fn attach_items(&self, bill_id: i64, cart: &Cart) -> Result<(), String> {
        let payload = serde_json::to_value(BillDetailsPayload {
            bill_id,
            items: detail_items(cart),
        })
        .map_err(|e| e.to_string())?;

        self.api
            .post("/billing/details", &payload, true)
            .await?
            .require_status()?;
        info!(bill_id, lines = cart.items().len(), "Bill details attached");
        Ok(())
    }

    /// Finalize payment. Returns the balance the backend computed.
    pub async fn complete_bill(
        &self,
        bill_id: i64,
        cash_amount: f64,
        card_amount: f64,
    ) -> Result<(f64, Option<String>), String> {
        let payload = serde_json::to_value(CompleteBillPayload {
            cash_amount,
            card_amount,
        })
        .map_err(|e| e.to_string())?;

        let resp = self
            .api
            .post(&format!("/billing/billing/complete/{bill_id}"), &payload, true)
            .await?
            .require_status()?;

        let balance = resp.data_f64().unwrap_or(0.0);
        info!(bill_id, balance, "Bill completed");
        Ok((balance, resp.message))
    }

    /// Full pay flow: create the bill, attach the cart, complete payment.
    /// On success the cart's bill binding is cleared; the lines are kept so
    /// the receipt can still be printed from them.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        cash_amount: f64,
        card_amount: f64,
    ) -> Result<CheckoutSummary, String> {
        if cart.is_empty() {
            return Err("No items in cart".to_string());
        }

        let (location_id, cashier_id) = {
            let session = self.api.session().lock().map_err(|e| e.to_string())?;
            let location_id = session
                .location_id()
                .ok_or_else(|| "No active location for this session".to_string())?;
            (location_id, session.cashier_id().unwrap_or(1))
        };
        let customer_id = cart.customer().map(|c| c.id).unwrap_or(1);

        let bill_id = self
            .create_bill(location_id, customer_id, cashier_id)
            .await?;
        cart.bind_bill(bill_id);

        self.attach_items(bill_id, cart).await?;
        let (balance, message) = self
            .complete_bill(bill_id, cash_amount, card_amount)
            .await?;

        let summary = CheckoutSummary {
            bill_id,
            balance,
            subtotal: cart.subtotal(),
            total_discount: cart.total_discount(),
            total: cart.net_total(),
            cash_amount,
            card_amount,
            message,
        };
        cart.unbind_bill();
        Ok(summary)
    }

    /// Park the cart as a temporary bill: create + attach, no completion.
    /// The cart keeps its lines so the cashier can continue or start fresh.
    pub async fn hold_as_temporary(&self, cart: &mut Cart) -> Result<i64, String> {
        if cart.is_empty() {
            return Err("No items in cart to hold".to_string());
        }

        let (location_id, cashier_id) = {
            let session = self.api.session().lock().map_err(|e| e.to_string())?;
            let location_id = session
                .location_id()
                .ok_or_else(|| "No active location for this session".to_string())?;
            (location_id, session.cashier_id().unwrap_or(1))
        };
        let customer_id = cart.customer().map(|c| c.id).unwrap_or(1);

        let bill_id = self
            .create_bill(location_id, customer_id, cashier_id)
            .await?;
        cart.bind_bill(bill_id);

        self.attach_items(bill_id, cart).await?;
        info!(bill_id, "Bill held as temporary");
        Ok(bill_id)
    }

    /// Load a held bill and repopulate the cart from its stored lines,
    /// discarding whatever was in progress.
    pub async fn resume_temporary(&self, cart: &mut Cart, bill_id: i64) -> Result<(), String> {
        let resp = self
            .api
            .get(&format!("/billing/billing/{bill_id}"), true)
            .await?
            .require_status()?;

        let data = resp
            .data
            .ok_or_else(|| format!("Billing backend returned no data for bill {bill_id}"))?;
        let stored: StoredBill = serde_json::from_value(data)
            .map_err(|e| format!("Unexpected bill record shape: {e}"))?;

        cart.clear();
        if let Some(customer_id) = stored.customer_id {
            cart.set_customer(Some(CustomerRef {
                id: customer_id,
                ..CustomerRef::default()
            }));
        }
        for line in stored.details {
            cart.restore_line(line.into_line_item());
        }
        cart.bind_bill(bill_id);
        info!(bill_id, lines = cart.items().len(), "Temporary bill resumed");
        Ok(())
    }

    /// Cancel a held bill. If it is the one bound to this cart, the cart is
    /// cleared as well.
    pub async fn cancel(&self, cart: &mut Cart, bill_id: i64) -> Result<(), String> {
        self.api
            .delete(&format!("/billing/billing/cancel/{bill_id}"), true)
            .await?
            .require_status()?;

        if cart.current_bill_id() == Some(bill_id) {
            cart.clear();
        }
        info!(bill_id, "Bill cancelled");
        Ok(())
    }

    /// All held bills for a location, newest first.
    pub async fn list_temporary(&self, location_id: i64) -> Result<Vec<TempBillSummary>, String> {
        let resp = self
            .api
            .get(&format!("/billing/tempbills/{location_id}"), true)
            .await?
            .require_status()?;

        let data = resp.data.unwrap_or(Value::Array(vec![]));
        let mut bills: Vec<TempBillSummary> = serde_json::from_value(data)
            .map_err(|e| format!("Unexpected temporary bill list shape: {e}"))?;

        sort_newest_first(&mut bills);
        if bills.is_empty() {
            warn!(location_id, "No temporary bills found");
        }
        Ok(bills)
    }
}
