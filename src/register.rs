//! Cash-register session operations.
//!
//! Device registration, open/close state checks, opening and closing
//! amounts, and cash in/out movements. The ledger itself lives on the
//! backend; this module only drives the session around the billing
//! workflow. The till is identified by the persisted [`DeviceIdentity`]
//! rather than an ambient machine-id lookup.
//!
//! [`DeviceIdentity`]: crate::config::DeviceIdentity

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::ApiClient;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// A registered till as the backend knows it.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInfo {
    #[serde(rename = "RegisterID", default)]
    pub register_id: Option<i64>,
    #[serde(rename = "RegisterName", default)]
    pub register_name: Option<String>,
    #[serde(rename = "LocationID", default)]
    pub location_id: Option<i64>,
    #[serde(rename = "DeviceID", default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct CreateRegisterPayload<'a> {
    #[serde(rename = "LocationID")]
    location_id: i64,
    #[serde(rename = "RegisterName")]
    register_name: &'a str,
    #[serde(rename = "DeviceID")]
    device_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct OpeningAmountPayload<'a> {
    #[serde(rename = "DeviceID")]
    device_id: &'a str,
    #[serde(rename = "OpeningAmount")]
    opening_amount: f64,
}

/// Denomination value -> note count, e.g. `{5000: 2, 100: 14}`.
pub type DenominationCounts = BTreeMap<u32, u32>;

#[derive(Debug, Clone, Serialize)]
struct ClosingAmountPayload<'a> {
    #[serde(rename = "DeviceID")]
    device_id: &'a str,
    #[serde(rename = "ClosingAmount")]
    closing_amount: f64,
    #[serde(rename = "notes")]
    notes: &'a DenominationCounts,
}

#[derive(Debug, Clone, Serialize)]
struct CashInOutPayload<'a> {
    #[serde(rename = "DeviceID")]
    device_id: &'a str,
    #[serde(rename = "Amount")]
    amount: f64,
    /// true = cash in, false = cash out.
    #[serde(rename = "Type")]
    cash_in: bool,
    #[serde(rename = "Reason")]
    reason: &'a str,
}

/// A location row from `/location/getAll`.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    #[serde(alias = "LocationID")]
    pub id: i64,
    #[serde(default, alias = "LocationName")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Whether this device is registered as a till. The backend reports unknown
/// devices as a logical failure, so that case maps to `None` rather than an
/// error.
pub async fn get_register(api: &ApiClient, device_id: &str) -> Result<Option<RegisterInfo>, String> {
    let resp = api
        .get(&format!("/cashregister/get/{device_id}"), true)
        .await?;

    if !resp.status {
        debug!(device_id, reason = %resp.error_text(), "Device not registered");
        return Ok(None);
    }
    match resp.data {
        Some(data) => {
            let info: RegisterInfo = serde_json::from_value(data)
                .map_err(|e| format!("Unexpected register record shape: {e}"))?;
            Ok(Some(info))
        }
        None => Ok(None),
    }
}

/// Register this device as a till at a location.
pub async fn create_register(
    api: &ApiClient,
    location_id: i64,
    register_name: &str,
    device_id: &str,
) -> Result<Option<i64>, String> {
    let payload = serde_json::to_value(CreateRegisterPayload {
        location_id,
        register_name,
        device_id,
    })
    .map_err(|e| e.to_string())?;

    let resp = api
        .post("/cashregister/create", &payload, true)
        .await?
        .require_status()?;
    info!(device_id, location_id, register_name, "Register created");
    Ok(resp.data_i64())
}

/// Whether the register currently has an open session.
pub async fn is_open(api: &ApiClient, device_id: &str) -> Result<bool, String> {
    let resp = api
        .get(&format!("/cashregister/isOpen/{device_id}"), true)
        .await?
        .require_status()?;
    resp.data_flag("isOpen")
        .ok_or_else(|| "Billing backend did not report the register state".to_string())
}

/// Whether the register's last session was closed out.
pub async fn is_closed(api: &ApiClient, device_id: &str) -> Result<bool, String> {
    let resp = api
        .get(&format!("/cashregister/isClosed/{device_id}"), false)
        .await?
        .require_status()?;
    resp.data_flag("isClosed")
        .ok_or_else(|| "Billing backend did not report the register state".to_string())
}

/// Open a register session with the counted float. Binds the returned
/// session id to the shared session context.
pub async fn open_session(
    api: &ApiClient,
    device_id: &str,
    opening_amount: f64,
) -> Result<i64, String> {
    let payload = serde_json::to_value(OpeningAmountPayload {
        device_id,
        opening_amount,
    })
    .map_err(|e| e.to_string())?;

    let resp = api
        .post("/cashregister/setOpeningAmount", &payload, true)
        .await?
        .require_status()?;
    let session_id = resp
        .data_i64()
        .ok_or_else(|| "Billing backend did not return a session id".to_string())?;

    {
        let mut session = api.session().lock().map_err(|e| e.to_string())?;
        session.register_session_id = Some(session_id);
    }
    info!(device_id, session_id, opening_amount, "Register session opened");
    Ok(session_id)
}

/// Close the register session with the counted drawer, broken down by
/// denomination. Unbinds the session id from the session context.
pub async fn close_session(
    api: &ApiClient,
    device_id: &str,
    closing_amount: f64,
    notes: &DenominationCounts,
) -> Result<(), String> {
    let payload = serde_json::to_value(ClosingAmountPayload {
        device_id,
        closing_amount,
        notes,
    })
    .map_err(|e| e.to_string())?;

    api.post("/cashregister/setClosingAmount", &payload, true)
        .await?
        .require_status()?;

    {
        let mut session = api.session().lock().map_err(|e| e.to_string())?;
        session.register_session_id = None;
    }
    info!(device_id, closing_amount, "Register session closed");
    Ok(())
}

/// Record a cash movement against the open session.
/// `cash_in` true adds to the drawer, false removes from it.
pub async fn cash_in_out(
    api: &ApiClient,
    device_id: &str,
    amount: f64,
    cash_in: bool,
    reason: &str,
) -> Result<Option<i64>, String> {
    let payload = serde_json::to_value(CashInOutPayload {
        device_id,
        amount,
        cash_in,
        reason,
    })
    .map_err(|e| e.to_string())?;

    let resp = api
        .post("/cashregister/cashInOut", &payload, true)
        .await?
        .require_status()?;
    info!(device_id, amount, cash_in, "Cash movement recorded");
    Ok(resp.data_i64())
}

/// All locations a register can be attached to.
pub async fn get_all_locations(api: &ApiClient) -> Result<Vec<LocationRecord>, String> {
    let resp = api.get("/location/getAll", true).await?.require_status()?;
    let data = resp.data.unwrap_or(Value::Array(vec![]));
    serde_json::from_value(data).map_err(|e| format!("Unexpected location list shape: {e}"))
}
