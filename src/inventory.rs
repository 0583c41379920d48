//! Inventory lookup feeding the billing page.
//!
//! Thin read-only client over the backend's inventory endpoints: barcode
//! lookup, name search, stock quantity, and the full per-location list.
//! Records are normalised into [`ItemCandidate`]s for `Cart::add_item`;
//! inventory management (create/edit/delete) is a separate concern and not
//! handled here.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::ApiClient;
use crate::cart::ItemCandidate;

/// Barcode-wedge scans shorter than this are noise and never sent upstream.
const MIN_BARCODE_LEN: usize = 5;

/// An inventory record as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cost_price: f64,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
}

impl InventoryItem {
    /// Normalise this record into a cart candidate.
    pub fn into_candidate(self) -> ItemCandidate {
        ItemCandidate {
            inventory_id: self.id,
            name: self.title,
            unit_price: self.price.max(0.0),
        }
    }
}

fn items_from(data: Option<Value>) -> Result<Vec<InventoryItem>, String> {
    let data = data.unwrap_or(Value::Array(vec![]));
    serde_json::from_value(data).map_err(|e| format!("Unexpected inventory record shape: {e}"))
}

/// Look up items by barcode. Short scans return an empty list without
/// touching the network.
pub async fn lookup_barcode(
    api: &ApiClient,
    barcode: &str,
    location_id: i64,
) -> Result<Vec<InventoryItem>, String> {
    let barcode = barcode.trim();
    if barcode.len() < MIN_BARCODE_LEN {
        debug!(barcode, "Ignoring short barcode scan");
        return Ok(vec![]);
    }

    let resp = api
        .get(&format!("/inventory/getItem/{barcode}/{location_id}"), false)
        .await?
        .require_status()?;
    items_from(resp.data)
}

/// Stock on hand for a barcode at a location.
pub async fn stock_quantity(
    api: &ApiClient,
    barcode: &str,
    location_id: i64,
) -> Result<i64, String> {
    let resp = api
        .get(
            &format!("/inventory/getItemQTY/{}/{location_id}", barcode.trim()),
            false,
        )
        .await?
        .require_status()?;
    resp.data_i64()
        .ok_or_else(|| "Billing backend did not return a quantity".to_string())
}

/// Search items by (partial) name at a location.
pub async fn search_by_name(
    api: &ApiClient,
    name: &str,
    location_id: i64,
) -> Result<Vec<InventoryItem>, String> {
    let resp = api
        .get(
            &format!("/inventory/searchByName/{}/{location_id}", name.trim()),
            true,
        )
        .await?
        .require_status()?;
    items_from(resp.data)
}

/// The full inventory list for a location.
pub async fn get_all(api: &ApiClient, location_id: i64) -> Result<Vec<InventoryItem>, String> {
    let resp = api
        .get(&format!("/inventory/getAll/{location_id}"), true)
        .await?
        .require_status()?;
    items_from(resp.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionContext;

    fn client() -> ApiClient {
        ApiClient::new(
            ApiConfig::new("http://127.0.0.1:9"),
            SessionContext::new().shared(),
        )
        .expect("client")
    }

    #[test]
    fn record_normalises_into_cart_candidate() {
        let item: InventoryItem = serde_json::from_str(
            r#"{"id": 12, "title": "Madol Doova", "price": 850.0, "cost_price": 600.0,
                "barcode": "9789550000000", "author": "Martin Wickramasinghe",
                "category": "Fiction", "location_id": 1}"#,
        )
        .expect("parse record");

        let candidate = item.into_candidate();
        assert_eq!(candidate.inventory_id, 12);
        assert_eq!(candidate.name, "Madol Doova");
        assert_eq!(candidate.unit_price, 850.0);
    }

    #[test]
    fn record_tolerates_sparse_fields() {
        let items = items_from(Some(serde_json::json!([{"id": 3}]))).expect("parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "");
        assert_eq!(items[0].price, 0.0);
        assert!(items[0].barcode.is_none());

        assert!(items_from(None).expect("parse none").is_empty());
    }

    #[tokio::test]
    async fn short_barcode_scan_is_dropped_without_a_request() {
        // The client points at a dead port; a network attempt would error.
        let api = client();
        let items = lookup_barcode(&api, "123", 1).await.expect("short scan");
        assert!(items.is_empty());
        let items = lookup_barcode(&api, "  42  ", 1).await.expect("short scan");
        assert!(items.is_empty());
    }
}
