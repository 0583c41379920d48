//! In-memory cart for the billing page.
//!
//! Pure data structure, no I/O. Holds the working set of line items while
//! the cashier builds a sale; every aggregate is recomputed from the current
//! lines on each call. Quantity and discount edits clamp out-of-range input
//! instead of failing.

use serde::{Deserialize, Serialize};

/// Round a currency amount to 2 decimal places.
pub(crate) fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Discounts
// ---------------------------------------------------------------------------

/// Per-line discount.
///
/// The UI edits a percentage, but the backend stores (and a resumed held
/// bill returns) an absolute currency amount. Both shapes are kept as-is and
/// only resolved to money against a concrete line subtotal; converting a
/// stored amount back into a percentage would reinterpret it on every
/// quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Discount {
    /// UI-entered percentage, clamped to 0..=100.
    Percent(f64),
    /// Absolute currency amount from the backend, capped at the line subtotal.
    Amount(f64),
}

impl Discount {
    pub fn none() -> Self {
        Discount::Percent(0.0)
    }

    /// Percentage clamped to `[0, 100]`; non-finite input coerces to 0.
    pub fn percent(value: f64) -> Self {
        if value.is_finite() {
            Discount::Percent(value.clamp(0.0, 100.0))
        } else {
            Discount::Percent(0.0)
        }
    }

    /// Absolute amount, floored at 0; non-finite input coerces to 0.
    pub fn amount(value: f64) -> Self {
        if value.is_finite() {
            Discount::Amount(value.max(0.0))
        } else {
            Discount::Amount(0.0)
        }
    }

    /// Money value of this discount against a line subtotal, capped at the
    /// subtotal so a line can never go negative.
    pub fn amount_for(&self, line_subtotal: f64) -> f64 {
        let raw = match self {
            Discount::Percent(p) => line_subtotal * p / 100.0,
            Discount::Amount(a) => a.min(line_subtotal),
        };
        round2(raw.max(0.0))
    }
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// Inventory record normalized into a cart candidate by the lookup layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCandidate {
    pub inventory_id: i64,
    pub name: String,
    pub unit_price: f64,
}

/// One inventory entry in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub inventory_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub discount: Discount,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        round2(self.unit_price * f64::from(self.quantity))
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount.amount_for(self.subtotal())
    }

    pub fn total(&self) -> f64 {
        round2(self.subtotal() - self.discount_amount())
    }
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

/// Customer attached to the sale, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl CustomerRef {
    /// Display name for receipts; anonymous sales print as "Unknown".
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let trimmed = full.trim();
        if trimmed.is_empty() {
            "Unknown".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// The working set of line items for one in-progress sale.
///
/// Lines keep insertion order. A cart binds to at most one open bill id at a
/// time; completing or cancelling that bill clears the binding.
#[derive(Debug, Default)]
pub struct Cart {
    items: Vec<LineItem>,
    customer: Option<CustomerRef>,
    current_bill_id: Option<i64>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selected item. Re-adding an id already in the cart increments
    /// that line's quantity by one and ignores the candidate's other fields.
    pub fn add_item(&mut self, candidate: &ItemCandidate) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.inventory_id == candidate.inventory_id)
        {
            existing.quantity += 1;
            return;
        }
        self.items.push(LineItem {
            inventory_id: candidate.inventory_id,
            name: candidate.name.clone(),
            unit_price: candidate.unit_price.max(0.0),
            quantity: 1,
            discount: Discount::none(),
        });
    }

    /// Append a line restored from a held bill, keeping its stored quantity
    /// and absolute discount. A repeated id merges into the existing line so
    /// the one-line-per-item invariant holds for restored carts too.
    pub fn restore_line(&mut self, line: LineItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|l| l.inventory_id == line.inventory_id)
        {
            existing.quantity += line.quantity.max(1);
            if let (Discount::Amount(a), Discount::Amount(b)) = (existing.discount, line.discount) {
                existing.discount = Discount::Amount(a + b);
            }
            return;
        }
        self.items.push(LineItem {
            quantity: line.quantity.max(1),
            unit_price: line.unit_price.max(0.0),
            ..line
        });
    }

    /// Remove a line entirely. Silently ignores an unknown id.
    pub fn remove_item(&mut self, inventory_id: i64) {
        self.items.retain(|line| line.inventory_id != inventory_id);
    }

    /// Set a line's quantity, clamped to a minimum of 1. Unknown ids are
    /// ignored.
    pub fn update_quantity(&mut self, inventory_id: i64, quantity: i64) {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.inventory_id == inventory_id)
        {
            line.quantity = quantity.max(1) as u32;
        }
    }

    /// Set a line's discount percentage, clamped to `[0, 100]`. Unknown ids
    /// are ignored.
    pub fn update_discount(&mut self, inventory_id: i64, percent: f64) {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.inventory_id == inventory_id)
        {
            line.discount = Discount::percent(percent);
        }
    }

    /// Reset for a new sale: drop all lines, the customer, and any bound
    /// bill id.
    pub fn clear(&mut self) {
        self.items.clear();
        self.customer = None;
        self.current_bill_id = None;
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn customer(&self) -> Option<&CustomerRef> {
        self.customer.as_ref()
    }

    pub fn set_customer(&mut self, customer: Option<CustomerRef>) {
        self.customer = customer;
    }

    pub fn current_bill_id(&self) -> Option<i64> {
        self.current_bill_id
    }

    pub fn bind_bill(&mut self, bill_id: i64) {
        self.current_bill_id = Some(bill_id);
    }

    pub fn unbind_bill(&mut self) {
        self.current_bill_id = None;
    }

    // -- aggregates, recomputed fresh on every call --

    pub fn subtotal(&self) -> f64 {
        round2(self.items.iter().map(LineItem::subtotal).sum())
    }

    pub fn total_discount(&self) -> f64 {
        round2(self.items.iter().map(LineItem::discount_amount).sum())
    }

    pub fn net_total(&self) -> f64 {
        round2((self.subtotal() - self.total_discount()).max(0.0))
    }

    /// Total units in the cart (sum of quantities, not distinct lines).
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, price: f64) -> ItemCandidate {
        ItemCandidate {
            inventory_id: id,
            name: format!("Item {id}"),
            unit_price: price,
        }
    }

    #[test]
    fn re_adding_same_item_increments_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(7, 250.0));
        cart.add_item(&candidate(7, 999.0)); // other fields ignored

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[0].unit_price, 250.0);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn quantity_clamps_to_minimum_one() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(1, 50.0));

        cart.update_quantity(1, 0);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(1, -5);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(1, 4);
        assert_eq!(cart.items()[0].quantity, 4);

        // Unknown id is a no-op, not an error
        cart.update_quantity(99, 3);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn discount_percent_clamps_to_0_100() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(1, 100.0));

        cart.update_discount(1, 150.0);
        assert_eq!(cart.items()[0].discount, Discount::Percent(100.0));

        cart.update_discount(1, -10.0);
        assert_eq!(cart.items()[0].discount, Discount::Percent(0.0));

        cart.update_discount(1, f64::NAN);
        assert_eq!(cart.items()[0].discount, Discount::Percent(0.0));
    }

    #[test]
    fn aggregates_match_per_line_sums() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(1, 100.0));
        cart.add_item(&candidate(1, 100.0)); // qty 2
        cart.update_discount(1, 10.0);

        assert_eq!(cart.subtotal(), 200.0);
        assert_eq!(cart.total_discount(), 20.0);
        assert_eq!(cart.net_total(), 180.0);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn aggregates_recompute_after_every_edit() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(1, 40.0));
        cart.add_item(&candidate(2, 10.0));
        cart.update_quantity(2, 3);
        cart.update_discount(2, 50.0);

        let expected_subtotal = 40.0 + 10.0 * 3.0;
        let expected_discount = 30.0 * 0.5;
        assert_eq!(cart.subtotal(), expected_subtotal);
        assert_eq!(cart.total_discount(), expected_discount);

        cart.remove_item(1);
        assert_eq!(cart.subtotal(), 30.0);
        assert_eq!(cart.total_discount(), 15.0);
        assert_eq!(cart.net_total(), 15.0);

        // Getters are pure: calling twice gives the same answer
        assert_eq!(cart.net_total(), cart.net_total());
    }

    #[test]
    fn absolute_discount_is_capped_at_line_subtotal() {
        let line = LineItem {
            inventory_id: 3,
            name: "Atlas".into(),
            unit_price: 20.0,
            quantity: 2,
            discount: Discount::amount(75.0),
        };
        assert_eq!(line.subtotal(), 40.0);
        assert_eq!(line.discount_amount(), 40.0);
        assert_eq!(line.total(), 0.0);
    }

    #[test]
    fn clear_resets_customer_and_bill_binding() {
        let mut cart = Cart::new();
        cart.add_item(&candidate(1, 5.0));
        cart.set_customer(Some(CustomerRef {
            id: 2,
            first_name: "Amara".into(),
            last_name: "Silva".into(),
        }));
        cart.bind_bill(31);

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.customer().is_none());
        assert_eq!(cart.current_bill_id(), None);
        assert_eq!(cart.subtotal(), 0.0);
    }

    #[test]
    fn customer_display_name_defaults_to_unknown() {
        assert_eq!(CustomerRef::default().display_name(), "Unknown");
        let customer = CustomerRef {
            id: 9,
            first_name: "Amara".into(),
            last_name: "".into(),
        };
        assert_eq!(customer.display_name(), "Amara");
    }

    #[test]
    fn net_total_never_goes_negative() {
        let mut cart = Cart::new();
        cart.restore_line(LineItem {
            inventory_id: 1,
            name: "Ledger".into(),
            unit_price: 10.0,
            quantity: 1,
            discount: Discount::amount(500.0),
        });
        assert_eq!(cart.net_total(), 0.0);
    }
}
