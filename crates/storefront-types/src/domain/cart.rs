use serde::{Deserialize, Serialize};

/// Display data handed to the cart when a menu item is picked.
///
/// `price` is kept in whatever representation the caller shows to the
/// customer (`"Rp 10.000"`, `"10000"`, ...). It is normalized only when
/// totals are computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: String,
    pub quantity: u32,
}

impl CartLine {
    fn from_item(item: CartItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            image: item.image,
            quantity: 1,
        }
    }

    pub fn unit_price(&self) -> i64 {
        parse_price(&self.price)
    }

    pub fn line_total(&self) -> i64 {
        self.unit_price().saturating_mul(i64::from(self.quantity))
    }
}

/// Behaviour of `add_item` when the id is already in the cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReAddPolicy {
    /// Bump the quantity and keep the price, name and image captured on first add.
    #[default]
    KeepOriginal,
    /// Bump the quantity and overwrite price, name and image with the new values.
    RefreshDetails,
}

/// Strips every non-digit character and parses what is left.
///
/// `"Rp 10.000"` and `"10,000"` both yield `10000`. A representation with
/// no digits, or more than an `i64` holds, yields 0.
pub fn parse_price(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Formats an amount the way the storefront displays it, e.g. `Rp 80.000`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("Rp -{grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// The in-progress order of one browsing session.
///
/// Lines keep insertion order and are unique by id. A line never has a
/// quantity of zero; it is removed instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from a persisted snapshot.
    ///
    /// Zero-quantity lines are dropped and repeated ids are folded into the
    /// first occurrence, so a hand-edited snapshot cannot break the invariants.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.lines.iter_mut().find(|l| l.id == line.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn get(&self, id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds one unit of `item`; the id is the only identity key.
    pub fn add_item(&mut self, item: CartItem) {
        self.add_item_with(item, ReAddPolicy::KeepOriginal);
    }

    pub fn add_item_with(&mut self, item: CartItem, policy: ReAddPolicy) {
        match self.lines.iter_mut().find(|l| l.id == item.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(1);
                if policy == ReAddPolicy::RefreshDetails {
                    line.name = item.name;
                    line.price = item.price;
                    line.image = item.image;
                }
            }
            None => self.lines.push(CartLine::from_item(item)),
        }
    }

    /// Removes one unit of `id`. Returns false when the id is not in the cart.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.id == id) else {
            return false;
        };
        let line = &mut self.lines[pos];
        if line.quantity > 1 {
            line.quantity -= 1;
        } else {
            self.lines.remove(pos);
        }
        true
    }

    pub fn total(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.line_total()))
    }

    /// Sum of quantities, not the number of distinct lines.
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: &str) -> CartItem {
        CartItem {
            id: id.into(),
            name: format!("Food {id}"),
            price: price.into(),
            image: format!("/assets/{id}.svg"),
        }
    }

    #[test]
    fn adding_same_id_twice_merges_into_one_line() {
        let mut cart = Cart::new();
        cart.add_item(item("x", "Rp 10.000"));
        cart.add_item(item("x", "Rp 10.000"));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.total(), 20000);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn price_normalization_strips_symbols_and_separators() {
        assert_eq!(parse_price("Rp 10.000"), 10000);
        assert_eq!(parse_price("$1,250"), 1250);
        assert_eq!(parse_price("85000"), 85000);
        assert_eq!(parse_price("free"), 0);
        assert_eq!(parse_price(""), 0);
    }

    #[test]
    fn format_price_groups_thousands() {
        assert_eq!(format_price(80000), "Rp 80.000");
        assert_eq!(format_price(1234567), "Rp 1.234.567");
        assert_eq!(format_price(500), "Rp 500");
        assert_eq!(parse_price(&format_price(99999)), 99999);
    }

    #[test]
    fn re_add_keeps_original_details_by_default() {
        let mut cart = Cart::new();
        cart.add_item(item("x", "Rp 10.000"));
        let mut stale = item("x", "Rp 12.000");
        stale.name = "Renamed".into();
        cart.add_item(stale);

        let line = cart.get("x").unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.price, "Rp 10.000");
        assert_eq!(line.name, "Food x");
        assert_eq!(cart.total(), 20000);
    }

    #[test]
    fn refresh_policy_overwrites_details() {
        let mut cart = Cart::new();
        cart.add_item(item("x", "Rp 10.000"));
        cart.add_item_with(item("x", "Rp 12.000"), ReAddPolicy::RefreshDetails);

        let line = cart.get("x").unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.price, "Rp 12.000");
        assert_eq!(cart.total(), 24000);
    }

    #[test]
    fn remove_decrements_then_deletes() {
        let mut cart = Cart::new();
        cart.add_item(item("a", "100"));
        cart.add_item(item("a", "100"));
        assert!(cart.remove_item("a"));
        assert_eq!(cart.get("a").unwrap().quantity, 1);
        assert!(cart.remove_item("a"));
        assert!(cart.get("a").is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut cart = Cart::new();
        cart.add_item(item("a", "100"));
        let before = cart.clone();
        assert!(!cart.remove_item("missing"));
        assert_eq!(cart, before);
    }

    #[test]
    fn add_then_remove_restores_prior_state() {
        let mut cart = Cart::new();
        cart.add_item(item("a", "100"));
        cart.add_item(item("b", "250"));
        let before = cart.clone();

        cart.add_item(item("a", "999"));
        cart.remove_item("a");
        assert_eq!(cart, before);

        cart.add_item(item("c", "50"));
        cart.remove_item("c");
        assert_eq!(cart, before);
    }

    #[test]
    fn item_count_tracks_quantities_through_mixed_sequence() {
        let mut cart = Cart::new();
        let ops: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", false),
            ("b", false),
            ("b", false),
            ("a", true),
            ("c", true),
            ("a", false),
        ];
        for (id, add) in ops {
            if *add {
                cart.add_item(item(id, "10"));
            } else {
                cart.remove_item(id);
            }
            let sum: u32 = cart.lines().iter().map(|l| l.quantity).sum();
            assert_eq!(cart.item_count(), sum);
            assert!(cart.lines().iter().all(|l| l.quantity >= 1));
        }
        assert_eq!(cart.get("a").unwrap().quantity, 2);
        assert_eq!(cart.get("c").unwrap().quantity, 1);
        assert!(cart.get("b").is_none());
    }

    #[test]
    fn total_is_independent_of_operation_order() {
        let mut first = Cart::new();
        first.add_item(item("a", "Rp 10.000"));
        first.add_item(item("b", "Rp 2.500"));
        first.remove_item("a");
        first.add_item(item("a", "Rp 10.000"));

        let mut second = Cart::new();
        second.add_item(item("b", "Rp 2.500"));
        second.add_item(item("a", "Rp 10.000"));

        assert_eq!(first.total(), second.total());
        assert_eq!(first.total(), 12500);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut cart = Cart::new();
        cart.add_item(item("b", "1"));
        cart.add_item(item("a", "1"));
        cart.add_item(item("b", "1"));
        let ids: Vec<_> = cart.lines().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn from_lines_repairs_bad_snapshots() {
        let line = |id: &str, quantity| CartLine {
            id: id.into(),
            name: id.into(),
            price: "10".into(),
            image: String::new(),
            quantity,
        };
        let cart = Cart::from_lines(vec![line("a", 2), line("b", 0), line("a", 1)]);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.get("a").unwrap().quantity, 3);
    }

    #[test]
    fn snapshot_serializes_as_ordered_list() {
        let mut cart = Cart::new();
        cart.add_item(item("a", "Rp 1.000"));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[0]["quantity"], 1);
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new();
        cart.add_item(item("a", "100"));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0);
        assert_eq!(cart.item_count(), 0);
    }
}
