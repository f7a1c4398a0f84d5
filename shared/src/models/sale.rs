//! Sale record data structures
//!
//! Generic sale/receipt record handed over by the web POS for
//! invoice, receipt and kitchen-order printing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Layout to render a sale record as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    /// Full header, itemized lines, totals, payment and footer
    Invoice,
    /// Compact items, total and payment
    Receipt,
    /// Order number/table/time, items and notes, no pricing
    KitchenOrder,
}

impl std::str::FromStr for ReceiptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            "kitchen" | "kitchen_order" | "kitchen-order" => Ok(Self::KitchenOrder),
            other => Err(format!("Unknown receipt kind: {}", other)),
        }
    }
}

/// Sale line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Per-item note, shown on kitchen orders
    #[serde(default)]
    pub note: Option<String>,
}

impl SaleItem {
    pub fn new(name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            note: None,
        }
    }

    /// quantity × unit price, keeping the operands' precision
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Sale record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub store_name: String,
    #[serde(default)]
    pub store_address: Option<String>,
    #[serde(default)]
    pub store_phone: Option<String>,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub cashier: Option<String>,
    #[serde(default)]
    pub items: Vec<SaleItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub amount_paid: Option<Decimal>,

    // -- Kitchen order fields --
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,

    /// Closing line printed on invoices
    #[serde(default)]
    pub footer: Option<String>,
}

impl SaleRecord {
    /// Change due back to the customer, if an amount paid was recorded
    pub fn change_due(&self) -> Option<Decimal> {
        self.amount_paid.map(|paid| paid - self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_line_total_keeps_precision() {
        let item = SaleItem::new("Latte", dec("2"), dec("3.50"));
        assert_eq!(item.line_total().to_string(), "7.00");
    }

    #[test]
    fn test_change_due() {
        let record = SaleRecord {
            total: dec("7.00"),
            amount_paid: Some(dec("10.00")),
            ..Default::default()
        };
        assert_eq!(record.change_due().unwrap().to_string(), "3.00");
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{
            "store_name": "Corner Cafe",
            "items": [{"name": "Latte", "quantity": "1", "unit_price": "3.50"}],
            "total": "3.50"
        }"#;
        let record: SaleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.total.to_string(), "3.50");
        assert!(record.amount_paid.is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("kitchen".parse::<ReceiptKind>().unwrap(), ReceiptKind::KitchenOrder);
        assert!("menu".parse::<ReceiptKind>().is_err());
    }
}
