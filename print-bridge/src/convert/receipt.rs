//! Sale record to receipt text
//!
//! Renders invoices, compact receipts and kitchen orders as plain text
//! for a given line width. Amounts keep the record's own precision and
//! carry no currency symbol.

use pos_printer::layout::{center, line_lr, rule};
use rust_decimal::Decimal;
use shared::{ReceiptKind, SaleItem, SaleRecord};

/// Receipt text renderer
pub struct ReceiptRenderer<'a> {
    record: &'a SaleRecord,
    width: usize,
}

impl<'a> ReceiptRenderer<'a> {
    pub fn new(record: &'a SaleRecord, chars_per_line: usize) -> Self {
        Self {
            record,
            width: chars_per_line.max(1),
        }
    }

    pub fn render(&self, kind: ReceiptKind) -> String {
        let lines = match kind {
            ReceiptKind::Invoice => self.invoice(),
            ReceiptKind::Receipt => self.receipt(),
            ReceiptKind::KitchenOrder => self.kitchen_order(),
        };
        lines.join("\n")
    }

    fn invoice(&self) -> Vec<String> {
        let r = self.record;
        let mut out = self.store_header(true);

        out.push(rule('=', self.width));
        if !r.invoice_number.is_empty() || !r.date.is_empty() {
            out.push(line_lr(
                &format!("Invoice: {}", r.invoice_number),
                &r.date,
                self.width,
            ));
        }
        if let Some(cashier) = non_empty(&r.cashier) {
            out.push(format!("Cashier: {}", cashier));
        }
        out.push(rule('-', self.width));

        for item in &r.items {
            out.push(line_lr(&item.name, &item.line_total().to_string(), self.width));
            out.push(format!("  {} x {}", item.quantity, item.unit_price));
        }

        out.push(rule('-', self.width));
        out.push(line_lr("Subtotal", &r.subtotal.to_string(), self.width));
        out.push(line_lr("Tax", &r.tax.to_string(), self.width));
        if !r.discount.is_zero() {
            out.push(line_lr("Discount", &format!("-{}", r.discount), self.width));
        }
        out.push(rule('=', self.width));
        out.push(line_lr("TOTAL", &r.total.to_string(), self.width));
        out.extend(self.payment());

        out.push(String::new());
        let footer = non_empty(&r.footer).unwrap_or("Thank you!");
        out.push(center(footer, self.width));
        out
    }

    fn receipt(&self) -> Vec<String> {
        let r = self.record;
        let mut out = self.store_header(false);

        if !r.invoice_number.is_empty() || !r.date.is_empty() {
            out.push(line_lr(&format!("#{}", r.invoice_number), &r.date, self.width));
        }
        out.push(rule('-', self.width));
        for item in &r.items {
            out.push(line_lr(
                &format!("{} x {}", item.quantity, item.name),
                &item.line_total().to_string(),
                self.width,
            ));
        }
        out.push(rule('-', self.width));
        out.push(line_lr("TOTAL", &r.total.to_string(), self.width));
        out.extend(self.payment());
        out
    }

    fn kitchen_order(&self) -> Vec<String> {
        let r = self.record;
        let mut out = vec![center("KITCHEN ORDER", self.width)];

        if let Some(number) = non_empty(&r.order_number) {
            out.push(format!("Order: #{}", number));
        }
        if let Some(table) = non_empty(&r.table) {
            out.push(format!("Table: {}", table));
        }
        if let Some(time) = non_empty(&r.time).or(Some(r.date.as_str()).filter(|d| !d.is_empty())) {
            out.push(format!("Time: {}", time));
        }
        out.push(rule('=', self.width));

        for item in &r.items {
            out.push(kitchen_item(item));
            if let Some(note) = non_empty(&item.note) {
                out.push(format!("   > {}", note));
            }
        }

        let notes = non_empty(&r.notes);
        let special = non_empty(&r.special_instructions);
        if notes.is_some() || special.is_some() {
            out.push(rule('-', self.width));
        }
        if let Some(notes) = notes {
            out.push(format!("Notes: {}", notes));
        }
        if let Some(special) = special {
            out.push(format!("Special: {}", special));
        }
        out
    }

    fn store_header(&self, full: bool) -> Vec<String> {
        let r = self.record;
        let mut out = Vec::new();
        if !r.store_name.is_empty() {
            out.push(center(&r.store_name, self.width));
        }
        if full {
            if let Some(address) = non_empty(&r.store_address) {
                out.push(center(address, self.width));
            }
            if let Some(phone) = non_empty(&r.store_phone) {
                out.push(center(&format!("Tel: {}", phone), self.width));
            }
        }
        out
    }

    fn payment(&self) -> Vec<String> {
        let r = self.record;
        let mut out = Vec::new();
        let method = non_empty(&r.payment_method);
        match (method, r.amount_paid) {
            (Some(method), Some(paid)) => {
                out.push(line_lr(&format!("Paid ({})", method), &paid.to_string(), self.width))
            }
            (None, Some(paid)) => out.push(line_lr("Paid", &paid.to_string(), self.width)),
            (Some(method), None) => out.push(format!("Payment: {}", method)),
            (None, None) => {}
        }
        if let Some(change) = r.change_due().filter(|c| *c > Decimal::ZERO) {
            out.push(line_lr("Change", &change.to_string(), self.width));
        }
        out
    }
}

fn kitchen_item(item: &SaleItem) -> String {
    format!("{} x {}", item.quantity, item.name)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Render a sale record for a line width
pub fn render_receipt(record: &SaleRecord, kind: ReceiptKind, chars_per_line: usize) -> String {
    ReceiptRenderer::new(record, chars_per_line).render(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sale() -> SaleRecord {
        let mut scone = SaleItem::new("Scone", dec("1"), dec("2.25"));
        scone.note = Some("warm".into());
        SaleRecord {
            store_name: "Corner Cafe".into(),
            store_address: Some("1 Main St".into()),
            store_phone: Some("555-0100".into()),
            invoice_number: "A-17".into(),
            date: "2024-05-01 09:30".into(),
            cashier: Some("Sam".into()),
            items: vec![SaleItem::new("Latte", dec("2"), dec("3.50")), scone],
            subtotal: dec("9.25"),
            tax: dec("0.75"),
            discount: dec("0.00"),
            total: dec("10.00"),
            payment_method: Some("Cash".into()),
            amount_paid: Some(dec("20.00")),
            order_number: Some("42".into()),
            table: Some("T3".into()),
            notes: Some("No nuts".into()),
            special_instructions: Some("Rush".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_invoice_layout() {
        let text = render_receipt(&sale(), ReceiptKind::Invoice, 32);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "          Corner Cafe");
        assert_eq!(lines[1], "           1 Main St");
        assert!(lines.contains(&"Latte                       7.00"));
        assert!(lines.contains(&"  2 x 3.50"));
        assert!(lines.contains(&"TOTAL                      10.00"));
        assert!(lines.contains(&"Paid (Cash)                20.00"));
        assert!(lines.contains(&"Change                     10.00"));
        assert!(!text.contains("Discount"));
        assert_eq!(*lines.last().unwrap(), "           Thank you!");
        assert!(lines.iter().all(|l| l.chars().count() <= 32));
    }

    #[test]
    fn test_receipt_is_compact() {
        let text = render_receipt(&sale(), ReceiptKind::Receipt, 32);
        assert!(text.contains("2 x Latte"));
        assert!(!text.contains("Subtotal"));
        assert!(!text.contains("1 Main St"));
        assert!(text.contains("TOTAL"));
    }

    #[test]
    fn test_kitchen_order_has_no_prices() {
        let text = render_receipt(&sale(), ReceiptKind::KitchenOrder, 32);
        assert!(text.contains("Order: #42"));
        assert!(text.contains("Table: T3"));
        assert!(text.contains("Time: 2024-05-01 09:30"));
        assert!(text.contains("1 x Scone\n   > warm"));
        assert!(text.contains("Notes: No nuts"));
        assert!(text.contains("Special: Rush"));
        assert!(!text.contains("3.50"));
        assert!(!text.contains("TOTAL"));
    }

    #[test]
    fn test_precision_kept() {
        let record = SaleRecord {
            items: vec![SaleItem::new("Beans", dec("0.250"), dec("18.000"))],
            total: dec("4.500"),
            ..Default::default()
        };
        let text = render_receipt(&record, ReceiptKind::Receipt, 32);
        assert!(text.contains("0.250 x Beans"));
        assert!(text.contains("4.500000"));
        assert!(text.contains("4.500"));
    }
}
