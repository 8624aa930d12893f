use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// One side of an invoice: the client or the importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    pub name: String,
    /// National tax number
    pub ntn: String,
}

/// One parsed and validated CSV row, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub serial_number: Option<String>,
    pub invoice_number: String,
    pub date: String,
    pub client: PartyRef,
    pub importer: PartyRef,
    pub particulars_of_goods: String,
    pub gd_number: String,
    pub hs_code: String,
    /// Tax-authority code
    pub fbr_code: String,
    pub qty_units: BigDecimal,
    pub unit_price: BigDecimal,
    /// Gross value before tax
    pub value: BigDecimal,
    /// GST rate as a fraction (CSV carries a percentage)
    pub gst: BigDecimal,
    /// Fixed value-added tax amount
    pub value_added_tax: BigDecimal,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    pub due_date: Option<String>,
    pub remarks: Option<String>,
}

/// Money lines every template prints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceAmounts {
    pub subtotal: BigDecimal,
    pub gst_amount: BigDecimal,
    pub value_added_tax: BigDecimal,
    pub total: BigDecimal,
}

/// Currency precision for printed amounts
pub const MONEY_SCALE: i64 = 2;

impl InvoiceRecord {
    /// subtotal = value, gst = value * rate, total = value * (1 + rate) + vat,
    /// each rounded to the currency precision.
    pub fn amounts(&self) -> InvoiceAmounts {
        let gst_amount = &self.value * &self.gst;
        let total = (&self.value * (BigDecimal::from(1).add(&self.gst))).add(&self.value_added_tax);
        InvoiceAmounts {
            subtotal: round_money(&self.value),
            gst_amount: round_money(&gst_amount),
            value_added_tax: round_money(&self.value_added_tax),
            total: round_money(&total),
        }
    }

    /// GST as a whole-number percentage for labels ("17%")
    pub fn gst_percent(&self) -> BigDecimal {
        (&self.gst * BigDecimal::from(100)).round(0)
    }

    pub fn currency_code(&self) -> &str {
        self.currency.as_deref().filter(|c| !c.is_empty()).unwrap_or("PKR")
    }

    pub fn has_negative_amounts(&self) -> bool {
        [
            &self.qty_units,
            &self.unit_price,
            &self.value,
            &self.gst,
            &self.value_added_tax,
        ]
        .iter()
        .any(|v| **v < BigDecimal::zero())
    }
}

pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.round(MONEY_SCALE).with_scale(MONEY_SCALE)
}

/// Render an amount with thousands separators, e.g. `1,234,567.50`
pub fn format_money(value: &BigDecimal) -> String {
    let rounded = round_money(value).to_string();
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, frac_part)
}
