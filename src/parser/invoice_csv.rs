use super::ParseError;
use crate::models::{InvoiceRecord, PartyRef};
use bigdecimal::{BigDecimal, Zero};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::str::FromStr;

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d*\.?\d+$").expect("valid numeric pattern"));

/// A trimmed CSV cell after type coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    /// Numeric cell; the source text is kept for identifier columns
    Number { text: String, value: BigDecimal },
    Text(String),
}

impl Cell {
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if NUMERIC.is_match(trimmed) {
            if let Ok(value) = BigDecimal::from_str(trimmed) {
                return Cell::Number {
                    text: trimmed.to_string(),
                    value,
                };
            }
        }
        Cell::Text(trimmed.to_string())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Empty => None,
            Cell::Number { text, .. } => Some(text),
            Cell::Text(text) => Some(text),
        }
    }

    /// Numeric value, zero when absent or not a number
    pub fn number(&self) -> BigDecimal {
        match self {
            Cell::Number { value, .. } => value.clone(),
            _ => BigDecimal::zero(),
        }
    }
}

/// Canonical invoice columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SerialNumber,
    InvoiceNumber,
    Date,
    ClientNtn,
    ClientName,
    ImporterNtn,
    ImporterName,
    ParticularsOfGoods,
    GdNumber,
    HsCode,
    FbrCode,
    QtyUnits,
    Value,
    Gst,
    ValueAddedTax,
    UnitPrice,
    Currency,
    PaymentTerms,
    DueDate,
    Remarks,
}

impl Field {
    pub fn label(&self) -> &'static str {
        HEADER_ALIASES
            .iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}

/// Header names after whitespace removal, matched case-sensitively
const HEADER_ALIASES: &[(&str, Field)] = &[
    ("SerialNumber", Field::SerialNumber),
    ("InvoiceNumber", Field::InvoiceNumber),
    ("Date", Field::Date),
    ("ClientNTN", Field::ClientNtn),
    ("ClientName", Field::ClientName),
    ("ImporterNTN", Field::ImporterNtn),
    ("ImporterName", Field::ImporterName),
    ("ParticularsofGoods", Field::ParticularsOfGoods),
    ("GDNumber", Field::GdNumber),
    ("HSCode", Field::HsCode),
    ("FBRCode", Field::FbrCode),
    ("QTYUnits", Field::QtyUnits),
    ("Value", Field::Value),
    ("GST", Field::Gst),
    ("ValueAddedTax", Field::ValueAddedTax),
    ("UnitPrice", Field::UnitPrice),
    ("Currency", Field::Currency),
    ("PaymentTerms", Field::PaymentTerms),
    ("DueDate", Field::DueDate),
    ("Remarks", Field::Remarks),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Known(Field),
    /// Unmapped header, passed through unchanged
    Other(String),
}

pub fn map_header(raw: &str) -> Column {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    HEADER_ALIASES
        .iter()
        .find(|(name, _)| *name == compact)
        .map(|(_, field)| Column::Known(*field))
        .unwrap_or(Column::Other(raw.to_string()))
}

/// One CSV data row keyed by column
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: u64,
    cells: IndexMap<Field, Cell>,
    pub extra: IndexMap<String, Cell>,
}

impl RawRow {
    fn get(&self, field: Field) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(&field).unwrap_or(&EMPTY)
    }

    fn text(&self, field: Field) -> Option<String> {
        self.get(field).text().map(str::to_string)
    }

    fn required(&self, field: Field) -> Result<String, SkipReason> {
        self.text(field).ok_or(SkipReason::MissingField(field.label()))
    }

    /// Build a record, or say why the row is unusable
    pub fn into_record(self) -> Result<InvoiceRecord, SkipReason> {
        let invoice_number = self.required(Field::InvoiceNumber)?;
        let date = self.required(Field::Date)?;
        let client_name = self.required(Field::ClientName)?;
        let importer_name = self.required(Field::ImporterName)?;
        let particulars_of_goods = self.required(Field::ParticularsOfGoods)?;
        let value = self.get(Field::Value).number();
        if value <= BigDecimal::zero() {
            return Err(SkipReason::NonPositiveValue);
        }
        let fbr_code = self.required(Field::FbrCode)?;

        let record = InvoiceRecord {
            serial_number: self.text(Field::SerialNumber),
            invoice_number,
            date,
            client: PartyRef {
                name: client_name,
                ntn: self.text(Field::ClientNtn).unwrap_or_default(),
            },
            importer: PartyRef {
                name: importer_name,
                ntn: self.text(Field::ImporterNtn).unwrap_or_default(),
            },
            particulars_of_goods,
            gd_number: self.text(Field::GdNumber).unwrap_or_default(),
            hs_code: self.text(Field::HsCode).unwrap_or_default(),
            fbr_code,
            qty_units: self.get(Field::QtyUnits).number(),
            unit_price: self.get(Field::UnitPrice).number(),
            value,
            gst: self.get(Field::Gst).number() / BigDecimal::from(100),
            value_added_tax: self.get(Field::ValueAddedTax).number(),
            currency: self.text(Field::Currency),
            payment_terms: self.text(Field::PaymentTerms),
            due_date: self.text(Field::DueDate),
            remarks: self.text(Field::Remarks),
        };

        if record.has_negative_amounts() {
            return Err(SkipReason::NegativeAmount);
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "camelCase")]
pub enum SkipReason {
    MissingField(&'static str),
    NonPositiveValue,
    NegativeAmount,
    DuplicateInvoiceNumber,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingField(name) => write!(f, "missing {}", name),
            SkipReason::NonPositiveValue => write!(f, "value must be greater than zero"),
            SkipReason::NegativeAmount => write!(f, "negative amount"),
            SkipReason::DuplicateInvoiceNumber => write!(f, "duplicate invoice number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based line in the uploaded file
    pub line: u64,
    pub invoice_number: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum RowOutcome {
    Accepted(InvoiceRecord),
    Skipped(SkippedRow),
}

/// Lazy reader over an invoice CSV upload
pub struct RecordReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    columns: Vec<Column>,
    seen_numbers: IndexSet<String>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Result<Self, ParseError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = csv_reader.headers()?.iter().map(map_header).collect();
        Ok(Self {
            rows: csv_reader.into_records(),
            columns,
            seen_numbers: IndexSet::new(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn to_raw(&self, record: &csv::StringRecord) -> RawRow {
        let mut cells = IndexMap::new();
        let mut extra = IndexMap::new();
        for (column, value) in self.columns.iter().zip(record.iter()) {
            let cell = Cell::parse(value);
            match column {
                Column::Known(field) => {
                    cells.insert(*field, cell);
                }
                Column::Other(name) => {
                    extra.insert(name.clone(), cell);
                }
            }
        }
        RawRow {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            cells,
            extra,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RowOutcome, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.rows.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let raw = self.to_raw(&record);
        let line = raw.line;
        let invoice_number = raw.text(Field::InvoiceNumber);

        let outcome = match raw.into_record() {
            Ok(rec) if !self.seen_numbers.insert(rec.invoice_number.clone()) => {
                RowOutcome::Skipped(SkippedRow {
                    line,
                    invoice_number,
                    reason: SkipReason::DuplicateInvoiceNumber,
                })
            }
            Ok(rec) => RowOutcome::Accepted(rec),
            Err(reason) => RowOutcome::Skipped(SkippedRow {
                line,
                invoice_number,
                reason,
            }),
        };
        Some(Ok(outcome))
    }
}

/// Fully read upload
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<InvoiceRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl ParsedBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a whole upload, keeping accepted records in file order
pub fn parse_batch<R: Read>(reader: R) -> Result<ParsedBatch, ParseError> {
    let mut batch = ParsedBatch::default();
    for outcome in RecordReader::new(reader)? {
        match outcome? {
            RowOutcome::Accepted(record) => batch.records.push(record),
            RowOutcome::Skipped(skipped) => {
                tracing::warn!(
                    "Skipping CSV line {} ({}): {}",
                    skipped.line,
                    skipped.invoice_number.as_deref().unwrap_or("-"),
                    skipped.reason
                );
                batch.skipped.push(skipped);
            }
        }
    }
    tracing::info!(
        "Parsed invoice upload: {} accepted, {} skipped",
        batch.records.len(),
        batch.skipped.len()
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::dec;

    const HEADER: &str = "Serial Number,Invoice Number,Date,Client NTN,Client Name,Importer NTN,Importer Name,Particulars of Goods,GD Number,HS Code,FBR Code,QTY Units,Value,GST,Value Added Tax,Unit Price";

    fn csv(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn cells_are_trimmed_and_coerced() {
        assert_eq!(Cell::parse("   "), Cell::Empty);
        assert_eq!(Cell::parse(" abc "), Cell::Text("abc".to_string()));
        assert_eq!(
            Cell::parse(" 0012 "),
            Cell::Number {
                text: "0012".to_string(),
                value: dec("12")
            }
        );
        assert_eq!(Cell::parse("-.5").number(), dec("-0.5"));
        assert_eq!(Cell::parse("1.2.3"), Cell::Text("1.2.3".to_string()));
        assert_eq!(Cell::parse("12a").number(), dec("0"));
    }

    #[test]
    fn headers_match_after_whitespace_removal_only() {
        assert_eq!(map_header("Invoice Number"), Column::Known(Field::InvoiceNumber));
        assert_eq!(map_header(" FBR Code "), Column::Known(Field::FbrCode));
        assert_eq!(map_header("invoice number"), Column::Other("invoice number".to_string()));
        assert_eq!(map_header("Notes"), Column::Other("Notes".to_string()));
    }

    #[test]
    fn valid_rows_become_records_with_numbers() {
        let text = csv(&[
            "1,INV-001,2024-03-01,1234567,Acme Traders,7654321,Lahore Imports,Cotton yarn,GD-1,5205.1100,FBR-1,10,10000,17,250,1000",
        ]);
        let batch = parse_batch(text.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert!(batch.skipped.is_empty());

        let rec = &batch.records[0];
        assert_eq!(rec.invoice_number, "INV-001");
        assert_eq!(rec.client.ntn, "1234567");
        assert_eq!(rec.importer.name, "Lahore Imports");
        assert_eq!(rec.hs_code, "5205.1100");
        assert_eq!(rec.qty_units, dec("10"));
        assert_eq!(rec.value, dec("10000"));
        assert_eq!(rec.gst, dec("0.17"));
        assert_eq!(rec.value_added_tax, dec("250"));
        assert_eq!(rec.unit_price, dec("1000"));
    }

    #[test]
    fn numeric_invoice_numbers_keep_their_text() {
        let text = csv(&["1,00042,2024-03-01,1,A,2,B,Goods,,,F1,1,5,0,0,5"]);
        let batch = parse_batch(text.as_bytes()).unwrap();
        assert_eq!(batch.records[0].invoice_number, "00042");
    }

    #[test]
    fn incomplete_rows_are_skipped_without_error() {
        let text = csv(&[
            "1,,2024-03-01,1,A,2,B,Goods,,,F1,1,5,0,0,5",
            "2,INV-2,,1,A,2,B,Goods,,,F1,1,5,0,0,5",
            "3,INV-3,2024-03-01,1,A,2,B,Goods,,,F1,1,0,0,0,5",
            "4,INV-4,2024-03-01,1,A,2,B,Goods,,,,1,5,0,0,5",
            "5,INV-5,2024-03-01,1,A,2,B,Goods,,,F1,1,abc,0,0,5",
            "6,INV-6,2024-03-01,1,A,2,B,Goods,,,F1,1,5,0,-3,5",
            "7,INV-7,2024-03-01,1,A,2,B,Goods,,,F1,1,5,0,0,5",
        ]);
        let batch = parse_batch(text.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].invoice_number, "INV-7");

        let reasons: Vec<_> = batch.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingField("InvoiceNumber"),
                SkipReason::MissingField("Date"),
                SkipReason::NonPositiveValue,
                SkipReason::MissingField("FBRCode"),
                SkipReason::NonPositiveValue,
                SkipReason::NegativeAmount,
            ]
        );
        assert_eq!(batch.skipped[0].line, 2);
        assert_eq!(batch.skipped[1].invoice_number.as_deref(), Some("INV-2"));
    }

    #[test]
    fn repeated_invoice_numbers_keep_the_first_row() {
        let text = csv(&[
            "1,INV-1,2024-03-01,1,First,2,B,Goods,,,F1,1,5,0,0,5",
            "2,INV-1,2024-03-02,1,Second,2,B,Goods,,,F1,1,5,0,0,5",
        ]);
        let batch = parse_batch(text.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].client.name, "First");
        assert_eq!(batch.skipped[0].reason, SkipReason::DuplicateInvoiceNumber);
    }

    #[test]
    fn unknown_columns_pass_through() {
        let text = "Invoice Number,Notes\nINV-1,hello";
        let mut reader = RecordReader::new(text.as_bytes()).unwrap();
        assert_eq!(reader.columns()[1], Column::Other("Notes".to_string()));
        // row lacks the required columns, so it is reported rather than dropped
        match reader.next().unwrap().unwrap() {
            RowOutcome::Skipped(s) => assert_eq!(s.reason, SkipReason::MissingField("Date")),
            RowOutcome::Accepted(_) => panic!("row should be skipped"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn header_only_upload_is_an_empty_batch() {
        let batch = parse_batch(HEADER.as_bytes()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let text = format!(
            "{}\n\n1,INV-1,2024-03-01,1,A,2,B,Goods,,,F1,1,5,0,0,5\n\n",
            HEADER
        );
        let batch = parse_batch(text.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert!(batch.skipped.is_empty());
    }
}
