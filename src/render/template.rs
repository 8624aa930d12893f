use super::document::{Align, Face, Rgb, TextRun, VisualDocument, PAGE_HEIGHT_PX, PAGE_WIDTH_PX};
use crate::models::{format_money, InvoiceRecord};
use bigdecimal::BigDecimal;
use serde::Serialize;

/// Visual parameters that tell the bundled templates apart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub accent: Rgb,
    /// Filled band behind the title block; title text turns white on it
    pub header_band: Option<Rgb>,
    pub title_size: f32,
    pub title_bold: bool,
    pub face: Face,
    /// Small uppercase section headings instead of large accent ones
    pub quiet_headings: bool,
    /// Table and divider thickness; zero draws no grid
    pub rule_weight: f32,
    pub table_header_fill: Option<Rgb>,
    /// Shaded panel behind the totals block
    pub totals_panel: Option<Rgb>,
}

pub type LayoutFn = fn(&InvoiceRecord, &Theme) -> VisualDocument;

pub struct TemplateDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub preview: &'static str,
    pub theme: Theme,
    pub layout: LayoutFn,
}

impl TemplateDescriptor {
    /// Pure: the record is only read
    pub fn render(&self, record: &InvoiceRecord) -> VisualDocument {
        (self.layout)(record, &self.theme)
    }
}

impl std::fmt::Debug for TemplateDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Listing entry for the bundled templates endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: &'static str,
    pub name: &'static str,
    pub preview: &'static str,
}

impl From<&TemplateDescriptor> for TemplateSummary {
    fn from(d: &TemplateDescriptor) -> Self {
        Self {
            id: d.id,
            name: d.name,
            preview: d.preview,
        }
    }
}

const BLUE_600: Rgb = Rgb(37, 99, 235);
const BLUE_800: Rgb = Rgb(30, 64, 175);
const PRIMARY: Rgb = Rgb(15, 23, 42);

static TEMPLATES: [TemplateDescriptor; 7] = [
    TemplateDescriptor {
        id: "standard",
        name: "Standard Invoice",
        preview: "https://images.unsplash.com/photo-1635372722656-389f87a941b7?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: Rgb::GRAY_900,
            header_band: None,
            title_size: 36.0,
            title_bold: true,
            face: Face::Sans,
            quiet_headings: false,
            rule_weight: 1.0,
            table_header_fill: Some(Rgb::GRAY_50),
            totals_panel: None,
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "modern",
        name: "Modern Invoice",
        preview: "https://images.unsplash.com/photo-1586892477838-2b96e85e0f96?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: PRIMARY,
            header_band: Some(PRIMARY),
            title_size: 36.0,
            title_bold: true,
            face: Face::Sans,
            quiet_headings: false,
            rule_weight: 1.0,
            table_header_fill: Some(Rgb::GRAY_50),
            totals_panel: None,
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "minimal",
        name: "Minimal Invoice",
        preview: "https://images.unsplash.com/photo-1561154464-82e9adf32764?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: Rgb::GRAY_500,
            header_band: None,
            title_size: 48.0,
            title_bold: false,
            face: Face::Sans,
            quiet_headings: true,
            rule_weight: 0.0,
            table_header_fill: None,
            totals_panel: None,
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "professional",
        name: "Professional Invoice",
        preview: "https://images.unsplash.com/photo-1554224155-6726b3ff858f?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: BLUE_800,
            header_band: Some(BLUE_600),
            title_size: 36.0,
            title_bold: true,
            face: Face::Sans,
            quiet_headings: false,
            rule_weight: 1.0,
            table_header_fill: Some(Rgb::GRAY_50),
            totals_panel: Some(Rgb::GRAY_50),
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "classic",
        name: "Classic Invoice",
        preview: "https://images.unsplash.com/photo-1544377193-33dcf4d68fb5?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: Rgb::GRAY_900,
            header_band: None,
            title_size: 36.0,
            title_bold: false,
            face: Face::Serif,
            quiet_headings: false,
            rule_weight: 2.0,
            table_header_fill: None,
            totals_panel: None,
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "business",
        name: "Business Invoice",
        preview: "https://images.unsplash.com/photo-1460925895917-afdab827c52f?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: PRIMARY,
            header_band: Some(Rgb::GRAY_50),
            title_size: 36.0,
            title_bold: true,
            face: Face::Sans,
            quiet_headings: false,
            rule_weight: 1.0,
            table_header_fill: Some(Rgb::GRAY_200),
            totals_panel: Some(Rgb::GRAY_50),
        },
        layout: invoice_layout,
    },
    TemplateDescriptor {
        id: "elegant",
        name: "Elegant Invoice",
        preview: "https://images.unsplash.com/photo-1586282391129-76a6df230234?w=500&auto=format&fit=crop&q=60&ixlib=rb-4.0.3",
        theme: Theme {
            accent: Rgb::GRAY_700,
            header_band: None,
            title_size: 48.0,
            title_bold: false,
            face: Face::Serif,
            quiet_headings: true,
            rule_weight: 0.5,
            table_header_fill: None,
            totals_panel: None,
        },
        layout: invoice_layout,
    },
];

pub fn templates() -> &'static [TemplateDescriptor] {
    &TEMPLATES
}

pub fn find_template(id: &str) -> Option<&'static TemplateDescriptor> {
    TEMPLATES.iter().find(|t| t.id == id)
}

const MARGIN: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH_PX - 2.0 * MARGIN;
const BARCODE_WIDTH: f32 = 220.0;
const BARCODE_HEIGHT: f32 = 70.0;
const QR_SIZE: f32 = 100.0;

/// Column title, width and alignment of the goods table
const COLUMNS: [(&str, f32, Align); 7] = [
    ("Description", 170.0, Align::Left),
    ("GD Number", 80.0, Align::Left),
    ("HS Code", 82.0, Align::Left),
    ("FBR Code", 80.0, Align::Left),
    ("Quantity", 70.0, Align::Right),
    ("Unit Price", 100.0, Align::Right),
    ("Amount", 100.0, Align::Right),
];

struct Pen<'a> {
    doc: VisualDocument,
    theme: &'a Theme,
}

impl<'a> Pen<'a> {
    fn write(&mut self, x: f32, y: f32, size: f32, content: impl Into<String>, color: Rgb, bold: bool, align: Align) {
        self.doc.text(TextRun {
            x,
            y,
            size,
            content: content.into(),
            color,
            bold,
            face: self.theme.face,
            align,
        });
    }
}

/// Rough advance width used to keep cell text inside its column
fn fit(content: &str, width: f32, size: f32) -> String {
    let max_chars = ((width / (size * 0.55)).floor() as usize).max(1);
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn format_quantity(qty: &BigDecimal) -> String {
    let text = format_money(qty);
    match text.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

/// The single layout shared by every bundled template
pub fn invoice_layout(record: &InvoiceRecord, theme: &Theme) -> VisualDocument {
    let mut pen = Pen {
        doc: VisualDocument::a4(),
        theme,
    };
    let currency = record.currency_code();
    let money = |v: &BigDecimal| format!("{} {}", currency, format_money(v));
    let amounts = record.amounts();

    // title block
    let header_top = 32.0;
    let header_height = 216.0;
    let (title_color, sub_color) = match theme.header_band {
        Some(band) => {
            pen.doc.rect(32.0, header_top, PAGE_WIDTH_PX - 64.0, header_height, band);
            if band == Rgb::GRAY_50 {
                (theme.accent, Rgb::GRAY_700)
            } else {
                (Rgb::WHITE, Rgb::GRAY_200)
            }
        }
        None => (theme.accent, Rgb::GRAY_500),
    };
    pen.write(MARGIN, 100.0, theme.title_size, "TAX INVOICE", title_color, theme.title_bold, Align::Left);
    pen.write(MARGIN, 136.0, 18.0, format!("#{}", record.invoice_number), sub_color, false, Align::Left);
    pen.write(MARGIN, 164.0, 14.0, format!("Issue Date: {}", record.date), sub_color, false, Align::Left);
    if let Some(due) = &record.due_date {
        pen.write(MARGIN, 188.0, 14.0, format!("Due Date: {}", due), sub_color, false, Align::Left);
    }

    let code_x = PAGE_WIDTH_PX - MARGIN - BARCODE_WIDTH;
    if theme.header_band.is_some() {
        // white backing so codes stay scannable on coloured bands
        pen.doc.rect(code_x - 8.0, 40.0, BARCODE_WIDTH + 16.0, BARCODE_HEIGHT + 16.0, Rgb::WHITE);
        pen.doc.rect(
            PAGE_WIDTH_PX - MARGIN - QR_SIZE - 8.0,
            130.0,
            QR_SIZE + 16.0,
            QR_SIZE + 16.0,
            Rgb::WHITE,
        );
    }
    pen.doc.elements.push(super::document::Element::BarcodeSlot {
        x: code_x,
        y: 48.0,
        width: BARCODE_WIDTH,
        height: BARCODE_HEIGHT,
    });
    pen.doc.elements.push(super::document::Element::QrSlot {
        x: PAGE_WIDTH_PX - MARGIN - QR_SIZE,
        y: 138.0,
        size: QR_SIZE,
    });

    // parties
    let parties_top = header_top + header_height + 48.0;
    let half = CONTENT_WIDTH / 2.0;
    let sides = [
        ("Client Information", &record.client),
        ("Importer Information", &record.importer),
    ];
    for (i, (heading, party)) in sides.iter().enumerate() {
        let x = MARGIN + i as f32 * (half + 12.0);
        if theme.quiet_headings {
            pen.write(x, parties_top, 11.0, heading.to_uppercase(), Rgb::GRAY_500, false, Align::Left);
        } else {
            pen.write(x, parties_top, 20.0, *heading, theme.accent, true, Align::Left);
            pen.doc.rule(x, parties_top + 10.0, half - 12.0, theme.rule_weight, Rgb::GRAY_200);
        }
        let name = fit(&party.name, half - 130.0, 14.0);
        pen.write(x, parties_top + 38.0, 14.0, "Business Name:", Rgb::GRAY_700, true, Align::Left);
        pen.write(x + 118.0, parties_top + 38.0, 14.0, name, Rgb::GRAY_900, false, Align::Left);
        pen.write(x, parties_top + 62.0, 14.0, "NTN:", Rgb::GRAY_700, true, Align::Left);
        pen.write(x + 118.0, parties_top + 62.0, 14.0, party.ntn.as_str(), Rgb::GRAY_900, false, Align::Left);
    }

    // goods table
    let table_top = parties_top + 110.0;
    let head_height = 36.0;
    let row_height = 44.0;
    if let Some(fill) = theme.table_header_fill {
        pen.doc.rect(MARGIN, table_top, CONTENT_WIDTH, head_height, fill);
    }
    let cells = [
        record.particulars_of_goods.clone(),
        record.gd_number.clone(),
        record.hs_code.clone(),
        record.fbr_code.clone(),
        format_quantity(&record.qty_units),
        money(&record.unit_price),
        money(&record.value),
    ];
    let mut x = MARGIN;
    for ((title, width, align), cell) in COLUMNS.iter().zip(cells.iter()) {
        let anchor = match align {
            Align::Right => x + width - 8.0,
            _ => x + 8.0,
        };
        let head_color = if theme.quiet_headings { Rgb::GRAY_500 } else { Rgb::GRAY_900 };
        pen.write(anchor, table_top + 23.0, 12.0, *title, head_color, !theme.quiet_headings, *align);
        pen.write(anchor, table_top + head_height + 27.0, 12.0, fit(cell, width - 16.0, 12.0), Rgb::GRAY_900, false, *align);
        x += width;
    }
    let table_height = head_height + row_height;
    let w = theme.rule_weight;
    if w > 0.0 {
        pen.doc.frame(MARGIN, table_top, CONTENT_WIDTH, table_height, w, Rgb::GRAY_200);
        pen.doc.rule(MARGIN, table_top + head_height, CONTENT_WIDTH, w, Rgb::GRAY_200);
        let mut x = MARGIN;
        for (_, width, _) in COLUMNS.iter().take(COLUMNS.len() - 1) {
            x += width;
            pen.doc.rect(x, table_top, w, table_height, Rgb::GRAY_200);
        }
    } else {
        pen.doc.rule(MARGIN, table_top + head_height, CONTENT_WIDTH, 1.0, Rgb::GRAY_200);
        pen.doc.rule(MARGIN, table_top + table_height, CONTENT_WIDTH, 1.0, Rgb::GRAY_200);
    }

    // totals
    let totals_width = 320.0;
    let totals_x = PAGE_WIDTH_PX - MARGIN - totals_width;
    let totals_top = table_top + table_height + 40.0;
    let line_height = 36.0;
    if let Some(panel) = theme.totals_panel {
        pen.doc.rect(totals_x - 16.0, totals_top - 12.0, totals_width + 32.0, line_height * 4.0 + 24.0, panel);
    }
    let lines = [
        ("Subtotal:".to_string(), money(&amounts.subtotal)),
        (format!("GST ({}%):", record.gst_percent()), money(&amounts.gst_amount)),
        ("Value Added Tax:".to_string(), money(&amounts.value_added_tax)),
    ];
    let right = totals_x + totals_width;
    for (i, (label, value)) in lines.into_iter().enumerate() {
        let baseline = totals_top + i as f32 * line_height + 22.0;
        pen.write(totals_x, baseline, 14.0, label, Rgb::GRAY_700, true, Align::Left);
        pen.write(right, baseline, 14.0, value, Rgb::GRAY_900, false, Align::Right);
        pen.doc.rule(totals_x, totals_top + (i + 1) as f32 * line_height - 1.0, totals_width, 1.0, Rgb::GRAY_200);
    }
    let total_baseline = totals_top + 3.0 * line_height + 26.0;
    pen.write(totals_x, total_baseline, 18.0, "Total Amount:", theme.accent, true, Align::Left);
    pen.write(right, total_baseline, 18.0, money(&amounts.total), theme.accent, true, Align::Right);

    // notes
    let mut notes_y = totals_top + 22.0;
    let notes_width = totals_x - MARGIN - 32.0;
    let notes = [
        ("Payment Terms", &record.payment_terms),
        ("Remarks", &record.remarks),
    ];
    for (label, value) in notes {
        if let Some(value) = value {
            pen.write(MARGIN, notes_y, 12.0, format!("{}:", label), Rgb::GRAY_700, true, Align::Left);
            pen.write(MARGIN, notes_y + 20.0, 12.0, fit(value, notes_width, 12.0), Rgb::GRAY_900, false, Align::Left);
            notes_y += 52.0;
        }
    }

    // footer
    let footer_top = PAGE_HEIGHT_PX - 120.0;
    pen.doc.rule(MARGIN, footer_top, CONTENT_WIDTH, 1.0, Rgb::GRAY_200);
    pen.write(
        PAGE_WIDTH_PX / 2.0,
        footer_top + 40.0,
        12.0,
        "This is a computer-generated document. No signature is required.",
        Rgb::GRAY_500,
        false,
        Align::Center,
    );

    pen.doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::{dec, record};
    use crate::render::document::Element;

    #[test]
    fn registry_has_seven_unique_templates() {
        let ids: Vec<_> = templates().iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec!["standard", "modern", "minimal", "professional", "classic", "business", "elegant"]
        );
        assert!(find_template("modern").is_some());
        assert!(find_template("Modern").is_none());
        assert!(find_template("fancy").is_none());
    }

    #[test]
    fn every_template_prints_the_derived_totals() {
        let rec = record("INV-9");
        for template in templates() {
            let doc = template.render(&rec);
            assert!(doc.contains_text("PKR 10,000.00"), "{}", template.id);
            assert!(doc.contains_text("PKR 1,700.00"), "{}", template.id);
            assert!(doc.contains_text("PKR 250.00"), "{}", template.id);
            assert!(doc.contains_text("PKR 11,950.00"), "{}", template.id);
            assert!(doc.contains_text("GST (17%):"), "{}", template.id);
            assert!(doc.contains_text("#INV-9"), "{}", template.id);
        }
    }

    #[test]
    fn each_page_has_one_barcode_and_one_qr_slot() {
        let doc = find_template("standard").unwrap().render(&record("INV-1"));
        let barcodes = doc.elements.iter().filter(|e| matches!(e, Element::BarcodeSlot { .. })).count();
        let qrs = doc.elements.iter().filter(|e| matches!(e, Element::QrSlot { .. })).count();
        assert_eq!((barcodes, qrs), (1, 1));
        assert_eq!((doc.width, doc.height), (794.0, 1123.0));
    }

    #[test]
    fn layout_is_pure() {
        let rec = record("INV-1");
        let before = rec.clone();
        let template = find_template("elegant").unwrap();
        let first = template.render(&rec);
        let second = template.render(&rec);
        assert_eq!(first, second);
        assert_eq!(rec, before);
    }

    #[test]
    fn currency_and_optional_notes_are_printed() {
        let mut rec = record("INV-1");
        rec.currency = Some("USD".to_string());
        rec.payment_terms = Some("Net 30".to_string());
        rec.due_date = Some("2024-04-01".to_string());
        let doc = find_template("classic").unwrap().render(&rec);
        assert!(doc.contains_text("USD 11,950.00"));
        assert!(doc.contains_text("Net 30"));
        assert!(doc.contains_text("Due Date: 2024-04-01"));
        assert!(doc.texts().all(|t| t.face == Face::Serif));
    }

    #[test]
    fn long_descriptions_are_clipped_to_their_column() {
        let mut rec = record("INV-1");
        rec.particulars_of_goods = "x".repeat(200);
        let doc = find_template("minimal").unwrap().render(&rec);
        let longest = doc.texts().map(|t| t.content.chars().count()).max().unwrap();
        assert!(longest < 200);
    }

    #[test]
    fn whole_quantities_print_without_decimals() {
        assert_eq!(format_quantity(&dec("1500")), "1,500");
        assert_eq!(format_quantity(&dec("2.5")), "2.50");
    }
}
