use crate::models::{format_money, InvoiceRecord};
use crate::pdf::AssembledDocument;
use serde::Serialize;

pub const PDF_MIME: &str = "application/pdf";

/// `invoices-<templateId>-<epochMillis>.pdf`
pub fn download_filename(doc: &AssembledDocument) -> String {
    format!(
        "invoices-{}-{}.pdf",
        doc.template_id,
        doc.created_at.timestamp_millis()
    )
}

pub fn content_disposition(doc: &AssembledDocument) -> String {
    format!("attachment; filename=\"{}\"", download_filename(doc))
}

/// Percent-encode everything outside the URI-component unreserved set
fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn amount_lines(record: &InvoiceRecord, bullet: &str) -> String {
    let amounts = record.amounts();
    let currency = record.currency_code();
    format!(
        "{b}Amount: {c} {}\n{b}GST ({}%): {c} {}\n{b}VAT: {c} {}\n{b}Total: {c} {}",
        format_money(&amounts.subtotal),
        record.gst_percent(),
        format_money(&amounts.gst_amount),
        format_money(&amounts.value_added_tax),
        format_money(&amounts.total),
        b = bullet,
        c = currency,
    )
}

pub fn whatsapp_message(record: &InvoiceRecord, download_url: Option<&str>) -> String {
    let mut message = format!(
        "Your invoice #{} has been generated.\n\n{}\n",
        record.invoice_number,
        amount_lines(record, "")
    );
    if let Some(url) = download_url {
        message.push_str(&format!("\nDownload your invoice here: {}\n", url));
    }
    message.push_str("\nThank you for your business!");
    message
}

pub fn email_subject(record: &InvoiceRecord) -> String {
    format!("Invoice #{} from InvoiceGen", record.invoice_number)
}

pub fn email_body(record: &InvoiceRecord) -> String {
    format!(
        "Dear {},\n\nPlease find attached your invoice #{}.\n\nInvoice Details:\n- Date: {}\n{}\n\nThank you for your business!\n\nBest regards,\nInvoiceGen",
        record.client.name,
        record.invoice_number,
        record.date,
        amount_lines(record, "- ")
    )
}

/// Hand-off links for the messaging channels; nothing is sent from here
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub fn whatsapp_link(phone: &str, record: &InvoiceRecord, download_url: Option<&str>) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!(
        "https://wa.me/{}?text={}",
        digits,
        encode_component(&whatsapp_message(record, download_url))
    )
}

pub fn mailto_link(address: &str, record: &InvoiceRecord) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        address.trim(),
        encode_component(&email_subject(record)),
        encode_component(&email_body(record))
    )
}

pub fn share_links(
    record: &InvoiceRecord,
    phone: Option<&str>,
    email: Option<&str>,
    download_url: Option<&str>,
) -> ShareLinks {
    let whatsapp = phone
        .filter(|p| p.chars().any(|c| c.is_ascii_digit()))
        .map(|p| whatsapp_link(p, record, download_url));
    let email = email
        .filter(|e| e.contains('@'))
        .map(|e| mailto_link(e, record));
    if whatsapp.is_none() && email.is_none() {
        tracing::warn!(
            "No usable phone or email for invoice {}; nothing to share",
            record.invoice_number
        );
    }
    ShareLinks { whatsapp, email }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use chrono::TimeZone;

    #[test]
    fn filename_uses_template_and_epoch_millis() {
        let created_at = chrono::Utc.timestamp_millis_opt(1_709_294_400_123).unwrap();
        let doc = AssembledDocument {
            bytes: Vec::new(),
            placements: Vec::new(),
            template_id: "modern".to_string(),
            created_at,
        };
        assert_eq!(download_filename(&doc), "invoices-modern-1709294400123.pdf");
        assert_eq!(
            content_disposition(&doc),
            "attachment; filename=\"invoices-modern-1709294400123.pdf\""
        );
    }

    #[test]
    fn components_are_encoded_like_uri_components() {
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("(ok)!~*'"), "(ok)!~*'");
        assert_eq!(encode_component("#1\n"), "%231%0A");
    }

    #[test]
    fn whatsapp_link_carries_totals() {
        let link = whatsapp_link("+92 300 1234567", &record("INV-1"), None);
        assert!(link.starts_with("https://wa.me/923001234567?text="));
        assert!(link.contains(&encode_component("Total: PKR 11,950.00")));
        assert!(link.contains(&encode_component("GST (17%): PKR 1,700.00")));
    }

    #[test]
    fn mailto_link_addresses_the_client() {
        let link = mailto_link("jane@example.com", &record("INV-1"));
        assert!(link.starts_with("mailto:jane@example.com?subject=Invoice%20%23INV-1%20from%20InvoiceGen&body="));
        assert!(link.contains(&encode_component("Dear Acme Traders,")));
    }

    #[test]
    fn unusable_contacts_produce_no_links() {
        let links = share_links(&record("INV-1"), Some("n/a"), Some("nobody"), None);
        assert_eq!(links, ShareLinks { whatsapp: None, email: None });

        let links = share_links(&record("INV-1"), Some("03001234567"), None, Some("https://x/y.pdf"));
        assert!(links.whatsapp.unwrap().contains(&encode_component("https://x/y.pdf")));
        assert!(links.email.is_none());
    }
}
