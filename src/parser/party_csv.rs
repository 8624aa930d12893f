use super::ParseError;
use crate::models::{is_valid_cnic, NewParty, PartyKey, PartyKind};
use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Row of a client export
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientRow {
    #[serde(rename = "Ser#", default)]
    pub serial_number: String,
    #[serde(rename = "NTN", default)]
    pub ntn: String,
    #[serde(rename = "STRN", default)]
    pub strn: String,
    #[serde(rename = "CNIC", default)]
    pub cnic: String,
    #[serde(rename = "Customer Name", default)]
    pub customer_name: String,
    #[serde(rename = "Business Name", default)]
    pub business_name: String,
    #[serde(rename = "Address", default)]
    pub address: String,
}

/// Row of an importer export
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImporterRow {
    #[serde(rename = "Ser#", default)]
    pub serial_number: String,
    #[serde(rename = "Business Name", default)]
    pub business_name: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "CNIC", default)]
    pub cnic: String,
    #[serde(rename = "NTN", default)]
    pub ntn: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "Phone", default)]
    pub phone: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub trait PartyRow: DeserializeOwned {
    const KIND: PartyKind;

    fn ntn(&self) -> &str;
    fn cnic(&self) -> &str;
    fn into_new_party(self) -> NewParty;
}

impl PartyRow for ClientRow {
    const KIND: PartyKind = PartyKind::Client;

    fn ntn(&self) -> &str {
        &self.ntn
    }

    fn cnic(&self) -> &str {
        &self.cnic
    }

    fn into_new_party(self) -> NewParty {
        NewParty {
            serial_number: non_empty(self.serial_number),
            name: self.customer_name,
            business_name: self.business_name,
            cnic: self.cnic,
            ntn: self.ntn,
            strn: non_empty(self.strn),
            address: self.address,
            phone: None,
            kind: Self::KIND,
        }
    }
}

impl PartyRow for ImporterRow {
    const KIND: PartyKind = PartyKind::Importer;

    fn ntn(&self) -> &str {
        &self.ntn
    }

    fn cnic(&self) -> &str {
        &self.cnic
    }

    fn into_new_party(self) -> NewParty {
        NewParty {
            serial_number: non_empty(self.serial_number),
            name: self.name,
            business_name: self.business_name,
            cnic: self.cnic,
            ntn: self.ntn,
            strn: None,
            address: self.address,
            phone: non_empty(self.phone),
            kind: Self::KIND,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRow {
    pub line: u64,
    pub ntn: String,
    pub cnic: String,
}

/// Row dropped because a field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome<T> {
    pub accepted: Vec<T>,
    pub duplicates: Vec<DuplicateRow>,
    pub rejected: Vec<RejectedRow>,
}

/// Tracks NTN and CNIC values already taken; blank values never collide
#[derive(Debug, Default)]
struct KeySet {
    ntns: IndexSet<String>,
    cnics: IndexSet<String>,
}

impl KeySet {
    fn contains(&self, ntn: &str, cnic: &str) -> bool {
        (!ntn.is_empty() && self.ntns.contains(ntn)) || (!cnic.is_empty() && self.cnics.contains(cnic))
    }

    fn insert(&mut self, ntn: &str, cnic: &str) {
        if !ntn.is_empty() {
            self.ntns.insert(ntn.to_string());
        }
        if !cnic.is_empty() {
            self.cnics.insert(cnic.to_string());
        }
    }
}

/// Read a party export. Rows with a malformed CNIC are rejected; rows whose
/// NTN or CNIC is already known, from `existing` or an earlier row of the
/// same file, are reported as duplicates.
pub fn read_parties<T: PartyRow, R: Read>(
    reader: R,
    existing: &[PartyKey],
) -> Result<ImportOutcome<T>, ParseError> {
    let mut keys = KeySet::default();
    for key in existing {
        keys.insert(&key.ntn, &key.cnic);
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut accepted = Vec::new();
    let mut duplicates = Vec::new();
    let mut rejected = Vec::new();
    let headers = csv_reader.headers()?.clone();
    for result in csv_reader.records() {
        let record = result?;
        let row: T = record.deserialize(Some(&headers))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if !is_valid_cnic(row.cnic()) {
            rejected.push(RejectedRow {
                line,
                reason: format!("CNIC '{}' is not in the form 12345-1234567-1", row.cnic()),
            });
            continue;
        }
        if keys.contains(row.ntn(), row.cnic()) {
            duplicates.push(DuplicateRow {
                line,
                ntn: row.ntn().to_string(),
                cnic: row.cnic().to_string(),
            });
            continue;
        }
        keys.insert(row.ntn(), row.cnic());
        accepted.push(row);
    }

    if !duplicates.is_empty() {
        tracing::warn!(
            "{} {} rows skipped as duplicates by NTN or CNIC",
            duplicates.len(),
            T::KIND
        );
    }
    if !rejected.is_empty() {
        tracing::warn!("{} {} rows rejected with a malformed CNIC", rejected.len(), T::KIND);
    }
    Ok(ImportOutcome {
        accepted,
        duplicates,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_HEADER: &str = "Ser#,NTN,STRN,CNIC,Customer Name,Business Name,Address";

    #[test]
    fn client_export_maps_its_headers() {
        let text = format!(
            "{}\n1,1234567,STRN1,12345-1234567-1,Jane Doe,Acme Co,Lahore",
            CLIENT_HEADER
        );
        let outcome = read_parties::<ClientRow, _>(text.as_bytes(), &[]).unwrap();
        assert_eq!(outcome.accepted.len(), 1);

        let row = &outcome.accepted[0];
        assert_eq!(row.serial_number, "1");
        assert_eq!(row.ntn, "1234567");
        assert_eq!(row.customer_name, "Jane Doe");
        assert_eq!(row.business_name, "Acme Co");

        let party = row.clone().into_new_party();
        assert_eq!(party.kind, PartyKind::Client);
        assert_eq!(party.name, "Jane Doe");
        assert_eq!(party.strn.as_deref(), Some("STRN1"));
        assert_eq!(party.phone, None);
    }

    #[test]
    fn repeated_ntn_keeps_only_the_first_row() {
        let text = format!(
            "{}\n1,1234567,S1,11111-1111111-1,First,A,X\n2,1234567,S2,22222-2222222-2,Second,B,Y",
            CLIENT_HEADER
        );
        let outcome = read_parties::<ClientRow, _>(text.as_bytes(), &[]).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].customer_name, "First");
        assert_eq!(
            outcome.duplicates,
            vec![DuplicateRow {
                line: 3,
                ntn: "1234567".to_string(),
                cnic: "22222-2222222-2".to_string(),
            }]
        );
    }

    #[test]
    fn stored_parties_count_as_duplicates() {
        let existing = vec![PartyKey {
            ntn: "999".to_string(),
            cnic: "12345-1234567-1".to_string(),
        }];
        let text = format!(
            "{}\n1,1234567,,12345-1234567-1,Jane Doe,Acme Co,Lahore\n2,7654321,,54321-7654321-2,John,Beta,Karachi",
            CLIENT_HEADER
        );
        let outcome = read_parties::<ClientRow, _>(text.as_bytes(), &existing).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].ntn, "7654321");
        assert_eq!(outcome.duplicates.len(), 1);
    }

    #[test]
    fn importer_export_maps_its_headers() {
        let text = "Ser#,Business Name,Name,CNIC,NTN,Address,Phone\n4,Lahore Imports,Ali,35202-1234567-1,7654321,Mall Road,0300-1234567";
        let outcome = read_parties::<ImporterRow, _>(text.as_bytes(), &[]).unwrap();
        let party = outcome.accepted[0].clone().into_new_party();
        assert_eq!(party.kind, PartyKind::Importer);
        assert_eq!(party.name, "Ali");
        assert_eq!(party.business_name, "Lahore Imports");
        assert_eq!(party.phone.as_deref(), Some("0300-1234567"));
        assert_eq!(party.serial_number.as_deref(), Some("4"));
    }

    #[test]
    fn malformed_cnic_rows_are_rejected_with_their_line() {
        let text = format!(
            "{}\n1,1234567,,1234512345671,Jane Doe,Acme Co,Lahore\n2,7654321,,,John,Beta,Karachi\n3,1111111,,11111-1111111-1,Ok,Gamma,Multan",
            CLIENT_HEADER
        );
        let outcome = read_parties::<ClientRow, _>(text.as_bytes(), &[]).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].customer_name, "Ok");
        assert!(outcome.duplicates.is_empty());
        let lines: Vec<u64> = outcome.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(outcome.rejected[0].reason.contains("1234512345671"));
    }
}
