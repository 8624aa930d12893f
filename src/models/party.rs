use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

static CNIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}-[0-9]{7}-[0-9]$").expect("valid CNIC pattern"));

/// `12345-1234567-1`
pub fn is_valid_cnic(value: &str) -> bool {
    CNIC.is_match(value)
}

/// Clients and importers share one table, told apart by `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PartyKind {
    Client,
    Importer,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Client => "client",
            PartyKind::Importer => "importer",
        }
    }
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(PartyKind::Client),
            "importer" => Ok(PartyKind::Importer),
            _ => Err(format!("invalid party type: {}", s)),
        }
    }
}

impl TryFrom<String> for PartyKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Stored client or importer. The CNIC is write-only: list queries leave it
/// out and it is never serialized.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: i64,
    pub serial_number: Option<String>,
    pub name: String,
    pub business_name: String,
    #[serde(skip)]
    #[sqlx(default)]
    pub cnic: String,
    pub ntn: String,
    pub strn: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: PartyKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert/update payload after validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewParty {
    pub serial_number: Option<String>,
    pub name: String,
    pub business_name: String,
    pub cnic: String,
    pub ntn: String,
    pub strn: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub kind: PartyKind,
}

/// NTN/CNIC pair used for duplicate detection
#[derive(Debug, Clone, FromRow)]
pub struct PartyKey {
    pub ntn: String,
    pub cnic: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnic_needs_the_dashed_layout() {
        assert!(is_valid_cnic("35202-1234567-1"));
        assert!(!is_valid_cnic(""));
        assert!(!is_valid_cnic("3520212345671"));
        assert!(!is_valid_cnic("35202-1234567-12"));
        assert!(!is_valid_cnic("3520a-1234567-1"));
    }

    #[test]
    fn serialized_party_omits_the_cnic() {
        let party = Party {
            id: 1,
            serial_number: None,
            name: "Jane".to_string(),
            business_name: "Acme".to_string(),
            cnic: "35202-1234567-1".to_string(),
            ntn: "1234567".to_string(),
            strn: None,
            address: "Lahore".to_string(),
            phone: None,
            kind: PartyKind::Client,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&party).unwrap();
        assert!(value.get("cnic").is_none());
        assert_eq!(value["type"], "client");
        assert_eq!(value["ntn"], "1234567");
    }
}
