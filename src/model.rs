use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date format used when a date is rendered into slip text.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y.";

/// A member contact; always the payer of a generated slip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_num: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub street_num: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub member_since: Option<NaiveDate>,
    #[serde(default)]
    pub member_until: Option<NaiveDate>,
}

impl Contact {
    pub fn is_member(&self) -> bool {
        self.is_member
    }

    /// First and last name joined by a single space, blanks skipped.
    pub fn full_name(&self) -> String {
        join_non_blank(&[self.first_name.as_str(), self.last_name.as_str()], " ")
    }
}

/// An underage dependent of a contact. Only refers back to its contact by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnderagedMember {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub member_since: Option<NaiveDate>,
    #[serde(default)]
    pub member_until: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
    pub contact_id: u64,
}

impl UnderagedMember {
    pub fn is_member(&self) -> bool {
        self.is_member
    }
}

/// The fixed payment recipient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub iban: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub street_num: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
}

/// A reusable payment definition whose text fields may contain placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub model_of_payment: Option<String>,
    /// Reference ("poziv na broj") template.
    #[serde(default, alias = "poziv_na_broj")]
    pub reference: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Contacts and their underage dependents as loaded from the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub underaged_members: Vec<UnderagedMember>,
}

impl Roster {
    pub fn contact(&self, id: u64) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Dependents of a contact in stored order.
    pub fn dependents(&self, contact_id: u64) -> Vec<UnderagedMember> {
        self.underaged_members
            .iter()
            .filter(|m| m.contact_id == contact_id)
            .cloned()
            .collect()
    }
}

pub(crate) fn join_non_blank(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

pub(crate) fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_default()
}
