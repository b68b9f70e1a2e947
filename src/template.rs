//! The `{{kind.arg}}` placeholder language used in payment template text.
//!
//! Three kinds exist: `contact_attributes.<attr>`, `underaged_attributes.<attr>`
//! and `custom_text.<literal>`. Attributes are restricted to fixed allow-lists;
//! anything else resolves to an empty string and raises a [`Warning`].

use log::warn;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Resolved, Warning};
use crate::model::{format_date, Contact, UnderagedMember};

/// Prefix that marks a template as referring to a dependent.
pub const UNDERAGED_PREFIX: &str = "{{underaged_attributes.";

const PLACEHOLDER_PATTERN: &str = r"\{\{(?P<kind>[A-Za-z_]+)\.(?P<arg>[^{}]*)\}\}";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
    PhoneNum,
    Birthday,
    Pin,
    StreetName,
    StreetNum,
    PostalCode,
    City,
    MemberSince,
    MemberUntil,
}

impl ContactField {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "email" => Self::Email,
            "phone_num" => Self::PhoneNum,
            "birthday" => Self::Birthday,
            "pin" => Self::Pin,
            "street_name" => Self::StreetName,
            "street_num" => Self::StreetNum,
            "postal_code" => Self::PostalCode,
            "city" => Self::City,
            "member_since" => Self::MemberSince,
            "member_until" => Self::MemberUntil,
            _ => return None,
        })
    }

    pub fn value(self, contact: &Contact) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Self::FirstName => contact.first_name.clone(),
            Self::LastName => contact.last_name.clone(),
            Self::Email => text(&contact.email),
            Self::PhoneNum => text(&contact.phone_num),
            Self::Birthday => format_date(contact.birthday),
            Self::Pin => text(&contact.pin),
            Self::StreetName => text(&contact.street_name),
            Self::StreetNum => text(&contact.street_num),
            Self::PostalCode => text(&contact.postal_code),
            Self::City => text(&contact.city),
            Self::MemberSince => format_date(contact.member_since),
            Self::MemberUntil => format_date(contact.member_until),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderagedField {
    FirstName,
    LastName,
    BirthDate,
    Age,
    Pin,
    Gender,
    IsMember,
    MemberSince,
    MemberUntil,
    Note,
}

impl UnderagedField {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "birth_date" => Self::BirthDate,
            "age" => Self::Age,
            "pin" => Self::Pin,
            "gender" => Self::Gender,
            "is_member" => Self::IsMember,
            "member_since" => Self::MemberSince,
            "member_until" => Self::MemberUntil,
            "note" => Self::Note,
            _ => return None,
        })
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::BirthDate => "birth_date",
            Self::Age => "age",
            Self::Pin => "pin",
            Self::Gender => "gender",
            Self::IsMember => "is_member",
            Self::MemberSince => "member_since",
            Self::MemberUntil => "member_until",
            Self::Note => "note",
        }
    }

    pub fn value(self, member: &UnderagedMember) -> String {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Self::FirstName => member.first_name.clone(),
            Self::LastName => member.last_name.clone(),
            Self::BirthDate => format_date(member.birth_date),
            Self::Age => member.age.map(|a| a.to_string()).unwrap_or_default(),
            Self::Pin => text(&member.pin),
            Self::Gender => text(&member.gender),
            Self::IsMember => member.is_member.to_string(),
            Self::MemberSince => format_date(member.member_since),
            Self::MemberUntil => format_date(member.member_until),
            Self::Note => text(&member.note),
        }
    }
}

/// A single recognised placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    ContactAttribute(ContactField),
    UnderagedAttribute(UnderagedField),
    CustomText(String),
}

impl Placeholder {
    /// Interprets the `kind` and `arg` halves of a `{{kind.arg}}` token.
    pub fn parse(kind: &str, arg: &str) -> Result<Self, Warning> {
        let unknown = || Warning::UnknownAttribute {
            kind: kind.to_string(),
            attribute: arg.to_string(),
        };
        match kind {
            "contact_attributes" => ContactField::from_key(arg.trim())
                .map(Self::ContactAttribute)
                .ok_or_else(unknown),
            "underaged_attributes" => UnderagedField::from_key(arg.trim())
                .map(Self::UnderagedAttribute)
                .ok_or_else(unknown),
            "custom_text" => Ok(Self::CustomText(arg.to_string())),
            _ => Err(Warning::UnknownKind(kind.to_string())),
        }
    }

    /// Value of the placeholder for a payer and optional dependent.
    pub fn resolve(
        &self,
        contact: &Contact,
        dependent: Option<&UnderagedMember>,
    ) -> Result<String, Warning> {
        match self {
            Self::ContactAttribute(field) => Ok(field.value(contact)),
            Self::UnderagedAttribute(field) => dependent
                .map(|m| field.value(m))
                .ok_or_else(|| Warning::MissingDependent(field.key().to_string())),
            Self::CustomText(text) => Ok(text.clone()),
        }
    }
}

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Placeholder(Placeholder),
    Invalid(Warning),
}

/// Splits a template into literal text and placeholders, left to right.
pub fn parse(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last_end = 0;
    for cap in placeholder_regex().captures_iter(template) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.start() > last_end {
            segments.push(Segment::Text(&template[last_end..whole.start()]));
        }
        let kind = cap.name("kind").map_or("", |m| m.as_str());
        let arg = cap.name("arg").map_or("", |m| m.as_str());
        segments.push(match Placeholder::parse(kind, arg) {
            Ok(placeholder) => Segment::Placeholder(placeholder),
            Err(warning) => Segment::Invalid(warning),
        });
        last_end = whole.end();
    }
    if last_end < template.len() {
        segments.push(Segment::Text(&template[last_end..]));
    }
    segments
}

/// Parses a template consisting of exactly one placeholder and nothing else.
pub fn parse_single(template: &str) -> Option<Result<Placeholder, Warning>> {
    let trimmed = template.trim();
    let cap = placeholder_regex().captures(trimmed)?;
    let whole = cap.get(0)?;
    if whole.start() != 0 || whole.end() != trimmed.len() {
        return None;
    }
    let kind = cap.name("kind").map_or("", |m| m.as_str());
    let arg = cap.name("arg").map_or("", |m| m.as_str());
    Some(Placeholder::parse(kind, arg))
}

/// Whether the text refers to an underage member's attributes.
pub fn mentions_underaged(text: &str) -> bool {
    text.contains(UNDERAGED_PREFIX)
}

/// Resolves every placeholder in `template` and trims the result.
///
/// Never fails: unknown or inapplicable placeholders become empty strings and
/// are reported in [`Resolved::warnings`].
pub fn resolve(
    template: &str,
    contact: &Contact,
    dependent: Option<&UnderagedMember>,
) -> Resolved<String> {
    let mut output = String::with_capacity(template.len());
    let mut warnings = Vec::new();
    for segment in parse(template) {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Placeholder(placeholder) => match placeholder.resolve(contact, dependent) {
                Ok(value) => output.push_str(&value),
                Err(warning) => warnings.push(warning),
            },
            Segment::Invalid(warning) => warnings.push(warning),
        }
    }
    for warning in &warnings {
        warn!("Template for contact {}: {}", contact.id, warning);
    }
    Resolved::with_warnings(output.trim().to_string(), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ana() -> Contact {
        Contact {
            id: 1,
            first_name: "Ana".into(),
            last_name: "Horvat".into(),
            city: Some("Zagreb".into()),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 31),
            ..Default::default()
        }
    }

    fn luka() -> UnderagedMember {
        UnderagedMember {
            id: 10,
            first_name: "Luka".into(),
            last_name: "Horvat".into(),
            age: Some(9),
            is_member: true,
            contact_id: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_contact_attribute() {
        let resolved = resolve("Fee for {{contact_attributes.first_name}}", &ana(), None);
        assert_eq!(resolved.value, "Fee for Ana");
        assert!(resolved.is_clean());
    }

    #[test]
    fn test_resolve_unknown_attribute_is_empty() {
        let resolved = resolve("{{contact_attributes.unknown_field}}", &ana(), None);
        assert_eq!(resolved.value, "");
        assert_eq!(
            resolved.warnings,
            vec![Warning::UnknownAttribute {
                kind: "contact_attributes".into(),
                attribute: "unknown_field".into()
            }]
        );
    }

    #[test]
    fn test_resolve_underaged_without_dependent() {
        let resolved = resolve(
            "Trening {{underaged_attributes.first_name}}",
            &ana(),
            None,
        );
        assert_eq!(resolved.value, "Trening");
        assert_eq!(
            resolved.warnings,
            vec![Warning::MissingDependent("first_name".into())]
        );
    }

    #[test]
    fn test_resolve_underaged_with_dependent() {
        let child = luka();
        let resolved = resolve(
            "{{underaged_attributes.first_name}} ({{underaged_attributes.age}}), {{contact_attributes.city}}",
            &ana(),
            Some(&child),
        );
        assert_eq!(resolved.value, "Luka (9), Zagreb");
    }

    #[test]
    fn test_resolve_custom_text_and_dates() {
        let resolved = resolve(
            "  {{custom_text.Članarina 2024.}} {{contact_attributes.birthday}}  ",
            &ana(),
            None,
        );
        assert_eq!(resolved.value, "Članarina 2024. 31.01.1990.");
    }

    #[test]
    fn test_resolve_unknown_kind_and_unclosed_token() {
        let resolved = resolve("{{foo.bar}} x {{contact_attributes.first_name", &ana(), None);
        assert_eq!(resolved.value, "x {{contact_attributes.first_name");
        assert_eq!(resolved.warnings, vec![Warning::UnknownKind("foo".into())]);
    }

    #[test]
    fn test_parse_segments() {
        let segments = parse("a{{contact_attributes.pin}}b");
        assert_eq!(
            segments,
            vec![
                Segment::Text("a"),
                Segment::Placeholder(Placeholder::ContactAttribute(ContactField::Pin)),
                Segment::Text("b"),
            ]
        );
    }

    #[test]
    fn test_parse_single() {
        assert_eq!(
            parse_single(" {{underaged_attributes.pin}} "),
            Some(Ok(Placeholder::UnderagedAttribute(UnderagedField::Pin)))
        );
        assert_eq!(parse_single("HR{{contact_attributes.pin}}"), None);
        assert_eq!(parse_single("12345"), None);
    }

    #[test]
    fn test_mentions_underaged() {
        assert!(mentions_underaged("x {{underaged_attributes.note}}"));
        assert!(!mentions_underaged("{{contact_attributes.first_name}}"));
    }
}
