//! Payment reference ("poziv na broj") resolution.
//!
//! A reference template is one of:
//! - empty: a reference is synthesised from the contact id plus a MOD11 check digit,
//! - a single placeholder: only the contact's or the dependent's `pin` is accepted,
//! - literal text: the legacy `{contact_id}` token is substituted.
//!
//! Whatever the source, the resolved reference is digits only. A non-numeric
//! result is replaced by the contact id and reported as a [`Warning`].

use log::warn;

use crate::error::{Resolved, Warning};
use crate::model::{Contact, UnderagedMember};
use crate::template::{self, ContactField, Placeholder, UnderagedField};

/// Legacy token substituted in literal reference templates.
pub const CONTACT_ID_TOKEN: &str = "{contact_id}";

/// Width of the zero-padded base of an auto-generated reference.
pub const AUTO_REFERENCE_BASE_WIDTH: usize = 10;

/// Weighted modulo-11 check digit of a digit string.
///
/// Digits are weighted right to left with 2, 3, .., 7, 2, 3, ..; non-digits are skipped.
pub fn mod11_check_digit(base: &str) -> u32 {
    let mut weight = 2;
    let mut sum = 0;
    for digit in base.chars().rev().filter_map(|c| c.to_digit(10)) {
        sum += digit * weight;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Contact id padded to ten digits followed by its check digit.
pub fn auto_reference(contact_id: u64) -> String {
    let base = format!("{:0>width$}", contact_id, width = AUTO_REFERENCE_BASE_WIDTH);
    let check = mod11_check_digit(&base);
    format!("{}{}", base, check)
}

fn is_numeric(reference: &str) -> bool {
    reference.chars().all(|c| c.is_ascii_digit())
}

/// Resolves the reference line for a payer and optional dependent.
pub fn resolve_reference(
    reference_template: &str,
    contact: &Contact,
    dependent: Option<&UnderagedMember>,
) -> Resolved<String> {
    let reference_template = reference_template.trim();
    if reference_template.is_empty() {
        return Resolved::new(auto_reference(contact.id));
    }

    let mut warnings = Vec::new();
    let resolved = match template::parse_single(reference_template) {
        Some(Ok(Placeholder::ContactAttribute(ContactField::Pin))) => {
            ContactField::Pin.value(contact).trim().to_string()
        }
        Some(Ok(placeholder @ Placeholder::UnderagedAttribute(UnderagedField::Pin))) => {
            match placeholder.resolve(contact, dependent) {
                Ok(pin) => pin.trim().to_string(),
                Err(warning) => {
                    warnings.push(warning);
                    String::new()
                }
            }
        }
        Some(_) => {
            warnings.push(Warning::UnsupportedReferencePlaceholder(
                reference_template.to_string(),
            ));
            String::new()
        }
        None => reference_template.replace(CONTACT_ID_TOKEN, &contact.id.to_string()),
    };

    let value = if is_numeric(&resolved) {
        resolved
    } else {
        let fallback = contact.id.to_string();
        warnings.push(Warning::NonNumericReference {
            resolved,
            fallback: fallback.clone(),
        });
        fallback
    };

    for warning in &warnings {
        warn!("Reference for contact {}: {}", contact.id, warning);
    }
    Resolved::with_warnings(value, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: u64, pin: Option<&str>) -> Contact {
        Contact {
            id,
            first_name: "Ivo".into(),
            last_name: "Ivić".into(),
            pin: pin.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_mod11_check_digit() {
        // 9*2 + 6*3 + 2*4 + 7*5 = 79, 79 % 11 = 2
        assert_eq!(mod11_check_digit("0000007269"), 9);
        // 5*2 + 4*3 + 3*4 + 2*5 + 1*6 = 50, 50 % 11 = 6
        assert_eq!(mod11_check_digit("0000012345"), 5);
        // weights wrap after 7: 8*2 + 7*3 + 6*4 + 5*5 + 4*6 + 3*7 + 2*2 + 1*3 = 138
        assert_eq!(mod11_check_digit("0012345678"), 5);
    }

    #[test]
    fn test_mod11_small_remainder_gives_zero() {
        // 8*2 + 2*3 = 22, divisible by 11
        assert_eq!(mod11_check_digit("0000000028"), 0);
        // 6*2 = 12, remainder 1
        assert_eq!(mod11_check_digit("0000000006"), 0);
    }

    #[test]
    fn test_auto_reference() {
        assert_eq!(auto_reference(7269), "00000072699");
        assert_eq!(auto_reference(28), "00000000280");
        assert_eq!(auto_reference(1), "00000000019");
    }

    #[test]
    fn test_empty_template_generates_reference() {
        let resolved = resolve_reference("  ", &contact(7269, None), None);
        assert_eq!(resolved.value, "00000072699");
        assert!(resolved.is_clean());
    }

    #[test]
    fn test_contact_pin_placeholder() {
        let resolved = resolve_reference(
            "{{contact_attributes.pin}}",
            &contact(3, Some("12345678901")),
            None,
        );
        assert_eq!(resolved.value, "12345678901");
        assert!(resolved.is_clean());

        let resolved = resolve_reference("{{contact_attributes.pin}}", &contact(3, None), None);
        assert_eq!(resolved.value, "");
    }

    #[test]
    fn test_underaged_pin_placeholder() {
        let child = UnderagedMember {
            id: 4,
            pin: Some("98765432109".into()),
            contact_id: 3,
            ..Default::default()
        };
        let resolved = resolve_reference(
            "{{underaged_attributes.pin}}",
            &contact(3, Some("1")),
            Some(&child),
        );
        assert_eq!(resolved.value, "98765432109");

        let resolved = resolve_reference("{{underaged_attributes.pin}}", &contact(3, None), None);
        assert_eq!(resolved.value, "");
        assert_eq!(
            resolved.warnings,
            vec![Warning::MissingDependent("pin".into())]
        );
    }

    #[test]
    fn test_unsupported_placeholder_is_empty() {
        let resolved = resolve_reference(
            "{{contact_attributes.first_name}}",
            &contact(3, None),
            None,
        );
        assert_eq!(resolved.value, "");
        assert!(matches!(
            resolved.warnings.as_slice(),
            [Warning::UnsupportedReferencePlaceholder(_)]
        ));
    }

    #[test]
    fn test_literal_with_contact_id_token() {
        let resolved = resolve_reference("2024{contact_id}", &contact(42, None), None);
        assert_eq!(resolved.value, "202442");
        assert!(resolved.is_clean());
    }

    #[test]
    fn test_non_numeric_literal_falls_back_to_contact_id() {
        let resolved = resolve_reference("CLAN-{contact_id}", &contact(42, None), None);
        assert_eq!(resolved.value, "42");
        assert_eq!(
            resolved.warnings,
            vec![Warning::NonNumericReference {
                resolved: "CLAN-42".into(),
                fallback: "42".into()
            }]
        );
    }

    #[test]
    fn test_non_numeric_pin_falls_back_to_contact_id() {
        let resolved = resolve_reference(
            "{{contact_attributes.pin}}",
            &contact(7, Some("12 34")),
            None,
        );
        assert_eq!(resolved.value, "7");
    }
}
