//! Saving and loading payment template form state as `key=value` lines.
//!
//! ```txt
//! # uplatnica template
//! name=Članarina
//! description=Članarina za {{contact_attributes.first_name}}
//! amount=25.00
//! model_of_payment=HR00
//! reference={{contact_attributes.pin}}
//! active=true
//! ```

use log::{debug, info};
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::StoreError;
use crate::model::PaymentTemplate;

const HEADER: &str = "# uplatnica template";

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Serializes a template into the key/value form.
pub fn to_string(template: &PaymentTemplate) -> String {
    let amount = template.amount.map(|a| a.to_string()).unwrap_or_default();
    let model = template.model_of_payment.as_deref().unwrap_or("");
    let mut content = [
        HEADER.to_string(),
        format!("name={}", escape(&template.name)),
        format!("description={}", escape(&template.description)),
        format!("amount={}", amount),
        format!("model_of_payment={}", escape(model)),
        format!("reference={}", escape(&template.reference)),
        format!("active={}", template.active),
    ]
    .join("\n");
    content.push('\n');
    content
}

/// Parses the key/value form. Unknown keys are ignored.
pub fn from_str(content: &str) -> Result<PaymentTemplate, StoreError> {
    let mut template = PaymentTemplate {
        active: true,
        ..Default::default()
    };
    for (number, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (key, value) = trimmed.split_once('=').ok_or_else(|| StoreError::Malformed {
            line: number + 1,
            content: line.to_string(),
        })?;
        let value = unescape(value);
        match key.trim() {
            "name" => template.name = value,
            "description" => template.description = value,
            "amount" => {
                template.amount = if value.trim().is_empty() {
                    None
                } else {
                    let normalized = value.trim().replace(',', ".");
                    Some(
                        Decimal::from_str(&normalized)
                            .map_err(|_| StoreError::InvalidAmount(value.clone()))?,
                    )
                }
            }
            "model_of_payment" => {
                template.model_of_payment = Some(value).filter(|v| !v.is_empty())
            }
            "reference" | "poziv_na_broj" => template.reference = value,
            "active" => {
                template.active = match value.trim() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(StoreError::InvalidFlag(value)),
                }
            }
            other => debug!("Ignoring unknown template key '{}'", other),
        }
    }
    Ok(template)
}

pub fn save(path: &Path, template: &PaymentTemplate) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_string(template))?;
    info!("Saved template '{}' to {:?}", template.name, path);
    Ok(())
}

pub fn load(path: &Path) -> Result<PaymentTemplate, StoreError> {
    let content = fs::read_to_string(path)?;
    let template = from_str(&content)?;
    info!("Loaded template '{}' from {:?}", template.name, path);
    Ok(template)
}
