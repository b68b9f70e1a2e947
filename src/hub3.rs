//! Assembly of the 14-line HUB-3 data string encoded into the PDF417 barcode.

use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

use crate::currency;
use crate::error::{Resolved, ValidationError};
use crate::model::{join_non_blank, Contact, Organization, PaymentTemplate, UnderagedMember};
use crate::planner::DataSource;
use crate::reference;
use crate::template;

/// Header identifying the HUB-3 layout.
pub const BANK_CODE: &str = "HRVHUB30";

pub const CURRENCY: &str = "EUR";

pub const FIELD_COUNT: usize = 14;

/// The fixed lines of a HUB-3 record, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hub3Field {
    BankCode,
    Currency,
    Amount,
    PayerName,
    PayerStreet,
    PayerCity,
    RecipientName,
    RecipientStreet,
    RecipientCity,
    RecipientIban,
    Model,
    Reference,
    PurposeCode,
    Description,
}

impl Hub3Field {
    pub const ALL: [Hub3Field; FIELD_COUNT] = [
        Hub3Field::BankCode,
        Hub3Field::Currency,
        Hub3Field::Amount,
        Hub3Field::PayerName,
        Hub3Field::PayerStreet,
        Hub3Field::PayerCity,
        Hub3Field::RecipientName,
        Hub3Field::RecipientStreet,
        Hub3Field::RecipientCity,
        Hub3Field::RecipientIban,
        Hub3Field::Model,
        Hub3Field::Reference,
        Hub3Field::PurposeCode,
        Hub3Field::Description,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A finished HUB-3 data string. Two records are equal when their text is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hub3Record {
    data: String,
}

impl Hub3Record {
    fn from_fields(fields: &[String; FIELD_COUNT]) -> Self {
        Self {
            data: fields.join("\n"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn fields(&self) -> Vec<&str> {
        self.data.split('\n').collect()
    }

    pub fn field(&self, field: Hub3Field) -> &str {
        self.data.split('\n').nth(field.index()).unwrap_or("")
    }

    /// Named values for the printable slip layout (`{{AMOUNT}}`, `{{PAYER_NAME}}`, ..).
    ///
    /// `BARCODE_BASE64` is not included; it is supplied by the barcode renderer.
    pub fn slip_values(&self) -> BTreeMap<&'static str, String> {
        let value = |field| self.field(field).to_string();
        BTreeMap::from([
            ("AMOUNT", currency::to_display(self.field(Hub3Field::Amount))),
            ("CURRENCY", value(Hub3Field::Currency)),
            ("PAYER_NAME", value(Hub3Field::PayerName)),
            ("PAYER_ADDRESS", value(Hub3Field::PayerStreet)),
            ("PAYER_CITY", value(Hub3Field::PayerCity)),
            ("RECIPIENT_NAME", value(Hub3Field::RecipientName)),
            ("RECIPIENT_ADDRESS", value(Hub3Field::RecipientStreet)),
            ("RECIPIENT_CITY", value(Hub3Field::RecipientCity)),
            ("RECIPIENT_IBAN", value(Hub3Field::RecipientIban)),
            ("MODEL", value(Hub3Field::Model)),
            ("REFERENCE", value(Hub3Field::Reference)),
            ("DESCRIPTION", value(Hub3Field::Description)),
        ])
    }
}

impl fmt::Display for Hub3Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

/// Checks the inputs shared by every record of a run.
pub fn validate(
    template: &PaymentTemplate,
    organization: &Organization,
    amount_override: Option<Decimal>,
) -> Result<Decimal, ValidationError> {
    if organization.iban.trim().is_empty() {
        return Err(ValidationError::MissingIban);
    }
    let amount = amount_override
        .or(template.amount)
        .ok_or_else(|| ValidationError::MissingAmount(template.name.clone()))?;
    currency::for_hub3(amount)?;
    Ok(amount)
}

/// Builds HUB-3 records for one payment template and recipient.
#[derive(Debug, Clone)]
pub struct Hub3DataBuilder<'a> {
    template: &'a PaymentTemplate,
    organization: &'a Organization,
    amount_override: Option<Decimal>,
}

impl<'a> Hub3DataBuilder<'a> {
    pub fn new(template: &'a PaymentTemplate, organization: &'a Organization) -> Self {
        Self {
            template,
            organization,
            amount_override: None,
        }
    }

    /// Uses `amount` instead of the template amount.
    pub fn with_amount(mut self, amount: Option<Decimal>) -> Self {
        self.amount_override = amount;
        self
    }

    /// Builds the record for `payer`, taking dependent attributes from `source`.
    pub fn build(
        &self,
        payer: &Contact,
        source: &DataSource,
    ) -> Result<Resolved<Hub3Record>, ValidationError> {
        let amount = validate(self.template, self.organization, self.amount_override)?;
        let payer_name = payer.full_name();
        if payer_name.is_empty() {
            return Err(ValidationError::MissingPayerName(payer.id));
        }
        let dependent: Option<&UnderagedMember> = source.dependent();

        let reference = reference::resolve_reference(&self.template.reference, payer, dependent);
        let description = template::resolve(&self.template.description, payer, dependent);

        let org = self.organization;
        let fields = [
            BANK_CODE.to_string(),
            CURRENCY.to_string(),
            currency::for_hub3(amount)?,
            payer_name,
            join_non_blank(
                &[
                    payer.street_name.as_deref().unwrap_or(""),
                    payer.street_num.as_deref().unwrap_or(""),
                ],
                " ",
            ),
            postal_and_city(
                payer.postal_code.as_deref().unwrap_or(""),
                payer.city.as_deref().unwrap_or(""),
            ),
            org.name.clone(),
            join_non_blank(&[org.street_name.as_str(), org.street_num.as_str()], " "),
            postal_and_city(&org.postal_code, &org.city),
            org.iban.trim().to_string(),
            self.template.model_of_payment.clone().unwrap_or_default(),
            reference.value,
            String::new(),
            description.value,
        ]
        .map(|field| single_line(&field));

        let mut warnings = reference.warnings;
        warnings.extend(description.warnings);
        debug!("Built HUB-3 record for contact {}", payer.id);
        Ok(Resolved::with_warnings(
            Hub3Record::from_fields(&fields),
            warnings,
        ))
    }
}

fn postal_and_city(postal_code: &str, city: &str) -> String {
    if postal_code.trim().is_empty() {
        city.trim().to_string()
    } else {
        join_non_blank(&[postal_code, city], " ")
    }
}

fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], " ")
}
