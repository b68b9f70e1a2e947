//! HUB-3 payment slip ("uplatnica") data generation.
//!
//! A [`PaymentTemplate`] is resolved against a paying [`Contact`] (and, for
//! templates mentioning `{{underaged_attributes.*}}`, each of the contact's
//! member dependents) to produce [`Hub3Record`]s: the 14-line data string that
//! is encoded into the PDF417 barcode of a Croatian payment slip.
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use uplatnica::{BulkGenerator, Contact, NullSink, Organization, PaymentTemplate, Roster};
//!
//! let roster = Roster {
//!     contacts: vec![Contact {
//!         id: 1,
//!         first_name: "Ana".into(),
//!         last_name: "Horvat".into(),
//!         is_member: true,
//!         ..Default::default()
//!     }],
//!     underaged_members: vec![],
//! };
//! let template = PaymentTemplate {
//!     name: "Članarina".into(),
//!     description: "Članarina {{contact_attributes.first_name}}".into(),
//!     amount: Some(Decimal::new(2500, 2)),
//!     ..Default::default()
//! };
//! let organization = Organization {
//!     name: "Klub".into(),
//!     iban: "HR1210010051863000160".into(),
//!     ..Default::default()
//! };
//!
//! let report = BulkGenerator::new(template, organization)
//!     .run(&roster.contacts, &roster, &mut NullSink, |_| {})
//!     .unwrap();
//! let (_, record) = report.records().next().unwrap();
//! assert_eq!(record.fields().len(), 14);
//! ```

pub mod config;
pub mod currency;
pub mod error;
pub mod generator;
pub mod hub3;
pub mod model;
pub mod planner;
pub mod reference;
pub mod store;
pub mod template;

pub use error::{
    BatchError, EncodingError, Resolved, StoreError, TaskFailure, ValidationError, Warning,
};
pub use generator::{
    BatchHandle, BatchReport, BulkGenerator, CancellationToken, NullSink, Progress, RecordSink,
    TaskOutcome,
};
pub use hub3::{Hub3DataBuilder, Hub3Field, Hub3Record};
pub use model::{Contact, Organization, PaymentTemplate, Roster, UnderagedMember};
pub use planner::{DataSource, DependentSource, GenerationTask};
