use log::debug;

use crate::model::{Contact, PaymentTemplate, Roster, UnderagedMember};
use crate::template;

/// Supplies the underage dependents of a contact, in stored order.
pub trait DependentSource {
    fn dependents_of(&self, contact: &Contact) -> Vec<UnderagedMember>;
}

impl DependentSource for Roster {
    fn dependents_of(&self, contact: &Contact) -> Vec<UnderagedMember> {
        self.dependents(contact.id)
    }
}

impl<F> DependentSource for F
where
    F: Fn(&Contact) -> Vec<UnderagedMember>,
{
    fn dependents_of(&self, contact: &Contact) -> Vec<UnderagedMember> {
        self(contact)
    }
}

/// Where template attributes are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Contact,
    Dependent(UnderagedMember),
}

impl DataSource {
    pub fn dependent(&self) -> Option<&UnderagedMember> {
        match self {
            DataSource::Contact => None,
            DataSource::Dependent(member) => Some(member),
        }
    }
}

/// One record to generate: the paying contact and the attribute source.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub index: usize,
    pub payer: Contact,
    pub source: DataSource,
}

impl GenerationTask {
    /// Short label used for logs and output file names.
    pub fn label(&self) -> String {
        match &self.source {
            DataSource::Contact => format!("{}", self.payer.id),
            DataSource::Dependent(member) => format!("{}_{}", self.payer.id, member.id),
        }
    }
}

/// Whether the template's description or reference refers to a dependent.
pub fn is_dependent_aware(template: &PaymentTemplate) -> bool {
    template::mentions_underaged(&template.description)
        || template::mentions_underaged(&template.reference)
}

/// Decides how many records each contact gets.
///
/// For a dependent-aware template every member dependent of a contact gets its
/// own task; a member contact without member dependents gets a single task.
/// Otherwise each member contact gets exactly one task. Non-members get none.
pub fn plan<S: DependentSource + ?Sized>(
    contacts: &[Contact],
    template: &PaymentTemplate,
    source: &S,
) -> Vec<GenerationTask> {
    let dependent_aware = is_dependent_aware(template);
    let mut tasks = Vec::new();
    let mut push = |payer: &Contact, data: DataSource| {
        tasks.push(GenerationTask {
            index: tasks.len(),
            payer: payer.clone(),
            source: data,
        });
    };

    for contact in contacts {
        if dependent_aware {
            let members: Vec<UnderagedMember> = source
                .dependents_of(contact)
                .into_iter()
                .filter(UnderagedMember::is_member)
                .collect();
            if !members.is_empty() {
                for member in members {
                    push(contact, DataSource::Dependent(member));
                }
                continue;
            }
        }
        if contact.is_member() {
            push(contact, DataSource::Contact);
        } else {
            debug!("Skipping contact {}: not a member", contact.id);
        }
    }
    tasks
}
