use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::error::StoreError;
use crate::model::{Organization, PaymentTemplate, Roster};
use crate::store;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub organization: Organization,
    #[serde(default)]
    pub templates: Vec<PaymentTemplate>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "hub3".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown payment template: {0}")]
    UnknownTemplate(String),
    #[error("Payment template is not active: {0}")]
    InactiveTemplate(String),
    #[error("No payment template selected")]
    NoTemplate,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Looks up a template by name. Inactive templates are refused unless `include_inactive`.
    pub fn template(
        &self,
        name: &str,
        include_inactive: bool,
    ) -> Result<&PaymentTemplate, ConfigError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))?;
        if !template.active && !include_inactive {
            return Err(ConfigError::InactiveTemplate(name.to_string()));
        }
        Ok(template)
    }

    /// The template named in the config, or else the one saved at `file`.
    pub fn select_template(
        &self,
        name: Option<&str>,
        file: Option<&Path>,
        include_inactive: bool,
    ) -> Result<PaymentTemplate, ConfigError> {
        match (name, file) {
            (Some(name), _) => Ok(self.template(name, include_inactive)?.clone()),
            (None, Some(file)) => {
                let template = store::load(file)?;
                if !template.active && !include_inactive {
                    return Err(ConfigError::InactiveTemplate(template.name));
                }
                Ok(template)
            }
            (None, None) => Err(ConfigError::NoTemplate),
        }
    }

    pub fn active_templates(&self) -> impl Iterator<Item = &PaymentTemplate> {
        self.templates.iter().filter(|t| t.active)
    }
}

/// Loads contacts and underage members from a JSON data file.
pub fn load_roster(path: &Path) -> Result<Roster, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let roster: Roster = serde_json::from_str(&content)?;
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
organization:
  name: "Udruga Mladi tehničari"
  iban: "HR1210010051863000160"
  street_name: "Savska"
  street_num: "12"
  postal_code: "10000"
  city: "Zagreb"
templates:
  - name: "Članarina"
    description: "Članarina {{contact_attributes.first_name}}"
    amount: "25.00"
    model_of_payment: "HR00"
    reference: "{{contact_attributes.pin}}"
  - name: "Stara radionica"
    amount: 10
    active: false
"#;

    #[test]
    fn test_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.organization.city, "Zagreb");
        assert_eq!(config.output.extension, "hub3");
        assert_eq!(config.templates.len(), 2);

        let template = config.template("Članarina", false).unwrap();
        assert_eq!(template.amount, Some(dec!(25.00)));
        assert!(template.active);
        assert_eq!(config.active_templates().count(), 1);
    }

    #[test]
    fn test_template_lookup_errors() {
        let config: AppConfig = serde_yaml::from_str(CONFIG).unwrap();
        assert!(matches!(
            config.template("Nepostojeći", false),
            Err(ConfigError::UnknownTemplate(_))
        ));
        assert!(matches!(
            config.template("Stara radionica", false),
            Err(ConfigError::InactiveTemplate(_))
        ));
        assert!(config.template("Stara radionica", true).is_ok());
    }

    #[test]
    fn test_select_template() {
        let config: AppConfig = serde_yaml::from_str(CONFIG).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("stara.properties");
        let saved = config.template("Stara radionica", true).unwrap();
        store::save(&path, saved).unwrap();

        let by_name = config.select_template(Some("Članarina"), None, false).unwrap();
        assert_eq!(by_name.name, "Članarina");
        assert!(matches!(
            config.select_template(Some("Stara radionica"), None, false),
            Err(ConfigError::InactiveTemplate(_))
        ));
        assert!(matches!(
            config.select_template(None, Some(&path), false),
            Err(ConfigError::InactiveTemplate(_))
        ));
        let from_file = config.select_template(None, Some(&path), true).unwrap();
        assert_eq!(from_file.amount, Some(dec!(10)));
        assert!(matches!(
            config.select_template(None, None, false),
            Err(ConfigError::NoTemplate)
        ));
    }

    #[test]
    fn test_load_roster() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{
  "contacts": [
    {"id": 1, "first_name": "Ana", "last_name": "Horvat", "pin": "12345678901",
     "is_member": true, "member_since": "2023-09-01"}
  ],
  "underaged_members": [
    {"id": 7, "first_name": "Luka", "last_name": "Horvat", "age": 9,
     "is_member": true, "contact_id": 1}
  ]
}"#,
        )
        .unwrap();
        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.contacts.len(), 1);
        assert_eq!(roster.dependents(1).len(), 1);
        assert!(roster.contact(1).unwrap().is_member());
    }

    #[test]
    fn test_load_missing_config() {
        let result = AppConfig::load(Path::new("does/not/exist.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
