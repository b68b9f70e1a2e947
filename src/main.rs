use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use uplatnica::config::{self, AppConfig};
use uplatnica::{
    reference, store, BulkGenerator, Contact, EncodingError, GenerationTask, Hub3Record,
    NullSink, RecordSink, Roster,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the JSON contact data file
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Output directory for generated records
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Dry run mode - don't write files
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a sample configuration and data file
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Generate HUB-3 records for all selected contacts
    Generate {
        /// Name of a template from the configuration
        #[arg(short, long, conflicts_with = "template_file")]
        template: Option<String>,
        /// Template saved with `save-template`
        #[arg(long)]
        template_file: Option<PathBuf>,
        /// Restrict generation to these contact ids
        #[arg(long = "contact")]
        contacts: Vec<u64>,
        /// Use this amount instead of the template amount
        #[arg(long)]
        amount: Option<Decimal>,
        /// Allow templates marked inactive
        #[arg(long)]
        include_inactive: bool,
    },
    /// Print the records of a single contact
    Preview {
        #[arg(short, long)]
        template: String,
        #[arg(long = "contact")]
        contact: u64,
    },
    /// Print the auto-generated reference number of a contact id
    Reference {
        #[arg(long)]
        contact_id: u64,
    },
    /// Store a configured template in the key/value form format
    SaveTemplate {
        #[arg(short, long)]
        template: String,
        #[arg(long)]
        file: PathBuf,
    },
}

/// Writes each record to its own file in the output directory.
struct FileSink {
    directory: PathBuf,
    extension: String,
    dry_run: bool,
}

impl RecordSink for FileSink {
    fn accept(&mut self, task: &GenerationTask, record: &Hub3Record) -> Result<(), EncodingError> {
        let path = self.directory.join(format!(
            "{:04}_{}.{}",
            task.index + 1,
            task.label(),
            self.extension
        ));
        if self.dry_run {
            info!("[DRY RUN] Would write: {:?}", path);
            return Ok(());
        }
        fs::write(&path, record.as_str()).map_err(|e| {
            error!("Failed to write record to file: {:?}", path);
            EncodingError::new(e.to_string())
        })?;
        info!("{:?}", path);
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => init_project(path),
        Commands::Generate {
            template,
            template_file,
            contacts,
            amount,
            include_inactive,
        } => generate(
            &cli,
            template.as_deref(),
            template_file.as_deref(),
            contacts,
            *amount,
            *include_inactive,
        ),
        Commands::Preview { template, contact } => preview(&cli, template, *contact),
        Commands::Reference { contact_id } => {
            println!("{}", reference::auto_reference(*contact_id));
            Ok(())
        }
        Commands::SaveTemplate { template, file } => {
            let config = load_config(&cli)?;
            let template = config.template(template, true)?;
            store::save(file, template).context("Failed to save template")?;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config_path = cli
        .config
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("--config is required"))?;
    info!("Loading config from {:?}", config_path);
    AppConfig::load(config_path).context("Failed to load config")
}

fn load_roster(cli: &Cli) -> Result<Roster> {
    let data_path = cli
        .data
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("--data is required"))?;
    info!("Loading contacts from {:?}", data_path);
    config::load_roster(data_path).context("Failed to load contact data")
}

fn init_project(path: &Path) -> Result<()> {
    info!("Initializing uplatnica project at {:?}", path);

    fs::create_dir_all(path.join("output"))?;

    let config_content = r#"organization:
  name: "Sportski klub Primjer"
  iban: "HR1210010051863000160"
  street_name: "Ilica"
  street_num: "1"
  postal_code: "10000"
  city: "Zagreb"

templates:
  - name: "Članarina"
    description: "Članarina {{contact_attributes.first_name}} {{contact_attributes.last_name}}"
    amount: "25.00"
    model_of_payment: "HR00"
    reference: "{{contact_attributes.pin}}"
  - name: "Radionica"
    description: "Radionica {{underaged_attributes.first_name}}"
    amount: "40.00"
    model_of_payment: "HR01"
    reference: ""

output:
  extension: "hub3"
"#;
    fs::write(path.join("config.yaml"), config_content)?;

    let data_content = r#"{
  "contacts": [
    {"id": 1, "first_name": "Ana", "last_name": "Horvat", "pin": "12345678901",
     "street_name": "Ilica", "street_num": "10", "postal_code": "10000", "city": "Zagreb",
     "is_member": true}
  ],
  "underaged_members": [
    {"id": 1, "first_name": "Luka", "last_name": "Horvat", "age": 9,
     "is_member": true, "contact_id": 1}
  ]
}
"#;
    fs::write(path.join("data.json"), data_content)?;

    info!("✓ Project initialized successfully!");
    info!("  Run: uplatnica -c config.yaml -d data.json -o output generate -t Članarina");

    Ok(())
}

fn select_contacts(roster: &Roster, ids: &[u64]) -> Vec<Contact> {
    if ids.is_empty() {
        return roster.contacts.clone();
    }
    for id in ids {
        if roster.contact(*id).is_none() {
            warn!("Contact {} not found in data file", id);
        }
    }
    roster
        .contacts
        .iter()
        .filter(|c| ids.contains(&c.id))
        .cloned()
        .collect()
}

fn generate(
    cli: &Cli,
    template_name: Option<&str>,
    template_file: Option<&Path>,
    contact_ids: &[u64],
    amount: Option<Decimal>,
    include_inactive: bool,
) -> Result<()> {
    let config = load_config(cli)?;
    let roster = load_roster(cli)?;

    let template = config
        .select_template(template_name, template_file, include_inactive)
        .context("Failed to select payment template")?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("output"));
    if cli.dry_run {
        info!("=== DRY RUN MODE ===");
    } else {
        fs::create_dir_all(&output)
            .with_context(|| format!("Failed to create output directory {:?}", output))?;
    }

    let contacts = select_contacts(&roster, contact_ids);
    let mut sink = FileSink {
        directory: output,
        extension: config.output.extension.clone(),
        dry_run: cli.dry_run,
    };

    let report = BulkGenerator::new(template, config.organization.clone())
        .with_amount(amount)
        .run(&contacts, &roster, &mut sink, |progress| {
            info!("[{}/{}]", progress.current, progress.total);
        })
        .context("Generation did not start")?;

    for (task, failure) in report.failures() {
        error!("{} ({}): {}", task.label(), task.payer.full_name(), failure);
    }
    info!(
        "Done: {} of {} record(s) generated, {} failed",
        report.succeeded(),
        report.total,
        report.failed()
    );

    if cli.dry_run {
        info!("=== DRY RUN COMPLETE ===");
    }
    Ok(())
}

fn preview(cli: &Cli, template_name: &str, contact_id: u64) -> Result<()> {
    let config = load_config(cli)?;
    let roster = load_roster(cli)?;
    let template = config.template(template_name, true)?.clone();
    let contact = roster
        .contact(contact_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Contact {} not found", contact_id))?;

    let report = BulkGenerator::new(template, config.organization.clone())
        .run(&[contact], &roster, &mut NullSink, |_| {})
        .context("Preview failed")?;

    if report.outcomes.is_empty() {
        println!("No records for contact {} (not a member)", contact_id);
    }
    for outcome in &report.outcomes {
        println!("--- {} ---", outcome.task.label());
        match &outcome.result {
            Ok(record) => println!("{}", record),
            Err(failure) => println!("error: {}", failure),
        }
        for warning in &outcome.warnings {
            println!("warning: {}", warning);
        }
    }
    Ok(())
}
