use anyhow::Context;
use clap::{Parser, Subcommand};
use ctm_core::{
    data_dir_from_env_value, ClinicalTrial, CoreConfig, CriterionTag, EntityId, JsonFileStore,
    Patient, PatientDraft, TrialDraft, TrialMatcherService,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ctm")]
#[command(about = "Clinical trial matcher CLI")]
struct Cli {
    /// Data directory (overrides CTM_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clinical trials
    Trial {
        #[command(subcommand)]
        action: TrialCommand,
    },
    /// Manage patients
    Patient {
        #[command(subcommand)]
        action: PatientCommand,
    },
    /// List trial categories
    Categories,
    /// Show the deduplicated intake checklist for a category
    Criteria {
        category: String,
    },
    /// Check a patient (default: the selected patient) against its category's trials
    Check {
        patient_id: Option<String>,
    },
    /// Show eligible trials for every patient
    Report,
}

#[derive(Subcommand)]
enum TrialCommand {
    /// Add a trial
    Add {
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Inclusion criterion (repeatable)
        #[arg(long = "include")]
        inclusion: Vec<String>,
        /// Exclusion criterion (repeatable)
        #[arg(long = "exclude")]
        exclusion: Vec<String>,
    },
    /// List trials
    List,
    /// Edit a trial. Criteria lists given here replace the existing ones; omitted lists are kept.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "include")]
        inclusion: Vec<String>,
        #[arg(long = "exclude")]
        exclusion: Vec<String>,
        /// Remove every inclusion criterion
        #[arg(long, conflicts_with = "inclusion")]
        clear_include: bool,
        /// Remove every exclusion criterion
        #[arg(long, conflicts_with = "exclusion")]
        clear_exclude: bool,
    },
    /// Delete a trial and every patient in its category
    Delete {
        id: String,
    },
    /// Delete all trials
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PatientCommand {
    /// Add a patient and select it
    Add {
        name: String,
        #[arg(long)]
        category: String,
        /// Selected criterion as `inclusion-<description>` or `exclusion-<description>`
        #[arg(long = "select", value_parser = parse_tag)]
        selected: Vec<CriterionTag>,
    },
    /// List patients
    List,
    /// Edit a patient. Changing the category clears its selections unless new ones are given.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "select", value_parser = parse_tag)]
        selected: Vec<CriterionTag>,
    },
    /// Delete a patient
    Delete {
        id: String,
    },
    /// Delete all patients
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Select the patient under review (omit the id to clear the selection)
    Select {
        id: Option<String>,
    },
}

type Service = TrialMatcherService<JsonFileStore>;

fn parse_tag(raw: &str) -> Result<CriterionTag, String> {
    CriterionTag::parse_composite(raw.trim()).ok_or_else(|| {
        format!(
            "'{}' must look like 'inclusion-<description>' or 'exclusion-<description>'",
            raw
        )
    })
}

fn parse_id(raw: &str) -> anyhow::Result<EntityId> {
    EntityId::new(raw).context("invalid id")
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirm(prompt: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn print_trial(trial: &ClinicalTrial) {
    println!("ID: {}, Name: {}, Category: {}", trial.id, trial.name, trial.category);
    if !trial.description.is_empty() {
        println!("  {}", trial.description);
    }
    for criterion in trial.criteria() {
        println!("  [{}] {}", criterion.kind, criterion.description);
    }
}

fn print_patient(patient: &Patient, selected: bool) {
    let marker = if selected { " (selected)" } else { "" };
    println!(
        "ID: {}, Name: {}, Category: {}{}",
        patient.id, patient.name, patient.selected_category, marker
    );
    for tag in &patient.selected_criteria {
        println!("  [{}] {}", tag.kind, tag.description);
    }
}

fn run_trial(service: &mut Service, action: TrialCommand) -> anyhow::Result<()> {
    match action {
        TrialCommand::Add {
            name,
            category,
            description,
            inclusion,
            exclusion,
        } => {
            let draft = TrialDraft::new(&name, &description, &category, &inclusion, &exclusion)?;
            let trial = service.create_trial(draft)?;
            println!("Added trial with ID: {}", trial.id);
        }
        TrialCommand::List => {
            if service.trials().is_empty() {
                println!("No trials found.");
            }
            for trial in service.trials() {
                print_trial(trial);
            }
        }
        TrialCommand::Edit {
            id,
            name,
            category,
            description,
            inclusion,
            exclusion,
            clear_include,
            clear_exclude,
        } => {
            let id = parse_id(&id)?;
            let existing = service
                .state()
                .trial(&id)
                .with_context(|| format!("trial not found: {}", id))?;
            let descriptions = |list: &[ctm_core::Criterion]| -> Vec<String> {
                list.iter().map(|c| c.description.clone()).collect()
            };
            let inclusion = if clear_include || !inclusion.is_empty() {
                inclusion
            } else {
                descriptions(&existing.inclusion_criteria)
            };
            let exclusion = if clear_exclude || !exclusion.is_empty() {
                exclusion
            } else {
                descriptions(&existing.exclusion_criteria)
            };
            let draft = TrialDraft::new(
                name.as_deref().unwrap_or(&existing.name),
                description.as_deref().unwrap_or(&existing.description),
                category.as_deref().unwrap_or(&existing.category),
                &inclusion,
                &exclusion,
            )?;
            let trial = service.update_trial(&id, draft)?;
            println!("Updated trial {}", trial.id);
        }
        TrialCommand::Delete { id } => {
            let removed = service.delete_trial(&parse_id(&id)?)?;
            println!("Deleted trial {}", id);
            for patient in removed {
                println!("  also deleted patient {} ({})", patient.id, patient.name);
            }
        }
        TrialCommand::Clear { yes } => {
            if confirm("Delete ALL trials?", yes)? {
                service.clear_trials()?;
                println!("All trials deleted.");
            } else {
                println!("Aborted.");
            }
        }
    }
    Ok(())
}

fn run_patient(service: &mut Service, action: PatientCommand) -> anyhow::Result<()> {
    match action {
        PatientCommand::Add {
            name,
            category,
            selected,
        } => {
            let draft = PatientDraft::new(&name, &category, selected)?;
            let patient = service.create_patient(draft)?;
            println!("Added patient with ID: {}", patient.id);
        }
        PatientCommand::List => {
            if service.patients().is_empty() {
                println!("No patients found.");
            }
            let selected_id = service.selected_patient().map(|p| p.id.clone());
            for patient in service.patients() {
                print_patient(patient, selected_id.as_ref() == Some(&patient.id));
            }
        }
        PatientCommand::Edit {
            id,
            name,
            category,
            selected,
        } => {
            let id = parse_id(&id)?;
            let existing = service
                .state()
                .patient(&id)
                .with_context(|| format!("patient not found: {}", id))?;
            let name = name.unwrap_or_else(|| existing.name.clone());
            let mut draft = PatientDraft::new(
                &name,
                &existing.selected_category,
                existing.selected_criteria.clone(),
            )?;
            if let Some(category) = category {
                draft = draft.with_category(&category)?;
            }
            if !selected.is_empty() {
                draft = PatientDraft::new(&name, draft.category(), selected)?;
            }
            let patient = service.update_patient(&id, draft)?;
            println!("Updated patient {}", patient.id);
        }
        PatientCommand::Delete { id } => {
            service.delete_patient(&parse_id(&id)?)?;
            println!("Deleted patient {}", id);
        }
        PatientCommand::Clear { yes } => {
            if confirm("Delete ALL patients?", yes)? {
                service.clear_patients()?;
                println!("All patients deleted.");
            } else {
                println!("Aborted.");
            }
        }
        PatientCommand::Select { id } => {
            let id = id.as_deref().map(parse_id).transpose()?;
            match service.select_patient(id.as_ref())? {
                Some(patient) => println!("Selected patient {} ({})", patient.id, patient.name),
                None => println!("Selection cleared."),
            }
        }
    }
    Ok(())
}

fn run(service: &mut Service, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Trial { action } => run_trial(service, action)?,
        Commands::Patient { action } => run_patient(service, action)?,
        Commands::Categories => {
            let categories = service.categories();
            if categories.is_empty() {
                println!("No categories found.");
            }
            for category in categories {
                println!("{}", category);
            }
        }
        Commands::Criteria { category } => {
            let criteria = service.criteria_for_category(&category);
            if criteria.is_empty() {
                println!("No criteria for category '{}'.", category);
            }
            for criterion in criteria {
                println!("[{}] {}", criterion.kind, criterion.description);
            }
        }
        Commands::Check { patient_id } => {
            let id = patient_id.as_deref().map(parse_id).transpose()?;
            let (patient, results) = service.check_eligibility(id.as_ref())?;
            println!(
                "Eligibility for {} in category '{}':",
                patient.name, patient.selected_category
            );
            if results.is_empty() {
                println!("  No trials in this category.");
            }
            for result in results {
                let name = service
                    .state()
                    .trial(&result.trial_id)
                    .map(|t| t.name.as_str())
                    .unwrap_or("?");
                let verdict = if result.is_eligible {
                    "ELIGIBLE"
                } else {
                    "NOT ELIGIBLE"
                };
                println!("  {} ({}): {}", name, result.trial_id, verdict);
                for reason in &result.reasons {
                    println!("    - {}", reason);
                }
            }
        }
        Commands::Report => {
            let rows = service.report();
            if rows.is_empty() {
                println!("No patients found.");
            }
            for row in rows {
                let trials: Vec<&str> =
                    row.eligible_trials.iter().map(|t| t.name.as_str()).collect();
                let trials = if trials.is_empty() {
                    "none".to_string()
                } else {
                    trials.join(", ")
                };
                println!(
                    "{} ({}): {}",
                    row.patient.name, row.patient.selected_category, trials
                );
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ctm=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'ctm --help' for commands");
        return Ok(());
    };

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("CTM_DATA_DIR").ok()));
    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let mut service = TrialMatcherService::open(cfg)?;

    run(&mut service, command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("exclusion-Prior chemo-therapy").unwrap(),
            CriterionTag::exclusion("Prior chemo-therapy")
        );
        assert!(parse_tag("other-thing").is_err());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
    }

    #[test]
    fn test_parse_patient_add_with_selections() {
        let cli = Cli::try_parse_from([
            "ctm",
            "--data-dir",
            "/tmp/ctm",
            "patient",
            "add",
            "Ada",
            "--category",
            "Oncology",
            "--select",
            "inclusion-Age over 18",
            "--select",
            "exclusion-Pregnant",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ctm")));
        match cli.command {
            Some(Commands::Patient {
                action: PatientCommand::Add { selected, .. },
            }) => assert_eq!(
                selected,
                vec![
                    CriterionTag::inclusion("Age over 18"),
                    CriterionTag::exclusion("Pregnant")
                ]
            ),
            _ => panic!("expected patient add"),
        }
    }

    #[test]
    fn test_clear_include_conflicts_with_include() {
        let result = Cli::try_parse_from([
            "ctm",
            "trial",
            "edit",
            "trial-1",
            "--include",
            "X",
            "--clear-include",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_without_yes_flag_parses_as_unconfirmed() {
        let cli = Cli::try_parse_from(["ctm", "trial", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Trial {
                action: TrialCommand::Clear { yes: false }
            })
        ));
    }

    #[test]
    fn test_commands_run_against_a_data_dir() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()).unwrap());
        let mut service = TrialMatcherService::open(cfg).unwrap();

        let cli = Cli::try_parse_from([
            "ctm", "trial", "add", "Lung", "--category", "Oncology", "--include", "X",
        ])
        .unwrap();
        run(&mut service, cli.command.unwrap()).expect("trial add should succeed");

        let cli = Cli::try_parse_from([
            "ctm", "patient", "add", "Ada", "--category", "Oncology", "--select", "inclusion-X",
        ])
        .unwrap();
        run(&mut service, cli.command.unwrap()).expect("patient add should succeed");

        let (_, results) = service.check_eligibility(None).unwrap();
        assert!(results[0].is_eligible);

        let trial_id = service.trials()[0].id.to_string();
        let cli = Cli::try_parse_from([
            "ctm", "trial", "edit", trial_id.as_str(), "--exclude", "Y", "--clear-include",
        ])
        .unwrap();
        run(&mut service, cli.command.unwrap()).expect("trial edit should succeed");
        assert!(service.trials()[0].inclusion_criteria.is_empty());
        assert_eq!(service.trials()[0].exclusion_criteria[0].description, "Y");

        let cli = Cli::try_parse_from(["ctm", "trial", "clear", "--yes"]).unwrap();
        run(&mut service, cli.command.unwrap()).expect("clear should succeed");
        assert!(service.trials().is_empty());
        assert_eq!(service.patients().len(), 1);
    }
}
