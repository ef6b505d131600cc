//! fwrule - idempotent firewalld direct rules
//!
//! Applies or removes one rule described in a JSON file, touching the engine
//! only when the rule is not already in the requested state.
//!
//! # Usage
//!
//! ```bash
//! fwrule apply allow ssh.json     # Install for every matching family
//! fwrule remove ssh.json          # Remove whatever target it was created with
//! fwrule preview redirect web.json  # Print the compiled rules, run nothing
//! fwrule list                     # Dump the engine's direct rules
//! ```
//!
//! # Security
//!
//! - Runs as unprivileged user, elevates only to run `firewall-cmd`
//! - Descriptors are validated before anything is executed
//! - No shell is involved; only the configured binary is ever run
//! - Audit trail of every rule added or removed

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fwrule::audit::{AuditLog, EventType, log_converge};
use fwrule::config::{AppConfig, load_config};
use fwrule::core::error::FirewalldErrorPattern;
use fwrule::core::manager::preview;
use fwrule::{
    ActionKind, ConvergeReport, FirewallRuleStore, RuleDescriptor, RuleStateManager,
    SystemExecutor,
};

#[derive(Parser)]
#[command(name = "fwrule")]
#[command(about = "Idempotent firewalld direct rules", long_about = None)]
struct Cli {
    /// Log every compiled rule and engine query
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring a rule to the requested action (allow, deny, reject, redirect, masquerade, log, remove)
    Apply {
        /// Requested action
        action: ActionKind,
        /// JSON rule descriptor
        rule: PathBuf,
    },
    /// Remove a rule under every target it may have been created with
    Remove {
        /// JSON rule descriptor
        rule: PathBuf,
    },
    /// Print the compiled rules without contacting the engine
    Preview {
        action: ActionKind,
        rule: PathBuf,
    },
    /// List the engine's installed direct rules
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config();
    init_tracing(&config, cli.verbose);

    match handle_cli(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.to_string();
            let translation = FirewalldErrorPattern::match_error(e.stderr().unwrap_or(&message));
            eprintln!("Error: {e}");
            eprintln!("{}", translation.user_message);
            for suggestion in &translation.suggestions {
                eprintln!("  - {suggestion}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let builder = tracing_subscriber::fmt().with_max_level(level);

    if config.log_to_file
        && let Ok(Some(mut log_path)) = fwrule::utils::ensure_state_dir()
    {
        log_path.push("fwrule.log");
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
        {
            builder.with_ansi(false).with_writer(file).init();
            return;
        }
    }

    builder.with_writer(std::io::stderr).init();
}

fn handle_cli(command: Commands, config: &AppConfig) -> fwrule::Result<()> {
    match command {
        Commands::Apply { action, rule } => converge(action, &rule, config),
        Commands::Remove { rule } => converge(ActionKind::Remove, &rule, config),
        Commands::Preview { action, rule } => {
            let descriptor = RuleDescriptor::load(&rule)?;
            for planned in preview(action, &descriptor)? {
                println!("{}", planned.rule);
            }
            Ok(())
        }
        Commands::List => {
            for rule in manager(config).store().list_all()? {
                println!("{rule}");
            }
            Ok(())
        }
    }
}

fn manager(config: &AppConfig) -> RuleStateManager<SystemExecutor> {
    let executor = SystemExecutor::new(config.firewall_cmd.clone());
    RuleStateManager::new(FirewallRuleStore::with_binary(
        executor,
        config.firewall_cmd.clone(),
    ))
}

fn converge(action: ActionKind, path: &Path, config: &AppConfig) -> fwrule::Result<()> {
    let descriptor = RuleDescriptor::load(path)?;
    let name = descriptor.display_name();

    let audit = if config.audit_log {
        AuditLog::new()
            .inspect_err(|e| tracing::warn!("Audit log unavailable: {e}"))
            .ok()
    } else {
        None
    };

    let mut report = ConvergeReport::default();
    let outcome = manager(config).run_into(action, &descriptor, &mut report);

    if let Some(audit) = &audit {
        let event_type = if action == ActionKind::Remove {
            EventType::RemoveRule
        } else {
            EventType::AddRule
        };
        log_converge(audit, event_type, name, &report, &outcome);
    }

    for rule in &report.added {
        println!("+ {rule}");
    }
    for rule in &report.removed {
        println!("- {rule}");
    }
    outcome?;

    if report.updated() {
        println!("✓ {name}: updated");
    } else {
        println!("✓ {name}: already {}", state_word(action));
    }
    Ok(())
}

fn state_word(action: ActionKind) -> &'static str {
    if action == ActionKind::Remove {
        "absent"
    } else {
        "present"
    }
}
