//! azops - Azure operations toolkit.

#![allow(clippy::disallowed_macros)]

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::{info, warn};

use azops::audit::audit_access_policies;
use azops::cleanup::{ActivityEvaluator, Classifier, CleanupRunner, NameFilter};
use azops::config::{parse_subscription_list, AzopsConfig};
use azops::report::write_report;
use azops::restart::{restart_deployment, DeploymentTarget};
use azops::rotation::{rotate_secret, RotationRequest, SecretValue};
use azops::{errors, logging, ui};
use azops_cloud::{credential_from_env, ArmClient, SubscriptionClient, VaultClient};

const DEFAULT_CLEANUP_REPORT: &str = "cleanup-report.csv";
const DEFAULT_AUDIT_REPORT: &str = "keyvault-access-policies.csv";

#[derive(Parser)]
#[command(name = "azops")]
#[command(about = "Routine Azure administration: cleanup, restarts, secret rotation, audits")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML configuration file
    #[arg(long, global = true, env = "AZOPS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag or delete idle resource groups
    Cleanup {
        /// Subscription IDs to scan
        #[arg(short, long = "subscription", env = "AZOPS_SUBSCRIPTIONS", value_delimiter = ',')]
        subscriptions: Vec<String>,

        /// Minimum days of inactivity
        #[arg(short, long)]
        days: Option<u32>,

        /// Resource group name glob (repeatable)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// Delete stale groups instead of tagging them
        #[arg(long)]
        delete: bool,

        /// Skip the deletion confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Report path (.json for JSON, otherwise CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restart a deployment in an AKS cluster
    Restart {
        /// Subscription of the cluster
        #[arg(long)]
        subscription: String,

        /// Resource group of the cluster
        #[arg(long)]
        resource_group: String,

        /// AKS cluster name
        #[arg(long)]
        cluster: String,

        /// Kubernetes namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Deployment name
        #[arg(long)]
        deployment: String,
    },

    /// Rotate a Key Vault secret and update bound web apps
    Rotate {
        /// Vault name or URL
        #[arg(long)]
        vault: String,

        /// Secret name
        #[arg(long)]
        secret: String,

        /// New value (generated when omitted)
        #[arg(long, env = "AZOPS_SECRET_VALUE", hide_env_values = true)]
        value: Option<String>,

        /// Generated value length
        #[arg(long)]
        length: Option<usize>,

        /// Restart web apps after updating their settings
        #[arg(long)]
        restart_apps: bool,
    },

    /// Export Key Vault access policies
    Audit {
        /// Subscription IDs (all visible subscriptions when omitted)
        #[arg(short, long = "subscription", env = "AZOPS_SUBSCRIPTIONS", value_delimiter = ',')]
        subscriptions: Vec<String>,

        /// Report path (.json for JSON, otherwise CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(errors::exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AzopsConfig::load_or_default(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    let credential = credential_from_env().context("No usable Azure credential")?;
    let arm = ArmClient::new(credential.clone()).context("Failed to create Azure client")?;

    match cli.command {
        Commands::Cleanup {
            subscriptions,
            days,
            patterns,
            delete,
            yes,
            output,
        } => {
            let mut settings = config.cleanup.clone();
            if !patterns.is_empty() {
                settings.patterns = patterns;
            }
            if let Some(days) = days {
                settings.inactivity_days = days;
            }
            settings.validate()?;

            let subscriptions = pick_subscriptions(subscriptions, &config.subscriptions);
            if subscriptions.is_empty() {
                bail!("cleanup needs at least one --subscription (or AZOPS_SUBSCRIPTIONS)");
            }

            if delete && !yes && !confirm_delete(&settings.patterns, settings.inactivity_days)? {
                ui::print_warning("Aborted");
                return Ok(());
            }

            let classifier = Classifier::new(
                NameFilter::new(&settings.patterns)?,
                settings.inactivity_days,
                &settings.unsafe_types,
                delete,
            );
            let evaluator = ActivityEvaluator::new(settings.creation_tags.clone());
            let runner =
                CleanupRunner::new(classifier, evaluator, Utc::now()).with_tag_name(&settings.tag_name);

            let clients: Vec<SubscriptionClient> =
                subscriptions.iter().map(|s| arm.subscription(s)).collect();
            let report = runner.run(&clients).await;

            let output = report_path(output, settings.output, DEFAULT_CLEANUP_REPORT);
            write_report(&output, report.records()).await?;
            ui::print_cleanup_summary(&report);
            ui::print_success(&format!("Report written to {}", output.display()));

            for sub in report.failed_subscriptions() {
                ui::print_warning(&format!("Subscription {sub} could not be scanned"));
            }
            if report.has_failures() {
                bail!(
                    "cleanup incomplete: {} subscription(s) not scanned, see FAILED rows in the report",
                    report.failed_subscriptions().len()
                );
            }
        }

        Commands::Restart {
            subscription,
            resource_group,
            cluster,
            namespace,
            deployment,
        } => {
            let target = DeploymentTarget {
                subscription_id: subscription,
                resource_group,
                cluster,
                namespace,
                deployment,
            };
            restart_deployment(&arm, &target, Utc::now())
                .await
                .with_context(|| format!("Failed to restart {target}"))?;
            ui::print_success(&format!("Restart triggered for {target}"));
        }

        Commands::Rotate {
            vault,
            secret,
            value,
            length,
            restart_apps,
        } => {
            let store = VaultClient::new(credential, &vault)?;
            let request = RotationRequest {
                secret_name: secret,
                value: value.map_or(
                    SecretValue::Generated {
                        length: length.unwrap_or(config.rotation.secret_length),
                    },
                    SecretValue::Explicit,
                ),
                restart_apps: restart_apps || config.rotation.restart_apps,
            };

            if config.rotation.bindings.is_empty() {
                warn!("No rotation bindings configured, only the secret will be updated");
            }

            let outcome = rotate_secret(&store, &arm, &request, &config.rotation.bindings)
                .await
                .context("Secret rotation failed")?;
            ui::print_rotation_outcome(&outcome);

            let failed = outcome.failed_bindings();
            if failed > 0 {
                bail!("{failed} binding(s) could not be updated");
            }
        }

        Commands::Audit {
            subscriptions,
            output,
        } => {
            let mut subscriptions = pick_subscriptions(subscriptions, &config.subscriptions);
            if subscriptions.is_empty() {
                subscriptions = arm
                    .list_subscriptions()
                    .await
                    .context("Failed to list subscriptions")?
                    .into_iter()
                    .filter(|s| s.state.as_deref().is_none_or(|st| st.eq_ignore_ascii_case("Enabled")))
                    .map(|s| s.subscription_id)
                    .collect();
                info!(count = subscriptions.len(), "Auditing all visible subscriptions");
            }

            let clients: Vec<SubscriptionClient> =
                subscriptions.iter().map(|s| arm.subscription(s)).collect();
            let report = audit_access_policies(&clients).await;

            let output = report_path(output, config.audit.output.clone(), DEFAULT_AUDIT_REPORT);
            write_report(&output, &report.rows).await?;
            println!("{}", ui::access_policy_table(&report.rows));
            ui::print_success(&format!(
                "{} access policy rows written to {}",
                report.rows.len(),
                output.display()
            ));

            for sub in &report.failed_subscriptions {
                ui::print_warning(&format!("Subscription {sub} could not be audited"));
            }
        }
    }

    Ok(())
}

/// CLI values win; otherwise the config file list.
fn pick_subscriptions(cli: Vec<String>, configured: &[String]) -> Vec<String> {
    let cli: Vec<String> = cli
        .iter()
        .flat_map(|s| parse_subscription_list(s))
        .collect();
    if cli.is_empty() {
        configured.to_vec()
    } else {
        cli
    }
}

fn report_path(cli: Option<PathBuf>, configured: Option<PathBuf>, default: &str) -> PathBuf {
    cli.or(configured).unwrap_or_else(|| Path::new(default).to_path_buf())
}

fn confirm_delete(patterns: &[String], days: u32) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("refusing to delete without --yes when stdin is not a terminal");
    }

    println!(
        "{} resource groups matching {} idle for {} days or more will be {}",
        "⚠".yellow().bold(),
        patterns.join(", ").cyan(),
        days,
        "deleted".red().bold()
    );

    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Proceed with deletion?")
        .default(false)
        .interact()?)
}
