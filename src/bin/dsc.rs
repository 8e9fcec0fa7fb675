//! DSC Engine CLI
//!
//! Valuation and health quotes, and scripted scenarios against an in-memory
//! deployment.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};

use dsc::cli::{
    quote_amount, quote_health, quote_value, AccountRow, OutputFormat, OutputFormatter, Scenario,
    ScenarioRunner,
};
use dsc::core::config::{DeploymentConfig, CONFIG_ENV_VAR};
use dsc::utils::constants::LIQUIDATION_THRESHOLD_PCT;

/// DSC Engine CLI - collateral, health factor and liquidation engine
#[derive(Parser)]
#[command(name = "dsc")]
#[command(author = "DSC Team")]
#[command(version = dsc::VERSION)]
#[command(about = "Command-line interface for the DSC engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Deployment file overriding a scenario's collateral and parameters
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Output format (text, json, json-pretty)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// USD value of a collateral amount
    Value {
        /// USD price of one unit
        #[arg(long)]
        price: String,
        /// Collateral units
        #[arg(long)]
        amount: String,
    },

    /// Collateral amount worth a USD value
    Amount {
        /// USD price of one unit
        #[arg(long)]
        price: String,
        /// USD value
        #[arg(long)]
        usd: String,
    },

    /// Health factor of a debt against a collateral value
    Health {
        /// Collateral value in USD
        #[arg(long)]
        collateral_usd: String,
        /// Debt in stable token units
        #[arg(long)]
        debt: String,
        /// Liquidation threshold in percent
        #[arg(long)]
        threshold: Option<u128>,
    },

    /// Run a scenario file against an in-memory deployment
    Simulate {
        /// Scenario JSON file
        scenario: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let output = OutputFormatter::new(cli.format);

    match &cli.command {
        Commands::Value { price, amount } => {
            let value = quote_value(price, amount)?;
            output.kv(&[("value", value.to_string())]);
        }
        Commands::Amount { price, usd } => {
            let amount = quote_amount(price, usd)?;
            output.kv(&[("amount", amount.to_string())]);
        }
        Commands::Health {
            collateral_usd,
            debt,
            threshold,
        } => {
            let threshold = match threshold {
                Some(pct) => *pct,
                None => load_config(cli)?
                    .map(|config| config.params.liquidation_threshold_pct)
                    .unwrap_or(LIQUIDATION_THRESHOLD_PCT),
            };
            let health_factor = quote_health(collateral_usd, debt, threshold)?;
            output.kv(&[
                ("health_factor", health_factor.to_string()),
                ("threshold_pct", threshold.to_string()),
            ]);
        }
        Commands::Simulate { scenario } => cmd_simulate(cli, scenario, &output, term)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Option<DeploymentConfig>> {
    Ok(match &cli.config {
        Some(path) => Some(DeploymentConfig::load(path)?),
        None => None,
    })
}

fn cmd_simulate(
    cli: &Cli,
    path: &Path,
    output: &OutputFormatter,
    term: &Term,
) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)?;
    let mut runner = match load_config(cli)? {
        Some(config) => ScenarioRunner::with_config(&scenario, config)?,
        None => ScenarioRunner::new(&scenario)?,
    };

    if matches!(output.format(), OutputFormat::Text) {
        let _ = term.write_line(&format!(
            "{} {} v{}: running {} steps from {}",
            style("→").cyan(),
            dsc::ENGINE_NAME,
            dsc::VERSION,
            scenario.steps.len(),
            path.display()
        ));
    }

    let reports = runner.run(&scenario.steps);
    let accounts = runner.accounts()?;

    if !matches!(output.format(), OutputFormat::Text) {
        output.data(&serde_json::json!({ "steps": reports, "accounts": accounts }));
        return Ok(());
    }

    for report in &reports {
        let message = format!("[{}] {}: {}", report.index, report.action, report.detail);
        if report.ok {
            output.success(&message);
        } else {
            output.warning(&message);
        }
    }

    output.section("Accounts");
    let rows: Vec<Vec<String>> = accounts.iter().map(AccountRow::cells).collect();
    output.table(&AccountRow::HEADERS, &rows);

    let failed = reports.iter().filter(|r| !r.ok).count();
    println!();
    output.info(&format!("{} of {} steps rejected", failed, reports.len()));

    Ok(())
}
