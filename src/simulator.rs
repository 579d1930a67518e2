use clap::Args;
use colored::Colorize;
use std::{fs::File, io::Write, time::Instant};
use tracing::{info, span, Level};

use crate::{
    config::Workspace,
    engine::{
        orchestrator::{generate, Simulation},
        parse_add_funds,
    },
    ledger::Ledger,
    model::*,
    parsing::parse_date,
    print::{write_csv, write_json, write_table, Format},
};

pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Args)]
pub struct Command {
    /// Name of the user directory.
    #[arg(long)]
    pub user: String,
    /// Number of days to project.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,
    /// First projected day, defaults to today.
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = start_date)]
    pub start: Option<NaiveDate>,
    /// Print the day by day projection.
    #[arg(long)]
    pub table: bool,
    /// Print the projection as JSON instead of the summary.
    #[arg(long)]
    pub json: bool,
    /// Table width, defaults to the terminal width.
    #[arg(long)]
    pub width: Option<u16>,
}

fn start_date(text: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(text).ok_or_else(|| format!("malformed date '{}'", text))
}

pub fn write_report(
    out: &mut impl Write,
    simulation: &Simulation,
    target_balance: &BigDecimal,
) -> Result<()> {
    writeln!(out, "\nSIMULATION SUMMARY")?;
    writeln!(out, "{}", "=".repeat(40))?;

    let alerts = simulation.result.alerts().collect_vec();
    if !alerts.is_empty() {
        writeln!(out, "\n{}", "ALERTS:".red())?;
        for day in alerts {
            writeln!(
                out,
                "  {}: Balance drops to {} (below target of {})",
                day.date.format("%Y-%m-%d"),
                format_amount(&day.end_balance),
                format_amount(target_balance)
            )?;
            let shortfall = day
                .shortfall
                .clone()
                .or_else(|| parse_add_funds(&day.transactions_summary));
            if let Some(shortfall) = shortfall {
                writeln!(
                    out,
                    "    SYSTEM RECOMMENDATION: Add {} to reach target balance",
                    format_amount(&shortfall)
                )?;
            }
        }
    }

    let recommendation = &simulation.recommendation;
    if recommendation.is_recommended() {
        writeln!(out, "\n{}", "SYSTEM_TRANSFER:".green())?;
        writeln!(
            out,
            "  Recommended Transfer: {}",
            format_amount(&recommendation.amount)
        )?;
        if let Some(effective) = recommendation.effective_date {
            writeln!(
                out,
                "  A virtual transfer has been added to the simulation on {}",
                effective.format("%Y-%m-%d")
            )?;
        }
    }

    Ok(())
}

pub fn execute_command(workspace: &Workspace, cmd: &Command) -> anyhow::Result<()> {
    let _span = span!(Level::INFO, "simulator").entered();
    let started = Instant::now();

    let user = workspace.user(&cmd.user);
    let config = user.load_config()?;
    let ledger = Ledger::load(&user)?;
    let forecast = ledger.forecast();
    let start = cmd.start.unwrap_or(workspace.today);

    info!(
        "simulating {} days from {} for {:?}",
        cmd.window,
        start,
        config.account_nickname.as_deref().unwrap_or(&cmd.user)
    );

    let simulation = generate(
        &config.current_balance,
        &config.target_balance,
        &forecast,
        start,
        cmd.window,
    )?;

    info!(
        "{} days projected, {} below target",
        simulation.result.len(),
        simulation.result.alerts().count()
    );

    let mut out = std::io::stdout().lock();

    if cmd.json {
        write_json(&mut out, &simulation.result)?;
        writeln!(out)?;
    } else {
        if cmd.table {
            write_table(&mut out, &simulation.result, &Format::new(cmd.width))?;
        }
        write_report(&mut out, &simulation, &config.target_balance)?;
    }

    let path = user.output_path("simulation_output", workspace.today);
    write_csv(File::create(&path)?, &simulation.result)?;

    if cmd.json {
        info!("simulation results saved to {:?}", path);
    } else {
        writeln!(out, "\nSimulation results saved to: {}", path.display())?;
    }

    let elapsed = Instant::now() - started;
    info!("done in {:?}", elapsed);

    Ok(())
}
