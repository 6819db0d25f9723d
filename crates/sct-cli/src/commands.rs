use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use sct_sdk::{
    BalanceReport, LineageResult, RiskAssessment, SctConfig, Severity, SupplyChain,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match &cli.command {
        Command::Trace(args) => cmd_trace(&cli, config, args),
        Command::Balance(args) => cmd_balance(&cli, config, args),
        Command::Config => cmd_config(&cli, &config),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SctConfig> {
    match &cli.config {
        Some(path) => SctConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SctConfig::default()),
    }
}

fn load_supply_chain(cli: &Cli, config: SctConfig) -> anyhow::Result<SupplyChain> {
    let Some(path) = &cli.dataset else {
        bail!("no dataset given; pass --dataset <FILE>");
    };
    SupplyChain::load_dataset(config, path)
        .with_context(|| format!("loading dataset {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_trace(cli: &Cli, config: SctConfig, args: &TraceArgs) -> anyhow::Result<()> {
    let sc = load_supply_chain(cli, config)?;
    let result = sc.trace(args.direction, &args.id, args.entity_type, args.max_depth)?;
    match cli.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            print_lineage(&result);
            Ok(())
        }
    }
}

fn print_lineage(result: &LineageResult) {
    println!(
        "Lineage of {}:{} ({}, depth {}, {} nodes, {} edges)",
        result.entity_type,
        result.entity_id.bold(),
        result.direction.to_string().cyan(),
        result.depth,
        result.total_nodes,
        result.edges.len()
    );

    let mut current_level = None;
    for node in &result.nodes {
        if current_level != Some(node.level) {
            current_level = Some(node.level);
            println!("\n  {} {}", "level".dimmed(), node.level.to_string().yellow());
        }
        let mut line = format!("    {} {} {}", node.entity_type, node.id.bold(), node.name);
        if let Some(distance) = node.distance {
            line.push_str(&format!(" ({distance:.1} km)"));
        }
        if let Some(level) = node.risk_level {
            line.push_str(&format!(" [{}]", severity(level)));
        }
        println!("{line}");
    }

    if let Some(risk) = &result.risk_assessment {
        println!();
        print_risk(risk);
    }
}

fn print_risk(risk: &RiskAssessment) {
    println!("Overall risk: {}", severity(risk.overall_risk));
    println!("  EUDR: {}", check(risk.compliance.eudr_compliant));
    println!("  RSPO: {}", check(risk.compliance.rspo_compliant));
    for factor in &risk.risk_factors {
        println!(
            "  {} {} {}: {}",
            "•".red(),
            severity(factor.severity),
            factor.entity_id.bold(),
            factor.description
        );
    }
    if risk.is_partial() {
        println!(
            "  {} risk unknown for: {}",
            "!".yellow().bold(),
            risk.unevaluated.join(", ")
        );
    }
}

fn cmd_balance(cli: &Cli, config: SctConfig, args: &BalanceArgs) -> anyhow::Result<()> {
    let sc = load_supply_chain(cli, config)?;
    let report = sc.balance_report(&args.chain_id)?;
    match cli.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_balance(&report);
            Ok(())
        }
    }
}

fn print_balance(report: &BalanceReport) {
    let chain = &report.chain;
    println!(
        "Chain {} ({}) {}",
        chain.chain_id.bold(),
        chain.product_type,
        chain.status.as_str().cyan()
    );
    println!(
        "  Quantity: {} of {} remaining",
        chain.remaining_quantity, chain.total_quantity
    );
    if !chain.parent_chain_ids.is_empty() {
        println!("  Derived from: {}", chain.parent_chain_ids.join(", ").yellow());
    }

    println!("\nCustody events:");
    for event in &report.events {
        let quantity = event
            .quantity
            .map(|q| format!("{q} {}", event.uom))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {} {:<8} {:>12}  {}",
            event.event_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            event.event_type.as_str(),
            quantity,
            event.business_step
        );
    }

    let v = &report.validation;
    println!(
        "\nMass balance: {} ({} events over {} chains)",
        check(v.is_valid),
        v.event_count,
        v.chains_visited.len()
    );
    println!(
        "  input {}  output {}  waste {}  efficiency {:.1}%",
        v.total_input,
        v.total_output,
        v.total_waste,
        v.efficiency * 100.0
    );
    for d in &v.discrepancies {
        println!("  {} {}", "✗".red(), d.description);
    }

    let replay = &report.replay;
    if replay.matches_stored {
        println!("Replay: {} {} events", "✓".green().bold(), replay.applied_events);
    } else {
        println!(
            "Replay: {} folded to {} ({}) but stored state differs",
            "✗".red().bold(),
            replay.remaining_quantity,
            replay.status.as_str()
        );
    }
}

fn cmd_config(cli: &Cli, config: &SctConfig) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn severity(level: Severity) -> ColoredString {
    match level {
        Severity::Low => level.as_str().green(),
        Severity::Medium => level.as_str().yellow(),
        Severity::High => level.as_str().red(),
        Severity::Critical => level.as_str().red().bold(),
    }
}

fn check(ok: bool) -> ColoredString {
    if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    }
}
