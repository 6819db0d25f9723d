use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sct_sdk::{Direction, EntityType};

#[derive(Parser)]
#[command(
    name = "sct",
    about = "Supply Chain Trace: lineage, risk and mass-balance checks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// JSON dataset to load (entities, edges, risk signals, chains, operations)
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Trace the lineage of an entity and assess its risk
    Trace(TraceArgs),
    /// Show a custody chain's history and mass balance
    Balance(BalanceArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct TraceArgs {
    /// Entity id
    pub id: String,
    /// Entity type: plot, facility, delivery, shipment
    #[arg(long = "type", default_value = "plot")]
    pub entity_type: EntityType,
    /// forward (downstream), backward (upstream) or full
    #[arg(short, long, default_value = "forward")]
    pub direction: Direction,
    #[arg(long)]
    pub max_depth: Option<u32>,
}

#[derive(Args)]
pub struct BalanceArgs {
    pub chain_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trace_parses_type_and_direction() {
        let cli = Cli::try_parse_from([
            "sct", "trace", "M1", "--type", "facility", "-d", "upstream", "--max-depth", "3",
            "--format", "json",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        let Command::Trace(args) = cli.command else {
            panic!("expected trace");
        };
        assert_eq!(args.id, "M1");
        assert_eq!(args.entity_type, EntityType::Facility);
        assert_eq!(args.direction, Direction::Backward);
        assert_eq!(args.max_depth, Some(3));
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        assert!(Cli::try_parse_from(["sct", "trace", "X", "--type", "warehouse"]).is_err());
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["sct", "balance", "LOT-1", "--dataset", "d.json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.dataset, Some(PathBuf::from("d.json")));
        assert!(matches!(cli.command, Command::Balance(ref a) if a.chain_id == "LOT-1"));
    }
}
