use anyhow::Result;
use bullion::core::log::init_logging;
use bullion::core::metal::{MetalType, Purity};
use bullion::core::service::NewItem;
use bullion::core::valuation::ValuationInput;
use clap::{Args, CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Query and maintain metal rates
    Rate {
        #[command(subcommand)]
        command: RateCommands,
    },
    /// Acquire rates for all configured pairs now
    Acquire,
    /// Acquire rates every day at the configured time
    Schedule,
    /// Reprice a shop's inventory at the current rates
    Propagate {
        /// Shop identifier
        shop_id: String,
    },
    /// Value an item at the current rate
    Value {
        #[command(flatten)]
        pair: PairArgs,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Manage inventory items
    Stock {
        #[command(subcommand)]
        command: StockCommands,
    },
}

#[derive(Subcommand)]
enum RateCommands {
    /// Show the active rate
    Current(PairArgs),
    /// Fetch a fresh rate from the feeds
    Refresh(PairArgs),
    /// Record a rate by hand
    Set {
        #[command(flatten)]
        pair: PairArgs,
        /// Rate per gram in the local currency
        rate: Decimal,
    },
    /// Show recent rates, newest first
    History {
        #[command(flatten)]
        pair: PairArgs,
        /// Number of days to look back
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand)]
enum StockCommands {
    /// Price and add a new item
    Add {
        /// Shop identifier
        shop_id: String,
        /// Stock keeping unit
        sku: String,
        #[command(flatten)]
        pair: PairArgs,
        #[command(flatten)]
        item: ItemArgs,
        /// Gross weight in grams, defaults to the net weight
        #[arg(long)]
        gross_weight: Option<Decimal>,
        /// Selling price, defaults to cost with a 15% markup
        #[arg(long)]
        selling_price: Option<Decimal>,
    },
    /// Show a shop's items and stock value
    Report {
        /// Shop identifier
        shop_id: String,
    },
}

#[derive(Args)]
struct PairArgs {
    /// GOLD, SILVER or PLATINUM
    metal: MetalType,
    /// Karat for gold (e.g. 22), purity selector otherwise
    purity: Purity,
}

#[derive(Args)]
struct ItemArgs {
    /// Net metal weight in grams
    #[arg(short, long)]
    weight: Decimal,
    /// Flat making charges
    #[arg(short, long, default_value_t = Decimal::ZERO)]
    making: Decimal,
    /// Wastage as a percentage of the net weight
    #[arg(long, default_value_t = Decimal::ZERO)]
    wastage: Decimal,
}

impl ItemArgs {
    fn input(&self) -> ValuationInput {
        ValuationInput {
            net_weight_grams: self.weight,
            making_charges: self.making,
            wastage_percentage: self.wastage,
        }
    }
}

impl From<Commands> for bullion::AppCommand {
    fn from(cmd: Commands) -> bullion::AppCommand {
        match cmd {
            Commands::Rate { command } => match command {
                RateCommands::Current(p) => bullion::AppCommand::RateCurrent {
                    metal: p.metal,
                    purity: p.purity,
                },
                RateCommands::Refresh(p) => bullion::AppCommand::RateRefresh {
                    metal: p.metal,
                    purity: p.purity,
                },
                RateCommands::Set { pair, rate } => bullion::AppCommand::RateSet {
                    metal: pair.metal,
                    purity: pair.purity,
                    rate_per_gram: rate,
                },
                RateCommands::History { pair, days } => bullion::AppCommand::RateHistory {
                    metal: pair.metal,
                    purity: pair.purity,
                    days,
                },
            },
            Commands::Acquire => bullion::AppCommand::Acquire,
            Commands::Schedule => bullion::AppCommand::Schedule,
            Commands::Propagate { shop_id } => bullion::AppCommand::Propagate { shop_id },
            Commands::Value { pair, item } => bullion::AppCommand::Value {
                metal: pair.metal,
                purity: pair.purity,
                input: item.input(),
            },
            Commands::Stock { command } => match command {
                StockCommands::Add {
                    shop_id,
                    sku,
                    pair,
                    item,
                    gross_weight,
                    selling_price,
                } => bullion::AppCommand::StockAdd(NewItem {
                    shop_id,
                    sku,
                    metal_type: pair.metal,
                    purity: pair.purity,
                    net_weight_grams: item.weight,
                    gross_weight_grams: gross_weight.unwrap_or(item.weight),
                    making_charges: item.making,
                    wastage_percentage: item.wastage,
                    selling_price,
                }),
                StockCommands::Report { shop_id } => bullion::AppCommand::StockReport { shop_id },
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => bullion::cli::setup::setup_at_path(path),
            None => bullion::cli::setup::setup(),
        },
        Some(cmd) => bullion::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
