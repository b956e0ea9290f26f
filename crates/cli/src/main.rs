//! Satoshi escrow CLI.
//!
//! Command-line interface for two-party Bitcoin escrows with an optional
//! arbiter. Provides commands for:
//! - Escrow addresses and locking scripts (collaborative, dispute)
//! - Resolution transactions (build, sign, combine)
//! - Sweeping an identity's payout address
//! - Timelock conversion and input validation
//! - Fee recommendations and broadcast through an Esplora explorer

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use escrow_engine::{EscrowContext, SpendingBranch};
use escrow_types::{FeeTier, Network};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::sweep::SweepRequest;
use commands::tx::TxRequest;
use commands::FeeChoice;
use config::Config;
use output::{Note, Output};

/// Satoshi Escrow CLI
#[derive(Parser)]
#[command(name = "satoshi-escrow")]
#[command(
    author,
    version,
    about = "Two-party Bitcoin escrow with optional arbiter",
    long_about = None
)]
struct Cli {
    /// Network: mainnet, testnet4, signet, mutinynet (overrides config)
    #[arg(long, global = true, value_name = "NETWORK")]
    network: Option<Network>,

    /// Esplora API base URL (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    esplora_url: Option<String>,

    /// Output format: text, json
    #[arg(long, global = true, value_name = "FORMAT")]
    output: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable JSON output (shorthand for --output json)
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Escrow address derivation
    #[command(subcommand)]
    Address(EscrowCommands),

    /// Escrow locking script (witness script) in hex
    #[command(subcommand)]
    Script(EscrowCommands),

    /// Build an unsigned resolution transaction
    #[command(subcommand)]
    Tx(TxCommands),

    /// Sign a resolution transaction with one key
    Sign {
        /// Unsigned transaction hex ("-" reads stdin)
        #[arg(long, value_name = "HEX")]
        tx: String,

        /// Escrow locking script hex
        #[arg(long, value_name = "HEX")]
        script: String,

        /// Escrow amount in satoshis
        #[arg(long, value_name = "SATS")]
        amount: u64,

        /// Private key (nsec, hex or WIF); prompted for when omitted
        #[arg(long, value_name = "KEY")]
        key: Option<String>,

        /// Input to sign
        #[arg(long, default_value = "0")]
        input: usize,
    },

    /// Combine two signatures into a broadcastable transaction
    #[command(subcommand)]
    Combine(CombineCommands),

    /// Spend from the payout address of an identity key
    Sweep {
        /// Identity private key (nsec, hex or WIF); prompted for when omitted
        #[arg(long, value_name = "KEY")]
        key: Option<String>,

        /// Destination address
        #[arg(long, value_name = "ADDRESS")]
        destination: String,

        #[command(flatten)]
        funding: FundingArgs,

        /// Output index of the payout in the funding transaction
        #[arg(long, default_value = "0")]
        vout: u32,

        #[command(flatten)]
        fee: FeeArgs,
    },

    /// Convert a duration into a relative timelock in blocks
    Timelock {
        /// Days
        #[arg(long, default_value = "0")]
        days: u32,

        /// Hours
        #[arg(long, default_value = "0")]
        hours: u32,
    },

    /// Validate keys, addresses and transaction ids
    #[command(subcommand)]
    Validate(ValidateCommands),

    /// Show recommended fee rates
    Fees,

    /// Broadcast a signed transaction
    Broadcast {
        /// Signed transaction hex ("-" reads stdin)
        #[arg(long, value_name = "HEX")]
        tx: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Clone)]
struct PartyKeys {
    /// Party A public key (npub or compressed hex)
    #[arg(long, value_name = "KEY")]
    key_a: String,

    /// Party B public key (npub or compressed hex)
    #[arg(long, value_name = "KEY")]
    key_b: String,
}

#[derive(Args, Clone)]
struct DisputeTerms {
    /// Arbiter public key (npub or compressed hex)
    #[arg(long, value_name = "KEY")]
    arbiter: String,

    /// Relative timelock in blocks
    #[arg(long, value_name = "BLOCKS", conflicts_with_all = ["days", "hours"])]
    timelock_blocks: Option<u64>,

    /// Timelock days (converted with the network's block interval)
    #[arg(long)]
    days: Option<u32>,

    /// Timelock hours (converted with the network's block interval)
    #[arg(long)]
    hours: Option<u32>,
}

#[derive(Subcommand)]
enum EscrowCommands {
    /// 2-of-2 between the two parties
    Collab {
        #[command(flatten)]
        keys: PartyKeys,
    },

    /// 2-of-2 between the parties, or arbiter plus one party after a timelock
    Dispute {
        #[command(flatten)]
        keys: PartyKeys,

        #[command(flatten)]
        terms: DisputeTerms,
    },
}

#[derive(Args, Clone)]
struct FundingArgs {
    /// Funding transaction id (looked up on the explorer when omitted)
    #[arg(long, value_name = "TXID")]
    funding_txid: Option<String>,

    /// Funded amount in satoshis (confirmed balance when omitted)
    #[arg(long, value_name = "SATS")]
    amount: Option<u64>,
}

#[derive(Args, Clone)]
struct FeeArgs {
    /// Absolute fee in satoshis
    #[arg(long, value_name = "SATS", conflicts_with_all = ["fee_rate", "fee_tier"])]
    fee: Option<u64>,

    /// Fee rate in sat/vB
    #[arg(long, value_name = "SAT_PER_VB", conflicts_with = "fee_tier")]
    fee_rate: Option<u64>,

    /// Explorer fee tier: fastest, half-hour, hour, economy, minimum (default hour)
    #[arg(long, value_name = "TIER")]
    fee_tier: Option<FeeTier>,
}

impl FeeArgs {
    fn choice(&self) -> FeeChoice {
        match (self.fee, self.fee_rate, self.fee_tier) {
            (Some(sats), _, _) => FeeChoice::Absolute(sats),
            (None, Some(rate), _) => FeeChoice::Rate(rate),
            (None, None, tier) => FeeChoice::Tier(tier.unwrap_or(FeeTier::Hour)),
        }
    }
}

#[derive(Args, Clone)]
struct ResolutionArgs {
    // The escrow output must be vout 0 of the funding transaction.
    #[command(flatten)]
    funding: FundingArgs,

    /// Party A payout address
    #[arg(long, value_name = "ADDRESS")]
    dest_a: String,

    /// Party A payout in satoshis; party B receives the remainder after fees
    #[arg(long, value_name = "SATS")]
    amount_a: u64,

    /// Party B payout address
    #[arg(long, value_name = "ADDRESS")]
    dest_b: String,

    #[command(flatten)]
    fee: FeeArgs,
}

#[derive(Subcommand)]
enum TxCommands {
    /// Resolution of a collaborative escrow
    Collab {
        #[command(flatten)]
        keys: PartyKeys,

        #[command(flatten)]
        resolution: ResolutionArgs,
    },

    /// Resolution of a dispute escrow
    Dispute {
        #[command(flatten)]
        keys: PartyKeys,

        #[command(flatten)]
        terms: DisputeTerms,

        #[command(flatten)]
        resolution: ResolutionArgs,

        /// Spend through the arbitration branch (sets the input's relative lock)
        #[arg(long)]
        arbitrated: bool,
    },
}

#[derive(Args, Clone)]
struct CombineArgs {
    /// Unsigned transaction hex ("-" reads stdin)
    #[arg(long, value_name = "HEX")]
    tx: String,

    /// Escrow locking script hex
    #[arg(long, value_name = "HEX")]
    script: String,

    /// Escrow amount in satoshis
    #[arg(long, value_name = "SATS")]
    amount: u64,

    /// Signature as PUBKEY:SIGNATURE (repeat for each signer)
    #[arg(long = "sig", value_name = "PUBKEY:SIG", required = true)]
    sigs: Vec<String>,

    /// Input to complete
    #[arg(long, default_value = "0")]
    input: usize,
}

#[derive(Subcommand)]
enum CombineCommands {
    /// Both parties, collaborative escrow
    Collab(CombineArgs),

    /// Both parties, dispute escrow
    DisputeCollab(CombineArgs),

    /// Arbiter plus one party, dispute escrow after the timelock
    DisputeArbitrated(CombineArgs),
}

#[derive(Subcommand)]
enum ValidateCommands {
    /// Identity key (npub)
    Key {
        value: String,
    },

    /// Bitcoin address for the selected network
    Address {
        value: String,
    },

    /// Transaction id
    Txid {
        value: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set default network
    SetNetwork {
        /// mainnet, testnet4, signet or mutinynet
        #[arg(value_name = "NETWORK")]
        name: Network,
    },

    /// Set Esplora API base URL ("default" restores the network default)
    SetEsplora {
        url: String,
    },

    /// Set output format
    SetFormat {
        /// Output format (text or json)
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    // Load configuration
    let mut config = Config::load()?;

    // Override config with CLI arguments
    if let Some(network) = cli.network {
        config.network = network;
    }

    if let Some(url) = cli.esplora_url {
        config.esplora_url = Some(url);
    }

    if let Some(output) = cli.output {
        config.output_format = output;
    }

    if cli.no_color {
        config.colored = false;
    }

    if cli.json {
        config.output_format = "json".to_string();
    }

    let out = Output::new(config.colored, config.output_format == "json");

    // Handle config commands separately (they persist the un-overridden file)
    if let Commands::Config(config_cmd) = cli.command {
        return handle_config_command(config_cmd, &out).await;
    }

    let ctx = EscrowContext::new();
    let network = config.network;
    debug!(%network, esplora = %config.esplora_url(), "Resolved settings");

    // Execute command
    let result = match cli.command {
        Commands::Address(cmd) => handle_escrow_command(cmd, network, &out, false),
        Commands::Script(cmd) => handle_escrow_command(cmd, network, &out, true),
        Commands::Tx(cmd) => handle_tx_command(cmd, &config, &out).await,
        Commands::Sign {
            tx,
            script,
            amount,
            key,
            input,
        } => commands::read_hex_arg(&tx).and_then(|tx| {
            commands::sign::sign_transaction(
                &ctx, &out, network, &tx, &script, amount, key, input,
            )
        }),
        Commands::Combine(cmd) => handle_combine_command(cmd, &ctx, &out),
        Commands::Sweep {
            key,
            destination,
            funding,
            vout,
            fee,
        } => {
            let request = SweepRequest {
                key,
                destination,
                funding_txid: funding.funding_txid,
                vout,
                amount: funding.amount,
                fee: fee.choice(),
            };
            commands::sweep::sweep(&ctx, &config, &out, request).await
        }
        Commands::Timelock { days, hours } => {
            commands::timelock::convert(&out, network, days, hours)
        }
        Commands::Validate(cmd) => handle_validate_command(cmd, &ctx, network, &out),
        Commands::Fees => commands::fees::show_fees(&config, &out).await,
        Commands::Broadcast { tx, yes } => match commands::read_hex_arg(&tx) {
            Ok(tx) => commands::broadcast::broadcast(&config, &out, &tx, yes).await,
            Err(e) => Err(e),
        },
        Commands::Config(_) => unreachable!(), // Handled above
    };

    // Handle errors
    if let Err(e) = result {
        out.note(Note::Failure, &format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn handle_escrow_command(
    cmd: EscrowCommands,
    network: Network,
    out: &Output,
    script_only: bool,
) -> Result<()> {
    let script = match cmd {
        EscrowCommands::Collab { keys } => {
            commands::escrow::collaborative_script(&keys.key_a, &keys.key_b)?
        }
        EscrowCommands::Dispute { keys, terms } => {
            let blocks = commands::resolve_timelock(
                terms.timelock_blocks,
                terms.days,
                terms.hours,
                network,
            )?;
            commands::escrow::dispute_script(&keys.key_a, &keys.key_b, &terms.arbiter, blocks)?
        }
    };

    if script_only {
        commands::escrow::show_script(out, &script)
    } else {
        commands::escrow::show_address(out, &script, network)
    }
}

async fn handle_tx_command(
    cmd: TxCommands,
    config: &Config,
    out: &Output,
) -> Result<()> {
    let network = config.network;
    let (script, resolution, arbitrated) = match cmd {
        TxCommands::Collab { keys, resolution } => (
            commands::escrow::collaborative_script(&keys.key_a, &keys.key_b)?,
            resolution,
            false,
        ),
        TxCommands::Dispute {
            keys,
            terms,
            resolution,
            arbitrated,
        } => {
            let blocks = commands::resolve_timelock(
                terms.timelock_blocks,
                terms.days,
                terms.hours,
                network,
            )?;
            (
                commands::escrow::dispute_script(
                    &keys.key_a,
                    &keys.key_b,
                    &terms.arbiter,
                    blocks,
                )?,
                resolution,
                arbitrated,
            )
        }
    };

    let request = TxRequest {
        script,
        funding_txid: resolution.funding.funding_txid,
        amount: resolution.funding.amount,
        dest_a: resolution.dest_a,
        amount_a: resolution.amount_a,
        dest_b: resolution.dest_b,
        fee: resolution.fee.choice(),
        arbitrated,
    };

    commands::tx::build_transaction(config, out, request).await
}

fn handle_combine_command(
    cmd: CombineCommands,
    ctx: &EscrowContext,
    out: &Output,
) -> Result<()> {
    let (args, branch) = match cmd {
        CombineCommands::Collab(args) => (args, SpendingBranch::Collaborative),
        CombineCommands::DisputeCollab(args) => (args, SpendingBranch::DisputeCollaborative),
        CombineCommands::DisputeArbitrated(args) => (args, SpendingBranch::DisputeArbitrated),
    };

    let tx = commands::read_hex_arg(&args.tx)?;
    commands::combine::combine(
        ctx,
        out,
        branch,
        &tx,
        &args.script,
        args.amount,
        &args.sigs,
        args.input,
    )
}

fn handle_validate_command(
    cmd: ValidateCommands,
    ctx: &EscrowContext,
    network: Network,
    out: &Output,
) -> Result<()> {
    match cmd {
        ValidateCommands::Key { value } => commands::validate::key(ctx, out, network, &value),
        ValidateCommands::Address { value } => commands::validate::address(out, network, &value),
        ValidateCommands::Txid { value } => commands::validate::txid(out, &value),
    }
}

async fn handle_config_command(cmd: ConfigCommands, out: &Output) -> Result<()> {
    let mut config = Config::load()?;

    match cmd {
        ConfigCommands::Show => {
            if !out.document(&config)? {
                out.section("Configuration");
                out.field("Network", config.network);
                out.field("Esplora URL", config.esplora_url());
                out.field("Timeout", format!("{}s", config.timeout_secs));
                out.field("Output format", &config.output_format);
                out.field("Colored", config.colored);

                println!();
                let config_path = Config::config_path()?;
                out.note(Note::Hint, &format!("Config file: {}", config_path.display()));
            }
            Ok(())
        }
        ConfigCommands::SetNetwork { name: network } => {
            config.set_network(network)?;
            out.note(Note::Done, &format!("Network set to {}", network));
            Ok(())
        }
        ConfigCommands::SetEsplora { url } => {
            config.set_esplora_url(url)?;
            out.note(Note::Done, &format!("Esplora URL set to {}", config.esplora_url()));
            Ok(())
        }
        ConfigCommands::SetFormat { format } => {
            config.set_output_format(format.clone())?;
            out.note(Note::Done, &format!("Output format set to {}", format));
            Ok(())
        }
    }
}
