mod snapshot;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use lotswap::{
    Address, Amount, AssetClass, AssetId, CallContext, Deposit, Exchange, ExchangeError, Instruction, Pool,
    RecordingLedger, Settlement, Timestamp,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::snapshot::{load_config, Snapshot};

// ─── CLI definition ───────────────────────────────────────────────────────────

/// lotswap: multi-pool AMM for id-keyed lots against one currency.
///
/// Works on a local JSON snapshot (configuration + pool state). Every command
/// supports --json for machine-readable output.
#[derive(Parser)]
#[command(
    name    = "lotswap",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Quote, simulate and inspect a lotswap exchange from a local snapshot.",
    after_help = "\
ENVIRONMENT:
  LOTSWAP_STATE  Snapshot path  [default: lotswap.json]
  LOTSWAP_NOW    Unix time used for deadlines  [default: current time]
  RUST_LOG       Log filter, e.g. RUST_LOG=lotswap=debug

QUICK START:
  lotswap init      --config lotswap.toml
  lotswap execute   --from 0x01 --asset lots --ids 1,2 --amounts 10,10 \\
                    --instruction '{\"add_liquidity\":{\"max_currency\":[1000,1000],\"deadline\":4102444800}}'
  lotswap quote buy --ids 1 --amounts 2
  lotswap pool-info --ids 1,2"
)]
struct Cli {
    /// Snapshot file holding configuration and pool state
    #[arg(long, global = true, value_name = "PATH", default_value = "lotswap.json", env = "LOTSWAP_STATE")]
    state: PathBuf,

    /// Unix time to execute at; defaults to the current time
    #[arg(long, global = true, value_name = "UNIX", env = "LOTSWAP_NOW")]
    now: Option<Timestamp>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a snapshot from a TOML configuration, with every pool empty
    Init {
        /// TOML file with token, currency, lp_fee and royalty settings
        #[arg(long, value_name = "TOML")]
        config: PathBuf,

        /// Overwrite an existing snapshot
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Show reserves and share supply for each id
    PoolInfo {
        #[arg(long, value_name = "IDS", value_delimiter = ',', required = true)]
        ids: Vec<AssetId>,

        /// Also show this owner's share balance
        #[arg(long, value_name = "ADDRESS")]
        owner: Option<Address>,
    },

    /// Price a buy (currency in, royalty included) or sell (currency out, net
    /// of royalty) against current reserves
    Quote {
        side: Side,

        #[arg(long, value_name = "IDS", value_delimiter = ',', required = true)]
        ids: Vec<AssetId>,

        #[arg(long, value_name = "AMOUNTS", value_delimiter = ',', required = true)]
        amounts: Vec<Amount>,
    },

    /// Show royalties accrued to a recipient
    Royalties {
        #[arg(long, value_name = "ADDRESS")]
        recipient: Address,
    },

    /// Encode a JSON instruction into its hex wire payload
    Encode {
        /// Instruction JSON, or @FILE to read it from a file
        #[arg(long, value_name = "JSON")]
        instruction: String,
    },

    /// Deliver a deposit with an instruction and settle it against a
    /// recording ledger
    #[command(
        after_help = "\
EXAMPLES:
  # Sell two lots of id 1, proceeds to the depositor
  lotswap execute --from 0x05 --asset lots --ids 1 --amounts 2 \\
    --instruction '{\"sell\":{\"min_currency\":0,\"deadline\":4102444800}}'

  # Same, from a raw payload produced by `lotswap encode`
  lotswap execute --from 0x05 --asset lots --ids 1 --amounts 2 --payload <HEX>"
    )]
    Execute {
        /// Depositor
        #[arg(long, value_name = "ADDRESS")]
        from: Address,

        /// Asset class of the deposit
        #[arg(long, value_enum)]
        asset: AssetArg,

        #[arg(long, value_name = "IDS", value_delimiter = ',', required = true)]
        ids: Vec<AssetId>,

        #[arg(long, value_name = "AMOUNTS", value_delimiter = ',', required = true)]
        amounts: Vec<Amount>,

        /// Instruction JSON, or @FILE to read it from a file
        #[arg(long, value_name = "JSON", conflicts_with = "payload", required_unless_present = "payload")]
        instruction: Option<String>,

        /// Hex-encoded wire payload
        #[arg(long, value_name = "HEX")]
        payload: Option<String>,

        /// Settle but do not write the snapshot back
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Pay out everything accrued to a royalty recipient
    WithdrawRoyalties {
        #[arg(long, value_name = "ADDRESS")]
        recipient: Address,

        /// Caller triggering the withdrawal; defaults to the recipient
        #[arg(long, value_name = "ADDRESS")]
        caller: Option<Address>,

        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Buy,
    Sell,
}

#[derive(Clone, Copy, ValueEnum)]
enum AssetArg {
    Lots,
    Currency,
    Shares,
}

impl From<AssetArg> for AssetClass {
    fn from(arg: AssetArg) -> Self {
        match arg {
            AssetArg::Lots => AssetClass::Lots,
            AssetArg::Currency => AssetClass::Currency,
            AssetArg::Shares => AssetClass::Shares,
        }
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let now = cli.now.unwrap_or_else(current_time);

    match &cli.command {
        Commands::Init { config, force } => cmd_init(&cli, config, *force),
        Commands::PoolInfo { ids, owner } => cmd_pool_info(&cli, ids, owner.as_ref()),
        Commands::Quote { side, ids, amounts } => cmd_quote(&cli, *side, ids, amounts),
        Commands::Royalties { recipient } => cmd_royalties(&cli, recipient),
        Commands::Encode { instruction } => cmd_encode(&cli, instruction),
        Commands::Execute { from, asset, ids, amounts, instruction, payload, dry_run } => {
            let deposit = Deposit { from: *from, asset: (*asset).into(), ids: ids.clone(), amounts: amounts.clone() };
            let payload = match (instruction, payload) {
                (_, Some(hex_payload)) => decode_hex(hex_payload)?,
                (Some(json), None) => read_instruction(json)?.encode().map_err(engine_error)?,
                (None, None) => bail!("Pass --instruction or --payload."),
            };
            cmd_execute(&cli, now, &deposit, &payload, *dry_run)
        }
        Commands::WithdrawRoyalties { recipient, caller, dry_run } => {
            cmd_withdraw_royalties(&cli, now, recipient, caller.unwrap_or(*recipient), *dry_run)
        }
    }
}

fn current_time() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn engine_error(e: ExchangeError) -> anyhow::Error {
    anyhow!("{e}  [{:?} error]", e.kind())
}

fn open(cli: &Cli) -> Result<Exchange<RecordingLedger>> {
    Snapshot::load(&cli.state)?.open(RecordingLedger::new())
}

/// Instruction JSON given inline or as `@path`.
fn read_instruction(arg: &str) -> Result<Instruction> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Cannot read instruction file '{path}'"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&raw).context(
        "Instruction must be JSON like {\"sell\":{\"min_currency\":0,\"deadline\":4102444800}}",
    )
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim().trim_start_matches("0x")).context("--payload is not valid hex")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Settle-and-save tail shared by the state-changing commands.
fn finish(cli: &Cli, exchange: Exchange<RecordingLedger>, settlement: &Settlement, dry_run: bool) -> Result<()> {
    let (snapshot, ledger) = Snapshot::from_exchange(exchange);
    if !dry_run {
        snapshot.save(&cli.state)?;
    }

    if cli.json {
        #[derive(Serialize)]
        struct Out<'a> {
            status: &'static str,
            dry_run: bool,
            settlement: &'a Settlement,
        }
        return print_json(&Out { status: "ok", dry_run, settlement });
    }

    println!("─── Settled: {:?} ─────────────────────────────────────────", settlement.operation);
    println!("  Party            {}", settlement.party);
    println!("  Recipient        {}", settlement.recipient);
    println!("  Currency total   {}", settlement.total_currency);
    for line in &settlement.lines {
        println!(
            "  id {:<12}  tokens {:>14}  currency {:>14}  shares {:>14}  royalty {:>10}",
            line.id, line.tokens, line.currency, line.shares, line.royalty
        );
    }
    for credit in &settlement.royalties {
        println!("  Royalty          {} → {}", credit.amount, credit.recipient);
    }
    println!();
    println!("  ─── Ledger ───────────────────────────────────────");
    for pull in ledger.pulls() {
        println!("  pull  {:<8} {:?} × {:?}  from {}", pull.asset, pull.ids, pull.amounts, pull.from);
    }
    for payout in ledger.payouts() {
        println!("  pay   {:<8} {:?} × {:?}  to   {}", payout.asset, payout.ids, payout.amounts, payout.recipient);
    }
    if dry_run {
        println!();
        println!("  Dry run: snapshot not written.");
    }
    Ok(())
}

// ─── init ────────────────────────────────────────────────────────────────────

fn cmd_init(cli: &Cli, config_path: &Path, force: bool) -> Result<()> {
    if cli.state.exists() && !force {
        bail!("Snapshot '{}' already exists. Pass --force to overwrite it.", cli.state.display());
    }
    let config = load_config(config_path)?;
    let snapshot = Snapshot::new(config);
    snapshot.save(&cli.state)?;

    if cli.json {
        #[derive(Serialize)]
        struct Out<'a> {
            status: &'static str,
            command: &'static str,
            snapshot: String,
            config: &'a lotswap::ExchangeConfig,
        }
        return print_json(&Out {
            status: "ok",
            command: "init",
            snapshot: cli.state.display().to_string(),
            config: &snapshot.config,
        });
    }

    let c = &snapshot.config;
    println!("─── Exchange Initialised ─────────────────────────────────────────");
    println!("  Snapshot         {}", cli.state.display());
    println!("  Token            {}", c.token);
    println!("  Currency         {}  (id {})", c.currency, c.currency_id);
    println!("  LP fee           {} ‰  (multiplier {})", c.lp_fee, c.fee_multiplier());
    match c.royalty {
        Some(r) => println!("  Royalty          {} ‰  → {}", r.fee, r.recipient),
        None => println!("  Royalty          none"),
    }
    if !c.royalty_overrides.is_empty() {
        println!("  Overrides        {} id(s)", c.royalty_overrides.len());
    }
    Ok(())
}

// ─── pool-info ───────────────────────────────────────────────────────────────

fn cmd_pool_info(cli: &Cli, ids: &[AssetId], owner: Option<&Address>) -> Result<()> {
    let exchange = open(cli)?;

    #[derive(Serialize)]
    struct Row {
        id: AssetId,
        #[serde(flatten)]
        pool: Pool,
        initialized: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        owner_shares: Option<Amount>,
    }
    let rows: Vec<Row> = ids
        .iter()
        .map(|&id| {
            let pool = exchange.pool(id);
            Row {
                id,
                pool,
                initialized: pool.is_initialized(),
                owner_shares: owner.map(|o| exchange.balance_of(o, id)),
            }
        })
        .collect();

    if cli.json {
        return print_json(&rows);
    }

    println!("─── Pools ────────────────────────────────────────────────────────");
    println!("  LP fee           {} ‰", exchange.lp_fee());
    for row in &rows {
        println!();
        println!("  id {}", row.id);
        if !row.initialized {
            println!("    empty: seed it with an add_liquidity deposit");
            continue;
        }
        println!("    Token reserve     {:>24}", row.pool.token_reserve);
        println!("    Currency reserve  {:>24}", row.pool.currency_reserve);
        println!("    Total shares      {:>24}", row.pool.total_shares);
        if let Some(royalty) = exchange.royalty_info(row.id) {
            println!("    Royalty           {:>22} ‰  → {}", royalty.fee, royalty.recipient);
        }
        if let (Some(o), Some(shares)) = (owner, row.owner_shares) {
            println!("    Shares of {o}  {shares}");
        }
    }
    Ok(())
}

// ─── quote ───────────────────────────────────────────────────────────────────

fn cmd_quote(cli: &Cli, side: Side, ids: &[AssetId], amounts: &[Amount]) -> Result<()> {
    let exchange = open(cli)?;
    let quotes = match side {
        Side::Buy => exchange.price_currency_to_token(ids, amounts),
        Side::Sell => exchange.price_token_to_currency(ids, amounts),
    }
    .map_err(engine_error)?;

    if cli.json {
        #[derive(Serialize)]
        struct Row {
            id: AssetId,
            amount: Amount,
            currency: Amount,
        }
        let rows: Vec<Row> = ids
            .iter()
            .zip(amounts)
            .zip(&quotes)
            .map(|((&id, &amount), &currency)| Row { id, amount, currency })
            .collect();
        return print_json(&rows);
    }

    let (title, label) = match side {
        Side::Buy => ("Buy Quote", "Cost"),
        Side::Sell => ("Sell Quote", "Proceeds"),
    };
    println!("─── {title} ───────────────────────────────────────────────────");
    for ((id, amount), currency) in ids.iter().zip(amounts).zip(&quotes) {
        println!("  id {id:<12}  amount {amount:>14}  {label} {currency:>20}");
    }
    let total = quotes
        .iter()
        .try_fold(0, |acc: Amount, &q| acc.checked_add(q))
        .context("Quote total overflows u128")?;
    println!("  Total            {total}");
    Ok(())
}

// ─── royalties ───────────────────────────────────────────────────────────────

fn cmd_royalties(cli: &Cli, recipient: &Address) -> Result<()> {
    let exchange = open(cli)?;
    let accrued = exchange.royalties(recipient);
    if cli.json {
        #[derive(Serialize)]
        struct Out {
            recipient: Address,
            accrued: Amount,
        }
        return print_json(&Out { recipient: *recipient, accrued });
    }
    println!("  Royalties accrued to {recipient}: {accrued}");
    Ok(())
}

// ─── encode ──────────────────────────────────────────────────────────────────

fn cmd_encode(cli: &Cli, instruction: &str) -> Result<()> {
    let instruction = read_instruction(instruction)?;
    let payload = instruction.encode().map_err(engine_error)?;
    if cli.json {
        #[derive(Serialize)]
        struct Out {
            instruction: &'static str,
            deadline: Timestamp,
            selector: String,
            payload: String,
        }
        return print_json(&Out {
            instruction: instruction.name(),
            deadline: instruction.deadline(),
            selector: hex::encode(instruction.selector()),
            payload: hex::encode(&payload),
        });
    }
    println!("{}", hex::encode(&payload));
    Ok(())
}

// ─── execute ─────────────────────────────────────────────────────────────────

fn cmd_execute(cli: &Cli, now: Timestamp, deposit: &Deposit, payload: &[u8], dry_run: bool) -> Result<()> {
    let mut exchange = open(cli)?;
    let ctx = CallContext::new(deposit.from, now);
    let settlement = exchange
        .on_batch_received(&ctx, deposit, payload)
        .map_err(engine_error)
        .context("Execution failed; snapshot unchanged")?;
    finish(cli, exchange, &settlement, dry_run)
}

// ─── withdraw-royalties ──────────────────────────────────────────────────────

fn cmd_withdraw_royalties(
    cli: &Cli,
    now: Timestamp,
    recipient: &Address,
    caller: Address,
    dry_run: bool,
) -> Result<()> {
    let mut exchange = open(cli)?;
    let settlement = exchange
        .withdraw_royalties(&CallContext::new(caller, now), *recipient)
        .map_err(engine_error)?;
    finish(cli, exchange, &settlement, dry_run)
}
