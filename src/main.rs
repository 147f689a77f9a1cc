use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use rps_sync::{
    LedgerSync,
    Outcome,
    SyncConfig,
    adapter::http::HttpLedgerClient,
    events::{
        Event,
        EventPayload,
    },
    history::HistoryPage,
    reconcile::{
        LobbyView,
        Milestone,
    },
    rules,
    telemetry,
    types::{
        Address,
        GameRecord,
    },
};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(version, about = "Polls a rock-paper-scissors ledger and logs view updates", long_about = None)]
struct Args {
    /// Base URL of the ledger gateway.
    #[arg(short, long)]
    gateway: Url,

    /// Local account; history and stats need one.
    #[arg(short, long)]
    account: Option<Address>,

    /// JSON file with polling settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs to a daily rolling file in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    event_poll_ms: Option<u64>,

    #[arg(long)]
    max_window_blocks: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow game results and the lobby until interrupted.
    Watch {
        /// Also follow this game room.
        #[arg(long)]
        game: Option<u64>,

        #[arg(long, default_value = "false")]
        no_lobby: bool,
    },
    /// Print one page of the local account's history.
    History {
        #[arg(short, long, default_value_t = 0)]
        page: u64,
    },
    /// Print the local account's statistics.
    Stats,
}

fn load_config(args: &Args) -> Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)
            .wrap_err_with(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(ms) = args.event_poll_ms {
        config.event_poll_ms = ms;
    }
    if let Some(blocks) = args.max_window_blocks {
        config.max_window_blocks = blocks;
    }
    config.validate().wrap_err("invalid settings")?;
    Ok(config)
}

async fn handle_interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(_) => tracing::info!("Received interrupt, exiting"),
        Err(_) => tracing::warn!("Received interrupt error, exiting anyway"),
    }
}

/// Base units with 18 decimals, shown to four places.
fn format_amount(amount: u128) -> String {
    const UNIT: u128 = 1_000_000_000_000_000_000;
    let whole = amount / UNIT;
    let fraction = (amount % UNIT) / 100_000_000_000_000;
    format!("{whole}.{fraction:04}")
}

fn log_event(event: &Event) {
    match &event.payload {
        EventPayload::SingleGameResult(result) => tracing::info!(
            player = %result.player,
            result = ?result.result,
            payout = %format_amount(result.payout),
            block = event.block_height,
            "single game result"
        ),
        EventPayload::MultiplayerGameResult(result) => tracing::info!(
            game_id = result.game_id,
            winner = %result.winner,
            payout = %format_amount(result.payout),
            block = event.block_height,
            "multiplayer game result"
        ),
    }
}

fn log_lobby(view: &LobbyView) {
    tracing::info!(
        games = view.games.len(),
        mine = view.my_active.len(),
        "lobby updated"
    );
    for game in &view.games {
        tracing::debug!(
            id = game.id,
            creator = %game.first,
            stake = %format_amount(game.stake),
            status = ?rules::status(game),
            "lobby game"
        );
    }
}

fn log_snapshot(account: Option<Address>, game: &GameRecord) {
    let (can_act, waiting) = match account {
        Some(account) => (
            rules::can_act(game, &account),
            rules::waiting_on_opponent(game, &account),
        ),
        None => (false, false),
    };
    tracing::info!(
        id = game.id,
        status = ?rules::status(game),
        pool = %format_amount(game.prize_pool()),
        can_act,
        waiting,
        "game updated"
    );
}

fn log_milestone(milestone: &Milestone) {
    match milestone {
        Milestone::BothCommitted { game_id } => {
            tracing::info!(game_id, "Both players committed!")
        }
        Milestone::Concluded {
            game_id,
            winner,
            result,
        } => tracing::info!(
            game_id,
            winner = %winner.and_then(|w| w.short()).unwrap_or_else(|| "draw".to_string()),
            result = ?result,
            "game concluded"
        ),
    }
}

fn print_page(page: &HistoryPage) {
    println!(
        "page {}/{} ({} games)",
        page.index + 1,
        page.page_count().max(1),
        page.total
    );
    for entry in &page.entries {
        println!(
            "#{:<6} {:?} {:<5?} vs {:<14} stake {} payout {} at {}",
            entry.game_id,
            entry.kind,
            entry.result,
            entry.opponent.short().unwrap_or_else(|| "house".to_string()),
            format_amount(entry.stake),
            format_amount(entry.payout),
            entry.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _log_guard = telemetry::init_tracing(args.log_dir.as_deref());
    let config = load_config(&args)?;
    let client = HttpLedgerClient::new(args.gateway.as_str(), args.account)
        .wrap_err("creating ledger gateway client")?;
    let sync = LedgerSync::new(client, config);

    match args.command {
        Command::Watch { game, no_lobby } => {
            let _events = sync.subscribe_events(|event| log_event(&event));
            let _lobby = (!no_lobby).then(|| sync.subscribe_lobby(|view| log_lobby(&view)));
            let account = args.account;
            let _room = game.map(|id| {
                sync.subscribe_game(
                    id,
                    move |snapshot| log_snapshot(account, &snapshot),
                    |milestone| log_milestone(&milestone),
                )
            });
            tracing::info!(gateway = %args.gateway, "watching ledger");
            handle_interrupt().await;
        }
        Command::History { page } => match sync.fetch_history_page(page).await? {
            Outcome::Data(page) => print_page(&page),
            Outcome::Empty => return Err(eyre!("--account is required for history")),
        },
        Command::Stats => match sync.player_summary().await? {
            Outcome::Data(summary) => {
                println!(
                    "wins {} losses {} games {} win rate {:.1}% profit {}",
                    summary.stats.wins,
                    summary.stats.losses,
                    summary.total_games,
                    summary.win_rate_percent,
                    format_amount(summary.stats.total_profit),
                );
                for profit in &summary.token_profits {
                    println!("  {} {}", profit.token, format_amount(profit.profit));
                }
            }
            Outcome::Empty if args.account.is_none() => {
                return Err(eyre!("--account is required for stats"));
            }
            Outcome::Empty => println!("no statistics recorded"),
        },
    }
    Ok(())
}
