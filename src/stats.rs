use crate::{
    Outcome,
    Result,
    adapter::LedgerAdapter,
    error::absent_as_empty,
    types::{
        Address,
        PlayerStats,
        TokenProfit,
    },
};
use serde::Serialize;

/// Statistics panel for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub account: Address,
    pub stats: PlayerStats,
    pub total_games: u64,
    /// Percentage rounded to one decimal place.
    pub win_rate_percent: f64,
    /// Tokens with a non-zero profit only.
    pub token_profits: Vec<TokenProfit>,
}

impl PlayerSummary {
    pub fn new(account: Address, stats: PlayerStats, token_profits: Vec<TokenProfit>) -> Self {
        let total_games = stats.wins.saturating_add(stats.losses);
        Self {
            account,
            stats,
            total_games,
            win_rate_percent: win_rate(stats.wins, total_games),
            token_profits: token_profits
                .into_iter()
                .filter(|p| p.profit > 0)
                .collect(),
        }
    }

    /// `Empty` when the ledger has no statistics for `account`.
    pub async fn load<A: LedgerAdapter>(
        adapter: &A,
        account: Address,
    ) -> Result<Outcome<PlayerSummary>> {
        let (stats, profits) = futures::join!(
            adapter.player_stats(account),
            adapter.token_profits(account)
        );
        let Outcome::Data(stats) = absent_as_empty(stats)? else {
            return Ok(Outcome::Empty);
        };
        let profits = absent_as_empty(profits)?.into_option().unwrap_or_default();
        Ok(Outcome::Data(Self::new(account, stats, profits)))
    }
}

fn win_rate(wins: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (wins as f64 * 1_000.0 / total as f64).round() / 10.0
}
