//! Command-line interface definitions for scrapl.
//!
//! Two subcommands share the global output, config and credential flags:
//!
//! ```sh
//! # Everything: general info, every player, fixtures
//! scrapl -j ./json fpl --all
//!
//! # A hand-picked batch
//! scrapl -j ./json fpl --general --gameweek 1 --gameweek 2 --player 308
//!
//! # Upcoming odds, or the snapshot for 16 Aug 2024
//! scrapl -j ./json odds
//! scrapl -j ./json odds --date 240816
//! ```

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON files
    #[arg(short, long, global = true, default_value = "./json")]
    pub json_output_dir: String,

    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Odds API key
    #[arg(long, global = true, env = "ODDS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Record failed extractors and keep going instead of stopping the batch
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the Fantasy Premier League API
    Fpl(FplArgs),
    /// Scrape bookmaker odds
    Odds(OddsArgs),
}

#[derive(Args, Debug, Default)]
pub struct FplArgs {
    /// General info, one extractor per player and fixtures
    #[arg(long)]
    pub all: bool,

    /// Live stats for a gameweek (repeatable)
    #[arg(long = "gameweek", value_name = "N")]
    pub gameweeks: Vec<u32>,

    /// Match history for a player (repeatable). With --all, limits the players scraped
    #[arg(long = "player", value_name = "ID")]
    pub players: Vec<u32>,

    /// The fixture list
    #[arg(long)]
    pub fixtures: bool,

    /// Teams, gameweek deadlines and the player map
    #[arg(long)]
    pub general: bool,
}

impl FplArgs {
    /// True when no extractor was asked for.
    pub fn is_empty(&self) -> bool {
        !self.all && !self.fixtures && !self.general && self.gameweeks.is_empty() && self.players.is_empty()
    }
}

#[derive(Args, Debug, Default)]
pub struct OddsArgs {
    /// Historical snapshot date as YYMMDD; upcoming matches when omitted
    #[arg(long, value_name = "YYMMDD")]
    pub date: Option<String>,
}
