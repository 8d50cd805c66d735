use std::path::PathBuf;

use clap::Parser;

use crate::simulation::SpeedLevel;
use crate::theme::Theme;

/// Terminal snake. Options left out are asked for in the start menu.
#[derive(Debug, Clone, Parser)]
#[command(name = "gridsnake", version)]
pub struct Cli {
    /// Colour scheme.
    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    /// Leave one edge and come back in at the opposite one instead of crashing.
    #[arg(long)]
    pub wrap: Option<bool>,

    /// Starting speed. Play still speeds up as the snake grows.
    #[arg(long, value_enum)]
    pub difficulty: Option<SpeedLevel>,

    /// Size of one grid cell in device pixels; also scales mouse swipes.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i32).range(1..=1000))]
    pub cell_size: i32,

    /// Seed for food placement, for reproducible games.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = ".gridsnake_high_score.json")]
    pub high_score_file: PathBuf,

    /// Keep the high score in memory only.
    #[arg(long)]
    pub no_persist: bool,

    /// Where log output goes; filter with RUST_LOG.
    #[arg(long, default_value = "gridsnake.log")]
    pub log_file: PathBuf,
}

/// Choices the start menu needs before a session can begin.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MenuChoices {
    pub theme: Option<Theme>,
    pub wrap: Option<bool>,
    pub difficulty: Option<SpeedLevel>,
}

impl MenuChoices {
    pub fn from_cli(cli: &Cli) -> Self {
        MenuChoices { theme: cli.theme, wrap: cli.wrap, difficulty: cli.difficulty }
    }

    /// All three picked; the game may start.
    pub fn complete(&self) -> Option<(Theme, bool, SpeedLevel)> {
        Some((self.theme?, self.wrap?, self.difficulty?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_menu_open() {
        let cli = Cli::try_parse_from(["gridsnake"]).unwrap();
        assert_eq!(cli.cell_size, 20);
        assert!(!cli.no_persist);
        assert_eq!(MenuChoices::from_cli(&cli).complete(), None);
    }

    #[test]
    fn full_command_line_skips_menu() {
        let cli = Cli::try_parse_from([
            "gridsnake",
            "--theme",
            "neon",
            "--wrap",
            "true",
            "--difficulty",
            "hard",
            "--seed",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(3));
        assert_eq!(
            MenuChoices::from_cli(&cli).complete(),
            Some((Theme::Neon, true, SpeedLevel::Hard))
        );
    }

    #[test]
    fn cell_size_must_be_in_range() {
        assert!(Cli::try_parse_from(["gridsnake", "--cell-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["gridsnake", "--cell-size", "200000000"]).is_err());
        let cli = Cli::try_parse_from(["gridsnake", "--cell-size", "1000"]).unwrap();
        assert_eq!(cli.cell_size, 1000);
    }
}
