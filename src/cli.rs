use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "anki-kanji",
    version,
    about = "Builds Anki vocabulary decks from the KanjiDamage deck and online dictionaries"
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "anki-kanji.toml")]
    pub config: PathBuf,

    /// Anki profile to load before touching the collection
    #[arg(short, long)]
    pub profile: Option<String>,

    /// AnkiConnect endpoint, overriding the configured one
    #[arg(long, value_name = "URL")]
    pub connect_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Delete the KanjiDamage decks and reimport the bundled package
    Reset {
        /// Deck package to import instead of the configured one
        #[arg(short = 'k', long, value_name = "APKG")]
        package: Option<PathBuf>,
    },

    /// Crawl the kanji pages and rewrite the deck's notes in place
    Refresh {
        /// Re-download media files that are already cached
        #[arg(short, long)]
        force: bool,

        /// Stop after this many pages
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Rebuild the ranked words deck from the deck, the compound site and
    /// the frequency table
    Build {
        /// Refetch compound entries that are already cached
        #[arg(short, long)]
        force: bool,

        /// Only process the first N kanji
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<usize>,

        /// Write the ranked word records to this JSON file
        #[arg(long, value_name = "PATH")]
        dump: Option<PathBuf>,

        /// Export the finished deck as an .apkg package
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
}

impl Cli {
    /// Log level implied by the verbosity flags, if any were given.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            Some("warn")
        } else {
            match self.verbose {
                0 => None,
                1 => Some("debug"),
                _ => Some("trace"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_flags() {
        let cli = Cli::parse_from([
            "anki-kanji",
            "build",
            "--force",
            "-n",
            "25",
            "--dump",
            "words.json",
        ]);

        match cli.command {
            Command::Build {
                force,
                limit,
                dump,
                export,
            } => {
                assert!(force);
                assert_eq!(limit, Some(25));
                assert_eq!(dump, Some(PathBuf::from("words.json")));
                assert_eq!(export, None);
            }
            _ => panic!("expected build subcommand"),
        }
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let cli = Cli::parse_from(["anki-kanji", "refresh"]);
        assert_eq!(cli.log_level(), None);

        let cli = Cli::parse_from(["anki-kanji", "-v", "refresh"]);
        assert_eq!(cli.log_level(), Some("debug"));

        let cli = Cli::parse_from(["anki-kanji", "-vv", "refresh"]);
        assert_eq!(cli.log_level(), Some("trace"));

        let cli = Cli::parse_from(["anki-kanji", "-q", "reset"]);
        assert_eq!(cli.log_level(), Some("warn"));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["anki-kanji", "-q", "-v", "refresh"]).is_err());
    }
}
