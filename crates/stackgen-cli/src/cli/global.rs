//! Flags accepted before or after any subcommand.
//!
//! Flattened into [`super::Cli`] with `global = true`, so
//! `stackgen -q new demo` and `stackgen new demo -q` mean the same thing.

use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum};

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Log more of the generation run to stderr
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        long_help = "Log more of the generation run to stderr. Repeat to go deeper:
    -v    one line per pipeline step
    -vv   every file written or patched
    -vvv  resolver and renderer internals
RUST_LOG, when set, takes precedence."
    )]
    pub verbose: u8,

    /// Print nothing but errors (JSON reports are still written)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Plain, uncoloured messages; also set by NO_COLOR
    #[arg(long = "no-color", global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Settings file (TOML) to read instead of the per-user one
    ///
    /// When given, the file must exist. `init` and `config set` write to
    /// this path too.
    #[arg(short, long, global = true, value_name = "FILE.toml")]
    pub config: Option<PathBuf>,

    /// How reports and listings are printed
    #[arg(
        long = "output-format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Auto,
        value_name = "FORMAT"
    )]
    pub output_format: OutputFormat,
}

/// Rendering of command output.
///
/// `Auto` defers to `output.format` in the settings file, then to whether
/// stdout is a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Auto,
    /// Coloured, with spinner and next steps
    Human,
    /// Same text, no colour or spinner
    Plain,
    /// One JSON document on stdout
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        global: GlobalArgs,
    }

    #[test]
    fn verbosity_counts_repeats() {
        let parsed = Harness::try_parse_from(["stackgen", "-vvv"]).unwrap();
        assert_eq!(parsed.global.verbose, 3);
        assert_eq!(parsed.global.output_format, OutputFormat::Auto);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Harness::try_parse_from(["stackgen", "-q", "-v"]).is_err());
    }

    #[test]
    fn config_and_format_are_read() {
        let parsed =
            Harness::try_parse_from(["stackgen", "-c", "s.toml", "--output-format", "json"])
                .unwrap();
        assert_eq!(parsed.global.config, Some(PathBuf::from("s.toml")));
        assert_eq!(parsed.global.output_format, OutputFormat::Json);
    }
}
