pub mod resolve;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use rdns_core::resolver::conf::DEFAULT_RESOLV_CONF;

#[derive(Parser, Debug)]
#[command(name = "async-rdns", version)]
#[command(about = "Bulk reverse DNS lookups over IPv4 ranges and CIDR blocks.")]
pub struct CommandLine {
    /// A CIDR block (e.g. 192.168.4.0/24) or a start and an end address
    #[arg(value_name = "CIDR | START END", num_args = 1..=2, required = true)]
    pub targets: Vec<String>,

    /// Step between consecutive addresses
    #[arg(short, long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    pub increment: i64,

    /// Maximum number of queries in flight
    #[arg(
        short = 'm',
        long = "max-queries",
        value_name = "N",
        default_value_t = 10,
        allow_negative_numbers = true
    )]
    pub max_queries: i64,

    /// Octet values to skip, one dot-separated field per octet (e.g. "..4.")
    #[arg(short, long, value_name = "SPEC")]
    pub exclude: Option<String>,

    /// Ask nameservers not to recurse
    #[arg(short = 'r', long)]
    pub no_recursion: bool,

    /// Nameserver to query instead of the system ones, ADDR or ADDR:PORT
    #[arg(short = 's', long = "nameserver", value_name = "ADDR")]
    pub nameservers: Vec<String>,

    /// Seconds to wait for an answer before trying again
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Passes over the nameserver list before a query fails
    #[arg(short, long, value_name = "N")]
    pub attempts: Option<usize>,

    /// Resolver configuration to read nameservers and options from
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RESOLV_CONF)]
    pub resolv_conf: PathBuf,

    /// More diagnostics on stderr, repeat for more
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only report fatal errors on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandLine {
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
