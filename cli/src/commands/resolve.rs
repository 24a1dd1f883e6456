use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use tracing::info;

use rdns_common::config::Config;
use rdns_common::network::target;
use rdns_core::report::ResultReporter;
use rdns_core::resolver::UdpResolver;
use rdns_core::resolver::conf::{self, ResolverConf};
use rdns_core::scheduler::{QueryScheduler, RunSummary};

use crate::commands::CommandLine;

/// Validates the command line, opens the resolver and resolves the range.
///
/// Every configuration problem surfaces here before the first query is
/// sent.
pub async fn resolve(args: &CommandLine) -> anyhow::Result<RunSummary> {
    let cfg = Config::build(
        args.increment,
        args.max_queries,
        args.exclude.as_deref(),
        args.no_recursion,
    )?;
    let range = target::to_range(&args.targets)?.with_increment(i64::from(cfg.increment))?;
    let resolver_conf = resolver_conf(args, &cfg)?;

    info!(
        "resolving {range} ({} addresses, step {}) with at most {} queries in flight",
        range.len(),
        range.increment(),
        cfg.max_in_flight
    );
    if let Some(exclusions) = &cfg.exclusions {
        info!("skipping {exclusions:?}");
    }

    let resolver = UdpResolver::bind(resolver_conf)
        .await
        .context("unable to initialize resolver")?;

    let start_time = Instant::now();
    let mut scheduler = QueryScheduler::new(resolver, ResultReporter::stdout(), cfg.max_in_flight);
    let summary = scheduler.run(range.to_iter(cfg.exclusions)).await?;

    info!(
        "{} queries answered, {} not submitted, peak {} in flight, {:.2}s",
        summary.completed,
        summary.failed_submissions,
        summary.peak_in_flight,
        start_time.elapsed().as_secs_f64()
    );
    Ok(summary)
}

/// Nameservers given on the command line replace the system configuration
/// entirely; the remaining flags override single settings.
fn resolver_conf(args: &CommandLine, cfg: &Config) -> anyhow::Result<ResolverConf> {
    let mut resolver_conf = if args.nameservers.is_empty() {
        ResolverConf::system(&args.resolv_conf)
    } else {
        let mut resolver_conf = ResolverConf::new();
        resolver_conf.servers = args
            .nameservers
            .iter()
            .map(|server| conf::parse_server(server))
            .collect::<Result<_, _>>()?;
        resolver_conf
    };

    if let Some(secs) = args.timeout {
        ensure!(secs > 0, "timeout must be a positive number of seconds");
        resolver_conf.timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = args.attempts {
        ensure!(attempts > 0, "attempts must be a positive integer");
        resolver_conf.attempts = attempts;
    }
    resolver_conf.recurse = cfg.recurse;
    resolver_conf.finalize();

    Ok(resolver_conf)
}
