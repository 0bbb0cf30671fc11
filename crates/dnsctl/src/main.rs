//! dnsctl command line: record management and the dynamic-update daemon.

mod output;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use dnsctl_core::record::names_equal;
use dnsctl_core::{Config, DomainRouter, ProviderRegistry, RecordType, UpdateEngine};
use dnsctl_server::{Listener, TsigAuth};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "dnsctl", version, about = "Manage DNS records across providers")]
struct Opt {
    /// Configuration file (defaults to $DNSCTL_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the configured zones and their providers
    #[command(alias = "d")]
    Domain,

    /// List the records of the zone serving a domain
    #[command(alias = "l")]
    List {
        /// Domain whose zone should be listed
        domain: String,
        /// Restrict output to these record types
        types: Vec<String>,
    },

    /// Show the records at one name
    #[command(alias = "g")]
    Get {
        name: String,
        /// Record type to show; all types when omitted
        rtype: Option<String>,
    },

    /// Create or replace a record
    #[command(aliases = ["s", "add", "a"])]
    Set {
        name: String,
        value: String,
        /// Record type
        #[arg(default_value = "A")]
        rtype: String,
        /// Time-to-live in seconds
        #[arg(default_value_t = 300)]
        ttl: u32,
    },

    /// Delete the records of one type at a name
    #[command(alias = "del")]
    Delete {
        name: String,
        #[arg(default_value = "A")]
        rtype: String,
    },

    /// Run the TSIG-authenticated dynamic update listener
    Daemon,
}

#[tokio::main]
async fn main() -> ExitCode {
    let opt = Opt::parse();
    if let Err(err) = run(opt).await {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    #[cfg(feature = "cloudflare")]
    dnsctl_provider_cloudflare::register(&registry);
    #[cfg(feature = "rfc2136")]
    dnsctl_provider_rfc2136::register(&registry);
    registry
}

async fn run(opt: Opt) -> anyhow::Result<()> {
    let level = tracing::Level::from_str(&opt.log)
        .map_err(|_| anyhow!("unknown log level '{}'", opt.log))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(opt.config.as_deref())?;
    let router = DomainRouter::from_config(&config, &registry())?;

    match opt.command {
        Command::Domain => {
            let zones: Vec<(String, String)> = config
                .domains
                .iter()
                .map(|(zone, provider)| (zone.clone(), provider.clone()))
                .collect();
            output::print_zones(&zones);
        }

        Command::List { domain, types } => {
            let binding = router
                .resolve(&domain)
                .ok_or_else(|| anyhow!("no configured zone matches '{domain}'"))?;
            let filter: Vec<RecordType> = types
                .iter()
                .map(|t| t.parse())
                .collect::<Result<_, _>>()?;
            let mut records = binding.provider.list(&binding.zone).await?;
            if !filter.is_empty() {
                records.retain(|record| filter.contains(&record.rtype));
            }
            output::print_records(&records);
        }

        Command::Get { name, rtype } => {
            let binding = router
                .resolve(&name)
                .ok_or_else(|| anyhow!("no configured zone matches '{name}'"))?;
            let rtype = rtype.map(|t| t.parse::<RecordType>()).transpose()?;
            let mut records = binding.provider.list(&binding.zone).await?;
            records.retain(|record| {
                names_equal(&record.name, &name)
                    && rtype.map_or(true, |rtype| record.rtype == rtype)
            });
            output::print_records(&records);
        }

        Command::Set {
            name,
            value,
            rtype,
            ttl,
        } => {
            let binding = router
                .resolve(&name)
                .ok_or_else(|| anyhow!("no configured zone matches '{name}'"))?;
            let rtype: RecordType = rtype.parse()?;
            match binding
                .provider
                .present(&binding.zone, &name, rtype, &value, ttl)
                .await
            {
                Ok(changes) => output::print_changes(&changes),
                Err(err) => {
                    // report what did get applied before the failure
                    if let Some(partial) = err.partial_changes() {
                        output::print_changes(partial);
                    }
                    return Err(err).context("set failed");
                }
            }
        }

        Command::Delete { name, rtype } => {
            let binding = router
                .resolve(&name)
                .ok_or_else(|| anyhow!("no configured zone matches '{name}'"))?;
            let rtype: RecordType = rtype.parse()?;
            match binding.provider.absent(&binding.zone, &name, rtype).await {
                Ok(changes) => output::print_changes(&changes),
                Err(err) => {
                    if let Some(partial) = err.partial_changes() {
                        output::print_changes(partial);
                    }
                    return Err(err).context("delete failed");
                }
            }
        }

        Command::Daemon => {
            let credential = config.tsig_credential()?;
            let tsig = TsigAuth::new(&credential)?;
            let addr: SocketAddr = config
                .listen
                .parse()
                .with_context(|| format!("bad listen address '{}'", config.listen))?;
            let engine = UpdateEngine::new(Arc::new(router));
            info!(%addr, key = %credential.key_name, "starting dynamic update listener");
            Listener::bind(engine, tsig, addr).await?.run().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Opt::command().debug_assert();
    }

    #[test]
    fn set_takes_positional_type_and_ttl() {
        let opt = Opt::try_parse_from(["dnsctl", "set", "www.example.com", "1.2.3.4", "A", "600"])
            .unwrap();
        let Command::Set { name, value, rtype, ttl } = opt.command else {
            panic!("expected set command");
        };
        assert_eq!(name, "www.example.com");
        assert_eq!(value, "1.2.3.4");
        assert_eq!(rtype, "A");
        assert_eq!(ttl, 600);
    }

    #[test]
    fn set_defaults_type_and_ttl() {
        let opt = Opt::try_parse_from(["dnsctl", "s", "www.example.com", "1.2.3.4"]).unwrap();
        let Command::Set { rtype, ttl, .. } = opt.command else {
            panic!("expected set command");
        };
        assert_eq!(rtype, "A");
        assert_eq!(ttl, 300);
    }
}
