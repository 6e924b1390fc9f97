use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use coach_ledger::CreditLedger;
use coach_server::{CoachServer, ServiceConfig, StoreConfig, VerifierConfig};
use coach_store::FileAccountStore;
use coach_types::AccountId;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Config => cmd_config(),
        Command::CheckConfig(args) => cmd_check_config(args),
        Command::VerifyJournal(args) => cmd_verify_journal(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let server = CoachServer::from_config(config)?;
    println!(
        "{} coach server on {}",
        "▶".green().bold(),
        server.config().server.bind_addr.to_string().bold()
    );

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", ServiceConfig::default().to_toml_string()?);
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = ServiceConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    println!("{} {}", "✓".green().bold(), args.config.display());
    println!("  Bind: {}", config.server.bind_addr.to_string().bold());
    println!(
        "  Ledger: {} attempts, {}ms backoff",
        config.ledger.max_attempts, config.ledger.backoff_ms
    );
    println!(
        "  Gate: {}ms verification timeout, {} catalog entries",
        config.gate.verification_timeout_ms,
        config.gate.catalog.len()
    );
    match &config.verifier {
        VerifierConfig::Http { endpoint, .. } => println!("  Verifier: http {}", endpoint.cyan()),
        VerifierConfig::Static { approved } => println!(
            "  Verifier: {} ({} approved)",
            "static".yellow(),
            approved.len()
        ),
    }
    match &config.store {
        StoreConfig::Memory => println!("  Store: {}", "memory".yellow()),
        StoreConfig::File { path } => println!("  Store: file {}", path.display()),
    }

    if std::env::var(&config.server.admin_secret_env).map_or(true, |v| v.is_empty()) {
        println!(
            "  {} {} is not set; admin routes will reject every request",
            "!".yellow().bold(),
            config.server.admin_secret_env
        );
    }
    Ok(())
}

fn cmd_verify_journal(args: VerifyJournalArgs) -> anyhow::Result<()> {
    let store = FileAccountStore::open(args.store.clone())
        .with_context(|| format!("opening {}", args.store.display()))?;
    let ledger = CreditLedger::with_store(Arc::new(store));

    let accounts = match args.account {
        Some(raw) => vec![AccountId::new(raw)?],
        None => ledger.account_ids()?,
    };

    let mut failures = 0usize;
    for account in &accounts {
        match ledger.verify_journal(account) {
            Ok(report) => println!(
                "{} {}  {} entries, free {}, paid {}, head {}",
                "✓".green(),
                account.to_string().bold(),
                report.entries,
                report.free_credits,
                report.paid_credits,
                report
                    .head
                    .map(|d| d.short())
                    .unwrap_or_else(|| "-".into())
                    .dimmed()
            ),
            Err(e) => {
                failures += 1;
                println!("{} {}  {}", "✗".red().bold(), account.to_string().bold(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} journals failed verification", accounts.len());
    }
    println!("{} {} journals verified", "✓".green().bold(), accounts.len());
    Ok(())
}
