use std::{error::Error, io::Write, sync::Arc};

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    AccountSummary, Engine, EngineConfig, FeeBatchOutcome, Money, NewAccountCmd,
    gateway::DisabledGateway,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "dewbox_admin")]
#[command(about = "Operator utilities for Dewbox (accounts, monthly fee batch)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./dewbox.db?mode=rwc"
    )]
    database_url: String,

    /// Operator account credited by ICA contributions and fees.
    #[arg(long, env = "DEWBOX_RESERVE_ACCOUNT", default_value = "admin")]
    reserve_account: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    FeeBatch(FeeBatch),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Registers a member; the password is prompted for.
    Create(AccountCreateArgs),
    /// Prints balances and the public wallet id.
    Show(AccountShowArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    name: String,
    /// Account id; generated when absent.
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    member_no: Option<i64>,
    #[arg(long)]
    esusu: bool,
}

#[derive(Args, Debug)]
struct AccountShowArgs {
    id: String,
}

#[derive(Args, Debug)]
struct FeeBatch {
    #[command(subcommand)]
    command: FeeBatchCommand,
}

#[derive(Subcommand, Debug)]
enum FeeBatchCommand {
    /// Runs the monthly fee batch as if today were `--date`.
    Run(FeeBatchRunArgs),
}

#[derive(Args, Debug)]
struct FeeBatchRunArgs {
    /// Run date (`YYYY-MM-DD`), must be the first of a month. Defaults to today (UTC).
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Fee rate in basis points (200 = 2%).
    #[arg(long, default_value_t = engine::DEFAULT_MONTHLY_FEE_RATE_BPS)]
    rate_bps: u32,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_summary(summary: &AccountSummary) {
    println!("account:   {} ({})", summary.id, summary.name);
    if let Some(email) = &summary.email {
        println!("email:     {email}");
    }
    if let Some(wallet_id) = &summary.wallet_id {
        println!("wallet id: {wallet_id}");
    }
    println!("mode:      {}", summary.contribution_mode.as_str());
    println!("esusu:     {}", summary.esusu_member);
    println!("wallet:    {}", Money::new(summary.wallet_balance_minor));
    println!("ICA:       {}", Money::new(summary.ica_balance_minor));
    println!("Piggy:     {}", Money::new(summary.piggy_balance_minor));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let mut config = EngineConfig {
        reserve_account_id: cli.reserve_account,
        ..EngineConfig::default()
    };
    if let Command::FeeBatch(FeeBatch {
        command: FeeBatchCommand::Run(args),
    }) = &cli.command
    {
        config.monthly_fee_rate_bps = args.rate_bps;
    }
    let engine = Engine::builder()
        .database(db)
        .gateway(Arc::new(DisabledGateway))
        .config(config)
        .build()
        .await?;
    engine.ensure_reserve_account().await?;

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;

            let mut cmd = NewAccountCmd::new(args.name, password, Utc::now())
                .esusu_member(args.esusu);
            cmd.id = args.id;
            cmd.email = args.email;
            cmd.mobile = args.mobile;
            cmd.member_no = args.member_no;

            let summary = engine.create_account(cmd).await?;
            println!("created account: {}", summary.id);
            print_summary(&summary);
        }
        Command::Account(Account {
            command: AccountCommand::Show(args),
        }) => {
            let summary = engine.account_summary(&args.id).await?;
            print_summary(&summary);
        }
        Command::FeeBatch(FeeBatch {
            command: FeeBatchCommand::Run(args),
        }) => {
            let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
            match engine.run_monthly_fee_batch(date).await? {
                FeeBatchOutcome::NotDue => {
                    eprintln!("{date} is not the first day of a month, nothing to do");
                    std::process::exit(2);
                }
                FeeBatchOutcome::AlreadyRunning => {
                    eprintln!("fee batch already running");
                    std::process::exit(1);
                }
                FeeBatchOutcome::Completed(report) => {
                    println!(
                        "fee batch {:04}-{:02} at {} bps: {} eligible, {} applied, {} insufficient, {} skipped, {} errored",
                        report.base_year,
                        report.base_month,
                        report.rate_bps,
                        report.eligible,
                        report.applied,
                        report.insufficient,
                        report.skipped,
                        report.errored,
                    );
                    println!("collected: {}", Money::new(report.total_fees_minor));
                }
            }
        }
    }

    Ok(())
}
