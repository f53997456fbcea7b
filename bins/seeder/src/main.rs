//! Seeds a demo temple ledger for local development.
//!
//! Creates a small chart of accounts, the links the collection counters
//! resolve, the current fiscal year, balanced opening balances and a handful
//! of posted entries. Running it twice for the same tenant is a no-op.
//!
//! Usage: `cargo run --bin seeder`
//!
//! `KOSH_SEED_TENANT` selects the tenant; it defaults to a fixed demo id.

use std::collections::HashMap;

use anyhow::{Context, bail};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kosh_core::accounts::{Account, AccountClass, NewAccount};
use kosh_core::fiscal::{FinancialPeriod, PeriodType};
use kosh_core::ledger::{JournalLineInput, NewJournalEntry};
use kosh_db::repositories::OpeningBalanceInput;
use kosh_db::{AccountRepository, JournalRepository, PeriodRepository};
use kosh_shared::config::LoggingConfig;
use kosh_shared::types::TenantId;
use kosh_shared::AppConfig;

const DEMO_TENANT_ID: Uuid = Uuid::from_u128(1);

/// Code, name, class and optional parent code.
const CHART: &[(&str, &str, AccountClass, Option<&str>)] = &[
    ("1100", "Cash in Hand", AccountClass::Asset, None),
    ("1101", "Hundi Collection", AccountClass::Asset, Some("1100")),
    ("1200", "Bank - Current Account", AccountClass::Asset, None),
    ("1300", "Fixed Deposits", AccountClass::Asset, None),
    ("2100", "Advance Booking Deposits", AccountClass::Liability, None),
    ("3100", "General Fund", AccountClass::Equity, None),
    ("3200", "Corpus Fund", AccountClass::Equity, None),
    ("4100", "General Donations", AccountClass::Income, None),
    ("4200", "Seva and Pooja Receipts", AccountClass::Income, None),
    ("4300", "Interest Income", AccountClass::Income, None),
    ("5100", "Pooja Materials", AccountClass::Expense, None),
    ("5200", "Priest Honorarium", AccountClass::Expense, None),
    ("5300", "Electricity", AccountClass::Expense, None),
    ("5400", "Annadanam", AccountClass::Expense, None),
];

const LINKS: &[(&str, &str)] = &[
    ("donation.general", "4100"),
    ("donation.hundi", "1101"),
    ("seva.receipt", "4200"),
    ("payment.cash", "1100"),
    ("payment.bank", "1200"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let tenant_id = match std::env::var("KOSH_SEED_TENANT") {
        Ok(raw) => raw.parse().context("KOSH_SEED_TENANT is not a UUID")?,
        Err(_) => TenantId::from_uuid(DEMO_TENANT_ID),
    };

    let db = kosh_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let accounts = AccountRepository::new(db.clone());
    let periods = PeriodRepository::new(db.clone(), config.ledger.clone());
    let journal = JournalRepository::new(db, config.ledger.clone());

    if !accounts.list_accounts(tenant_id, true).await?.is_empty() {
        warn!(tenant_id = %tenant_id, "Tenant already has a chart of accounts, skipping");
        return Ok(());
    }

    let chart = seed_chart(&accounts, tenant_id).await?;
    for (key, code) in LINKS {
        accounts.link_account(tenant_id, key, chart[*code].id).await?;
    }
    info!(links = LINKS.len(), "Account links created");

    let today = Utc::now().date_naive();
    let period = seed_fiscal_year(&periods, tenant_id, today, config.ledger.fiscal_year_start_month).await?;

    accounts
        .set_opening_balances(
            tenant_id,
            period.id,
            &[
                opening(&chart["1100"], dec!(12500), Decimal::ZERO),
                opening(&chart["1200"], dec!(240000), Decimal::ZERO),
                opening(&chart["1300"], dec!(500000), Decimal::ZERO),
                opening(&chart["3100"], Decimal::ZERO, dec!(252500)),
                opening(&chart["3200"], Decimal::ZERO, dec!(500000)),
            ],
        )
        .await?;
    info!(period = %period.name, "Opening balances recorded");

    let posted = seed_entries(&journal, tenant_id, &chart, period.start_date, today).await?;
    info!(tenant_id = %tenant_id, entries = posted, "Seeding complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn seed_chart(
    accounts: &AccountRepository,
    tenant_id: TenantId,
) -> anyhow::Result<HashMap<&'static str, Account>> {
    let mut chart: HashMap<&'static str, Account> = HashMap::new();
    for (code, name, class, parent) in CHART {
        let mut input = NewAccount::new(*code, *name, *class);
        if let Some(parent_code) = parent {
            let Some(parent) = chart.get(parent_code) else {
                bail!("parent {parent_code} of {code} must be seeded first");
            };
            input = input.with_parent(parent.id);
        }
        let account = accounts.create_account(tenant_id, input).await?;
        chart.insert(*code, account);
    }
    info!(accounts = chart.len(), "Chart of accounts created");
    Ok(chart)
}

/// Creates the fiscal year containing `today`.
async fn seed_fiscal_year(
    periods: &PeriodRepository,
    tenant_id: TenantId,
    today: NaiveDate,
    start_month: u32,
) -> anyhow::Result<FinancialPeriod> {
    let year = if today.month() >= start_month {
        today.year()
    } else {
        today.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(year, start_month, 1).context("invalid fiscal year start")?;
    let end = start
        .checked_add_months(Months::new(12))
        .and_then(|d| d.pred_opt())
        .context("fiscal year end out of range")?;

    let name = FinancialPeriod::name_for(PeriodType::Year, start);
    Ok(periods
        .create_period(tenant_id, &name, start, end, PeriodType::Year)
        .await?)
}

/// Posts a week of counter activity from the start of the year.
async fn seed_entries(
    journal: &JournalRepository,
    tenant_id: TenantId,
    chart: &HashMap<&'static str, Account>,
    first_day: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<usize> {
    let id = |code: &str| chart[code].id;
    let mut entries = Vec::new();

    for offset in 0..7u64 {
        let Some(day) = first_day.checked_add_days(chrono::Days::new(offset)) else {
            break;
        };
        if day > today {
            break;
        }
        let hundi = Decimal::from(1500 + offset * 250);
        entries.push(NewJournalEntry::manual(
            day,
            "Hundi counting",
            vec![
                JournalLineInput::debit(id("1101"), hundi),
                JournalLineInput::credit(id("4100"), hundi),
            ],
        ));
        entries.push(NewJournalEntry::manual(
            day,
            "Archana tickets",
            vec![
                JournalLineInput::debit(id("1100"), dec!(620)),
                JournalLineInput::credit(id("4200"), dec!(620)),
            ],
        ));
        if offset % 3 == 0 {
            entries.push(NewJournalEntry::manual(
                day,
                "Flowers and camphor",
                vec![
                    JournalLineInput::debit(id("5100"), dec!(845.50)),
                    JournalLineInput::credit(id("1100"), dec!(845.50)),
                ],
            ));
        }
    }

    let mut posted = 0;
    for input in entries {
        let outcome = journal.post_or_defer(tenant_id, input).await?;
        if outcome.is_posted() {
            posted += 1;
        }
    }
    Ok(posted)
}

fn opening(account: &Account, debit: Decimal, credit: Decimal) -> OpeningBalanceInput {
    OpeningBalanceInput {
        account_id: account.id,
        debit,
        credit,
    }
}
