//! Ledger schema migration.
//!
//! Creates the enums and tables of the bookkeeping engine. Every table
//! carries `tenant_id`; repositories filter on it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: EXTENSIONS & ENUMS
        // ============================================================
        db.execute_unprepared(EXTENSIONS_SQL).await?;
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS & PERIODS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(FINANCIAL_PERIODS_SQL).await?;
        db.execute_unprepared(OPENING_BALANCES_SQL).await?;
        db.execute_unprepared(ACCOUNT_LINKS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_SEQUENCES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;

        // ============================================================
        // PART 4: OUTBOX
        // ============================================================
        db.execute_unprepared(LEDGER_OUTBOX_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const EXTENSIONS_SQL: &str = r"
-- Needed for the period overlap exclusion constraint
CREATE EXTENSION IF NOT EXISTS btree_gist;
";

const ENUMS_SQL: &str = r"
CREATE TYPE account_class AS ENUM (
    'asset',
    'liability',
    'equity',
    'income',
    'expense'
);

CREATE TYPE entry_status AS ENUM ('draft', 'posted', 'voided');

CREATE TYPE period_status AS ENUM ('open', 'closing', 'closed');

CREATE TYPE period_type AS ENUM ('month', 'year');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    class account_class NOT NULL,
    parent_id UUID REFERENCES accounts(id),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_tenant_code UNIQUE (tenant_id, code),
    CONSTRAINT chk_accounts_code_format CHECK (code ~ '^[1-5][0-9]{3,4}(-[0-9]{1,4})*$')
);

CREATE INDEX idx_accounts_tenant_class ON accounts(tenant_id, class, code);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const FINANCIAL_PERIODS_SQL: &str = r"
CREATE TABLE financial_periods (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(64) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    period_type period_type NOT NULL,
    status period_status NOT NULL DEFAULT 'open',
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_period_range CHECK (start_date <= end_date),
    CONSTRAINT chk_period_closed_at CHECK ((status = 'closed') = (closed_at IS NOT NULL)),
    CONSTRAINT ex_period_overlap EXCLUDE USING gist (
        tenant_id WITH =,
        daterange(start_date, end_date, '[]') WITH &&
    )
);

CREATE INDEX idx_periods_tenant_dates ON financial_periods(tenant_id, start_date, end_date);
";

const OPENING_BALANCES_SQL: &str = r"
CREATE TABLE opening_balances (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    period_id UUID NOT NULL REFERENCES financial_periods(id),
    debit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_opening_period_account UNIQUE (period_id, account_id),
    CONSTRAINT chk_opening_positive CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_opening_one_side CHECK ((debit = 0) <> (credit = 0))
);

CREATE INDEX idx_openings_tenant_account ON opening_balances(tenant_id, account_id);
";

const ACCOUNT_LINKS_SQL: &str = r"
CREATE TABLE account_links (
    tenant_id UUID NOT NULL,
    link_key VARCHAR(128) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (tenant_id, link_key)
);
";

const JOURNAL_SEQUENCES_SQL: &str = r"
-- Entry numbers are sequential per tenant and calendar year
CREATE TABLE journal_sequences (
    tenant_id UUID NOT NULL,
    year INTEGER NOT NULL,
    last_value BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (tenant_id, year)
);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    entry_number VARCHAR(32) NOT NULL,
    entry_date DATE NOT NULL,
    status entry_status NOT NULL DEFAULT 'draft',
    reference_type VARCHAR(64) NOT NULL,
    reference_id UUID,
    narration TEXT NOT NULL,
    reverses_entry_id UUID REFERENCES journal_entries(id),
    reversed_by_entry_id UUID REFERENCES journal_entries(id),
    void_reason TEXT,
    posted_at TIMESTAMPTZ,
    voided_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_entries_tenant_number UNIQUE (tenant_id, entry_number),
    CONSTRAINT chk_entry_posted_at CHECK (status = 'draft' OR posted_at IS NOT NULL),
    CONSTRAINT chk_entry_voided CHECK ((status = 'voided') = (voided_at IS NOT NULL))
);

CREATE INDEX idx_entries_tenant_date ON journal_entries(tenant_id, entry_date, entry_number);
CREATE INDEX idx_entries_tenant_status ON journal_entries(tenant_id, status, reference_type);
CREATE INDEX idx_entries_reference ON journal_entries(tenant_id, reference_type, reference_id)
    WHERE reference_id IS NOT NULL;
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    tenant_id UUID NOT NULL,
    line_number INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    memo TEXT,
    CONSTRAINT uq_lines_entry_number UNIQUE (entry_id, line_number),
    CONSTRAINT chk_line_positive CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_line_one_side CHECK ((debit = 0) <> (credit = 0))
);

CREATE INDEX idx_lines_account ON journal_lines(tenant_id, account_id);
CREATE INDEX idx_lines_entry ON journal_lines(entry_id);
";

const LEDGER_OUTBOX_SQL: &str = r"
CREATE TABLE ledger_outbox (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    event_type VARCHAR(64) NOT NULL,
    aggregate_id UUID NOT NULL,
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    delivered_at TIMESTAMPTZ
);

-- Consumers poll undelivered events in creation order
CREATE INDEX idx_outbox_pending ON ledger_outbox(created_at) WHERE delivered_at IS NULL;
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_outbox CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS journal_sequences CASCADE;
DROP TABLE IF EXISTS account_links CASCADE;
DROP TABLE IF EXISTS opening_balances CASCADE;
DROP TABLE IF EXISTS financial_periods CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS period_type;
DROP TYPE IF EXISTS period_status;
DROP TYPE IF EXISTS entry_status;
DROP TYPE IF EXISTS account_class;
";
