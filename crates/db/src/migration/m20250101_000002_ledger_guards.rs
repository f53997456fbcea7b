//! Integrity triggers.
//!
//! The repositories enforce every rule before writing. These triggers hold
//! the same rules at the database level for writers that bypass them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BALANCE_CHECK_SQL).await?;
        db.execute_unprepared(PERIOD_CHECK_SQL).await?;
        db.execute_unprepared(IMMUTABILITY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_GUARDS_SQL).await?;
        Ok(())
    }
}

const BALANCE_CHECK_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_entry_balance
-- A posted entry has at least two lines and debits equal credits
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC(19, 2);
    total_credit NUMERIC(19, 2);
    line_count INTEGER;
BEGIN
    SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0), COUNT(*)
    INTO total_debit, total_credit, line_count
    FROM journal_lines
    WHERE entry_id = NEW.id;

    IF line_count < 2 THEN
        RAISE EXCEPTION 'Journal entry % has % line(s), at least 2 required',
            NEW.entry_number, line_count;
    END IF;

    IF total_debit <> total_credit THEN
        RAISE EXCEPTION 'Journal entry % is not balanced. Debit: %, Credit: %',
            NEW.entry_number, total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_entry_balance
AFTER UPDATE ON journal_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
WHEN (NEW.status = 'posted' AND OLD.status = 'draft')
EXECUTE FUNCTION check_entry_balance();
";

const PERIOD_CHECK_SQL: &str = r"
-- ============================================================
-- FUNCTION: validate_period_posting
-- Posting needs an open period covering the entry date. The year-end
-- surplus transfer is the only entry posted into a closing period.
-- ============================================================
CREATE OR REPLACE FUNCTION validate_period_posting()
RETURNS TRIGGER AS $$
DECLARE
    covering_status period_status;
BEGIN
    SELECT fp.status INTO covering_status
    FROM financial_periods fp
    WHERE fp.tenant_id = NEW.tenant_id
      AND NEW.entry_date BETWEEN fp.start_date AND fp.end_date;

    IF covering_status IS NULL THEN
        RAISE EXCEPTION 'No financial period covers %', NEW.entry_date;
    END IF;

    IF covering_status = 'closing' AND NEW.reference_type = 'period_close' THEN
        RETURN NEW;
    END IF;

    IF covering_status <> 'open' THEN
        RAISE EXCEPTION 'Period covering % is %, no posting allowed',
            NEW.entry_date, covering_status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_validate_period_posting
BEFORE UPDATE ON journal_entries
FOR EACH ROW
WHEN (NEW.status = 'posted' AND OLD.status = 'draft')
EXECUTE FUNCTION validate_period_posting();
";

const IMMUTABILITY_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_posted_modification
-- Posted entries may only be voided or linked to their reversal
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        IF OLD.status <> 'draft' THEN
            RAISE EXCEPTION 'Cannot delete % journal entry %', OLD.status, OLD.entry_number;
        END IF;
        RETURN OLD;
    END IF;

    IF OLD.status = 'voided' THEN
        RAISE EXCEPTION 'Cannot modify voided journal entry %', OLD.entry_number;
    END IF;

    IF OLD.status = 'draft' AND NEW.status = 'voided' THEN
        RAISE EXCEPTION 'Draft journal entry % cannot be voided', OLD.entry_number;
    END IF;

    IF OLD.status = 'posted' THEN
        IF NEW.status NOT IN ('posted', 'voided')
            OR NEW.tenant_id <> OLD.tenant_id
            OR NEW.entry_number <> OLD.entry_number
            OR NEW.entry_date <> OLD.entry_date
            OR NEW.reference_type <> OLD.reference_type
            OR NEW.reference_id IS DISTINCT FROM OLD.reference_id
            OR NEW.narration <> OLD.narration
            OR NEW.reverses_entry_id IS DISTINCT FROM OLD.reverses_entry_id
            OR NEW.posted_at IS DISTINCT FROM OLD.posted_at
        THEN
            RAISE EXCEPTION 'Cannot modify posted journal entry %. Create a reversing entry instead.',
                OLD.entry_number;
        END IF;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_mod
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_modification();

-- ============================================================
-- FUNCTION: prevent_posted_line_modification
-- Lines change only while their entry is a draft. A missing parent
-- means the draft itself is being deleted.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_line_modification()
RETURNS TRIGGER AS $$
DECLARE
    parent_status entry_status;
    parent_id UUID;
BEGIN
    IF TG_OP = 'DELETE' THEN
        parent_id := OLD.entry_id;
    ELSE
        parent_id := NEW.entry_id;
    END IF;

    SELECT status INTO parent_status FROM journal_entries WHERE id = parent_id;

    IF parent_status IS NOT NULL AND parent_status <> 'draft' THEN
        RAISE EXCEPTION 'Cannot change lines of % journal entry %', parent_status, parent_id;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_line_mod
BEFORE INSERT OR UPDATE OR DELETE ON journal_lines
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_line_modification();
";

const DROP_GUARDS_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_posted_line_mod ON journal_lines;
DROP TRIGGER IF EXISTS trg_prevent_posted_mod ON journal_entries;
DROP TRIGGER IF EXISTS trg_validate_period_posting ON journal_entries;
DROP TRIGGER IF EXISTS trg_check_entry_balance ON journal_entries;

DROP FUNCTION IF EXISTS prevent_posted_line_modification();
DROP FUNCTION IF EXISTS prevent_posted_modification();
DROP FUNCTION IF EXISTS validate_period_posting();
DROP FUNCTION IF EXISTS check_entry_balance();
";
