//! Report repository.
//!
//! Loads the chart, opening anchors and posted lines in one read-only
//! snapshot and hands them to `ReportService`.

use std::collections::HashMap;

use chrono::NaiveDate;
use kosh_core::accounts::AccountClass;
use kosh_core::ledger::{BalanceAnchor, LedgerError, PostedLine};
use kosh_core::reports::{
    BalanceSheetReport, ProfitAndLossReport, ReportAccount, ReportError, ReportService,
    TrialBalanceReport,
};
use kosh_shared::types::{AccountId, Currency, TenantId};
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::error::db_err;
use super::ledger::{load_accounts, load_anchors, load_posted_lines, snapshot};

type ReportInputs = (
    Vec<ReportAccount>,
    HashMap<AccountId, Vec<BalanceAnchor>>,
    Vec<PostedLine>,
);

fn report_err(err: ReportError) -> LedgerError {
    match err {
        ReportError::InvalidDateRange { start, end } => LedgerError::InvalidDateRange { start, end },
        ReportError::UnknownAccount(id) => {
            LedgerError::Internal(format!("posted line references unknown account {id}"))
        }
    }
}

/// Report repository.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
    currency: Currency,
}

impl ReportRepository {
    /// Creates a new report repository reporting in `currency`.
    #[must_use]
    pub const fn new(db: DatabaseConnection, currency: Currency) -> Self {
        Self { db, currency }
    }

    /// Trial balance as of `as_of`.
    pub async fn trial_balance(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<TrialBalanceReport, LedgerError> {
        let (accounts, anchors, lines) = self.load(tenant_id, as_of).await?;
        ReportService::trial_balance(&accounts, &anchors, &lines, as_of, self.currency)
            .map_err(report_err)
    }

    /// Balance sheet as of `as_of`, with unclosed surplus under equity.
    pub async fn balance_sheet(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<BalanceSheetReport, LedgerError> {
        let (accounts, anchors, lines) = self.load(tenant_id, as_of).await?;
        ReportService::balance_sheet(&accounts, &anchors, &lines, as_of, self.currency)
            .map_err(report_err)
    }

    /// Income and expense between `from` and `to`, both inclusive.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` if `from` is after `to`.
    pub async fn profit_and_loss(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ProfitAndLossReport, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidDateRange { start: from, end: to });
        }
        let (accounts, _, lines) = self.load(tenant_id, to).await?;
        ReportService::profit_and_loss(&accounts, &lines, from, to, self.currency).map_err(report_err)
    }

    async fn load(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<ReportInputs, LedgerError> {
        let txn = snapshot(&self.db).await?;
        let chart = load_accounts(&txn, tenant_id).await?;
        let classes: HashMap<AccountId, AccountClass> = chart.iter().map(|a| (a.id, a.class)).collect();
        let anchors = load_anchors(&txn, tenant_id, &classes).await?;
        let lines = load_posted_lines(&txn, tenant_id, None, as_of).await?;
        txn.commit().await.map_err(db_err)?;

        Ok((chart.iter().map(ReportAccount::from).collect(), anchors, lines))
    }
}
