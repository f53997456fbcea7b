//! End-to-end bookkeeping scenarios over an in-memory book.
//!
//! `Book` wires the stateless services together the same way `kosh-db`
//! does, with vectors in place of tables.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use kosh_shared::types::{AccountId, Currency, JournalEntryId, JournalLineId, PeriodId, TenantId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::accounts::{
    Account, AccountClass, AccountRegistry, NewAccount, OpeningBalance, OpeningTotals,
};
use crate::fiscal::{
    ChecklistItem, ClosingService, ClosingSummary, FinancialPeriod, NextPeriod, PeriodStatus, PeriodType,
    find_covering, validate_new_period,
};
use crate::ledger::{
    AccountInfo, BalanceAnchor, EntryStatus, JournalEntry, JournalLine, JournalLineInput,
    JournalService, LedgerBalance, LedgerError, NewJournalEntry, PostDecision, PostedLine,
    Projector, ReversalService, format_entry_number, reference_types,
};
use crate::reports::{ReportAccount, ReportService, TrialBalanceReport};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Book {
    tenant_id: TenantId,
    accounts: Vec<Account>,
    periods: Vec<FinancialPeriod>,
    entries: Vec<JournalEntry>,
    openings: Vec<OpeningBalance>,
    sequence: i64,
}

impl Book {
    fn new() -> Self {
        Self {
            tenant_id: TenantId::new(),
            accounts: Vec::new(),
            periods: Vec::new(),
            entries: Vec::new(),
            openings: Vec::new(),
            sequence: 0,
        }
    }

    fn add_account(&mut self, code: &str, name: &str, class: AccountClass) -> AccountId {
        let input = NewAccount::new(code, name, class);
        let code = AccountRegistry::validate_new_account(&input, None, |c| {
            self.accounts.iter().any(|a| &a.code == c)
        })
        .unwrap();
        let id = AccountId::new();
        self.accounts.push(Account {
            id,
            tenant_id: self.tenant_id,
            code,
            name: input.name,
            class,
            parent_id: None,
            is_active: true,
            version: 0,
        });
        id
    }

    fn add_period(&mut self, start: NaiveDate, end: NaiveDate, period_type: PeriodType) -> PeriodId {
        validate_new_period(start, end, &self.periods).unwrap();
        let id = PeriodId::new();
        self.periods.push(FinancialPeriod {
            id,
            tenant_id: self.tenant_id,
            name: FinancialPeriod::name_for(period_type, start),
            start_date: start,
            end_date: end,
            period_type,
            status: PeriodStatus::Open,
            closed_at: None,
        });
        id
    }

    fn set_opening(&mut self, account_id: AccountId, period_id: PeriodId, debit: Decimal, credit: Decimal) {
        self.openings.retain(|o| !(o.account_id == account_id && o.period_id == period_id));
        if let Some(opening) = OpeningBalance::new(account_id, period_id, debit, credit).unwrap() {
            self.openings.push(opening);
        }
    }

    fn account(&self, id: AccountId) -> &Account {
        self.accounts.iter().find(|a| a.id == id).unwrap()
    }

    fn period(&self, id: PeriodId) -> &FinancialPeriod {
        self.periods.iter().find(|p| p.id == id).unwrap()
    }

    fn entry(&self, id: JournalEntryId) -> &JournalEntry {
        self.entries.iter().find(|e| e.id == id).unwrap()
    }

    fn entry_mut(&mut self, id: JournalEntryId) -> &mut JournalEntry {
        self.entries.iter_mut().find(|e| e.id == id).unwrap()
    }

    fn create_draft(&mut self, input: &NewJournalEntry) -> Result<JournalEntryId, LedgerError> {
        let lines = JournalService::validate_draft(input)?;
        for line in &lines {
            if !self.accounts.iter().any(|a| a.id == line.account_id) {
                return Err(LedgerError::AccountNotFound(line.account_id));
            }
        }

        self.sequence += 1;
        let id = JournalEntryId::new();
        self.entries.push(JournalEntry {
            id,
            tenant_id: self.tenant_id,
            entry_number: format_entry_number("JE", input.entry_date, self.sequence),
            entry_date: input.entry_date,
            status: EntryStatus::Draft,
            reference_type: input.reference_type.clone(),
            reference_id: input.reference_id,
            narration: input.narration.clone(),
            reverses_entry_id: None,
            reversed_by_entry_id: None,
            void_reason: None,
            posted_at: None,
            voided_at: None,
            lines: lines
                .into_iter()
                .map(|l| JournalLine {
                    id: JournalLineId::new(),
                    line_number: l.line_number,
                    account_id: l.account_id,
                    debit: l.debit,
                    credit: l.credit,
                    memo: l.memo,
                })
                .collect(),
        });
        Ok(id)
    }

    fn post(&mut self, id: JournalEntryId) -> Result<(), LedgerError> {
        let entry = self.entry(id).clone();
        if JournalService::check_post_status(&entry)? == PostDecision::AlreadyPosted {
            return Ok(());
        }
        let period = find_covering(&self.periods, entry.entry_date);
        JournalService::validate_posting(&entry, period, |account_id| {
            self.accounts
                .iter()
                .find(|a| a.id == account_id)
                .map(|a| AccountInfo { id: a.id, is_active: a.is_active })
                .ok_or(LedgerError::AccountNotFound(account_id))
        })?;

        for account_id in entry.account_ids() {
            if let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) {
                account.version += 1;
            }
        }
        let entry = self.entry_mut(id);
        entry.status = EntryStatus::Posted;
        entry.posted_at = Some(Utc::now());
        Ok(())
    }

    /// Inserts an already-validated entry straight as Posted.
    fn insert_posted(&mut self, input: &NewJournalEntry) -> JournalEntryId {
        let id = self.create_draft(input).unwrap();
        let entry = self.entry_mut(id);
        entry.status = EntryStatus::Posted;
        entry.posted_at = Some(Utc::now());
        id
    }

    fn void(&mut self, id: JournalEntryId, reason: &str) -> Result<JournalEntryId, LedgerError> {
        let original = self.entry(id).clone();
        JournalService::validate_void(&original, find_covering(&self.periods, original.entry_date))?;

        let mirror = ReversalService::build_reversal(&original, original.entry_date, Some(reason));
        let mirror_id = self.insert_posted(&mirror);
        self.entry_mut(mirror_id).reverses_entry_id = Some(id);

        let original = self.entry_mut(id);
        original.status = EntryStatus::Voided;
        original.void_reason = Some(reason.to_string());
        original.reversed_by_entry_id = Some(mirror_id);
        original.voided_at = Some(Utc::now());
        Ok(mirror_id)
    }

    fn posted_lines(&self) -> Vec<PostedLine> {
        self.entries
            .iter()
            .filter(|e| e.status.affects_balances())
            .flat_map(|e| {
                e.lines.iter().map(|l| PostedLine {
                    entry_id: e.id,
                    entry_number: e.entry_number.clone(),
                    entry_date: e.entry_date,
                    narration: e.narration.clone(),
                    reference_type: e.reference_type.clone(),
                    line_number: l.line_number,
                    account_id: l.account_id,
                    debit: l.debit,
                    credit: l.credit,
                })
            })
            .collect()
    }

    fn anchors(&self) -> HashMap<AccountId, Vec<BalanceAnchor>> {
        let mut anchors: HashMap<AccountId, Vec<BalanceAnchor>> = HashMap::new();
        for opening in &self.openings {
            let class = self.account(opening.account_id).class;
            anchors.entry(opening.account_id).or_default().push(BalanceAnchor {
                period_start: self.period(opening.period_id).start_date,
                balance: opening.signed_balance(class),
            });
        }
        Projector::align_anchors(&anchors, self.accounts.iter().map(|a| a.id))
    }

    fn balance(&self, account_id: AccountId, as_of: NaiveDate) -> LedgerBalance {
        let class = self.account(account_id).class;
        let anchors = self.anchors();
        let own = anchors.get(&account_id).map_or(&[][..], Vec::as_slice);
        Projector::balance(account_id, class, own, &self.posted_lines(), as_of)
    }

    fn all_balances(&self, as_of: NaiveDate) -> Vec<LedgerBalance> {
        let keys: Vec<(AccountId, AccountClass)> = self.accounts.iter().map(|a| (a.id, a.class)).collect();
        Projector::balances(&keys, &self.anchors(), &self.posted_lines(), as_of)
    }

    fn trial_balance(&self, as_of: NaiveDate) -> TrialBalanceReport {
        let accounts: Vec<ReportAccount> = self.accounts.iter().map(ReportAccount::from).collect();
        ReportService::trial_balance(&accounts, &self.anchors(), &self.posted_lines(), as_of, Currency::Inr)
            .unwrap()
    }

    fn opening_totals(&self, period_id: PeriodId) -> OpeningTotals {
        OpeningTotals::of(self.openings.iter().filter(|o| o.period_id == period_id))
    }

    fn start_closing(&mut self, period_id: PeriodId) -> Result<(), LedgerError> {
        ClosingService::validate_start_closing(self.period(period_id))?;
        if let Some(p) = self.periods.iter_mut().find(|p| p.id == period_id) {
            p.status = PeriodStatus::Closing;
        }
        Ok(())
    }

    fn close(&mut self, period_id: PeriodId, surplus_account: AccountId) -> Result<ClosingSummary, LedgerError> {
        let period = self.period(period_id).clone();
        let drafts: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.status == EntryStatus::Draft && period.contains_date(e.entry_date))
            .map(|e| e.entry_number.clone())
            .collect();
        let balances = self.all_balances(period.end_date);
        let items = ClosingService::run_checklist(
            &period,
            &self.periods,
            &drafts,
            &balances,
            self.opening_totals(period_id),
        );
        ClosingService::validate_close(&period, items)?;

        let next_period_id = match ClosingService::next_period(&period, &self.periods)? {
            NextPeriod::Existing(id) => id,
            NextPeriod::Create { start_date, end_date, period_type, .. } => {
                self.add_period(start_date, end_date, period_type)
            }
        };

        let surplus_class = self.account(surplus_account).class;
        let plan = ClosingService::plan(
            next_period_id,
            balances,
            (surplus_account, surplus_class),
            period.is_year_end(4),
        )?;

        let surplus_entry_id = if plan.surplus_lines.is_empty() {
            None
        } else {
            let input = NewJournalEntry::manual(
                period.end_date,
                ClosingService::surplus_narration(&period),
                plan.surplus_lines.clone(),
            )
            .with_reference(reference_types::PERIOD_CLOSE, Some(period_id.into_inner()));
            Some(self.insert_posted(&input))
        };

        self.openings.retain(|o| o.period_id != next_period_id);
        let openings_carried = plan.openings.len();
        self.openings.extend(plan.openings);

        if let Some(p) = self.periods.iter_mut().find(|p| p.id == period_id) {
            p.status = PeriodStatus::Closed;
            p.closed_at = Some(Utc::now());
        }

        Ok(ClosingSummary {
            period_id,
            next_period_id,
            closing_balances: plan.closing_balances,
            surplus_entry_id,
            net_surplus: plan.net_surplus,
            openings_carried,
        })
    }
}

struct Temple {
    book: Book,
    fy: PeriodId,
    cash: AccountId,
    bank: AccountId,
    fund: AccountId,
    donations: AccountId,
    pooja: AccountId,
}

fn temple() -> Temple {
    let mut book = Book::new();
    let cash = book.add_account("1100", "Cash in Hand", AccountClass::Asset);
    let bank = book.add_account("1200", "Bank - SBI", AccountClass::Asset);
    let fund = book.add_account("3100", "General Fund", AccountClass::Equity);
    let donations = book.add_account("4100", "Donations - General", AccountClass::Income);
    let pooja = book.add_account("5100", "Pooja Materials", AccountClass::Expense);
    let fy = book.add_period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
    Temple {
        book,
        fy,
        cash,
        bank,
        fund,
        donations,
        pooja,
    }
}

fn donation(t: &Temple, amount_debit: Decimal, amount_credit: Decimal, on: NaiveDate) -> NewJournalEntry {
    NewJournalEntry::manual(
        on,
        "Hundi collection",
        vec![
            JournalLineInput::debit(t.cash, amount_debit),
            JournalLineInput::credit(t.donations, amount_credit),
        ],
    )
    .with_reference(reference_types::DONATION, None)
}

#[test]
fn scenario_a_post_balanced_donation() {
    let mut t = temple();
    let today = date(2025, 6, 15);
    let cash_before = t.book.balance(t.cash, today).closing_balance;
    let income_before = t.book.balance(t.donations, today).closing_balance;

    let id = t.book.create_draft(&donation(&t, dec!(1000), dec!(1000), today)).unwrap();
    t.book.post(id).unwrap();

    assert_eq!(t.book.entry(id).status, EntryStatus::Posted);
    assert_eq!(t.book.entry(id).entry_number, "JE-2025-000001");
    assert_eq!(t.book.balance(t.cash, today).closing_balance - cash_before, dec!(1000));
    assert_eq!(t.book.balance(t.donations, today).closing_balance - income_before, dec!(1000));
    assert_eq!(t.book.account(t.cash).version, 1);

    let tb = t.book.trial_balance(today);
    assert!(tb.totals.is_balanced);
    assert_eq!(tb.totals.total_debit, dec!(1000));

    // posting again changes nothing
    t.book.post(id).unwrap();
    assert_eq!(t.book.balance(t.cash, today).closing_balance, dec!(1000));
    assert_eq!(t.book.account(t.cash).version, 1);
}

#[test]
fn scenario_b_unbalanced_entry_stays_draft() {
    let mut t = temple();
    let today = date(2025, 6, 15);
    let id = t.book.create_draft(&donation(&t, dec!(1000), dec!(900), today)).unwrap();

    match t.book.post(id) {
        Err(LedgerError::UnbalancedEntry { delta, .. }) => assert_eq!(delta, dec!(100)),
        other => panic!("expected UnbalancedEntry, got {other:?}"),
    }
    assert_eq!(t.book.entry(id).status, EntryStatus::Draft);
    assert_eq!(t.book.balance(t.cash, today).closing_balance, Decimal::ZERO);
}

#[test]
fn scenario_c_close_carries_cash_forward() {
    let mut t = temple();
    t.book.set_opening(t.cash, t.fy, dec!(2000), Decimal::ZERO);
    t.book.set_opening(t.fund, t.fy, Decimal::ZERO, dec!(2000));

    let id = t.book.create_draft(&donation(&t, dec!(3500), dec!(3500), date(2025, 9, 1))).unwrap();
    t.book.post(id).unwrap();
    let id = t
        .book
        .create_draft(&NewJournalEntry::manual(
            date(2025, 10, 1),
            "Flowers and camphor",
            vec![
                JournalLineInput::debit(t.pooja, dec!(500)),
                JournalLineInput::credit(t.cash, dec!(500)),
            ],
        ))
        .unwrap();
    t.book.post(id).unwrap();

    let year_end = date(2026, 3, 31);
    assert_eq!(t.book.balance(t.cash, year_end).closing_balance, dec!(5000));

    t.book.start_closing(t.fy).unwrap();
    let summary = t.book.close(t.fy, t.fund).unwrap();

    assert_eq!(t.book.period(t.fy).status, PeriodStatus::Closed);
    assert_eq!(summary.net_surplus, dec!(3000));
    assert!(summary.surplus_entry_id.is_some());

    let p2 = summary.next_period_id;
    assert_eq!(t.book.period(p2).start_date, date(2026, 4, 1));
    assert_eq!(t.book.period(p2).status, PeriodStatus::Open);

    let cash_opening = t.book.openings.iter().find(|o| o.account_id == t.cash && o.period_id == p2).unwrap();
    assert_eq!(cash_opening.debit, dec!(5000));
    assert_eq!(cash_opening.credit, Decimal::ZERO);
    let fund_opening = t.book.openings.iter().find(|o| o.account_id == t.fund && o.period_id == p2).unwrap();
    assert_eq!(fund_opening.credit, dec!(5000));
    assert!(t.book.opening_totals(p2).is_balanced());

    // balances read through the new anchors match the old ones
    let next_day = date(2026, 4, 1);
    assert_eq!(t.book.balance(t.cash, next_day).closing_balance, dec!(5000));
    assert_eq!(t.book.balance(t.cash, next_day).opening_balance, dec!(5000));
    assert_eq!(t.book.balance(t.donations, next_day).closing_balance, Decimal::ZERO);
    assert!(t.book.trial_balance(next_day).totals.is_balanced);
}

#[test]
fn scenario_c_close_blocked_by_checklist() {
    let mut t = temple();
    t.book.create_draft(&donation(&t, dec!(10), dec!(10), date(2025, 7, 1))).unwrap();

    assert!(matches!(
        t.book.close(t.fy, t.fund),
        Err(LedgerError::InvalidPeriodTransition { .. })
    ));

    t.book.start_closing(t.fy).unwrap();
    match t.book.close(t.fy, t.fund) {
        Err(LedgerError::ChecklistIncomplete(items)) => assert_eq!(items.len(), 1),
        other => panic!("expected ChecklistIncomplete, got {other:?}"),
    }
    assert_eq!(t.book.period(t.fy).status, PeriodStatus::Closing);
}

#[test]
fn scenario_d_post_into_closed_period_fails() {
    let mut t = temple();
    t.book.start_closing(t.fy).unwrap();

    // a draft created while closing is rejected on post
    let id = t.book.create_draft(&donation(&t, dec!(100), dec!(100), date(2025, 12, 1))).unwrap();
    assert!(matches!(
        t.book.post(id),
        Err(LedgerError::PeriodClosed { status: PeriodStatus::Closing, .. })
    ));

    t.book.entries.retain(|e| e.id != id);
    t.book.close(t.fy, t.fund).unwrap();

    let id = t.book.create_draft(&donation(&t, dec!(100), dec!(100), date(2025, 12, 1))).unwrap();
    assert!(matches!(
        t.book.post(id),
        Err(LedgerError::PeriodClosed { status: PeriodStatus::Closed, .. })
    ));
    assert_eq!(t.book.entry(id).status, EntryStatus::Draft);

    let id = t.book.create_draft(&donation(&t, dec!(100), dec!(100), date(2030, 1, 1))).unwrap();
    assert!(matches!(t.book.post(id), Err(LedgerError::NoPeriodForDate(_))));
}

#[test]
fn scenario_d_later_closing_does_not_lock_earlier_period() {
    let mut t = temple();
    let next = t.book.add_period(date(2026, 4, 1), date(2027, 3, 31), PeriodType::Year);
    t.book.start_closing(next).unwrap();

    let id = t.book.create_draft(&donation(&t, dec!(100), dec!(100), date(2025, 12, 1))).unwrap();
    t.book.post(id).unwrap();
    assert_eq!(t.book.entry(id).status, EntryStatus::Posted);
}

#[test]
fn scenario_d_close_waits_for_earlier_period() {
    let mut t = temple();
    let next = t.book.add_period(date(2026, 4, 1), date(2027, 3, 31), PeriodType::Year);
    let id = t.book.create_draft(&donation(&t, dec!(300), dec!(300), date(2026, 5, 1))).unwrap();
    t.book.post(id).unwrap();
    let id = t
        .book
        .create_draft(&NewJournalEntry::manual(
            date(2026, 5, 2),
            "Deposit counter cash",
            vec![
                JournalLineInput::debit(t.bank, dec!(300)),
                JournalLineInput::credit(t.cash, dec!(300)),
            ],
        ))
        .unwrap();
    t.book.post(id).unwrap();

    t.book.start_closing(next).unwrap();
    match t.book.close(next, t.fund) {
        Err(LedgerError::ChecklistIncomplete(items)) => {
            assert!(items.iter().any(|item| matches!(
                item,
                ChecklistItem::EarlierPeriodOpen { period_id, .. } if *period_id == t.fy
            )));
        }
        other => panic!("expected ChecklistIncomplete, got {other:?}"),
    }
    assert_eq!(t.book.period(next).status, PeriodStatus::Closing);

    // the earlier year still takes a late posting
    let id = t.book.create_draft(&donation(&t, dec!(100), dec!(100), date(2026, 3, 20))).unwrap();
    t.book.post(id).unwrap();

    t.book.start_closing(t.fy).unwrap();
    let first = t.book.close(t.fy, t.fund).unwrap();
    assert_eq!(first.next_period_id, next);
    assert_eq!(first.net_surplus, dec!(100));

    let second = t.book.close(next, t.fund).unwrap();
    assert_eq!(second.net_surplus, dec!(300));

    let year_end = date(2027, 3, 31);
    let following = date(2027, 4, 1);
    for account in [t.cash, t.bank, t.fund] {
        assert_eq!(
            t.book.balance(account, following).opening_balance,
            t.book.balance(account, year_end).closing_balance
        );
    }
    assert_eq!(t.book.balance(t.cash, following).closing_balance, dec!(100));
    assert_eq!(t.book.balance(t.bank, following).closing_balance, dec!(300));
    assert_eq!(t.book.balance(t.fund, following).closing_balance, dec!(400));
    let trial = t.book.trial_balance(following);
    assert!(trial.totals.is_balanced);
    assert_eq!(trial.totals.total_debit, dec!(400));
}

#[test]
fn scenario_replaced_opening_set_drops_missing_account() {
    let mut t = temple();
    let earlier = t.book.add_period(date(2024, 4, 1), date(2025, 3, 31), PeriodType::Year);
    t.book.set_opening(t.cash, earlier, dec!(100), Decimal::ZERO);
    t.book.set_opening(t.fund, earlier, Decimal::ZERO, dec!(100));
    t.book.set_opening(t.bank, t.fy, dec!(500), Decimal::ZERO);
    t.book.set_opening(t.fund, t.fy, Decimal::ZERO, dec!(500));

    let on = date(2025, 5, 1);
    assert_eq!(t.book.balance(t.cash, on).closing_balance, Decimal::ZERO);
    assert_eq!(t.book.balance(t.cash, date(2025, 3, 31)).closing_balance, dec!(100));

    let trial = t.book.trial_balance(on);
    assert!(trial.totals.is_balanced);
    assert_eq!(trial.totals.total_debit, dec!(500));
    assert!(trial.rows.iter().all(|row| row.account.account_id != t.cash));
}

#[test]
fn scenario_e_void_restores_balances() {
    let mut t = temple();
    let on = date(2025, 8, 10);
    let kept = t
        .book
        .create_draft(&NewJournalEntry::manual(
            on,
            "Deposit",
            vec![
                JournalLineInput::debit(t.bank, dec!(250)),
                JournalLineInput::credit(t.cash, dec!(250)),
            ],
        ))
        .unwrap();
    t.book.post(kept).unwrap();
    let before: Vec<Decimal> = [t.cash, t.donations]
        .iter()
        .map(|a| t.book.balance(*a, on).closing_balance)
        .collect();

    let id = t.book.create_draft(&donation(&t, dec!(1000), dec!(1000), on)).unwrap();
    t.book.post(id).unwrap();
    let mirror = t.book.void(id, "Duplicate receipt").unwrap();

    let original = t.book.entry(id).clone();
    let reversal = t.book.entry(mirror).clone();
    assert_eq!(original.status, EntryStatus::Voided);
    assert_eq!(original.reversed_by_entry_id, Some(mirror));
    assert_eq!(reversal.status, EntryStatus::Posted);
    assert_eq!(reversal.entry_date, on);
    assert_eq!(reversal.reverses_entry_id, Some(id));
    for (o, r) in original.lines.iter().zip(&reversal.lines) {
        assert_eq!(o.account_id, r.account_id);
        assert_eq!(o.debit, r.credit);
        assert_eq!(o.credit, r.debit);
    }

    let after: Vec<Decimal> = [t.cash, t.donations]
        .iter()
        .map(|a| t.book.balance(*a, on).closing_balance)
        .collect();
    assert_eq!(before, after);
    assert!(t.book.trial_balance(on).totals.is_balanced);

    assert!(matches!(t.book.void(id, "again"), Err(LedgerError::AlreadyVoided(_))));
    assert!(matches!(t.book.post(id), Err(LedgerError::AlreadyVoided(_))));
}

#[test]
fn scenario_reverse_then_correct() {
    let mut t = temple();
    let id = t.book.create_draft(&donation(&t, dec!(700), dec!(700), date(2025, 5, 5))).unwrap();
    t.book.post(id).unwrap();

    let reversal_date = date(2025, 6, 1);
    let original = t.book.entry(id).clone();
    JournalService::validate_reverse(&original, reversal_date, find_covering(&t.book.periods, reversal_date))
        .unwrap();
    let reversal_id = t
        .book
        .insert_posted(&ReversalService::build_reversal(&original, reversal_date, None));
    t.book.entry_mut(id).reversed_by_entry_id = Some(reversal_id);

    assert_eq!(t.book.balance(t.cash, date(2025, 5, 31)).closing_balance, dec!(700));
    assert_eq!(t.book.balance(t.cash, reversal_date).closing_balance, Decimal::ZERO);

    let original = t.book.entry(id).clone();
    assert!(matches!(
        JournalService::validate_reverse(&original, reversal_date, find_covering(&t.book.periods, reversal_date)),
        Err(LedgerError::AlreadyReversed(_))
    ));
}
