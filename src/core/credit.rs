//! Worker credit ledger and risk assessment.
//!
//! The ledger is append-only: each row stores the worker's balance after it,
//! computed from the previous row inside the same database transaction.
//! Amounts are rounded to two decimals before they are stored; the balance is
//! the previous balance plus the stored debit minus the stored credit.
//! A negative balance is money outstanding from the worker.

use crate::{
    core::{catalog::ReferenceCatalog, round2, today, validation, worker},
    entities::{WorkerCreditLedger, worker as worker_entity, worker_credit_ledger},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Balance below which debt is critical.
pub const CRITICAL_DEBT_THRESHOLD: f64 = -50_000.0;
/// Balance below which debt is moderate.
pub const MODERATE_DEBT_THRESHOLD: f64 = -20_000.0;
/// Days without ledger activity after which a debtor is dormant.
pub const DORMANCY_DAYS: i64 = 90;
/// Reliability below which a worker is flagged.
pub const LOW_RELIABILITY_THRESHOLD: f64 = 50.0;
/// How far ahead a due date raises a `DUE_SOON` alert.
pub const DUE_SOON_DAYS: u64 = 7;

/// Default transaction type codes.
pub mod credit_codes {
    /// Credit extended to a worker
    pub const CREDIT_ISSUE: &str = "CREDIT_ISSUE";
    /// Payment received from a worker
    pub const PAYMENT_RECEIVED: &str = "PAYMENT_RECEIVED";
}

/// Input for [`record_credit`] and [`record_payment`]
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    /// Worker the entry belongs to
    pub worker_id: i64,
    /// Project the money relates to
    pub project_id: Option<i64>,
    /// Amount, strictly positive
    pub amount: f64,
    /// Transaction type code; the operation's default when `None`
    pub transaction_type: Option<String>,
    /// Entry date; today when `None`
    pub entry_date: Option<NaiveDate>,
    /// Due date, credits only
    pub due_date: Option<NaiveDate>,
    /// Free-text note
    pub notes: Option<String>,
}

impl NewLedgerEntry {
    /// Entry for `amount` with every optional field empty.
    #[must_use]
    pub const fn new(worker_id: i64, amount: f64) -> Self {
        Self {
            worker_id,
            project_id: None,
            amount,
            transaction_type: None,
            entry_date: None,
            due_date: None,
            notes: None,
        }
    }
}

enum Side {
    Debit,
    Credit,
}

async fn append_entry(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    entry: NewLedgerEntry,
    side: Side,
    default_type: &str,
) -> Result<worker_credit_ledger::Model> {
    validation::validate_positive_amount(entry.amount)?;
    let amount = round2(entry.amount);
    validation::validate_positive_amount(amount)?;
    let kind = catalog.credit_type_by_code(entry.transaction_type.as_deref().unwrap_or(default_type))?;

    let txn = db.begin().await?;
    worker::get_worker(&txn, entry.worker_id).await?;

    let previous_balance = WorkerCreditLedger::find()
        .filter(worker_credit_ledger::Column::WorkerId.eq(entry.worker_id))
        .order_by_desc(worker_credit_ledger::Column::Id)
        .one(&txn)
        .await?
        .map_or(0.0, |latest| latest.running_balance);

    let (debit, credit, due_date, is_settled) = match side {
        Side::Debit => (amount, 0.0, entry.due_date, false),
        Side::Credit => (0.0, amount, None, true),
    };
    let row = worker_credit_ledger::ActiveModel {
        worker_id: Set(entry.worker_id),
        project_id: Set(entry.project_id),
        transaction_type_id: Set(kind.id),
        debit: Set(debit),
        credit: Set(credit),
        running_balance: Set(previous_balance + debit - credit),
        entry_date: Set(entry.entry_date.unwrap_or_else(today)),
        due_date: Set(due_date),
        is_settled: Set(is_settled),
        notes: Set(entry.notes),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        "Ledger {} for worker {}: {:.2} -> balance {:.2}",
        kind.code, row.worker_id, amount, row.running_balance
    );
    Ok(row)
}

/// Appends a debit row, raising the worker's balance by `amount`. The row
/// stays unsettled until [`mark_entry_settled`].
#[instrument(skip(db, catalog, entry), fields(worker_id = entry.worker_id))]
pub async fn record_credit(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    entry: NewLedgerEntry,
) -> Result<worker_credit_ledger::Model> {
    append_entry(db, catalog, entry, Side::Debit, credit_codes::CREDIT_ISSUE).await
}

/// Appends a settled credit row, lowering the worker's balance by `amount`.
#[instrument(skip(db, catalog, entry), fields(worker_id = entry.worker_id))]
pub async fn record_payment(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    entry: NewLedgerEntry,
) -> Result<worker_credit_ledger::Model> {
    append_entry(db, catalog, entry, Side::Credit, credit_codes::PAYMENT_RECEIVED).await
}

/// Marks a ledger row settled. Amounts and balances are left as they are.
#[instrument(skip(db))]
pub async fn mark_entry_settled(
    db: &DatabaseConnection,
    entry_id: i64,
) -> Result<worker_credit_ledger::Model> {
    let entry = WorkerCreditLedger::find_by_id(entry_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("ledger entry", entry_id))?;
    if entry.is_settled {
        return Ok(entry);
    }
    let mut active: worker_credit_ledger::ActiveModel = entry.into();
    active.is_settled = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Latest running balance, 0 for a worker with no entries.
pub async fn get_worker_current_balance(db: &DatabaseConnection, worker_id: i64) -> Result<f64> {
    Ok(WorkerCreditLedger::find()
        .filter(worker_credit_ledger::Column::WorkerId.eq(worker_id))
        .order_by_desc(worker_credit_ledger::Column::Id)
        .one(db)
        .await?
        .map_or(0.0, |latest| latest.running_balance))
}

/// A worker's ledger in insertion order.
pub async fn get_ledger_for_worker(
    db: &DatabaseConnection,
    worker_id: i64,
) -> Result<Vec<worker_credit_ledger::Model>> {
    WorkerCreditLedger::find()
        .filter(worker_credit_ledger::Column::WorkerId.eq(worker_id))
        .order_by_asc(worker_credit_ledger::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn unsettled_due_entries(
    db: &DatabaseConnection,
    worker_id: i64,
) -> Result<Vec<worker_credit_ledger::Model>> {
    WorkerCreditLedger::find()
        .filter(worker_credit_ledger::Column::WorkerId.eq(worker_id))
        .filter(worker_credit_ledger::Column::IsSettled.eq(false))
        .filter(worker_credit_ledger::Column::DueDate.is_not_null())
        .order_by_asc(worker_credit_ledger::Column::DueDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Credit risk band; ordered from safest to riskiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    /// No concerns
    Green,
    /// Watch
    Yellow,
    /// Stop credit
    Red,
}

impl RiskLevel {
    /// Upper-case code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

/// Signals a risk assessment is computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSummary {
    /// Latest running balance
    pub balance: f64,
    /// Unsettled entries past their due date
    pub overdue_count: usize,
    /// Days since the latest ledger entry; `None` without entries
    pub days_since_last_activity: Option<i64>,
    /// Worker reliability score
    pub reliability_score: f64,
}

/// Result of [`assess_worker_risk`]
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    /// Worker assessed
    pub worker_id: i64,
    /// Risk band
    pub level: RiskLevel,
    /// One line per rule that fired
    pub flags: Vec<String>,
    /// Inputs behind the verdict
    pub summary: RiskSummary,
}

/// Applies the risk rules in order. Each rule can only raise the level.
#[must_use]
pub fn evaluate_risk(summary: &RiskSummary) -> (RiskLevel, Vec<String>) {
    let mut level = RiskLevel::Green;
    let mut flags = Vec::new();

    if summary.balance < CRITICAL_DEBT_THRESHOLD {
        level = level.max(RiskLevel::Red);
        flags.push("CRITICAL_DEBT: Outstanding > ₹50,000".to_string());
    } else if summary.balance < MODERATE_DEBT_THRESHOLD {
        level = level.max(RiskLevel::Yellow);
        flags.push("MODERATE_DEBT: Outstanding > ₹20,000".to_string());
    }

    if summary.overdue_count > 3 {
        level = level.max(RiskLevel::Red);
        flags.push(format!(
            "MULTIPLE_OVERDUE: {} entries past due",
            summary.overdue_count
        ));
    } else if summary.overdue_count > 0 {
        level = level.max(RiskLevel::Yellow);
        flags.push(format!("OVERDUE: {} entries past due", summary.overdue_count));
    }

    if let Some(days) = summary
        .days_since_last_activity
        .filter(|days| *days >= DORMANCY_DAYS && summary.balance < 0.0)
    {
        level = level.max(RiskLevel::Red);
        flags.push(format!(
            "DORMANT_DEBTOR: No activity for {days} days with outstanding balance"
        ));
    }

    if summary.reliability_score < LOW_RELIABILITY_THRESHOLD && level == RiskLevel::Green {
        level = RiskLevel::Yellow;
        flags.push(format!(
            "LOW_RELIABILITY: Score {:.1}",
            summary.reliability_score
        ));
    }

    (level, flags)
}

/// Assesses a worker's credit risk from their ledger and reliability.
pub async fn assess_worker_risk(db: &DatabaseConnection, worker_id: i64) -> Result<RiskAssessment> {
    let now = today();
    let ledger = get_ledger_for_worker(db, worker_id).await?;
    let balance = ledger.last().map_or(0.0, |latest| latest.running_balance);
    let overdue_count = ledger
        .iter()
        .filter(|entry| !entry.is_settled && entry.due_date.is_some_and(|due| due < now))
        .count();
    let days_since_last_activity = ledger
        .iter()
        .map(|entry| entry.entry_date)
        .max()
        .map(|last| (now - last).num_days());

    let summary = RiskSummary {
        balance,
        overdue_count,
        days_since_last_activity,
        reliability_score: worker::calculate_reliability_score(db, worker_id).await?,
    };
    let (level, flags) = evaluate_risk(&summary);
    debug!("Worker {worker_id} risk {}: {:?}", level.as_str(), flags);

    Ok(RiskAssessment {
        worker_id,
        level,
        flags,
        summary,
    })
}

/// Credit terms for a risk band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditAction {
    /// Whether new credit may be extended
    pub allow_credit: bool,
    /// Ceiling on new credit
    pub max_credit_limit: f64,
    /// Payment terms code
    pub payment_terms: &'static str,
}

/// Credit terms for `level`.
#[must_use]
pub const fn get_credit_action(level: RiskLevel) -> CreditAction {
    match level {
        RiskLevel::Green => CreditAction {
            allow_credit: true,
            max_credit_limit: 100_000.0,
            payment_terms: "NET_30",
        },
        RiskLevel::Yellow => CreditAction {
            allow_credit: true,
            max_credit_limit: 30_000.0,
            payment_terms: "NET_15",
        },
        RiskLevel::Red => CreditAction {
            allow_credit: false,
            max_credit_limit: 0.0,
            payment_terms: "ADVANCE_ONLY",
        },
    }
}

/// Kinds of collection alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Balance below the critical debt threshold
    HighOutstanding,
    /// Unsettled entry due within a week
    DueSoon,
    /// Unsettled entry past due
    Overdue,
}

impl AlertKind {
    /// Upper-case code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighOutstanding => "HIGH_OUTSTANDING",
            Self::DueSoon => "DUE_SOON",
            Self::Overdue => "OVERDUE",
        }
    }
}

/// Alert priority; sorts most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertPriority {
    /// Act now
    Critical,
    /// Act soon
    High,
    /// Keep an eye on it
    Medium,
}

/// One collection alert
#[derive(Debug, Clone)]
pub struct CreditAlert {
    /// Alert kind
    pub kind: AlertKind,
    /// Priority
    pub priority: AlertPriority,
    /// Worker concerned
    pub worker_id: i64,
    /// Worker's name
    pub worker_name: String,
    /// Amount concerned
    pub amount: f64,
    /// Ledger row, for entry alerts
    pub entry_id: Option<i64>,
    /// Due date, for entry alerts
    pub due_date: Option<NaiveDate>,
    /// Days past due, for overdue alerts
    pub days_overdue: Option<i64>,
    /// Display text
    pub message: String,
}

/// Collection alerts across active workers, most urgent first.
pub async fn generate_credit_alerts(db: &DatabaseConnection) -> Result<Vec<CreditAlert>> {
    let now = today();
    let due_soon_limit = now
        .checked_add_days(Days::new(DUE_SOON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let mut alerts = Vec::new();

    for worker in worker::get_active_workers(db).await? {
        let balance = get_worker_current_balance(db, worker.id).await?;
        if balance < CRITICAL_DEBT_THRESHOLD {
            alerts.push(CreditAlert {
                kind: AlertKind::HighOutstanding,
                priority: AlertPriority::High,
                worker_id: worker.id,
                worker_name: worker.name.clone(),
                amount: -balance,
                entry_id: None,
                due_date: None,
                days_overdue: None,
                message: format!("{} has ₹{:.2} outstanding", worker.name, -balance),
            });
        }

        for entry in unsettled_due_entries(db, worker.id).await? {
            let Some(due) = entry.due_date else {
                continue;
            };
            let amount = entry.debit - entry.credit;
            if due < now {
                let days_overdue = (now - due).num_days();
                alerts.push(CreditAlert {
                    kind: AlertKind::Overdue,
                    priority: AlertPriority::Critical,
                    worker_id: worker.id,
                    worker_name: worker.name.clone(),
                    amount,
                    entry_id: Some(entry.id),
                    due_date: Some(due),
                    days_overdue: Some(days_overdue),
                    message: format!(
                        "₹{amount:.2} from {} is {days_overdue} days overdue",
                        worker.name
                    ),
                });
            } else if due <= due_soon_limit {
                alerts.push(CreditAlert {
                    kind: AlertKind::DueSoon,
                    priority: AlertPriority::Medium,
                    worker_id: worker.id,
                    worker_name: worker.name.clone(),
                    amount,
                    entry_id: Some(entry.id),
                    due_date: Some(due),
                    days_overdue: None,
                    message: format!("₹{amount:.2} from {} is due on {due}", worker.name),
                });
            }
        }
    }

    alerts.sort_by_key(|alert| alert.priority);
    Ok(alerts)
}

/// Risk assessments of active workers that are not green, red first.
pub async fn get_workers_at_risk(db: &DatabaseConnection) -> Result<Vec<RiskAssessment>> {
    let mut at_risk = Vec::new();
    for worker in worker::get_active_workers(db).await? {
        let assessment = assess_worker_risk(db, worker.id).await?;
        if assessment.level != RiskLevel::Green {
            at_risk.push(assessment);
        }
    }
    at_risk.sort_by(|a, b| b.level.cmp(&a.level));
    Ok(at_risk)
}

/// A worker with money outstanding
#[derive(Debug, Clone)]
pub struct WorkerOutstanding {
    /// The worker
    pub worker: worker_entity::Model,
    /// Latest running balance
    pub balance: f64,
    /// Amount outstanding, positive
    pub outstanding: f64,
}

/// Active workers with a negative balance, largest outstanding first.
pub async fn get_outstanding_by_worker(db: &DatabaseConnection) -> Result<Vec<WorkerOutstanding>> {
    let mut outstanding = Vec::new();
    for worker in worker::get_active_workers(db).await? {
        let balance = get_worker_current_balance(db, worker.id).await?;
        if balance < 0.0 {
            outstanding.push(WorkerOutstanding {
                worker,
                balance,
                outstanding: -balance,
            });
        }
    }
    outstanding.sort_by(|a, b| b.outstanding.total_cmp(&a.outstanding));
    Ok(outstanding)
}
