//! Cash book: accounts, categories, transactions, daily summary and day closing.

use async_trait::async_trait;
use models::accounting::{
    Account, Category, NewTransaction, Transaction, TransactionType, DAILY_SUMMARY_ACCOUNT_FIELDS,
    DAILY_SUMMARY_FIELDS, TRANSACTION_LIST_FIELDS,
};
use serde_json::Value;

use crate::assert::{
    as_array, boolean, ensure, ensure_detail_mentions, ensure_eq_str, ensure_money, field,
    require_fields, require_first_item_fields, string,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::fixtures::Fixtures;
use crate::report::{passed, skipped, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};

pub struct AccountingSuite;

const CHECKS: &[&str] = &[
    "accounts_list",
    "create_account",
    "categories_list",
    "create_category",
    "transactions_for_date",
    "outflow_reduces_balance",
    "inflow_increases_balance",
    "empty_remarks_rejected",
    "zero_amount_rejected",
    "daily_summary",
    "daily_summary_past_date",
    "close_day",
    "locked_day_rejects_transaction",
    "projects_list",
    "account_balances_report",
    "category_summary_report",
];

#[async_trait]
impl Suite for AccountingSuite {
    fn name(&self) -> &'static str {
        "accounting"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        let mut account: Option<Account> = None;
        let mut category: Option<Category> = None;

        report.run("accounts_list", accounts_list(ctx)).await;
        report.run("create_account", create_account(ctx, &mut account)).await;
        report.run("categories_list", categories_list(ctx)).await;
        report.run("create_category", create_category(ctx, &mut category)).await;
        report.run("transactions_for_date", transactions_for_date(ctx)).await;

        let target = Target {
            account: account.as_ref(),
            category: category.as_ref(),
        };
        let outflow = balance_effect(ctx, &target, TransactionType::Outflow, 100.0);
        report.run("outflow_reduces_balance", outflow).await;
        let inflow = balance_effect(ctx, &target, TransactionType::Inflow, 500.0);
        report.run("inflow_increases_balance", inflow).await;
        report
            .run(
                "empty_remarks_rejected",
                rejected_transaction(ctx, &target, Invalid::EmptyRemarks),
            )
            .await;
        report
            .run(
                "zero_amount_rejected",
                rejected_transaction(ctx, &target, Invalid::ZeroAmount),
            )
            .await;
        report.run("daily_summary", daily_summary(ctx)).await;
        report.run("daily_summary_past_date", daily_summary_past(ctx)).await;
        report.run("close_day", close_day(ctx)).await;
        report
            .run("locked_day_rejects_transaction", locked_day_rejects(ctx, &target))
            .await;
        report
            .run(
                "projects_list",
                list_endpoint(ctx, endpoints::ACCOUNTING_PROJECTS_LIST),
            )
            .await;
        report.run("account_balances_report", account_balances(ctx)).await;
        report
            .run(
                "category_summary_report",
                list_endpoint(ctx, endpoints::CATEGORY_SUMMARY_REPORT),
            )
            .await;
    }
}

/// Account and category the transaction checks write against; created ones win over existing.
struct Target<'a> {
    account: Option<&'a Account>,
    category: Option<&'a Category>,
}

impl Target<'_> {
    async fn ids(&self, ctx: &ProbeContext) -> Result<(String, String), ProbeError> {
        let account_id = match self.account {
            Some(a) => a.account_id.clone(),
            None => first_id(ctx, endpoints::ACCOUNTS, "account_id").await?,
        };
        let category_id = match self.category {
            Some(c) => c.category_id.clone(),
            None => first_id(ctx, endpoints::CATEGORIES, "category_id").await?,
        };
        Ok((account_id, category_id))
    }
}

async fn first_id(ctx: &ProbeContext, path: &str, key: &str) -> Result<String, ProbeError> {
    let body = ctx.session.get(path).await?.expect_status(200)?.json()?;
    let first = as_array(&body, path)?.first().ok_or_else(|| {
        ProbeError::Assertion(format!("{path} is empty; need at least one entry"))
    })?;
    Ok(string(first, key)?.to_string())
}

async fn accounts(ctx: &ProbeContext) -> Result<Vec<Account>, ProbeError> {
    ctx.session
        .get(endpoints::ACCOUNTS)
        .await?
        .expect_status(200)?
        .json_as()
}

async fn balance_of(ctx: &ProbeContext, account_id: &str) -> Result<f64, ProbeError> {
    accounts(ctx)
        .await?
        .into_iter()
        .find(|a| a.account_id == account_id)
        .map(|a| a.current_balance)
        .ok_or_else(|| {
            ProbeError::Assertion(format!("account {account_id} missing from accounts list"))
        })
}

async fn accounts_list(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::ACCOUNTS)
        .await?
        .expect_status(200)?
        .json()?;
    let items = as_array(&body, "accounts")?;
    let fields = [
        "account_id",
        "account_name",
        "account_type",
        "current_balance",
    ];
    require_first_item_fields(items, "account", &fields)?;
    passed()
}

async fn create_account(ctx: &ProbeContext, slot: &mut Option<Account>) -> CheckResult {
    let payload = ctx.fixtures.account(10_000.0);
    let created: Account = ctx
        .session
        .post_json(endpoints::ACCOUNTS, &payload)
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure_eq_str(&created.account_name, &payload.account_name, "account_name")?;
    ensure_eq_str(&created.account_type, &payload.account_type, "account_type")?;
    ensure_money(
        created.opening_balance.unwrap_or_default(),
        payload.opening_balance,
        "opening_balance",
    )?;
    ensure_money(
        created.current_balance,
        payload.opening_balance,
        "current_balance of new account",
    )?;

    let listed = accounts(ctx)
        .await?
        .iter()
        .any(|a| a.account_id == created.account_id);
    ensure(
        listed,
        format!("created account {} not in accounts list", created.account_id),
    )?;
    *slot = Some(created);
    passed()
}

async fn categories_list(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::CATEGORIES)
        .await?
        .expect_status(200)?
        .json()?;
    let items = as_array(&body, "categories")?;
    ensure(!items.is_empty(), "categories list is empty; defaults expected")?;
    require_fields(&items[0], "category", &["category_id", "name", "is_active"])?;
    passed()
}

async fn create_category(ctx: &ProbeContext, slot: &mut Option<Category>) -> CheckResult {
    let payload = ctx.fixtures.category();
    let created: Category = ctx
        .session
        .post_json(endpoints::CATEGORIES, &payload)
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure_eq_str(&created.name, &payload.name, "category name")?;
    ensure(
        created.description == payload.description,
        "category description not echoed",
    )?;

    let listed: Vec<Category> = ctx
        .session
        .get(endpoints::CATEGORIES)
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure(
        listed.iter().any(|c| c.category_id == created.category_id),
        format!("created category {} not in categories list", created.category_id),
    )?;
    *slot = Some(created);
    passed()
}

async fn transactions_for_date(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get_query(endpoints::TRANSACTIONS, &[("date", Fixtures::today())])
        .await?
        .expect_status(200)?
        .json()?;
    let items = as_array(&body, "transactions")?;
    require_first_item_fields(items, "transaction", TRANSACTION_LIST_FIELDS)?;
    passed()
}

async fn balance_effect(
    ctx: &ProbeContext,
    target: &Target<'_>,
    transaction_type: TransactionType,
    amount: f64,
) -> CheckResult {
    let (account_id, category_id) = target.ids(ctx).await?;
    let before = balance_of(ctx, &account_id).await?;

    let payload = ctx.fixtures.transaction(
        &account_id,
        &category_id,
        transaction_type,
        amount,
        Fixtures::now_iso(),
    );
    let created: Transaction = ctx
        .session
        .post_json(endpoints::TRANSACTIONS, &payload)
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure_money(created.amount, amount, "transaction amount")?;
    ensure(
        created.transaction_type == transaction_type,
        "transaction_type not echoed",
    )?;
    ensure(
        created.remarks.as_deref() == Some(payload.remarks.as_str()),
        "remarks not echoed",
    )?;
    ensure(!created.transaction_id.is_empty(), "transaction_id is empty")?;

    let after = balance_of(ctx, &account_id).await?;
    ensure_money(
        after,
        before + transaction_type.balance_delta(amount),
        "current_balance after transaction",
    )?;
    passed()
}

enum Invalid {
    EmptyRemarks,
    ZeroAmount,
}

async fn rejected_transaction(
    ctx: &ProbeContext,
    target: &Target<'_>,
    invalid: Invalid,
) -> CheckResult {
    let (account_id, category_id) = target.ids(ctx).await?;
    let mut payload: NewTransaction = ctx.fixtures.transaction(
        &account_id,
        &category_id,
        TransactionType::Outflow,
        100.0,
        Fixtures::now_iso(),
    );
    payload.paid_to = None;
    match invalid {
        Invalid::EmptyRemarks => payload.remarks.clear(),
        Invalid::ZeroAmount => payload.amount = 0.0,
    }
    ctx.session
        .post_json(endpoints::TRANSACTIONS, &payload)
        .await?
        .expect_status(400)?;
    passed()
}

async fn summary_for(ctx: &ProbeContext, date: &str) -> Result<Value, ProbeError> {
    ctx.session
        .get(&endpoints::daily_summary(date))
        .await?
        .expect_status(200)?
        .json()
}

async fn daily_summary(ctx: &ProbeContext) -> CheckResult {
    let summary = summary_for(ctx, &Fixtures::today()).await?;
    require_fields(&summary, "daily summary", DAILY_SUMMARY_FIELDS)?;
    let accounts = as_array(field(&summary, "accounts")?, "daily summary accounts")?;
    require_first_item_fields(accounts, "daily summary account", DAILY_SUMMARY_ACCOUNT_FIELDS)?;
    passed()
}

async fn daily_summary_past(ctx: &ProbeContext) -> CheckResult {
    let date = ctx.fixtures.past_summary_day();
    let summary = summary_for(ctx, &date).await?;
    ensure_eq_str(string(&summary, "date")?, &date, "summary date")?;
    passed()
}

fn is_locked(summary: &Value) -> bool {
    summary
        .get("is_locked")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

async fn close_day(ctx: &ProbeContext) -> CheckResult {
    let date = ctx.fixtures.locked_day();
    if is_locked(&summary_for(ctx, &date).await?) {
        return skipped(format!("{date} is already locked"));
    }
    let result = ctx
        .session
        .post_empty(&endpoints::close_day(&date))
        .await?
        .expect_status(200)?
        .json()?;
    ensure(boolean(&result, "success")?, "close-day success is false")?;
    field(&result, "closing")?;

    let after = summary_for(ctx, &date).await?;
    ensure(boolean(&after, "is_locked")?, format!("{date} not locked after closing"))?;
    passed()
}

async fn locked_day_rejects(ctx: &ProbeContext, target: &Target<'_>) -> CheckResult {
    let date = ctx.fixtures.locked_day();
    if !is_locked(&summary_for(ctx, &date).await?) {
        ctx.session.post_empty(&endpoints::close_day(&date)).await?;
    }
    let (account_id, category_id) = target.ids(ctx).await?;
    let mut payload = ctx.fixtures.transaction(
        &account_id,
        &category_id,
        TransactionType::Outflow,
        100.0,
        Fixtures::iso_on(&date),
    );
    payload.remarks = ctx.fixtures.prefixed("Should fail - locked day");
    let resp = ctx
        .session
        .post_json(endpoints::TRANSACTIONS, &payload)
        .await?;
    resp.expect_status(400)?;
    ensure_detail_mentions(&resp, &["locked"])?;
    passed()
}

async fn list_endpoint(ctx: &ProbeContext, path: &str) -> CheckResult {
    let body = ctx.session.get(path).await?.expect_status(200)?.json()?;
    as_array(&body, path)?;
    passed()
}

async fn account_balances(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::ACCOUNT_BALANCES_REPORT)
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "account balances report", &["accounts", "total_balance"])?;
    passed()
}
