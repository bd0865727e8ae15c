//! In-memory finance backend that honours the contract the suites check.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Datelike, Local};
use configs::ProbeConfig;
use models::accounting::NewTransaction;
use models::attachment::{AttachmentEntity, ALLOWED_MIME_TYPES};
use models::auth::SESSION_COOKIE;
use models::project_finance::{can_edit_vendor_mapping, is_vendor_category, VENDOR_CATEGORIES};
use models::roles::{
    CASHBOOK_GROUP_PERMISSIONS, CONTROLS_GROUP_PERMISSIONS, CRM_PERMISSION_GROUPS, CRM_ROLES,
    FINANCE_PERMISSION_GROUPS, FINANCE_ROLES, LEADERSHIP_ROLES, LEGACY_FINANCE_PERMISSIONS,
    ROLE_EXPECTATIONS,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub const EMAIL: &str = "finance.admin@example.com";
pub const PASSWORD: &str = "mock-password";
/// Seeded project whose spending has started; mapping edits are locked.
pub const LOCKED_PROJECT: &str = "proj_17942869";
/// Seeded project that still accepts vendor mapping edits.
pub const OPEN_PROJECT: &str = "proj_fresh_001";

/// Contract violations the mock can be told to commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Accept settlements larger than the remaining amount.
    pub accept_over_settlement: bool,
    /// Serve the liabilities list without a session.
    pub anonymous_liabilities: bool,
    /// Answer vendor mapping updates with the stored mapping, leaving it unchanged.
    pub ignore_mapping_updates: bool,
    /// Add outflows to the account balance instead of subtracting them.
    pub outflow_adds_to_balance: bool,
    /// Accept transactions dated on a closed day.
    pub accept_locked_day: bool,
    /// Report every project as open for vendor mapping edits.
    pub always_editable: bool,
    /// Overstate `total_received` on project finance rows that have receipts.
    pub inflate_total_received: bool,
    /// Report a revenue total that is not the sum of its parts.
    pub wrong_revenue_total: bool,
    /// Store uploads of any MIME type.
    pub accept_any_file_type: bool,
}

struct Project {
    id: &'static str,
    pid: &'static str,
    name: &'static str,
    client: &'static str,
    contract_value: f64,
    planned_cost: f64,
    actual_cost: f64,
    spending_started: bool,
    production_started: bool,
}

struct StoredFile {
    meta: Value,
    bytes: Vec<u8>,
}

struct Store {
    faults: Faults,
    sessions: HashSet<String>,
    liabilities: Vec<Value>,
    accounts: Vec<Value>,
    categories: Vec<Value>,
    transactions: Vec<Value>,
    locked_days: HashSet<String>,
    attachments: Vec<StoredFile>,
    company: Value,
    projects: Vec<Project>,
    receipts: Vec<Value>,
    mappings: Vec<Value>,
}

#[derive(Clone)]
pub struct MockBackend {
    store: Arc<Mutex<Store>>,
}

impl MockBackend {
    fn new(faults: Faults) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::seeded(faults))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("mock store poisoned")
    }

    pub fn is_locked(&self, day: &str) -> bool {
        self.lock().locked_days.contains(day)
    }

    pub fn company_name(&self) -> String {
        self.lock().company["company_name"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    pub fn mapping_count(&self) -> usize {
        self.lock().mappings.len()
    }
}

impl Store {
    fn seeded(faults: Faults) -> Self {
        let projects = vec![
            Project {
                id: LOCKED_PROJECT,
                pid: "ARKI-PID-00042",
                name: "Sharma Residence",
                client: "R. Sharma",
                contract_value: 1_200_000.0,
                planned_cost: 800_000.0,
                actual_cost: 350_000.0,
                spending_started: true,
                production_started: false,
            },
            Project {
                id: OPEN_PROJECT,
                pid: "ARKI-PID-00043",
                name: "Menon Villa",
                client: "K. Menon",
                contract_value: 900_000.0,
                planned_cost: 0.0,
                actual_cost: 0.0,
                spending_started: false,
                production_started: false,
            },
        ];
        let receipts = vec![
            receipt("rcpt_001", "RCP-2026-0001", LOCKED_PROJECT, 150_000.0, "Booking"),
            receipt(
                "rcpt_002",
                "RCP-2026-0002",
                LOCKED_PROJECT,
                100_000.0,
                "Design Sign-off",
            ),
        ];
        Self {
            faults,
            sessions: HashSet::new(),
            liabilities: vec![json!({
                "liability_id": "liab_seed_001",
                "vendor_name": "Seed Plywood Traders",
                "category": "raw_material",
                "amount": 40_000.0,
                "amount_settled": 0.0,
                "amount_remaining": 40_000.0,
                "status": "open",
                "due_date": Local::now().date_naive().to_string(),
            })],
            accounts: vec![json!({
                "account_id": "acc_seed_001",
                "account_name": "Petty Cash",
                "account_type": "cash",
                "opening_balance": 5_000.0,
                "current_balance": 5_000.0,
            })],
            categories: vec![json!({
                "category_id": "cat_seed_001",
                "name": "Site Expenses",
                "description": "Default category",
                "is_active": true,
            })],
            transactions: Vec::new(),
            locked_days: HashSet::new(),
            attachments: Vec::new(),
            company: json!({
                "company_name": "Arki Dots",
                "company_address": "12 Residency Road, Bengaluru",
                "company_gstin": "29ABCDE1234F1Z5",
                "authorized_signatory": "Test Signatory",
            }),
            projects,
            receipts,
            mappings: vec![json!({
                "mapping_id": "vm_seed_001",
                "project_id": LOCKED_PROJECT,
                "vendor_name": "Seed Modular Works",
                "category": "Modular",
                "planned_amount": 300_000.0,
                "notes": null,
            })],
        }
    }

    fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn total_received(&self, project_id: &str) -> f64 {
        self.receipts
            .iter()
            .filter(|r| r["project_id"] == project_id)
            .filter_map(|r| r["amount"].as_f64())
            .sum()
    }

    fn project_row(&self, p: &Project) -> Value {
        let mut received = self.total_received(p.id);
        if self.faults.inflate_total_received && received > 0.0 {
            received += 500.0;
        }
        json!({
            "project_id": p.id,
            "pid": p.pid,
            "project_name": p.name,
            "client_name": p.client,
            "contract_value": p.contract_value,
            "total_received": received,
            "planned_cost": p.planned_cost,
            "actual_cost": p.actual_cost,
            "safe_surplus": received - p.actual_cost,
            "has_overspend": p.actual_cost > p.planned_cost && p.planned_cost > 0.0,
        })
    }

    fn mappings_of(&self, project_id: &str) -> Vec<Value> {
        self.mappings
            .iter()
            .filter(|m| m["project_id"] == project_id)
            .cloned()
            .collect()
    }

    /// Index of mapping `id`, or the response refusing to touch it.
    fn editable_mapping(&self, id: &str) -> Result<usize, Response> {
        let Some(idx) = self.mappings.iter().position(|m| m["mapping_id"] == id) else {
            return Err(not_found("Mapping"));
        };
        let project_id = self.mappings[idx]["project_id"].as_str().unwrap_or_default();
        match self.project(project_id).and_then(edit_locked) {
            Some(locked) => Err(locked),
            None => Ok(idx),
        }
    }

    fn account_name(&self, id: &str) -> Option<String> {
        self.accounts
            .iter()
            .find(|a| a["account_id"] == id)
            .and_then(|a| a["account_name"].as_str().map(str::to_owned))
    }

    fn category_name(&self, id: &str) -> Option<String> {
        self.categories
            .iter()
            .find(|c| c["category_id"] == id)
            .and_then(|c| c["name"].as_str().map(str::to_owned))
    }
}

fn receipt(id: &str, number: &str, project_id: &str, amount: f64, stage: &str) -> Value {
    json!({
        "receipt_id": id,
        "receipt_number": number,
        "project_id": project_id,
        "payment_date": Local::now().date_naive().to_string(),
        "amount": amount,
        "payment_mode": "bank_transfer",
        "account_name": "HDFC Current",
        "stage_name": stage,
    })
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

fn not_found(what: &str) -> Response {
    detail(StatusCode::NOT_FOUND, format!("{what} not found"))
}

// ---- auth ----

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

fn session_user() -> Value {
    json!({
        "user_id": "user_admin_001",
        "email": EMAIL,
        "name": "Mock Admin",
        "role": "Admin",
    })
}

async fn setup_local_admin() -> Response {
    Json(json!({ "message": "Local admin ready" })).into_response()
}

async fn local_login(
    State(state): State<MockBackend>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Response {
    if body.email != EMAIL || body.password != PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let token = Uuid::new_v4().to_string();
    state.lock().sessions.insert(token.clone());
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    (jar.add(cookie), Json(json!({ "user": session_user() }))).into_response()
}

async fn require_session(
    State(state): State<MockBackend>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let open_liabilities = state.lock().faults.anonymous_liabilities
        && req.uri().path() == "/api/finance/liabilities";
    let valid = jar
        .get(SESSION_COOKIE)
        .map(|c| state.lock().sessions.contains(c.value()))
        .unwrap_or(false);
    if valid || open_liabilities {
        next.run(req).await
    } else {
        detail(StatusCode::UNAUTHORIZED, "Not authenticated")
    }
}

async fn me() -> Response {
    Json(session_user()).into_response()
}

// ---- liabilities and P&L ----

async fn list_liabilities(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = state.lock();
    let items: Vec<Value> = store
        .liabilities
        .iter()
        .filter(|l| q.get("status").map_or(true, |s| l["status"] == s.as_str()))
        .filter(|l| q.get("category").map_or(true, |c| l["category"] == c.as_str()))
        .cloned()
        .collect();
    Json(items).into_response()
}

async fn liabilities_summary(State(state): State<MockBackend>) -> Response {
    let store = state.lock();
    let open: Vec<&Value> = store
        .liabilities
        .iter()
        .filter(|l| l["status"] != "closed")
        .collect();
    let total: f64 = open.iter().filter_map(|l| l["amount_remaining"].as_f64()).sum();
    let top: Vec<Value> = open
        .iter()
        .take(5)
        .map(|l| json!({ "vendor": l["vendor_name"], "amount": l["amount_remaining"] }))
        .collect();
    Json(json!({
        "total_outstanding": total,
        "due_this_month": total,
        "overdue": 0.0,
        "open_count": open.len(),
        "overdue_count": 0,
        "top_vendors": top,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct NewLiabilityBody {
    vendor_name: String,
    category: String,
    amount: f64,
    due_date: Option<String>,
}

async fn create_liability(
    State(state): State<MockBackend>,
    Json(body): Json<NewLiabilityBody>,
) -> Response {
    if body.amount <= 0.0 {
        return detail(StatusCode::BAD_REQUEST, "Amount must be positive");
    }
    let liability = json!({
        "liability_id": new_id("liab"),
        "vendor_name": body.vendor_name,
        "category": body.category,
        "amount": body.amount,
        "amount_settled": 0.0,
        "amount_remaining": body.amount,
        "status": "open",
        "due_date": body.due_date,
    });
    state.lock().liabilities.push(liability.clone());
    Json(liability).into_response()
}

async fn get_liability(State(state): State<MockBackend>, Path(id): Path<String>) -> Response {
    let store = state.lock();
    match store.liabilities.iter().find(|l| l["liability_id"] == id.as_str()) {
        Some(l) => Json(l.clone()).into_response(),
        None => not_found("Liability"),
    }
}

#[derive(Deserialize)]
struct SettleBody {
    amount: f64,
}

async fn settle_liability(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
    Json(body): Json<SettleBody>,
) -> Response {
    let mut store = state.lock();
    let accept_over = store.faults.accept_over_settlement;
    let found = store
        .liabilities
        .iter_mut()
        .find(|l| l["liability_id"] == id.as_str());
    let Some(l) = found else {
        return not_found("Liability");
    };
    let amount = l["amount"].as_f64().unwrap_or_default();
    let settled = l["amount_settled"].as_f64().unwrap_or_default();
    let remaining = amount - settled;
    if body.amount <= 0.0 || (body.amount > remaining + 0.01 && !accept_over) {
        return detail(
            StatusCode::BAD_REQUEST,
            format!("Settlement amount exceeds remaining amount ({remaining})"),
        );
    }
    let settled = settled + body.amount;
    let remaining = (amount - settled).max(0.0);
    l["amount_settled"] = json!(settled);
    l["amount_remaining"] = json!(remaining);
    l["status"] = json!(if remaining < 0.01 { "closed" } else { "partially_settled" });
    Json(l.clone()).into_response()
}

async fn vendors(State(state): State<MockBackend>) -> Response {
    let names: HashSet<String> = state
        .lock()
        .liabilities
        .iter()
        .filter_map(|l| l["vendor_name"].as_str().map(str::to_owned))
        .collect();
    Json(names.into_iter().collect::<Vec<_>>()).into_response()
}

async fn pnl_snapshot(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let today = Local::now().date_naive();
    let month_start = today.with_day(1).unwrap_or(today).to_string();
    let (label, start, end) = match q.get("period").map(String::as_str) {
        Some("quarter") => {
            let quarter = (today.month() - 1) / 3 + 1;
            let label = format!("Q{quarter} {}", today.year());
            (label, month_start, today.to_string())
        }
        Some("custom") => (
            "Custom range".to_string(),
            q.get("start_date").cloned().unwrap_or_default(),
            q.get("end_date").cloned().unwrap_or_default(),
        ),
        _ => (today.format("%B %Y").to_string(), month_start, today.to_string()),
    };
    let revenue_total = if state.lock().faults.wrong_revenue_total {
        256_000.0
    } else {
        255_000.0
    };
    Json(json!({
        "period_label": label,
        "start_date": start,
        "end_date": end,
        "revenue": {
            "from_projects": 250_000.0,
            "other_income": 5_000.0,
            "total": revenue_total,
        },
        "execution_costs": {
            "paid": 120_000.0,
            "committed": 60_000.0,
            "total_exposure": 180_000.0,
        },
        "operating_expenses": {
            "salaries": 40_000.0,
            "office": 8_000.0,
            "marketing": 3_000.0,
            "travel": 1_500.0,
            "misc": 500.0,
            "total": 53_000.0,
        },
        "gross_profit": 135_000.0,
        "net_operating_profit": 82_000.0,
        "cash_profit": 82_000.0,
        "accounting_profit": 22_000.0,
        "profit_difference": 60_000.0,
        "difference_factors": {
            "advances_locked_pct": 40.0,
            "open_liabilities": 40_000.0,
            "committed_not_paid": 60_000.0,
        },
    }))
    .into_response()
}

async fn projects(State(state): State<MockBackend>) -> Response {
    let store = state.lock();
    let items: Vec<Value> = store
        .projects
        .iter()
        .map(|p| {
            json!({
                "project_id": p.id,
                "pid": p.pid,
                "project_name": p.name,
                "client_name": p.client,
            })
        })
        .collect();
    Json(items).into_response()
}

async fn project_profit(State(state): State<MockBackend>, Path(id): Path<String>) -> Response {
    let store = state.lock();
    let Some(p) = store.project(&id) else {
        return not_found("Project");
    };
    let received = store.total_received(p.id);
    let projected = p.contract_value - p.planned_cost;
    let realised = received - p.actual_cost;
    let realised_pct = if received > 0.0 {
        realised / received * 100.0
    } else {
        0.0
    };
    Json(json!({
        "project_id": p.id,
        "contract_value": p.contract_value,
        "planned_cost": p.planned_cost,
        "actual_cost": p.actual_cost,
        "total_received": received,
        "projected_profit": projected,
        "projected_profit_pct": projected / p.contract_value * 100.0,
        "realised_profit": realised,
        "realised_profit_pct": realised_pct,
        "execution_margin_remaining": p.planned_cost - p.actual_cost,
    }))
    .into_response()
}

async fn founder_dashboard() -> Response {
    Json(json!({
        "health": "healthy",
        "total_cash_available": 420_000.0,
        "safe_surplus": 180_000.0,
    }))
    .into_response()
}

// ---- accounting ----

#[derive(Deserialize)]
struct NewAccountBody {
    account_name: String,
    account_type: String,
    opening_balance: f64,
}

async fn list_accounts(State(state): State<MockBackend>) -> Response {
    Json(state.lock().accounts.clone()).into_response()
}

async fn create_account(
    State(state): State<MockBackend>,
    Json(body): Json<NewAccountBody>,
) -> Response {
    let account = json!({
        "account_id": new_id("acc"),
        "account_name": body.account_name,
        "account_type": body.account_type,
        "opening_balance": body.opening_balance,
        "current_balance": body.opening_balance,
    });
    state.lock().accounts.push(account.clone());
    Json(account).into_response()
}

#[derive(Deserialize)]
struct NewCategoryBody {
    name: String,
    description: Option<String>,
}

async fn list_categories(State(state): State<MockBackend>) -> Response {
    Json(state.lock().categories.clone()).into_response()
}

async fn create_category(
    State(state): State<MockBackend>,
    Json(body): Json<NewCategoryBody>,
) -> Response {
    let category = json!({
        "category_id": new_id("cat"),
        "name": body.name,
        "description": body.description,
        "is_active": true,
    });
    state.lock().categories.push(category.clone());
    Json(category).into_response()
}

fn on_day(transaction: &Value, day: &str) -> bool {
    transaction["transaction_date"]
        .as_str()
        .is_some_and(|d| d.starts_with(day))
}

async fn list_transactions(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = state.lock();
    let items: Vec<Value> = store
        .transactions
        .iter()
        .filter(|t| q.get("date").map_or(true, |d| on_day(t, d)))
        .cloned()
        .collect();
    Json(items).into_response()
}

async fn create_transaction(
    State(state): State<MockBackend>,
    Json(body): Json<NewTransaction>,
) -> Response {
    if body.remarks.trim().is_empty() {
        return detail(StatusCode::BAD_REQUEST, "Remarks are required");
    }
    if body.amount <= 0.0 {
        return detail(StatusCode::BAD_REQUEST, "Amount must be greater than zero");
    }
    let Some(day) = body.day().map(|d| d.to_string()) else {
        return detail(StatusCode::BAD_REQUEST, "transaction_date must be ISO-8601");
    };
    let mut store = state.lock();
    if store.locked_days.contains(&day) && !store.faults.accept_locked_day {
        return detail(
            StatusCode::BAD_REQUEST,
            format!("Day {day} is locked; no new entries allowed"),
        );
    }
    let account_name = store.account_name(&body.account_id);
    let category_name = store.category_name(&body.category_id);
    let (Some(account_name), Some(category_name)) = (account_name, category_name) else {
        return not_found("Account or category");
    };
    let delta = if store.faults.outflow_adds_to_balance {
        body.amount
    } else {
        body.transaction_type.balance_delta(body.amount)
    };
    let account = store
        .accounts
        .iter_mut()
        .find(|a| a["account_id"] == body.account_id.as_str());
    if let Some(account) = account {
        let balance = account["current_balance"].as_f64().unwrap_or_default();
        account["current_balance"] = json!(balance + delta);
    }
    let transaction = json!({
        "transaction_id": new_id("txn"),
        "transaction_date": body.transaction_date,
        "transaction_type": body.transaction_type,
        "amount": body.amount,
        "remarks": body.remarks,
        "account_id": body.account_id,
        "account_name": account_name,
        "category_name": category_name,
    });
    store.transactions.push(transaction.clone());
    Json(transaction).into_response()
}

async fn daily_summary(State(state): State<MockBackend>, Path(date): Path<String>) -> Response {
    let store = state.lock();
    let todays: Vec<&Value> = store
        .transactions
        .iter()
        .filter(|t| on_day(t, &date))
        .collect();
    let sum = |kind: &str| -> f64 {
        todays
            .iter()
            .filter(|t| t["transaction_type"] == kind)
            .filter_map(|t| t["amount"].as_f64())
            .sum()
    };
    let (inflow, outflow) = (sum("inflow"), sum("outflow"));
    let accounts: Vec<Value> = store
        .accounts
        .iter()
        .map(|a| {
            json!({
                "account_id": a["account_id"],
                "account_name": a["account_name"],
                "opening_balance": a["opening_balance"],
                "closing_balance": a["current_balance"],
                "inflow": 0.0,
                "outflow": 0.0,
            })
        })
        .collect();
    Json(json!({
        "date": date,
        "is_locked": store.locked_days.contains(&date),
        "total_inflow": inflow,
        "total_outflow": outflow,
        "net_change": inflow - outflow,
        "transaction_count": todays.len(),
        "accounts": accounts,
    }))
    .into_response()
}

async fn close_day(State(state): State<MockBackend>, Path(date): Path<String>) -> Response {
    let mut store = state.lock();
    if !store.locked_days.insert(date.clone()) {
        return detail(StatusCode::BAD_REQUEST, format!("Day {date} is already locked"));
    }
    Json(json!({
        "success": true,
        "closing": {
            "date": date,
            "closed_by": "user_admin_001",
            "closed_at": Local::now().to_rfc3339(),
        },
    }))
    .into_response()
}

async fn accounting_projects(State(state): State<MockBackend>) -> Response {
    projects(State(state)).await
}

async fn account_balances(State(state): State<MockBackend>) -> Response {
    let store = state.lock();
    let total: f64 = store
        .accounts
        .iter()
        .filter_map(|a| a["current_balance"].as_f64())
        .sum();
    Json(json!({ "accounts": store.accounts, "total_balance": total })).into_response()
}

async fn category_summary(State(state): State<MockBackend>) -> Response {
    let store = state.lock();
    let rows: Vec<Value> = store
        .categories
        .iter()
        .map(|c| {
            json!({
                "category_id": c["category_id"],
                "name": c["name"],
                "total": 0.0,
            })
        })
        .collect();
    Json(rows).into_response()
}

// ---- attachments ----

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    entity_type: String,
    #[serde(default)]
    entity_id: String,
    description: Option<String>,
}

async fn upload_attachment(
    State(state): State<MockBackend>,
    Query(q): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Response {
    let mut file = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.bin").to_string();
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.unwrap_or_default().to_vec();
        file = Some((name, mime, bytes));
    }

    if q.entity_type.parse::<AttachmentEntity>().is_err() {
        return detail(
            StatusCode::BAD_REQUEST,
            "Invalid entity type. Must be one of cashbook, expense, project, liability",
        );
    }
    if q.entity_id.trim().is_empty() {
        return detail(StatusCode::BAD_REQUEST, "entity_id is required");
    }
    let Some((name, mime, bytes)) = file else {
        return detail(StatusCode::BAD_REQUEST, "No file uploaded");
    };
    let accept_any = state.lock().faults.accept_any_file_type;
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) && !accept_any {
        return detail(StatusCode::BAD_REQUEST, format!("File type {mime} not allowed"));
    }

    let id = new_id("att");
    let now = Local::now();
    let meta = json!({
        "attachment_id": id,
        "entity_type": q.entity_type,
        "entity_id": q.entity_id,
        "file_name": name,
        "file_path": format!("finance/{}/{:02}/{id}_{name}", now.year(), now.month()),
        "file_size": bytes.len(),
        "mime_type": mime,
        "description": q.description,
        "uploaded_by": "user_admin_001",
        "uploaded_by_name": "Mock Admin",
        "uploaded_at": now.to_rfc3339(),
    });
    state.lock().attachments.push(StoredFile {
        meta: meta.clone(),
        bytes,
    });
    Json(json!({ "success": true, "attachment": meta })).into_response()
}

async fn list_attachments(
    State(state): State<MockBackend>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Response {
    if entity_type.parse::<AttachmentEntity>().is_err() {
        return detail(StatusCode::BAD_REQUEST, "Invalid entity type");
    }
    let store = state.lock();
    let items: Vec<Value> = store
        .attachments
        .iter()
        .filter(|f| {
            f.meta["entity_type"] == entity_type.as_str()
                && f.meta["entity_id"] == entity_id.as_str()
        })
        .map(|f| f.meta.clone())
        .collect();
    Json(json!({ "count": items.len(), "attachments": items })).into_response()
}

async fn download_attachment(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
) -> Response {
    let store = state.lock();
    match store.attachments.iter().find(|f| f.meta["attachment_id"] == id.as_str()) {
        Some(f) => {
            let mime = f.meta["mime_type"]
                .as_str()
                .unwrap_or("application/octet-stream")
                .to_string();
            ([(header::CONTENT_TYPE, mime)], f.bytes.clone()).into_response()
        }
        None => not_found("Attachment"),
    }
}

async fn attachments_by_ids(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let ids: Vec<&str> = q
        .get("ids")
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let store = state.lock();
    let items: Vec<Value> = store
        .attachments
        .iter()
        .filter(|f| {
            f.meta["attachment_id"]
                .as_str()
                .is_some_and(|id| ids.contains(&id))
        })
        .map(|f| f.meta.clone())
        .collect();
    Json(json!({ "count": items.len(), "attachments": items })).into_response()
}

async fn delete_attachment(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
) -> Response {
    let mut store = state.lock();
    let before = store.attachments.len();
    store.attachments.retain(|f| f.meta["attachment_id"] != id.as_str());
    if store.attachments.len() == before {
        return not_found("Attachment");
    }
    Json(json!({ "success": true, "message": "Attachment deleted" })).into_response()
}

// ---- receipts and company settings ----

async fn list_receipts(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = state.lock();
    let items: Vec<Value> = store
        .receipts
        .iter()
        .filter(|r| q.get("project_id").map_or(true, |p| r["project_id"] == p.as_str()))
        .cloned()
        .collect();
    Json(items).into_response()
}

async fn receipt_detail(State(state): State<MockBackend>, Path(id): Path<String>) -> Response {
    let store = state.lock();
    let Some(r) = store.receipts.iter().find(|r| r["receipt_id"] == id.as_str()) else {
        return not_found("Receipt");
    };
    let project_id = r["project_id"].as_str().unwrap_or_default();
    let Some(p) = store.project(project_id) else {
        return not_found("Project");
    };
    let received = store.total_received(project_id);
    let mut body = r.clone();
    body["total_received"] = json!(received);
    body["balance_remaining"] = json!(p.contract_value - received);
    body["project"] = json!({
        "project_id": p.id,
        "project_name": p.name,
        "contract_value": p.contract_value,
    });
    Json(body).into_response()
}

async fn receipt_pdf(State(state): State<MockBackend>, Path(id): Path<String>) -> Response {
    let store = state.lock();
    let Some(r) = store.receipts.iter().find(|r| r["receipt_id"] == id.as_str()) else {
        return not_found("Receipt");
    };
    let mut pdf = format!(
        "%PDF-1.4\n% {} receipt {} signed by {}\n",
        store.company["company_name"].as_str().unwrap_or_default(),
        r["receipt_number"].as_str().unwrap_or_default(),
        store.company["authorized_signatory"].as_str().unwrap_or_default(),
    )
    .into_bytes();
    pdf.resize(2048, b' ');
    pdf.extend_from_slice(b"\n%%EOF\n");
    ([(header::CONTENT_TYPE, "application/pdf")], pdf).into_response()
}

async fn get_company_settings(State(state): State<MockBackend>) -> Response {
    Json(state.lock().company.clone()).into_response()
}

async fn update_company_settings(
    State(state): State<MockBackend>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = state.lock();
    if let Some(fields) = body.as_object() {
        for (k, v) in fields {
            store.company[k.as_str()] = v.clone();
        }
    }
    Json(store.company.clone()).into_response()
}

// ---- project finance ----

async fn vendor_categories() -> Response {
    Json(VENDOR_CATEGORIES).into_response()
}

fn matches_search(p: &Project, needle: &str) -> bool {
    [p.name, p.pid, p.client]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

async fn list_project_finance(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = state.lock();
    let needle = q.get("search").map(|s| s.to_lowercase());
    let rows: Vec<Value> = store
        .projects
        .iter()
        .filter(|p| needle.as_deref().map_or(true, |n| matches_search(p, n)))
        .map(|p| store.project_row(p))
        .collect();
    Json(rows).into_response()
}

async fn project_finance_detail(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
) -> Response {
    let store = state.lock();
    let Some(p) = store.project(&id) else {
        return not_found("Project");
    };
    let row = store.project_row(p);
    let can_edit = store.faults.always_editable
        || can_edit_vendor_mapping(p.spending_started, p.production_started);
    Json(json!({
        "project": {
            "project_id": p.id,
            "pid": p.pid,
            "project_name": p.name,
            "client_name": p.client,
        },
        "summary": {
            "contract_value": p.contract_value,
            "total_received": row["total_received"],
            "planned_cost": p.planned_cost,
            "actual_cost": p.actual_cost,
            "remaining_liability": p.planned_cost - p.actual_cost,
            "safe_surplus": row["safe_surplus"],
            "has_overspend": row["has_overspend"],
        },
        "vendor_mappings": store.mappings_of(p.id),
        "transactions": [],
        "comparison": [],
        "spending_started": p.spending_started,
        "production_started": p.production_started,
        "can_edit_vendor_mapping": can_edit,
    }))
    .into_response()
}

async fn project_mappings(
    State(state): State<MockBackend>,
    Path(project_id): Path<String>,
) -> Response {
    let store = state.lock();
    if store.project(&project_id).is_none() {
        return not_found("Project");
    }
    Json(store.mappings_of(&project_id)).into_response()
}

#[derive(Deserialize)]
struct NewMappingBody {
    project_id: String,
    vendor_name: String,
    category: String,
    planned_amount: f64,
    notes: Option<String>,
}

fn edit_locked(p: &Project) -> Option<Response> {
    if can_edit_vendor_mapping(p.spending_started, p.production_started) {
        None
    } else {
        Some(detail(
            StatusCode::BAD_REQUEST,
            "Vendor mappings are locked because spending has started",
        ))
    }
}

async fn create_mapping(
    State(state): State<MockBackend>,
    Json(body): Json<NewMappingBody>,
) -> Response {
    let mut store = state.lock();
    let Some(p) = store.project(&body.project_id) else {
        return not_found("Project");
    };
    if !is_vendor_category(&body.category) {
        return detail(StatusCode::BAD_REQUEST, format!("Invalid category {}", body.category));
    }
    if let Some(locked) = edit_locked(p) {
        return locked;
    }
    let mapping = json!({
        "mapping_id": new_id("vm"),
        "project_id": body.project_id,
        "vendor_name": body.vendor_name,
        "category": body.category,
        "planned_amount": body.planned_amount,
        "notes": body.notes,
    });
    store.mappings.push(mapping.clone());
    Json(mapping).into_response()
}

async fn update_mapping(
    State(state): State<MockBackend>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    let mut store = state.lock();
    let idx = match store.editable_mapping(&id) {
        Ok(idx) => idx,
        Err(refused) => return refused,
    };
    let ignore = store.faults.ignore_mapping_updates;
    if let Some(fields) = patch.as_object().filter(|_| !ignore) {
        for (k, v) in fields {
            store.mappings[idx][k.as_str()] = v.clone();
        }
    }
    Json(store.mappings[idx].clone()).into_response()
}

async fn delete_mapping(State(state): State<MockBackend>, Path(id): Path<String>) -> Response {
    let mut store = state.lock();
    let idx = match store.editable_mapping(&id) {
        Ok(idx) => idx,
        Err(refused) => return refused,
    };
    store.mappings.remove(idx);
    Json(json!({ "success": true })).into_response()
}

// ---- roles and permissions ----

fn role_category(id: &str) -> &'static str {
    if FINANCE_ROLES.contains(&id) {
        "Finance"
    } else if LEADERSHIP_ROLES.contains(&id) {
        "Leadership"
    } else {
        "CRM"
    }
}

fn default_permissions_of(role: &str) -> Vec<&'static str> {
    ROLE_EXPECTATIONS
        .iter()
        .find(|e| e.role == role)
        .map(|e| e.includes.to_vec())
        .unwrap_or_default()
}

fn all_roles() -> impl Iterator<Item = &'static str> {
    FINANCE_ROLES.iter().chain(LEADERSHIP_ROLES).chain(CRM_ROLES).copied()
}

async fn roles_available() -> Response {
    let roles: Vec<Value> = all_roles()
        .map(|id| {
            json!({
                "id": id,
                "name": id,
                "category": role_category(id),
                "description": format!("{id} role"),
            })
        })
        .collect();
    Json(json!({
        "roles": roles,
        "categories": ["Leadership", "Finance", "CRM"],
    }))
    .into_response()
}

async fn role_default_permissions(Path(role): Path<String>) -> Response {
    if !all_roles().any(|r| r == role) {
        return not_found("Role");
    }
    Json(json!({
        "role": role,
        "default_permissions": default_permissions_of(&role),
    }))
    .into_response()
}

async fn permissions_available() -> Response {
    let group = |ids: &[&str]| {
        let permissions: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "name": id }))
            .collect();
        json!({ "permissions": permissions })
    };
    let mut groups = serde_json::Map::new();
    for name in FINANCE_PERMISSION_GROUPS.iter().chain(CRM_PERMISSION_GROUPS) {
        let ids: &[&str] = match *name {
            "finance_cashbook" => CASHBOOK_GROUP_PERMISSIONS,
            "finance_controls" => CONTROLS_GROUP_PERMISSIONS,
            _ => &[],
        };
        groups.insert(name.to_string(), group(ids));
    }
    groups.insert("finance".into(), group(LEGACY_FINANCE_PERMISSIONS));
    let defaults: serde_json::Map<String, Value> = all_roles()
        .map(|r| (r.to_string(), json!(default_permissions_of(r))))
        .collect();
    Json(json!({
        "permission_groups": groups,
        "available_roles": all_roles().collect::<Vec<_>>(),
        "default_role_permissions": defaults,
    }))
    .into_response()
}

// ---- finance reports ----

async fn reports_available() -> Response {
    Json(json!({ "reports": [
        { "id": "cash-flow", "name": "Cash Flow" },
        { "id": "daily-closing", "name": "Daily Closing" },
    ] }))
    .into_response()
}

async fn cash_flow(Query(q): Query<HashMap<String, String>>) -> Response {
    let today = Local::now().date_naive();
    let months = match q.get("period").map(String::as_str) {
        Some("6months") => 6,
        Some("12months") => 12,
        _ => 3,
    };
    let from = today - chrono::Duration::days(30 * months);
    Json(json!({
        "date_from": from.to_string(),
        "date_to": today.to_string(),
        "inflow": 0.0,
        "outflow": 0.0,
    }))
    .into_response()
}

async fn daily_closing(
    State(state): State<MockBackend>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let date = q
        .get("date")
        .cloned()
        .unwrap_or_else(|| Local::now().date_naive().to_string());
    let store = state.lock();
    Json(json!({
        "date": date,
        "accounts": store.accounts,
        "totals": { "inflow": 0.0, "outflow": 0.0 },
        "is_closed": store.locked_days.contains(&date),
    }))
    .into_response()
}

async fn daily_closing_history(State(state): State<MockBackend>) -> Response {
    let store = state.lock();
    let mut days: Vec<&String> = store.locked_days.iter().collect();
    days.sort();
    let rows: Vec<Value> = days
        .into_iter()
        .rev()
        .map(|d| json!({ "date": d, "is_closed": true }))
        .collect();
    Json(rows).into_response()
}

pub fn router(state: MockBackend) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/finance/liabilities", get(list_liabilities).post(create_liability))
        .route("/api/finance/liabilities/summary", get(liabilities_summary))
        .route("/api/finance/liabilities/:id", get(get_liability))
        .route("/api/finance/liabilities/:id/settle", post(settle_liability))
        .route("/api/finance/vendors", get(vendors))
        .route("/api/finance/pnl-snapshot", get(pnl_snapshot))
        .route("/api/finance/project-profit/:id", get(project_profit))
        .route("/api/finance/founder-dashboard", get(founder_dashboard))
        .route("/api/projects", get(projects))
        .route("/api/accounting/accounts", get(list_accounts).post(create_account))
        .route("/api/accounting/categories", get(list_categories).post(create_category))
        .route(
            "/api/accounting/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/api/accounting/daily-summary/:date", get(daily_summary))
        .route("/api/accounting/close-day/:date", post(close_day))
        .route("/api/accounting/projects-list", get(accounting_projects))
        .route("/api/accounting/reports/account-balances", get(account_balances))
        .route("/api/accounting/reports/category-summary", get(category_summary))
        .route("/api/finance/attachments/upload", post(upload_attachment))
        .route("/api/finance/attachments/by-ids", get(attachments_by_ids))
        .route("/api/finance/attachments/download/:key", get(download_attachment))
        .route("/api/finance/attachments/:key", delete(delete_attachment))
        .route("/api/finance/attachments/:key/:entity_id", get(list_attachments))
        .route("/api/finance/receipts", get(list_receipts))
        .route("/api/finance/receipts/:id", get(receipt_detail))
        .route("/api/finance/receipts/:id/pdf", get(receipt_pdf))
        .route(
            "/api/finance/company-settings",
            get(get_company_settings).post(update_company_settings),
        )
        .route("/api/finance/vendor-categories", get(vendor_categories))
        .route("/api/finance/project-finance", get(list_project_finance))
        .route("/api/finance/project-finance/:id", get(project_finance_detail))
        .route("/api/finance/vendor-mappings", post(create_mapping))
        .route(
            "/api/finance/vendor-mappings/:id",
            get(project_mappings).put(update_mapping).delete(delete_mapping),
        )
        .route("/api/roles/available", get(roles_available))
        .route("/api/roles/:role/default-permissions", get(role_default_permissions))
        .route("/api/permissions/available", get(permissions_available))
        .route("/api/finance/reports/available", get(reports_available))
        .route("/api/finance/reports/cash-flow", get(cash_flow))
        .route("/api/finance/daily-closing", get(daily_closing))
        .route("/api/finance/daily-closing/history", get(daily_closing_history))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/api/auth/setup-local-admin", post(setup_local_admin))
        .route("/api/auth/local-login", post(local_login))
        .merge(protected)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub struct TestApp {
    pub base_url: String,
    pub backend: MockBackend,
}

pub async fn start_backend(faults: Faults) -> anyhow::Result<TestApp> {
    common::utils::logging::init_test_logging();
    let backend = MockBackend::new(faults);
    let app = router(backend.clone());
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e}");
        }
    });

    Ok(TestApp { base_url, backend })
}

/// A validated config pointing at `base_url` with the mock's credentials and fast retries.
pub fn test_config(base_url: &str) -> ProbeConfig {
    let mut cfg = ProbeConfig::default();
    cfg.backend.base_url = base_url.to_string();
    cfg.backend.request_timeout_secs = 10;
    cfg.auth.email = EMAIL.into();
    cfg.auth.password = PASSWORD.into();
    cfg.fixtures.project_id = LOCKED_PROJECT.into();
    cfg.retry.max_attempts = 2;
    cfg.retry.backoff_base_ms = 10;
    cfg.retry.backoff_max_ms = 20;
    cfg.normalize_and_validate().expect("mock config is valid");
    cfg
}
