//! In-process stand-in for the expense API, served by axum on an ephemeral
//! port. Records every request's method, path and `Authorization` header.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::app::App;
use crate::config::{ClientConfig, Timeouts};
use crate::schemas::{Expense, ExpenseCreate, ExpenseUpdate, User, UserCreate};
use crate::storage::{MemoryStorage, TokenStorage};

const PREFIX: &str = "/api/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

struct Account {
    user: User,
    password: String,
    token: String,
}

#[derive(Default)]
struct BackendState {
    accounts: Vec<Account>,
    expenses: BTreeMap<i64, Expense>,
    next_expense_id: i64,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<BackendState>>;

pub(crate) struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState { next_expense_id: 1, ..BackendState::default() }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let app = routes(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend serve");
        });
        Self { base_url: format!("http://{addr}{PREFIX}"), state }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().expect("fake backend state")
    }

    /// Register an account whose logins always issue `token`.
    pub fn seed_user(&self, email: &str, password: &str, token: &str) -> User {
        let mut state = self.lock();
        let user = User {
            id: i64::try_from(state.accounts.len()).expect("account count") + 1,
            email: email.to_owned(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        };
        state.accounts.push(Account { user: user.clone(), password: password.to_owned(), token: token.to_owned() });
        user
    }

    pub fn seed_expense(&self, owner_id: i64, description: &str, amount: f64) -> Expense {
        let mut state = self.lock();
        let id = state.next_expense_id;
        state.next_expense_id += 1;
        let expense = Expense {
            id,
            description: Some(description.to_owned()),
            amount,
            category: None,
            date: "2024-05-01T10:00:00".to_owned(),
            owner_id,
        };
        state.expenses.insert(id, expense.clone());
        expense
    }

    /// Invalidate `token` so later requests carrying it get 401.
    pub fn revoke(&self, token: &str) {
        for account in &mut self.lock().accounts {
            if account.token == token {
                account.token = format!("revoked-{token}");
            }
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("{PREFIX}{path}");
        self.requests().into_iter().filter(|r| r.path == full).collect()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url, Timeouts::default(), std::env::temp_dir().join("unused.json"))
            .expect("fake backend config")
    }

    /// Client app over fresh in-memory storage.
    pub fn app(&self) -> App {
        self.app_with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn app_with_storage(&self, storage: Arc<dyn TokenStorage>) -> App {
        App::with_storage(&self.config(), storage).expect("app start")
    }
}

fn routes(state: Shared) -> Router {
    Router::new()
        .route(&format!("{PREFIX}/login/access-token"), post(login))
        .route(&format!("{PREFIX}/users/"), post(register))
        .route(&format!("{PREFIX}/users/me"), get(me))
        .route(&format!("{PREFIX}/expenses/"), post(create_expense))
        .route(&format!("{PREFIX}/expenses/me"), get(list_expenses))
        .route(&format!("{PREFIX}/expenses/{{id}}"), put(update_expense).delete(delete_expense))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    state.lock().expect("fake backend state").requests.push(recorded);
    next.run(request).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authenticate(state: &BackendState, headers: &HeaderMap) -> Option<User> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    state.accounts.iter().find(|a| a.token == token).map(|a| a.user.clone())
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Form(form): Form<LoginForm>) -> Response {
    let state = state.lock().expect("fake backend state");
    match state.accounts.iter().find(|a| a.user.email == form.username && a.password == form.password) {
        Some(account) => Json(json!({ "access_token": account.token, "token_type": "bearer" })).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    }
}

async fn register(State(state): State<Shared>, Json(body): Json<UserCreate>) -> Response {
    let mut state = state.lock().expect("fake backend state");
    if state.accounts.iter().any(|a| a.user.email == body.email) {
        return detail(StatusCode::BAD_REQUEST, "The user with this username already exists in the system.");
    }
    let user = User {
        id: i64::try_from(state.accounts.len()).expect("account count") + 1,
        email: body.email.clone(),
        full_name: body.full_name.clone(),
        is_active: true,
        is_superuser: false,
    };
    let token = format!("tok-{}", user.id);
    state.accounts.push(Account { user: user.clone(), password: body.password, token });
    Json(user).into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().expect("fake backend state");
    match authenticate(&state, &headers) {
        Some(user) => Json(user).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"),
    }
}

#[derive(Deserialize)]
struct PageQuery {
    skip: Option<usize>,
    limit: Option<usize>,
}

async fn list_expenses(State(state): State<Shared>, headers: HeaderMap, Query(page): Query<PageQuery>) -> Response {
    let state = state.lock().expect("fake backend state");
    let Some(user) = authenticate(&state, &headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    };
    let mine: Vec<Expense> = state
        .expenses
        .values()
        .filter(|e| e.owner_id == user.id)
        .skip(page.skip.unwrap_or(0))
        .take(page.limit.unwrap_or(100))
        .cloned()
        .collect();
    Json(mine).into_response()
}

async fn create_expense(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<ExpenseCreate>) -> Response {
    let mut state = state.lock().expect("fake backend state");
    let Some(user) = authenticate(&state, &headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    };
    let id = state.next_expense_id;
    state.next_expense_id += 1;
    let expense = Expense {
        id,
        description: body.description,
        amount: body.amount,
        category: body.category,
        date: body.date.unwrap_or_else(|| "2024-05-02T09:30:00".to_owned()),
        owner_id: user.id,
    };
    state.expenses.insert(id, expense.clone());
    Json(expense).into_response()
}

async fn update_expense(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseUpdate>,
) -> Response {
    let mut state = state.lock().expect("fake backend state");
    let Some(user) = authenticate(&state, &headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    };
    let Some(expense) = state.expenses.get_mut(&id) else {
        return detail(StatusCode::NOT_FOUND, "Expense not found");
    };
    if expense.owner_id != user.id {
        return detail(StatusCode::FORBIDDEN, "Not enough permissions");
    }
    if let Some(description) = body.description {
        expense.description = Some(description);
    }
    if let Some(amount) = body.amount {
        expense.amount = amount;
    }
    if let Some(category) = body.category {
        expense.category = Some(category);
    }
    if let Some(date) = body.date {
        expense.date = date;
    }
    Json(expense.clone()).into_response()
}

async fn delete_expense(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut state = state.lock().expect("fake backend state");
    let Some(user) = authenticate(&state, &headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    };
    match state.expenses.get(&id) {
        None => return detail(StatusCode::NOT_FOUND, "Expense not found"),
        Some(expense) if expense.owner_id != user.id => {
            return detail(StatusCode::FORBIDDEN, "Not enough permissions");
        }
        Some(_) => {}
    }
    match state.expenses.remove(&id) {
        Some(expense) => Json(expense).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Expense not found"),
    }
}
