//! In-memory stand-in for the coding-platform admin backend.
//!
//! Covers the endpoints the admin client depends on, with the same envelope
//! shapes and auth failures as the real service: tags come back bare,
//! modules as `{data: [...]}`, contest lists as `{data: {contests: [...]}}`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "EID1001";
pub const ADMIN_PASSWORD: &str = "lab-admin";
pub const REFRESH_COOKIE: &str = "adminRefresh";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: i64,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestProblem {
    pub id: String,
    pub problem_id: String,
    pub order: i64,
    pub points: i64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: String,
    pub title: String,
    pub status: String,
    pub problems: Vec<ContestProblem>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateTag {
    #[serde(default)]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModule {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOrder {
    pub module_id: String,
    pub order: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderModules {
    pub module_orders: Vec<ModuleOrder>,
}

#[derive(Deserialize)]
pub struct CreateContest {
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProblem {
    pub problem_id: String,
    pub points: i64,
    pub label: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOrder {
    pub problem_id: String,
    pub order: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderProblems {
    pub problem_orders: Vec<ProblemOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    Active,
    Expired,
}

#[derive(Default)]
struct Db {
    tokens: HashMap<String, TokenState>,
    refresh_cookies: Vec<String>,
    tags: Vec<Tag>,
    modules: Vec<Module>,
    contests: Vec<Contest>,
    fail_next_reorder: bool,
}

/// Shared backend state. Tests keep a clone to script failures and to make
/// edits behind the client's back.
#[derive(Clone, Default)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every issued token now answers `400 Session Expired`.
    pub async fn expire_sessions(&self) {
        let mut db = self.db.write().await;
        for state in db.tokens.values_mut() {
            *state = TokenState::Expired;
        }
    }

    /// The next reorder request (modules or contest problems) fails with 500.
    pub async fn fail_next_reorder(&self) {
        self.db.write().await.fail_next_reorder = true;
    }

    pub async fn modules(&self) -> Vec<Module> {
        sorted_modules(&self.db.read().await.modules)
    }

    /// Insert a module directly, as another admin would.
    pub async fn insert_module(&self, name: &str) -> Module {
        let mut db = self.db.write().await;
        let module = Module {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            order: db.modules.len() as i64 + 1,
            is_active: true,
        };
        db.modules.push(module.clone());
        module
    }
}

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn created(data: Value) -> Reply {
    (StatusCode::CREATED, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "message": message })))
}

fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), Reply> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token.and_then(|t| db.tokens.get(t)) {
        Some(TokenState::Active) => Ok(()),
        Some(TokenState::Expired) => Err(fail(StatusCode::BAD_REQUEST, "Session Expired")),
        None => Err(fail(StatusCode::UNAUTHORIZED, "Not Authorized")),
    }
}

fn sorted_modules(modules: &[Module]) -> Vec<Module> {
    let mut modules = modules.to_vec();
    modules.sort_by_key(|m| m.order);
    modules
}

fn sorted_contest(contest: &Contest) -> Contest {
    let mut contest = contest.clone();
    contest.problems.sort_by_key(|p| p.order);
    contest
}

/// True when `orders` assigns each of `ids` exactly once, using 1..=n.
fn is_full_permutation<'a>(
    ids: impl Iterator<Item = &'a str>,
    orders: &[(&str, i64)],
) -> bool {
    let mut ids: Vec<&str> = ids.collect();
    let mut given: Vec<&str> = orders.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    given.sort_unstable();
    let mut values: Vec<i64> = orders.iter().map(|(_, order)| *order).collect();
    values.sort_unstable();
    ids == given && values.iter().copied().eq(1..=orders.len() as i64)
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/refresh-status", get(refresh_status))
        .route("/api/coding-platform/tag/getall", get(list_tags))
        .route("/api/coding-platform/tag/create", post(create_tag))
        .route("/api/coding-platform/module/getall", get(list_modules))
        .route("/api/coding-platform/module/create", post(create_module))
        .route("/api/coding-platform/module/update/{id}", put(update_module))
        .route(
            "/api/coding-platform/module/delete/{id}",
            axum::routing::delete(delete_module),
        )
        .route("/api/coding-platform/module/reorder", put(reorder_modules))
        .route("/api/coding-platform/contest/create", post(create_contest))
        .route("/api/coding-platform/contest/getall", get(list_contests))
        .route("/api/coding-platform/contest/get/{id}", get(get_contest))
        .route("/api/coding-platform/contest/{id}/add-problem", post(add_problem))
        .route(
            "/api/coding-platform/contest/{id}/reorder-problems",
            put(reorder_problems),
        )
        .route("/api/coding-platform/contest/{id}/publish", patch(publish_contest))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> Response {
    if input.username != ADMIN_USERNAME || input.password != ADMIN_PASSWORD {
        tracing::info!(username = %input.username, "rejected login");
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    }
    let token = Uuid::new_v4().to_string();
    let refresh = Uuid::new_v4().to_string();
    {
        let mut db = state.db.write().await;
        db.tokens.insert(token.clone(), TokenState::Active);
        db.refresh_cookies.push(refresh.clone());
    }
    tracing::info!(username = %input.username, "admin logged in");

    let body = json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user": { "id": "1", "name": "Lab Admin", "email": "admin@lab.dev" },
            "accessToken": token,
            "expiresAt": "2099-01-01T00:00:00Z"
        }
    });
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{REFRESH_COOKIE}={refresh}; Path=/; HttpOnly"))],
        Json(body),
    )
        .into_response()
}

fn refresh_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value)
}

/// Expires the refresh cookie; bearer tokens stay valid.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(value) = refresh_cookie(&headers) {
        state.db.write().await.refresh_cookies.retain(|c| c != value);
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{REFRESH_COOKIE}=; Path=/; Max-Age=0"))],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

/// Reports whether the request carried any cookie at all, and whether it
/// carried a refresh cookie this server issued.
async fn refresh_status(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    let valid = refresh_cookie(&headers)
        .is_some_and(|value| db.refresh_cookies.iter().any(|c| c == value));
    ok(json!({
        "cookieSent": headers.contains_key(header::COOKIE),
        "refreshCookie": valid,
    }))
}

async fn list_tags(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    (StatusCode::OK, Json(json!(db.tags)))
}

async fn create_tag(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateTag>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    if input.name.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Name is required");
    }
    let tag = Tag {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        color: input.color,
    };
    db.tags.push(tag.clone());
    created(json!(tag))
}

async fn list_modules(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    ok(json!(sorted_modules(&db.modules)))
}

async fn create_module(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateModule>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    if input.name.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Name is required");
    }
    let module = Module {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        description: input.description,
        order: input.order.unwrap_or(db.modules.len() as i64 + 1),
        is_active: input.is_active.unwrap_or(true),
    };
    db.modules.push(module.clone());
    created(json!(module))
}

async fn update_module(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateModule>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let Some(module) = db.modules.iter_mut().find(|m| m.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Module not found");
    };
    if let Some(name) = input.name {
        module.name = name;
    }
    if let Some(description) = input.description {
        module.description = Some(description);
    }
    if let Some(is_active) = input.is_active {
        module.is_active = is_active;
    }
    ok(json!(module))
}

async fn delete_module(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let before = db.modules.len();
    db.modules.retain(|m| m.id != id);
    if db.modules.len() == before {
        return fail(StatusCode::NOT_FOUND, "Module not found");
    }
    let mut remaining = sorted_modules(&db.modules);
    for (module, order) in remaining.iter_mut().zip(1..) {
        module.order = order;
    }
    db.modules = remaining;
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Module deleted" })),
    )
}

async fn reorder_modules(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ReorderModules>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    if std::mem::take(&mut db.fail_next_reorder) {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reorder modules");
    }
    let orders: Vec<(&str, i64)> = input
        .module_orders
        .iter()
        .map(|o| (o.module_id.as_str(), o.order))
        .collect();
    if !is_full_permutation(db.modules.iter().map(|m| m.id.as_str()), &orders) {
        return fail(StatusCode::BAD_REQUEST, "Invalid module order payload");
    }
    for module in db.modules.iter_mut() {
        if let Some((_, order)) = orders.iter().find(|(id, _)| *id == module.id) {
            module.order = *order;
        }
    }
    tracing::info!(count = orders.len(), "modules reordered");
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Modules reordered" })),
    )
}

async fn create_contest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateContest>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    if input.title.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Title is required");
    }
    let contest = Contest {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        status: "DRAFT".to_string(),
        problems: Vec::new(),
    };
    db.contests.push(contest.clone());
    created(json!(contest))
}

async fn list_contests(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let db = state.db.read().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let contests: Vec<Contest> = db.contests.iter().map(sorted_contest).collect();
    ok(json!({ "contests": contests, "total": contests.len() }))
}

async fn get_contest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let db = state.db.read().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    match db.contests.iter().find(|c| c.id == id) {
        Some(contest) => ok(json!(sorted_contest(contest))),
        None => fail(StatusCode::NOT_FOUND, "Contest not found"),
    }
}

async fn add_problem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<AddProblem>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let Some(contest) = db.contests.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Contest not found");
    };
    if contest.status != "DRAFT" {
        return fail(StatusCode::BAD_REQUEST, "Contest is not a draft");
    }
    if contest.problems.iter().any(|p| p.problem_id == input.problem_id) {
        return fail(StatusCode::BAD_REQUEST, "Problem already in contest");
    }
    let entry = ContestProblem {
        id: Uuid::new_v4().to_string(),
        problem_id: input.problem_id,
        order: contest.problems.len() as i64 + 1,
        points: input.points,
        label: input.label,
    };
    contest.problems.push(entry.clone());
    created(json!(entry))
}

async fn reorder_problems(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ReorderProblems>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let fail_now = std::mem::take(&mut db.fail_next_reorder);
    let Some(contest) = db.contests.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Contest not found");
    };
    if fail_now {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reorder problems");
    }
    if contest.status != "DRAFT" {
        return fail(StatusCode::BAD_REQUEST, "Contest is not a draft");
    }
    let orders: Vec<(&str, i64)> = input
        .problem_orders
        .iter()
        .map(|o| (o.problem_id.as_str(), o.order))
        .collect();
    if !is_full_permutation(contest.problems.iter().map(|p| p.problem_id.as_str()), &orders) {
        return fail(StatusCode::BAD_REQUEST, "Invalid problem order payload");
    }
    for problem in contest.problems.iter_mut() {
        if let Some((_, order)) = orders.iter().find(|(pid, _)| *pid == problem.problem_id) {
            problem.order = *order;
        }
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Problems reordered" })),
    )
}

async fn publish_contest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut db = state.db.write().await;
    if let Err(reply) = authorize(&db, &headers) {
        return reply;
    }
    let Some(contest) = db.contests.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Contest not found");
    };
    if contest.problems.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Add at least one problem before publishing");
    }
    contest.status = "SCHEDULED".to_string();
    ok(json!(sorted_contest(contest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_serializes_camel_case() {
        let module = Module {
            id: "m1".to_string(),
            name: "Arrays".to_string(),
            description: None,
            order: 1,
            is_active: true,
        };
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["isActive"], true);
        assert_eq!(json["order"], 1);
    }

    #[test]
    fn permutation_check_requires_every_id_once() {
        let ids = ["a", "b", "c"];
        assert!(is_full_permutation(
            ids.iter().copied(),
            &[("c", 1), ("a", 2), ("b", 3)]
        ));
        assert!(!is_full_permutation(ids.iter().copied(), &[("a", 1), ("b", 2)]));
        assert!(!is_full_permutation(
            ids.iter().copied(),
            &[("a", 1), ("a", 2), ("b", 3)]
        ));
        assert!(!is_full_permutation(
            ids.iter().copied(),
            &[("a", 0), ("b", 1), ("c", 2)]
        ));
    }

    #[test]
    fn reorder_modules_accepts_camel_case_payload() {
        let input: ReorderModules =
            serde_json::from_str(r#"{"moduleOrders":[{"moduleId":"m1","order":1}]}"#).unwrap();
        assert_eq!(input.module_orders[0].module_id, "m1");
    }

    #[test]
    fn authorize_distinguishes_missing_and_expired_tokens() {
        let mut db = Db::default();
        db.tokens.insert("live".to_string(), TokenState::Active);
        db.tokens.insert("old".to_string(), TokenState::Expired);

        let mut headers = HeaderMap::new();
        assert_eq!(authorize(&db, &headers).unwrap_err().0, StatusCode::UNAUTHORIZED);

        headers.insert(header::AUTHORIZATION, "Bearer old".parse().unwrap());
        let (status, Json(body)) = authorize(&db, &headers).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Session Expired");

        headers.insert(header::AUTHORIZATION, "Bearer live".parse().unwrap());
        assert!(authorize(&db, &headers).is_ok());
    }

    #[test]
    fn refresh_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_cookie(&headers), None);
        headers.insert(header::COOKIE, "theme=dark; adminRefresh=r1".parse().unwrap());
        assert_eq!(refresh_cookie(&headers), Some("r1"));
    }
}
