//! End-to-end tests for the Cablestore client.
//!
//! The tests drive a real [`Storefront`] through its public API. Instead of a
//! network the storefront talks to [`FakeBackend`], an in-memory stand-in for
//! the REST backend that keeps accounts, tokens, carts and orders, and can be
//! told to fail upcoming requests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cablestore-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cablestore_client::credentials::{CredentialStore, MemoryCredentialStore};
use cablestore_client::error::TransportError;
use cablestore_client::http::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use cablestore_client::{ClientConfig, Storefront};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;

/// Path prefix of the default client configuration.
pub const API_PREFIX: &str = "/api/v1";

pub const BUYER_EMAIL: &str = "buyer@acme.test";
pub const BUYER_PASSWORD: &str = "copper-wire";
pub const ADMIN_EMAIL: &str = "ops@acme.test";
pub const ADMIN_PASSWORD: &str = "back-office";

/// Variant of "RVV 3x2.5 black", priced 15.00.
pub const RVV_BLACK: i64 = 100;
/// Variant of "RVV 3x2.5 red", priced 15.00.
pub const RVV_RED: i64 = 101;
/// Variant of "KVV 4x1.5 grey", priced 30.00.
pub const KVV_GREY: i64 = 200;

/// A scripted failure for an upcoming request.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Answer with this status and optional `detail`.
    Status(u16, Option<String>),
    /// No response at all.
    Network,
}

/// A request as the backend received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    /// Path below [`API_PREFIX`].
    pub path: String,
    pub token: Option<String>,
    pub at: tokio::time::Instant,
}

struct Account {
    id: i64,
    email: String,
    password: String,
    company: String,
    admin: bool,
}

impl Account {
    fn profile(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "username": self.email.split('@').next(),
            "company_name": self.company,
            "role": if self.admin { "admin" } else { "user" },
            "is_admin": self.admin,
        })
    }
}

struct Variant {
    product: &'static str,
    spec: &'static str,
    color: &'static str,
    price: Decimal,
    stock: u32,
}

struct Line {
    id: i64,
    variant_id: i64,
    quantity: u32,
}

#[derive(Default)]
struct Backend {
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    variants: HashMap<i64, Variant>,
    carts: HashMap<i64, Vec<Line>>,
    orders: Vec<(i64, Value)>,
    faults: VecDeque<(Option<String>, Fault)>,
    seen: Vec<SeenRequest>,
    next_id: i64,
}

/// In-memory REST backend.
pub struct FakeBackend {
    inner: Mutex<Backend>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Backend with a buyer, an admin and three cable variants in stock.
    #[must_use]
    pub fn new() -> Self {
        let mut backend = Backend {
            next_id: 1000,
            ..Backend::default()
        };
        backend.add_account(BUYER_EMAIL, BUYER_PASSWORD, "Acme Wire", false);
        backend.add_account(ADMIN_EMAIL, ADMIN_PASSWORD, "Cablestore", true);

        let price = |cents| Decimal::new(cents, 2);
        for (id, product, spec, color, cents) in [
            (RVV_BLACK, "RVV", "3x2.5", "black", 1500),
            (RVV_RED, "RVV", "3x2.5", "red", 1500),
            (KVV_GREY, "KVV", "4x1.5", "grey", 3000),
        ] {
            backend.variants.insert(
                id,
                Variant {
                    product,
                    spec,
                    color,
                    price: price(cents),
                    stock: 1000,
                },
            );
        }

        Self {
            inner: Mutex::new(backend),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next request that reaches the backend.
    pub fn fail_next(&self, fault: Fault) -> &Self {
        self.lock().faults.push_back((None, fault));
        self
    }

    /// Fail the next request for `path`; other requests pass through.
    pub fn fail_on(&self, path: &str, fault: Fault) -> &Self {
        self.lock().faults.push_back((Some(path.to_string()), fault));
        self
    }

    /// Invalidate every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.lock().tokens.clear();
    }

    pub fn set_stock(&self, variant: i64, stock: u32) {
        if let Some(v) = self.lock().variants.get_mut(&variant) {
            v.stock = stock;
        }
    }

    /// Put a line straight into a user's server-side cart; returns its ID.
    pub fn seed_cart(&self, email: &str, variant: i64, quantity: u32) -> i64 {
        let mut backend = self.lock();
        let user = backend.account_id(email).unwrap_or_default();
        backend.add_line(user, variant, quantity)
    }

    /// Server-side cart of a user as `(variant, quantity)` pairs.
    #[must_use]
    pub fn cart_of(&self, email: &str) -> Vec<(i64, u32)> {
        let backend = self.lock();
        let user = backend.account_id(email).unwrap_or_default();
        backend
            .carts
            .get(&user)
            .map(|lines| lines.iter().map(|l| (l.variant_id, l.quantity)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.lock().seen.clone()
    }

    /// Number of requests for `method` and `path`.
    #[must_use]
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .seen
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(
        &self,
        request: &ApiRequest,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<ApiResponse, TransportError> {
        let path = url
            .path()
            .strip_prefix(API_PREFIX)
            .unwrap_or_else(|| url.path())
            .to_string();
        let token = token.map(|t| t.expose_secret().to_string());

        let mut backend = self.lock();
        backend.seen.push(SeenRequest {
            method: request.method,
            path: path.clone(),
            token: token.clone(),
            at: tokio::time::Instant::now(),
        });

        let fault = backend
            .faults
            .iter()
            .position(|(target, _)| target.as_deref().is_none_or(|t| t == path))
            .and_then(|index| backend.faults.remove(index))
            .map(|(_, fault)| fault);
        match fault {
            Some(Fault::Network) => Err(TransportError::Connect("connection refused".to_string())),
            Some(Fault::Status(status, detail)) => Ok(ApiResponse::json(
                status,
                &detail.map_or_else(|| json!({}), |d| json!({ "detail": d })),
            )),
            None => Ok(backend.handle(request.method, &path, &request.body, token.as_deref())),
        }
    }
}

fn reply(status: u16, body: &Value) -> ApiResponse {
    ApiResponse::json(status, body)
}

fn rejection(status: u16, detail: &str) -> ApiResponse {
    reply(status, &json!({ "detail": detail }))
}

fn field<'a>(body: &'a RequestBody, name: &str) -> Option<&'a str> {
    match body {
        RequestBody::Form(fields) => fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str()),
        RequestBody::Json(value) => value.get(name).and_then(Value::as_str),
        RequestBody::Empty => None,
    }
}

fn number(body: &RequestBody, name: &str) -> Option<i64> {
    match body {
        RequestBody::Json(value) => value.get(name).and_then(Value::as_i64),
        _ => None,
    }
}

impl Backend {
    fn add_account(&mut self, email: &str, password: &str, company: &str, admin: bool) -> i64 {
        let id = i64::try_from(self.accounts.len()).unwrap_or_default() + 1;
        self.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
            company: company.to_string(),
            admin,
        });
        id
    }

    fn account_id(&self, email: &str) -> Option<i64> {
        self.accounts.iter().find(|a| a.email == email).map(|a| a.id)
    }

    fn account(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_line(&mut self, user: i64, variant_id: i64, quantity: u32) -> i64 {
        let id = self.next_id();
        let cart = self.carts.entry(user).or_default();
        if let Some(line) = cart.iter_mut().find(|l| l.variant_id == variant_id) {
            line.quantity += quantity;
            return line.id;
        }
        cart.push(Line {
            id,
            variant_id,
            quantity,
        });
        id
    }

    fn line_json(&self, line: &Line) -> Value {
        let Some(variant) = self.variants.get(&line.variant_id) else {
            return json!({ "id": line.id, "variant_id": line.variant_id, "quantity": line.quantity });
        };
        json!({
            "id": line.id,
            "variant_id": line.variant_id,
            "quantity": line.quantity,
            "product_name": variant.product,
            "spec": variant.spec,
            "color": variant.color,
            "price": variant.price.to_string(),
            "subtotal": (variant.price * Decimal::from(line.quantity)).to_string(),
        })
    }

    fn handle(&mut self, method: Method, path: &str, body: &RequestBody, token: Option<&str>) -> ApiResponse {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // Public endpoints
        match (method, segments.as_slice()) {
            (Method::Post, ["auth", "login"]) => return self.login(body),
            (Method::Post, ["users"]) => return self.register(body),
            (Method::Get, ["products"]) => return reply(200, &self.products()),
            (Method::Get, ["categories"]) => {
                return reply(200, &json!([{"id": 1, "name": "Power cables"}, {"id": 2, "name": "Control cables"}]));
            }
            _ => {}
        }

        let Some(user) = token.and_then(|t| self.tokens.get(t)).copied() else {
            return rejection(401, "Could not validate credentials");
        };

        match (method, segments.as_slice()) {
            (Method::Post, ["auth", "logout"]) => {
                if let Some(token) = token {
                    self.tokens.remove(token);
                }
                reply(200, &json!({"ok": true}))
            }
            (Method::Get, ["users", "me"]) => match self.account(user) {
                Some(account) => reply(200, &account.profile()),
                None => rejection(404, "User not found"),
            },
            (Method::Get, ["users"]) => {
                if !self.account(user).is_some_and(|a| a.admin) {
                    return rejection(403, "Not enough permissions");
                }
                let all: Vec<Value> = self.accounts.iter().map(Account::profile).collect();
                reply(200, &Value::Array(all))
            }
            (Method::Get, ["cart"]) => {
                let lines: Vec<Value> = self
                    .carts
                    .get(&user)
                    .map(|cart| cart.iter().map(|l| self.line_json(l)).collect())
                    .unwrap_or_default();
                reply(200, &Value::Array(lines))
            }
            (Method::Post, ["cart"]) => self.add_to_cart(user, body),
            (Method::Patch, ["cart", id]) => self.update_line(user, id, body),
            (Method::Delete, ["cart", id]) => {
                let id: i64 = id.parse().unwrap_or_default();
                if let Some(cart) = self.carts.get_mut(&user) {
                    cart.retain(|l| l.id != id);
                }
                reply(200, &json!({"ok": true}))
            }
            (Method::Post, ["orders"]) => self.place_order(user),
            (Method::Get, ["orders", "my"]) => {
                let mine: Vec<Value> = self
                    .orders
                    .iter()
                    .filter(|(owner, _)| *owner == user)
                    .map(|(_, order)| order.clone())
                    .collect();
                reply(200, &Value::Array(mine))
            }
            _ => rejection(404, "Not Found"),
        }
    }

    fn login(&mut self, body: &RequestBody) -> ApiResponse {
        let (Some(email), Some(password)) = (field(body, "username"), field(body, "password")) else {
            return rejection(422, "username and password are required");
        };
        let Some(id) = self
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.id)
        else {
            return rejection(401, "Incorrect username or password");
        };
        let token = format!("token-{id}-{}", self.next_id());
        self.tokens.insert(token.clone(), id);
        reply(200, &json!({"access_token": token, "token_type": "bearer"}))
    }

    fn register(&mut self, body: &RequestBody) -> ApiResponse {
        let (Some(email), Some(password)) = (field(body, "email"), field(body, "password")) else {
            return rejection(422, "email and password are required");
        };
        if self.account_id(email).is_some() {
            return rejection(400, "Email already registered");
        }
        let company = field(body, "company_name").unwrap_or_default().to_string();
        let (email, password) = (email.to_string(), password.to_string());
        let id = self.add_account(&email, &password, &company, false);
        match self.account(id) {
            Some(account) => reply(200, &account.profile()),
            None => rejection(500, "registration failed"),
        }
    }

    fn products(&self) -> Value {
        let variant = |id: i64| {
            self.variants.get(&id).map(|v| {
                json!({"id": id, "spec": v.spec, "color": v.color, "price": v.price.to_string(), "stock": v.stock})
            })
        };
        json!([
            {"id": 10, "name": "RVV", "category_id": 1, "has_variants": true,
             "variants": [variant(RVV_BLACK), variant(RVV_RED)]},
            {"id": 20, "name": "KVV", "category_id": 2, "has_variants": true,
             "variants": [variant(KVV_GREY)]}
        ])
    }

    fn add_to_cart(&mut self, user: i64, body: &RequestBody) -> ApiResponse {
        let (Some(variant_id), Some(quantity)) = (number(body, "variant_id"), number(body, "quantity")) else {
            return rejection(422, "variant_id and quantity are required");
        };
        if !self.variants.contains_key(&variant_id) {
            return rejection(404, "Variant not found");
        }
        let quantity = u32::try_from(quantity).unwrap_or_default();
        let id = self.add_line(user, variant_id, quantity);
        let line = self
            .carts
            .get(&user)
            .and_then(|cart| cart.iter().find(|l| l.id == id))
            .map(|l| self.line_json(l));
        reply(200, &line.unwrap_or(Value::Null))
    }

    fn update_line(&mut self, user: i64, id: &str, body: &RequestBody) -> ApiResponse {
        let id: i64 = id.parse().unwrap_or_default();
        let quantity = number(body, "quantity").unwrap_or_default();
        let Some(cart) = self.carts.get_mut(&user) else {
            return rejection(404, "Cart item not found");
        };
        let Some(index) = cart.iter().position(|l| l.id == id) else {
            return rejection(404, "Cart item not found");
        };

        if quantity <= 0 {
            cart.remove(index);
            return reply(200, &Value::Null);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let variant_id = cart.get(index).map(|l| l.variant_id).unwrap_or_default();
        let stock = self.variants.get(&variant_id).map_or(0, |v| v.stock);
        if quantity > stock {
            return rejection(400, "insufficient stock");
        }

        let Some(line) = self.carts.get_mut(&user).and_then(|cart| cart.get_mut(index)) else {
            return rejection(404, "Cart item not found");
        };
        line.quantity = quantity;
        let line = Line {
            id: line.id,
            variant_id: line.variant_id,
            quantity: line.quantity,
        };
        reply(200, &self.line_json(&line))
    }

    fn place_order(&mut self, user: i64) -> ApiResponse {
        let lines = self.carts.get(&user).map(Vec::as_slice).unwrap_or_default();
        if lines.is_empty() {
            return rejection(400, "Cart is empty");
        }

        let mut total = Decimal::ZERO;
        let mut items = Vec::new();
        for line in lines {
            let Some(variant) = self.variants.get(&line.variant_id) else {
                return rejection(404, "Variant not found");
            };
            if line.quantity > variant.stock {
                return rejection(400, "insufficient stock");
            }
            let subtotal = variant.price * Decimal::from(line.quantity);
            total += subtotal;
            items.push(json!({
                "id": line.id,
                "product_name": variant.product,
                "product_spec": variant.spec,
                "product_color": variant.color,
                "unit_price": variant.price.to_string(),
                "quantity": line.quantity,
                "subtotal": subtotal.to_string(),
            }));
        }

        let id = self.next_id();
        let order = json!({
            "id": id,
            "user_id": user,
            "status": "pending_confirmation",
            "original_total_price": total.to_string(),
            "final_total_price": total.to_string(),
            "created_at": "2026-06-01T12:00:00",
            "items": items,
        });
        self.carts.remove(&user);
        self.orders.push((user, order.clone()));
        reply(200, &order)
    }
}

/// A storefront wired to a fresh [`FakeBackend`].
pub struct TestShop {
    pub shop: Storefront,
    pub backend: Arc<FakeBackend>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl Default for TestShop {
    fn default() -> Self {
        Self::new()
    }
}

impl TestShop {
    /// Default configuration and in-memory credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::with(ClientConfig::default(), Arc::new(MemoryCredentialStore::new()))
    }

    #[must_use]
    pub fn with(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let backend = Arc::new(FakeBackend::new());
        let shop = Storefront::with_transport(config, Arc::clone(&credentials), backend.clone());
        Self {
            shop,
            backend,
            credentials,
        }
    }

    /// A second storefront sharing this one's backend and credentials, as a
    /// new process would.
    #[must_use]
    pub fn restart(&self) -> Storefront {
        Storefront::with_transport(
            self.shop.config().clone(),
            Arc::clone(&self.credentials),
            self.backend.clone(),
        )
    }
}
