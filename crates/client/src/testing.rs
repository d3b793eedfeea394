//! Test fixtures: a scripted transport and a storefront wired to it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cablestore_core::UserProfile;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::TransportError;
use crate::http::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use crate::Storefront;
use crate::store::SessionState;

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: Url,
    pub body: RequestBody,
    pub token: Option<String>,
    pub at: tokio::time::Instant,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Replies with queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    pub requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Ok(ApiResponse::json(status, &body)))
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.push(Err(error))
    }

    fn push(&self, reply: Result<ApiResponse, TransportError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            url,
            body: request.body.clone(),
            token: token.map(|t| t.expose_secret().to_string()),
            at: tokio::time::Instant::now(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".to_string())))
    }
}

/// Profile payload as the backend sends it.
pub fn profile_json(id: i64, email: &str, admin: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "email": email,
        "company_name": "Acme Wire",
        "role": if admin { "admin" } else { "user" },
        "is_admin": admin,
    })
}

/// Cart line payload as the backend sends it.
pub fn cart_line_json(id: i64, variant_id: i64, quantity: u32, price: &str) -> serde_json::Value {
    let subtotal = price.parse::<rust_decimal::Decimal>().unwrap() * rust_decimal::Decimal::from(quantity);
    serde_json::json!({
        "id": id,
        "variant_id": variant_id,
        "quantity": quantity,
        "product_name": "RVV",
        "price": price,
        "subtotal": subtotal.to_string(),
    })
}

/// A storefront over a scripted transport and in-memory credentials.
pub struct Fixture {
    pub shop: Storefront,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryCredentialStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let shop = Storefront::with_transport(config, store.clone(), transport.clone());
        Self {
            shop,
            transport,
            store,
        }
    }

    /// Persisted token and profile, session not yet restored.
    pub fn with_stored_session(admin: bool) -> Self {
        let f = Self::new();
        let user: UserProfile = serde_json::from_value(profile_json(1, "buyer@acme.test", admin)).unwrap();
        f.store.set_token(&SecretString::from("tok")).unwrap();
        f.store.set_user(&user).unwrap();
        f
    }

    /// An active session.
    pub fn logged_in(admin: bool) -> Self {
        let f = Self::with_stored_session(admin);
        f.shop.state().set_session(SessionState {
            user: f.store.user().unwrap(),
            logged_in: true,
        });
        f
    }
}
