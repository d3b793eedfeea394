//! Request descriptors and raw responses.

use secrecy::SecretString;
use serde::{Serialize, de::DeserializeOwned};

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body at all.
    Empty,
    /// `application/json`.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

/// Which credential a request carries and who owns a 401.
///
/// Every request defaults to [`RequestAuth::Session`], so a 401 anywhere ends
/// the session. The two other variants exist only for the login handshake:
/// a rejected login must leave the current session and stored credentials
/// exactly as they were.
#[derive(Debug, Clone)]
pub enum RequestAuth {
    /// Attach the stored session token if any; a 401 ends the session.
    Session,
    /// Send no credential; a 401 is an ordinary rejection. Login and
    /// registration only.
    Anonymous,
    /// Send this token instead of the stored one; a 401 is an ordinary
    /// rejection. Used while a login is still being established.
    Bearer(SecretString),
}

/// Immutable description of an API call.
///
/// Retries resubmit the same descriptor; the attempt count lives with the
/// retry loop, never on the request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/cart/12`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: RequestAuth,
    /// Whether transient failures are retried
    pub retry: bool,
}

impl ApiRequest {
    /// Request with no body, using the session credential.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: RequestAuth::Session,
            retry: true,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a form-encoded body.
    #[must_use]
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }

    /// Send without any credential.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.auth = RequestAuth::Anonymous;
        self
    }

    /// Send with an explicit token instead of the stored one.
    #[must_use]
    pub fn bearer(mut self, token: SecretString) -> Self {
        self.auth = RequestAuth::Bearer(token);
        self
    }

    /// Fail on the first transient error instead of backing off.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    /// Whether a 401 on this request ends the stored session.
    #[must_use]
    pub const fn uses_session(&self) -> bool {
        matches!(self.auth, RequestAuth::Session)
    }
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Decode the body.
    ///
    /// An empty body decodes as JSON `null`, so `Option<T>` and `()` targets
    /// accept a `204 No Content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null);
        }
        serde_json::from_slice(&self.body)
    }

    /// The `detail` field of an error body.
    ///
    /// Strings are returned verbatim. Structured details (validation error
    /// lists) are rendered as compact JSON.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        match value.get("detail")? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = ApiRequest::get("/products/").query("limit", 1000);
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, vec![("limit".to_string(), "1000".to_string())]);
        assert!(req.uses_session());
        assert!(!req.clone().anonymous().uses_session());
    }

    #[test]
    fn test_form_body() {
        let req = ApiRequest::post("/auth/login").form(&[("username", "a@b.c"), ("password", "pw")]);
        assert_eq!(
            req.body,
            RequestBody::Form(vec![
                ("username".to_string(), "a@b.c".to_string()),
                ("password".to_string(), "pw".to_string()),
            ])
        );
    }

    #[test]
    fn test_detail_variants() {
        let plain = ApiResponse::json(400, &serde_json::json!({"detail": "insufficient stock"}));
        assert_eq!(plain.detail().as_deref(), Some("insufficient stock"));

        let structured = ApiResponse::json(422, &serde_json::json!({"detail": [{"msg": "field required"}]}));
        assert_eq!(structured.detail().as_deref(), Some(r#"[{"msg":"field required"}]"#));

        assert!(ApiResponse::new(502, "<html>Bad Gateway</html>").detail().is_none());
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let resp = ApiResponse::new(204, "");
        let decoded: Option<serde_json::Value> = resp.decode().unwrap();
        assert!(decoded.is_none());
        resp.decode::<()>().unwrap();
    }

    #[test]
    fn test_status_classes() {
        assert!(ApiResponse::new(201, "").is_success());
        assert!(ApiResponse::new(503, "").is_server_error());
        assert!(!ApiResponse::new(404, "").is_server_error());
    }
}
