//! Browser-side client for the `/api` routes.
//!
//! Every request except login carries `Authorization: Bearer <token>` when a token is stored.
//! Without one the request still goes out and the server decides. Failures come back as
//! `ClientError`; nothing is retried.

use leptos::logging::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::admin::SessionGate;
use crate::model::{Contest, ContestUpdate, ErrorDetail, LoginRequest, LoginResponse, NewContest};

/// Local-storage key holding the admin token.
pub const TOKEN_KEY: &str = "admin_token";
pub const API_BASE: &str = "/api";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request failed with status {status}")]
    Http { status: u16, detail: Option<String> },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// The server's `detail` message if it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Where the admin token lives between page loads.
pub trait TokenStore {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str);
    fn clear_token(&self);
}

/// `localStorage` under [`TOKEN_KEY`], stored as the bare token string. Outside the browser
/// there is no storage, so it reads as empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageTokens;

impl TokenStore for LocalStorageTokens {
    fn token(&self) -> Option<String> {
        #[cfg(feature = "hydrate")]
        {
            use gloo_storage::{LocalStorage, Storage};
            LocalStorage::raw().get_item(TOKEN_KEY).ok().flatten()
        }
        #[cfg(not(feature = "hydrate"))]
        {
            None
        }
    }

    fn set_token(&self, token: &str) {
        #[cfg(feature = "hydrate")]
        {
            use gloo_storage::{LocalStorage, Storage};
            if let Err(e) = LocalStorage::raw().set_item(TOKEN_KEY, token) {
                warn!("Could not store admin token: {:?}", e);
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = token;
        }
    }

    fn clear_token(&self) {
        #[cfg(feature = "hydrate")]
        {
            use gloo_storage::{LocalStorage, Storage};
            LocalStorage::delete(TOKEN_KEY);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below [`API_BASE`], e.g. `/contests/3`.
    pub path: String,
    pub body: Option<String>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// `fetch` through gloo-net. Only the hydrated client drives it; during server rendering it
/// reports a network error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

impl Transport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        #[cfg(feature = "hydrate")]
        {
            use gloo_net::http::Request;

            let url = format!("{}{}", API_BASE, request.path);
            let mut builder = match request.method {
                Method::Get => Request::get(&url),
                Method::Post => Request::post(&url),
                Method::Put => Request::put(&url),
                Method::Delete => Request::delete(&url),
            };
            if let Some(token) = &request.bearer {
                builder = builder.header("Authorization", &format!("Bearer {}", token));
            }

            let sent = match request.body {
                Some(body) => {
                    builder
                        .header("Content-Type", "application/json")
                        .body(body)
                        .map_err(|e| ClientError::Network(e.to_string()))?
                        .send()
                        .await
                }
                None => builder.send().await,
            };
            let response = sent.map_err(|e| ClientError::Network(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ClientError::Network(e.to_string()))?;
            Ok(ApiResponse { status, body })
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = request;
            Err(ClientError::Network(
                "no browser transport during server rendering".to_string(),
            ))
        }
    }
}

pub struct ApiClient<T, S> {
    transport: T,
    tokens: S,
}

pub type BrowserClient = ApiClient<FetchTransport, LocalStorageTokens>;

impl BrowserClient {
    pub fn browser() -> Self {
        ApiClient::new(FetchTransport, LocalStorageTokens)
    }
}

impl<T: Transport, S: TokenStore> ApiClient<T, S> {
    pub fn new(transport: T, tokens: S) -> Self {
        ApiClient { transport, tokens }
    }

    pub fn is_authenticated(&self) -> bool {
        SessionGate::from_store(&self.tokens).is_authenticated()
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        body: Option<String>,
        with_token: bool,
    ) -> Result<ApiResponse, ClientError> {
        let bearer = if with_token { self.tokens.token() } else { None };
        let response = self
            .transport
            .send(ApiRequest {
                method,
                path,
                body,
                bearer,
            })
            .await?;

        if response.is_success() {
            Ok(response)
        } else {
            let detail = serde_json::from_str::<ErrorDetail>(&response.body)
                .ok()
                .map(|e| e.detail);
            Err(ClientError::Http {
                status: response.status,
                detail,
            })
        }
    }

    async fn fetch_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: Option<String>,
    ) -> Result<R, ClientError> {
        let response = self.send(method, path, body, true).await?;
        decode(&response.body)
    }

    pub async fn list_contests(&self) -> Result<Vec<Contest>, ClientError> {
        self.fetch_json(Method::Get, "/contests".to_string(), None)
            .await
    }

    pub async fn get_contest(&self, contest_id: i32) -> Result<Contest, ClientError> {
        self.fetch_json(Method::Get, format!("/contests/{}", contest_id), None)
            .await
    }

    pub async fn list_by_class(&self, class_level: i32) -> Result<Vec<Contest>, ClientError> {
        self.fetch_json(Method::Get, format!("/contests/class/{}", class_level), None)
            .await
    }

    pub async fn list_by_year(&self, year: i32) -> Result<Vec<Contest>, ClientError> {
        self.fetch_json(Method::Get, format!("/contests/year/{}", year), None)
            .await
    }

    pub async fn create_contest(&self, contest: &NewContest) -> Result<Contest, ClientError> {
        self.fetch_json(Method::Post, "/contests".to_string(), Some(encode(contest)?))
            .await
    }

    pub async fn update_contest(
        &self,
        contest_id: i32,
        update: &ContestUpdate,
    ) -> Result<Contest, ClientError> {
        self.fetch_json(
            Method::Put,
            format!("/contests/{}", contest_id),
            Some(encode(update)?),
        )
        .await
    }

    pub async fn delete_contest(&self, contest_id: i32) -> Result<(), ClientError> {
        self.send(Method::Delete, format!("/contests/{}", contest_id), None, true)
            .await?;
        Ok(())
    }

    /// Exchanges the admin password for a token and stores it.
    pub async fn login(&self, password: &str) -> Result<String, ClientError> {
        let body = encode(&LoginRequest {
            password: password.to_string(),
        })?;
        let response = self
            .send(Method::Post, "/auth/login".to_string(), Some(body), false)
            .await?;
        let LoginResponse { token } = decode(&response.body)?;
        self.tokens.set_token(&token);
        Ok(token)
    }

    /// Tells the server to drop the session, then forgets the local token whatever the
    /// server said.
    pub async fn logout(&self) {
        if let Err(e) = self
            .send(Method::Post, "/auth/logout".to_string(), None, true)
            .await
        {
            warn!("Logout notification failed: {}", e);
        }
        self.tokens.clear_token();
    }
}

fn encode<B: Serialize>(body: &B) -> Result<String, ClientError> {
    serde_json::to_string(body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn decode<R: DeserializeOwned>(body: &str) -> Result<R, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone)]
    pub(crate) struct MemoryTokens(Rc<RefCell<Option<String>>>);

    impl MemoryTokens {
        pub(crate) fn with_token(token: &str) -> Self {
            MemoryTokens(Rc::new(RefCell::new(Some(token.to_string()))))
        }
    }

    impl TokenStore for MemoryTokens {
        fn token(&self) -> Option<String> {
            self.0.borrow().clone()
        }

        fn set_token(&self, token: &str) {
            *self.0.borrow_mut() = Some(token.to_string());
        }

        fn clear_token(&self) {
            *self.0.borrow_mut() = None;
        }
    }

    /// Replays canned responses in order and records every request it was given.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct MockTransport {
        replies: Rc<RefCell<VecDeque<Result<ApiResponse, ClientError>>>>,
        pub(crate) sent: Rc<RefCell<Vec<ApiRequest>>>,
    }

    impl MockTransport {
        pub(crate) fn reply(&self, status: u16, body: &str) -> &Self {
            self.replies.borrow_mut().push_back(Ok(ApiResponse {
                status,
                body: body.to_string(),
            }));
            self
        }

        pub(crate) fn fail(&self, message: &str) -> &Self {
            self.replies
                .borrow_mut()
                .push_back(Err(ClientError::Network(message.to_string())));
            self
        }
    }

    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
            self.sent.borrow_mut().push(request);
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::Network("no reply queued".to_string())))
        }
    }

    const CONTEST_JSON: &str = r#"{"id":3,"class_level":9,"year":2023,"pre_number":1,"contest_url":"https://codeforces.com/","solution_url":null}"#;

    #[test]
    fn test_requests_carry_bearer_when_token_stored() {
        let transport = MockTransport::default();
        transport.reply(200, &format!("[{}]", CONTEST_JSON));
        let client = ApiClient::new(transport.clone(), MemoryTokens::with_token("tok"));

        let contests = block_on(client.list_contests()).expect("list");
        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].id, 3);
        assert_eq!(contests[0].solution_url, None);

        let sent = transport.sent.borrow();
        assert_eq!(sent[0].method, Method::Get);
        assert_eq!(sent[0].path, "/contests");
        assert_eq!(sent[0].bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn test_requests_without_token_are_still_sent() {
        let transport = MockTransport::default();
        transport.reply(401, r#"{"detail":"Missing or invalid authorization header"}"#);
        let client = ApiClient::new(transport.clone(), MemoryTokens::default());

        let err = block_on(client.delete_contest(4)).expect_err("rejected");
        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.user_message("Failed to delete contest"),
            "Missing or invalid authorization header"
        );

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Delete);
        assert_eq!(sent[0].path, "/contests/4");
        assert_eq!(sent[0].bearer, None);
    }

    #[test]
    fn test_create_and_update_send_json() {
        let transport = MockTransport::default();
        transport.reply(201, CONTEST_JSON).reply(200, CONTEST_JSON);
        let client = ApiClient::new(transport.clone(), MemoryTokens::with_token("tok"));

        let new_contest = NewContest {
            class_level: 9,
            year: 2023,
            pre_number: 1,
            contest_url: Some("https://codeforces.com/".to_string()),
            solution_url: None,
        };
        let created = block_on(client.create_contest(&new_contest)).expect("create");
        assert_eq!(created.id, 3);

        let update = ContestUpdate {
            pre_number: Some(1),
            ..Default::default()
        };
        block_on(client.update_contest(3, &update)).expect("update");

        let sent = transport.sent.borrow();
        assert_eq!(sent[0].method, Method::Post);
        let posted: NewContest =
            serde_json::from_str(sent[0].body.as_deref().expect("body")).expect("json");
        assert_eq!(posted, new_contest);
        assert_eq!(sent[1].method, Method::Put);
        assert_eq!(sent[1].path, "/contests/3");
        assert_eq!(sent[1].body.as_deref(), Some(r#"{"pre_number":1}"#));
    }

    #[test]
    fn test_filtered_listing_paths() {
        let transport = MockTransport::default();
        transport.reply(200, "[]").reply(200, "[]").reply(200, CONTEST_JSON);
        let client = ApiClient::new(transport.clone(), MemoryTokens::default());

        block_on(client.list_by_class(10)).expect("by class");
        block_on(client.list_by_year(2024)).expect("by year");
        block_on(client.get_contest(3)).expect("single");

        let paths: Vec<String> = transport.sent.borrow().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["/contests/class/10", "/contests/year/2024", "/contests/3"]);
    }

    #[test]
    fn test_login_stores_token() {
        let transport = MockTransport::default();
        transport.reply(200, r#"{"token":"fresh"}"#);
        let tokens = MemoryTokens::with_token("stale");
        let client = ApiClient::new(transport.clone(), tokens.clone());

        let token = block_on(client.login("hunter2")).expect("login");
        assert_eq!(token, "fresh");
        assert_eq!(tokens.token().as_deref(), Some("fresh"));

        // Login never sends the old token.
        let sent = transport.sent.borrow();
        assert_eq!(sent[0].path, "/auth/login");
        assert_eq!(sent[0].bearer, None);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"password":"hunter2"}"#));
    }

    #[test]
    fn test_login_failure_messages() {
        let transport = MockTransport::default();
        transport
            .reply(401, r#"{"detail":"Invalid password"}"#)
            .reply(502, "<html>bad gateway</html>")
            .fail("offline");
        let tokens = MemoryTokens::default();
        let client = ApiClient::new(transport, tokens.clone());

        let err = block_on(client.login("wrong")).expect_err("bad password");
        assert_eq!(err.user_message("Login failed"), "Invalid password");

        let err = block_on(client.login("wrong")).expect_err("bad gateway");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message("Login failed"), "Login failed");

        let err = block_on(client.login("wrong")).expect_err("offline");
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(err.user_message("Login failed"), "Login failed");

        assert_eq!(tokens.token(), None);
    }

    #[test]
    fn test_logout_clears_token_even_if_server_fails() {
        let transport = MockTransport::default();
        transport.fail("offline");
        let tokens = MemoryTokens::with_token("tok");
        let client = ApiClient::new(transport.clone(), tokens.clone());

        block_on(client.logout());
        assert_eq!(tokens.token(), None);
        assert!(!client.is_authenticated());
        assert_eq!(transport.sent.borrow()[0].bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn test_empty_stored_token_is_not_authenticated() {
        let client = ApiClient::new(MockTransport::default(), MemoryTokens::with_token(""));
        assert!(!client.is_authenticated());

        let client = ApiClient::new(MockTransport::default(), MemoryTokens::with_token("tok"));
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_undecodable_body() {
        let transport = MockTransport::default();
        transport.reply(200, "not json");
        let client = ApiClient::new(transport, MemoryTokens::default());

        let err = block_on(client.list_contests()).expect_err("decode");
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
