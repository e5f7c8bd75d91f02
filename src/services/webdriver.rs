// src/services/webdriver.rs

//! [`BrowserSession`] over the W3C WebDriver HTTP protocol.
//!
//! Talks to any WebDriver server (chromedriver, geckodriver, Selenium) with
//! plain JSON requests; only the handful of commands the navigation script
//! needs are implemented.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::error::QueryError;
use crate::models::BrowserConfig;
use crate::services::{BrowserSession, ElementId, SessionFactory};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Driver error codes that mean the session itself is gone.
const SESSION_ERRORS: [&str; 3] = ["invalid session id", "session not created", "no such window"];

/// An error reported by the WebDriver server itself.
#[derive(Debug)]
struct DriverError {
    error: String,
    message: String,
}

impl From<DriverError> for QueryError {
    fn from(e: DriverError) -> Self {
        match e.error.as_str() {
            "timeout" | "script timeout" => QueryError::Timeout(e.message),
            code if SESSION_ERRORS.contains(&code) => {
                QueryError::Session(format!("{}: {}", e.error, e.message))
            }
            _ => QueryError::navigation(e.error, e.message),
        }
    }
}

/// Opens [`WebDriverSession`]s against the configured server.
pub struct WebDriver {
    client: Client,
    config: BrowserConfig,
}

impl WebDriver {
    pub fn new(client: Client, config: BrowserConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SessionFactory for WebDriver {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, QueryError> {
        let session = WebDriverSession::open(self.client.clone(), &self.config).await?;
        Ok(Box::new(session))
    }
}

/// A live WebDriver session.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Start a new browser session.
    pub async fn open(client: Client, config: &BrowserConfig) -> Result<Self, QueryError> {
        let base_url = config.webdriver_url.trim_end_matches('/').to_string();
        let mut args = vec!["--disable-gpu", "--window-size=1280,1024"];
        if config.headless {
            args.push("--headless=new");
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = Self::send(&client, Method::POST, &format!("{base_url}/session"), Some(body))
            .await?
            .map_err(|e| QueryError::Session(format!("{}: {}", e.error, e.message)))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::Session("new session reply lacks sessionId".into()))?
            .to_string();

        log::info!("Opened browser session {session_id} at {base_url}");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send one command; the outer result is transport, the inner the driver's verdict.
    async fn send(
        client: &Client,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<Result<Value, DriverError>, QueryError> {
        let mut request = client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        // The driver being unreachable means the session is unusable.
        let response = request.send().await.map_err(|e| match QueryError::from(e) {
            QueryError::Timeout(m) => QueryError::Timeout(m),
            other => QueryError::Session(other.to_string()),
        })?;
        let status = response.status();
        let reply: Value = response.json().await.map_err(|e| {
            QueryError::Session(format!("{url} returned {status} with unreadable body: {e}"))
        })?;
        let value = reply.get("value").cloned().unwrap_or(Value::Null);

        match value.get("error").and_then(Value::as_str) {
            Some(error) => Ok(Err(DriverError {
                error: error.to_string(),
                message: value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })),
            None if status.is_success() => Ok(Ok(value)),
            None => Err(QueryError::Session(format!("{url} returned {status}"))),
        }
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, QueryError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        Ok(Self::send(&self.client, method, &url, body).await??)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), QueryError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find_element(&mut self, selector: &str) -> Result<Option<ElementId>, QueryError> {
        let url = format!("{}/session/{}/element", self.base_url, self.session_id);
        let body = json!({ "using": "css selector", "value": selector });
        match Self::send(&self.client, Method::POST, &url, Some(body)).await? {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| Some(ElementId(id.to_string())))
                .ok_or_else(|| QueryError::Session("element reply lacks reference".into())),
            Err(e) if e.error == "no such element" => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn click(&mut self, element: &ElementId) -> Result<(), QueryError> {
        self.command(
            Method::POST,
            &format!("/element/{element}/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementId, text: &str) -> Result<(), QueryError> {
        self.command(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn element_text(&mut self, element: &ElementId) -> Result<String, QueryError> {
        let value = self
            .command(Method::GET, &format!("/element/{element}/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(&mut self) -> Result<(), QueryError> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }
}
