//! W3C WebDriver implementation of the automation surface
//!
//! A deliberately small client: one session, CSS-selector element lookup,
//! attribute/text/click, synchronous script evaluation. The remote end is any
//! WebDriver-speaking endpoint (chromedriver, geckodriver, a Selenium grid).

use crate::automation::{AutomationError, AutomationResult, ElementHandle, PageSurface};
use crate::config::SessionConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// W3C WebDriver element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// A live WebDriver session implementing [`PageSurface`].
pub struct WebDriverSession {
    client: reqwest::Client,
    /// `{endpoint}/session/{session_id}`
    session_url: String,
}

impl WebDriverSession {
    /// Starts a new remote session.
    ///
    /// The session is created headless with the configured user agent, and
    /// with an upstream proxy when `proxy_url` is set. The page-load timeout
    /// is registered with the remote end so navigation fails fast.
    pub async fn start(session: &SessionConfig) -> AutomationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AutomationError::SessionStart(e.to_string()))?;

        let endpoint = session.webdriver_url.trim_end_matches('/').to_string();

        let mut always_match = json!({
            "goog:chromeOptions": {
                "args": [
                    "--headless=new",
                    "--disable-blink-features=AutomationControlled",
                    format!("--user-agent={}", session.user_agent),
                ]
            }
        });
        if !session.proxy_url.is_empty() {
            always_match["proxy"] = json!({
                "proxyType": "manual",
                "httpProxy": session.proxy_url,
                "sslProxy": session.proxy_url,
            });
        }

        let body = json!({ "capabilities": { "alwaysMatch": always_match } });
        let response = client
            .post(format!("{}/session", endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| AutomationError::SessionStart(e.to_string()))?;

        let value = unwrap_value(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::Wire("session response without sessionId".into()))?
            .to_string();

        let driver = Self {
            client,
            session_url: format!("{}/session/{}", endpoint, session_id),
        };

        // Register the page-load budget with the remote end; a failure here
        // is not fatal, navigation still carries its own local timeout.
        let timeouts = json!({ "pageLoad": session.nav_timeout_ms });
        if let Err(e) = driver.post("timeouts", &timeouts).await {
            tracing::warn!("Could not set remote timeouts: {}", e);
        }

        Ok(driver)
    }

    async fn post(&self, path: &str, body: &Value) -> AutomationResult<Value> {
        let response = self
            .client
            .post(format!("{}/{}", self.session_url, path))
            .json(body)
            .send()
            .await?;
        unwrap_value(response).await
    }

    async fn get(&self, path: &str) -> AutomationResult<Value> {
        let response = self
            .client
            .get(format!("{}/{}", self.session_url, path))
            .send()
            .await?;
        unwrap_value(response).await
    }

    fn element_from(&self, value: &Value) -> AutomationResult<Box<dyn ElementHandle>> {
        let id = value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| AutomationError::Wire("element without identifier".into()))?;
        Ok(Box::new(WebDriverElement {
            client: self.client.clone(),
            session_url: self.session_url.clone(),
            element_id: id.to_string(),
        }))
    }

    fn elements_from(&self, value: Value) -> AutomationResult<Vec<Box<dyn ElementHandle>>> {
        let list = value
            .as_array()
            .ok_or_else(|| AutomationError::Wire("element list is not an array".into()))?;
        list.iter().map(|v| self.element_from(v)).collect()
    }
}

#[async_trait]
impl PageSurface for WebDriverSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> AutomationResult<()> {
        let body = json!({ "url": url });
        let request = self.post("url", &body);
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AutomationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(AutomationError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", timeout),
            }),
        }
    }

    async fn current_url(&self) -> AutomationResult<String> {
        let value = self.get("url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AutomationError::Wire("current url is not a string".into()))
    }

    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>> {
        let body = json!({ "using": "css selector", "value": selector });
        let value = self.post("elements", &body).await?;
        self.elements_from(value)
    }

    async fn evaluate(&self, script: &str) -> AutomationResult<Value> {
        // Callers pass a JS expression; wrap it so the remote end returns it.
        let body = json!({
            "script": format!("return ({});", script),
            "args": [],
        });
        self.post("execute/sync", &body)
            .await
            .map_err(|e| AutomationError::Script(e.to_string()))
    }

    async fn close(&self) -> AutomationResult<()> {
        let response = self.client.delete(&self.session_url).send().await?;
        unwrap_value(response).await?;
        Ok(())
    }
}

/// A WebDriver element reference implementing [`ElementHandle`].
struct WebDriverElement {
    client: reqwest::Client,
    session_url: String,
    element_id: String,
}

impl WebDriverElement {
    fn url(&self, tail: &str) -> String {
        format!("{}/element/{}/{}", self.session_url, self.element_id, tail)
    }
}

#[async_trait]
impl ElementHandle for WebDriverElement {
    async fn attribute(&self, name: &str) -> AutomationResult<Option<String>> {
        let response = self
            .client
            .get(self.url(&format!("attribute/{}", name)))
            .send()
            .await?;
        let value = unwrap_value(response).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self) -> AutomationResult<String> {
        let response = self.client.get(self.url("text")).send().await?;
        let value = unwrap_value(response).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AutomationError::Wire("element text is not a string".into()))
    }

    async fn click(&self, timeout: Duration) -> AutomationResult<()> {
        let request = self.client.post(self.url("click")).json(&json!({})).send();
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                unwrap_value(response).await?;
                Ok(())
            }
            Ok(Err(e)) => Err(AutomationError::Element(e.to_string())),
            Err(_) => Err(AutomationError::Element(format!(
                "click timed out after {:?}",
                timeout
            ))),
        }
    }

    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>> {
        let body = json!({ "using": "css selector", "value": selector });
        let response = self
            .client
            .post(self.url("elements"))
            .json(&body)
            .send()
            .await?;
        let value = unwrap_value(response).await?;
        let list = value
            .as_array()
            .ok_or_else(|| AutomationError::Wire("element list is not an array".into()))?;
        list.iter()
            .map(|v| {
                let id = v
                    .get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .ok_or_else(|| AutomationError::Wire("element without identifier".into()))?;
                Ok(Box::new(WebDriverElement {
                    client: self.client.clone(),
                    session_url: self.session_url.clone(),
                    element_id: id.to_string(),
                }) as Box<dyn ElementHandle>)
            })
            .collect()
    }
}

/// Unwraps the `value` field of a WebDriver response, mapping protocol errors.
async fn unwrap_value(response: reqwest::Response) -> AutomationResult<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| AutomationError::Wire(e.to_string()))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error");
        return Err(AutomationError::Element(format!(
            "HTTP {}: {}",
            status.as_u16(),
            message
        )));
    }
    Ok(value)
}
