//! HTTP/JSON gateway built on reqwest.

use super::{
    BoxFuture, CREATE_FAILED, GatewayConfig, GatewayError, GatewayResult, LOAD_FAILED, PersistenceGateway,
    UPDATE_FAILED,
};
use crate::widget::{CreatedWidget, OverlayId, PatchBody, WidgetDraft, WidgetId, WidgetRecord};
use serde::de::DeserializeOwned;
use reqwest::Url;
use serde_json::Value;

/// Gateway talking to the overlay backend over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Fails if the base URL cannot take path segments.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let base = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GatewayError::Transport(format!("Invalid backend URL: {}", config.base_url)))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, base, config })
    }

    /// Build a gateway from `OVERLAY_*` environment variables.
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: reqwest::RequestBuilder, fallback: &str) -> GatewayResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // A body we cannot read still gets the generic message.
        let body = response.bytes().await.unwrap_or_default();
        let detail = error_detail(&body).unwrap_or_else(|| fallback.to_string());
        log::debug!("Backend answered {}: {}", status.as_u16(), detail);
        Err(GatewayError::from_status(status.as_u16(), detail))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Pull a human-readable `detail` string out of an error body.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        _ => None,
    }
}

impl PersistenceGateway for HttpGateway {
    fn list_widgets(&self, overlay_id: &OverlayId) -> BoxFuture<'_, GatewayResult<Vec<WidgetRecord>>> {
        let builder = self.request(reqwest::Method::GET, &["overlays", overlay_id.as_str(), "widgets"]);
        Box::pin(async move {
            let response = Self::send(builder, LOAD_FAILED).await?;
            Self::decode(response).await
        })
    }

    fn create_widget(&self, draft: &WidgetDraft) -> BoxFuture<'_, GatewayResult<WidgetId>> {
        let builder = self.request(reqwest::Method::POST, &["widgets"]).json(draft);
        Box::pin(async move {
            let response = Self::send(builder, CREATE_FAILED).await?;
            let created: CreatedWidget = Self::decode(response).await?;
            Ok(created.id)
        })
    }

    fn patch_widget(&self, body: &PatchBody) -> BoxFuture<'_, GatewayResult<()>> {
        let builder = self
            .request(reqwest::Method::PATCH, &["widgets", body.widget_id.as_str()])
            .json(body);
        Box::pin(async move {
            Self::send(builder, UPDATE_FAILED).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(br#"{"detail":"Overlay not found"}"#).as_deref(), Some("Overlay not found"));
        assert_eq!(error_detail(br#"{"detail":""}"#), None);
        assert_eq!(error_detail(br#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#), None);
        assert_eq!(error_detail(b"<html>502</html>"), None);
        assert_eq!(error_detail(b""), None);
    }

    #[test]
    fn test_builds_from_config() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://127.0.0.1:9/").with_token("abc")).unwrap();
        assert_eq!(gateway.endpoint(&["widgets"]).as_str(), "http://127.0.0.1:9/widgets");
        assert!(HttpGateway::new(GatewayConfig::new("not a url")).is_err());
        assert!(HttpGateway::new(GatewayConfig::new("mailto:ops@example.com")).is_err());
    }

    #[test]
    fn test_ids_are_percent_encoded() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://127.0.0.1:9/api")).unwrap();
        let url = gateway.endpoint(&["overlays", "a b/c?d", "widgets"]);
        assert_eq!(url.as_str(), "http://127.0.0.1:9/api/overlays/a%20b%2Fc%3Fd/widgets");
        assert_eq!(gateway.endpoint(&["widgets", "w#1"]).path(), "/api/widgets/w%231");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let config = GatewayConfig::new("http://127.0.0.1:9");
        let gateway = HttpGateway::new(config).unwrap();
        let err = gateway.list_widgets(&OverlayId::new("ov")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(err.is_retryable());
    }
}
