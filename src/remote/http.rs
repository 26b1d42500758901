//! reqwest-backed implementation of [`RemoteClient`]
//!
//! Talks to the platform's headless-delivery REST API with basic auth.
//! Responses with 4xx statuses surface as non-retryable [`MuralError::RemoteApi`]
//! (a permission or configuration problem); 5xx and transport failures are
//! retryable.

use crate::config::RemoteConfig;
use crate::remote::{ContentFields, RemoteClient, RemoteFolder};
use crate::{MuralError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;

pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    site_id: u64,
    username: String,
    password: String,
}

impl HttpRemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            site_id: config.site_id,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/o/headless-delivery/v1.0/{}", self.base_url, path)
    }

    /// Folder collection for a parent. Folder id 0 is the site root, which
    /// the API addresses through the site rather than a folder.
    fn folder_collection(&self, parent_id: u64) -> String {
        if parent_id == 0 {
            self.api(&format!("sites/{}/document-folders", self.site_id))
        } else {
            self.api(&format!("document-folders/{parent_id}/document-folders"))
        }
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    MuralError::RemoteUnreachable(e.to_string())
                } else {
                    MuralError::Reqwest(e)
                }
            })?;

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Remote API HTTP {}: {}", status, message);
            return Err(MuralError::RemoteApi {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Value>().await?)
    }

    fn extract_id(value: &Value) -> Result<u64> {
        value
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| MuralError::RemoteApi {
                status: 200,
                message: "response missing numeric id".to_string(),
            })
    }
}

impl RemoteClient for HttpRemoteClient {
    async fn create_folder(&self, parent_id: u64, name: &str) -> Result<u64> {
        let url = self.folder_collection(parent_id);
        let payload = json!({
            "name": name,
            "viewableBy": "Anyone",
        });

        let response = self.send_json(self.client.post(url).json(&payload)).await?;
        Self::extract_id(&response)
    }

    async fn upload_document(&self, folder_id: u64, bytes: Vec<u8>, filename: &str) -> Result<u64> {
        let url = self.api(&format!("document-folders/{folder_id}/documents"));

        let metadata = json!({
            "title": filename.trim_end_matches(".pdf").replace('_', " "),
            "viewableBy": "Anyone",
        });
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .part(
                "document",
                Part::text(metadata.to_string()).mime_str("application/json")?,
            );

        let response = self
            .send_json(self.client.post(url).multipart(form))
            .await?;
        Self::extract_id(&response)
    }

    async fn create_structured_content(
        &self,
        folder_id: u64,
        structure_id: u64,
        title: &str,
        fields: &ContentFields,
    ) -> Result<u64> {
        let url = self.api(&format!(
            "structured-content-folders/{folder_id}/structured-contents"
        ));

        let mut content_fields = Vec::new();
        if let Some(image_id) = fields.cover_image_id {
            content_fields.push(json!({
                "name": "img",
                "contentFieldValue": { "image": { "id": image_id } },
            }));
        }
        content_fields.push(json!({
            "name": "content",
            "contentFieldValue": { "data": fields.content_html },
        }));

        let payload = json!({
            "title": title,
            "contentStructureId": structure_id,
            "contentFields": content_fields,
            "viewableBy": "Anyone",
        });

        let response = self.send_json(self.client.post(url).json(&payload)).await?;
        Self::extract_id(&response)
    }

    async fn list_folders(&self, parent_id: u64) -> Result<Vec<RemoteFolder>> {
        let url = self.folder_collection(parent_id);
        let response = self.send_json(self.client.get(url)).await?;

        let folders = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(RemoteFolder {
                            id: item.get("id")?.as_u64()?,
                            name: item.get("name")?.as_str()?.to_string(),
                            parent_id: item
                                .get("parentDocumentFolderId")
                                .and_then(Value::as_u64),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: base_url.to_string(),
            site_id: 20121,
            username: "svc".to_string(),
            password: "secret".to_string(),
            root_folder_id: 100,
            fallback_folder_id: 999,
            structure_id: 40101,
            taxonomy_root: "LEGISLACOES".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn create_folder_returns_remote_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/headless-delivery/v1.0/document-folders/100/document-folders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 4242, "name": "RESOLUCAO"})),
            )
            .mount(&server)
            .await;

        let client = HttpRemoteClient::new(&test_config(&server.uri())).unwrap();
        let id = client.create_folder(100, "RESOLUCAO").await.unwrap();
        assert_eq!(id, 4242);
    }

    #[tokio::test]
    async fn root_folder_creates_go_through_the_site() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/headless-delivery/v1.0/sites/20121/document-folders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 77, "name": "LEGISLACOES"})),
            )
            .mount(&server)
            .await;

        let client = HttpRemoteClient::new(&test_config(&server.uri())).unwrap();
        let id = client.create_folder(0, "LEGISLACOES").await.unwrap();
        assert_eq!(id, 77);
    }

    #[tokio::test]
    async fn client_error_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("no permission"))
            .mount(&server)
            .await;

        let client = HttpRemoteClient::new(&test_config(&server.uri())).unwrap();
        let err = client.create_folder(100, "X").await.unwrap_err();
        assert!(matches!(err, MuralError::RemoteApi { status: 403, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpRemoteClient::new(&test_config(&server.uri())).unwrap();
        let err = client.create_folder(100, "X").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn list_folders_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/headless-delivery/v1.0/document-folders/100/document-folders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": 1, "name": "A", "parentDocumentFolderId": 100},
                    {"id": 2, "name": "B"},
                ]
            })))
            .mount(&server)
            .await;

        let client = HttpRemoteClient::new(&test_config(&server.uri())).unwrap();
        let folders = client.list_folders(100).await.unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].parent_id, Some(100));
        assert_eq!(folders[1].parent_id, None);
    }
}
