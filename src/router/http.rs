use super::{RouterApi, RouterError};
use crate::types::RouteMap;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::Serialize;

/// Body of `POST /routes`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteBody<'a> {
    server_address: &'a str,
    backend: &'a str,
}

/// Router API client over HTTP.  One client is shared by every cycle.
pub struct HttpRouter {
    client: Client,
    base: Url,
}

impl HttpRouter {
    pub fn new(base_url: &str) -> Result<Self, RouterError> {
        let base = Url::parse(base_url).map_err(|e| RouterError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RouterError::Url(format!("{} cannot be a base URL", base_url)));
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    /// `<base>/routes[/<segment>]`, with the segment percent-encoded.
    fn routes_url(&self, segment: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("routes");
            if let Some(segment) = segment {
                path.push(segment);
            }
        }
        url
    }
}

fn check(operation: &'static str, response: &reqwest::Response) -> Result<(), RouterError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(RouterError::Status {
            operation,
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl RouterApi for HttpRouter {
    async fn list_routes(&self) -> Result<RouteMap, RouterError> {
        let response = self.client.get(self.routes_url(None)).send().await?;
        check("GET /routes", &response)?;
        let routes: RouteMap = response.json().await?;
        debug!("Router reported {} routes", routes.len());
        Ok(routes)
    }

    async fn upsert_route(&self, name: &str, backend: &str) -> Result<(), RouterError> {
        let body = RouteBody {
            server_address: name,
            backend,
        };
        let response = self
            .client
            .post(self.routes_url(None))
            .json(&body)
            .send()
            .await?;
        check("POST /routes", &response)
    }

    async fn delete_route(&self, name: &str) -> Result<(), RouterError> {
        let response = self
            .client
            .delete(self.routes_url(Some(name)))
            .send()
            .await?;
        check("DELETE /routes", &response)
    }
}
