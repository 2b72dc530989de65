use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::api::{CatalogSpec, FeatureFilter, InteractiveMapApi, LayerHandle, LayerSpec};
use crate::auth::fetch_token;
use crate::config::{SyncSettings, CATALOG_HRN_PREFIX};
use crate::credentials::Credentials;
use crate::error::HereError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    layers: Vec<CatalogLayer>,
}

#[derive(Debug, Deserialize)]
struct CatalogLayer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiEndpoint {
    #[serde(rename = "baseURL")]
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateCatalogResponse {
    #[serde(default, rename = "configToken")]
    config_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreationStatus {
    status: String,
}

#[derive(Debug, Serialize)]
struct CreateCatalogRequest<'a> {
    #[serde(flatten)]
    catalog: &'a CatalogSpec,
    layers: [&'a LayerSpec; 1],
}

pub struct HereClient<T: HttpTransport> {
    transport: T,
    token: String,
    lookup_url: String,
    config_url: String,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl<T: HttpTransport> HereClient<T> {
    pub fn connect(
        transport: T,
        credentials: &Credentials,
        settings: &SyncSettings,
    ) -> Result<Self, HereError> {
        let token = fetch_token(&transport, credentials)?;
        Ok(Self::with_token(transport, token, settings))
    }

    pub fn with_token(transport: T, token: impl Into<String>, settings: &SyncSettings) -> Self {
        Self {
            transport,
            token: token.into(),
            lookup_url: settings.lookup_url.trim_end_matches('/').to_string(),
            config_url: settings.config_url.trim_end_matches('/').to_string(),
            poll_attempts: settings.status_poll_attempts,
            poll_interval: Duration::from_secs(settings.status_poll_interval_secs),
        }
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HereError> {
        trace!("{:?} {}", request.method, request.url);
        let request = request.header("Authorization", format!("Bearer {}", self.token));
        self.transport.send(request)
    }

    // Send and map any non-success status to an error, 404 included
    fn send_checked(&self, request: HttpRequest, resource: &str) -> Result<HttpResponse, HereError> {
        let response = self.send(request)?;
        if response.status == 404 {
            return Err(HereError::NotFound(resource.to_string()));
        }
        if !response.is_success() {
            return Err(HereError::Status {
                status: response.status,
                message: error_message(&response),
            });
        }
        Ok(response)
    }

    // Catalog creation is asynchronous, block until the config API reports an outcome
    fn wait_for_creation(&self, config_token: &str, catalog_hrn: &str) -> Result<(), HereError> {
        let url = format!("{}/status/{}", self.config_url, config_token);

        for attempt in 1..=self.poll_attempts {
            let response =
                self.send_checked(HttpRequest::new(Method::Get, url.as_str()), config_token)?;
            let creation: CreationStatus = parse_json(&response)?;

            match creation.status.as_str() {
                "success" => return Ok(()),
                "pending" => {
                    debug!(
                        "Creation of {} pending ({}/{})",
                        catalog_hrn, attempt, self.poll_attempts
                    );
                    if attempt < self.poll_attempts {
                        std::thread::sleep(self.poll_interval);
                    }
                }
                other => {
                    return Err(HereError::CatalogCreation(format!(
                        "{} reported '{}': {}",
                        catalog_hrn,
                        other,
                        error_message(&response)
                    )))
                }
            }
        }

        Err(HereError::CatalogCreation(format!(
            "{} still pending after {} status checks",
            catalog_hrn, self.poll_attempts
        )))
    }

    fn interactive_base_url(&self, catalog_hrn: &str) -> Result<String, HereError> {
        let url = format!(
            "{}/resources/{}/apis/interactive/v1",
            self.lookup_url, catalog_hrn
        );
        let response = self.send_checked(HttpRequest::new(Method::Get, url), catalog_hrn)?;
        let endpoints: Vec<ApiEndpoint> = parse_json(&response)?;

        endpoints
            .into_iter()
            .next()
            .map(|endpoint| endpoint.base_url)
            .ok_or_else(|| {
                HereError::InvalidResponse(format!(
                    "No interactive API registered for {}",
                    catalog_hrn
                ))
            })
    }
}

impl<T: HttpTransport> InteractiveMapApi for HereClient<T> {
    fn lookup_layer(&self, catalog_hrn: &str, layer_id: &str) -> Result<LayerHandle, HereError> {
        let url = format!("{}/catalogs/{}", self.config_url, catalog_hrn);
        let response = self.send_checked(HttpRequest::new(Method::Get, url), catalog_hrn)?;
        let catalog: CatalogResponse = parse_json(&response)?;

        if !catalog.layers.iter().any(|layer| layer.id == layer_id) {
            return Err(HereError::NotFound(format!("{}/{}", catalog_hrn, layer_id)));
        }

        Ok(LayerHandle {
            catalog_hrn: catalog_hrn.to_string(),
            layer_id: layer_id.to_string(),
            base_url: self.interactive_base_url(catalog_hrn)?,
        })
    }

    fn create_catalog_and_layer(
        &self,
        catalog: &CatalogSpec,
        layer: &LayerSpec,
    ) -> Result<LayerHandle, HereError> {
        let body = serde_json::to_vec(&CreateCatalogRequest {
            catalog,
            layers: [layer],
        })
        .map_err(|e| HereError::InvalidResponse(e.to_string()))?;

        let url = format!("{}/catalogs", self.config_url);
        let request = HttpRequest::new(Method::Post, url).body(JSON_CONTENT_TYPE, body);
        let response = self.send_checked(request, &catalog.id)?;

        let catalog_hrn = format!("{}{}", CATALOG_HRN_PREFIX, catalog.id);
        let accepted: CreateCatalogResponse = if response.body.is_empty() {
            CreateCatalogResponse { config_token: None }
        } else {
            parse_json(&response)?
        };
        if let Some(token) = accepted.config_token {
            info!("Waiting for the platform to finish creating {}", catalog_hrn);
            self.wait_for_creation(&token, &catalog_hrn)?;
        }

        Ok(LayerHandle {
            base_url: self.interactive_base_url(&catalog_hrn)?,
            catalog_hrn,
            layer_id: layer.id.clone(),
        })
    }

    fn search_features(
        &self,
        layer: &LayerHandle,
        filter: &FeatureFilter,
    ) -> Result<FeatureCollection, HereError> {
        let url = format!("{}?{}", layer.search_url(), filter);
        let response = self.send_checked(HttpRequest::new(Method::Get, url), &layer.layer_id)?;
        parse_json(&response)
    }

    fn delete_features(&self, layer: &LayerHandle, ids: &[String]) -> Result<(), HereError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = reqwest::Url::parse_with_params(
            &layer.features_url(),
            ids.iter().map(|id| ("id", id.as_str())),
        )
        .map_err(|e| HereError::InvalidResponse(format!("Invalid layer URL: {}", e)))?;

        self.send_checked(
            HttpRequest::new(Method::Delete, url.as_str()),
            &layer.layer_id,
        )?;
        Ok(())
    }

    fn write_features(
        &self,
        layer: &LayerHandle,
        features: &FeatureCollection,
    ) -> Result<(), HereError> {
        let body = serde_json::to_vec(features)
            .map_err(|e| HereError::GeoJson(e.to_string()))?;
        let request =
            HttpRequest::new(Method::Put, layer.features_url()).body(GEOJSON_CONTENT_TYPE, body);

        self.send_checked(request, &layer.layer_id)?;
        Ok(())
    }
}

fn parse_json<D: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<D, HereError> {
    serde_json::from_slice(&response.body).map_err(|e| HereError::InvalidResponse(e.to_string()))
}

// Prefer the platform's error title over the raw body
fn error_message(response: &HttpResponse) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(&response.body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["title", "message", "error_description", "errorMessage"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| response.text().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::handle;
    use crate::sync::feature_ids;
    use crate::transport::testing::ScriptedTransport;

    const HRN: &str = "hrn:here:data:::strava-analysis-tool";
    const BASE: &str = "https://interactive.data.api.platform.here.com/interactive/v1/catalogs/cat";

    fn settings() -> SyncSettings {
        SyncSettings {
            status_poll_attempts: 3,
            status_poll_interval_secs: 0,
            ..Default::default()
        }
    }

    fn client(transport: ScriptedTransport) -> HereClient<ScriptedTransport> {
        HereClient::with_token(transport, "tok", &settings())
    }

    fn lookup_body() -> String {
        format!(
            r#"[{{"api": "interactive", "version": "v1", "baseURL": "{}", "parameters": {{}}}}]"#,
            BASE
        )
    }

    #[test]
    fn test_lookup_existing_layer() {
        let transport = ScriptedTransport::default()
            .respond(200, r#"{"hrn": "x", "layers": [{"id": "strava-activity-data"}]}"#)
            .respond(200, &lookup_body());
        let client = client(transport);

        let handle = client.lookup_layer(HRN, "strava-activity-data").unwrap();

        assert_eq!(handle.base_url, BASE);
        assert_eq!(handle.catalog_hrn, HRN);
        let requests = client.transport.requests.borrow();
        assert_eq!(
            requests[0].url,
            format!("https://config.data.api.platform.here.com/config/v1/catalogs/{}", HRN)
        );
        assert_eq!(
            requests[1].url,
            format!(
                "https://api-lookup.data.api.platform.here.com/lookup/v1/resources/{}/apis/interactive/v1",
                HRN
            )
        );
        assert_eq!(requests[0].header_value("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_lookup_missing_catalog_is_not_found() {
        let client = client(ScriptedTransport::default().respond(404, "{}"));
        let err = client.lookup_layer(HRN, "strava-activity-data").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lookup_missing_layer_is_not_found() {
        let client =
            client(ScriptedTransport::default().respond(200, r#"{"layers": [{"id": "other"}]}"#));
        let err = client.lookup_layer(HRN, "strava-activity-data").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lookup_server_error_is_not_absence() {
        let client = client(
            ScriptedTransport::default().respond(503, r#"{"title": "Service Unavailable"}"#),
        );
        let err = client.lookup_layer(HRN, "strava-activity-data").unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_create_catalog_body() {
        let transport = ScriptedTransport::default()
            .respond(201, "")
            .respond(200, &lookup_body());
        let client = client(transport);
        let settings = settings();

        let handle = client
            .create_catalog_and_layer(&settings.catalog_spec(), &settings.layer_spec())
            .unwrap();

        assert_eq!(handle.catalog_hrn, HRN);
        assert_eq!(handle.layer_id, "strava-activity-data");
        let requests = client.transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Post);
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["id"], "strava-analysis-tool");
        assert_eq!(body["name"], "Strava Analysis Tool");
        assert_eq!(body["layers"][0]["id"], "strava-activity-data");
        assert_eq!(body["layers"][0]["layerType"], "interactivemap");
    }

    #[test]
    fn test_create_waits_for_pending_catalog() {
        let transport = ScriptedTransport::default()
            .respond(202, r#"{"configToken": "abc"}"#)
            .respond(200, r#"{"status": "pending"}"#)
            .respond(200, r#"{"status": "success"}"#)
            .respond(200, &lookup_body());
        let client = client(transport);
        let settings = settings();

        let handle = client
            .create_catalog_and_layer(&settings.catalog_spec(), &settings.layer_spec())
            .unwrap();

        assert_eq!(handle.base_url, BASE);
        let requests = client.transport.requests.borrow();
        let status_url = "https://config.data.api.platform.here.com/config/v1/status/abc";
        assert_eq!(requests[1].url, status_url);
        assert_eq!(requests[2].url, status_url);
        assert!(requests[3].url.starts_with("https://api-lookup."));
    }

    #[test]
    fn test_resolve_through_asynchronous_creation() {
        let transport = ScriptedTransport::default()
            .respond(404, "{}")
            .respond(202, r#"{"configToken": "abc"}"#)
            .respond(200, r#"{"status": "pending"}"#)
            .respond(200, r#"{"status": "success"}"#)
            .respond(200, &lookup_body());
        let client = client(transport);

        let resolution = crate::resolver::resolve(&client, &settings());

        assert!(matches!(resolution, crate::resolver::Resolution::Created(_)));
        assert_eq!(client.transport.requests.borrow().len(), 5);
    }

    #[test]
    fn test_failed_creation_status() {
        let transport = ScriptedTransport::default()
            .respond(202, r#"{"configToken": "abc"}"#)
            .respond(200, r#"{"status": "failed", "title": "Catalog id already in use"}"#);
        let client = client(transport);
        let settings = settings();

        let err = client
            .create_catalog_and_layer(&settings.catalog_spec(), &settings.layer_spec())
            .unwrap_err();

        assert!(matches!(err, HereError::CatalogCreation(_)));
        assert!(err.to_string().contains("Catalog id already in use"));
        assert_eq!(client.transport.requests.borrow().len(), 2);
    }

    #[test]
    fn test_creation_status_polls_are_bounded() {
        let transport = ScriptedTransport::default()
            .respond(202, r#"{"configToken": "abc"}"#)
            .respond(200, r#"{"status": "pending"}"#)
            .respond(200, r#"{"status": "pending"}"#)
            .respond(200, r#"{"status": "pending"}"#)
            .respond(200, &lookup_body());
        let client = client(transport);
        let settings = settings();

        let err = client
            .create_catalog_and_layer(&settings.catalog_spec(), &settings.layer_spec())
            .unwrap_err();

        assert!(err.to_string().contains("still pending after 3 status checks"));
        // create plus three status checks, no discovery
        assert_eq!(client.transport.requests.borrow().len(), 4);
    }

    #[test]
    fn test_search_uses_filter() {
        let transport = ScriptedTransport::default().respond(
            200,
            r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "id": "1", "geometry": null, "properties": {}}]}"#,
        );
        let client = client(transport);

        let collection = client
            .search_features(&handle(), &FeatureFilter::all_ids())
            .unwrap();

        assert_eq!(feature_ids(&collection), vec!["1"]);
        assert_eq!(
            client.transport.requests.borrow()[0].url,
            "https://interactive.example.com/v1/layers/test-layer/search?id=gte=0"
        );
    }

    #[test]
    fn test_delete_sends_each_id() {
        let client = client(ScriptedTransport::default().respond(204, ""));
        let ids = vec!["a".to_string(), "b c".to_string()];

        client.delete_features(&handle(), &ids).unwrap();

        let requests = client.transport.requests.borrow();
        assert_eq!(requests[0].method, Method::Delete);
        assert_eq!(
            requests[0].url,
            "https://interactive.example.com/v1/layers/test-layer/features?id=a&id=b+c"
        );
    }

    #[test]
    fn test_delete_nothing_sends_nothing() {
        let client = client(ScriptedTransport::default());
        client.delete_features(&handle(), &[]).unwrap();
        assert!(client.transport.requests.borrow().is_empty());
    }

    #[test]
    fn test_write_puts_geojson() {
        let client = client(ScriptedTransport::default().respond(200, "{}"));
        let collection = FeatureCollection {
            bbox: None,
            features: vec![crate::api::testing::feature_with_id("x1")],
            foreign_members: None,
        };

        client.write_features(&handle(), &collection).unwrap();

        let requests = client.transport.requests.borrow();
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(
            requests[0].header_value("Content-Type"),
            Some("application/geo+json")
        );
        let sent: FeatureCollection =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(feature_ids(&sent), vec!["x1"]);
    }

    #[test]
    fn test_write_failure_propagates() {
        let client = client(ScriptedTransport::default().respond(413, "payload too large"));
        let collection = FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        };

        let err = client.write_features(&handle(), &collection).unwrap_err();
        assert!(matches!(err, HereError::Status { status: 413, .. }));
    }
}
