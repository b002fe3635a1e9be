//! Signed OpenAPI client implementing the device port.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use tuyabridge_app::ports::DeviceHandle;
use tuyabridge_domain::data_point::DataPointMap;
use tuyabridge_domain::error::DeviceError;
use tuyabridge_domain::identity::{DeviceIdentity, ProtocolVersion};

use crate::api::{self, DeviceInfo, Envelope, Properties, Property, Shadow, TokenGrant};
use crate::config::TuyaCloudConfig;
use crate::error::TuyaError;
use crate::sign::{self, Request};

/// Tokens are renewed this long before the advertised expiry.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Tuya OpenAPI client bound to a single device.
#[derive(Debug)]
pub struct TuyaCloudDevice {
    http: reqwest::Client,
    base_url: String,
    identity: DeviceIdentity,
    token: Option<AccessToken>,
}

impl TuyaCloudDevice {
    /// Create a client for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`TuyaError::Http`] if the HTTP client cannot be built.
    pub fn new(identity: DeviceIdentity, config: &TuyaCloudConfig) -> Result<Self, TuyaError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(TuyaError::Http)?;
        Ok(Self {
            base_url: config.base_url(identity.region),
            http,
            identity,
            token: None,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obtain a new access token, replacing the cached one.
    ///
    /// # Errors
    ///
    /// Any [`TuyaError`]; credential problems surface as [`TuyaError::Auth`].
    pub async fn refresh_token(&mut self) -> Result<String, TuyaError> {
        self.token = None;
        let path = sign::path_and_query(api::TOKEN_PATH, &[("grant_type", "1")]);
        let grant: TokenGrant = self.send(&path, None).await?.into_result()?;

        let lifetime = Duration::from_secs(grant.expire_time).saturating_sub(TOKEN_MARGIN);
        tracing::info!(expires_in = grant.expire_time, "Tuya access token obtained");
        self.token = Some(AccessToken {
            value: grant.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(grant.access_token)
    }

    async fn access_token(&mut self) -> Result<String, TuyaError> {
        match &self.token {
            Some(token) if token.is_fresh() => Ok(token.value.clone()),
            _ => self.refresh_token().await,
        }
    }

    async fn send(
        &self,
        path_and_query: &str,
        access_token: Option<&str>,
    ) -> Result<Envelope, TuyaError> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let signature = sign::sign(
            &self.identity.credentials,
            &Request {
                method: "GET",
                path_and_query,
                body: "",
                timestamp: &timestamp,
                nonce: &nonce,
                access_token,
            },
        )?;

        let mut request = self
            .http
            .get(format!("{}{path_and_query}", self.base_url))
            .header("client_id", &self.identity.credentials.access_id)
            .header("sign", signature)
            .header("sign_method", "HMAC-SHA256")
            .header("t", &timestamp)
            .header("nonce", &nonce);
        if let Some(token) = access_token {
            request = request.header("access_token", token);
        }

        let response = request.send().await.map_err(TuyaError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TuyaError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(TuyaError::Http)?;
        serde_json::from_slice(&body).map_err(TuyaError::Decode)
    }

    /// Authenticated GET; a token-invalid answer triggers one refresh and retry.
    async fn get<T: DeserializeOwned>(&mut self, path_and_query: &str) -> Result<T, TuyaError> {
        let token = self.access_token().await?;
        match self.send(path_and_query, Some(&token)).await?.into_result() {
            Err(err) if err.is_token_invalid() => {
                tracing::info!(path = path_and_query, "access token rejected, refreshing");
                let token = self.refresh_token().await?;
                self.send(path_and_query, Some(&token)).await?.into_result()
            }
            other => other,
        }
    }

    /// Whether the cloud currently sees the device online.
    ///
    /// # Errors
    ///
    /// Any [`TuyaError`].
    pub async fn fetch_online(&mut self) -> Result<bool, TuyaError> {
        let path = format!("/v1.0/devices/{}", self.identity.device_id);
        let info: DeviceInfo = self.get(&path).await?;
        Ok(info.online.unwrap_or(true))
    }

    /// Current data points, through the endpoint matching the protocol version.
    ///
    /// # Errors
    ///
    /// Any [`TuyaError`].
    pub async fn fetch_data_points(&mut self) -> Result<DataPointMap, TuyaError> {
        let device_id = &self.identity.device_id;
        let points = match self.identity.protocol {
            ProtocolVersion::V2 => {
                let path = format!("/v2.0/cloud/thing/{device_id}/shadow/properties");
                let shadow: Shadow = self.get(&path).await?;
                DataPointMap::from(shadow.properties)
            }
            ProtocolVersion::V1 => {
                let path = format!("/v1.0/iot-03/devices/{device_id}/status");
                let status: Vec<Property> = self.get(&path).await?;
                DataPointMap::from(Properties::List(status))
            }
        };
        tracing::debug!(count = points.len(), "data points fetched");
        Ok(points)
    }
}

impl DeviceHandle for TuyaCloudDevice {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.access_token().await?;
        Ok(())
    }

    async fn read_data_points(&mut self) -> Result<DataPointMap, DeviceError> {
        Ok(self.fetch_data_points().await?)
    }

    async fn is_online(&mut self) -> Result<bool, DeviceError> {
        Ok(self.fetch_online().await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tuyabridge_domain::data_point::DataPointValue;
    use tuyabridge_domain::identity::{Credentials, Region};
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const DEVICE: &str = "bf0123456789";

    async fn setup(protocol: ProtocolVersion) -> (MockServer, TuyaCloudDevice) {
        let server = MockServer::start().await;
        let identity = DeviceIdentity {
            device_id: DEVICE.to_string(),
            region: Region::Eu,
            credentials: Credentials::new("abcd1234", "secretkey"),
            protocol,
        };
        let config = TuyaCloudConfig {
            endpoint: server.uri(),
            ..TuyaCloudConfig::default()
        };
        let device = TuyaCloudDevice::new(identity, &config).unwrap();
        (server, device)
    }

    fn token_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "t": 1_700_000_000_000_i64,
            "result": {"access_token": token, "expire_time": 7200, "refresh_token": "r", "uid": "u"}
        }))
    }

    async fn mount_token(server: &MockServer, token: &str) {
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .and(query_param("grant_type", "1"))
            .and(header("client_id", "abcd1234"))
            .and(header("sign_method", "HMAC-SHA256"))
            .and(header_exists("sign"))
            .and(header_exists("t"))
            .and(header_exists("nonce"))
            .respond_with(token_response(token))
            .mount(server)
            .await;
    }

    fn shadow_path() -> String {
        format!("/v2.0/cloud/thing/{DEVICE}/shadow/properties")
    }

    #[tokio::test]
    async fn should_connect_by_obtaining_token() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;

        device.connect().await.unwrap();

        assert_eq!(device.access_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn should_reuse_fresh_token_on_reconnect() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(token_response("tok-1"))
            .expect(1)
            .mount(&server)
            .await;

        device.connect().await.unwrap();
        device.connect().await.unwrap();

        assert_eq!(device.access_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn should_report_rejected_credentials_as_auth_failure() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "code": 1004, "msg": "sign invalid"
            })))
            .mount(&server)
            .await;

        let err = device.connect().await.unwrap_err();

        assert!(matches!(err, DeviceError::AuthFailure(_)));
    }

    #[tokio::test]
    async fn should_read_shadow_properties_with_token() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .and(header("access_token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"properties": [
                    {"code": "doorcontact_state", "dp_id": 1, "value": true, "type": "bool"},
                    {"code": "battery_percentage", "dp_id": 2, "value": 87, "type": "value"}
                ]}
            })))
            .mount(&server)
            .await;

        let points = device.read_data_points().await.unwrap();

        assert_eq!(points.get("doorcontact_state"), Some(&DataPointValue::Bool(true)));
        assert_eq!(points.get("1"), Some(&DataPointValue::Bool(true)));
        assert_eq!(points.get("battery_percentage"), Some(&DataPointValue::Int(87)));
    }

    #[tokio::test]
    async fn should_read_v1_status_endpoint() {
        let (server, mut device) = setup(ProtocolVersion::V1).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/iot-03/devices/{DEVICE}/status")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": [{"code": "doorcontact_state", "value": false}]
            })))
            .mount(&server)
            .await;

        let points = device.read_data_points().await.unwrap();

        assert_eq!(points.get("doorcontact_state"), Some(&DataPointValue::Bool(false)));
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn should_refresh_token_once_when_invalidated() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(token_response("tok-1"))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/token"))
            .respond_with(token_response("tok-2"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .and(header("access_token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "code": 1010, "msg": "token invalid"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .and(header("access_token", "tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"properties": [{"code": "doorcontact_state", "value": true}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let points = device.read_data_points().await.unwrap();

        assert_eq!(points.get("doorcontact_state"), Some(&DataPointValue::Bool(true)));
    }

    #[tokio::test]
    async fn should_give_up_when_fresh_token_is_also_rejected() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "code": 1010, "msg": "token invalid"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = device.read_data_points().await.unwrap_err();

        assert!(matches!(err, DeviceError::AuthFailure(_)));
    }

    #[tokio::test]
    async fn should_report_server_errors_as_unreachable() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = device.read_data_points().await.unwrap_err();

        assert!(matches!(err, DeviceError::Unreachable(_)));
    }

    #[tokio::test]
    async fn should_report_offline_code_as_unreachable() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "code": 2001,
                "msg": "device is offline"
            })))
            .mount(&server)
            .await;

        let err = device.read_data_points().await.unwrap_err();

        assert!(matches!(err, DeviceError::Unreachable(_)));
    }

    #[tokio::test]
    async fn should_report_garbage_as_malformed_response() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(shadow_path()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = device.read_data_points().await.unwrap_err();

        assert!(matches!(err, DeviceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn should_report_device_online_flag() {
        let (server, mut device) = setup(ProtocolVersion::V2).await;
        mount_token(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/devices/{DEVICE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"id": DEVICE, "name": "Front door", "online": false}
            })))
            .mount(&server)
            .await;

        assert!(!device.is_online().await.unwrap());
    }

    #[tokio::test]
    async fn should_report_unreachable_when_nothing_listens() {
        let identity = DeviceIdentity {
            device_id: DEVICE.to_string(),
            region: Region::Eu,
            credentials: Credentials::new("abcd1234", "secretkey"),
            protocol: ProtocolVersion::V2,
        };
        let config = TuyaCloudConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ..TuyaCloudConfig::default()
        };
        let mut device = TuyaCloudDevice::new(identity, &config).unwrap();

        let err = device.connect().await.unwrap_err();

        assert!(matches!(err, DeviceError::Unreachable(_)));
    }
}
