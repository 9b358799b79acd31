//! Host identity and region resolution.
//!
//! Both are resolved once at startup. The base dimensions attached to every
//! data point come from an explicit hostname or, failing that, from the
//! instance metadata service.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::metrics::Dimensions;

/// Environment variable consulted for the region.
pub const REGION_ENV: &str = "AWS_REGION";

pub const DIMENSION_HOSTNAME: &str = "Hostname";
pub const DIMENSION_INSTANCE_ID: &str = "InstanceId";
pub const DIMENSION_AUTOSCALING_GROUP: &str = "AutoScalingGroupName";

/// Default base URL of the EC2 instance metadata service.
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254";

const TOKEN_TTL_SECONDS: &str = "21600";
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Error from the instance metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataError {
    pub key: String,
    pub message: String,
}

impl MetadataError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unable to retrieve key {} from metadata service: {}",
            self.key, self.message
        )
    }
}

impl std::error::Error for MetadataError {}

/// Error while building the base dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    Metadata(MetadataError),
    NoAutoscalingGroup { instance_id: String },
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Metadata(e) => write!(f, "{}", e),
            IdentityError::NoAutoscalingGroup { instance_id } => {
                write!(f, "no autoscaling group found for instance {}", instance_id)
            }
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<MetadataError> for IdentityError {
    fn from(e: MetadataError) -> Self {
        IdentityError::Metadata(e)
    }
}

/// Error while determining the region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionError(pub MetadataError);

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unable to determine region from metadata service: {}",
            self.0.message
        )
    }
}

impl std::error::Error for RegionError {}

/// Source of facts about the instance the agent runs on.
pub trait InstanceMetadata {
    fn instance_id(&self) -> Result<String, MetadataError>;

    fn region(&self) -> Result<String, MetadataError>;

    /// Autoscaling group the instance belongs to, `None` if it is not in one.
    fn autoscaling_group(&self) -> Result<Option<String>, MetadataError>;
}

/// Determines the region: explicit value, then `env_region`, then metadata.
///
/// Empty strings count as unset.
pub fn resolve_region<M: InstanceMetadata + ?Sized>(
    explicit: Option<&str>,
    env_region: Option<&str>,
    metadata: &M,
) -> Result<String, RegionError> {
    if let Some(region) = explicit.filter(|r| !r.is_empty()) {
        debug!("region {} from configuration", region);
        return Ok(region.to_string());
    }
    if let Some(region) = env_region.filter(|r| !r.is_empty()) {
        debug!("region {} from {}", region, REGION_ENV);
        return Ok(region.to_string());
    }

    let region = metadata.region().map_err(RegionError)?;
    debug!("region {} from metadata service", region);
    Ok(region)
}

/// Builds the dimensions attached to every data point.
///
/// An explicit hostname yields `Hostname=<name>`. Otherwise the instance id
/// is looked up, plus the autoscaling group when `with_autoscaling_group`.
pub fn resolve_base_dimensions<M: InstanceMetadata + ?Sized>(
    hostname: Option<&str>,
    with_autoscaling_group: bool,
    metadata: &M,
) -> Result<Dimensions, IdentityError> {
    let mut dimensions = Dimensions::new();

    if let Some(hostname) = hostname.filter(|h| !h.is_empty()) {
        dimensions.insert(DIMENSION_HOSTNAME.to_string(), hostname.to_string());
        return Ok(dimensions);
    }

    let instance_id = metadata.instance_id()?;

    if with_autoscaling_group {
        let group = metadata
            .autoscaling_group()?
            .ok_or_else(|| IdentityError::NoAutoscalingGroup {
                instance_id: instance_id.clone(),
            })?;
        dimensions.insert(DIMENSION_AUTOSCALING_GROUP.to_string(), group);
    }

    dimensions.insert(DIMENSION_INSTANCE_ID.to_string(), instance_id);
    Ok(dimensions)
}

#[derive(Debug, Deserialize)]
struct IdentityDocument {
    region: String,
}

/// EC2 instance metadata client (IMDSv2).
pub struct ImdsClient {
    client: Client,
    base_url: String,
}

impl ImdsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| MetadataError::new("client", e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn token(&self, key: &str) -> Result<String, MetadataError> {
        let response = self
            .client
            .put(format!("{}/latest/api/token", self.base_url))
            .header("X-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| MetadataError::new(key, e.to_string()))?;

        response
            .text()
            .map_err(|e| MetadataError::new(key, e.to_string()))
    }

    /// Fetches `path`, returning `None` on 404.
    fn get(&self, key: &str, path: &str) -> Result<Option<String>, MetadataError> {
        let token = self.token(key)?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-aws-ec2-metadata-token", token)
            .send()
            .map_err(|e| MetadataError::new(key, e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| MetadataError::new(key, e.to_string()))?;
        let body = response
            .text()
            .map_err(|e| MetadataError::new(key, e.to_string()))?;
        Ok(Some(body.trim().to_string()))
    }

    fn get_required(&self, key: &str, path: &str) -> Result<String, MetadataError> {
        self.get(key, path)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MetadataError::new(key, "not found"))
    }
}

impl InstanceMetadata for ImdsClient {
    fn instance_id(&self) -> Result<String, MetadataError> {
        self.get_required("instance-id", "/latest/meta-data/instance-id")
    }

    fn region(&self) -> Result<String, MetadataError> {
        let document = self.get_required(
            "region",
            "/latest/dynamic/instance-identity/document",
        )?;
        let document: IdentityDocument = serde_json::from_str(&document)
            .map_err(|e| MetadataError::new("region", e.to_string()))?;
        Ok(document.region)
    }

    fn autoscaling_group(&self) -> Result<Option<String>, MetadataError> {
        Ok(self
            .get(
                "aws:autoscaling:groupName",
                "/latest/meta-data/tags/instance/aws:autoscaling:groupName",
            )?
            .filter(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::FakeServer;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeMetadata {
        instance_id: Option<String>,
        region: Option<String>,
        group: Option<String>,
        calls: Cell<usize>,
    }

    impl FakeMetadata {
        fn ec2() -> Self {
            Self {
                instance_id: Some("i-0123456789abcdef0".to_string()),
                region: Some("eu-west-1".to_string()),
                group: Some("web-asg".to_string()),
                calls: Cell::new(0),
            }
        }

        fn lookup(&self, key: &str, value: &Option<String>) -> Result<String, MetadataError> {
            self.calls.set(self.calls.get() + 1);
            value
                .clone()
                .ok_or_else(|| MetadataError::new(key, "connection refused"))
        }
    }

    impl InstanceMetadata for FakeMetadata {
        fn instance_id(&self) -> Result<String, MetadataError> {
            self.lookup("instance-id", &self.instance_id)
        }

        fn region(&self) -> Result<String, MetadataError> {
            self.lookup("region", &self.region)
        }

        fn autoscaling_group(&self) -> Result<Option<String>, MetadataError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.group.clone())
        }
    }

    #[test]
    fn test_region_explicit_wins() {
        let metadata = FakeMetadata::ec2();
        let region = resolve_region(Some("us-west-2"), Some("us-east-1"), &metadata).unwrap();
        assert_eq!(region, "us-west-2");
        assert_eq!(metadata.calls.get(), 0);
    }

    #[test]
    fn test_region_from_env() {
        let metadata = FakeMetadata::ec2();
        let region = resolve_region(Some(""), Some("us-east-1"), &metadata).unwrap();
        assert_eq!(region, "us-east-1");
        assert_eq!(metadata.calls.get(), 0);
    }

    #[test]
    fn test_region_from_metadata() {
        let metadata = FakeMetadata::ec2();
        let region = resolve_region(None, None, &metadata).unwrap();
        assert_eq!(region, "eu-west-1");
    }

    #[test]
    fn test_region_metadata_failure() {
        let metadata = FakeMetadata::default();
        let err = resolve_region(None, Some(""), &metadata).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("unable to determine region from metadata service")
        );
    }

    #[test]
    fn test_dimensions_from_hostname() {
        let metadata = FakeMetadata::default();
        let dims = resolve_base_dimensions(Some("web-1"), true, &metadata).unwrap();

        assert_eq!(dims.len(), 1);
        assert_eq!(dims[DIMENSION_HOSTNAME], "web-1");
        assert_eq!(metadata.calls.get(), 0);
    }

    #[test]
    fn test_dimensions_from_instance_id() {
        let metadata = FakeMetadata::ec2();
        let dims = resolve_base_dimensions(None, false, &metadata).unwrap();

        assert_eq!(dims.len(), 1);
        assert_eq!(dims[DIMENSION_INSTANCE_ID], "i-0123456789abcdef0");
    }

    #[test]
    fn test_dimensions_with_autoscaling_group() {
        let metadata = FakeMetadata::ec2();
        let dims = resolve_base_dimensions(None, true, &metadata).unwrap();

        assert_eq!(dims.len(), 2);
        assert_eq!(dims[DIMENSION_INSTANCE_ID], "i-0123456789abcdef0");
        assert_eq!(dims[DIMENSION_AUTOSCALING_GROUP], "web-asg");
    }

    #[test]
    fn test_dimensions_missing_autoscaling_group() {
        let metadata = FakeMetadata {
            group: None,
            ..FakeMetadata::ec2()
        };
        let err = resolve_base_dimensions(None, true, &metadata).unwrap_err();
        assert_eq!(
            err,
            IdentityError::NoAutoscalingGroup {
                instance_id: "i-0123456789abcdef0".to_string()
            }
        );
    }

    #[test]
    fn test_dimensions_metadata_failure() {
        let metadata = FakeMetadata::default();
        let err = resolve_base_dimensions(None, false, &metadata).unwrap_err();
        assert!(err.to_string().contains("instance-id"));
    }

    #[test]
    fn test_imds_token_then_instance_id() {
        let server = FakeServer::start(vec![(200, "token-abc"), (200, "i-0123456789abcdef0\n")]);
        let client = ImdsClient::new(server.url()).unwrap();

        assert_eq!(client.instance_id().unwrap(), "i-0123456789abcdef0");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/latest/api/token");
        assert_eq!(
            requests[0].header("x-aws-ec2-metadata-token-ttl-seconds"),
            Some("21600")
        );
        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].path, "/latest/meta-data/instance-id");
        assert_eq!(requests[1].header("x-aws-ec2-metadata-token"), Some("token-abc"));
    }

    #[test]
    fn test_imds_missing_autoscaling_tag() {
        let server = FakeServer::start(vec![(200, "token"), (404, "")]);
        let client = ImdsClient::new(server.url()).unwrap();

        assert_eq!(client.autoscaling_group().unwrap(), None);

        let requests = server.requests();
        assert_eq!(
            requests[1].path,
            "/latest/meta-data/tags/instance/aws:autoscaling:groupName"
        );
    }

    #[test]
    fn test_imds_autoscaling_tag() {
        let server = FakeServer::start(vec![(200, "token"), (200, "web-asg")]);
        let client = ImdsClient::new(server.url()).unwrap();

        assert_eq!(client.autoscaling_group().unwrap(), Some("web-asg".to_string()));
        server.requests();
    }

    #[test]
    fn test_imds_region_from_identity_document() {
        let document = r#"{"instanceId":"i-0abc","region":"eu-central-1","accountId":"123456789012"}"#;
        let server = FakeServer::start(vec![(200, "token"), (200, document)]);
        let client = ImdsClient::new(server.url()).unwrap();

        assert_eq!(client.region().unwrap(), "eu-central-1");

        let requests = server.requests();
        assert_eq!(requests[1].path, "/latest/dynamic/instance-identity/document");
    }

    #[test]
    fn test_imds_bad_identity_document() {
        let server = FakeServer::start(vec![(200, "token"), (200, "not json")]);
        let client = ImdsClient::new(server.url()).unwrap();

        let err = client.region().unwrap_err();
        assert_eq!(err.key, "region");
        server.requests();
    }

    #[test]
    fn test_imds_token_rejected() {
        let server = FakeServer::start(vec![(401, "")]);
        let client = ImdsClient::new(server.url()).unwrap();

        let err = client.instance_id().unwrap_err();
        assert_eq!(err.key, "instance-id");
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_imds_missing_instance_id() {
        let server = FakeServer::start(vec![(200, "token"), (404, "")]);
        let client = ImdsClient::new(server.url()).unwrap();

        let err = client.instance_id().unwrap_err();
        assert_eq!(err.message, "not found");
        server.requests();
    }

    #[test]
    fn test_imds_client_trims_base_url() {
        let client = ImdsClient::new("http://169.254.169.254/").unwrap();
        assert_eq!(client.base_url, "http://169.254.169.254");
    }
}
