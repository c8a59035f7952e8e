//! Credential and region resolution
//!
//! Starts from the default AWS configuration chain for the scan region,
//! optionally narrowed to a named profile, and optionally swaps in
//! credentials obtained by assuming an IAM role.

use crate::config::{AssumeRoleConfig, ScanConfig};
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::{debug, info};

/// Loads the base configuration without any role assumption
async fn load_base_config(region: &str, profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

    if let Some(profile) = profile {
        debug!(profile, "Using named AWS profile");
        loader = loader.profile_name(profile);
    }

    loader.load().await
}

async fn assume_role_provider(base: &SdkConfig, role: &AssumeRoleConfig) -> AssumeRoleProvider {
    let mut builder = AssumeRoleProvider::builder(role.role_arn.clone())
        .session_name(role.session_name.clone())
        .session_length(role.duration());

    if let Some(external_id) = &role.external_id {
        builder = builder.external_id(external_id.clone());
    }

    builder.configure(base).build().await
}

/// Builds the SDK configuration a scan should use
///
/// Credentials are resolved lazily by the SDK, so a bad profile or a role
/// that cannot be assumed surfaces on the first API call as a
/// permission error rather than here.
pub async fn load_sdk_config(config: &ScanConfig) -> SdkConfig {
    let region = config.region();
    let profile = config.named_profile();
    let base = load_base_config(region, profile).await;

    let Some(role) = &config.assume_role else {
        return base;
    };

    info!(
        role_arn = %role.role_arn,
        session_name = %role.session_name,
        duration_secs = role.duration_secs,
        "Assuming IAM role"
    );

    let provider = assume_role_provider(&base, role).await;

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(provider);
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}
