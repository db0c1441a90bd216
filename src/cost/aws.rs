//! AWS Cost Explorer provider

use std::str::FromStr;

use async_trait::async_trait;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_costexplorer::config::Region;
use aws_sdk_costexplorer::error::{DisplayErrorContext, SdkError};
use aws_sdk_costexplorer::types::{DateInterval, Granularity, GroupDefinition, GroupDefinitionType};
use aws_sdk_costexplorer::Client as CostExplorerClient;
use aws_sdk_sts::Client as StsClient;
use rust_decimal::Decimal;

use super::fetcher::CostProvider;
use super::profiles::ProfilePaths;
use super::{CostLineItem, DateRange, Profile};
use crate::error::{PulseError, Result};

/// Cost Explorer only answers in this region
pub const BILLING_REGION: &str = "us-east-1";

const COST_METRIC: &str = "BlendedCost";
const DEFAULT_CURRENCY: &str = "USD";

/// Cost provider backed by Cost Explorer and STS
pub struct AwsCostProvider {
    paths: ProfilePaths,
}

impl AwsCostProvider {
    /// Load profiles from the same files the scanner reads
    pub fn new(paths: ProfilePaths) -> Self {
        Self { paths }
    }

    async fn sdk_config(&self, profile: &Profile) -> SdkConfig {
        let files = ProfileFiles::builder()
            .with_file(ProfileFileKind::Config, &self.paths.config)
            .with_file(ProfileFileKind::Credentials, &self.paths.credentials)
            .build();

        aws_config::defaults(BehaviorVersion::latest())
            .profile_files(files)
            .profile_name(&profile.name)
            .region(Region::new(BILLING_REGION))
            .load()
            .await
    }
}

#[async_trait]
impl CostProvider for AwsCostProvider {
    fn name(&self) -> &str {
        "aws"
    }

    async fn cost_by_service(
        &self,
        profile: &Profile,
        range: &DateRange,
    ) -> Result<Vec<CostLineItem>> {
        let config = self.sdk_config(profile).await;
        let client = CostExplorerClient::new(&config);

        let period = DateInterval::builder()
            .start(range.start_str())
            .end(range.end_str())
            .build()
            .map_err(|e| PulseError::InvalidInput(e.to_string()))?;
        let by_service = GroupDefinition::builder()
            .r#type(GroupDefinitionType::Dimension)
            .key("SERVICE")
            .build();

        let mut items = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = client
                .get_cost_and_usage()
                .time_period(period.clone())
                .granularity(Granularity::Monthly)
                .metrics(COST_METRIC)
                .group_by(by_service.clone())
                .set_next_page_token(next_token.take())
                .send()
                .await
                .map_err(classify_sdk_error)?;

            for result in response.results_by_time() {
                for group in result.groups() {
                    let Some(service) = group.keys().first() else {
                        continue;
                    };
                    let Some(metric) = group.metrics().and_then(|m| m.get(COST_METRIC)) else {
                        continue;
                    };
                    let amount = parse_amount(metric.amount().unwrap_or("0"))?;
                    items.push(CostLineItem {
                        service_name: service.clone(),
                        amount,
                        currency: metric.unit().unwrap_or(DEFAULT_CURRENCY).to_string(),
                    });
                }
            }

            match response.next_page_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn account_id(&self, profile: &Profile) -> Result<String> {
        let config = self.sdk_config(profile).await;
        let identity = StsClient::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| PulseError::Api(DisplayErrorContext(&e).to_string()))?;

        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| PulseError::Api("caller identity has no account".to_string()))
    }
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| PulseError::Api(format!("unparseable cost amount {:?}: {}", raw, e)))
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> PulseError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => PulseError::Api(message),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            PulseError::Transport(message)
        }
        // Request construction fails when no credentials resolve for the profile
        _ => PulseError::Credential(message),
    }
}
