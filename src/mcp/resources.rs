//! MCP resources and prompt templates

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

pub const SETTINGS_URI: &str = "config://settings";
pub const STATUS_URI: &str = "status://server";
pub const PROFILES_URI: &str = "aws://profiles";
#[cfg(feature = "web")]
pub const MARKET_OVERVIEW_URI: &str = "stocks://market-overview";

/// Listed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Body of a `resources/read` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

const RESOURCES: &[(&str, &str, &str)] = &[
    (SETTINGS_URI, "settings", "Server name, version and enabled features"),
    (STATUS_URI, "status", "Server status and uptime"),
    (PROFILES_URI, "aws-profiles", "AWS profiles discovered in the local config files"),
];

/// Resources that need outbound HTTP
#[cfg(feature = "web")]
const WEB_RESOURCES: &[(&str, &str, &str)] = &[(
    MARKET_OVERVIEW_URI,
    "market-overview",
    "Major market indices, leading cryptocurrencies and whether the market is open",
)];

pub fn get_resource_definitions() -> Vec<ResourceDefinition> {
    let resources = RESOURCES.iter();
    #[cfg(feature = "web")]
    let resources = resources.chain(WEB_RESOURCES);
    resources
        .map(|(uri, name, description)| ResourceDefinition {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
        })
        .collect()
}

/// Prompt argument as listed by `prompts/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

struct PromptTemplate {
    name: &'static str,
    description: &'static str,
    arguments: &'static [(&'static str, &'static str)],
    body: &'static str,
}

const PROMPTS: &[PromptTemplate] = &[
    PromptTemplate {
        name: "data_analyst",
        description: "Analyze a dataset for statistics, trends and insights",
        arguments: &[("data", "The dataset to analyze")],
        body: "You are a data analyst examining the following dataset:

{data}

Please analyze this data and provide:
1. A summary of key statistics
2. Identification of trends and patterns
3. Actionable insights based on the data
4. Recommendations for further analysis",
    },
    PromptTemplate {
        name: "aws_cost_analyst",
        description: "Review AWS cost data for savings opportunities",
        arguments: &[("cost_data", "Output of analyze_aws_costs or get_aws_cost_report")],
        body: "You are an AWS cost optimization analyst examining the following cost data:

{cost_data}

Please provide:
1. Cost breakdown analysis by service
2. Identification of cost optimization opportunities
3. Recommendations for reducing AWS spending
4. Potential cost anomalies or unexpected charges
5. Best practices for cost management",
    },
    PromptTemplate {
        name: "stock_market_analyst",
        description: "Interpret stock data and technical indicators",
        arguments: &[("stock_data", "Price history or indicator output")],
        body: "You are a professional stock market analyst examining the following data:

{stock_data}

Please provide:
1. Current stock performance analysis
2. Technical indicator interpretation (RSI, MACD, moving averages)
3. Risk assessment and volatility analysis
4. Key support and resistance levels",
    },
    PromptTemplate {
        name: "snowflake_cost_analyst",
        description: "Review Snowflake compute and storage costs",
        arguments: &[(
            "snowflake_data",
            "Output of get_snowflake_cost_summary or get_snowflake_cost_report",
        )],
        body: "You are a Snowflake cost optimization expert examining the following cost data:

{snowflake_data}

Please provide:
1. Overall cost breakdown analysis (compute vs storage)
2. Warehouse utilization and efficiency analysis
3. Cost optimization opportunities and recommendations
4. Identification of potential cost anomalies or spikes
5. Best practices for Snowflake cost management
6. Warehouse sizing and auto-suspend recommendations

Focus on actionable insights that can help reduce Snowflake costs while maintaining performance.",
    },
    PromptTemplate {
        name: "api_documentation",
        description: "Generate documentation for an API endpoint",
        arguments: &[
            ("endpoint_name", "Endpoint name"),
            ("description", "What the endpoint does"),
            ("http_method", "HTTP method"),
            ("endpoint_path", "Path"),
            ("request_params", "Request parameters"),
            ("response_format", "Response format"),
            ("example_usage", "Example request"),
            ("error_codes", "Error codes"),
        ],
        body: "# API Documentation for {endpoint_name}

## Overview
{description}

## Endpoint
`{http_method} {endpoint_path}`

## Request Parameters
{request_params}

## Response Format
{response_format}

## Example Usage
```
{example_usage}
```

## Error Codes
{error_codes}",
    },
];

pub fn get_prompt_definitions() -> Vec<PromptDefinition> {
    PROMPTS
        .iter()
        .map(|p| PromptDefinition {
            name: p.name.to_string(),
            description: p.description.to_string(),
            arguments: p
                .arguments
                .iter()
                .map(|(name, description)| PromptArgument {
                    name: name.to_string(),
                    description: description.to_string(),
                    required: false,
                })
                .collect(),
        })
        .collect()
}

/// Rendered prompt: description plus the user message text
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub description: String,
    pub text: String,
}

/// Fill a prompt's placeholders. Missing arguments are left as `{name}`.
pub fn render_prompt(name: &str, args: &HashMap<String, String>) -> Result<RenderedPrompt> {
    let template = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| PulseError::NotFound(format!("prompt {}", name)))?;

    let text = template
        .arguments
        .iter()
        .fold(template.body.to_string(), |text, (arg, _)| {
            match args.get(*arg) {
                Some(value) => text.replace(&format!("{{{}}}", arg), value),
                None => text,
            }
        });

    Ok(RenderedPrompt {
        description: template.description.to_string(),
        text,
    })
}
