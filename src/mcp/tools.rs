//! MCP tool definitions for Pulse

use super::protocol::ToolDefinition;

/// Cost analysis tools (always available)
pub const COST_TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        "discover_aws_profiles",
        "Discover AWS profiles from the local config and credentials files. Returns each profile's region, whether static credentials are present, and where it was found.",
        r#"{
            "type": "object",
            "properties": {
                "refresh": {"type": "boolean", "default": false, "description": "Re-read the files instead of using the cached scan"}
            }
        }"#,
    ),
    (
        "analyze_aws_costs",
        "Analyze AWS costs for every discovered profile, or a single profile. Returns per-account results, the total across accounts and the top 5 services by cost.",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30, "description": "Number of days to analyze, ending today"},
                "profile": {"type": "string", "description": "Analyze only this profile"}
            }
        }"#,
    ),
    (
        "get_aws_cost_report",
        "Get a formatted text report of AWS costs across all discovered profiles",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30},
                "format_type": {"type": "string", "enum": ["detailed", "summary"], "default": "detailed", "description": "summary shows the total and top 3 services; detailed adds per-profile breakdowns"}
            }
        }"#,
    ),
    (
        "calculate",
        "Perform a calculation on a list of numbers",
        r#"{
            "type": "object",
            "properties": {
                "operation": {"type": "string", "enum": ["sum", "avg", "min", "max"]},
                "numbers": {"type": "array", "items": {"type": "number"}}
            },
            "required": ["operation", "numbers"]
        }"#,
    ),
];

/// Snowflake cost tools; they answer once an account is connected
pub const WAREHOUSE_TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        "get_snowflake_overall_costs",
        "Get estimated Snowflake compute and storage costs for the connected account",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30}
            }
        }"#,
    ),
    (
        "get_snowflake_top_warehouses",
        "Rank the connected account's warehouses by credits used, with estimated cost and share of all warehouse credits",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 5}
            }
        }"#,
    ),
    (
        "get_snowflake_cost_summary",
        "Get overall Snowflake costs plus the top 5 warehouses in one call",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30}
            }
        }"#,
    ),
    (
        "get_snowflake_cost_report",
        "Get a formatted text report of Snowflake costs",
        r#"{
            "type": "object",
            "properties": {
                "days": {"type": "integer", "minimum": 1, "maximum": 365, "default": 30}
            }
        }"#,
    ),
];

/// Tools backed by outbound HTTP APIs
pub const WEB_TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        "connect_snowflake",
        "Connect to a Snowflake account through the SQL API using a programmatic access token, OAuth token or key-pair JWT",
        r#"{
            "type": "object",
            "properties": {
                "account": {"type": "string", "description": "Account identifier or account URL"},
                "token": {"type": "string"},
                "token_type": {"type": "string", "enum": ["pat", "oauth", "keypair_jwt"], "default": "pat"},
                "role": {"type": "string"},
                "warehouse": {"type": "string"}
            },
            "required": ["account", "token"]
        }"#,
    ),
    (
        "connect_snowflake_auto",
        "Connect to Snowflake using SNOWFLAKE_ACCOUNT and SNOWFLAKE_TOKEN, plus optional SNOWFLAKE_TOKEN_TYPE, SNOWFLAKE_ROLE and SNOWFLAKE_WAREHOUSE",
        r#"{"type": "object", "properties": {}}"#,
    ),
    (
        "get_stock_info",
        "Get the latest price, daily change, volume, day range and 52-week range for a stock symbol",
        r#"{
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "Ticker symbol, e.g. AAPL"}
            },
            "required": ["symbol"]
        }"#,
    ),
    (
        "get_stock_report",
        "Get a formatted text report for a stock symbol",
        r#"{
            "type": "object",
            "properties": {
                "symbol": {"type": "string"}
            },
            "required": ["symbol"]
        }"#,
    ),
    (
        "screen_stocks",
        "Screen stocks by price band, strongest daily move first. Screens ten large US tech stocks unless symbols are given.",
        r#"{
            "type": "object",
            "properties": {
                "min_price": {"type": "number", "minimum": 0, "default": 0},
                "max_price": {"type": "number", "description": "Upper price bound; unbounded when omitted"},
                "symbols": {"type": "array", "items": {"type": "string"}}
            }
        }"#,
    ),
    (
        "get_market_indices",
        "Get current values and daily changes for the S&P 500, NASDAQ, Dow Jones, Russell 2000 and VIX",
        r#"{"type": "object", "properties": {}}"#,
    ),
    (
        "analyze_portfolio",
        "Value a stock portfolio at current prices: totals, gain or loss per holding, weights and best and worst performers",
        r#"{
            "type": "object",
            "properties": {
                "holdings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "symbol": {"type": "string"},
                            "shares": {"type": "number", "minimum": 0},
                            "cost_basis": {"type": "number", "minimum": 0, "description": "Price paid per share"}
                        },
                        "required": ["symbol", "shares"]
                    }
                }
            },
            "required": ["holdings"]
        }"#,
    ),
    (
        "get_crypto_data",
        "Get current prices and daily changes for cryptocurrencies (BTC, ETH, ADA, DOT and LINK unless symbols are given)",
        r#"{
            "type": "object",
            "properties": {
                "symbols": {"type": "array", "items": {"type": "string"}, "description": "Pairs such as BTC-USD"}
            }
        }"#,
    ),
    (
        "get_weather",
        "Get the current weather for a city. Returns clearly labelled mock data when no OpenWeather API key is configured.",
        r#"{
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name"},
                "units": {"type": "string", "enum": ["metric", "imperial"], "default": "metric"}
            },
            "required": ["city"]
        }"#,
    ),
    (
        "web_search",
        "Search the web using DuckDuckGo instant answers (no API key required)",
        r#"{
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 25, "default": 5}
            },
            "required": ["query"]
        }"#,
    ),
    (
        "get_historical_stock_data",
        "Get historical OHLCV data for a stock symbol. Returns the last 50 bars plus a summary over the whole period.",
        r#"{
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "Ticker symbol, e.g. AAPL"},
                "period": {"type": "string", "enum": ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"], "default": "1y"},
                "interval": {"type": "string", "default": "1d", "description": "Bar size, e.g. 1d, 1wk, 1mo"}
            },
            "required": ["symbol"]
        }"#,
    ),
    (
        "get_technical_indicators",
        "Calculate technical indicators for a stock: SMA 20/50, EMA 12/26, RSI 14, MACD, Bollinger Bands and trend comparisons",
        r#"{
            "type": "object",
            "properties": {
                "symbol": {"type": "string"},
                "period": {"type": "string", "enum": ["1mo", "3mo", "6mo", "1y", "2y", "5y"], "default": "6mo"}
            },
            "required": ["symbol"]
        }"#,
    ),
];

fn to_definitions<'a>(
    defs: &'a [(&'a str, &'a str, &'a str)],
) -> impl Iterator<Item = ToolDefinition> + 'a {
    defs.iter().map(|(name, description, schema)| ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::from_str(schema).unwrap_or_default(),
    })
}

/// Get all tool definitions as ToolDefinition structs
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    let mut tools: Vec<ToolDefinition> = to_definitions(COST_TOOL_DEFINITIONS)
        .chain(to_definitions(WAREHOUSE_TOOL_DEFINITIONS))
        .collect();
    #[cfg(feature = "web")]
    tools.extend(to_definitions(WEB_TOOL_DEFINITIONS));
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_are_valid_json() {
        for (name, _, schema) in COST_TOOL_DEFINITIONS
            .iter()
            .chain(WAREHOUSE_TOOL_DEFINITIONS)
            .chain(WEB_TOOL_DEFINITIONS)
        {
            let parsed: serde_json::Value = serde_json::from_str(schema)
                .unwrap_or_else(|e| panic!("schema for {} is invalid: {}", name, e));
            assert_eq!(parsed["type"], "object", "{}", name);
        }
    }

    #[test]
    fn test_cost_tools_always_listed() {
        let names: Vec<String> = get_tool_definitions().into_iter().map(|t| t.name).collect();
        for expected in ["discover_aws_profiles", "analyze_aws_costs", "get_aws_cost_report"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let mut names: Vec<String> = get_tool_definitions().into_iter().map(|t| t.name).collect();
        let listed = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), listed);
        assert!(names.iter().any(|n| n == "get_snowflake_top_warehouses"));
        #[cfg(feature = "web")]
        for expected in ["connect_snowflake", "screen_stocks", "analyze_portfolio", "get_crypto_data"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}
