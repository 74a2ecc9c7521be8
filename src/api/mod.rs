use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    ALIGNED_MESSAGE, Advice, Allocation, Asset, ComparisonResult, ComparisonRow,
    HistoricalReturns, MAX_AGE, MIN_AGE, REBALANCE_HEADING, RadarChart, Strategy, compare,
    future_yield, list_strategies, radar_chart, validate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliStrategy {
    #[value(name = "100-age-rule")]
    HundredMinusAge,
    ModernPortfolioTheory,
    BalancedPortfolio,
    AggressiveGrowth,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::HundredMinusAge => Strategy::HundredMinusAge,
            CliStrategy::ModernPortfolioTheory => Strategy::ModernPortfolioTheory,
            CliStrategy::BalancedPortfolio => Strategy::Balanced,
            CliStrategy::AggressiveGrowth => Strategy::AggressiveGrowth,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    age: Option<u32>,
    stocks: Option<i64>,
    bonds: Option<i64>,
    cash: Option<i64>,
    strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FutureYieldPayload {
    allocation: Option<BTreeMap<String, i64>>,
    years: Option<f64>,
    returns: Option<HistoricalReturns>,
}

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-analyzer",
    about = "Compare a Stocks/Bonds/Cash allocation against a predefined strategy"
)]
pub struct Cli {
    #[arg(long, default_value_t = 30, help = "Your age, between 18 and 100")]
    age: u32,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Percent allocated to stocks"
    )]
    stocks: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Percent allocated to bonds"
    )]
    bonds: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Percent allocated to cash"
    )]
    cash: i64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliStrategy::HundredMinusAge,
        help = "Strategy to compare against"
    )]
    strategy: CliStrategy,
    #[arg(long, help = "Print the JSON response instead of a table")]
    json: bool,
    #[arg(long, help = "List the available strategies and exit")]
    list_strategies: bool,
}

#[derive(Debug, Clone)]
struct CompareRequest {
    age: u32,
    strategy: Strategy,
    user: Allocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StrategiesResponse {
    strategies: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum AdviceResponse {
    Aligned {
        message: &'static str,
    },
    Rebalance {
        heading: &'static str,
        actions: Vec<String>,
    },
}

impl From<&Advice> for AdviceResponse {
    fn from(value: &Advice) -> Self {
        match value {
            Advice::Aligned => AdviceResponse::Aligned {
                message: ALIGNED_MESSAGE,
            },
            Advice::Rebalance(_) => AdviceResponse::Rebalance {
                heading: REBALANCE_HEADING,
                actions: value.lines(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    strategy: &'static str,
    age: u32,
    allocation: Allocation,
    target: Allocation,
    rows: Vec<ComparisonRow>,
    advice: AdviceResponse,
    chart: RadarChart,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FutureYieldResponse {
    years: f64,
    future_yield: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: &Cli) -> Result<CompareRequest, String> {
    let raw: BTreeMap<String, i64> = [
        (Asset::Stocks, cli.stocks),
        (Asset::Bonds, cli.bonds),
        (Asset::Cash, cli.cash),
    ]
    .into_iter()
    .map(|(asset, value)| (asset.name().to_string(), value))
    .collect();

    let user = validate(&raw).map_err(|e| e.to_string())?;

    if !(MIN_AGE..=MAX_AGE).contains(&cli.age) {
        return Err(format!("--age must be between {MIN_AGE} and {MAX_AGE}"));
    }

    Ok(CompareRequest {
        age: cli.age,
        strategy: cli.strategy.into(),
        user,
    })
}

fn evaluate(request: &CompareRequest) -> Result<CompareResponse, String> {
    let target = request
        .strategy
        .target(request.age)
        .map_err(|e| e.to_string())?;
    let result = compare(&request.user, &target);
    Ok(build_compare_response(request, &result))
}

fn build_compare_response(request: &CompareRequest, result: &ComparisonResult) -> CompareResponse {
    CompareResponse {
        strategy: request.strategy.name(),
        age: request.age,
        allocation: result.user,
        target: result.strategy,
        rows: result.rows.clone(),
        advice: (&result.advice).into(),
        chart: radar_chart(result),
    }
}

/// Runs one evaluation from command-line flags and returns what to print.
pub fn run_cli(cli: Cli) -> Result<String, String> {
    if cli.list_strategies {
        return Ok(list_strategies().join("\n"));
    }

    let request = build_request(&cli)?;
    let response = evaluate(&request)?;
    if cli.json {
        serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to encode JSON: {e}"))
    } else {
        Ok(render_report(&response))
    }
}

fn render_report(response: &CompareResponse) -> String {
    let mut out = String::new();
    out.push_str(&format!("Strategy: {}", response.strategy));
    if response.strategy == Strategy::HundredMinusAge.name() {
        out.push_str(&format!(" (age {})", response.age));
    }
    out.push_str("\n\n");
    out.push_str(&format!(
        "{:<8}{:>22}{:>26}\n",
        "Asset", "Your Allocation (%)", "Strategy Allocation (%)"
    ));
    for row in &response.rows {
        out.push_str(&format!(
            "{:<8}{:>22}{:>26}\n",
            row.asset.name(),
            row.user,
            row.strategy
        ));
    }
    out.push('\n');
    match &response.advice {
        AdviceResponse::Aligned { message } => {
            out.push_str(message);
            out.push('\n');
        }
        AdviceResponse::Rebalance { heading, actions } => {
            out.push_str(heading);
            out.push('\n');
            for action in actions {
                out.push_str(&format!("- {action}\n"));
            }
        }
    }
    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/strategies", get(strategies_handler))
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route("/api/future-yield", post(future_yield_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("Portfolio analyzer API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/strategies");

    axum::serve(listener, app).await
}

async fn strategies_handler() -> Response {
    json_response(
        StatusCode::OK,
        StrategiesResponse {
            strategies: list_strategies(),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_get_handler(payload: Result<Query<ComparePayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => compare_handler_impl(payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

async fn compare_post_handler(payload: Result<Json<ComparePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => compare_handler_impl(payload),
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    }
}

fn compare_handler_impl(payload: ComparePayload) -> Response {
    let result = compare_request_from_payload(payload).and_then(|request| evaluate(&request));
    match result {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            warn!("rejected compare request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn future_yield_handler(
    payload: Result<Json<FutureYieldPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    match future_yield_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            warn!("rejected future-yield request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Extractor failures keep their status code but use the same JSON error body.
fn rejection_response(status: StatusCode, msg: String) -> Response {
    warn!("rejected malformed request: {msg}");
    error_response(status, &msg)
}

#[cfg(test)]
fn compare_request_from_json(json: &str) -> Result<CompareRequest, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    compare_request_from_payload(payload)
}

fn compare_request_from_payload(payload: ComparePayload) -> Result<CompareRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.age {
        cli.age = v;
    }
    if let Some(v) = payload.stocks {
        cli.stocks = v;
    }
    if let Some(v) = payload.bonds {
        cli.bonds = v;
    }
    if let Some(v) = payload.cash {
        cli.cash = v;
    }

    let mut request = build_request(&cli)?;
    if let Some(name) = payload.strategy {
        request.strategy = name.parse::<Strategy>().map_err(|e| e.to_string())?;
    }
    Ok(request)
}

fn future_yield_from_payload(payload: FutureYieldPayload) -> Result<FutureYieldResponse, String> {
    let raw = payload
        .allocation
        .ok_or_else(|| "allocation is required".to_string())?;
    let years = payload
        .years
        .ok_or_else(|| "years is required".to_string())?;
    let returns = payload
        .returns
        .ok_or_else(|| "returns is required".to_string())?;

    let allocation = validate(&raw).map_err(|e| e.to_string())?;
    let future_yield = future_yield(&allocation, years, &returns).map_err(|e| e.to_string())?;
    Ok(FutureYieldResponse {
        years,
        future_yield,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        age: 30,
        stocks: 0,
        bonds: 0,
        cash: 0,
        strategy: CliStrategy::HundredMinusAge,
        json: true,
        list_strategies: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        let mut cli = default_cli_for_api();
        cli.stocks = 50;
        cli.bonds = 30;
        cli.cash = 20;
        cli.strategy = CliStrategy::ModernPortfolioTheory;
        cli.json = false;
        cli
    }

    #[test]
    fn cli_parses_flags_and_strategy_slugs() {
        let cli = Cli::try_parse_from([
            "portfolio-analyzer",
            "--age",
            "45",
            "--stocks",
            "55",
            "--bonds",
            "45",
            "--strategy",
            "100-age-rule",
        ])
        .unwrap();
        assert_eq!(cli.age, 45);
        assert_eq!(cli.cash, 0);
        assert_eq!(cli.strategy, CliStrategy::HundredMinusAge);
        assert!(!cli.json);
    }

    #[test]
    fn build_request_rejects_defaults_with_actual_total() {
        let err = build_request(&default_cli_for_api()).unwrap_err();
        assert_eq!(err, "Portfolio allocation must total 100%, but you have 0%.");
    }

    #[test]
    fn build_request_rejects_age_outside_range() {
        let mut cli = sample_cli();
        cli.age = 17;
        assert_eq!(
            build_request(&cli).unwrap_err(),
            "--age must be between 18 and 100"
        );
    }

    #[test]
    fn compare_request_from_json_overlays_defaults() {
        let request = compare_request_from_json(
            r#"{"age": 40, "stocks": 70, "bonds": 20, "cash": 10, "strategy": "Aggressive Growth"}"#,
        )
        .unwrap();
        assert_eq!(request.age, 40);
        assert_eq!(request.strategy, Strategy::AggressiveGrowth);
        assert_eq!(request.user.values(), [70, 20, 10]);

        let defaulted =
            compare_request_from_json(r#"{"stocks": 70, "bonds": 30}"#).unwrap();
        assert_eq!(defaulted.age, 30);
        assert_eq!(defaulted.strategy, Strategy::HundredMinusAge);
    }

    #[test]
    fn compare_request_from_json_rejects_unknown_strategy() {
        let err = compare_request_from_json(
            r#"{"stocks": 70, "bonds": 30, "strategy": "Crypto Only"}"#,
        )
        .unwrap_err();
        assert_eq!(err, "Unknown strategy 'Crypto Only'");
    }

    #[test]
    fn compare_response_serialization_contains_expected_fields() {
        let request = build_request(&sample_cli()).unwrap();
        let response = evaluate(&request).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["strategy"], "Modern Portfolio Theory");
        assert_eq!(json["target"]["Stocks"], 60);
        assert_eq!(json["allocation"]["Cash"], 20);
        assert_eq!(json["rows"][1]["asset"], "Bonds");
        assert_eq!(json["rows"][1]["user"], 30);
        assert_eq!(json["rows"][1]["strategy"], 30);
        assert_eq!(json["advice"]["status"], "rebalance");
        assert_eq!(json["advice"]["heading"], REBALANCE_HEADING);
        assert_eq!(
            json["advice"]["actions"],
            serde_json::json!(["Buy 10% more of Stocks.", "Sell 10% of Cash."])
        );
        assert_eq!(json["chart"]["axes"], serde_json::json!(["Stocks", "Bonds", "Cash"]));
        assert_eq!(json["chart"]["radialRange"], serde_json::json!([0, 100]));
        assert_eq!(json["chart"]["series"][1]["name"], "Strategy");
    }

    #[test]
    fn aligned_response_reports_message_only() {
        let request =
            compare_request_from_json(r#"{"stocks": 50, "bonds": 40, "cash": 10, "strategy": "balanced-portfolio"}"#)
                .unwrap();
        let json = serde_json::to_value(evaluate(&request).unwrap()).unwrap();
        assert_eq!(json["advice"]["status"], "aligned");
        assert_eq!(json["advice"]["message"], ALIGNED_MESSAGE);
        assert!(json["advice"].get("actions").is_none());
    }

    #[test]
    fn render_report_lists_rows_and_moves() {
        let report = run_cli(sample_cli()).unwrap();
        assert!(report.starts_with("Strategy: Modern Portfolio Theory\n"));
        assert!(report.contains("Stocks"));
        assert!(report.contains(REBALANCE_HEADING));
        assert!(report.contains("- Buy 10% more of Stocks.\n"));
        assert!(report.contains("- Sell 10% of Cash.\n"));
        assert!(!report.contains("Bonds."));
    }

    #[test]
    fn run_cli_lists_strategies_in_catalog_order() {
        let mut cli = default_cli_for_api();
        cli.list_strategies = true;
        assert_eq!(
            run_cli(cli).unwrap(),
            "100-age rule\nModern Portfolio Theory\nBalanced Portfolio\nAggressive Growth"
        );
    }

    #[test]
    fn future_yield_payload_computes_compound_growth() {
        let payload = serde_json::from_str::<FutureYieldPayload>(
            r#"{"allocation": {"Stocks": 100, "Bonds": 0, "Cash": 0},
                "years": 1,
                "returns": {"Stocks": 10, "Bonds": 5, "Cash": 0}}"#,
        )
        .unwrap();
        let response = future_yield_from_payload(payload).unwrap();
        assert_approx(response.future_yield, 0.10);
    }

    #[test]
    fn future_yield_payload_reports_missing_return_data() {
        let payload = serde_json::from_str::<FutureYieldPayload>(
            r#"{"allocation": {"Stocks": 60, "Bonds": 40, "Cash": 0},
                "years": 5,
                "returns": {"Stocks": 7}}"#,
        )
        .unwrap();
        let err = future_yield_from_payload(payload).unwrap_err();
        assert_eq!(err, "No historical return supplied for Bonds");
    }

    async fn error_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn malformed_json_body_gets_json_error() {
        use axum::extract::FromRequest;
        use axum::http::Request;

        let request = Request::builder()
            .method("POST")
            .uri("/api/future-yield")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"years\": "))
            .unwrap();
        let extracted = Json::<FutureYieldPayload>::from_request(request, &()).await;
        assert!(extracted.is_err());

        let response = future_yield_handler(extracted).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let body = error_body(response).await;
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn unparseable_query_gets_json_error() {
        let uri: axum::http::Uri = "/api/compare?age=-1&stocks=100".parse().unwrap();
        let extracted = Query::<ComparePayload>::try_from_uri(&uri);
        assert!(extracted.is_err());

        let response = compare_get_handler(extracted).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn valid_query_still_reaches_comparison() {
        let uri: axum::http::Uri =
            "/api/compare?stocks=60&bonds=30&cash=10&strategy=modern-portfolio-theory"
                .parse()
                .unwrap();
        let response = compare_get_handler(Query::<ComparePayload>::try_from_uri(&uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = error_body(response).await;
        assert_eq!(body["advice"]["status"], "aligned");
    }

    #[test]
    fn build_request_reports_huge_total_without_overflow() {
        let mut cli = sample_cli();
        cli.stocks = i64::MAX;
        cli.bonds = 1;
        let err = build_request(&cli).unwrap_err();
        assert!(err.contains(&(i128::from(i64::MAX) + 21).to_string()), "{err}");
    }

    #[test]
    fn future_yield_payload_rejects_same_asset_twice() {
        let payload = serde_json::from_str::<FutureYieldPayload>(
            r#"{"allocation": {"Stocks": 50, "stocks": 50, "Bonds": 0, "Cash": 0},
                "years": 1,
                "returns": {"Stocks": 10, "Bonds": 5, "Cash": 0}}"#,
        )
        .unwrap();
        assert_eq!(
            future_yield_from_payload(payload).unwrap_err(),
            "Allocation lists Stocks more than once"
        );
    }

    #[test]
    fn future_yield_payload_requires_years() {
        let payload = serde_json::from_str::<FutureYieldPayload>(
            r#"{"allocation": {"Stocks": 100, "Bonds": 0, "Cash": 0}, "returns": {}}"#,
        )
        .unwrap();
        assert_eq!(
            future_yield_from_payload(payload).unwrap_err(),
            "years is required"
        );
    }
}
