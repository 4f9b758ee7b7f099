// SGS upstream implementation of the series source port
use crate::application::series_source::{SeriesSource, SourceResult};
use crate::domain::series::{DAY_FIRST_FORMAT, Interval, SeriesPoint, format_day_first};
use crate::error::UpstreamError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SgsRepository {
    base_url: String,
    client: reqwest::Client,
}

/// One observation as served upstream: `{"data": "dd/mm/yyyy", "valor": "1.23"}`.
#[derive(Debug, Deserialize)]
struct SgsObservation {
    data: String,
    valor: serde_json::Value,
}

impl SgsRepository {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sgs-timeseries/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn interval_url(&self, code: u32, interval: Interval) -> String {
        format!(
            "{}/bcdata.sgs.{}/dados?formato=json&dataInicial={}&dataFinal={}",
            self.base_url,
            code,
            urlencoding::encode(&format_day_first(interval.start)),
            urlencoding::encode(&format_day_first(interval.end))
        )
    }

    fn last_url(&self, code: u32, n: u32) -> String {
        format!(
            "{}/bcdata.sgs.{}/dados/ultimos/{}?formato=json",
            self.base_url, code, n
        )
    }

    async fn execute(&self, url: &str, timeout: Duration) -> SourceResult {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        parse_observations(&body)
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Transport(error.to_string())
    }
}

/// Map a non-success status to the upstream error classes.
fn classify_status(status: u16, body: String) -> UpstreamError {
    match status {
        404 => UpstreamError::NotFound,
        408 => UpstreamError::Timeout,
        429 => UpstreamError::RateLimited,
        s if s >= 500 => UpstreamError::Server(s),
        s => UpstreamError::Rejected { status: s, body },
    }
}

/// Decode an upstream body. A non-array body means no data; values that
/// are not numeric are skipped.
fn parse_observations(body: &str) -> SourceResult {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(items.len());
    for item in items {
        let observation: SgsObservation =
            serde_json::from_value(item).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let date = NaiveDate::parse_from_str(&observation.data, DAY_FIRST_FORMAT)
            .map_err(|e| UpstreamError::Decode(format!("date '{}': {}", observation.data, e)))?;

        let value = match &observation.valor {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        };

        match value {
            Some(v) => points.push(SeriesPoint::new(date, v)),
            None => tracing::debug!("Skipping non-numeric value on {}", observation.data),
        }
    }

    Ok(points)
}

#[async_trait]
impl SeriesSource for SgsRepository {
    async fn fetch_interval(
        &self,
        code: u32,
        interval: Interval,
        timeout: Duration,
    ) -> SourceResult {
        self.execute(&self.interval_url(code, interval), timeout).await
    }

    async fn fetch_last(&self, code: u32, n: u32, timeout: Duration) -> SourceResult {
        self.execute(&self.last_url(code, n), timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_interval_url() {
        let repo = SgsRepository::new("https://api.bcb.gov.br/dados/serie/".to_string());
        let url = repo.interval_url(11, Interval::new(d(2010, 1, 1), d(2019, 12, 31)));
        assert_eq!(
            url,
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.11/dados?formato=json&dataInicial=01%2F01%2F2010&dataFinal=31%2F12%2F2019"
        );
    }

    #[test]
    fn test_last_url() {
        let repo = SgsRepository::new("http://localhost:9000".to_string());
        assert_eq!(
            repo.last_url(433, 12),
            "http://localhost:9000/bcdata.sgs.433/dados/ultimos/12?formato=json"
        );
    }

    #[test]
    fn test_parse_observations() {
        let body = r#"[
            {"data":"02/01/2024","valor":"11.65"},
            {"data":"03/01/2024","valor":11.7},
            {"data":"04/01/2024","valor":""}
        ]"#;
        let points = parse_observations(body).unwrap();
        assert_eq!(
            points,
            vec![
                SeriesPoint::new(d(2024, 1, 2), 11.65),
                SeriesPoint::new(d(2024, 1, 3), 11.7),
            ]
        );
    }

    #[test]
    fn test_parse_non_array_is_empty() {
        assert!(parse_observations(r#"{"error":"no data"}"#).unwrap().is_empty());
        assert!(parse_observations("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        assert!(matches!(parse_observations("<html>"), Err(UpstreamError::Decode(_))));
        assert!(matches!(
            parse_observations(r#"[{"data":"2024-01-02","valor":"1"}]"#),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(404, String::new()), UpstreamError::NotFound);
        assert_eq!(classify_status(429, String::new()), UpstreamError::RateLimited);
        assert_eq!(classify_status(502, String::new()), UpstreamError::Server(502));
        assert_eq!(
            classify_status(400, "bad".into()),
            UpstreamError::Rejected {
                status: 400,
                body: "bad".into()
            }
        );
    }
}
