use lazy_static::lazy_static;
use serde::Deserialize;
use std::time::Duration;

use crate::config::NewsConfig;
use crate::utils::{AppError, TtlCache};

pub const FRAUD_NEWS_QUERY: &str =
    "OTP fraud OR UPI fraud OR credit card fraud OR debit card fraud OR online banking fraud";

const PAGE_SIZE: u32 = 12;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CACHE_KEY: &str = "fraud_news";

lazy_static! {
    static ref NEWS_CACHE: TtlCache<Vec<serde_json::Value>> = TtlCache::new();
}

#[derive(Debug, Deserialize)]
struct NewsSearchResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<serde_json::Value>,
}

fn build_url(config: &NewsConfig, api_key: &str) -> String {
    format!(
        "{}?q={}&language=en&sortBy=publishedAt&pageSize={}&apiKey={}",
        config.api_url,
        urlencoding::encode(FRAUD_NEWS_QUERY),
        PAGE_SIZE,
        urlencoding::encode(api_key)
    )
}

/// Latest fraud-related articles, passed through as returned by the news API
pub async fn fetch_fraud_news(config: &NewsConfig) -> Result<Vec<serde_json::Value>, AppError> {
    if let Some(articles) = NEWS_CACHE.get_fresh(CACHE_KEY, config.cache_ttl) {
        log::debug!("📦 Using cached news ({} articles)", articles.len());
        return Ok(articles);
    }

    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::UpstreamFailure("News API key is not configured.".to_string()))?;

    log::info!("📰 Fetching fraud news from news API");

    let client = reqwest::Client::new();
    let response = client
        .get(build_url(config, api_key))
        .header("Accept", "application/json")
        .header("User-Agent", concat!("scamurai/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await
        .map_err(|e| AppError::UpstreamFailure(format!("Failed to fetch news: {}", e)))?;

    let status = response.status();
    let body: NewsSearchResponse = response
        .json()
        .await
        .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse news: {}", e)))?;

    if !status.is_success() || body.status.as_deref() == Some("error") {
        return Err(AppError::UpstreamFailure(format!(
            "News API error: {} {}",
            status,
            body.message.unwrap_or_default()
        )));
    }

    log::info!("✅ Retrieved {} news articles", body.articles.len());
    NEWS_CACHE.set(CACHE_KEY.to_string(), body.articles.clone());

    Ok(body.articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> NewsConfig {
        NewsConfig {
            api_key: api_key.map(str::to_string),
            api_url: "https://newsapi.example/v2/everything".to_string(),
            cache_ttl: Duration::from_secs(0),
        }
    }

    #[test]
    fn test_build_url_encodes_query() {
        let url = build_url(&config(Some("k")), "k");
        assert!(url.starts_with("https://newsapi.example/v2/everything?q=OTP%20fraud%20OR%20UPI"));
        assert!(url.contains("&language=en&sortBy=publishedAt&pageSize=12&apiKey=k"));
    }

    #[test]
    fn test_parse_articles() {
        let body: NewsSearchResponse = serde_json::from_value(serde_json::json!({
            "status": "ok",
            "totalResults": 1,
            "articles": [{ "title": "New UPI scam", "url": "https://news.example/1" }]
        }))
        .unwrap();
        assert_eq!(body.articles.len(), 1);
        assert_eq!(body.articles[0]["title"], "New UPI scam");
    }

    #[tokio::test]
    async fn test_missing_key_is_upstream_failure() {
        let err = fetch_fraud_news(&config(None)).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure(_)));
    }
}
