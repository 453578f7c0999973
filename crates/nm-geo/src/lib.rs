//! Public-IP detection and geolocation classification.
//!
//! Both calls are thin consumers of third-party HTTP services. Callers
//! treat any error here as a classification failure and continue with the
//! overseas default profile.

use anyhow::{bail, Context, Result};
use nm_core::GeoClassification;
use serde::Deserialize;
use std::time::Duration;

const IP_ECHO_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me",
    "https://icanhazip.com",
    "https://ident.me",
];

const GEO_API: &str = "http://ip-api.com/json";

/// Ask a handful of echo services for our public address; first 200 wins.
pub async fn public_ip(client: &reqwest::Client) -> Result<String> {
    for service in IP_ECHO_SERVICES {
        let response = client
            .get(*service)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(body) = resp.text().await {
                    let ip = body.trim().to_string();
                    if !ip.is_empty() {
                        tracing::debug!(service, ip, "public address detected");
                        return Ok(ip);
                    }
                }
            }
            Ok(resp) => tracing::debug!(service, status = %resp.status(), "echo service refused"),
            Err(e) => tracing::debug!(service, error = %e, "echo service unreachable"),
        }
    }

    bail!("no public-IP echo service responded")
}

#[derive(Debug, Deserialize)]
struct GeoApiResponse {
    #[serde(default)]
    country: String,
    #[serde(rename = "countryCode", default)]
    country_code: String,
    #[serde(rename = "regionName", default)]
    region_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    isp: String,
}

fn classification_from(resp: GeoApiResponse) -> GeoClassification {
    GeoClassification {
        is_domestic: resp.country_code == "CN",
        country_code: resp.country_code,
        country: resp.country,
        region: resp.region_name,
        city: resp.city,
        isp: resp.isp,
    }
}

/// Classify an address via ip-api.com. A `CN` country code marks the host
/// as domestic; everything else, including lookup failure upstream, is
/// treated as overseas by the caller.
pub async fn classify(client: &reqwest::Client, ip: &str) -> Result<GeoClassification> {
    let url = format!(
        "{}/{}?fields=country,countryCode,regionName,city,isp",
        GEO_API, ip
    );

    let resp = client
        .get(&url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .context("geolocation request failed")?;

    if !resp.status().is_success() {
        bail!("geolocation API returned {}", resp.status());
    }

    let parsed: GeoApiResponse = resp
        .json()
        .await
        .context("geolocation response was not valid JSON")?;

    Ok(classification_from(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cn_country_code_is_domestic() {
        let resp: GeoApiResponse = serde_json::from_str(
            r#"{"country":"China","countryCode":"CN","regionName":"Beijing","city":"Beijing","isp":"China Telecom"}"#,
        )
        .unwrap();
        let geo = classification_from(resp);
        assert!(geo.is_domestic);
        assert_eq!(geo.city, "Beijing");
    }

    #[test]
    fn other_codes_are_overseas() {
        let resp: GeoApiResponse =
            serde_json::from_str(r#"{"country":"Germany","countryCode":"DE"}"#).unwrap();
        let geo = classification_from(resp);
        assert!(!geo.is_domestic);
        assert_eq!(geo.country, "Germany");
    }

    #[test]
    fn missing_fields_default_empty() {
        let resp: GeoApiResponse = serde_json::from_str("{}").unwrap();
        let geo = classification_from(resp);
        assert!(!geo.is_domestic);
        assert!(geo.isp.is_empty());
    }
}
