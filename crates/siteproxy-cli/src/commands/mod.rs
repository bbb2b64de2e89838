//! CLI commands implementation

use anyhow::{bail, Context, Result};
use siteproxy_core::{ProxyConfig, SiteDescriptor, SiteRegistry, SiteStatus};
use siteproxy_monitor::SiteMonitor;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// List configured sites
pub fn list(config: &ProxyConfig, wide: bool) -> Result<()> {
    let registry = SiteRegistry::from_config(config)?;

    if registry.is_empty() {
        println!("No sites configured");
        return Ok(());
    }

    if wide {
        println!(
            "{:<24} {:<20} {:<8} {:<40} {}",
            "NAME", "LOCATION", "WEIGHT", "HTTP", "SSH"
        );
        println!("{}", "-".repeat(120));
        for site in registry.iter() {
            println!(
                "{:<24} {:<20} {:<8.1} {:<40} {}",
                site.name,
                site.location,
                configured_weight(site),
                site.url,
                site.ssh_url()
            );
        }
    } else {
        for site in registry.iter() {
            println!("{}", site_line(site));
        }
    }

    Ok(())
}

/// Probe every site and report the best one
pub async fn query(config: &ProxyConfig, output: Option<&Path>, wide: bool) -> Result<()> {
    if let Some(path) = output {
        check_output_path(path)?;
    }

    let registry = SiteRegistry::from_config(config)?;
    let monitor = SiteMonitor::with_ssh(registry, &config.monitor);

    let site = monitor
        .get_available_site()
        .await
        .context("failed to get site")?;

    let text = if wide {
        print_status_table(std::slice::from_ref(&site));
        status_pairs(&site)
    } else {
        let line = query_line(&site);
        println!("{}", line);
        line
    };

    if let Some(path) = output {
        write_output(path, &site, &text)?;
    }

    Ok(())
}

/// Show the daemon's status table
pub async fn sites(client: &ApiClient) -> Result<()> {
    let response = client.client.get(client.url("/api/sites")).send().await?;

    if response.status().is_success() {
        let sites: Vec<SiteStatus> = response.json().await?;
        if sites.is_empty() {
            println!("No sites found");
        } else {
            print_status_table(&sites);
        }
    } else {
        let error = response.text().await?;
        bail!("Failed to list sites: {}", error);
    }

    Ok(())
}

fn site_line(site: &SiteDescriptor) -> String {
    format!(
        "NAME:{}, LOCATION:{}, WEIGHT:{:.1}, HTTP:{}",
        site.name,
        site.location,
        configured_weight(site),
        site.url
    )
}

/// Weight as written in the config; unset prints as 0.0
fn configured_weight(site: &SiteDescriptor) -> f64 {
    site.weight.unwrap_or(0.0)
}

fn query_line(site: &SiteStatus) -> String {
    format!(
        "NAME:{}, URL:{}, CONNECTIONS:{}, QUEUESIZE:{}",
        site.name, site.url, site.connections, site.queue_size
    )
}

fn last_check(site: &SiteStatus) -> String {
    site.last_check
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

/// `KEY:value` pairs for every field of a status
fn status_pairs(site: &SiteStatus) -> String {
    [
        ("NAME", site.name.clone()),
        ("URL", site.url.clone()),
        ("HOST", site.host.clone()),
        ("HEALTHY", site.healthy.to_string()),
        ("RESPONSETIME", format!("{}ms", site.response_time)),
        ("CONNECTIONS", site.connections.to_string()),
        ("QUEUESIZE", site.queue_size.to_string()),
        ("SCORE", site.score.to_string()),
        ("LASTCHECK", last_check(site)),
        ("ERROR", site.error.clone()),
    ]
    .iter()
    .map(|(key, value)| format!("{}:{}", key, value))
    .collect::<Vec<_>>()
    .join(", ")
}

fn print_status_table(sites: &[SiteStatus]) {
    println!(
        "{:<24} {:<8} {:<10} {:<12} {:<10} {:<10} {:<26} {}",
        "NAME", "HEALTHY", "RESPONSE", "CONNECTIONS", "QUEUE", "SCORE", "LASTCHECK", "ERROR"
    );
    println!("{}", "-".repeat(120));
    for site in sites {
        println!(
            "{:<24} {:<8} {:<10} {:<12} {:<10} {:<10} {:<26} {}",
            site.name,
            site.healthy,
            format!("{}ms", site.response_time),
            site.connections,
            site.queue_size,
            site.score,
            last_check(site),
            site.error
        );
    }
}

fn check_output_path(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("output file {} already exists", path.display());
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") | Some("txt") => Ok(()),
        _ => bail!("invalid file extension: {} (expected .json or .txt)", path.display()),
    }
}

fn write_output(path: &Path, site: &SiteStatus, text: &str) -> Result<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(site)?,
        Some("txt") => format!("{}\n", text),
        _ => bail!("invalid file extension: {} (expected .json or .txt)", path.display()),
    };

    // create_new fails if the file appeared after the up-front check
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            bail!("output file {} already exists", path.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to create {}", path.display()))
        }
    };

    file.write_all(content.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}
