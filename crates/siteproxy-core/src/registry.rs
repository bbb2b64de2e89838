//! Read-only registry of monitored sites

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{expand_tilde, ProxyConfig, SiteConfig};
use crate::{ProxyError, ProxyResult, SiteDescriptor};

/// Sites known to the proxy, keyed by name. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<String, SiteDescriptor>,
}

impl SiteRegistry {
    /// Build the registry from a loaded configuration
    pub fn from_config(config: &ProxyConfig) -> ProxyResult<Self> {
        let sites = config
            .sites
            .iter()
            .map(|(name, site)| descriptor(name, site).map(|d| (name.clone(), d)))
            .collect::<ProxyResult<BTreeMap<_, _>>>()?;

        Ok(Self { sites })
    }

    /// Build a registry directly from descriptors
    pub fn from_sites(sites: impl IntoIterator<Item = SiteDescriptor>) -> Self {
        Self {
            sites: sites.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Look up a site by name
    pub fn get(&self, name: &str) -> ProxyResult<&SiteDescriptor> {
        self.sites
            .get(name)
            .ok_or_else(|| ProxyError::SiteNotFound(name.to_string()))
    }

    /// The first site in name order
    pub fn first(&self) -> Option<&SiteDescriptor> {
        self.sites.values().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteDescriptor> {
        self.sites.values()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

fn descriptor(name: &str, site: &SiteConfig) -> ProxyResult<SiteDescriptor> {
    if site.ssh.host.trim().is_empty() {
        return Err(ProxyError::Config(format!("site {}: ssh host is empty", name)));
    }

    if let Some(w) = site.weight {
        if !w.is_finite() || !(0.0..=1.0).contains(&w) {
            return Err(ProxyError::Config(format!(
                "site {}: weight {} is outside (0.0, 1.0]",
                name, w
            )));
        }
    }

    Ok(SiteDescriptor {
        name: name.to_string(),
        location: site.location.clone(),
        url: site.http.url.clone(),
        host: site.ssh.host.clone(),
        port: site.ssh.port,
        user: site.ssh.user.clone(),
        key: site.ssh.key.as_deref().map(|k| expand_tilde(Path::new(k))),
        weight: site.weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ProxyConfig {
        ProxyConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_from_config() {
        let registry = SiteRegistry::from_config(&config(
            r#"
sites:
  west:
    location: "West"
    weight: 0.5
    http: { url: "https://west.example.com" }
    ssh: { host: "west.example.com", user: "bot", key: "/keys/id" }
  east:
    http: { url: "https://east.example.com" }
    ssh: { host: "east.example.com" }
"#,
        ))
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.first().unwrap().name, "east");

        let west = registry.get("west").unwrap();
        assert_eq!(west.importance(), 0.5);
        assert_eq!(west.destination(), "bot@west.example.com");
        assert_eq!(west.key.as_deref(), Some(Path::new("/keys/id")));
        assert_eq!(west.url, "https://west.example.com");
    }

    #[test]
    fn test_zero_weight_accepted() {
        let registry = SiteRegistry::from_config(&config(
            "sites:\n  a:\n    weight: 0\n    ssh: { host: a.example.com }\n",
        ))
        .unwrap();
        assert_eq!(registry.get("a").unwrap().importance(), 1.0);
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let result = SiteRegistry::from_config(&config(
            "sites:\n  a:\n    weight: 1.5\n    ssh: { host: a.example.com }\n",
        ));
        assert!(matches!(result, Err(ProxyError::Config(_))));

        let result = SiteRegistry::from_config(&config(
            "sites:\n  a:\n    weight: -0.1\n    ssh: { host: a.example.com }\n",
        ));
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_empty_host_rejected() {
        let result =
            SiteRegistry::from_config(&config("sites:\n  a:\n    ssh: { host: \"\" }\n"));
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_unknown_site() {
        let registry = SiteRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.first().is_none());
        assert!(matches!(registry.get("nope"), Err(ProxyError::SiteNotFound(_))));
    }
}
