//! Static discovery backend.
//!
//! Serves the instances declared in `[[discovery.instances]]`, filtered by
//! the selector. Useful for local development against instances reachable
//! on explicit `host:port` addresses.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::config::StaticInstanceConfig;
use crate::discovery::{Discovery, DiscoveryError, InstanceDescriptor, LabelSelector};

#[derive(Debug, Clone)]
struct Entry {
    descriptor: InstanceDescriptor,
    labels: BTreeMap<String, String>,
}

/// Discovery over a fixed, configured instance list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    entries: Vec<Entry>,
}

impl StaticDiscovery {
    pub fn from_config(instances: &[StaticInstanceConfig]) -> Self {
        let entries = instances
            .iter()
            .map(|i| Entry {
                descriptor: InstanceDescriptor {
                    name: i.name.clone(),
                    namespace: String::new(),
                    address: i.address.clone(),
                    host: i.host.clone(),
                    phase: i.phase.as_str().into(),
                },
                labels: i.labels.clone(),
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list(&self, selector: &LabelSelector) -> Result<Vec<InstanceDescriptor>, DiscoveryError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| selector.matches(&e.labels))
            .map(|e| e.descriptor.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::InstancePhase;

    fn instance(name: &str, app: &str, phase: &str) -> StaticInstanceConfig {
        StaticInstanceConfig {
            name: name.to_string(),
            address: "10.0.0.1".to_string(),
            host: "node-a".to_string(),
            phase: phase.to_string(),
            labels: [("app".to_string(), app.to_string())].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_filters_by_selector() {
        let discovery = StaticDiscovery::from_config(&[
            instance("web-1", "probe-demo", "Running"),
            instance("db-1", "postgres", "Running"),
            instance("web-2", "probe-demo", "Pending"),
        ]);
        let selector = LabelSelector::parse("app=probe-demo").unwrap();

        let found = discovery.list(&selector).await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
        assert_eq!(found[1].phase, InstancePhase::Pending);
        assert_eq!(found[0].host, "node-a");
    }
}
