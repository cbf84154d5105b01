use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::processors::{build_processor, Processor};
use crate::store::CollectionConfig;
use crate::time::TimeSource;

/// Site id to processor chain, memoized for a single drain cycle.
///
/// The cache is built against the configuration snapshot fetched at the start
/// of the cycle and dropped with it, so configuration changes become visible
/// within one drain period. The scan cost is paid once per distinct site per
/// cycle.
pub struct ProcessorCache<'a> {
    configs: &'a [CollectionConfig],
    timesource: Arc<dyn TimeSource + Send + Sync>,
    resolved: HashMap<String, Vec<Box<dyn Processor>>>,
}

impl<'a> ProcessorCache<'a> {
    pub fn new(
        configs: &'a [CollectionConfig],
        timesource: Arc<dyn TimeSource + Send + Sync>,
    ) -> Self {
        Self {
            configs,
            timesource,
            resolved: HashMap::new(),
        }
    }

    /// Ordered processors for a site. Unresolvable declarations are logged
    /// and skipped: the site gets fewer processors, never a failed cycle.
    pub fn resolve(&mut self, site_id: &str) -> &[Box<dyn Processor>] {
        if !self.resolved.contains_key(site_id) {
            let processors = self.build_for_site(site_id);
            self.resolved.insert(site_id.to_string(), processors);
        }
        &self.resolved[site_id]
    }

    fn build_for_site(&self, site_id: &str) -> Vec<Box<dyn Processor>> {
        let mut processors = Vec::new();
        for config in self
            .configs
            .iter()
            .filter(|config| config.site_id == site_id)
        {
            for declaration in &config.processors {
                match build_processor(declaration, &config.collection, self.timesource.clone()) {
                    Ok(processor) => processors.push(processor),
                    Err(err) => warn!(
                        collection = %config.collection,
                        kind = %declaration.kind,
                        "skipping processor: {err}"
                    ),
                }
            }
        }
        processors
    }
}
