//! Fan-out dispatcher
//!
//! Sends one set of generation parameters to many providers at once and
//! gathers every result, in the caller's order, once all calls are done.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::providers::{GenerateParams, ProviderRegistry};
use crate::types::ProviderResult;

/// Concurrently invokes registered providers
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
}

/// A spawned provider call and the slot its result belongs in
struct InFlight {
    index: usize,
    provider_id: String,
    handle: JoinHandle<ProviderResult>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Call every provider in `provider_ids` concurrently.
    ///
    /// Returns exactly one result per id, in input order. Duplicate ids are
    /// separate calls. Unknown ids, failed calls and panicking adapters each
    /// produce an error result for their slot and never affect the others.
    pub async fn dispatch(&self, params: GenerateParams, provider_ids: &[String]) -> Vec<ProviderResult> {
        debug!(
            "Dispatching to {} providers: {}",
            provider_ids.len(),
            provider_ids.join(", ")
        );

        let params = Arc::new(params);
        let mut slots: Vec<Option<ProviderResult>> = vec![None; provider_ids.len()];
        let mut in_flight = Vec::with_capacity(provider_ids.len());

        for (index, provider_id) in provider_ids.iter().enumerate() {
            let Some(provider) = self.registry.resolve(provider_id) else {
                warn!("Unknown provider requested: {}", provider_id);
                slots[index] = Some(ProviderResult::unknown_provider(provider_id));
                continue;
            };

            let params = params.clone();
            in_flight.push(InFlight {
                index,
                provider_id: provider_id.clone(),
                handle: tokio::spawn(async move { provider.generate(&params).await }),
            });
        }

        // Barrier: wait for every call, whatever order they finish in
        for InFlight {
            index,
            provider_id,
            handle,
        } in in_flight
        {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Provider {} task failed: {}", provider_id, e);
                    ProviderResult::failure(&provider_id, format!("Provider task failed: {}", e), 0)
                }
            };
            if let Some(error) = &result.error {
                warn!(
                    "Provider {} failed after {}ms: {}",
                    provider_id, result.latency_ms, error
                );
            }
            slots[index] = Some(result);
        }

        let results: Vec<ProviderResult> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), provider_ids.len());
        results
    }
}
