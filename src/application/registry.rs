//! Ordered working set of contributors.

use std::sync::Arc;

use itertools::Itertools;
use tracing::debug;

use crate::application::Contributor;
use crate::config::Settings;
use crate::domain::ContributorId;

/// A contributor together with its registration metadata.
#[derive(Clone)]
pub struct RegisteredContributor {
    id: ContributorId,
    name: String,
    order: i32,
    sequence: usize,
    forced: Option<bool>,
    contributor: Arc<dyn Contributor>,
}

impl RegisteredContributor {
    pub fn id(&self) -> ContributorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective sort key (config override or `tree_order()`).
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Position in the original registration list, the tie-breaker.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn contributor(&self) -> &Arc<dyn Contributor> {
        &self.contributor
    }

    /// A config `enabled` override wins over the contributor's own answer.
    pub fn is_active(&self) -> bool {
        self.forced.unwrap_or_else(|| self.contributor.is_enabled())
    }
}

impl std::fmt::Debug for RegisteredContributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredContributor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("order", &self.order)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Holds every registered contributor, sorted once by `(order, sequence)`.
///
/// The sort is computed at construction and never changes. Enablement is
/// not frozen: [`active`](Self::active) asks each contributor on every call.
#[derive(Debug, Clone, Default)]
pub struct ContributorRegistry {
    entries: Vec<RegisteredContributor>,
}

impl ContributorRegistry {
    pub fn new(contributors: Vec<Arc<dyn Contributor>>) -> Self {
        Self::with_overrides(contributors, &Settings::default())
    }

    pub fn with_overrides(contributors: Vec<Arc<dyn Contributor>>, settings: &Settings) -> Self {
        let entries: Vec<RegisteredContributor> = contributors
            .into_iter()
            .enumerate()
            .map(|(sequence, contributor)| {
                let name = contributor.name().to_string();
                let over = settings.contributor(&name);
                let order = over
                    .and_then(|o| o.order)
                    .unwrap_or_else(|| contributor.tree_order());
                RegisteredContributor {
                    id: ContributorId::new(),
                    forced: over.and_then(|o| o.enabled),
                    name,
                    order,
                    sequence,
                    contributor,
                }
            })
            // stable: equal orders keep registration order
            .sorted_by_key(|entry| entry.order)
            .collect();

        debug!(
            "registry: {}",
            entries
                .iter()
                .map(|e| format!("{}({})", e.name, e.order))
                .join(", ")
        );
        Self { entries }
    }

    /// All registered contributors in sorted order, enabled or not.
    pub fn entries(&self) -> &[RegisteredContributor] {
        &self.entries
    }

    /// Enabled contributors in sorted order.
    pub fn active(&self) -> Vec<&RegisteredContributor> {
        self.entries.iter().filter(|e| e.is_active()).collect()
    }

    pub fn get(&self, id: ContributorId) -> Option<&RegisteredContributor> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&RegisteredContributor> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }
}
