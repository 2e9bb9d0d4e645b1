//! Resolve and confirm the node groups a platform action operates on.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::config::InventoryConfig;
use crate::errors::{PlatformError, Result};

/// Roles a management node can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Manager,
    Worker,
}

/// Answers role-membership queries
pub trait Inventory {
    /// Hostnames holding any of `roles`
    fn members_by_role(&self, roles: &[Role]) -> Result<Vec<String>>;
}

/// Asks the operator to pick one of `choices`
pub trait Confirm {
    fn confirm(&self, prompt: &str, choices: &[&str]) -> Result<String>;
}

/// Inventory read from the `inventory` config section
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    managers: Vec<String>,
    workers: Vec<String>,
}

impl StaticInventory {
    pub fn new(managers: Vec<String>, workers: Vec<String>) -> Self {
        Self { managers, workers }
    }
}

impl From<&InventoryConfig> for StaticInventory {
    fn from(config: &InventoryConfig) -> Self {
        Self::new(config.managers.clone(), config.workers.clone())
    }
}

impl Inventory for StaticInventory {
    fn members_by_role(&self, roles: &[Role]) -> Result<Vec<String>> {
        let mut members = BTreeSet::new();
        for role in roles {
            let hosts = match role {
                Role::Manager => &self.managers,
                Role::Worker => &self.workers,
            };
            members.extend(hosts.iter().cloned());
        }
        Ok(members.into_iter().collect())
    }
}

/// The confirmed node groups of one platform action.
///
/// Immutable once built; every step reads the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroups {
    managers: Vec<String>,
    workers: Vec<String>,
    kubernetes: Vec<String>,
}

impl NodeGroups {
    /// Sort both groups and derive `kubernetes` as their de-duplicated union
    pub fn new(managers: Vec<String>, workers: Vec<String>) -> Self {
        let managers = sorted_unique(managers);
        let workers = sorted_unique(workers);
        let kubernetes = sorted_unique(managers.iter().chain(workers.iter()).cloned().collect());
        Self {
            managers,
            workers,
            kubernetes,
        }
    }

    pub fn managers(&self) -> &[String] {
        &self.managers
    }

    pub fn workers(&self) -> &[String] {
        &self.workers
    }

    /// Managers and workers together
    pub fn kubernetes(&self) -> &[String] {
        &self.kubernetes
    }

    /// Groups in display order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        [
            ("managers", self.managers.as_slice()),
            ("workers", self.workers.as_slice()),
            ("kubernetes", self.kubernetes.as_slice()),
        ]
        .into_iter()
    }

    fn empty_groups(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, members)| members.is_empty())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// One `name: [a, b]` line per group
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(name, members)| format!("{}: [{}]", name, members.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn sorted_unique(hosts: Vec<String>) -> Vec<String> {
    hosts
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub const CONFIRM_QUESTION: &str = "Are the above NCN groupings correct?";
pub const CONFIRM_CHOICES: &[&str] = &["yes", "no"];

/// Look up the node groups and have the operator confirm them.
///
/// Fails without prompting if any group is empty, and fails if the operator
/// answers anything but "yes".
pub fn resolve_node_groups<I, C>(inventory: &I, confirm: &C) -> Result<NodeGroups>
where
    I: Inventory + ?Sized,
    C: Confirm + ?Sized,
{
    let managers = inventory.members_by_role(&[Role::Manager])?;
    let workers = inventory.members_by_role(&[Role::Worker])?;
    let groups = NodeGroups::new(managers, workers);

    info!("Identified NCN groups:\n{}", groups.summary());

    let empty = groups.empty_groups();
    if !empty.is_empty() {
        return Err(PlatformError::TopologyDiscovery(empty));
    }

    let prompt = format!(
        "Identified the following Non-compute Node (NCN) groups as follows.\n{}\n{}",
        groups.summary(),
        CONFIRM_QUESTION
    );
    let answer = confirm.confirm(&prompt, CONFIRM_CHOICES)?;
    if answer != "yes" {
        warn!("Operator rejected the NCN groups");
        return Err(PlatformError::ConfirmationDeclined);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests;
