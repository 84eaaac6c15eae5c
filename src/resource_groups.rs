//! Account to resource group index
//!
//! Built once per run from the resource group listing and shared read-only by
//! every fetch task.

use crate::models::{ResourceGroup, NOT_AVAILABLE};
use std::collections::HashMap;
use tracing::debug;

/// Mapping from cloud account id to the names of the groups claiming it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGroupIndex {
    accounts: HashMap<String, Vec<String>>,
}

impl ResourceGroupIndex {
    /// Build the index from a resource group listing.
    ///
    /// Only AWS groups contribute. Group names accumulate per account in
    /// first-seen order, each name at most once.
    pub fn build(groups: &[ResourceGroup]) -> Self {
        let mut accounts: HashMap<String, Vec<String>> = HashMap::new();

        for group in groups.iter().filter(|g| g.is_aws()) {
            for account in group.account_ids() {
                let names = accounts.entry(account).or_default();
                if !names.contains(&group.resource_name) {
                    names.push(group.resource_name.clone());
                }
            }
        }

        debug!(
            "Indexed {} accounts from {} resource groups",
            accounts.len(),
            groups.len()
        );

        Self { accounts }
    }

    pub fn groups_for(&self, account: &str) -> Option<&[String]> {
        self.accounts.get(account).map(Vec::as_slice)
    }

    /// Groups for an account, or the `["N/A"]` sentinel
    pub fn attribute(&self, account: &str) -> Vec<String> {
        match self.groups_for(account) {
            Some(groups) if account != NOT_AVAILABLE => groups.to_vec(),
            _ => vec![NOT_AVAILABLE.to_string()],
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
