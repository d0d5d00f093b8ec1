use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::EvmError;
use crate::types::CategoryId;
use crate::EvmResult;

/// A node of the product category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryId>,
}

/// Walk from `start` up to the root, returning `start` first.
///
/// The walk is bounded by `max_depth` and refuses to revisit a node, so a
/// corrupted hierarchy surfaces as `CategoryCycle` instead of looping.
pub(crate) fn ancestry(
    categories: &BTreeMap<CategoryId, ProductCategory>,
    start: CategoryId,
    max_depth: usize,
) -> EvmResult<Vec<CategoryId>> {
    let mut chain = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = Some(start);

    while let Some(id) = current {
        if !seen.insert(id) || chain.len() >= max_depth {
            return Err(EvmError::CategoryCycle { category: start.0 });
        }
        let node = categories.get(&id).ok_or_else(|| EvmError::NotFound {
            entity: "product category".into(),
            id: id.to_string(),
        })?;
        chain.push(id);
        current = node.parent;
    }

    Ok(chain)
}

/// Reject any category whose parent chain loops back on itself.
pub(crate) fn check_acyclic(categories: &BTreeMap<CategoryId, ProductCategory>) -> EvmResult<()> {
    for id in categories.keys() {
        // the number of nodes bounds any acyclic chain
        ancestry(categories, *id, categories.len().max(1))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, parent: Option<u64>) -> (CategoryId, ProductCategory) {
        (
            CategoryId(id),
            ProductCategory {
                id: CategoryId(id),
                name: format!("cat-{id}"),
                parent: parent.map(CategoryId),
            },
        )
    }

    #[test]
    fn test_ancestry_lists_self_then_parents() {
        let tree: BTreeMap<_, _> = vec![node(1, None), node(2, Some(1)), node(3, Some(2))]
            .into_iter()
            .collect();
        let chain = ancestry(&tree, CategoryId(3), 10).unwrap();
        assert_eq!(chain, vec![CategoryId(3), CategoryId(2), CategoryId(1)]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let tree: BTreeMap<_, _> = vec![node(1, Some(2)), node(2, Some(1))]
            .into_iter()
            .collect();
        assert!(matches!(
            check_acyclic(&tree),
            Err(EvmError::CategoryCycle { .. })
        ));
    }

    #[test]
    fn test_depth_limit_applies() {
        let tree: BTreeMap<_, _> = vec![node(1, None), node(2, Some(1)), node(3, Some(2))]
            .into_iter()
            .collect();
        assert!(ancestry(&tree, CategoryId(3), 2).is_err());
        assert!(ancestry(&tree, CategoryId(3), 3).is_ok());
    }
}
