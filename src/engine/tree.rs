//! Adjacency view of the reseller hierarchy, built once per request.
//!
//! The node list comes from an external collaborator and may contain dangling
//! parent references or parent cycles. Both are repaired here so the result is
//! always a forest: dangling nodes become roots, and each cycle is cut at the
//! first member in listing order, which then becomes a root.

use crate::domain::{NodeId, NodeKind, ResellerNode};
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ResellerTree {
    nodes: HashMap<NodeId, ResellerNode>,
    order: Vec<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
    detached: Vec<NodeId>,
}

impl ResellerTree {
    pub fn build(list: Vec<ResellerNode>) -> Self {
        let mut tree = ResellerTree::default();

        for node in list {
            if tree.nodes.contains_key(&node.id) {
                warn!("Duplicate reseller node {} ignored", node.id);
                continue;
            }
            tree.order.push(node.id);
            tree.nodes.insert(node.id, node);
        }

        for id in &tree.order {
            let node = &tree.nodes[id];
            match node.parent_id {
                None => tree.roots.push(*id),
                Some(parent) if parent == *id => {
                    warn!("Reseller node {} is its own parent; treating as root", id);
                    tree.roots.push(*id);
                    tree.detached.push(*id);
                }
                Some(parent) if tree.nodes.contains_key(&parent) => {
                    tree.children.entry(parent).or_default().push(*id);
                }
                Some(parent) => {
                    warn!(
                        "Reseller node {} references missing parent {}; treating as root",
                        id, parent
                    );
                    tree.roots.push(*id);
                    tree.detached.push(*id);
                }
            }
        }

        tree.break_cycles();
        tree
    }

    /// Nodes not reachable from any root sit on a parent cycle.
    fn break_cycles(&mut self) {
        let mut reached: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for root in self.roots.clone() {
            self.mark_reachable(root, &mut reached);
        }

        for id in self.order.clone() {
            if reached.contains(&id) {
                continue;
            }
            let parent = self.nodes[&id].parent_id;
            if let Some(parent) = parent {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|c| *c != id);
                }
            }
            warn!("Reseller node {} is on a parent cycle; treating as root", id);
            self.roots.push(id);
            self.detached.push(id);
            self.mark_reachable(id, &mut reached);
        }
    }

    fn mark_reachable(&self, from: NodeId, reached: &mut HashSet<NodeId>) {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if reached.insert(id) {
                stack.extend(self.children(&id).iter().copied());
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&ResellerNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children in listing order.
    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes promoted to roots because of a dangling or cyclic parent reference.
    pub fn detached(&self) -> &[NodeId] {
        &self.detached
    }

    /// Entities an admin sees at the top: children of admin nodes and every
    /// other root (including repaired ones, so no subtree is left out).
    pub fn top_level(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for root in &self.roots {
            match self.nodes[root].kind {
                NodeKind::Admin => out.extend(self.children(root).iter().copied()),
                _ => out.push(*root),
            }
        }
        out
    }

    /// Subtree of `root` with every node after all of its descendants.
    pub fn post_order(&self, root: &NodeId) -> Vec<NodeId> {
        if !self.contains(root) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![(*root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(&id).iter().rev() {
                stack.push((*child, false));
            }
        }
        out
    }

    /// Point-of-sale nodes in the subtree of `root` (including `root` itself).
    pub fn taquillas_under(&self, root: &NodeId) -> Vec<NodeId> {
        self.post_order(root)
            .into_iter()
            .filter(|id| self.nodes[id].kind.is_point_of_sale())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind, parent: Option<NodeId>) -> ResellerNode {
        ResellerNode::new(NodeId::random(), kind, parent)
    }

    #[test]
    fn test_children_in_listing_order() {
        let agency = node(NodeKind::Agencia, None);
        let t1 = node(NodeKind::Taquilla, Some(agency.id));
        let t2 = node(NodeKind::Taquilla, Some(agency.id));
        let tree = ResellerTree::build(vec![t2.clone(), agency.clone(), t1.clone()]);

        assert_eq!(tree.children(&agency.id), &[t2.id, t1.id]);
        assert_eq!(tree.roots(), &[agency.id]);
        assert!(tree.detached().is_empty());
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let orphan = node(NodeKind::Agencia, Some(NodeId::random()));
        let taq = node(NodeKind::Taquilla, Some(orphan.id));
        let tree = ResellerTree::build(vec![orphan.clone(), taq.clone()]);

        assert_eq!(tree.roots(), &[orphan.id]);
        assert_eq!(tree.detached(), &[orphan.id]);
        assert_eq!(tree.taquillas_under(&orphan.id), vec![taq.id]);
    }

    #[test]
    fn test_cycle_is_cut_into_a_root() {
        let mut a = node(NodeKind::Agencia, None);
        let b = node(NodeKind::Agencia, Some(a.id));
        a.parent_id = Some(b.id);
        let t = node(NodeKind::Taquilla, Some(b.id));
        let tree = ResellerTree::build(vec![a.clone(), b.clone(), t.clone()]);

        assert_eq!(tree.roots(), &[a.id]);
        assert_eq!(tree.children(&b.id), &[t.id]);
        assert_eq!(tree.post_order(&a.id), vec![t.id, b.id, a.id]);
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let mut a = node(NodeKind::Taquilla, None);
        a.parent_id = Some(a.id);
        let tree = ResellerTree::build(vec![a.clone()]);
        assert_eq!(tree.roots(), &[a.id]);
        assert_eq!(tree.post_order(&a.id), vec![a.id]);
    }

    #[test]
    fn test_post_order_children_before_parent() {
        let com = node(NodeKind::Comercializadora, None);
        let sub = node(NodeKind::Subdistribuidor, Some(com.id));
        let ag = node(NodeKind::Agencia, Some(sub.id));
        let t1 = node(NodeKind::Taquilla, Some(ag.id));
        let t2 = node(NodeKind::Taquilla, Some(sub.id));
        let tree = ResellerTree::build(vec![
            com.clone(),
            sub.clone(),
            ag.clone(),
            t1.clone(),
            t2.clone(),
        ]);

        let order = tree.post_order(&com.id);
        assert_eq!(order, vec![t1.id, ag.id, t2.id, sub.id, com.id]);
        assert_eq!(tree.taquillas_under(&com.id), vec![t1.id, t2.id]);
        assert!(tree.post_order(&NodeId::random()).is_empty());
    }

    #[test]
    fn test_top_level_unwraps_admin_and_keeps_orphans() {
        let admin = node(NodeKind::Admin, None);
        let com = node(NodeKind::Comercializadora, Some(admin.id));
        let loose = node(NodeKind::Comercializadora, None);
        let orphan = node(NodeKind::Taquilla, Some(NodeId::random()));
        let tree = ResellerTree::build(vec![
            admin.clone(),
            com.clone(),
            loose.clone(),
            orphan.clone(),
        ]);
        assert_eq!(tree.top_level(), vec![com.id, loose.id, orphan.id]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let first = node(NodeKind::Taquilla, None).with_name("first");
        let mut dup = first.clone();
        dup.name = "second".to_string();
        let tree = ResellerTree::build(vec![first.clone(), dup]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&first.id).unwrap().name, "first");
    }
}
