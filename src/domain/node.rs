//! Reseller hierarchy nodes.

use super::{NodeId, Percent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of a node in the reseller hierarchy, top-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Admin,
    Comercializadora,
    Subdistribuidor,
    Agencia,
    Taquilla,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Admin => "admin",
            NodeKind::Comercializadora => "comercializadora",
            NodeKind::Subdistribuidor => "subdistribuidor",
            NodeKind::Agencia => "agencia",
            NodeKind::Taquilla => "taquilla",
        }
    }

    /// Point-of-sale outlets are the only nodes that own raw facts.
    pub fn is_point_of_sale(&self) -> bool {
        matches!(self, NodeKind::Taquilla)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(NodeKind::Admin),
            "comercializadora" => Ok(NodeKind::Comercializadora),
            "subdistribuidor" => Ok(NodeKind::Subdistribuidor),
            "agencia" => Ok(NodeKind::Agencia),
            "taquilla" => Ok(NodeKind::Taquilla),
            other => Err(format!("unknown node kind: {}", other)),
        }
    }
}

/// One node of the reseller tree as the fact store lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellerNode {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    /// `None` for the admin root (and for top-level comercializadoras with no admin node).
    pub parent_id: Option<NodeId>,
    /// `None` means the node takes no cut at all.
    pub share_on_sales: Option<Percent>,
    pub share_on_profits: Option<Percent>,
    pub is_active: bool,
}

impl ResellerNode {
    pub fn new(id: NodeId, kind: NodeKind, parent_id: Option<NodeId>) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            parent_id,
            share_on_sales: None,
            share_on_profits: None,
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_shares(mut self, on_sales: Percent, on_profits: Percent) -> Self {
        self.share_on_sales = Some(on_sales);
        self.share_on_profits = Some(on_profits);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
