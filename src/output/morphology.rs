//! SWC morphology export and parsing
//!
//! One file per cell. Each line is `label type x y z radius parent`; the soma
//! is node 1 with parent -1, and every neurite segment contributes the node at
//! its distal tip. Coordinates are relative to the soma centre and labels come
//! from a depth-first walk of the tree.

use std::fmt;
use std::io::{self, Write};

use glam::DVec3;

use crate::core::error::{MosaicError, Result};
use crate::core::types::AgentId;
use crate::ecs::world::World;

/// SWC structure identifier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Soma,
    /// Segment with daughters
    Branch,
    /// Growing tip
    Terminal,
}

impl NodeType {
    pub fn code(self) -> i32 {
        match self {
            NodeType::Soma => 1,
            NodeType::Branch => 3,
            NodeType::Terminal => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(NodeType::Soma),
            3 => Some(NodeType::Branch),
            6 => Some(NodeType::Terminal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwcNode {
    pub label: u32,
    pub node_type: NodeType,
    pub position: DVec3,
    pub radius: f64,
    /// Label of the parent node, -1 for the root
    pub parent: i64,
}

impl fmt::Display for SwcNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.label,
            self.node_type.code(),
            self.position.x,
            self.position.y,
            self.position.z,
            self.radius,
            self.parent
        )
    }
}

/// Depth-first node list of one soma's tree, or `None` if `soma` is not a living soma
pub fn soma_morphology(world: &World, soma: AgentId) -> Option<Vec<SwcNode>> {
    let cell = world.soma(soma)?;
    let origin = cell.position;
    let mut nodes = vec![SwcNode {
        label: 1,
        node_type: NodeType::Soma,
        position: DVec3::ZERO,
        radius: cell.radius(),
        parent: -1,
    }];

    let mut label = 1u32;
    let mut stack: Vec<(AgentId, u32)> = cell.neurites.iter().rev().map(|&id| (id, 1)).collect();
    while let Some((id, parent_label)) = stack.pop() {
        let Some(segment) = world.neurite(id) else {
            tracing::warn!("Segment {} of soma {} is missing", id, soma);
            continue;
        };
        label += 1;
        nodes.push(SwcNode {
            label,
            node_type: if segment.is_terminal() {
                NodeType::Terminal
            } else {
                NodeType::Branch
            },
            position: segment.position - origin,
            radius: segment.diameter / 2.0,
            parent: i64::from(parent_label),
        });
        stack.extend(segment.daughters.iter().rev().map(|&d| (d, label)));
    }
    Some(nodes)
}

pub fn write_swc<W: Write>(out: &mut W, nodes: &[SwcNode]) -> io::Result<()> {
    for node in nodes {
        writeln!(out, "{}", node)?;
    }
    Ok(())
}

/// Parse SWC text back into nodes; `#` comments and blank lines are skipped
pub fn parse_swc(text: &str) -> Result<Vec<SwcNode>> {
    let mut nodes = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_error = |reason: String| MosaicError::MorphologyParse { line: i + 1, reason };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(parse_error(format!("expected 7 fields, found {}", fields.len())));
        }
        let number = |k: usize| -> Result<f64> {
            fields[k]
                .parse::<f64>()
                .map_err(|e| parse_error(format!("field {} '{}': {}", k + 1, fields[k], e)))
        };

        let label = fields[0]
            .parse::<u32>()
            .map_err(|e| parse_error(format!("label '{}': {}", fields[0], e)))?;
        let code = fields[1]
            .parse::<i32>()
            .map_err(|e| parse_error(format!("type '{}': {}", fields[1], e)))?;
        let node_type = NodeType::from_code(code)
            .ok_or_else(|| parse_error(format!("unknown node type {}", code)))?;
        let parent = fields[6]
            .parse::<i64>()
            .map_err(|e| parse_error(format!("parent '{}': {}", fields[6], e)))?;

        nodes.push(SwcNode {
            label,
            node_type,
            position: DVec3::new(number(2)?, number(3)?, number(4)?),
            radius: number(5)?,
            parent,
        });
    }
    Ok(nodes)
}
