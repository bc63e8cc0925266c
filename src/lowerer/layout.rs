use crate::document::{LayoutKind, Node, Position};

const RANK_SPACING: f64 = 120.0;
const COLUMN_SPACING: f64 = 220.0;

/// Assigns placeholder positions. Real geometry is left to the UI's layout engine.
pub trait LayoutStrategy: Send + Sync {
    fn kind(&self) -> LayoutKind;
    fn place(&self, nodes: &mut [Node]);
}

/// Stacks nodes top to bottom in emission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagreLayout;

impl LayoutStrategy for DagreLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Dagre
    }

    fn place(&self, nodes: &mut [Node]) {
        for (i, node) in nodes.iter_mut().enumerate() {
            node.position = Some(Position {
                x: 0.0,
                y: i as f64 * RANK_SPACING,
            });
        }
    }
}

/// Lines nodes up left to right in emission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElkLayout;

impl LayoutStrategy for ElkLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Elk
    }

    fn place(&self, nodes: &mut [Node]) {
        for (i, node) in nodes.iter_mut().enumerate() {
            node.position = Some(Position {
                x: i as f64 * COLUMN_SPACING,
                y: 0.0,
            });
        }
    }
}

/// Leaves positions to the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualLayout;

impl LayoutStrategy for ManualLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Manual
    }

    fn place(&self, _nodes: &mut [Node]) {}
}

pub fn strategy_for(kind: LayoutKind) -> Box<dyn LayoutStrategy> {
    match kind {
        LayoutKind::Dagre => Box::new(DagreLayout),
        LayoutKind::Elk => Box::new(ElkLayout),
        LayoutKind::Manual => Box::new(ManualLayout),
    }
}
