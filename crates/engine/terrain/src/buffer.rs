//! Double-buffered tile output
//!
//! A tile publishes its built scene data through two slots. Readers (cull and
//! intersection traversals) only ever see the read slot; builders install a
//! finished node into the write slot and swap. Published nodes are immutable
//! `Arc`s, so a reader holding the previous node is unaffected by a swap.

use glam::{DMat4, DVec3};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::mesh::TerrainGeometry;
use crate::texture::TileState;

/// Geometry plus the render state it is drawn with
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGroup {
    pub geometry: TerrainGeometry,
    pub state: TileState,
}

/// Transform placing a tile's center-relative geometry in model space
#[derive(Debug, Clone, PartialEq)]
pub struct TileTransform {
    pub matrix: DMat4,
    pub center: DVec3,
}

impl TileTransform {
    pub fn from_center(center: DVec3) -> Self {
        Self {
            matrix: DMat4::from_translation(center),
            center,
        }
    }
}

/// Root of a tile's published scene data
#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    pub transform: TileTransform,
    pub group: RenderGroup,
}

impl TileNode {
    pub fn geometry(&self) -> &TerrainGeometry {
        &self.group.geometry
    }

    pub fn state(&self) -> &TileState {
        &self.group.state
    }

    /// Model-space position of vertex `index`
    pub fn model_position(&self, index: usize) -> Option<DVec3> {
        let vertex = self.group.geometry.vertices.get(index)?;
        Some(self.transform.center + vertex.as_dvec3())
    }
}

/// One of the two output slots
pub type BufferData = Option<Arc<TileNode>>;

#[derive(Debug)]
struct Slots {
    buffers: [BufferData; 2],
    read: usize,
    write: usize,
}

/// Two output slots with a read index and a write index
#[derive(Debug)]
pub struct DoubleBuffer {
    slots: RwLock<Slots>,
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DoubleBuffer {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots {
                buffers: [None, None],
                read: 1,
                write: 0,
            }),
        }
    }

    /// Node currently visible to readers
    pub fn read(&self) -> BufferData {
        let slots = self.slots.read();
        slots.buffers[slots.read].clone()
    }

    /// Deep copy of the read node, the starting point of an incremental update
    pub fn clone_read(&self) -> Option<TileNode> {
        self.read().map(|node| node.as_ref().clone())
    }

    /// Whether a node has been published yet
    pub fn has_read(&self) -> bool {
        let slots = self.slots.read();
        slots.buffers[slots.read].is_some()
    }

    /// Install a fully built node into the write slot and publish it
    pub fn commit(&self, node: TileNode) {
        let mut slots = self.slots.write();
        let write = slots.write;
        slots.buffers[write] = Some(Arc::new(node));
        Self::swap_locked(&mut slots);
    }

    /// Exchange the read and write indices
    pub fn swap(&self) {
        let mut slots = self.slots.write();
        Self::swap_locked(&mut slots);
    }

    fn swap_locked(slots: &mut Slots) {
        std::mem::swap(&mut slots.read, &mut slots.write);
        tracing::trace!(read = slots.read, write = slots.write, "Swapped tile buffers");
    }

    /// Current `(read, write)` slot indices
    pub fn indices(&self) -> (usize, usize) {
        let slots = self.slots.read();
        (slots.read, slots.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::TexCoordPlan;
    use crate::extent::Extent;
    use crate::locator::Locator;
    use crate::mesh::{generate, MeshInput};
    use crate::sampling::SamplingPlan;
    use glam::DVec2;

    fn node(center: DVec3) -> TileNode {
        let locator = Arc::new(Locator::projected(Extent::new(DVec2::ZERO, DVec2::ONE)));
        let input = MeshInput {
            master: &locator,
            center,
            elevation: None,
            plan: SamplingPlan::for_source(None, 1.0, 4),
            vertical_scale: 1.0,
        };
        TileNode {
            transform: TileTransform::from_center(center),
            group: RenderGroup {
                geometry: generate(&input, &TexCoordPlan::new(&locator, &[])),
                state: TileState::default(),
            },
        }
    }

    #[test]
    fn test_initial_state() {
        let buffer = DoubleBuffer::new();
        assert_eq!(buffer.indices(), (1, 0));
        assert!(buffer.read().is_none());
        assert!(buffer.clone_read().is_none());
        assert!(!buffer.has_read());
    }

    #[test]
    fn test_commit_publishes_and_swaps() {
        let buffer = DoubleBuffer::new();
        buffer.commit(node(DVec3::X));

        assert_eq!(buffer.indices(), (0, 1));
        let published = buffer.read().unwrap();
        assert_eq!(published.transform.center, DVec3::X);
    }

    #[test]
    fn test_reader_keeps_previous_node_across_swap() {
        let buffer = DoubleBuffer::new();
        buffer.commit(node(DVec3::X));
        let held = buffer.read().unwrap();

        buffer.commit(node(DVec3::Y));

        assert_eq!(held.transform.center, DVec3::X);
        assert_eq!(buffer.read().unwrap().transform.center, DVec3::Y);
        assert_eq!(buffer.indices(), (1, 0));
    }

    #[test]
    fn test_swap_exchanges_slots_without_writing() {
        let buffer = DoubleBuffer::new();
        buffer.swap();
        assert_eq!(buffer.indices(), (0, 1));
        assert!(!buffer.has_read());

        buffer.commit(node(DVec3::X));
        buffer.commit(node(DVec3::Y));
        assert_eq!(buffer.indices(), (0, 1));
        assert_eq!(buffer.read().unwrap().transform.center, DVec3::Y);

        // Swapping back exposes the node committed before
        buffer.swap();
        assert_eq!(buffer.indices(), (1, 0));
        assert_eq!(buffer.read().unwrap().transform.center, DVec3::X);
    }

    #[test]
    fn test_clone_read_is_independent() {
        let buffer = DoubleBuffer::new();
        buffer.commit(node(DVec3::ZERO));

        let mut copy = buffer.clone_read().unwrap();
        copy.group.geometry.vertices[0].z = 42.0;

        assert_eq!(buffer.read().unwrap().geometry().vertices[0].z, 0.0);
    }

    #[test]
    fn test_model_position_adds_center() {
        let n = node(DVec3::new(10.0, 0.0, 0.0));
        let p = n.model_position(0).unwrap();
        assert_eq!(p, DVec3::ZERO);
        assert!(n.model_position(1000).is_none());
    }
}
