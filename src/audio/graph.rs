//! Processing context: an arena of audio nodes and the edges between them.
//!
//! Nodes are addressed by generational handles, so a handle kept after
//! `release` is recognised as dead instead of aliasing a reused slot.
//! Connections into the same input port sum. Mono signals travel as a
//! `StereoSample` with both channels equal.

use tracing::debug;

use super::error::{GraphError, RoutingError};
use super::frame::StereoSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Frames from the media element enter here.
    Source,
    /// Stereo in, left on output 0 and right on output 1 (mono).
    Splitter,
    Gain(f32),
    /// Input 0 becomes the left channel, input 1 the right.
    Merger,
    Destination,
}

impl NodeKind {
    fn inputs(self) -> u8 {
        match self {
            NodeKind::Source => 0,
            NodeKind::Merger => 2,
            NodeKind::Splitter | NodeKind::Gain(_) | NodeKind::Destination => 1,
        }
    }

    fn outputs(self) -> u8 {
        match self {
            NodeKind::Destination => 0,
            NodeKind::Splitter => 2,
            NodeKind::Source | NodeKind::Gain(_) | NodeKind::Merger => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub output: u8,
    pub to: NodeId,
    pub input: u8,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<NodeKind>,
}

/// Creates processing contexts. Hosts without audio processing hand out
/// `UnavailableContext`.
pub trait ContextFactory {
    fn create(&self, sample_rate: u32) -> Result<AudioGraph, RoutingError>;
}

/// In-process software renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareContext;

impl ContextFactory for SoftwareContext {
    fn create(&self, sample_rate: u32) -> Result<AudioGraph, RoutingError> {
        Ok(AudioGraph::new(sample_rate))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableContext;

impl ContextFactory for UnavailableContext {
    fn create(&self, _sample_rate: u32) -> Result<AudioGraph, RoutingError> {
        Err(RoutingError::UnsupportedPlatform)
    }
}

#[derive(Debug)]
pub struct AudioGraph {
    sample_rate: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    edges: Vec<Edge>,

    // Render plan, rebuilt only when the topology changes
    dirty: bool,
    order: Vec<u32>,
    incoming: Vec<Vec<(u32, u8, u8)>>,
    outputs: Vec<[StereoSample; 2]>,
}

impl AudioGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            slots: Vec::new(),
            free: Vec::new(),
            edges: Vec::new(),
            dirty: true,
            order: Vec::new(),
            incoming: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.dirty = true;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(kind);
            return NodeId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, node: Some(kind) });
        NodeId { index, generation: 0 }
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.kind(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node)
    }

    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of edges entering `node`, over all of its inputs.
    pub fn incoming(&self, node: NodeId) -> usize {
        self.edges.iter().filter(|e| e.to == node).count()
    }

    pub fn connect(&mut self, from: NodeId, output: u8, to: NodeId, input: u8) -> Result<(), GraphError> {
        let from_kind = self.kind(from).ok_or(GraphError::DeadNode(from))?;
        let to_kind = self.kind(to).ok_or(GraphError::DeadNode(to))?;
        if output >= from_kind.outputs() {
            return Err(GraphError::Port { node: from, port: output });
        }
        if input >= to_kind.inputs() {
            return Err(GraphError::Port { node: to, port: input });
        }

        let edge = Edge { from, output, to, input };
        if self.edges.contains(&edge) {
            return Ok(());
        }
        if from == to || self.reaches(to, from) {
            return Err(GraphError::Cycle { from, to });
        }

        self.edges.push(edge);
        self.dirty = true;
        Ok(())
    }

    /// Remove every edge `from -> to`. Returns how many were removed.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !(e.from == from && e.to == to));
        let removed = before - self.edges.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Swap what feeds `target`: every edge `old_from -> target` is redirected
    /// to come from output 0 of `new_from`, in one step.
    pub fn replace_input(&mut self, target: NodeId, old_from: NodeId, new_from: NodeId) -> Result<(), GraphError> {
        let new_kind = self.kind(new_from).ok_or(GraphError::DeadNode(new_from))?;
        if new_kind.outputs() == 0 {
            return Err(GraphError::Port { node: new_from, port: 0 });
        }
        if !self.edges.iter().any(|e| e.from == old_from && e.to == target) {
            return Err(GraphError::MissingEdge { from: old_from, to: target });
        }
        if new_from == target || self.reaches(target, new_from) {
            return Err(GraphError::Cycle { from: new_from, to: target });
        }

        for edge in self.edges.iter_mut().filter(|e| e.from == old_from && e.to == target) {
            edge.from = new_from;
            edge.output = 0;
        }
        let mut seen: Vec<Edge> = Vec::with_capacity(self.edges.len());
        self.edges.retain(|e| {
            if seen.contains(e) {
                false
            } else {
                seen.push(*e);
                true
            }
        });
        self.dirty = true;
        Ok(())
    }

    pub fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<(), GraphError> {
        let slot = self
            .slots
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .ok_or(GraphError::DeadNode(node))?;
        match slot.node.as_mut() {
            Some(NodeKind::Gain(g)) => {
                *g = gain;
                Ok(())
            }
            Some(_) => Err(GraphError::Port { node, port: 0 }),
            None => Err(GraphError::DeadNode(node)),
        }
    }

    /// Disconnect and free one node. Releasing a dead handle is a no-op.
    pub fn release(&mut self, node: NodeId) -> bool {
        if !self.is_live(node) {
            return false;
        }
        self.edges.retain(|e| e.from != node && e.to != node);
        let slot = &mut self.slots[node.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        self.dirty = true;
        true
    }

    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        self.edges.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                released += 1;
            }
        }
        self.dirty = true;
        debug!("Released {} audio nodes", released);
        released
    }

    /// Render one block in place. Each frame enters at every `Source` and is
    /// replaced by what reaches `Destination` (silence if nothing does).
    pub fn process(&mut self, frames: &mut [StereoSample]) {
        if self.dirty {
            self.rebuild_plan();
        }

        let Self { slots, order, incoming, outputs, .. } = self;

        for frame in frames.iter_mut() {
            let entering = *frame;
            let mut sink = StereoSample::silence();

            for &index in order.iter() {
                let i = index as usize;
                let Some(kind) = slots[i].node else { continue };

                let mut inputs = [StereoSample::silence(); 2];
                for &(src, output, input) in &incoming[i] {
                    inputs[input as usize] += outputs[src as usize][output as usize];
                }

                outputs[i] = match kind {
                    NodeKind::Source => [entering, StereoSample::silence()],
                    NodeKind::Gain(g) => [inputs[0].scale(g), StereoSample::silence()],
                    NodeKind::Splitter => [
                        StereoSample::mono(inputs[0].left),
                        StereoSample::mono(inputs[0].right),
                    ],
                    NodeKind::Merger => [
                        StereoSample::new(inputs[0].downmix(), inputs[1].downmix()),
                        StereoSample::silence(),
                    ],
                    NodeKind::Destination => {
                        sink += inputs[0];
                        [StereoSample::silence(); 2]
                    }
                };
            }

            *frame = sink;
        }
    }

    fn rebuild_plan(&mut self) {
        let n = self.slots.len();
        self.incoming.iter_mut().for_each(Vec::clear);
        self.incoming.resize_with(n, Vec::new);
        self.outputs.resize(n, [StereoSample::silence(); 2]);

        let mut in_degree = vec![0_usize; n];
        for edge in &self.edges {
            let to = edge.to.index as usize;
            self.incoming[to].push((edge.from.index, edge.output, edge.input));
            in_degree[to] += 1;
        }

        // Kahn's algorithm over live nodes
        self.order.clear();
        let mut ready: Vec<u32> = (0..n as u32)
            .filter(|&i| self.slots[i as usize].node.is_some() && in_degree[i as usize] == 0)
            .collect();
        while let Some(index) = ready.pop() {
            self.order.push(index);
            for edge in self.edges.iter().filter(|e| e.from.index == index) {
                let to = edge.to.index as usize;
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    ready.push(edge.to.index);
                }
            }
        }
        self.dirty = false;
    }

    fn reaches(&self, start: NodeId, goal: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![false; self.slots.len()];
        while let Some(node) = stack.pop() {
            if node == goal {
                return true;
            }
            let i = node.index as usize;
            if std::mem::replace(&mut seen[i], true) {
                continue;
            }
            stack.extend(self.edges.iter().filter(|e| e.from == node).map(|e| e.to));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (AudioGraph, NodeId, NodeId, NodeId) {
        let mut graph = AudioGraph::new(48_000);
        let source = graph.add_node(NodeKind::Source);
        let gain = graph.add_node(NodeKind::Gain(0.5));
        let dest = graph.add_node(NodeKind::Destination);
        graph.connect(source, 0, gain, 0).unwrap();
        graph.connect(gain, 0, dest, 0).unwrap();
        (graph, source, gain, dest)
    }

    #[test]
    fn gain_chain_scales_frames() {
        let (mut graph, ..) = chain();
        let mut frames = [StereoSample::new(1.0, -0.5)];
        graph.process(&mut frames);
        assert_eq!(frames[0], StereoSample::new(0.5, -0.25));
    }

    #[test]
    fn no_path_renders_silence() {
        let (mut graph, source, gain, _) = chain();
        graph.disconnect(source, gain);
        let mut frames = [StereoSample::new(1.0, 1.0)];
        graph.process(&mut frames);
        assert_eq!(frames[0], StereoSample::silence());
    }

    #[test]
    fn released_handles_are_dead_after_slot_reuse() {
        let (mut graph, _, gain, dest) = chain();
        assert!(graph.release(gain));
        assert!(!graph.release(gain));
        assert_eq!(graph.incoming(dest), 0);

        let reused = graph.add_node(NodeKind::Gain(1.0));
        assert!(graph.is_live(reused));
        assert!(!graph.is_live(gain));
        assert_eq!(graph.connect(gain, 0, dest, 0), Err(GraphError::DeadNode(gain)));
    }

    #[test]
    fn cycles_and_bad_ports_are_rejected() {
        let (mut graph, source, gain, dest) = chain();
        let extra = graph.add_node(NodeKind::Gain(1.0));
        graph.connect(gain, 0, extra, 0).unwrap();
        assert!(matches!(graph.connect(extra, 0, gain, 0), Err(GraphError::Cycle { .. })));
        assert!(matches!(graph.connect(dest, 0, gain, 0), Err(GraphError::Port { .. })));
        assert!(matches!(graph.connect(source, 1, gain, 0), Err(GraphError::Port { .. })));
    }

    #[test]
    fn duplicate_connects_do_not_double_the_signal() {
        let (mut graph, source, gain, _) = chain();
        graph.connect(source, 0, gain, 0).unwrap();
        assert_eq!(graph.incoming(gain), 1);
    }

    #[test]
    fn replace_input_swaps_feed_in_one_step() {
        let (mut graph, source, gain, _) = chain();
        let boost = graph.add_node(NodeKind::Gain(4.0));
        graph.connect(source, 0, boost, 0).unwrap();

        graph.replace_input(gain, source, boost).unwrap();
        assert_eq!(graph.incoming(gain), 1);

        let mut frames = [StereoSample::mono(1.0)];
        graph.process(&mut frames);
        assert_eq!(frames[0], StereoSample::mono(2.0));

        assert!(matches!(
            graph.replace_input(gain, source, boost),
            Err(GraphError::MissingEdge { .. })
        ));
    }

    #[test]
    fn release_all_frees_every_node() {
        let (mut graph, ..) = chain();
        assert_eq!(graph.release_all(), 3);
        assert_eq!(graph.live_nodes(), 0);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn unavailable_context_reports_unsupported_platform() {
        assert_eq!(
            UnavailableContext.create(44_100).unwrap_err(),
            RoutingError::UnsupportedPlatform
        );
        assert!(SoftwareContext.create(44_100).is_ok());
    }
}
