//! Audio Routing Engine.
//!
//! Owns the processing graph bound to one media element and switches it
//! between the plain path and the karaoke (centre-cancelling) path:
//!
//! ```text
//! NORMAL:   Source ──────────────────────────────────────► Volume ─► Destination
//! KARAOKE:  Source ─► Splitter ─L─────────────► Merger ─► Volume ─► Destination
//!                              └R─► Inverter ─┘ (L-R on both channels)
//! ```
//!
//! The volume node is built once and shared by both paths. A switch
//! redirects its single feed in one `replace_input` call, so no render block
//! sees both paths or neither.
//!
//! Karaoke mode cancels everything mixed identically into both channels.
//! That is usually the lead vocal, but centred bass and kick drum are
//! attenuated too.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::RoutingError;
use super::frame::StereoSample;
use super::graph::{AudioGraph, ContextFactory, NodeId, NodeKind};
use super::media::{MediaElement, MediaId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoutingMode {
    #[default]
    Normal,
    Karaoke,
}

impl RoutingMode {
    pub fn toggled(self) -> Self {
        match self {
            RoutingMode::Normal => RoutingMode::Karaoke,
            RoutingMode::Karaoke => RoutingMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Unchanged,
    Switched { from: RoutingMode, to: RoutingMode },
    /// No processing graph: the caller should show karaoke as unavailable.
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
struct KaraokeChain {
    splitter: NodeId,
    inverter: NodeId,
    merger: NodeId,
}

#[derive(Debug)]
struct GraphPath {
    graph: AudioGraph,
    source: NodeId,
    volume: NodeId,
    destination: NodeId,
    karaoke: Option<KaraokeChain>,
}

impl GraphPath {
    fn build(mut graph: AudioGraph, volume: f32) -> Result<Self, RoutingError> {
        let source = graph.add_node(NodeKind::Source);
        let volume_node = graph.add_node(NodeKind::Gain(volume));
        let destination = graph.add_node(NodeKind::Destination);
        graph.connect(source, 0, volume_node, 0)?;
        graph.connect(volume_node, 0, destination, 0)?;
        Ok(Self {
            graph,
            source,
            volume: volume_node,
            destination,
            karaoke: None,
        })
    }

    fn enter_karaoke(&mut self) -> Result<(), RoutingError> {
        let graph = &mut self.graph;
        let chain = KaraokeChain {
            splitter: graph.add_node(NodeKind::Splitter),
            inverter: graph.add_node(NodeKind::Gain(-1.0)),
            merger: graph.add_node(NodeKind::Merger),
        };

        let wired = (|| {
            graph.connect(self.source, 0, chain.splitter, 0)?;
            graph.connect(chain.splitter, 0, chain.merger, 0)?;
            graph.connect(chain.splitter, 0, chain.merger, 1)?;
            graph.connect(chain.splitter, 1, chain.inverter, 0)?;
            graph.connect(chain.inverter, 0, chain.merger, 0)?;
            graph.connect(chain.inverter, 0, chain.merger, 1)?;
            graph.replace_input(self.volume, self.source, chain.merger)
        })();

        if let Err(e) = wired {
            // Old path is still the one feeding the volume node
            for node in [chain.splitter, chain.inverter, chain.merger] {
                graph.release(node);
            }
            return Err(e.into());
        }

        self.karaoke = Some(chain);
        Ok(())
    }

    fn leave_karaoke(&mut self) -> Result<(), RoutingError> {
        let Some(chain) = self.karaoke else { return Ok(()) };
        self.graph.replace_input(self.volume, chain.merger, self.source)?;
        for node in [chain.splitter, chain.inverter, chain.merger] {
            self.graph.release(node);
        }
        self.karaoke = None;
        Ok(())
    }
}

#[derive(Debug)]
enum Binding {
    Unattached,
    Graph { media: MediaId, path: GraphPath },
    /// No processing context; the media element plays untouched.
    Native { media: MediaId },
    Released,
}

#[derive(Debug)]
pub struct AudioRouter {
    binding: Binding,
    mode: RoutingMode,
    volume: f32,
}

impl Default for AudioRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioRouter {
    pub fn new() -> Self {
        Self {
            binding: Binding::Unattached,
            mode: RoutingMode::Normal,
            volume: 1.0,
        }
    }

    pub fn with_volume(volume: f32) -> Self {
        let mut router = Self::new();
        router.volume = clamp_volume(volume);
        router
    }

    /// Bind to `media` and build the NORMAL path. Allowed once per router.
    ///
    /// `Err(UnsupportedPlatform)` still leaves the router usable: playback
    /// falls back to the native stream and karaoke reports `Unavailable`.
    pub fn attach(&mut self, media: &MediaElement, factory: &dyn ContextFactory) -> Result<(), RoutingError> {
        if !matches!(self.binding, Binding::Unattached) {
            return Err(RoutingError::AlreadyAttached);
        }

        let built = factory
            .create(media.sample_rate())
            .and_then(|graph| GraphPath::build(graph, self.volume));

        match built {
            Ok(path) => {
                info!("Audio graph attached to {:?} @ {}Hz", media.id(), media.sample_rate());
                self.binding = Binding::Graph { media: media.id(), path };
                self.mode = RoutingMode::Normal;
                Ok(())
            }
            Err(e) => {
                warn!("Audio processing unavailable ({}); using native playback", e);
                self.binding = Binding::Native { media: media.id() };
                self.mode = RoutingMode::Normal;
                Err(e)
            }
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.binding, Binding::Native { .. })
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.binding, Binding::Graph { .. } | Binding::Native { .. })
    }

    pub fn bound_media(&self) -> Option<MediaId> {
        match &self.binding {
            Binding::Graph { media, .. } | Binding::Native { media } => Some(*media),
            Binding::Unattached | Binding::Released => None,
        }
    }

    /// Switch paths. Same mode is a no-op; a failed switch leaves the
    /// previous path connected.
    pub fn set_mode(&mut self, mode: RoutingMode) -> Result<ModeChange, RoutingError> {
        if mode == self.mode {
            return Ok(ModeChange::Unchanged);
        }
        let Binding::Graph { path, .. } = &mut self.binding else {
            return Ok(ModeChange::Unavailable);
        };

        match mode {
            RoutingMode::Karaoke => path.enter_karaoke()?,
            RoutingMode::Normal => path.leave_karaoke()?,
        }

        let from = std::mem::replace(&mut self.mode, mode);
        debug!("Routing switched {:?} -> {:?}", from, mode);
        Ok(ModeChange::Switched { from, to: mode })
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        if let Binding::Graph { path, .. } = &mut self.binding {
            if let Err(e) = path.graph.set_gain(path.volume, self.volume) {
                warn!("Volume update failed: {}", e);
            }
        }
    }

    /// Pull the next block from `media` and run it through the current path.
    pub fn render(&mut self, media: &mut MediaElement, out: &mut [StereoSample]) {
        media.read_frames(out);
        match &mut self.binding {
            Binding::Graph { media: bound, path } if *bound == media.id() => path.graph.process(out),
            Binding::Released => out.fill(StereoSample::silence()),
            _ => {
                for frame in out.iter_mut() {
                    *frame = frame.scale(self.volume);
                }
            }
        }
    }

    /// Chains from the media source to the output. Exactly 1 while
    /// attached.
    pub fn output_paths(&self) -> usize {
        match &self.binding {
            Binding::Graph { path, .. } => {
                path.graph.incoming(path.volume) * path.graph.incoming(path.destination)
            }
            Binding::Native { .. } | Binding::Unattached => 1,
            Binding::Released => 0,
        }
    }

    pub fn live_nodes(&self) -> usize {
        match &self.binding {
            Binding::Graph { path, .. } => path.graph.live_nodes(),
            _ => 0,
        }
    }

    /// Tear down every node. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Binding::Graph { mut path, media } = std::mem::replace(&mut self.binding, Binding::Released) {
            let released = path.graph.release_all();
            info!("Audio graph for {:?} released ({} nodes)", media, released);
        }
        self.mode = RoutingMode::Normal;
    }
}

impl Drop for AudioRouter {
    fn drop(&mut self) {
        self.release();
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        1.0
    }
}
