use std::sync::Arc;

use anyhow::anyhow;
use winit::event::WindowEvent;
use winit::window::WindowId;

use phoenix_engine::core::{App, AppControl, FrameCtx};
use phoenix_engine::input::Key;
use phoenix_engine::paint::Color;
use phoenix_engine::render::{RenderCtx, TriangleRenderer};
use phoenix_sync::{LocalTriangles, SyncSession, Triangle, TriangleStore};

use crate::lifecycle::{CloseReason, Lifecycle, SyncBatch};

/// Background every frame is cleared to.
pub const BACKGROUND: Color = Color::from_premul(0.08, 0.08, 0.1, 1.0);

/// Fill for position-only triangles.
pub const FILL: Color = Color::from_premul(1.0, 0.5, 0.2, 1.0);

/// What one iteration has to do before drawing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FramePlan {
    pub rebuild: bool,
    pub exit: bool,
}

/// Folds this frame's sync report into the loop state.
///
/// A rebuild is owed once per frame no matter how many triangles arrived,
/// and stays owed until a frame actually performs it.
pub fn plan_frame(lifecycle: &mut Lifecycle, dirty: &mut bool, batch: SyncBatch) -> FramePlan {
    if lifecycle.absorb(batch) {
        *dirty = true;
    }

    FramePlan {
        rebuild: *dirty && lifecycle.is_running(),
        exit: !lifecycle.is_running(),
    }
}

/// The main loop: drains sync events, keeps the GPU draw set current and
/// draws it every frame.
///
/// Runs on the event loop thread. The sync session lives on the tokio
/// runtime owned here and only reaches this thread through its event queue.
pub struct Canvas {
    runtime: tokio::runtime::Runtime,
    session: Option<SyncSession>,
    store: Arc<TriangleStore>,
    local: Arc<LocalTriangles>,
    renderer: TriangleRenderer,
    lifecycle: Lifecycle,
    dirty: bool,
    fatal: Option<anyhow::Error>,
}

impl Canvas {
    pub fn new(
        runtime: tokio::runtime::Runtime,
        session: SyncSession,
        store: Arc<TriangleStore>,
        local: Arc<LocalTriangles>,
        renderer: TriangleRenderer,
    ) -> Self {
        Self {
            runtime,
            session: Some(session),
            store,
            local,
            renderer,
            lifecycle: Lifecycle::default(),
            // The first frame builds whatever the store was seeded with.
            dirty: true,
            fatal: None,
        }
    }

    /// Authors one more local triangle, shows it and sends it right away.
    fn author_triangle(&mut self) {
        let triangle = Triangle::random(&mut rand::thread_rng(), self.store.stride());
        if !self.local.author(triangle.clone()) {
            return;
        }
        if self.store.merge_if_new(triangle.clone()) {
            self.dirty = true;
        }
        log::info!("authored local triangle #{}", self.local.len());

        if let Some(session) = self.session.as_ref() {
            if let Err(err) = session.publish(&triangle) {
                self.lifecycle.fail(err);
            }
        }
    }

    fn rebuild(&mut self, rctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        self.renderer.prepare(rctx)?;
        let snapshot = self.store.snapshot();
        self.renderer.rebuild(rctx, &snapshot)?;
        self.dirty = false;
        Ok(())
    }

    fn gpu_failure(&mut self, err: anyhow::Error) -> AppControl {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.lifecycle.close(CloseReason::GpuFailure);
        AppControl::Exit
    }
}

impl App for Canvas {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::CloseRequested = event {
            self.lifecycle.close(CloseReason::WindowClosed);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.lifecycle.is_running() {
            return AppControl::Exit;
        }

        if ctx.input_frame.pressed(Key::Escape) {
            self.lifecycle.close(CloseReason::ExitKey);
            return AppControl::Exit;
        }
        if ctx.input_frame.pressed(Key::N) {
            self.author_triangle();
        }

        let batch = match self.session.as_ref() {
            Some(session) => SyncBatch::collect(session.events()),
            None => SyncBatch::default(),
        };

        let plan = plan_frame(&mut self.lifecycle, &mut self.dirty, batch);
        if plan.exit {
            return AppControl::Exit;
        }

        if plan.rebuild {
            let result = {
                let rctx = ctx.render_ctx();
                self.rebuild(&rctx)
            };
            if let Err(err) = result {
                return self.gpu_failure(err.context("rebuilding the triangle draw set"));
            }
        }

        if let Some(fps) = ctx.fps {
            log::debug!(
                "frame {}: {} triangle(s) in {} buffer(s), {fps:.0} fps",
                ctx.time.frame_index,
                self.store.len(),
                self.renderer.mesh_count()
            );
        }

        let renderer = &self.renderer;
        let control = ctx.render(BACKGROUND, |_rctx, target| renderer.render(target));
        if control == AppControl::Exit {
            return self.gpu_failure(anyhow!("surface lost beyond recovery"));
        }
        control
    }

    fn on_exit(&mut self) -> anyhow::Result<()> {
        if let Some(session) = self.session.take() {
            self.runtime.block_on(session.shutdown());
        }
        self.renderer.release();
        self.lifecycle.stop();
        match self.lifecycle.reason() {
            Some(reason) => log::info!(
                "main loop {:?} after {reason:?} with {} triangle(s) known",
                self.lifecycle.state(),
                self.store.len()
            ),
            None => log::info!(
                "main loop {:?} without a close request",
                self.lifecycle.state()
            ),
        }

        if let Some(err) = self.fatal.take() {
            return Err(err);
        }
        if let Some(err) = self.lifecycle.take_failure() {
            return Err(anyhow::Error::new(err).context("hub connection lost"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_engine::render::{GpuResourceError, MeshAllocator, MeshSet, VertexFormat};
    use phoenix_sync::{ConnectionError, Direction, GeometryCodec, SessionEvent, Stride};

    use crate::lifecycle::LoopState;

    const STRIDE: Stride = Stride::PositionColor;

    #[derive(Default)]
    struct CountingAllocator {
        allocated: usize,
    }

    impl MeshAllocator for CountingAllocator {
        type Mesh = usize;

        fn allocate(&mut self, _index: usize, vertices: &[f32]) -> Result<usize, GpuResourceError> {
            self.allocated += 1;
            Ok(vertices.len() / STRIDE.floats())
        }
    }

    fn tri(x: f32) -> Triangle {
        Triangle::new(
            vec![x, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, x, 0.0, 0.0, 1.0, 0.0, -x, -x, 0.0, 0.0, 0.0, 1.0],
            STRIDE,
        )
        .unwrap()
    }

    /// Drives the loop one frame per inbound payload, the way the drain task
    /// and `on_frame` split the work.
    struct Harness {
        store: TriangleStore,
        codec: GeometryCodec,
        lifecycle: Lifecycle,
        dirty: bool,
        meshes: MeshSet<usize>,
        alloc: CountingAllocator,
    }

    impl Harness {
        fn seeded(local: Triangle) -> Self {
            let mut h = Self {
                store: TriangleStore::seeded(STRIDE, local),
                codec: GeometryCodec::new(STRIDE),
                lifecycle: Lifecycle::default(),
                dirty: true,
                meshes: MeshSet::new(VertexFormat::PositionColor),
                alloc: CountingAllocator::default(),
            };
            // Startup frame.
            h.frame(Vec::new());
            h
        }

        fn frame(&mut self, events: Vec<SessionEvent>) -> FramePlan {
            let plan = plan_frame(&mut self.lifecycle, &mut self.dirty, SyncBatch::collect(events));
            if plan.rebuild {
                self.meshes
                    .rebuild(&mut self.alloc, &self.store.snapshot())
                    .unwrap();
                self.dirty = false;
            }
            plan
        }

        fn receive(&mut self, payload: &[u8]) -> FramePlan {
            let mut events = Vec::new();
            if let Ok(t) = self.codec.decode(payload) {
                if self.store.merge_if_new(t) {
                    events.push(SessionEvent::StoreChanged);
                }
            }
            self.frame(events)
        }

        fn receive_triangle(&mut self, t: &Triangle) -> FramePlan {
            let payload = self.codec.encode(t).unwrap();
            self.receive(payload.as_bytes())
        }
    }

    #[test]
    fn duplicates_do_not_trigger_rebuilds() {
        let (a, b, c) = (tri(0.1), tri(0.2), tri(0.3));
        let mut h = Harness::seeded(a.clone());
        let startup = h.meshes.rebuild_count();

        let rebuilds = [&a, &b, &b, &c]
            .into_iter()
            .filter(|t| h.receive_triangle(t).rebuild)
            .count();

        assert_eq!(rebuilds, 2);
        assert_eq!(h.meshes.rebuild_count() - startup, 2);
        assert_eq!(h.store.snapshot(), vec![a, b, c]);
        assert_eq!(h.meshes.len(), 3);
        assert!(h.meshes.iter().all(|&vertices| vertices == 3));
    }

    #[test]
    fn malformed_payload_is_neither_stored_nor_rebuilt() {
        let (a, b, c) = (tri(0.1), tri(0.2), tri(0.3));
        let mut h = Harness::seeded(a.clone());

        assert!(h.receive_triangle(&b).rebuild);
        assert!(!h.receive(b"[1,2,3,4,5,6,7]").rebuild);
        assert!(h.receive_triangle(&c).rebuild);

        assert_eq!(h.store.snapshot(), vec![a, b, c]);
        assert_eq!(h.meshes.len(), 3);
    }

    #[test]
    fn several_appends_in_one_frame_rebuild_once() {
        let mut h = Harness::seeded(tri(0.1));
        let before = h.meshes.rebuild_count();

        for x in [0.2, 0.3, 0.4] {
            assert!(h.store.merge_if_new(tri(x)));
        }
        let plan = h.frame((0..3).map(|_| SessionEvent::StoreChanged).collect());

        assert!(plan.rebuild);
        assert_eq!(h.meshes.rebuild_count() - before, 1);
        assert_eq!(h.meshes.len(), 4);
    }

    #[test]
    fn connection_loss_ends_the_loop_without_rebuilding() {
        let mut h = Harness::seeded(tri(0.1));

        let plan = h.frame(vec![SessionEvent::Failed(ConnectionError::ClosedByPeer {
            direction: Direction::Read,
        })]);

        assert_eq!(plan, FramePlan { rebuild: false, exit: true });
        assert_eq!(h.lifecycle.state(), LoopState::Closing);
    }

    #[test]
    fn quiet_frames_do_nothing() {
        let mut h = Harness::seeded(tri(0.1));
        let before = h.meshes.rebuild_count();

        for _ in 0..5 {
            assert_eq!(h.frame(Vec::new()), FramePlan { rebuild: false, exit: false });
        }
        assert_eq!(h.meshes.rebuild_count(), before);
        assert_eq!(h.alloc.allocated, 1);
    }
}
