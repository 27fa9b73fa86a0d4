use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glvk_command::CommandBuffer;
use glvk_core::memory::PendingUpload;
use glvk_core::Device;
use tracing::debug;

use crate::backend::{GlBackend, TextureRegion};
use crate::context::{ContextLock, GlContext};
use crate::engine::{ReplayEngine, ReplayStats};
use crate::error::ReplayError;

/// Submits finished command buffers to a context, one at a time.
pub struct Queue {
    device: Arc<Device>,
    engine: ReplayEngine,
    submissions: AtomicU64,
}

impl Queue {
    pub fn new(device: Arc<Device>) -> Self {
        let engine = ReplayEngine::new(&device.config().replay);
        Self {
            device,
            engine,
            submissions: AtomicU64::new(0),
        }
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    /// Replay `cmd` on `context`: retired vertex arrays are deleted and
    /// pending memory uploads applied first, then the main stream runs,
    /// then the after-submit stream.
    pub fn submit<B: GlBackend>(
        &self,
        cmd: &CommandBuffer,
        context: &GlContext<B>,
    ) -> Result<ReplayStats, ReplayError> {
        cmd.acquire_for_submit()?;
        let mut ctx = context.lock();

        let mut stats = match self.prepare(&mut ctx) {
            Ok(stats) => stats,
            Err(err) => {
                cmd.release_submit();
                return Err(err);
            }
        };
        stats += self
            .engine
            .replay(cmd.stream(), cmd.resources(), &mut ctx)?;
        stats += self
            .engine
            .replay(cmd.after_stream(), cmd.resources(), &mut ctx)?;
        stats.calls = ctx.calls();

        let submission = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            submission,
            buffer = cmd.handle().id,
            records = stats.records,
            calls = stats.calls,
            vaos_created = stats.vaos_created,
            "submitted"
        );
        Ok(stats)
    }

    /// Submit several buffers in order under one context lock. Every
    /// buffer is checked before any is claimed, and a failed claim
    /// releases the ones taken before it.
    pub fn submit_all<B: GlBackend>(
        &self,
        cmds: &[&CommandBuffer],
        context: &GlContext<B>,
    ) -> Result<ReplayStats, ReplayError> {
        for cmd in cmds {
            cmd.check_submit()?;
        }
        for (i, cmd) in cmds.iter().enumerate() {
            if let Err(err) = cmd.acquire_for_submit() {
                cmds[..i].iter().for_each(|c| c.release_submit());
                return Err(err.into());
            }
        }
        let mut ctx = context.lock();
        let mut stats = match self.prepare(&mut ctx) {
            Ok(stats) => stats,
            Err(err) => {
                cmds.iter().for_each(|c| c.release_submit());
                return Err(err);
            }
        };
        for cmd in cmds {
            stats += self
                .engine
                .replay(cmd.stream(), cmd.resources(), &mut ctx)?;
            stats += self
                .engine
                .replay(cmd.after_stream(), cmd.resources(), &mut ctx)?;
        }
        stats.calls = ctx.calls();
        self.submissions
            .fetch_add(cmds.len() as u64, Ordering::Relaxed);
        Ok(stats)
    }

    /// Delete retired vertex arrays and apply pending uploads. Uploads
    /// not yet applied when one fails go back to the device.
    fn prepare<B: GlBackend>(&self, ctx: &mut ContextLock<'_, B>) -> Result<ReplayStats, ReplayError> {
        let mut stats = ReplayStats::default();

        let cache = self.device.geometry_cache();
        cache.evict_destroyed();
        for vao in cache.take_retired() {
            ctx.gl().delete_vertex_array(vao);
            stats.vaos_deleted += 1;
        }

        let mut uploads = self.device.take_pending_uploads().into_iter();
        while let Some(upload) = uploads.next() {
            if let Err(err) = apply_upload(ctx, &upload) {
                let mut rest = vec![upload];
                rest.extend(uploads);
                self.device.requeue_uploads(rest);
                return Err(err);
            }
            stats.uploads += 1;
        }
        Ok(stats)
    }
}

fn apply_upload<B: GlBackend>(
    ctx: &mut ContextLock<'_, B>,
    upload: &PendingUpload,
) -> Result<(), ReplayError> {
    match upload {
        PendingUpload::Buffer {
            buffer,
            offset,
            data,
        } => ctx.gl().buffer_sub_data(*buffer, *offset, data)?,
        PendingUpload::Image {
            texture,
            target,
            level,
            layer,
            width,
            height,
            depth,
            format,
            ty,
            data,
        } => ctx.gl().texture_sub_image(
            &TextureRegion {
                texture: *texture,
                target: *target,
                level: *level,
                layer: *layer,
                width: *width,
                height: *height,
                depth: *depth,
                format: *format,
                ty: *ty,
            },
            data,
        ),
    }
    Ok(())
}
