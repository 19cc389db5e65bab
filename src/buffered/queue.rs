use std::collections::VecDeque;

use crate::foundation::core::{Region, Rgba8Premul};
use crate::render::backend::{DrawImageOptions, DrawTrianglesOptions, ShaderId};
use crate::session::graphics::{ImageId, Uniform};

/// A mutating call captured before the first frame.
///
/// Every buffer argument is an owned copy taken at capture time, so later caller-side mutation
/// cannot leak into the replay.
#[derive(Clone, Debug, PartialEq)]
pub enum DeferredCommand {
    /// Allocate the texture backing a reserved image.
    CreateImage {
        /// Reserved image.
        image: ImageId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Volatile hint.
        volatile: bool,
    },
    /// Allocate the screen target backing a reserved image.
    CreateScreenImage {
        /// Reserved image.
        image: ImageId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// `Graphics::fill`.
    Fill {
        /// Target.
        image: ImageId,
        /// Fill color.
        color: Rgba8Premul,
    },
    /// `Graphics::replace_pixels`.
    ReplacePixels {
        /// Target.
        image: ImageId,
        /// Owned copy of the caller's buffer.
        pixels: Vec<u8>,
        /// Target region.
        region: Region,
    },
    /// `Graphics::copy_pixels`.
    CopyPixels {
        /// Destination.
        dst: ImageId,
        /// Source.
        src: ImageId,
        /// Source region, written at the destination origin.
        region: Region,
    },
    /// `Graphics::draw_image`.
    DrawImage {
        /// Destination.
        dst: ImageId,
        /// Source.
        src: ImageId,
        /// Draw parameters.
        opts: DrawImageOptions,
    },
    /// `Graphics::draw_triangles`.
    DrawTriangles {
        /// Destination.
        dst: ImageId,
        /// Fixed-function source.
        src: Option<ImageId>,
        /// Owned copy of the vertex buffer.
        vertices: Vec<f32>,
        /// Owned copy of the index buffer.
        indices: Vec<u16>,
        /// Custom shader.
        shader: Option<ShaderId>,
        /// Shader uniforms.
        uniforms: Vec<Uniform>,
        /// Fixed-function state.
        opts: DrawTrianglesOptions,
    },
    /// `Graphics::mark_disposed`.
    MarkDisposed {
        /// Released image.
        image: ImageId,
    },
    /// `Graphics::dispose_shader`; released after any captured draw that uses it.
    DisposeShader {
        /// Released program.
        shader: ShaderId,
    },
}

impl DeferredCommand {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateImage { .. } => "create_image",
            Self::CreateScreenImage { .. } => "create_screen_image",
            Self::Fill { .. } => "fill",
            Self::ReplacePixels { .. } => "replace_pixels",
            Self::CopyPixels { .. } => "copy_pixels",
            Self::DrawImage { .. } => "draw_image",
            Self::DrawTriangles { .. } => "draw_triangles",
            Self::MarkDisposed { .. } => "mark_disposed",
            Self::DisposeShader { .. } => "dispose_shader",
        }
    }
}

#[derive(Debug, Default)]
enum QueueState {
    #[default]
    Immediate,
    Deferring(VecDeque<DeferredCommand>),
    Flushed,
}

/// Frame-scoped queue of mutations issued before the first frame.
///
/// Starts immediate. [`CommandQueue::enter_deferred_mode`] makes [`CommandQueue::try_defer`]
/// capture commands until the first successful [`CommandQueue::flush`], after which deferral is
/// permanently off.
#[derive(Debug, Default)]
pub struct CommandQueue {
    state: QueueState,
}

impl CommandQueue {
    /// An immediate (non-deferring) queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start capturing commands.
    ///
    /// A no-op while already deferring.
    ///
    /// # Panics
    ///
    /// Panics once the queue has been flushed.
    pub fn enter_deferred_mode(&mut self) {
        match self.state {
            QueueState::Immediate => self.state = QueueState::Deferring(VecDeque::new()),
            QueueState::Deferring(_) => {}
            QueueState::Flushed => {
                panic!("texstage: enter_deferred_mode called after the queue was flushed")
            }
        }
    }

    /// Capture the command produced by `build` when deferring.
    ///
    /// Returns `true` when the command was captured and the caller must not execute it, `false`
    /// when the caller should execute immediately. `build` only runs in the capturing case.
    pub fn try_defer(&mut self, build: impl FnOnce() -> DeferredCommand) -> bool {
        let QueueState::Deferring(cmds) = &mut self.state else {
            return false;
        };
        let cmd = build();
        tracing::debug!(op = cmd.name(), queued = cmds.len() + 1, "deferred command");
        cmds.push_back(cmd);
        true
    }

    /// Execute every captured command in insertion order, then disable deferral for good.
    ///
    /// When `exec` fails the failing command and everything after it stay queued and the queue
    /// keeps deferring; a later flush resumes from the failed command.
    #[tracing::instrument(skip_all, fields(queued = self.len()))]
    pub fn flush<E>(
        &mut self,
        mut exec: impl FnMut(&DeferredCommand) -> Result<(), E>,
    ) -> Result<(), E> {
        if let QueueState::Deferring(cmds) = &mut self.state {
            while let Some(cmd) = cmds.pop_front() {
                tracing::debug!(op = cmd.name(), "replaying deferred command");
                if let Err(e) = exec(&cmd) {
                    cmds.push_front(cmd);
                    return Err(e);
                }
            }
        }
        self.state = QueueState::Flushed;
        Ok(())
    }

    /// Guard for read operations.
    ///
    /// # Panics
    ///
    /// Panics when the queue is deferring with captured commands: the read would observe state
    /// that has not been replayed yet.
    pub fn ensure_flushed(&self, op: &str) {
        if let QueueState::Deferring(cmds) = &self.state
            && !cmds.is_empty()
        {
            panic!(
                "texstage: {op} cannot be called before the first frame while {} command(s) are deferred",
                cmds.len()
            );
        }
    }

    /// Number of captured commands.
    pub fn len(&self) -> usize {
        match &self.state {
            QueueState::Deferring(cmds) => cmds.len(),
            QueueState::Immediate | QueueState::Flushed => 0,
        }
    }

    /// Return `true` when no command is captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` while calls are being captured.
    pub fn is_deferring(&self) -> bool {
        matches!(self.state, QueueState::Deferring(_))
    }

    /// Return `true` once a flush has completed.
    pub fn is_flushed(&self) -> bool {
        matches!(self.state, QueueState::Flushed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffered/queue.rs"]
mod tests;
