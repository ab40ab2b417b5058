//! In-memory backend that records every call for assertions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::compile::ShaderProgram;
use crate::error::RenderError;
use crate::mesh::TorusGeometry;
use crate::types::FramebufferSize;

use super::{
    FullscreenDraw, GeometryId, MeshDraw, PassOutput, ProgramId, RenderBackend, ResourceId,
    TargetId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Geometry,
    Program,
    Target,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    ResizeSurface(FramebufferSize),
    ResizeTarget(TargetId, FramebufferSize),
    BeginFrame,
    DrawMesh {
        program: ProgramId,
        geometry: GeometryId,
        output: PassOutput,
        uniforms: Vec<u8>,
    },
    DrawFullscreen {
        program: ProgramId,
        input: TargetId,
        output: PassOutput,
        uniforms: Vec<u8>,
    },
    EndFrame,
    Release(ResourceId),
    ReleaseContext,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub live: HashMap<ResourceId, ResourceKind>,
    pub created: Vec<(ResourceId, ResourceKind)>,
    pub released: Vec<ResourceId>,
    pub invalid_releases: usize,
    pub context_releases: usize,
    pub commands: Vec<Command>,
    /// Fails `create_program` calls whose label matches.
    pub fail_program: Option<&'static str>,
    /// Fails `resize_target` for this target.
    pub fail_resize: Option<TargetId>,
    /// Makes `begin_frame` report a skipped frame.
    pub skip_frames: bool,
    pub out_of_memory: bool,
}

impl Ledger {
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|value| **value == kind).count()
    }

    pub fn frames(&self) -> Vec<&[Command]> {
        let mut frames = Vec::new();
        let mut start = None;
        for (index, command) in self.commands.iter().enumerate() {
            match command {
                Command::BeginFrame => start = Some(index + 1),
                Command::EndFrame => {
                    if let Some(begin) = start.take() {
                        frames.push(&self.commands[begin..index]);
                    }
                }
                _ => {}
            }
        }
        frames
    }
}

pub(crate) struct RecordingBackend {
    ledger: Rc<RefCell<Ledger>>,
    next_id: u64,
}

impl RecordingBackend {
    pub fn new() -> (Self, Rc<RefCell<Ledger>>) {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        (
            Self {
                ledger: Rc::clone(&ledger),
                next_id: 1,
            },
            ledger,
        )
    }

    fn mint(&mut self, kind: ResourceKind) -> ResourceId {
        let id = ResourceId::new(self.next_id);
        self.next_id += 1;
        let mut ledger = self.ledger.borrow_mut();
        ledger.live.insert(id, kind);
        ledger.created.push((id, kind));
        id
    }

    fn ensure_live(&self, id: ResourceId) -> Result<(), RenderError> {
        if self.ledger.borrow().live.contains_key(&id) {
            Ok(())
        } else {
            Err(RenderError::UnknownResource(id))
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn resize_surface(&mut self, size: FramebufferSize) {
        self.ledger
            .borrow_mut()
            .commands
            .push(Command::ResizeSurface(size));
    }

    fn create_geometry(&mut self, _geometry: &TorusGeometry) -> Result<GeometryId, RenderError> {
        Ok(GeometryId::new(self.mint(ResourceKind::Geometry)))
    }

    fn create_program(&mut self, program: &ShaderProgram) -> Result<ProgramId, RenderError> {
        if self.ledger.borrow().fail_program == Some(program.label) {
            return Err(RenderError::Resource(format!(
                "{} failed to compile",
                program.label
            )));
        }
        Ok(ProgramId::new(self.mint(ResourceKind::Program)))
    }

    fn create_target(&mut self, _size: FramebufferSize) -> Result<TargetId, RenderError> {
        Ok(TargetId::new(self.mint(ResourceKind::Target)))
    }

    fn resize_target(
        &mut self,
        target: TargetId,
        size: FramebufferSize,
    ) -> Result<(), RenderError> {
        self.ensure_live(target.id())?;
        let mut ledger = self.ledger.borrow_mut();
        if ledger.fail_resize == Some(target) {
            return Err(RenderError::Resource(format!(
                "target {} could not be resized",
                target.id().raw()
            )));
        }
        ledger.commands.push(Command::ResizeTarget(target, size));
        Ok(())
    }

    fn release(&mut self, resource: ResourceId) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.live.remove(&resource).is_some() {
            ledger.released.push(resource);
            ledger.commands.push(Command::Release(resource));
        } else {
            ledger.invalid_releases += 1;
        }
    }

    fn begin_frame(&mut self) -> Result<bool, RenderError> {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.out_of_memory {
            return Err(RenderError::OutOfMemory);
        }
        if ledger.skip_frames {
            return Ok(false);
        }
        ledger.commands.push(Command::BeginFrame);
        Ok(true)
    }

    fn draw_mesh(&mut self, draw: &MeshDraw<'_>, output: PassOutput) -> Result<(), RenderError> {
        self.ensure_live(draw.program.id())?;
        self.ensure_live(draw.geometry.id())?;
        if let PassOutput::Target(target) = output {
            self.ensure_live(target.id())?;
        }
        self.ledger.borrow_mut().commands.push(Command::DrawMesh {
            program: draw.program,
            geometry: draw.geometry,
            output,
            uniforms: draw.uniforms.to_vec(),
        });
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        draw: &FullscreenDraw<'_>,
        output: PassOutput,
    ) -> Result<(), RenderError> {
        self.ensure_live(draw.program.id())?;
        self.ensure_live(draw.input.id())?;
        if let PassOutput::Target(target) = output {
            self.ensure_live(target.id())?;
        }
        self.ledger.borrow_mut().commands.push(Command::DrawFullscreen {
            program: draw.program,
            input: draw.input,
            output,
            uniforms: draw.uniforms.to_vec(),
        });
        Ok(())
    }

    fn end_frame(&mut self) {
        self.ledger.borrow_mut().commands.push(Command::EndFrame);
    }

    fn release_context(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        ledger.context_releases += 1;
        ledger.commands.push(Command::ReleaseContext);
    }
}
