//! Headless backend that records every call
//!
//! Used by the demo binary and by tests to observe exactly which passes,
//! viewports, uniforms and draws a frame produced. Failure switches let
//! tests exercise the fatal initialization paths.

use crate::render::backend::{
    BackendResult, FramebufferHandle, FramebufferStatus, GpuBackend, GpuVertex, MeshHandle, ProgramHandle,
    ProgramKind, TextureFormat, TextureHandle, Topology, UniformValue, Viewport,
};
use crate::render::RenderError;
use std::collections::{HashMap, HashSet};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Program compiled and linked
    CreateProgram(ProgramKind, ProgramHandle),
    /// Program made current
    UseProgram(ProgramHandle),
    /// Uniform set on the current program
    Uniform(String, UniformValue),
    /// Texture allocated
    CreateTexture {
        /// Handle
        texture: TextureHandle,
        /// Format
        format: TextureFormat,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// Texture contents replaced
    UpdateTexture {
        /// Handle
        texture: TextureHandle,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// Texture released
    DeleteTexture(TextureHandle),
    /// Texture bound to a unit
    BindTexture {
        /// Unit
        unit: u32,
        /// Handle
        texture: TextureHandle,
    },
    /// Framebuffer created
    CreateFramebuffer(FramebufferHandle, TextureHandle),
    /// Framebuffer released
    DeleteFramebuffer(FramebufferHandle),
    /// Framebuffer bound (`None` is the default target)
    BindFramebuffer(Option<FramebufferHandle>),
    /// Viewport set
    SetViewport(Viewport),
    /// Depth cleared
    ClearDepth,
    /// Buffers created
    CreateMesh {
        /// Handle
        mesh: MeshHandle,
        /// Vertex count
        vertices: usize,
        /// Index count
        indices: usize,
    },
    /// Buffers updated
    UpdateMesh {
        /// Handle
        mesh: MeshHandle,
        /// Vertex count
        vertices: usize,
        /// Index count
        indices: usize,
    },
    /// Buffers released
    DeleteMesh(MeshHandle),
    /// Indexed draw
    Draw {
        /// Buffers drawn
        mesh: MeshHandle,
        /// Topology
        topology: Topology,
        /// Index count
        count: u32,
    },
}

/// Recording [`GpuBackend`]
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    next_handle: u64,
    programs: HashMap<ProgramHandle, ProgramKind>,
    textures: HashMap<TextureHandle, (TextureFormat, u32, u32)>,
    meshes: HashMap<MeshHandle, usize>,
    framebuffers: HashSet<FramebufferHandle>,
    current_program: Option<ProgramHandle>,
    context_lost: bool,
    failing_program: Option<ProgramKind>,
    incomplete_framebuffers: bool,
}

impl RecordingBackend {
    /// Create a backend with a working context
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a missing GPU context
    #[must_use]
    pub fn without_context(mut self) -> Self {
        self.context_lost = true;
        self
    }

    /// Make compilation of one program kind fail
    #[must_use]
    pub fn failing_program(mut self, kind: ProgramKind) -> Self {
        self.failing_program = Some(kind);
        self
    }

    /// Report every framebuffer as incomplete
    #[must_use]
    pub fn with_incomplete_framebuffers(mut self) -> Self {
        self.incomplete_framebuffers = true;
        self
    }

    /// Switch framebuffer completeness reporting on a live backend
    pub fn set_incomplete_framebuffers(&mut self, incomplete: bool) {
        self.incomplete_framebuffers = incomplete;
    }

    /// Every call recorded so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Forget recorded calls (resources stay alive)
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Kind of a program handle
    pub fn program_kind(&self, program: ProgramHandle) -> Option<ProgramKind> {
        self.programs.get(&program).copied()
    }

    /// Format and size of a live texture
    pub fn texture_info(&self, texture: TextureHandle) -> Option<(TextureFormat, u32, u32)> {
        self.textures.get(&texture).copied()
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live mesh buffers
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Draw calls grouped by the program that was current, in order
    pub fn draws_by_program(&self) -> Vec<(ProgramKind, Topology, u32)> {
        let mut current = None;
        let mut draws = Vec::new();
        for command in &self.commands {
            match command {
                Command::UseProgram(program) => current = self.program_kind(*program),
                Command::Draw { topology, count, .. } => {
                    if let Some(kind) = current {
                        draws.push((kind, *topology, *count));
                    }
                }
                _ => {}
            }
        }
        draws
    }

    /// Number of draws issued while `kind` was current
    pub fn draw_count(&self, kind: ProgramKind) -> usize {
        self.draws_by_program().iter().filter(|(k, _, _)| *k == kind).count()
    }

    /// Viewports set while `kind` was current
    pub fn viewports_for(&self, kind: ProgramKind) -> Vec<Viewport> {
        let mut current = None;
        let mut pending = None;
        let mut viewports = Vec::new();
        for command in &self.commands {
            match command {
                Command::UseProgram(program) => current = self.program_kind(*program),
                Command::SetViewport(viewport) => pending = Some(*viewport),
                Command::Draw { .. } if current == Some(kind) => {
                    if let Some(viewport) = pending.take() {
                        viewports.push(viewport);
                    }
                }
                _ => {}
            }
        }
        viewports
    }

    /// Last value set for a uniform name
    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.commands.iter().rev().find_map(|command| match command {
            Command::Uniform(uniform, value) if uniform == name => Some(*value),
            _ => None,
        })
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuBackend for RecordingBackend {
    fn check_context(&self) -> BackendResult<()> {
        if self.context_lost {
            Err(RenderError::ContextUnavailable("recording backend created without a context".into()))
        } else {
            Ok(())
        }
    }

    fn create_program(&mut self, kind: ProgramKind) -> BackendResult<ProgramHandle> {
        if self.failing_program == Some(kind) {
            return Err(RenderError::ShaderCompilation {
                program: kind.name().to_string(),
                log: "simulated link failure".into(),
            });
        }
        let program = ProgramHandle(self.allocate());
        self.programs.insert(program, kind);
        self.commands.push(Command::CreateProgram(kind, program));
        Ok(program)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.commands.push(Command::Uniform(name.to_string(), value));
    }

    fn create_depth_texture(&mut self, width: u32, height: u32) -> BackendResult<TextureHandle> {
        if width == 0 || height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!("depth texture {width}x{height}")));
        }
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture, (TextureFormat::Depth32F, width, height));
        self.commands.push(Command::CreateTexture { texture, format: TextureFormat::Depth32F, width, height });
        Ok(texture)
    }

    fn create_texture_rgba32f(&mut self, width: u32, height: u32, data: &[f32]) -> BackendResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "RGBA32F texture {width}x{height} needs {expected} floats, got {}",
                data.len()
            )));
        }
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture, (TextureFormat::Rgba32F, width, height));
        self.commands.push(Command::CreateTexture { texture, format: TextureFormat::Rgba32F, width, height });
        Ok(texture)
    }

    fn update_texture_rgba32f(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        data: &[f32],
    ) -> BackendResult<()> {
        let Some(info) = self.textures.get_mut(&texture) else {
            return Err(RenderError::RenderingFailed(format!("unknown texture {texture:?}")));
        };
        if data.len() != width as usize * height as usize * 4 {
            return Err(RenderError::RenderingFailed(format!("texture {texture:?} upload size mismatch")));
        }
        *info = (TextureFormat::Rgba32F, width, height);
        self.commands.push(Command::UpdateTexture { texture, width, height });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.commands.push(Command::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn create_framebuffer(&mut self, depth: TextureHandle) -> BackendResult<FramebufferHandle> {
        if !self.textures.contains_key(&depth) {
            return Err(RenderError::ResourceCreationFailed(format!("unknown depth attachment {depth:?}")));
        }
        let framebuffer = FramebufferHandle(self.allocate());
        self.framebuffers.insert(framebuffer);
        self.commands.push(Command::CreateFramebuffer(framebuffer, depth));
        Ok(framebuffer)
    }

    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        if !self.framebuffers.contains(&framebuffer) {
            FramebufferStatus::Incomplete(format!("unknown framebuffer {framebuffer:?}"))
        } else if self.incomplete_framebuffers {
            FramebufferStatus::Incomplete("missing depth attachment".into())
        } else {
            FramebufferStatus::Complete
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffers.remove(&framebuffer);
        self.commands.push(Command::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.commands.push(Command::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    fn clear_depth(&mut self) {
        self.commands.push(Command::ClearDepth);
    }

    fn create_mesh_buffers(&mut self, vertices: &[GpuVertex], indices: &[u32]) -> BackendResult<MeshHandle> {
        let mesh = MeshHandle(self.allocate());
        self.meshes.insert(mesh, indices.len());
        self.commands.push(Command::CreateMesh { mesh, vertices: vertices.len(), indices: indices.len() });
        Ok(mesh)
    }

    fn update_mesh_buffers(&mut self, mesh: MeshHandle, vertices: &[GpuVertex], indices: &[u32]) -> BackendResult<()> {
        let Some(count) = self.meshes.get_mut(&mesh) else {
            return Err(RenderError::RenderingFailed(format!("unknown mesh {mesh:?}")));
        };
        *count = indices.len();
        self.commands.push(Command::UpdateMesh { mesh, vertices: vertices.len(), indices: indices.len() });
        Ok(())
    }

    fn delete_mesh_buffers(&mut self, mesh: MeshHandle) {
        self.meshes.remove(&mesh);
        self.commands.push(Command::DeleteMesh(mesh));
    }

    fn draw_indexed(&mut self, mesh: MeshHandle, topology: Topology, count: u32) -> BackendResult<()> {
        let available = self
            .meshes
            .get(&mesh)
            .copied()
            .ok_or_else(|| RenderError::RenderingFailed(format!("draw of unknown mesh {mesh:?}")))?;
        if count as usize > available {
            return Err(RenderError::RenderingFailed(format!(
                "draw of {count} indices from a buffer of {available}"
            )));
        }
        if self.current_program.is_none() {
            return Err(RenderError::RenderingFailed("draw without a program".into()));
        }
        self.commands.push(Command::Draw { mesh, topology, count });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_switches() {
        assert!(matches!(
            RecordingBackend::new().without_context().check_context(),
            Err(RenderError::ContextUnavailable(_))
        ));

        let mut backend = RecordingBackend::new().failing_program(ProgramKind::PointDepth);
        assert!(backend.create_program(ProgramKind::Main).is_ok());
        assert!(matches!(
            backend.create_program(ProgramKind::PointDepth),
            Err(RenderError::ShaderCompilation { .. })
        ));

        let mut backend = RecordingBackend::new().with_incomplete_framebuffers();
        let depth = backend.create_depth_texture(4, 4).unwrap();
        let framebuffer = backend.create_framebuffer(depth).unwrap();
        assert!(matches!(backend.framebuffer_status(framebuffer), FramebufferStatus::Incomplete(_)));
    }

    #[test]
    fn test_draws_are_attributed_to_programs() {
        let mut backend = RecordingBackend::new();
        let main = backend.create_program(ProgramKind::Main).unwrap();
        let mesh = backend.create_mesh_buffers(&[GpuVertex::default(); 3], &[0, 1, 2]).unwrap();
        assert!(backend.draw_indexed(mesh, Topology::Triangles, 3).is_err());

        backend.use_program(main);
        backend.set_viewport(Viewport::full(8, 8));
        backend.draw_indexed(mesh, Topology::Triangles, 3).unwrap();
        assert!(backend.draw_indexed(mesh, Topology::Triangles, 6).is_err());

        assert_eq!(backend.draws_by_program(), vec![(ProgramKind::Main, Topology::Triangles, 3)]);
        assert_eq!(backend.viewports_for(ProgramKind::Main), vec![Viewport::full(8, 8)]);
    }

    #[test]
    fn test_texture_upload_size_is_checked() {
        let mut backend = RecordingBackend::new();
        assert!(backend.create_texture_rgba32f(4, 2, &[0.0; 31]).is_err());
        let texture = backend.create_texture_rgba32f(4, 2, &[0.0; 32]).unwrap();
        backend.update_texture_rgba32f(texture, 4, 3, &[0.0; 48]).unwrap();
        assert_eq!(backend.texture_info(texture), Some((TextureFormat::Rgba32F, 4, 3)));
    }
}
