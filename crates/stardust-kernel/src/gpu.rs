//! GPU layouts and buffer upload for emitters.
//!
//! [`EmitterUniforms`] packs the parameter blocks into the fixed uniform
//! layout a sprite shader reads; curves and per-slot attributes live in
//! their own storage buffers. Slot attributes are flushed only for the range
//! the scheduler marked dirty.

use bytemuck::{Pod, Zeroable};
use stardust_common::DirtyRange;
use tracing::debug;
use wgpu::{util::DeviceExt, Device, Queue};

use crate::blocks::{KinematicBlock, ParamBlocks, ScalarRange, VecRange};
use crate::config::{Direction, RadialType, SpawnType};
use crate::evaluator::SpriteInstance;
use crate::slots::SlotBuffer;

/// Emitter uniform block.
///
/// Every range occupies two `vec4`s (min, max). Scalars that have no vector of
/// their own ride in spare `w` components.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EmitterUniforms {
    /// `[time, managed id, radial type, duration]`,
    /// `[spawn type, spawn rate, seed, slot count]`,
    /// `[particle size, use perspective, direction, drag]`,
    /// `[trail interval, particle count, trail count, 0]`
    pub params: [[f32; 4]; 4],
    /// Linear offset in xyz, radial offset in w
    pub offset: [[f32; 4]; 2],
    /// Linear velocity in xyz, radial velocity in w
    pub velocity: [[f32; 4]; 2],
    /// Linear acceleration in xyz, radial acceleration in w
    pub acceleration: [[f32; 4]; 2],
    /// Angular velocity in xyz, particle life time in w
    pub angular_velocity: [[f32; 4]; 2],
    /// Angular acceleration in xyz, trail life time in w
    pub angular_acceleration: [[f32; 4]; 2],
    /// Orbital velocity in x, orbital acceleration in y
    pub orbital: [[f32; 4]; 2],
    /// `[columns, rows, frame count, loops]`
    pub texture_frames: [f32; 4],
    /// `[scale, min, max, 0]`
    pub velocity_scale: [f32; 4],
    /// Emitter color in rgb
    pub emitter_color: [f32; 4],
}

fn pack_range(linear: &VecRange, w: ScalarRange) -> [[f32; 4]; 2] {
    [linear.min.extend(w.min).to_array(), linear.max.extend(w.max).to_array()]
}

fn pack_kinematic(block: &KinematicBlock) -> [[f32; 4]; 2] {
    pack_range(&block.linear, block.radial)
}

impl EmitterUniforms {
    /// Packs the blocks of one emitter.
    #[must_use]
    pub fn from_blocks(blocks: &ParamBlocks) -> Self {
        let p = &blocks.params;
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let frames = &blocks.texture_frames;
        let stretch = &blocks.velocity_scale;
        let [r, g, b] = blocks.emitter_color.to_array();

        Self {
            params: [
                [
                    p.time,
                    p.managed_particle_id,
                    flag(p.radial_type == RadialType::Sphere),
                    p.duration,
                ],
                [
                    flag(p.spawn_type == SpawnType::Continuous),
                    p.spawn_rate,
                    p.seed,
                    p.layout.count() as f32,
                ],
                [
                    p.particle_size,
                    flag(p.use_perspective),
                    flag(p.direction == Direction::Backward),
                    p.drag,
                ],
                [
                    p.trail_interval,
                    p.layout.particle_count as f32,
                    p.layout.trail_count as f32,
                    0.0,
                ],
            ],
            offset: pack_kinematic(&blocks.offset),
            velocity: pack_kinematic(&blocks.velocity),
            acceleration: pack_kinematic(&blocks.acceleration),
            angular_velocity: pack_range(&blocks.angular_velocity, blocks.life_time),
            angular_acceleration: pack_range(&blocks.angular_acceleration, blocks.trail_life_time),
            orbital: [
                [blocks.orbital_velocity.min, blocks.orbital_acceleration.min, 0.0, 0.0],
                [blocks.orbital_velocity.max, blocks.orbital_acceleration.max, 0.0, 0.0],
            ],
            texture_frames: [frames.columns, frames.rows, frames.count, frames.loops],
            velocity_scale: [stretch.scale, stretch.min, stretch.max, 0.0],
            emitter_color: [r, g, b, 1.0],
        }
    }
}

fn storage_buffer(device: &Device, label: &str, contents: &[u8]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Writes `data[range]` to the matching offset of `buffer`.
fn write_range<T: Pod>(queue: &Queue, buffer: &wgpu::Buffer, data: &[T], range: DirtyRange) {
    if range.is_empty() {
        return;
    }
    let start = range.offset as usize;
    let end = (range.end() as usize).min(data.len());
    if start >= end {
        return;
    }
    let offset = (start * std::mem::size_of::<T>()) as u64;
    queue.write_buffer(buffer, offset, bytemuck::cast_slice(&data[start..end]));
}

/// GPU buffers of one emitter.
pub struct EmitterGpuBuffers {
    uniform_buffer: wgpu::Buffer,
    color_over_time_buffer: wgpu::Buffer,
    rotation_scale_over_time_buffer: wgpu::Buffer,
    vertex_id_buffer: wgpu::Buffer,
    position_buffer: wgpu::Buffer,
    orientation_buffer: Option<wgpu::Buffer>,
    sprite_buffer: wgpu::Buffer,
    slot_count: u32,
    curve_len: usize,
}

impl EmitterGpuBuffers {
    /// Creates every buffer from the current blocks and slots.
    #[must_use]
    pub fn new(device: &Device, blocks: &ParamBlocks, slots: &SlotBuffer) -> Self {
        let uniforms = EmitterUniforms::from_blocks(blocks);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Emitter Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let curves = &blocks.curves;
        let color_over_time_buffer = storage_buffer(
            device,
            "Emitter Color Curve Buffer",
            bytemuck::cast_slice(curves.color_over_time()),
        );
        let rotation_scale_over_time_buffer = storage_buffer(
            device,
            "Emitter Rotation Scale Curve Buffer",
            bytemuck::cast_slice(curves.rotation_scale_over_time()),
        );

        let vertex_id_buffer = storage_buffer(device, "Emitter Vertex Id Buffer", bytemuck::cast_slice(slots.vertex_ids()));
        let position_buffer = storage_buffer(device, "Emitter Position Buffer", bytemuck::cast_slice(slots.positions()));
        let orientation_buffer = slots
            .orientations()
            .map(|o| storage_buffer(device, "Emitter Orientation Buffer", bytemuck::cast_slice(o)));

        let sprites = vec![SpriteInstance::HIDDEN; slots.len() as usize];
        let sprite_buffer = storage_buffer(device, "Emitter Sprite Buffer", bytemuck::cast_slice(&sprites));

        debug!(
            "Created emitter buffers: {} slots, {} curve entries",
            slots.len(),
            curves.color_over_time().len()
        );

        Self {
            uniform_buffer,
            color_over_time_buffer,
            rotation_scale_over_time_buffer,
            vertex_id_buffer,
            position_buffer,
            orientation_buffer,
            sprite_buffer,
            slot_count: slots.len(),
            curve_len: curves.color_over_time().len(),
        }
    }

    /// Whether the buffers must be recreated for the given shapes.
    #[must_use]
    pub fn needs_rebuild(&self, blocks: &ParamBlocks, slots: &SlotBuffer) -> bool {
        self.slot_count != slots.len()
            || self.curve_len != blocks.curves.color_over_time().len()
            || self.orientation_buffer.is_some() != slots.orientations().is_some()
    }

    /// Uploads the blocks and the dirty slot ranges, draining them.
    ///
    /// Recreates the buffers when the slot capacity or curve shape changed.
    pub fn upload(&mut self, device: &Device, queue: &Queue, blocks: &ParamBlocks, slots: &mut SlotBuffer) {
        if self.needs_rebuild(blocks, slots) {
            let _ = slots.take_dirty();
            *self = Self::new(device, blocks, slots);
            return;
        }

        let uniforms = EmitterUniforms::from_blocks(blocks);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        queue.write_buffer(
            &self.color_over_time_buffer,
            0,
            bytemuck::cast_slice(blocks.curves.color_over_time()),
        );
        queue.write_buffer(
            &self.rotation_scale_over_time_buffer,
            0,
            bytemuck::cast_slice(blocks.curves.rotation_scale_over_time()),
        );

        let dirty = slots.take_dirty();
        write_range(queue, &self.vertex_id_buffer, slots.vertex_ids(), dirty.vertex_ids);
        write_range(queue, &self.position_buffer, slots.positions(), dirty.positions);
        if let (Some(buffer), Some(orientations)) = (&self.orientation_buffer, slots.orientations()) {
            write_range(queue, buffer, orientations, dirty.orientations);
        }
    }

    /// Uploads evaluated sprites.
    pub fn upload_sprites(&self, queue: &Queue, sprites: &[SpriteInstance]) {
        let count = sprites.len().min(self.slot_count as usize);
        queue.write_buffer(&self.sprite_buffer, 0, bytemuck::cast_slice(&sprites[..count]));
    }

    /// Uniform buffer.
    #[must_use]
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }

    /// Evaluated sprite buffer, one [`SpriteInstance`] per slot.
    #[must_use]
    pub fn sprite_buffer(&self) -> &wgpu::Buffer {
        &self.sprite_buffer
    }

    /// Per-slot vertex id buffer.
    #[must_use]
    pub fn vertex_id_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_id_buffer
    }

    /// Per-slot base position buffer.
    #[must_use]
    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    /// Per-slot orientation buffer, for world relative emitters.
    #[must_use]
    pub fn orientation_buffer(&self) -> Option<&wgpu::Buffer> {
        self.orientation_buffer.as_ref()
    }

    /// Color and rotation/scale curve buffers.
    #[must_use]
    pub fn curve_buffers(&self) -> (&wgpu::Buffer, &wgpu::Buffer) {
        (&self.color_over_time_buffer, &self.rotation_scale_over_time_buffer)
    }

    /// Slot capacity the buffers were created for.
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }
}
