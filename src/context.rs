//! The GPU and window context: the renderer, camera and lights of the stage.

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{self, CameraResources, CameraUniform, Projection},
    data_structures::{material::material_layout, texture::Texture},
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
};

/// Samples per pixel when the adapter supports multisampling for the surface format.
pub const MSAA_SAMPLES: u32 = 4;
pub const CAMERA_POSITION: [f32; 3] = [0.0, 0.0, 13.0];
pub const FOVY_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub(crate) msaa_texture: Option<Texture>,
    pub sample_count: u32,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub material_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible graphics adapter found")?;

        log::info!("Device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Could not open the graphics device")?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders output linear colour, an sRGB surface encodes it for display.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface reports no supported formats")?;
        // The page behind the canvas has to shine through.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| surface_caps.alpha_modes.contains(mode))
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let max_dimension = device.limits().max_texture_dimension_2d;
        let mut config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: 1,
            height: 1,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            log::warn!("{}x MSAA is not supported for {:?}", MSAA_SAMPLES, surface_format);
            1
        };

        let camera = camera::Camera::new(CAMERA_POSITION);
        let mut projection = Projection::new(
            size.width.max(1),
            size.height.max(1),
            cgmath::Deg(FOVY_DEGREES),
            Z_NEAR,
            Z_FAR,
        );
        resize_viewport(
            &mut config,
            &mut projection,
            size.width.max(1),
            size.height.max(1),
            max_dimension,
        );

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let light = LightResources::new(LightUniform::rig(), &device);
        let material_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            sample_count,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_texture = Texture::create_msaa_texture(
            &device,
            [config.width, config.height],
            config.format,
            sample_count,
            "msaa_texture",
        );

        surface.configure(&device, &config);

        Ok(Self {
            window,
            depth_texture,
            msaa_texture,
            sample_count,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            material_layout,
            clear_colour: wgpu::Color::TRANSPARENT,
        })
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn depth_target(&self) -> &Texture {
        &self.depth_texture
    }

    /// The multisampled colour target, `None` without MSAA.
    pub fn msaa_target(&self) -> Option<&Texture> {
        self.msaa_texture.as_ref()
    }

    /// The viewport size in logical pixels.
    pub fn logical_size(&self) -> (f64, f64) {
        let size = self.window.inner_size().to_logical::<f64>(self.scale_factor());
        (size.width, size.height)
    }

    /// Applies a new surface size. Returns `false` for zero-sized viewports.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        if !resize_viewport(
            &mut self.config,
            &mut self.projection,
            width,
            height,
            max_dimension,
        ) {
            return false;
        }
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            self.sample_count,
            "depth_texture",
        );
        self.msaa_texture = Texture::create_msaa_texture(
            &self.device,
            [self.config.width, self.config.height],
            self.config.format,
            self.sample_count,
            "msaa_texture",
        );
        true
    }
}

/// Updates surface dimensions and camera aspect together.
///
/// The surface is clamped to `max_dimension` per axis (2048 on WebGL2) and
/// stretched over the canvas, the aspect always follows the requested size.
pub fn resize_viewport(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    config.width = width.min(max_dimension);
    config.height = height.min(max_dimension);
    projection.resize(width, height);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            width: 800,
            height: 600,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    #[test]
    fn resize_keeps_surface_and_aspect_in_sync() {
        let mut config = config();
        let mut projection = Projection::new(800, 600, cgmath::Deg(FOVY_DEGREES), Z_NEAR, Z_FAR);
        for (w, h) in [(1024u32, 768u32), (390, 844), (2560, 1080), (1, 1)] {
            assert!(resize_viewport(&mut config, &mut projection, w, h, 8192));
            assert_eq!((config.width, config.height), (w, h));
            assert_eq!(projection.aspect(), w as f32 / h as f32);
        }
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut config = config();
        let mut projection = Projection::new(800, 600, cgmath::Deg(FOVY_DEGREES), Z_NEAR, Z_FAR);
        assert!(!resize_viewport(&mut config, &mut projection, 0, 600, 8192));
        assert!(!resize_viewport(&mut config, &mut projection, 640, 0, 8192));
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(projection.aspect(), 800.0 / 600.0);
    }

    #[test]
    fn oversized_viewport_is_clamped_to_the_texture_limit() {
        let mut config = config();
        let mut projection = Projection::new(800, 600, cgmath::Deg(FOVY_DEGREES), Z_NEAR, Z_FAR);
        assert!(resize_viewport(&mut config, &mut projection, 4096, 2160, 2048));
        assert_eq!((config.width, config.height), (2048, 2048));
        assert_eq!(projection.aspect(), 4096.0 / 2160.0);

        assert!(resize_viewport(&mut config, &mut projection, 2880, 1800, 2048));
        assert_eq!((config.width, config.height), (2048, 1800));
        assert_eq!(projection.aspect(), 2880.0 / 1800.0);
    }
}
