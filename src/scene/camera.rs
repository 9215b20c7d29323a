//! Camera system

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::backend::types::{SurfaceRef, Viewport};

/// Camera projection type
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        height: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            near,
            far,
        }
    }

    pub fn orthographic(height: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic { height, near, far }
    }

    /// Projection matrix for the given aspect ratio
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }
            Projection::Orthographic { height, near, far } => {
                let half_h = height / 2.0;
                let half_w = half_h * aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }

    pub fn near(&self) -> f32 {
        match self {
            Projection::Perspective { near, .. } => *near,
            Projection::Orthographic { near, .. } => *near,
        }
    }

    pub fn far(&self) -> f32 {
        match self {
            Projection::Perspective { far, .. } => *far,
            Projection::Orthographic { far, .. } => *far,
        }
    }
}

/// What a camera is rendering for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraType {
    #[default]
    Game,
    SceneView,
    /// Thumbnail and inspector previews; these never advance the editor frame
    /// counter
    Preview,
    Reflection,
}

/// Camera viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Viewport {
    /// Viewport covering a camera's pixel rectangle
    pub fn from_pixel_rect(rect: PixelRect) -> Self {
        Viewport::new(
            rect.x as f32,
            rect.y as f32,
            rect.width as f32,
            rect.height as f32,
        )
    }
}

/// A camera to render one graph for
#[derive(Debug, Clone)]
pub struct Camera {
    /// Identity used in logs and frame reports
    pub name: String,
    pub camera_type: CameraType,
    pub pixel_rect: PixelRect,
    pub allow_msaa: bool,
    /// Surface the final composite is written to
    pub target: SurfaceRef,
    pub position: Vec3,
    pub focus: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: "Main Camera".to_string(),
            camera_type: CameraType::Game,
            pixel_rect: PixelRect::sized(1920, 1080),
            allow_msaa: false,
            target: SurfaceRef::CameraTarget,
            position: Vec3::new(0.0, 2.0, 5.0),
            focus: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl Camera {
    pub fn new(name: impl Into<String>, pixel_rect: PixelRect) -> Self {
        Self {
            name: name.into(),
            pixel_rect,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, camera_type: CameraType) -> Self {
        self.camera_type = camera_type;
        self
    }

    pub fn with_msaa(mut self, allow_msaa: bool) -> Self {
        self.allow_msaa = allow_msaa;
        self
    }

    pub fn with_target(mut self, target: SurfaceRef) -> Self {
        self.target = target;
        self
    }

    pub fn look_at(&mut self, focus: Vec3) {
        self.focus = focus;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.focus, self.up)
    }

    /// Get the projection matrix, with the aspect taken from the pixel rect
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix(self.pixel_rect.aspect())
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniformData {
        let view = self.view_matrix();
        let proj = self.projection_matrix();
        let view_proj = proj * view;

        let width = self.pixel_rect.width.max(1) as f32;
        let height = self.pixel_rect.height.max(1) as f32;

        CameraUniformData {
            view,
            proj,
            view_proj,
            inv_view: view.inverse(),
            inv_proj: proj.inverse(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(
                self.projection.near(),
                self.projection.far(),
                0.0,
                0.0,
            ),
            screen_size: Vec4::new(width, height, 1.0 / width, 1.0 / height),
        }
    }
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub position: Vec4,
    pub near_far: Vec4,
    /// (width, height, 1 / width, 1 / height)
    pub screen_size: Vec4,
}
