//! Thin-lens camera.

use crate::sampling::random_in_unit_disk;
use rand::RngCore;
use umbra_math::{Ray, Vec3};

/// Image plane and lens placement derived from the camera settings.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    /// World position of image coordinate `(0, 0)`.
    top_left: Vec3,
    /// Full image width, left to right.
    across: Vec3,
    /// Full image height, top to bottom.
    down: Vec3,
    lens_u: Vec3,
    lens_v: Vec3,
}

/// Maps normalized image coordinates to primary rays.
///
/// Configure with the `with_*` methods, then call [`Camera::initialize`]
/// before handing it to the renderer.
#[derive(Debug, Clone)]
pub struct Camera {
    aspect_ratio: f32,
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    /// Vertical field of view, degrees.
    vfov: f32,
    /// Cone angle through each pixel, degrees; 0 is a pinhole.
    defocus_angle: f32,
    focus_dist: f32,
    viewport: Viewport,
}

impl Camera {
    /// Pinhole camera at the origin looking down -Z, 90° vertical fov, square image.
    pub fn new() -> Self {
        let mut camera = Self {
            aspect_ratio: 1.0,
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            vfov: 90.0,
            defocus_angle: 0.0,
            focus_dist: 1.0,
            viewport: Viewport {
                top_left: Vec3::ZERO,
                across: Vec3::X,
                down: Vec3::NEG_Y,
                lens_u: Vec3::ZERO,
                lens_v: Vec3::ZERO,
            },
        };
        camera.initialize();
        camera
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Aspect ratio of a `width` x `height` image.
    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        self.with_aspect_ratio(width as f32 / height.max(1) as f32)
    }

    pub fn with_position(mut self, eye: Vec3, target: Vec3, up: Vec3) -> Self {
        self.eye = eye;
        self.target = target;
        self.up = up;
        self
    }

    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    /// Rebuild the viewport from the current settings.
    pub fn initialize(&mut self) {
        let back = (self.eye - self.target).normalize();
        let right = self.up.cross(back).normalize();
        let up = back.cross(right);

        let height = 2.0 * (self.vfov.to_radians() / 2.0).tan() * self.focus_dist;
        let across = right * height * self.aspect_ratio;
        let down = -up * height;
        let lens_radius = self.focus_dist * (self.defocus_angle.to_radians() / 2.0).tan();

        self.viewport = Viewport {
            top_left: self.eye - back * self.focus_dist - (across + down) / 2.0,
            across,
            down,
            lens_u: right * lens_radius,
            lens_v: up * lens_radius,
        };
    }

    /// Ray through `(s, t)` in `[0, 1]²`, `(0, 0)` being the top-left corner.
    pub fn send_ray(&self, s: f32, t: f32, rng: &mut dyn RngCore) -> Ray {
        let vp = &self.viewport;
        let target = vp.top_left + s * vp.across + t * vp.down;

        let origin = if self.defocus_angle > 0.0 {
            let p = random_in_unit_disk(rng);
            self.eye + p.x * vp.lens_u + p.y * vp.lens_v
        } else {
            self.eye
        };

        Ray::new(origin, target - origin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
