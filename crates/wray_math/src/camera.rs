use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::vector::{add, cross, length, normalize, scale, sub};

/// Pinhole camera as seen by the GPU ray generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub look_from: DVec3,
    pub look_at: DVec3,
    pub vup: DVec3,
    /// Vertical field of view in degrees
    pub fov: f64,
    pub width: u32,
    pub height: u32,
}

/// Per-pixel stepping vectors derived from a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub pixel_delta_u: DVec3,
    pub pixel_delta_v: DVec3,
    /// Center of the upper-left pixel
    pub pixel00_location: DVec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            look_from: DVec3::new(0.0, 3.5, 7.0),
            look_at: DVec3::ZERO,
            vup: DVec3::Y,
            fov: 45.0,
            width: 1280,
            height: 720,
        }
    }
}

impl Camera {
    /// Create a new camera
    pub fn new(look_from: DVec3, look_at: DVec3, vup: DVec3, fov: f64, width: u32, height: u32) -> Self {
        Self {
            look_from,
            look_at,
            vup,
            fov,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Direction the camera looks in (not normalized).
    pub fn view_direction(&self) -> DVec3 {
        sub(self.look_at, self.look_from)
    }

    /// Compute the viewport stepping vectors.
    pub fn frame(&self) -> CameraFrame {
        let w = normalize(sub(self.look_from, self.look_at));
        let u = normalize(cross(self.vup, w));
        let v = cross(w, u);

        let focal_length = length(sub(self.look_from, self.look_at));
        let viewport_height = 2.0 * (self.fov.to_radians() / 2.0).tan() * focal_length;
        let viewport_width = viewport_height * self.aspect();

        let viewport_u = scale(u, viewport_width);
        let viewport_v = scale(v, -viewport_height);

        let pixel_delta_u = scale(viewport_u, 1.0 / self.width as f64);
        let pixel_delta_v = scale(viewport_v, 1.0 / self.height as f64);

        let viewport_upper_left = sub(
            sub(sub(self.look_from, scale(w, focal_length)), scale(viewport_u, 0.5)),
            scale(viewport_v, 0.5),
        );
        let pixel00_location = add(
            viewport_upper_left,
            scale(add(pixel_delta_u, pixel_delta_v), 0.5),
        );

        CameraFrame {
            pixel_delta_u,
            pixel_delta_v,
            pixel00_location,
        }
    }

    /// Pack the camera into the 24-float uniform layout the shaders read.
    pub fn to_buffer(&self) -> [f32; 24] {
        let frame = self.frame();
        let mut data = [0.0f32; 24];

        for (slot, v) in [
            self.look_from,
            self.look_at,
            frame.pixel_delta_u,
            frame.pixel_delta_v,
            frame.pixel00_location,
        ]
        .iter()
        .enumerate()
        {
            data[slot * 4..slot * 4 + 3].copy_from_slice(&v.as_vec3().to_array());
        }
        data[20] = self.width as f32;
        data[21] = self.height as f32;

        data
    }
}
