//! Screen Surface
//!
//! macroquad-backed `Surface`. Everything draws into an offscreen render
//! target at the world's logical resolution, which is then scaled onto the
//! window with letterboxing. The target persists between frames, so when
//! the world skips a render the last image simply stays on screen.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use macroquad::prelude::*;
use tracing::{debug, warn};

use crate::game::Vector;
use super::assets::{TextureId, TextureStore};
use super::surface::Surface;

/// Letterbox bar color
const BAR_COLOR: Color = Color::new(0.04, 0.04, 0.05, 1.0);

pub struct ScreenSurface {
    target: RenderTarget,
    camera: Camera2D,
    width: u32,
    height: u32,
    textures: HashMap<TextureId, Texture2D>,
    store: Rc<RefCell<TextureStore>>,
    /// Where the target was last shown in window pixels
    presented: Rect,
}

impl ScreenSurface {
    /// Create a surface showing world pixels (0,0)..(width,height). Images
    /// added to `store` become textures on the next draw.
    pub fn new(width: u32, height: u32, store: Rc<RefCell<TextureStore>>) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let target = render_target(width, height);
        target.texture.set_filter(FilterMode::Nearest);

        let mut camera = Camera2D::from_display_rect(Rect::new(0.0, 0.0, width as f32, height as f32));
        camera.render_target = Some(target.clone());

        Self {
            target,
            camera,
            width,
            height,
            textures: HashMap::new(),
            store,
            presented: Rect::new(0.0, 0.0, width as f32, height as f32),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Upload new images and drop released ones
    pub fn sync_textures(&mut self) {
        let Ok(mut store) = self.store.try_borrow_mut() else {
            return;
        };
        let releases = store.take_releases();
        let uploads = store.take_uploads();
        if releases.is_empty() && uploads.is_empty() {
            return;
        }
        for id in releases {
            self.textures.remove(&id);
        }
        for id in uploads {
            let Some(image) = store.get(id) else {
                continue;
            };
            if image.width > u16::MAX as u32 || image.height > u16::MAX as u32 {
                warn!("Skipping {}x{} image, too large for a texture", image.width, image.height);
                continue;
            }
            let texture = Texture2D::from_rgba8(image.width as u16, image.height as u16, &image.rgba);
            texture.set_filter(FilterMode::Nearest);
            self.textures.insert(id, texture);
        }
        debug!("{} textures resident", self.textures.len());
    }

    /// Route draw calls into the offscreen target
    pub fn begin(&mut self) {
        self.sync_textures();
        set_camera(&self.camera);
    }

    /// Back to drawing on the window
    pub fn end(&mut self) {
        set_default_camera();
    }

    /// Scale the target onto the whole window, keeping its aspect ratio
    pub fn present(&mut self) {
        let area = Rect::new(0.0, 0.0, screen_width(), screen_height());
        self.present_in(area);
    }

    pub fn present_in(&mut self, area: Rect) {
        let dest = letterbox(self.width as f32, self.height as f32, area);
        draw_rectangle(area.x, area.y, area.w, area.h, BAR_COLOR);
        draw_texture_ex(
            &self.target.texture,
            dest.x,
            dest.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(dest.w, dest.h)),
                flip_y: true,
                ..Default::default()
            },
        );
        self.presented = dest;
    }

    /// Window pixel -> world coordinate, through the last `present`
    pub fn screen_to_world(&self, x: f32, y: f32) -> Vector {
        screen_to_world(self.presented, self.width as f32, self.height as f32, x, y)
    }
}

impl Surface for ScreenSurface {
    fn clear(&mut self, color: Color) {
        clear_background(color);
    }

    fn draw_texture_region(&mut self, texture: TextureId, dest: Rect, source: Option<Rect>, flip_x: bool) {
        // Loaded during this tick's renderer updates
        if !self.textures.contains_key(&texture) {
            self.sync_textures();
        }
        let Some(tex) = self.textures.get(&texture) else {
            return;
        };
        draw_texture_ex(
            tex,
            dest.x,
            dest.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(dest.w, dest.h)),
                source,
                flip_x,
                ..Default::default()
            },
        );
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, color);
    }

    fn draw_rect_lines(&mut self, rect: Rect, thickness: f32, color: Color) {
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, thickness, color);
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        draw_text(text, x, y, size, color);
    }
}

/// Largest rect with the source aspect ratio centered in `area`
pub fn letterbox(src_w: f32, src_h: f32, area: Rect) -> Rect {
    let src_aspect = src_w / src_h;
    let area_aspect = area.w / area.h;
    if src_aspect > area_aspect {
        let h = area.w / src_aspect;
        Rect::new(area.x, area.y + (area.h - h) * 0.5, area.w, h)
    } else {
        let w = area.h * src_aspect;
        Rect::new(area.x + (area.w - w) * 0.5, area.y, w, area.h)
    }
}

/// Map a window pixel inside `shown` back to world coordinates
pub fn screen_to_world(shown: Rect, world_w: f32, world_h: f32, x: f32, y: f32) -> Vector {
    if shown.w <= 0.0 || shown.h <= 0.0 {
        return Vector::ZERO;
    }
    let wx = (x - shown.x) / shown.w * world_w;
    let wy = (y - shown.y) / shown.h * world_h;
    Vector::new(wx as f64, wy as f64)
}
