use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use image::{ImageResult, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::Rect;

static OVERLAY_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_overlay_lock_poison_once(operation: &'static str) {
    if OVERLAY_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "overlay lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const RED: Color = Color(255, 0, 0);
    pub const GREEN: Color = Color(0, 255, 0);
    pub const BLUE: Color = Color(0, 0, 255);
    pub const YELLOW: Color = Color(255, 255, 0);
    pub const BLACK: Color = Color(0, 0, 0);
    pub const WHITE: Color = Color(255, 255, 255);
    pub const GRAY: Color = Color(128, 128, 128);
    pub const PINK: Color = Color(255, 192, 203);
    pub const CYAN: Color = Color(0, 255, 255);
    pub const MAGENTA: Color = Color(255, 0, 255);

    pub fn from_name(name: &str) -> Option<Color> {
        let color = match name {
            "red" => Color::RED,
            "green" => Color::GREEN,
            "blue" => Color::BLUE,
            "yellow" => Color::YELLOW,
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "gray" => Color::GRAY,
            "pink" => Color::PINK,
            "cyan" => Color::CYAN,
            "magenta" => Color::MAGENTA,
            _ => return None,
        };
        Some(color)
    }

    fn rgba(self) -> Rgba<u8> {
        Rgba([self.0, self.1, self.2, 255])
    }
}

/// Debug side channel for highlighting boxes. Boxes are viewport-relative.
/// Implementations must not feed anything back into verification.
pub trait Overlay: Send + Sync {
    fn highlight(&self, boxes: &[Rect], color: Color, thickness: u32);
}

pub type OverlayHandle = Arc<dyn Overlay>;

pub fn noop_overlay() -> OverlayHandle {
    Arc::new(NoopOverlay)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOverlay;

impl Overlay for NoopOverlay {
    fn highlight(&self, _boxes: &[Rect], _color: Color, _thickness: u32) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub boxes: Vec<Rect>,
    pub color: Color,
    pub thickness: u32,
}

/// Records every highlight request so tests and tools can inspect them.
#[derive(Clone, Debug, Default)]
pub struct OverlayLog {
    requests: Arc<RwLock<Vec<HighlightRequest>>>,
}

impl OverlayLog {
    pub fn requests(&self) -> Vec<HighlightRequest> {
        match self.requests.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_overlay_lock_poison_once("read");
                poisoned.into_inner().clone()
            }
        }
    }

    pub fn clear(&self) {
        match self.requests.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => {
                warn_overlay_lock_poison_once("clear");
                poisoned.into_inner().clear();
            }
        }
    }
}

impl Overlay for OverlayLog {
    fn highlight(&self, boxes: &[Rect], color: Color, thickness: u32) {
        let request = HighlightRequest {
            boxes: boxes.to_vec(),
            color,
            thickness,
        };
        match self.requests.write() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => {
                warn_overlay_lock_poison_once("write");
                poisoned.into_inner().push(request);
            }
        }
    }
}

/// Draws highlighted boxes as outlines onto an RGBA canvas the size of the
/// viewport.
#[derive(Clone)]
pub struct ImageOverlay {
    canvas: Arc<RwLock<RgbaImage>>,
}

impl fmt::Debug for ImageOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("ImageOverlay")
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}

impl ImageOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Arc::new(RwLock::new(RgbaImage::new(width, height))),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self.canvas.read() {
            Ok(guard) => guard.dimensions(),
            Err(poisoned) => poisoned.into_inner().dimensions(),
        }
    }

    pub fn snapshot(&self) -> RgbaImage {
        match self.canvas.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_overlay_lock_poison_once("snapshot");
                poisoned.into_inner().clone()
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        self.snapshot().save(path)
    }
}

impl Overlay for ImageOverlay {
    fn highlight(&self, boxes: &[Rect], color: Color, thickness: u32) {
        let mut guard = match self.canvas.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_overlay_lock_poison_once("draw");
                poisoned.into_inner()
            }
        };
        for rect in boxes {
            draw_rect_outline(&mut guard, rect, thickness.max(1) as i32, color.rgba());
        }
    }
}

fn draw_filled_rect(canvas: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = (x + w).min(canvas.width() as i32);
    let end_y = (y + h).min(canvas.height() as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    for py in start_y..end_y {
        for px in start_x..end_x {
            canvas.put_pixel(px as u32, py as u32, color);
        }
    }
}

fn draw_rect_outline(canvas: &mut RgbaImage, rect: &Rect, thickness: i32, color: Rgba<u8>) {
    if rect.w <= 1 || rect.h <= 1 {
        return;
    }
    let t = thickness.min(rect.w / 2).min(rect.h / 2).max(1);
    draw_filled_rect(canvas, rect.x, rect.y, rect.w, t, color);
    draw_filled_rect(canvas, rect.x, rect.bottom() - t, rect.w, t, color);
    draw_filled_rect(canvas, rect.x, rect.y, t, rect.h, color);
    draw_filled_rect(canvas, rect.right() - t, rect.y, t, rect.h, color);
}
