use crate::detection::Detection;
use serde::Serialize;

/// sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const fn hex(rgb: u32) -> Self {
        Self((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

pub const PERSON_COLOR: Color = Color::hex(0xFF0F0F);
pub const OBJECT_COLOR: Color = Color::hex(0x00B612);
pub const LABEL_COLOR: Color = Color::hex(0x000000);

const BOX_ALPHA: f32 = 0.4;
const CORNER_RADIUS: f32 = 10.0;
const LABEL_FONT: &str = "12px Courier New";
const LABEL_OFFSET: (f32, f32) = (10.0, 15.0);

/// Rectangle in surface pixels; width may be negative when mirrored
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 2D drawing target laid over the video
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Color, alpha: f32);

    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color, alpha: f32);

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: &str, color: Color);
}

/// Recorded paint operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintOp {
    Rect {
        rect: Rect,
        color: Color,
        alpha: f32,
    },
    RoundRect {
        rect: Rect,
        radius: f32,
        color: Color,
        alpha: f32,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        font: String,
        color: Color,
    },
}

/// Surface that keeps the operations of the last paint pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct DisplayList {
    width: u32,
    height: u32,
    ops: Vec<PaintOp>,
}

impl DisplayList {
    #[cfg(test)]
    pub fn ops(&self) -> &[PaintOp] {
        &self.ops
    }
}

impl Surface for DisplayList {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.ops.clear();
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, alpha: f32) {
        self.ops.push(PaintOp::Rect { rect, color, alpha });
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color, alpha: f32) {
        self.ops.push(PaintOp::RoundRect {
            rect,
            radius,
            color,
            alpha,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: &str, color: Color) {
        self.ops.push(PaintOp::Text {
            text: text.to_string(),
            x,
            y,
            font: font.to_string(),
            color,
        });
    }
}

/// Paints one detection cycle over the video
pub struct OverlayRenderer<S> {
    surface: S,
}

impl<S: Surface> OverlayRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Full repaint: match the frame size, clear, then draw every detection
    pub fn paint(
        &mut self,
        frame_size: (u32, u32),
        detections: &[Detection],
        mirrored: bool,
    ) {
        self.surface.resize(frame_size.0, frame_size.1);
        self.surface.clear();

        let surface_width = self.surface.width() as f32;
        for detection in detections {
            let b = detection.bounding_box;
            let color = if detection.is_person() {
                PERSON_COLOR
            } else {
                OBJECT_COLOR
            };

            if mirrored {
                let rect = Rect {
                    x: surface_width - b.x,
                    y: b.y,
                    width: -b.width,
                    height: b.height,
                };
                self.surface.fill_rect(rect, color, BOX_ALPHA);
                self.surface.fill_text(
                    &detection.label,
                    surface_width - b.x - b.width + LABEL_OFFSET.0,
                    b.y + LABEL_OFFSET.1,
                    LABEL_FONT,
                    LABEL_COLOR,
                );
            } else {
                let rect = Rect {
                    x: b.x,
                    y: b.y,
                    width: b.width,
                    height: b.height,
                };
                self.surface
                    .fill_round_rect(rect, CORNER_RADIUS, color, BOX_ALPHA);
                self.surface.fill_text(
                    &detection.label,
                    b.x + LABEL_OFFSET.0,
                    b.y + LABEL_OFFSET.1,
                    LABEL_FONT,
                    LABEL_COLOR,
                );
            }
        }

        tracing::trace!("Painted {} detections", detections.len());
    }
}
