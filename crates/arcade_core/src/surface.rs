//! Render surface abstraction.
//!
//! The runtime never creates a surface; the host passes one into each render
//! tick. [`CommandBuffer`] is a headless surface that records draw calls so
//! they can be inspected or shipped to a display process.

use arcade_math::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// An RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Immediate-mode 2D drawing in the style of a canvas context.
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Fill a circular arc between two angles in radians.
    fn arc(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color);
    fn draw_image(&mut self, image: &str, dest: Rect);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Vec2);
    fn rotate(&mut self, radians: f32);
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear,
    FillRect {
        rect: Rect,
        color: Color,
    },
    Arc {
        center: Vec2,
        radius: f32,
        start: f32,
        end: f32,
        color: Color,
    },
    Image {
        image: String,
        dest: Rect,
    },
    Save,
    Restore,
    Translate {
        offset: Vec2,
    },
    Rotate {
        radians: f32,
    },
}

/// A surface that records the current frame's draw commands.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Commands recorded since the last clear, starting with that clear.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded frame, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Surface for CommandBuffer {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn arc(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color) {
        self.commands.push(DrawCommand::Arc {
            center,
            radius,
            start,
            end,
            color,
        });
    }

    fn draw_image(&mut self, image: &str, dest: Rect) {
        self.commands.push(DrawCommand::Image {
            image: image.to_string(),
            dest,
        });
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, offset: Vec2) {
        self.commands.push(DrawCommand::Translate { offset });
    }

    fn rotate(&mut self, radians: f32) {
        self.commands.push(DrawCommand::Rotate { radians });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_starts_a_new_frame() {
        let mut buffer = CommandBuffer::new(800.0, 600.0);
        buffer.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        buffer.clear();
        buffer.save();
        assert_eq!(buffer.commands(), &[DrawCommand::Clear, DrawCommand::Save]);
        assert_eq!(buffer.width(), 800.0);
    }

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_value(DrawCommand::Rotate { radians: 1.5 }).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "rotate", "radians": 1.5 }));
    }
}
