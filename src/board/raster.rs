//! Fixed-size pixel buffer backing a whiteboard.
//!
//! The raster is an opaque blob as far as the protocol is concerned: four
//! bytes per pixel in ARGB order, row-major, serialized as base64 for the
//! `WHITEBOARD` snapshot message. Clients agree on the geometry and byte
//! layout out-of-band; the server only mutates it per draw call.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::protocol::LineSegment;

const BYTES_PER_PIXEL: usize = 4;

/// A mutable ARGB pixel buffer of fixed dimensions.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// A blank, all-white canvas.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Raster {
            width,
            height,
            // White is 0xFF in every ARGB channel.
            data: vec![0xFF; len],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Base64 encoding of the raw buffer.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Composite one straight stroke onto the buffer.
    ///
    /// The segment is first clipped to the canvas rectangle (padded by the
    /// stroke radius), then walked with Bresenham's algorithm, stamping a
    /// filled disc of radius `floor(stroke_width / 2)` at every step, so a
    /// width below 2 paints single pixels. Composition is plain overwrite:
    /// last write wins per pixel. Coordinates may be any `i32`; the clip
    /// bounds the walk to the canvas, so a segment ending at `i32::MAX` costs
    /// the same as one ending at the edge. All stepping arithmetic is `i64`
    /// to keep extreme endpoints from overflowing.
    pub fn draw_segment(&mut self, color: i32, stroke_width: f32, seg: &LineSegment) {
        let radius = ((stroke_width / 2.0).floor() as i64).max(0);
        let (x1, y1, x2, y2) = match self.clip_segment(seg, radius) {
            Some(endpoints) => endpoints,
            None => return,
        };

        let mut x = x1;
        let mut y = y1;
        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x, y, radius, color);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Liang-Barsky clip against the canvas padded by the stroke radius.
    /// Returns `None` when the segment misses the canvas entirely. `f64`
    /// holds every `i32` coordinate exactly, so the parametric math is safe.
    fn clip_segment(&self, seg: &LineSegment, radius: i64) -> Option<(i64, i64, i64, i64)> {
        let min_x = -(radius as f64);
        let min_y = -(radius as f64);
        let max_x = (self.width as i64 - 1 + radius) as f64;
        let max_y = (self.height as i64 - 1 + radius) as f64;

        let x1 = seg.x1 as f64;
        let y1 = seg.y1 as f64;
        let dx = seg.x2 as f64 - x1;
        let dy = seg.y2 as f64 - y1;

        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        for (p, q) in [
            (-dx, x1 - min_x),
            (dx, max_x - x1),
            (-dy, y1 - min_y),
            (dy, max_y - y1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    }
                    if r > t0 {
                        t0 = r;
                    }
                } else {
                    if r < t0 {
                        return None;
                    }
                    if r < t1 {
                        t1 = r;
                    }
                }
            }
        }

        Some((
            (x1 + t0 * dx).round() as i64,
            (y1 + t0 * dy).round() as i64,
            (x1 + t1 * dx).round() as i64,
            (y1 + t1 * dy).round() as i64,
        ))
    }

    fn stamp(&mut self, cx: i64, cy: i64, radius: i64, color: i32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: i32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let argb = color as u32;
        self.data[offset] = (argb >> 24) as u8;
        self.data[offset + 1] = (argb >> 16) as u8;
        self.data[offset + 2] = (argb >> 8) as u8;
        self.data[offset + 3] = argb as u8;
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: i32 = -65536; // ARGB 0xFFFF0000
    const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

    #[test]
    fn new_canvas_is_all_white() {
        let raster = Raster::new(8, 8);
        assert!(raster.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn segment_paints_every_point_on_its_path() {
        let mut raster = Raster::new(16, 16);
        raster.draw_segment(RED, 1.0, &LineSegment::new(0, 0, 10, 10));
        for i in 0..=10 {
            assert_eq!(raster.pixel(i, i), [0xFF, 0xFF, 0x00, 0x00], "pixel {}", i);
        }
        assert_eq!(raster.pixel(15, 0), WHITE);
    }

    #[test]
    fn stroke_width_widens_the_line() {
        let mut raster = Raster::new(16, 16);
        raster.draw_segment(RED, 4.0, &LineSegment::new(0, 8, 15, 8));
        // Radius 2 disc reaches two rows either side of the centre line.
        assert_ne!(raster.pixel(8, 6), WHITE);
        assert_ne!(raster.pixel(8, 10), WHITE);
        assert_eq!(raster.pixel(8, 3), WHITE);
    }

    #[test]
    fn out_of_bounds_coordinates_are_clipped() {
        let mut raster = Raster::new(8, 8);
        raster.draw_segment(RED, 2.0, &LineSegment::new(-5, -5, 20, 20));
        assert_ne!(raster.pixel(3, 3), WHITE);
    }

    #[test]
    fn extreme_coordinates_are_clipped_before_walking() {
        let mut raster = Raster::new(16, 12);
        raster.draw_segment(RED, 2.0, &LineSegment::new(0, 0, i32::MAX, 0));
        for x in 0..16 {
            assert_ne!(raster.pixel(x, 0), WHITE, "column {}", x);
        }

        let mut raster = Raster::new(16, 12);
        raster.draw_segment(RED, 2.0, &LineSegment::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX));
        assert_ne!(raster.pixel(5, 5), WHITE);
    }

    #[test]
    fn segments_missing_the_canvas_paint_nothing() {
        let mut raster = Raster::new(8, 8);
        raster.draw_segment(RED, 2.0, &LineSegment::new(-100, -50, -40, -200));
        assert!(raster.as_bytes().iter().all(|&b| b == 0xFF));

        raster.draw_segment(RED, 4.0, &LineSegment::new(50, 0, 50, 100));
        assert!(raster.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn last_write_wins_per_pixel() {
        let mut raster = Raster::new(8, 8);
        let green: i32 = -16711936; // ARGB 0xFF00FF00
        raster.draw_segment(RED, 1.0, &LineSegment::new(2, 2, 2, 2));
        raster.draw_segment(green, 1.0, &LineSegment::new(2, 2, 2, 2));
        assert_eq!(raster.pixel(2, 2), [0xFF, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn base64_snapshot_round_trips() {
        let raster = Raster::new(4, 4);
        let encoded = raster.to_base64();
        let decoded = STANDARD.decode(encoded).expect("valid base64");
        assert_eq!(decoded, raster.as_bytes());
    }
}
