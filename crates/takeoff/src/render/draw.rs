use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_polygon_mut},
    point::Point as PixelPoint,
};

use crate::types::Point;

const COVERED: Luma<u8> = Luma([255]);

/// Pixels of slack around a stencil that clipped rings may still reach.
const WINDOW_SLACK: f64 = 2.0;

/// Blend `overlay` onto `base` using the overlay alpha.
pub fn blend_pixel(base: Rgba<u8>, overlay: Rgba<u8>) -> Rgba<u8> {
    let alpha = overlay[3] as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;
    let mix = |b: u8, o: u8| (b as f32 * inv_alpha + o as f32 * alpha).round() as u8;

    Rgba([
        mix(base[0], overlay[0]),
        mix(base[1], overlay[1]),
        mix(base[2], overlay[2]),
        base[3].max(overlay[3]),
    ])
}

/// Coverage mask for one shape, positioned over a window of the canvas.
///
/// Shapes are rasterized into the mask first and painted onto the canvas in a
/// single blend, so overlapping strokes and fills never double their alpha.
#[derive(Debug, Clone)]
pub struct Stencil {
    origin_x: i32,
    origin_y: i32,
    mask: GrayImage,
}

impl Stencil {
    /// Stencil covering `points` plus `margin` pixels, clipped to the canvas.
    /// `None` when nothing of the shape would land on the canvas.
    pub fn around(points: &[Point], margin: f32, canvas_width: u32, canvas_height: u32) -> Option<Self> {
        let bbox = crate::algorithms::bounding_box_from_polygon(points)?;
        let margin = margin.max(0.0).ceil() as f64 + 1.0;

        let left = (bbox.x - margin).floor().max(0.0);
        let top = (bbox.y - margin).floor().max(0.0);
        let right = (bbox.max_x() + margin).ceil().min(canvas_width as f64);
        let bottom = (bbox.max_y() + margin).ceil().min(canvas_height as f64);
        if !(right > left && bottom > top) {
            return None;
        }

        Some(Self {
            origin_x: left as i32,
            origin_y: top as i32,
            mask: GrayImage::new((right - left) as u32, (bottom - top) as u32),
        })
    }

    fn to_local(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.origin_x as f64, y - self.origin_y as f64)
    }

    /// Local window vertices are clipped to; keeps pixel casts far from `i32` limits.
    fn window(&self) -> ((f64, f64), (f64, f64)) {
        (
            (-WINDOW_SLACK, -WINDOW_SLACK),
            (
                self.mask.width() as f64 + WINDOW_SLACK,
                self.mask.height() as f64 + WINDOW_SLACK,
            ),
        )
    }

    fn fill_local(&mut self, ring: &[(f64, f64)]) {
        let (min, max) = self.window();
        let pixels = clip_ring(ring, min, max)
            .into_iter()
            .map(|(x, y)| PixelPoint::new(x.round() as i32, y.round() as i32))
            .collect();
        fill_pixel_ring(&mut self.mask, pixels);
    }

    /// Fill the closed ring through `points`
    pub fn fill_ring(&mut self, points: &[Point]) {
        if !all_finite(points) {
            return;
        }
        let local: Vec<(f64, f64)> = points.iter().map(|p| self.to_local(p.x, p.y)).collect();
        self.fill_local(&local);
    }

    /// Outline the closed ring through `points` with a line `width` pixels wide
    pub fn stroke_ring(&mut self, points: &[Point], width: f32) {
        if points.len() < 2 || width <= 0.0 || !all_finite(points) {
            return;
        }
        let half = (width as f64 / 2.0).max(0.5);
        let (min, max) = self.window();

        for (index, start) in points.iter().enumerate() {
            let end = points[(index + 1) % points.len()];
            let (dx, dy) = (end.x - start.x, end.y - start.y);
            let length = dx.hypot(dy);
            if length > f64::EPSILON && length.is_finite() {
                let (nx, ny) = (-dy / length * half, dx / length * half);
                let quad = [
                    self.to_local(start.x + nx, start.y + ny),
                    self.to_local(end.x + nx, end.y + ny),
                    self.to_local(end.x - nx, end.y - ny),
                    self.to_local(start.x - nx, start.y - ny),
                ];
                self.fill_local(&quad);
            }

            // Round joins
            let (cx, cy) = self.to_local(start.x, start.y);
            let visible = cx >= min.0 - half && cx <= max.0 + half && cy >= min.1 - half && cy <= max.1 + half;
            if visible {
                draw_filled_circle_mut(
                    &mut self.mask,
                    (cx.round() as i32, cy.round() as i32),
                    half.round() as i32,
                    COVERED,
                );
            }
        }
    }

    /// Number of covered pixels
    pub fn coverage(&self) -> usize {
        self.mask.pixels().filter(|p| p[0] > 0).count()
    }

    /// Blend `color` onto every covered canvas pixel
    pub fn paint(&self, canvas: &mut RgbaImage, color: Rgba<u8>) {
        for (x, y, coverage) in self.mask.enumerate_pixels() {
            if coverage[0] == 0 {
                continue;
            }
            let (cx, cy) = (x + self.origin_x as u32, y + self.origin_y as u32);
            if cx < canvas.width() && cy < canvas.height() {
                let blended = blend_pixel(*canvas.get_pixel(cx, cy), color);
                canvas.put_pixel(cx, cy, blended);
            }
        }
    }
}

fn all_finite(points: &[Point]) -> bool {
    points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
}

/// Sutherland-Hodgman clip of a ring against the window `min..=max`.
///
/// The result fills the same pixels inside the window as the input ring.
fn clip_ring(ring: &[(f64, f64)], min: (f64, f64), max: (f64, f64)) -> Vec<(f64, f64)> {
    // (axis, bound, keep_greater)
    let edges = [(0, min.0, true), (0, max.0, false), (1, min.1, true), (1, max.1, false)];
    let coord = |p: (f64, f64), axis: usize| if axis == 0 { p.0 } else { p.1 };

    let mut output = ring.to_vec();
    for (axis, bound, keep_greater) in edges {
        let input = std::mem::take(&mut output);
        let inside = |p: (f64, f64)| {
            if keep_greater { coord(p, axis) >= bound } else { coord(p, axis) <= bound }
        };
        let crossing = |a: (f64, f64), b: (f64, f64)| {
            let t = (bound - coord(a, axis)) / (coord(b, axis) - coord(a, axis));
            let point = (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
            // Pin the clipped coordinate exactly onto the bound
            if axis == 0 { (bound, point.1) } else { (point.0, bound) }
        };

        for (index, &current) in input.iter().enumerate() {
            let previous = input[(index + input.len() - 1) % input.len()];
            match (inside(previous), inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.push(crossing(previous, current)),
                (false, true) => {
                    output.push(crossing(previous, current));
                    output.push(current);
                }
                (false, false) => {}
            }
        }
        if output.is_empty() {
            break;
        }
    }
    output
}

/// `draw_polygon_mut` rejects empty and explicitly closed rings, so repeated
/// vertices are dropped and shapes that collapse below three vertices skipped.
fn fill_pixel_ring(mask: &mut GrayImage, mut ring: Vec<PixelPoint<i32>>) {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() >= 3 {
        draw_polygon_mut(mask, &ring, COVERED);
    }
}

/// Fill a solid rectangle blended with `color`, clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x as i64 + width as i64).clamp(0, canvas.width() as i64) as u32;
    let y1 = (y as i64 + height as i64).clamp(0, canvas.height() as i64) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let blended = blend_pixel(*canvas.get_pixel(px, py), color);
            canvas.put_pixel(px, py, blended);
        }
    }
}

/// One-pixel rectangle outline, clipped to the canvas.
pub fn outline_rect(canvas: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    fill_rect(canvas, x, y, width, 1, color);
    fill_rect(canvas, x, y + height as i32 - 1, width, 1, color);
    fill_rect(canvas, x, y, 1, height, color);
    fill_rect(canvas, x + width as i32 - 1, y, 1, height, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn blend_respects_alpha() {
        let base = Rgba([0, 0, 0, 255]);
        assert_eq!(blend_pixel(base, Rgba([200, 100, 50, 255])), Rgba([200, 100, 50, 255]));
        assert_eq!(blend_pixel(base, Rgba([200, 100, 50, 0])), base);
        assert_eq!(blend_pixel(base, Rgba([200, 200, 200, 128]))[0], 100);
    }

    #[test]
    fn stencil_is_clipped_to_canvas() {
        let stencil = Stencil::around(&square(-50.0, -50.0, 60.0), 2.0, 20, 20).unwrap();
        assert_eq!((stencil.origin_x, stencil.origin_y), (0, 0));
        assert!(stencil.mask.width() <= 20 && stencil.mask.height() <= 20);

        assert!(Stencil::around(&square(100.0, 100.0, 5.0), 2.0, 20, 20).is_none());
        assert!(Stencil::around(&[], 2.0, 20, 20).is_none());
    }

    #[test]
    fn fill_and_paint_cover_the_interior() {
        let points = square(10.0, 10.0, 20.0);
        let mut stencil = Stencil::around(&points, 0.0, 50, 50).unwrap();
        stencil.fill_ring(&points);

        let mut canvas = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        stencil.paint(&mut canvas, Rgba([255, 0, 0, 255]));

        assert_eq!(canvas.get_pixel(20, 20), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(40, 40), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn stroke_leaves_the_interior_empty() {
        let points = square(10.0, 10.0, 30.0);
        let mut stencil = Stencil::around(&points, 3.0, 60, 60).unwrap();
        stencil.stroke_ring(&points, 3.0);

        let mut canvas = RgbaImage::from_pixel(60, 60, Rgba([0, 0, 0, 255]));
        stencil.paint(&mut canvas, Rgba([0, 255, 0, 255]));

        assert_eq!(canvas.get_pixel(25, 10), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(10, 25), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(25, 25), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn degenerate_rings_are_skipped() {
        let mut stencil = Stencil::around(&square(0.0, 0.0, 10.0), 0.0, 20, 20).unwrap();
        stencil.fill_ring(&[Point::new(1.0, 1.0), Point::new(1.2, 1.1), Point::new(1.0, 1.0)]);
        stencil.fill_ring(&square(2.0, 2.0, 0.2));
        assert_eq!(stencil.coverage(), 0);
    }

    #[test]
    fn far_off_canvas_vertices_are_clipped() {
        let huge = vec![Point::new(-3e9, -3e9), Point::new(3e9, -3e9), Point::new(10.0, 3e9)];
        let mut stencil = Stencil::around(&huge, 3.0, 50, 50).unwrap();
        stencil.fill_ring(&huge);
        stencil.stroke_ring(&huge, 3.0);

        // The triangle spans the whole canvas
        assert_eq!(stencil.coverage(), 50 * 50);
    }

    #[test]
    fn clipping_keeps_the_visible_part() {
        let window = ((0.0, 0.0), (10.0, 10.0));
        let inside = vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0)];
        assert_eq!(clip_ring(&inside, window.0, window.1), inside);

        let straddling = vec![(-10.0, 5.0), (5.0, 5.0), (5.0, 20.0)];
        let clipped = clip_ring(&straddling, window.0, window.1);
        assert!(clipped.iter().all(|&(x, y)| (0.0..=10.0).contains(&x) && (0.0..=10.0).contains(&y)));
        assert!(clipped.contains(&(5.0, 5.0)));

        assert!(clip_ring(&[(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)], window.0, window.1).is_empty());
    }

    #[test]
    fn non_finite_rings_are_ignored() {
        let mut stencil = Stencil::around(&square(0.0, 0.0, 10.0), 0.0, 20, 20).unwrap();
        let ring = vec![Point::new(0.0, 0.0), Point::new(f64::INFINITY, 0.0), Point::new(5.0, f64::NAN)];
        stencil.fill_ring(&ring);
        stencil.stroke_ring(&ring, 3.0);
        assert_eq!(stencil.coverage(), 0);
    }

    #[test]
    fn rect_helpers_clip() {
        let mut canvas = RgbaImage::new(10, 10);
        fill_rect(&mut canvas, -5, -5, 8, 8, Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(2, 2)[0], 255);
        assert_eq!(canvas.get_pixel(3, 3)[0], 0);

        outline_rect(&mut canvas, 5, 5, 20, 20, Rgba([9, 9, 9, 255]));
        assert_eq!(canvas.get_pixel(5, 9)[0], 9);
        assert_eq!(canvas.get_pixel(7, 7)[0], 0);
    }
}
