//! Rasterizes a page's annotations onto its captured image.
//!
//! Every shape is first collected into a coverage mask and then blended once,
//! so overlapping parts of a translucent shape never darken twice.

use image::Rgba;
use scriptorium_core::{
    AnnotationSession, Color, MeasurementKind, PageAnnotation, PenProfile, Point, Rect,
};

use crate::RgbaImage;

const ANGLE_COLOR: Color = Color::rgb(220, 20, 60);
const UNDERLINE_WIDTH: f64 = 2.0;
const ANGLE_LINE_WIDTH: f64 = 2.0;
const COMMENT_MARKER: f64 = 8.0;
const COMMENT_COLOR: Color = Color::rgba(255, 200, 0, 0.8);

/// Draw everything on `page` of `session` into `image`.
///
/// `factor` converts viewer coordinates into image pixels.
pub(crate) fn draw_page(image: &mut RgbaImage, session: &AnnotationSession, page: usize, factor: f64) {
    let mut canvas = Canvas { image, factor };

    for kind in MeasurementKind::ALL {
        for length in session.lengths.measurements(kind, page) {
            canvas.fill_rect(length.rect, length.color);
        }
    }

    for annotation in session.annotations.page(page) {
        match annotation {
            PageAnnotation::Highlight { rect, color } => canvas.fill_rect(*rect, *color),
            PageAnnotation::Underline { start, end, color } => {
                let pen = PenProfile { width: UNDERLINE_WIDTH, height: UNDERLINE_WIDTH };
                canvas.stroke(&[*start, *end], pen, *color);
            }
            PageAnnotation::Trace(stroke) => canvas.stroke(&stroke.points, stroke.pen, stroke.color),
            PageAnnotation::Measure(angle) => {
                let pen = PenProfile { width: ANGLE_LINE_WIDTH, height: ANGLE_LINE_WIDTH };
                canvas.stroke(&angle.points, pen, ANGLE_COLOR);
            }
        }
    }

    for comment in session.comments.page(page) {
        let half = COMMENT_MARKER / 2.0;
        let at = comment.position();
        canvas.fill_rect(Rect::new(at.x - half, at.y - half, COMMENT_MARKER, COMMENT_MARKER), COMMENT_COLOR);
    }
}

struct Canvas<'a> {
    image: &'a mut RgbaImage,
    factor: f64,
}

impl Canvas<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = rect.scaled(self.factor);
        let Some(mut mask) = Mask::over(rect, self.image.width(), self.image.height()) else {
            return;
        };
        mask.cover(rect);
        mask.blend_into(self.image, color);
    }

    /// Drag a rectangular nib along `points`
    fn stroke(&mut self, points: &[Point], pen: PenProfile, color: Color) {
        let (nib_w, nib_h) = (pen.width * self.factor, pen.height * self.factor);
        if !(nib_w.is_finite() && nib_h.is_finite()) {
            return;
        }
        let nib = |center: Point| {
            Rect::new(center.x - nib_w / 2.0, center.y - nib_h / 2.0, nib_w, nib_h)
        };

        let scaled: Vec<Point> = points
            .iter()
            .map(|p| Point::new(p.x * self.factor, p.y * self.factor))
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();

        // Anything farther out than the nib cannot touch the image
        let visible = Rect::new(
            -nib_w,
            -nib_h,
            self.image.width() as f64 + 2.0 * nib_w,
            self.image.height() as f64 + 2.0 * nib_h,
        );
        let segments: Vec<(Point, Point)> = match scaled.as_slice() {
            [only] => clip_segment(*only, *only, visible).into_iter().collect(),
            _ => scaled
                .windows(2)
                .filter_map(|pair| clip_segment(pair[0], pair[1], visible))
                .collect(),
        };

        let Some(area) = bounding_rect(segments.iter().flat_map(|(a, b)| [*a, *b])) else {
            return;
        };
        let area = Rect::new(
            area.x - nib_w / 2.0,
            area.y - nib_h / 2.0,
            area.width + nib_w,
            area.height + nib_h,
        );
        let Some(mut mask) = Mask::over(area, self.image.width(), self.image.height()) else {
            return;
        };

        // One stamp per half nib, at most two per pixel
        let spacing = (nib_w.min(nib_h) / 2.0).max(0.5);
        for (from, to) in segments {
            let steps = (from.distance_to(&to) / spacing).ceil().max(1.0) as usize;
            for step in 0..=steps {
                let t = step as f64 / steps as f64;
                mask.cover(nib(lerp(from, to, t)));
            }
        }

        mask.blend_into(self.image, color);
    }
}

fn lerp(from: Point, to: Point, t: f64) -> Point {
    Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
}

fn bounding_rect(points: impl Iterator<Item = Point>) -> Option<Rect> {
    points.fold(None, |acc: Option<Rect>, p| {
        Some(match acc {
            None => Rect::at(p),
            Some(r) => {
                let (x0, y0) = (r.x.min(p.x), r.y.min(p.y));
                let (x1, y1) = ((r.x + r.width).max(p.x), (r.y + r.height).max(p.y));
                Rect::new(x0, y0, x1 - x0, y1 - y0)
            }
        })
    })
}

/// Liang-Barsky clipping of the segment `from..to` to `bounds`
fn clip_segment(from: Point, to: Point, bounds: Rect) -> Option<(Point, Point)> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if !(dx.is_finite() && dy.is_finite()) {
        return None;
    }

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, from.x - bounds.x),
        (dx, bounds.x + bounds.width - from.x),
        (-dy, from.y - bounds.y),
        (dy, bounds.y + bounds.height - from.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((lerp(from, to, t0), lerp(from, to, t1)))
}

/// Pixel span `[x0, x1) x [y0, y1)` of `rect` clamped to `width x height`
fn pixel_span(rect: Rect, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let clamp_x = |v: f64| v.clamp(0.0, width as f64) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, height as f64) as u32;
    (
        clamp_x(rect.x.floor()),
        clamp_x((rect.x + rect.width).ceil()),
        clamp_y(rect.y.floor()),
        clamp_y((rect.y + rect.height).ceil()),
    )
}

/// Coverage of one shape, limited to the part of the image it can reach
struct Mask {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    covered: Vec<bool>,
}

impl Mask {
    /// Mask for shapes inside `area`, or `None` when `area` misses the image
    fn over(area: Rect, image_width: u32, image_height: u32) -> Option<Self> {
        let (left, right, top, bottom) = pixel_span(area, image_width, image_height);
        if right <= left || bottom <= top {
            return None;
        }
        let len = (right - left) as usize * (bottom - top) as usize;
        Some(Self { left, top, right, bottom, covered: vec![false; len] })
    }

    fn stride(&self) -> usize {
        (self.right - self.left) as usize
    }

    /// Mark `rect` (image coordinates), clipped to the mask
    fn cover(&mut self, rect: Rect) {
        let (x0, x1, y0, y1) = pixel_span(
            Rect::new(rect.x - self.left as f64, rect.y - self.top as f64, rect.width, rect.height),
            self.right - self.left,
            self.bottom - self.top,
        );
        if x1 <= x0 {
            return;
        }
        let stride = self.stride();
        for y in y0..y1 {
            let row = y as usize * stride;
            self.covered[row + x0 as usize..row + x1 as usize].fill(true);
        }
    }

    fn blend_into(&self, image: &mut RgbaImage, color: Color) {
        let stride = self.stride();
        for (index, _) in self.covered.iter().enumerate().filter(|(_, covered)| **covered) {
            let x = self.left + (index % stride) as u32;
            let y = self.top + (index / stride) as u32;
            blend(image.get_pixel_mut(x, y), color);
        }
    }
}

/// Source-over compositing of `color` onto `pixel`
fn blend(pixel: &mut Rgba<u8>, color: Color) {
    let (r, g, b, a) = color.to_normalized();
    let src_a = a.clamp(0.0, 1.0);
    let dst_a = pixel.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }

    for (channel, src) in pixel.0[..3].iter_mut().zip([r, g, b]) {
        let dst = *channel as f32 / 255.0;
        let out = (src * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
        *channel = (out * 255.0).round() as u8;
    }
    pixel.0[3] = (out_a * 255.0).round() as u8;
}
