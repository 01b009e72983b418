use image::{GrayImage, Luma};

/// Binary ink map of a page region, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InkMask {
    width: usize,
    height: usize,
    ink: Vec<bool>,
}

impl InkMask {
    /// Pixels at or below `level` are ink
    pub fn from_gray(gray: &GrayImage, level: u8) -> Self {
        Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            ink: gray.pixels().map(|p| p.0[0] <= level).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Columns `x0..x1` of the mask
    pub fn columns(&self, x0: usize, x1: usize) -> Self {
        let x1 = x1.min(self.width);
        let x0 = x0.min(x1);
        let ink = self.ink.chunks(self.width.max(1)).flat_map(|row| row[x0..x1].iter().copied());
        Self { width: x1 - x0, height: self.height, ink: ink.collect() }
    }

    /// Ink pixel count of every column
    pub fn column_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.width];
        for row in self.ink.chunks(self.width.max(1)) {
            for (count, &ink) in counts.iter_mut().zip(row) {
                *count += u32::from(ink);
            }
        }
        counts
    }

    pub fn dilate_rows(&self, k: usize) -> Self {
        self.map_rows(k, Window::Any)
    }

    pub fn erode_rows(&self, k: usize) -> Self {
        self.map_rows(k, Window::All)
    }

    pub fn erode_columns(&self, k: usize) -> Self {
        let mut out = self.clone();
        let mut column = vec![false; self.height];
        let mut filtered = vec![false; self.height];
        for x in 0..self.width {
            for (y, cell) in column.iter_mut().enumerate() {
                *cell = self.ink[y * self.width + x];
            }
            filter_line(&column, k, Window::All, &mut filtered);
            for (y, &cell) in filtered.iter().enumerate() {
                out.ink[y * self.width + x] = cell;
            }
        }
        out
    }

    /// Ink as 255 on a 0 background
    pub fn to_luma(&self) -> GrayImage {
        let mut image = GrayImage::new(self.width as u32, self.height as u32);
        for (pixel, &ink) in image.pixels_mut().zip(&self.ink) {
            *pixel = Luma([if ink { 255 } else { 0 }]);
        }
        image
    }

    fn map_rows(&self, k: usize, window: Window) -> Self {
        let mut out = self.clone();
        if self.width == 0 {
            return out;
        }
        for (src, dst) in self.ink.chunks(self.width).zip(out.ink.chunks_mut(self.width)) {
            filter_line(src, k, window, dst);
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Window {
    Any,
    All,
}

/// Flat structuring element of length `k` anchored at `k / 2`; the part of
/// the window outside the line is ignored
fn filter_line(src: &[bool], k: usize, window: Window, dst: &mut [bool]) {
    let n = src.len();
    if n == 0 || k == 0 {
        dst.copy_from_slice(src);
        return;
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0usize);
    for &ink in src {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + usize::from(ink));
    }

    let anchor = k / 2;
    let reach = k - 1 - anchor;
    for (x, out) in dst.iter_mut().enumerate() {
        let lo = x.saturating_sub(anchor);
        let hi = (x + reach).min(n - 1);
        let count = prefix[hi + 1] - prefix[lo];
        *out = match window {
            Window::Any => count > 0,
            Window::All => count == hi + 1 - lo,
        };
    }
}

/// Centered moving average of length `k`, zero padded at both ends
pub(crate) fn moving_average(values: &[u32], k: usize) -> Vec<f32> {
    let n = values.len();
    if n == 0 || k == 0 {
        return vec![0.0; n];
    }
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0u64);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + u64::from(v));
    }

    let half = k / 2;
    (0..n)
        .map(|x| {
            let lo = x.saturating_sub(half);
            let hi = (x + (k - 1 - half)).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) as f32 / k as f32
        })
        .collect()
}
