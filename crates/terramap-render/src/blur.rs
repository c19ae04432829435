/// Separable box blur of a `width` x `height` plane, in place.
///
/// Each pass slides a window of `range` samples centered on the current one, clamped to the plane so edge samples average
/// over fewer neighbors. Zero samples mean "no data" and are left out of both the sum and the count. A window with no data
/// produces zero.
pub fn box_blur(plane: &mut [f32], width: usize, height: usize, range: usize) {
    assert_eq!(plane.len(), width * height, "plane has wrong sample count");
    if range <= 1 || plane.is_empty() {
        return;
    }
    let mut line = Vec::with_capacity(width.max(height));

    for y in 0..height {
        line.clear();
        line.extend_from_slice(&plane[y * width..(y + 1) * width]);
        blur_line(&line, range, |x, v| plane[y * width + x] = v);
    }
    for x in 0..width {
        line.clear();
        line.extend((0..height).map(|y| plane[y * width + x]));
        blur_line(&line, range, |y, v| plane[y * width + x] = v);
    }
}

fn blur_line(line: &[f32], range: usize, mut write: impl FnMut(usize, f32)) {
    let n = line.len();
    let behind = (range - 1) / 2;
    let ahead = range - 1 - behind;

    let mut window = Window::default();
    for &v in &line[..ahead.min(n)] {
        window.push(v);
    }
    for i in 0..n {
        if let Some(&entering) = line.get(i + ahead) {
            window.push(entering);
        }
        if i > behind {
            window.pop(line[i - behind - 1]);
        }
        write(i, window.mean());
    }
}

/// Running sum over the nonzero samples of a window.
#[derive(Default)]
struct Window {
    sum: f64,
    count: u32,
}

impl Window {
    fn push(&mut self, v: f32) {
        if v != 0.0 {
            self.sum += v as f64;
            self.count += 1;
        }
    }

    fn pop(&mut self, v: f32) {
        if v != 0.0 {
            self.sum -= v as f64;
            self.count -= 1;
        }
    }

    fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
