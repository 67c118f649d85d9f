use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::model::{self, Rgb, GROUND};

// Each cell carries a 2x4 braille block. Cells are the logical units; the
// sub-pixel grid is the backing buffer all geometry is rasterized into.
const SUB_X: usize = 2;
const SUB_Y: usize = 4;

const RAY_COUNT: usize = 12;
const ORBIT_GUIDE_OFFSET: f64 = 6.0;
const ORBIT_DASH_LEN: f64 = 6.0;

const RAY_TINT: Rgb = Rgb::new(255, 244, 214);
const GUIDE_TINT: Rgb = Rgb::new(120, 130, 140);
const OBSERVER_TINT: Rgb = Rgb::new(235, 235, 235);

const ATMOSPHERE_LABEL: &str = "Atmosphere Boundary";
const OBSERVER_LABEL: &str = "Observer";

/// Frame geometry in sub-pixel units, derived from the logical cell size.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Layout {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) observer_x: f64,
    pub(crate) observer_y: f64,
    pub(crate) orbit_radius: f64,
}

impl Layout {
    pub(crate) fn fit(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            observer_x: width / 2.0,
            // Horizon line at 87% of the surface height.
            observer_y: height * 0.87,
            // Size-fitted so the arc stays visible at any aspect ratio.
            orbit_radius: (0.45 * width).min(0.75 * height),
        }
    }

    pub(crate) fn sun_position(&self, angle: f64) -> (f64, f64) {
        let theta = std::f64::consts::PI - angle.to_radians();
        (
            self.observer_x + self.orbit_radius * theta.cos(),
            self.observer_y - self.orbit_radius * theta.sin(),
        )
    }

    pub(crate) fn sun_radius(&self) -> f64 {
        (0.035 * self.width).max(3.0)
    }
}

/// Rays stop once the disk has dropped more than its own radius below the
/// horizon line.
pub(crate) fn rays_visible(sun_y: f64, horizon_y: f64, tolerance: f64) -> bool {
    sun_y <= horizon_y + tolerance
}

pub(crate) fn atmosphere_label_row(layout: &Layout) -> usize {
    let apex_y = layout.observer_y - (layout.orbit_radius + ORBIT_GUIDE_OFFSET);
    let row = (apex_y / SUB_Y as f64).floor() as i64 - 1;
    row.max(0) as usize
}

// Alpha-accumulating overlay for the bright features (sun, rays, guide,
// marker); the sky gradient itself goes straight to cell backgrounds.
struct Overlay {
    w: usize,
    h: usize,
    color: Vec<Rgb>,
    alpha: Vec<f64>,
}

impl Overlay {
    fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            color: vec![Rgb::new(0, 0, 0); w * h],
            alpha: vec![0.0; w * h],
        }
    }

    fn blend(&mut self, x: i64, y: i64, tint: Rgb, a: f64) {
        if x < 0 || y < 0 || x >= self.w as i64 || y >= self.h as i64 || a <= 0.0 {
            return;
        }
        let i = y as usize * self.w + x as usize;
        let a = a.min(1.0);
        let prev = self.alpha[i];
        let out = a + prev * (1.0 - a);
        if out <= f64::EPSILON {
            return;
        }
        let t = a / out;
        self.color[i] = self.color[i].lerp(tint, t);
        self.alpha[i] = out;
    }
}

fn bayer_2x4(x: usize, y: usize) -> f64 {
    const M: [[u8; 2]; 4] = [[0, 4], [6, 2], [1, 5], [7, 3]];
    (M[y % 4][x % 2] as f64 + 0.5) / 8.0
}

fn braille_bit(dx: usize, dy: usize) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

fn braille_char(mask: u8) -> char {
    char::from_u32(0x2800 + mask as u32).unwrap_or(' ')
}

fn draw_sun(overlay: &mut Overlay, layout: &Layout, angle: f64) {
    let (sx, sy) = layout.sun_position(angle);
    let r = layout.sun_radius();
    let f = model::sunset_factor(angle);
    let tint = model::sun_color(angle);

    // Halo widens and softens as the sun drops.
    let glow_span = r * (1.6 + 2.4 * f);
    let reach = (r + glow_span).ceil() as i64;
    let cx = sx.round() as i64;
    let cy = sy.round() as i64;

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            if d <= r {
                overlay.blend(cx + dx, cy + dy, tint, 1.0);
            } else if d <= r + glow_span {
                let g = 1.0 - (d - r) / glow_span;
                overlay.blend(cx + dx, cy + dy, tint, g * g * 0.55);
            }
        }
    }
}

fn draw_rays(overlay: &mut Overlay, layout: &Layout, angle: f64) {
    let (sx, sy) = layout.sun_position(angle);
    if !rays_visible(sy, layout.observer_y, layout.sun_radius()) {
        return;
    }

    let f = model::sunset_factor(angle);
    // Crisp at noon, fading toward dusk.
    let bundle = 0.5 * (1.0 - 0.8 * f);
    if bundle <= 0.0 {
        return;
    }

    let spread = layout.width * 0.28;
    for i in 0..RAY_COUNT {
        let offset = (i as f64 - (RAY_COUNT as f64 - 1.0) / 2.0) / (RAY_COUNT as f64 - 1.0);
        let tx = layout.observer_x + offset * spread;
        let ty = layout.observer_y;

        let len = ((tx - sx).powi(2) + (ty - sy).powi(2)).sqrt().max(1.0);
        let steps = len.ceil() as usize;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let x = sx + (tx - sx) * t;
            let y = sy + (ty - sy) * t;
            // Warm near the sun, fully transparent at the ground end.
            overlay.blend(x.round() as i64, y.round() as i64, RAY_TINT, bundle * (1.0 - t));
        }
    }
}

fn draw_orbit_guide(overlay: &mut Overlay, layout: &Layout) {
    let r = layout.orbit_radius + ORBIT_GUIDE_OFFSET;
    let steps = (std::f64::consts::PI * r).ceil() as usize;
    for s in 0..=steps {
        let theta = std::f64::consts::PI * s as f64 / steps as f64;
        let arc_len = theta * r;
        if (arc_len / ORBIT_DASH_LEN) as i64 % 2 != 0 {
            continue;
        }
        let x = layout.observer_x + r * theta.cos();
        let y = layout.observer_y - r * theta.sin();
        overlay.blend(x.round() as i64, y.round() as i64, GUIDE_TINT, 0.55);
    }
}

fn draw_observer(overlay: &mut Overlay, layout: &Layout) {
    let cx = layout.observer_x.round() as i64;
    let cy = layout.observer_y.round() as i64;
    for dy in -2i64..=2 {
        for dx in -2i64..=2 {
            if dx * dx + dy * dy <= 5 {
                overlay.blend(cx + dx, cy + dy, OBSERVER_TINT, 0.95);
            }
        }
    }
}

fn base_color(layout: &Layout, colors: model::SkyColors, y: f64) -> Rgb {
    if y < layout.observer_y {
        colors.top.lerp(colors.horizon, y / layout.observer_y)
    } else {
        GROUND
    }
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

fn put_text(cells: &mut [Cell], cols: usize, rows: usize, row: usize, text: &str, fg: Color) {
    if row >= rows {
        return;
    }
    let start = (cols.saturating_sub(text.chars().count())) / 2;
    for (i, ch) in text.chars().enumerate() {
        let col = start + i;
        if col >= cols {
            break;
        }
        let cell = &mut cells[row * cols + col];
        cell.ch = ch;
        cell.fg = fg;
    }
}

/// Produce one frame for a panel of `cols` x `rows` cells. A zero-extent
/// panel skips the draw entirely.
pub(crate) fn render(angle: f64, mono: bool, cols: u16, rows: u16) -> Vec<Line<'static>> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let cols = cols as usize;
    let rows = rows as usize;
    let w = cols * SUB_X;
    let h = rows * SUB_Y;
    let layout = Layout::fit(w as f64, h as f64);
    let colors = model::sky_colors(angle);

    let mut overlay = Overlay::new(w, h);
    draw_orbit_guide(&mut overlay, &layout);
    draw_rays(&mut overlay, &layout, angle);
    draw_sun(&mut overlay, &layout, angle);
    draw_observer(&mut overlay, &layout);

    let mut cells = vec![
        Cell {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Reset,
        };
        cols * rows
    ];

    for cy in 0..rows {
        for cx in 0..cols {
            let center_y = (cy * SUB_Y) as f64 + SUB_Y as f64 / 2.0;
            let bg = base_color(&layout, colors, center_y);

            let mut mask: u8 = 0;
            let mut tint = Rgb::new(0, 0, 0);
            let mut weight = 0.0;
            for dy in 0..SUB_Y {
                for dx in 0..SUB_X {
                    let px = cx * SUB_X + dx;
                    let py = cy * SUB_Y + dy;
                    let i = py * w + px;
                    let a = overlay.alpha[i];
                    if a > bayer_2x4(px, py) * 0.85 + 0.04 {
                        mask |= braille_bit(dx, dy);
                        let new_weight = weight + a;
                        tint = tint.lerp(overlay.color[i], a / new_weight);
                        weight = new_weight;
                    }
                }
            }

            let cell = &mut cells[cy * cols + cx];
            if mono {
                // Dot density stands in for the gradient when colors are off.
                let mut dither: u8 = 0;
                for dy in 0..SUB_Y {
                    for dx in 0..SUB_X {
                        if bg.luma() > bayer_2x4(cx * SUB_X + dx, cy * SUB_Y + dy) {
                            dither |= braille_bit(dx, dy);
                        }
                    }
                }
                let combined = mask | dither;
                cell.ch = if combined == 0 { ' ' } else { braille_char(combined) };
                cell.fg = if mask != 0 { Color::White } else { Color::Gray };
                cell.bg = Color::Reset;
            } else if mask != 0 {
                cell.ch = braille_char(mask);
                cell.fg = tint.to_color();
                cell.bg = bg.to_color();
            } else {
                cell.ch = ' ';
                cell.fg = Color::Reset;
                cell.bg = bg.to_color();
            }
        }
    }

    let label_fg = if mono { Color::White } else { GUIDE_TINT.to_color() };
    put_text(&mut cells, cols, rows, atmosphere_label_row(&layout), ATMOSPHERE_LABEL, label_fg);
    let observer_row = ((layout.observer_y / SUB_Y as f64) as usize + 1).min(rows.saturating_sub(1));
    let observer_fg = if mono { Color::White } else { OBSERVER_TINT.to_color() };
    put_text(&mut cells, cols, rows, observer_row, OBSERVER_LABEL, observer_fg);

    // Run-grouped spans, one line per cell row.
    let mut lines = Vec::with_capacity(rows);
    for cy in 0..rows {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut buf = String::new();
        let mut style = Style::default();
        for cx in 0..cols {
            let cell = cells[cy * cols + cx];
            let cell_style = Style::default().fg(cell.fg).bg(cell.bg);
            if cell_style != style && !buf.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut buf), style));
            }
            style = cell_style;
            buf.push(cell.ch);
        }
        if !buf.is_empty() {
            spans.push(Span::styled(buf, style));
        }
        lines.push(Line::from(spans));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn sun_tracks_the_arc_endpoints() {
        let layout = Layout::fit(200.0, 120.0);

        let (x, y) = layout.sun_position(0.0);
        assert_abs_diff_eq!(x, layout.observer_x - layout.orbit_radius, epsilon = 1e-9);
        assert_abs_diff_eq!(y, layout.observer_y, epsilon = 1e-9);

        let (x, y) = layout.sun_position(90.0);
        assert_abs_diff_eq!(x, layout.observer_x, epsilon = 1e-9);
        assert_abs_diff_eq!(y, layout.observer_y - layout.orbit_radius, epsilon = 1e-9);

        let (x, y) = layout.sun_position(180.0);
        assert_abs_diff_eq!(x, layout.observer_x + layout.orbit_radius, epsilon = 1e-9);
        assert_abs_diff_eq!(y, layout.observer_y, epsilon = 1e-9);
    }

    #[test]
    fn geometry_scales_with_the_surface() {
        // Same logical position at 2x the surface: every pixel offset doubles.
        let small = Layout::fit(180.0, 100.0);
        let large = Layout::fit(360.0, 200.0);
        for angle in [10.0, 45.0, 90.0, 135.0, 170.0] {
            let (sx, sy) = small.sun_position(angle);
            let (lx, ly) = large.sun_position(angle);
            assert_relative_eq!(lx - large.observer_x, 2.0 * (sx - small.observer_x), epsilon = 1e-9);
            assert_relative_eq!(ly - large.observer_y, 2.0 * (sy - small.observer_y), epsilon = 1e-9);
        }
    }

    #[test]
    fn orbit_radius_is_size_fitted() {
        // Wide surface: width would push the arc off the top; height wins.
        let wide = Layout::fit(1000.0, 100.0);
        assert_abs_diff_eq!(wide.orbit_radius, 75.0, epsilon = 1e-9);
        // Tall surface: width wins.
        let tall = Layout::fit(100.0, 1000.0);
        assert_abs_diff_eq!(tall.orbit_radius, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn rays_gate_on_the_horizon_with_tolerance() {
        assert!(rays_visible(50.0, 100.0, 4.0));
        assert!(rays_visible(103.0, 100.0, 4.0));
        assert!(!rays_visible(105.0, 100.0, 4.0));
    }

    #[test]
    fn zero_extent_surface_skips_the_draw() {
        assert!(render(90.0, false, 0, 20).is_empty());
        assert!(render(90.0, false, 60, 0).is_empty());
    }

    #[test]
    fn frame_covers_the_panel_exactly() {
        let lines = render(45.0, false, 60, 18);
        assert_eq!(lines.len(), 18);
        for line in &lines {
            let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
            assert_eq!(chars, 60);
        }
    }

    #[test]
    fn mono_frame_has_the_same_shape() {
        let lines = render(135.0, true, 40, 12);
        assert_eq!(lines.len(), 12);
        for line in &lines {
            let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
            assert_eq!(chars, 40);
        }
    }

    #[test]
    fn atmosphere_label_clamps_to_the_top_edge() {
        // Arc apex above the surface top on a short panel: label sits at row 0.
        let cramped = Layout::fit(400.0, 24.0);
        assert_eq!(atmosphere_label_row(&cramped), 0);

        // Roomy panel: label sits above the apex, not at the edge.
        let roomy = Layout::fit(200.0, 400.0);
        assert!(atmosphere_label_row(&roomy) > 0);
    }
}
