use ratatui::style::Color;

pub(crate) const ANGLE_MIN: f64 = 0.0;
pub(crate) const ANGLE_MAX: f64 = 180.0;
pub(crate) const ANGLE_STEP: f64 = 0.5;
pub(crate) const ANGLE_STEP_COARSE: f64 = 5.0;

// Elevation floor: keeps 1/sin from diverging near the horizons.
// A policy bound (caps the path factor at 1/sin 5 deg ~ 11.47), not physics.
const MIN_ELEVATION_DEG: f64 = 5.0;

/// Angular distance from the nearer horizon, folding morning and afternoon
/// onto the same [0, 90] range.
pub(crate) fn effective_angle(angle: f64) -> f64 {
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

pub(crate) fn clamped_angle(angle: f64) -> f64 {
    effective_angle(angle).max(MIN_ELEVATION_DEG)
}

/// Relative atmosphere thickness along the line of sight versus the zenith
/// path, approximated as 1/sin(elevation).
pub(crate) fn path_length_factor(angle: f64) -> f64 {
    1.0 / clamped_angle(angle).to_radians().sin()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Sunrise,
    Morning,
    Midday,
    Afternoon,
    Sunset,
}

impl Phase {
    /// Labeled on the raw (unfolded) angle, so morning and afternoon stay
    /// distinct even though the physics is symmetric.
    pub(crate) fn of(angle: f64) -> Self {
        if angle < 20.0 {
            Phase::Sunrise
        } else if angle < 70.0 {
            Phase::Morning
        } else if angle < 110.0 {
            Phase::Midday
        } else if angle < 160.0 {
            Phase::Afternoon
        } else {
            Phase::Sunset
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Phase::Sunrise => "Sunrise",
            Phase::Morning => "Morning",
            Phase::Midday => "Midday",
            Phase::Afternoon => "Afternoon",
            Phase::Sunset => "Sunset",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Band {
    pub(crate) name: &'static str,
    pub(crate) wavelength_nm: f64,
    pub(crate) color: Color,
}

// Display order, not sorted order.
pub(crate) const BANDS: [Band; 3] = [
    Band {
        name: "Blue",
        wavelength_nm: 450.0,
        color: Color::Rgb(84, 142, 255),
    },
    Band {
        name: "Green",
        wavelength_nm: 550.0,
        color: Color::Rgb(96, 200, 120),
    },
    Band {
        name: "Red",
        wavelength_nm: 650.0,
        color: Color::Rgb(240, 92, 76),
    },
];

#[derive(Clone, Copy, Debug)]
pub(crate) struct BandIntensity {
    pub(crate) band: Band,
    pub(crate) intensity: f64,
}

/// Rayleigh proportionality (1/lambda^4), normalized so the shortest band
/// reads 100. Independent of the sun angle; compute once, keep as a table.
pub(crate) fn scattering_table() -> [BandIntensity; 3] {
    let shortest = BANDS[0].wavelength_nm;
    BANDS.map(|band| BandIntensity {
        band,
        intensity: (shortest / band.wavelength_nm).powi(4) * 100.0,
    })
}

/// Cubic ease toward the horizons: negligible within ~45 deg of noon,
/// sharpening fast near 0/180. A stylization, not a measured model.
pub(crate) fn sunset_factor(angle: f64) -> f64 {
    (((angle - 90.0).abs() / 90.0).powi(3)).min(1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub(crate) fn luma(self) -> f64 {
        (0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64) / 255.0
    }

    pub(crate) fn to_color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}

pub(crate) const TOP_NOON: Rgb = Rgb::new(56, 110, 208);
pub(crate) const TOP_DUSK: Rgb = Rgb::new(22, 24, 72);
pub(crate) const HORIZON_NOON: Rgb = Rgb::new(168, 214, 238);
pub(crate) const HORIZON_DUSK: Rgb = Rgb::new(255, 122, 66);
pub(crate) const GROUND: Rgb = Rgb::new(30, 28, 26);
const SUN_HIGH: Rgb = Rgb::new(255, 238, 170);
const SUN_LOW: Rgb = Rgb::new(255, 126, 64);

#[derive(Clone, Copy, Debug)]
pub(crate) struct SkyColors {
    pub(crate) top: Rgb,
    pub(crate) horizon: Rgb,
}

pub(crate) fn sky_colors(angle: f64) -> SkyColors {
    let f = sunset_factor(angle);
    SkyColors {
        top: TOP_NOON.lerp(TOP_DUSK, f),
        horizon: HORIZON_NOON.lerp(HORIZON_DUSK, f),
    }
}

/// Two-valued switch, deliberately not interpolated: the disk snaps to its
/// low-sun color once the angle is more than 70 deg off noon.
pub(crate) fn sun_color(angle: f64) -> Rgb {
    if (angle - 90.0).abs() <= 70.0 {
        SUN_HIGH
    } else {
        SUN_LOW
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn effective_angle_is_symmetric_about_noon() {
        for i in 0..=360 {
            let a = i as f64 * 0.5;
            assert_abs_diff_eq!(effective_angle(a), effective_angle(180.0 - a), epsilon = 1e-12);
        }
    }

    #[test]
    fn path_length_is_one_at_noon_and_bounded_by_the_floor() {
        assert_abs_diff_eq!(path_length_factor(90.0), 1.0, epsilon = 1e-12);

        let ceiling = 1.0 / 5.0_f64.to_radians().sin();
        for i in 0..=360 {
            let a = i as f64 * 0.5;
            let p = path_length_factor(a);
            assert!(p >= 1.0, "path factor below 1 at {a}");
            assert!(p <= ceiling + 1e-9, "path factor above 1/sin(5 deg) at {a}");
        }
    }

    #[test]
    fn path_length_never_increases_with_elevation() {
        let mut prev = path_length_factor(5.0);
        let mut a = 5.0;
        while a < 90.0 {
            a += 0.5;
            let p = path_length_factor(a);
            assert!(p <= prev + 1e-12, "path factor rose between {} and {a}", a - 0.5);
            prev = p;
        }
    }

    #[test]
    fn scattering_table_matches_the_inverse_fourth_power_law() {
        let table = scattering_table();
        assert_eq!(table[0].band.name, "Blue");
        assert_eq!(table[1].band.name, "Green");
        assert_eq!(table[2].band.name, "Red");

        assert_abs_diff_eq!(table[0].intensity, 100.0, epsilon = 1e-12);
        assert!(table[2].intensity < table[1].intensity);
        assert!(table[1].intensity < table[0].intensity);

        let ratio = table[0].intensity / table[2].intensity;
        assert_relative_eq!(ratio, (650.0_f64 / 450.0).powi(4), epsilon = 1e-9);
    }

    #[test]
    fn sunset_factor_endpoints_and_monotonicity() {
        assert_abs_diff_eq!(sunset_factor(90.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sunset_factor(0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sunset_factor(180.0), 1.0, epsilon = 1e-12);

        let mut prev = sunset_factor(90.0);
        for i in 1..=180 {
            let a = 90.0 + i as f64 * 0.5;
            let f = sunset_factor(a);
            assert!(f >= prev - 1e-12, "sunset factor fell between steps near {a}");
            assert!((0.0..=1.0).contains(&f));
            prev = f;
        }
    }

    #[test]
    fn noon_scenario() {
        assert_eq!(Phase::of(90.0), Phase::Midday);
        assert_abs_diff_eq!(path_length_factor(90.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sunset_factor(90.0), 0.0, epsilon = 1e-12);
        assert_eq!(sun_color(90.0), SUN_HIGH);
    }

    #[test]
    fn low_sun_scenarios_match_by_symmetry() {
        assert_abs_diff_eq!(effective_angle(5.0), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(clamped_angle(5.0), 5.0, epsilon = 1e-12);
        let expected = 1.0 / 5.0_f64.to_radians().sin();
        assert_relative_eq!(path_length_factor(5.0), expected, epsilon = 1e-9);
        assert_eq!(Phase::of(5.0), Phase::Sunrise);

        assert_abs_diff_eq!(effective_angle(175.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(path_length_factor(175.0), path_length_factor(5.0), epsilon = 1e-12);
        assert_eq!(Phase::of(175.0), Phase::Sunset);
    }

    #[test]
    fn phase_boundaries_sit_on_the_raw_angle() {
        assert_eq!(Phase::of(19.9), Phase::Sunrise);
        assert_eq!(Phase::of(20.0), Phase::Morning);
        assert_eq!(Phase::of(69.9), Phase::Morning);
        assert_eq!(Phase::of(70.0), Phase::Midday);
        assert_eq!(Phase::of(109.9), Phase::Midday);
        assert_eq!(Phase::of(110.0), Phase::Afternoon);
        assert_eq!(Phase::of(159.9), Phase::Afternoon);
        assert_eq!(Phase::of(160.0), Phase::Sunset);
    }

    #[test]
    fn sun_color_snaps_at_seventy_degrees_off_noon() {
        assert_eq!(sun_color(20.0), SUN_HIGH);
        assert_eq!(sun_color(160.0), SUN_HIGH);
        assert_eq!(sun_color(19.5), SUN_LOW);
        assert_eq!(sun_color(160.5), SUN_LOW);
    }

    #[test]
    fn formulas_tolerate_out_of_range_input() {
        // The UI clamps to [0, 180]; the math must still behave if it didn't.
        for a in [-30.0, 200.0, 1e6] {
            let _ = effective_angle(a);
            assert!(path_length_factor(a).is_finite());
            let f = sunset_factor(a);
            assert!((0.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn sky_colors_interpolate_between_the_fixed_endpoints() {
        let noon = sky_colors(90.0);
        assert_eq!(noon.top, TOP_NOON);
        assert_eq!(noon.horizon, HORIZON_NOON);

        let dusk = sky_colors(180.0);
        assert_eq!(dusk.top, TOP_DUSK);
        assert_eq!(dusk.horizon, HORIZON_DUSK);

        // Near noon the cubic keeps the shift negligible.
        let late_morning = sky_colors(60.0);
        assert!(late_morning.top.b >= TOP_NOON.b - 8);
    }
}
