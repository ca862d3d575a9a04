//! Chart color themes.

use super::figure::Rgb;
use tracing::warn;

/// Colors shared by every chart of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Rgb,
    pub plot_background: Rgb,
    pub grid: Rgb,
    pub axis: Rgb,
    pub text: Rgb,
    /// Cycle used for pie slices.
    pub palette: [Rgb; 10],
}

const TAB10: [Rgb; 10] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
    Rgb(188, 189, 34),
    Rgb(23, 190, 207),
];

impl Theme {
    /// Resolve a theme by name. Unknown names fall back to the default.
    pub fn named(name: &str) -> Self {
        match name.trim() {
            "seaborn-v0_8-darkgrid" | "seaborn-darkgrid" | "darkgrid" => Self::darkgrid(),
            "seaborn-v0_8-whitegrid" | "seaborn-whitegrid" | "whitegrid" => Self {
                grid: Rgb(221, 221, 221),
                plot_background: Rgb::WHITE,
                ..Self::darkgrid()
            },
            "ggplot" => Self {
                plot_background: Rgb(229, 229, 229),
                ..Self::darkgrid()
            },
            "dark_background" => Self {
                background: Rgb::BLACK,
                plot_background: Rgb::BLACK,
                grid: Rgb(68, 68, 68),
                axis: Rgb::WHITE,
                text: Rgb::WHITE,
                palette: TAB10,
            },
            "classic" | "default" => Self::classic(),
            other => {
                warn!("Unknown chart style '{}', using default", other);
                Self::darkgrid()
            }
        }
    }

    fn darkgrid() -> Self {
        Self {
            background: Rgb::WHITE,
            plot_background: Rgb(234, 234, 242),
            grid: Rgb::WHITE,
            axis: Rgb(234, 234, 242),
            text: Rgb(38, 38, 38),
            palette: TAB10,
        }
    }

    fn classic() -> Self {
        Self {
            background: Rgb::WHITE,
            plot_background: Rgb::WHITE,
            grid: Rgb(221, 221, 221),
            axis: Rgb::BLACK,
            text: Rgb::BLACK,
            palette: TAB10,
        }
    }

    pub fn slice_color(&self, index: usize) -> Rgb {
        self.palette[index % self.palette.len()]
    }
}

/// Fixed series colors, independent of the theme.
pub mod colors {
    use super::Rgb;

    /// Top projects.
    pub const SKY_BLUE: Rgb = Rgb(135, 206, 235);
    /// Single-project fallback bar.
    pub const STEEL_BLUE: Rgb = Rgb(70, 130, 180);
    /// Size histogram.
    pub const PURPLE: Rgb = Rgb(128, 0, 128);
    /// Growth lines.
    pub const SERIES: Rgb = Rgb(31, 119, 180);
    /// Dashboard panels.
    pub const TEAL: Rgb = Rgb(0, 128, 128);
    pub const INDIGO: Rgb = Rgb(75, 0, 130);
    pub const ALICE_BLUE: Rgb = Rgb(240, 248, 255);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_themes() {
        assert_eq!(Theme::named("classic").plot_background, Rgb::WHITE);
        assert_eq!(Theme::named("dark_background").text, Rgb::WHITE);
        assert_eq!(
            Theme::named("seaborn-v0_8-darkgrid").plot_background,
            Rgb(234, 234, 242)
        );
        assert_eq!(Theme::named("no-such-style"), Theme::named("seaborn-v0_8-darkgrid"));
    }

    #[test]
    fn test_slice_colors_cycle() {
        let theme = Theme::named("classic");
        assert_eq!(theme.slice_color(0), theme.slice_color(10));
        assert_ne!(theme.slice_color(0), theme.slice_color(1));
    }
}
