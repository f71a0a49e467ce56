// Gameplay tuning for the arena itself.

/// Display colours handed out to ships in join order.
pub const SHIP_COLORS: [&str; 8] = [
    "#ff4d4d", "#4dc3ff", "#7dff4d", "#ffd24d", "#c44dff", "#ff8c4d", "#4dffd2", "#ff4da6",
];

#[derive(Debug, Clone, Copy)]
pub struct WorldTuning {
    /// Width of the toroidal world in pixels.
    pub width: f32,

    /// Height of the toroidal world in pixels.
    pub height: f32,

    pub palette: &'static [&'static str],
}

impl WorldTuning {
    /// Colour for the ship joining when `roster_len` ships are already live.
    pub fn color_for(&self, roster_len: usize) -> &'static str {
        if self.palette.is_empty() {
            return "#ffffff";
        }
        self.palette[roster_len % self.palette.len()]
    }
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            palette: &SHIP_COLORS,
        }
    }
}
