//! Editor parameters and their `key=value` settings file.

use std::path::Path;

use crate::color::{Swatch, default_palette, parse_palette};
use crate::error::Result;
use crate::geometry::Point;
use crate::tools::ToolKind;

/// Construction parameters for an [`Editor`](crate::editor::Editor).
#[derive(Clone, Debug, PartialEq)]
pub struct EditorParams {
    pub width: u32,
    pub height: u32,
    /// Page position of the drawing area's top-left corner.
    pub origin: Point,
    pub background_color: Swatch,
    pub grid_step: f32,
    pub default_swatch: Swatch,
    pub default_tool: ToolKind,
    pub swatches: Vec<Swatch>,
    pub grid_enabled: bool,
    pub tablet_support: bool,
}

impl Default for EditorParams {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            origin: Point::new(0.0, 0.0),
            background_color: Swatch::WHITE,
            grid_step: 20.0,
            default_swatch: Swatch::BLACK,
            default_tool: ToolKind::Brush,
            swatches: default_palette(),
            grid_enabled: false,
            tablet_support: true,
        }
    }
}

impl EditorParams {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self { width, height, ..Self::default() }
    }

    /// Parse `key = value` lines. Unknown keys and values that don't parse
    /// leave the default in place.
    pub fn from_cfg(content: &str) -> Self {
        let mut p = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        p.width = v;
                    }
                }
                "height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        p.height = v;
                    }
                }
                "origin_x" => p.origin.x = val.parse().unwrap_or(p.origin.x),
                "origin_y" => p.origin.y = val.parse().unwrap_or(p.origin.y),
                "background_color" => {
                    if let Ok(c) = val.parse() {
                        p.background_color = c;
                    }
                }
                "grid_step" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v > 0.0
                    {
                        p.grid_step = v;
                    }
                }
                "default_swatch" => {
                    if let Ok(c) = val.parse() {
                        p.default_swatch = c;
                    }
                }
                "default_tool" => {
                    if let Ok(t) = val.parse() {
                        p.default_tool = t;
                    }
                }
                "swatches" => {
                    let parsed = parse_palette(val.split(','));
                    if !parsed.is_empty() {
                        p.swatches = parsed;
                    }
                }
                "grid" => p.grid_enabled = val == "true",
                "tablet_support" => p.tablet_support = val == "true",
                _ => {}
            }
        }
        p
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_cfg(&content))
    }

    pub fn to_cfg(&self) -> String {
        let swatches: Vec<String> = self.swatches.iter().map(|s| s.to_hex()).collect();
        let mut out = String::new();
        out.push_str(&format!("width={}\n", self.width));
        out.push_str(&format!("height={}\n", self.height));
        out.push_str(&format!("origin_x={}\n", self.origin.x));
        out.push_str(&format!("origin_y={}\n", self.origin.y));
        out.push_str(&format!("background_color={}\n", self.background_color.to_hex()));
        out.push_str(&format!("grid_step={}\n", self.grid_step));
        out.push_str(&format!("default_swatch={}\n", self.default_swatch.to_hex()));
        out.push_str(&format!("default_tool={}\n", self.default_tool));
        out.push_str(&format!("swatches={}\n", swatches.join(",")));
        out.push_str(&format!("grid={}\n", self.grid_enabled));
        out.push_str(&format!("tablet_support={}\n", self.tablet_support));
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_cfg())?;
        Ok(())
    }
}
