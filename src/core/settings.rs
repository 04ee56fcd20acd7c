//! Endpoints, basemap styles and environment overrides

use tracing::{info, warn};

/// cityIO interface endpoint (production)
pub const CURRENT_WS_URL: &str = "wss://cityio.media.mit.edu/cityio/interface";
/// cityIO interface endpoint (staging)
pub const TEST_WS_URL: &str = "wss://cityio-old.media.mit.edu/cityio/interface";

/// Account owning the basemap styles
pub const TILE_STYLE_OWNER: &str = "relnox";

/// Basemap styles available on the tile endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStyle {
    Dark,
    #[default]
    Light,
    Inverse,
    Normal,
}

impl MapStyle {
    pub const ALL: &'static [MapStyle] = &[MapStyle::Dark, MapStyle::Light, MapStyle::Inverse, MapStyle::Normal];

    pub fn style_id(&self) -> &'static str {
        match self {
            MapStyle::Dark => "cjs9rb33k2pix1fo833uweyjd",
            MapStyle::Light => "ck0h5xn701bpr1dqs3he2lecq",
            MapStyle::Inverse => "cjlu6w5sc1dy12rmn4kl2zljn",
            MapStyle::Normal => "cl8dv36nv000t14qik9yg4ys6",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MapStyle::Dark => "Dark",
            MapStyle::Light => "Light",
            MapStyle::Inverse => "Inverse",
            MapStyle::Normal => "Normal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MapStyle::ALL
            .iter()
            .copied()
            .find(|s| s.label().eq_ignore_ascii_case(name.trim()))
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ws_url: String,
    pub map_style: MapStyle,
    /// Tile endpoint access token
    pub mapbox_token: String,
    /// Render the per-cell label layer
    pub labels: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ws_url: TEST_WS_URL.to_string(),
            map_style: MapStyle::default(),
            mapbox_token: String::new(),
            labels: true,
        }
    }
}

impl Settings {
    /// Defaults overridden by `CITYIO_WS`, `CITYIO_ENDPOINT`, `CITYSCOPE_STYLE`,
    /// `MAPBOX_TOKEN` and `CITYSCOPE_LABELS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();

        match lookup("CITYIO_ENDPOINT").as_deref() {
            Some("current") => settings.ws_url = CURRENT_WS_URL.to_string(),
            Some("test") | None => {}
            Some(other) => warn!(endpoint = other, "Unknown CITYIO_ENDPOINT, using test"),
        }
        if let Some(url) = lookup("CITYIO_WS") {
            settings.ws_url = url;
        }

        if let Some(name) = lookup("CITYSCOPE_STYLE") {
            match MapStyle::from_name(&name) {
                Some(style) => settings.map_style = style,
                None => warn!(style = %name, "Unknown CITYSCOPE_STYLE, using default"),
            }
        }

        if let Some(token) = lookup("MAPBOX_TOKEN") {
            settings.mapbox_token = token;
        }

        if let Some(flag) = lookup("CITYSCOPE_LABELS") {
            settings.labels = !matches!(flag.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
        }

        info!(
            url = %settings.ws_url,
            style = settings.map_style.label(),
            labels = settings.labels,
            "Settings resolved"
        );
        settings
    }

    /// Tile URL template with `{z}/{x}/{y}` placeholders for the configured style
    pub fn tile_url_template(&self) -> String {
        format!(
            "https://api.mapbox.com/styles/v1/{owner}/{style}/tiles/256/{{z}}/{{x}}/{{y}}?access_token={token}&attribution=false&logo=false&fresh=true",
            owner = TILE_STYLE_OWNER,
            style = self.map_style.style_id(),
            token = self.mapbox_token,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::from_lookup(lookup(&[]));
        assert_eq!(s, Settings::default());
        assert_eq!(s.ws_url, TEST_WS_URL);
        assert_eq!(s.map_style, MapStyle::Light);
    }

    #[test]
    fn test_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("CITYIO_ENDPOINT", "current"),
            ("CITYSCOPE_STYLE", "dark"),
            ("MAPBOX_TOKEN", "pk.abc"),
            ("CITYSCOPE_LABELS", "off"),
        ]));
        assert_eq!(s.ws_url, CURRENT_WS_URL);
        assert_eq!(s.map_style, MapStyle::Dark);
        assert!(!s.labels);

        let explicit = Settings::from_lookup(lookup(&[("CITYIO_ENDPOINT", "current"), ("CITYIO_WS", "ws://localhost:9000")]));
        assert_eq!(explicit.ws_url, "ws://localhost:9000");
    }

    #[test]
    fn test_bad_style_keeps_default() {
        let s = Settings::from_lookup(lookup(&[("CITYSCOPE_STYLE", "sepia")]));
        assert_eq!(s.map_style, MapStyle::Light);
    }

    #[test]
    fn test_tile_url_template() {
        let s = Settings {
            mapbox_token: "pk.abc".into(),
            ..Settings::default()
        };
        assert_eq!(
            s.tile_url_template(),
            "https://api.mapbox.com/styles/v1/relnox/ck0h5xn701bpr1dqs3he2lecq/tiles/256/{z}/{x}/{y}?access_token=pk.abc&attribution=false&logo=false&fresh=true"
        );
    }
}
