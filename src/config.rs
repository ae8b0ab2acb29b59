//! Server configuration and the fake-output file.
//!
//! The fake-output file lets the server run without real displays:
//!
//! ```json
//! {
//!   "outputs": [
//!     {
//!       "name": "Virtual-1",
//!       "primary": true,
//!       "scale": 2,
//!       "position": { "x": 0, "y": 0 },
//!       "mode": { "size": { "width": 1920, "height": 1080 }, "refreshRate": 60000 },
//!       "physicalSize": { "width": 510, "height": 290 },
//!       "orientation": "landscape"
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::discovery::OutputDescriptor;
use crate::core::output::{Mode, PhysicalSize, Position, Transform};

/// Highest outputdevice version this server advertises.
pub const PROTOCOL_VERSION: u32 = 2;

/// Millimeters per pixel at 96 DPI, used when a fake output has no physical size.
const MM_PER_PIXEL: f64 = 0.26458;

const FAKE_MANUFACTURER: &str = "Virtual";

/// Configuration for the server binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket name (e.g., "wayland-0")
    pub socket_name: String,
    /// Fake-output JSON file; real discovery is used when unset
    pub outputs_file: Option<PathBuf>,
    /// Binds requesting a lower version are rejected
    pub min_version: u32,
    /// Version advertised on the global
    pub version: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_name: "wayland-0".to_string(),
            outputs_file: None,
            min_version: 1,
            version: PROTOCOL_VERSION,
        }
    }
}

impl ServerConfig {
    /// Parse `--socket NAME`, `--outputs FILE` and `--min-version N`.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--socket" => {
                    config.socket_name = args.next().context("--socket requires a name")?;
                }
                "--outputs" => {
                    let path = args.next().context("--outputs requires a file")?;
                    config.outputs_file = Some(PathBuf::from(path));
                }
                "--min-version" => {
                    let value = args.next().context("--min-version requires a number")?;
                    config.min_version = value
                        .parse()
                        .with_context(|| format!("invalid --min-version: {}", value))?;
                }
                other => bail!("unknown argument: {}", other),
            }
        }
        if config.min_version == 0 || config.min_version > config.version {
            bail!(
                "--min-version must be between 1 and {}, got {}",
                config.version,
                config.min_version
            );
        }
        Ok(config)
    }
}

// ============================================================================
// Fake outputs
// ============================================================================

#[derive(Debug, Deserialize)]
struct Point {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Debug, Deserialize)]
struct Size {
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FakeMode {
    size: Size,
    #[serde(default)]
    refresh_rate: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FakeOutput {
    name: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    scale: i32,
    position: Option<Point>,
    mode: FakeMode,
    physical_size: Option<Size>,
    #[serde(default)]
    orientation: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    #[serde(default)]
    edid: String,
    uuid: Option<String>,
    enabled: Option<bool>,
}

fn orientation_to_transform(orientation: Option<&str>) -> Transform {
    match orientation {
        Some("portrait") => Transform::Rotate90,
        Some("inverted-landscape") => Transform::Rotate180,
        Some("inverted-portrait") => Transform::Rotate270,
        _ => Transform::Normal,
    }
}

impl FakeOutput {
    fn into_descriptor(self, primary: bool) -> Option<OutputDescriptor> {
        let mode = Mode::new(self.mode.size.width, self.mode.size.height, self.mode.refresh_rate);
        if !mode.is_valid() {
            tracing::warn!("Fake output {}: invalid mode {}x{}", self.name, mode.width, mode.height);
            return None;
        }

        let physical_size = match self.physical_size {
            Some(size) if size.width > 0 && size.height > 0 => PhysicalSize::new(size.width, size.height),
            _ => PhysicalSize::new(
                (mode.width as f64 * MM_PER_PIXEL) as i32,
                (mode.height as f64 * MM_PER_PIXEL) as i32,
            ),
        };
        let position = self.position.map(|p| Position::new(p.x, p.y)).unwrap_or_default();

        let mut desc = OutputDescriptor::new(self.name.clone());
        desc.primary = primary;
        desc.manufacturer = self.manufacturer.unwrap_or_else(|| FAKE_MANUFACTURER.to_string());
        desc.model = self.model.unwrap_or(self.name);
        desc.edid = self.edid;
        desc.uuid = self.uuid;
        desc.enabled = self.enabled.unwrap_or(true);
        desc.physical_size = physical_size;
        desc.position = position;
        desc.transform = orientation_to_transform(self.orientation.as_deref());
        desc.scale = self.scale.max(1);
        desc.modes = vec![mode];
        desc.current_mode = Some(0);
        desc.preferred_mode = Some(0);
        Some(desc)
    }
}

/// Parse fake outputs from JSON text. Entries that fail to parse are
/// skipped; only the first entry flagged primary stays primary.
pub fn parse_fake_outputs(text: &str) -> Result<Vec<OutputDescriptor>> {
    let doc: serde_json::Value = serde_json::from_str(text).context("invalid JSON")?;
    let object = match doc.as_object() {
        Some(object) => object,
        None => bail!("no top-level JSON object"),
    };
    let entries = match object.get("outputs").and_then(|v| v.as_array()) {
        Some(entries) => entries,
        None => return Ok(Vec::new()),
    };

    let mut primary_set = false;
    let mut outputs = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let fake: FakeOutput = match serde_json::from_value(entry.clone()) {
            Ok(fake) => fake,
            Err(e) => {
                tracing::warn!("Skipping fake output #{}: {}", i, e);
                continue;
            }
        };
        tracing::debug!("Fake output settings: {:?}", fake);
        let primary = fake.primary && !primary_set;
        if let Some(desc) = fake.into_descriptor(primary) {
            primary_set |= primary;
            outputs.push(desc);
        }
    }
    Ok(outputs)
}

/// Load fake outputs from `path`. Unreadable or malformed files yield no
/// outputs.
pub fn load_fake_outputs(path: &Path) -> Vec<OutputDescriptor> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            crate::wlog!(crate::util::logging::CONFIG,
                "Could not open configuration file {} for reading: {}", path.display(), e);
            return Vec::new();
        }
    };
    match parse_fake_outputs(&text) {
        Ok(outputs) => {
            crate::wlog!(crate::util::logging::CONFIG,
                "Loaded {} fake output(s) from {}", outputs.len(), path.display());
            outputs
        }
        Err(e) => {
            crate::wlog!(crate::util::logging::CONFIG, "Error parsing {}: {:#}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_name, "wayland-0");
        assert_eq!(config.outputs_file, None);
        assert_eq!(config.min_version, 1);
        assert_eq!(config.version, 2);
    }

    #[test]
    fn test_config_from_args() {
        let config = ServerConfig::from_args(args(&[
            "--socket", "wayland-7", "--outputs", "/tmp/outputs.json", "--min-version", "2",
        ]))
        .unwrap();
        assert_eq!(config.socket_name, "wayland-7");
        assert_eq!(config.outputs_file, Some(PathBuf::from("/tmp/outputs.json")));
        assert_eq!(config.min_version, 2);
    }

    #[test]
    fn test_config_rejects_bad_args() {
        assert!(ServerConfig::from_args(args(&["--bogus"])).is_err());
        assert!(ServerConfig::from_args(args(&["--socket"])).is_err());
        assert!(ServerConfig::from_args(args(&["--min-version", "3"])).is_err());
        assert!(ServerConfig::from_args(args(&["--min-version", "zero"])).is_err());
    }

    #[test]
    fn test_parse_fake_outputs() {
        let text = r#"{
            "outputs": [
                {
                    "name": "Virtual-1",
                    "primary": true,
                    "scale": 2,
                    "position": { "x": 0, "y": 0 },
                    "mode": { "size": { "width": 1920, "height": 1080 }, "refreshRate": 60000 },
                    "physicalSize": { "width": 510, "height": 290 }
                },
                {
                    "name": "Virtual-2",
                    "primary": true,
                    "position": { "x": 1920, "y": 0 },
                    "mode": { "size": { "width": 1000, "height": 800 }, "refreshRate": 75000 },
                    "orientation": "portrait"
                }
            ]
        }"#;
        let outputs = parse_fake_outputs(text).unwrap();
        assert_eq!(outputs.len(), 2);

        let first = &outputs[0];
        assert!(first.primary);
        assert_eq!(first.scale, 2);
        assert_eq!(first.manufacturer, "Virtual");
        assert_eq!(first.model, "Virtual-1");
        assert_eq!(first.physical_size, PhysicalSize::new(510, 290));
        assert_eq!(first.modes, vec![Mode::new(1920, 1080, 60000)]);

        let second = &outputs[1];
        assert!(!second.primary, "only the first primary entry is honored");
        assert_eq!(second.scale, 1);
        assert_eq!(second.position, Position::new(1920, 0));
        assert_eq!(second.transform, Transform::Rotate90);
        assert_eq!(second.physical_size, PhysicalSize::new(264, 211));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let text = r#"{
            "outputs": [
                { "name": "broken" },
                { "name": "zero", "mode": { "size": { "width": 0, "height": 0 } } },
                { "name": "ok", "mode": { "size": { "width": 800, "height": 600 }, "refreshRate": 60000 } }
            ]
        }"#;
        let outputs = parse_fake_outputs(text).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "ok");
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(parse_fake_outputs("[1, 2, 3]").is_err());
        assert!(parse_fake_outputs("not json").is_err());
        assert!(parse_fake_outputs("{}").unwrap().is_empty());
    }

    #[test]
    fn test_load_fake_outputs_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "outputs": [ {{ "name": "Virtual-1", "mode": {{ "size": {{ "width": 1280, "height": 720 }}, "refreshRate": 60000 }} }} ] }}"#
        )
        .unwrap();
        let outputs = load_fake_outputs(file.path());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "Virtual-1");
    }
}
