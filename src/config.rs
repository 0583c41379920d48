//! Runtime configuration for the billing core.
//!
//! The Electron app kept its endpoint, device identity, and printing folder
//! in ambient singleton stores. Here each of those is an explicit value the
//! embedding shell constructs once and passes into the controllers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

/// Default timeout for backend API requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// File name of the persisted device identity under the data dir.
const DEVICE_ID_FILE: &str = "device-id";

/// File names of the print artifacts inside the printing folder.
const JSON_ARTIFACT: &str = "last_bill.json";
const PDF_ARTIFACT: &str = "last_python_bill.pdf";
const LOGO_FILE: &str = "logo.png";

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the billing backend URL:
/// - strip trailing slashes
/// - ensure a scheme is present (https, or http for localhost)
/// - ensure the `/api/v1` prefix the backend routes under
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Ensure the versioned API prefix
    if !url.ends_with("/api/v1") {
        url.push_str("/api/v1");
    }

    url
}

// ---------------------------------------------------------------------------
// API endpoint
// ---------------------------------------------------------------------------

/// Connection settings for the remote billing backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Normalised base URL including the `/api/v1` prefix.
    pub base_url: String,
    /// Caller-imposed wall-clock bound on every request.
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Resolve the per-user data directory for the POS client.
pub fn default_data_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("lk.puwasa.pos")
}

// ---------------------------------------------------------------------------
// Device identity
// ---------------------------------------------------------------------------

/// Stable identity of this till, used by the cash-register endpoints.
///
/// The Electron build read a hashed machine id from the OS; the id here is
/// generated once and persisted under the data dir so the register binding
/// survives restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub id: String,
}

impl DeviceIdentity {
    /// Load the persisted device id, generating and storing one on first use.
    pub fn load_or_create(data_dir: &Path) -> Result<Self, String> {
        let path = data_dir.join(DEVICE_ID_FILE);

        if let Ok(existing) = std::fs::read_to_string(&path) {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(Self {
                    id: trimmed.to_string(),
                });
            }
        }

        std::fs::create_dir_all(data_dir)
            .map_err(|e| format!("create data dir {}: {e}", data_dir.display()))?;

        let id = Uuid::new_v4().to_string();
        std::fs::write(&path, &id)
            .map_err(|e| format!("persist device id {}: {e}", path.display()))?;
        info!(device_id = %id, "Generated new device identity");

        Ok(Self { id })
    }
}

// ---------------------------------------------------------------------------
// Print artifact paths
// ---------------------------------------------------------------------------

/// Fixed-path artifacts the print bridge reads and writes.
///
/// All four paths live in one folder: the bill JSON record, the rendered PDF
/// the helper produces, the companion logo image, and the helper itself.
#[derive(Debug, Clone)]
pub struct PrintPaths {
    pub dir: PathBuf,
    pub json_path: PathBuf,
    pub pdf_path: PathBuf,
    pub logo_path: PathBuf,
}

impl PrintPaths {
    /// Artifact paths inside the given printing folder.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            json_path: dir.join(JSON_ARTIFACT),
            pdf_path: dir.join(PDF_ARTIFACT),
            logo_path: dir.join(LOGO_FILE),
            dir,
        }
    }

    /// The well-known printing folder of the installed client.
    pub fn default_location() -> Self {
        #[cfg(target_os = "windows")]
        {
            Self::in_dir(PathBuf::from("D:\\").join("printing"))
        }
        #[cfg(not(target_os = "windows"))]
        {
            Self::in_dir(default_data_dir().join("printing"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_and_api_prefix() {
        assert_eq!(
            normalize_base_url("pos.puwasa.lk"),
            "https://pos.puwasa.lk/api/v1"
        );
        assert_eq!(
            normalize_base_url("localhost:8000"),
            "http://localhost:8000/api/v1"
        );
    }

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://pos.puwasa.lk///"),
            "https://pos.puwasa.lk/api/v1"
        );
        assert_eq!(
            normalize_base_url("https://pos.puwasa.lk/api/v1/"),
            "https://pos.puwasa.lk/api/v1"
        );
    }

    #[test]
    fn device_identity_is_stable_across_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = DeviceIdentity::load_or_create(dir.path()).expect("first load");
        let second = DeviceIdentity::load_or_create(dir.path()).expect("second load");
        assert_eq!(first, second);
        assert!(!first.id.is_empty());
    }

    #[test]
    fn print_paths_share_one_folder() {
        let paths = PrintPaths::in_dir("/tmp/printing");
        assert_eq!(paths.json_path, Path::new("/tmp/printing/last_bill.json"));
        assert_eq!(
            paths.pdf_path,
            Path::new("/tmp/printing/last_python_bill.pdf")
        );
        assert_eq!(paths.logo_path, Path::new("/tmp/printing/logo.png"));
    }
}
