//! Image binding: serial-number lists, cameras, and attaching cameras to
//! every measure of a network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;

use super::ControlNet;
use crate::model::SurfacePoint;
use crate::progress::Progress;
use crate::{Error, ErrorKind, Result};

// ============================================================================
// Collaborator traits
// ============================================================================

/// Geometric model of one image.
pub trait Camera: std::fmt::Debug + Send + Sync {
    /// Intersect the look direction through `(sample, line)` with the
    /// target surface. `None` when the pixel misses the body.
    fn image_to_ground(&self, sample: f64, line: f64) -> Option<SurfacePoint>;

    /// Project a ground point into the image. `None` when it is not visible.
    fn ground_to_image(&self, point: &SurfacePoint) -> Option<(f64, f64)>;
}

/// Access to cube files: serial numbers and camera construction.
///
/// Called from worker threads during image binding, hence `Sync`.
pub trait ImageOpener: Sync {
    fn serial_number(&self, path: &Path) -> Result<String>;

    fn create_camera(&self, path: &Path) -> Result<Arc<dyn Camera>>;
}

// ============================================================================
// SerialNumberList
// ============================================================================

/// Insertion-ordered `serial → cube path` map with unique serials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerialNumberList {
    entries: Vec<(String, PathBuf)>,
    index: HashMap<String, usize>,
}

impl SerialNumberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a list file of cube paths, one per line. Lines are trimmed and
    /// blank lines skipped.
    pub fn from_list_file(list: impl AsRef<Path>, opener: &dyn ImageOpener) -> Result<Self> {
        let list = list.as_ref();
        let text = std::fs::read_to_string(list).map_err(|e| {
            Error::io(format!("Unable to read image list [{}]", list.display()), e)
        })?;

        let mut serials = Self::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            serials.add_file(line, opener)?;
        }
        tracing::info!(list = %list.display(), images = serials.len(), "image list read");
        Ok(serials)
    }

    /// Ask `opener` for the serial of `path` and record it.
    pub fn add_file(&mut self, path: impl AsRef<Path>, opener: &dyn ImageOpener) -> Result<()> {
        let path = path.as_ref();
        let serial = opener.serial_number(path).map_err(|e| {
            e.context(
                ErrorKind::User,
                format!("Unable to get a serial number for cube [{}]", path.display()),
            )
        })?;
        self.add(serial, path)
    }

    /// Duplicate serials are a user error naming both files.
    pub fn add(&mut self, serial: impl Into<String>, path: impl Into<PathBuf>) -> Result<()> {
        let serial = serial.into();
        let path = path.into();
        if serial.is_empty() {
            return Err(Error::user(format!(
                "Cube [{}] has an empty serial number",
                path.display()
            )));
        }
        if let Some(&existing) = self.index.get(&serial) {
            return Err(Error::user(format!(
                "Duplicate serial number [{serial}] from files [{}] and [{}]",
                self.entries[existing].1.display(),
                path.display()
            )));
        }
        self.index.insert(serial.clone(), self.entries.len());
        self.entries.push((serial, path));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.index.contains_key(serial)
    }

    pub fn path(&self, serial: &str) -> Option<&Path> {
        self.index.get(serial).map(|&i| self.entries[i].1.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> + '_ {
        self.entries.iter().map(|(s, p)| (s.as_str(), p.as_path()))
    }
}

// ============================================================================
// Binding
// ============================================================================

impl ControlNet {
    /// Build one camera per listed cube and hand it to every measure on that
    /// serial. Also initialises the per-image valid and rejected counts.
    ///
    /// Every non-ignored measure must have its serial in `list`. Nothing is
    /// assigned unless all cameras are built. A second call is a no-op.
    pub fn set_images(
        &mut self,
        list: &SerialNumberList,
        opener: &dyn ImageOpener,
        mut progress: Option<&mut dyn Progress>,
    ) -> Result<()> {
        if self.images_bound {
            tracing::debug!("images already bound");
            return Ok(());
        }
        if list.is_empty() {
            tracing::warn!("binding an empty image list");
        }

        for point in &self.points {
            for m in point.iter().filter(|m| !m.is_ignored()) {
                if !list.contains(m.serial()) {
                    return Err(Error::user(format!(
                        "Control point [{}], measure [{}] does not have a cube with a matching serial number",
                        point.id(),
                        m.serial()
                    )));
                }
            }
        }

        if let Some(p) = progress.as_deref_mut() {
            p.set_text("Setting input images...");
            p.set_maximum_steps(list.len());
        }

        let jobs: Vec<(&str, &Path)> = list.iter().collect();
        let mutex = self.mutex.clone();
        let mut cameras: HashMap<String, Arc<dyn Camera>> = HashMap::with_capacity(jobs.len());

        for batch in jobs.chunks(self.config.max_threads.max(1)) {
            let built: Vec<Result<Arc<dyn Camera>>> = std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|&(_, path)| {
                        let mutex = mutex.as_ref();
                        scope.spawn(move || {
                            let _guard = mutex.map(|m| m.lock());
                            opener.create_camera(path)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(Error::unknown(
                                "Camera construction failed",
                                "camera worker panicked",
                            ))
                        })
                    })
                    .collect()
            });

            for (&(serial, path), camera) in batch.iter().zip(built) {
                let camera = camera.map_err(|e| {
                    e.context(
                        ErrorKind::Unknown,
                        format!("Unable to create camera for cube file [{}]", path.display()),
                    )
                })?;
                cameras.insert(serial.to_string(), camera);
                if let Some(p) = progress.as_deref_mut() {
                    if !p.check_status() {
                        return Err(Error::user("Image binding cancelled"));
                    }
                }
            }
        }

        for point in &mut self.points {
            for m in point.measures_mut() {
                let camera = cameras.get(m.serial()).cloned();
                m.set_camera(camera);
            }
        }

        self.valid_counts.clear();
        self.rejected_counts.clear();
        for m in self.points.iter().flat_map(|p| p.iter()) {
            if !m.is_ignored() {
                *self.valid_counts.entry(m.serial().to_string()).or_insert(0) += 1;
            }
            if m.is_rejected() {
                *self.rejected_counts.entry(m.serial().to_string()).or_insert(0) += 1;
            }
        }

        self.cameras = cameras;
        self.images_bound = true;
        tracing::info!(images = list.len(), points = self.points.len(), "images bound");
        Ok(())
    }

    /// `set_images` from a list file of cube paths.
    pub fn set_images_from_list_file(
        &mut self,
        list: impl AsRef<Path>,
        opener: &dyn ImageOpener,
        progress: Option<&mut dyn Progress>,
    ) -> Result<()> {
        let serials = SerialNumberList::from_list_file(list, opener)?;
        self.set_images(&serials, opener, progress)
    }
}
