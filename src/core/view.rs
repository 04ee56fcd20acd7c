//! Camera pose ownership and persistence
//!
//! The projection camera is locked to a top-down orthographic view: pitch is
//! always 0 and the projection always orthographic, whatever a camera event
//! proposes. Latitude, longitude, zoom and bearing are user controlled and every
//! accepted pose is written to the blob store before it is applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::grid::GridHeader;
use super::persist::BlobStore;

pub const DEFAULT_ZOOM: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewStateError {
    #[error("unknown view state field: {0}")]
    UnknownField(String),

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: ViewField, value: f64 },
}

/// Camera pose handed to the painter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub bearing: f64,
    #[serde(default = "orthographic_default")]
    pub orthographic: bool,
}

fn orthographic_default() -> bool {
    true
}

impl ViewState {
    /// Pose centred on the table anchor, bearing undoing the table rotation
    pub fn default_for(header: &GridHeader) -> Self {
        Self {
            latitude: header.latitude,
            longitude: header.longitude,
            zoom: DEFAULT_ZOOM,
            pitch: 0.0,
            bearing: (360.0 - header.rotation_degrees).rem_euclid(360.0),
            orthographic: true,
        }
    }

    /// Same pose with pitch and projection forced to the locked values
    pub fn locked(self) -> Self {
        Self {
            pitch: 0.0,
            orthographic: true,
            ..self
        }
    }

    fn set(&mut self, field: ViewField, value: f64) {
        match field {
            ViewField::Latitude => self.latitude = value,
            ViewField::Longitude => self.longitude = value,
            ViewField::Zoom => self.zoom = value,
            ViewField::Pitch => self.pitch = value,
            ViewField::Bearing => self.bearing = value,
        }
    }
}

/// Numeric pose fields editable from the view-state editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewField {
    Latitude,
    Longitude,
    Zoom,
    Pitch,
    Bearing,
}

impl ViewField {
    pub const ALL: &'static [ViewField] = &[
        ViewField::Latitude,
        ViewField::Longitude,
        ViewField::Zoom,
        ViewField::Pitch,
        ViewField::Bearing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ViewField::Latitude => "latitude",
            ViewField::Longitude => "longitude",
            ViewField::Zoom => "zoom",
            ViewField::Pitch => "pitch",
            ViewField::Bearing => "bearing",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ViewStateError> {
        ViewField::ALL
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| ViewStateError::UnknownField(name.to_string()))
    }
}

impl fmt::Display for ViewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sole owner of the camera pose
pub struct ViewStateManager {
    pose: ViewState,
    store: Rc<dyn BlobStore>,
    key: String,
}

impl ViewStateManager {
    /// Load the persisted pose verbatim, or derive the default from the header
    pub fn load(header: &GridHeader, store: Rc<dyn BlobStore>, key: String) -> Self {
        let persisted = match store.load(&key) {
            Ok(Some(blob)) => serde_json::from_str::<ViewState>(&blob)
                .map_err(|e| warn!(key = %key, error = %e, "Ignoring unreadable saved view state"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read saved view state");
                None
            }
        };

        let pose = match persisted {
            Some(pose) => {
                info!(key = %key, ?pose, "Loaded saved projection view state");
                pose
            }
            None => ViewState::default_for(header),
        };

        Self { pose, store, key }
    }

    pub fn pose(&self) -> &ViewState {
        &self.pose
    }

    /// Camera moved (pan, zoom, rotate). Returns the pose actually applied.
    pub fn on_camera_change(&mut self, proposed: ViewState) -> ViewState {
        self.accept(proposed.locked())
    }

    /// Manual edit of one numeric field
    pub fn edit_field(&mut self, field: &str, value: f64) -> Result<ViewState, ViewStateError> {
        let field = ViewField::from_name(field)?;
        if !value.is_finite() {
            return Err(ViewStateError::NotFinite { field, value });
        }
        let mut proposed = self.pose;
        proposed.set(field, value);
        Ok(self.accept(proposed.locked()))
    }

    /// Forget the persisted pose; the current pose stays until the session restarts
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to clear saved view state");
        }
    }

    fn accept(&mut self, pose: ViewState) -> ViewState {
        self.persist(&pose);
        self.pose = pose;
        debug!(?pose, "View state applied");
        pose
    }

    fn persist(&self, pose: &ViewState) {
        let result = serde_json::to_string(pose)
            .map_err(Into::into)
            .and_then(|blob| self.store.save(&self.key, &blob));
        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Failed to save view state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::tests::header;
    use crate::core::persist::MemoryBlobStore;

    const KEY: &str = "view";

    fn manager(store: &Rc<MemoryBlobStore>) -> ViewStateManager {
        ViewStateManager::load(&header(), store.clone(), KEY.to_string())
    }

    #[test]
    fn test_default_pose_from_header() {
        let store = Rc::new(MemoryBlobStore::new());
        let pose = *manager(&store).pose();
        assert_eq!(pose.bearing, 270.0);
        assert_eq!(pose.zoom, 15.0);
        assert_eq!(pose.pitch, 0.0);
        assert!(pose.orthographic);
        assert_eq!((pose.latitude, pose.longitude), (42.36, -71.09));
    }

    #[test]
    fn test_default_bearing_wraps() {
        let mut h = header();
        h.rotation_degrees = 0.0;
        assert_eq!(ViewState::default_for(&h).bearing, 0.0);
        h.rotation_degrees = 400.0;
        assert_eq!(ViewState::default_for(&h).bearing, 320.0);
    }

    #[test]
    fn test_camera_change_is_locked() {
        let store = Rc::new(MemoryBlobStore::new());
        let mut manager = manager(&store);
        for (pitch, ortho) in [(45.0, false), (0.0, false), (-10.0, true), (60.0, true)] {
            let out = manager.on_camera_change(ViewState {
                latitude: 1.0,
                longitude: 2.0,
                zoom: 17.5,
                pitch,
                bearing: 12.0,
                orthographic: ortho,
            });
            assert_eq!(out.pitch, 0.0);
            assert!(out.orthographic);
            assert_eq!((out.latitude, out.longitude, out.zoom, out.bearing), (1.0, 2.0, 17.5, 12.0));
            assert_eq!(*manager.pose(), out);
        }
    }

    #[test]
    fn test_accepted_pose_is_persisted_and_reloaded() {
        let store = Rc::new(MemoryBlobStore::new());
        let mut first = manager(&store);
        let applied = first.on_camera_change(ViewState {
            latitude: 5.0,
            longitude: 6.0,
            zoom: 18.0,
            pitch: 30.0,
            bearing: 90.0,
            orthographic: false,
        });

        let saved: ViewState = serde_json::from_str(&store.load(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved, applied);
        assert_eq!(*manager(&store).pose(), applied);
    }

    #[test]
    fn test_saved_pose_loaded_verbatim() {
        let store = Rc::new(MemoryBlobStore::new());
        store
            .save(KEY, r#"{"latitude":1,"longitude":2,"zoom":3,"pitch":4,"bearing":5,"orthographic":false,"width":800}"#)
            .unwrap();
        let pose = *manager(&store).pose();
        assert_eq!(pose.pitch, 4.0);
        assert!(!pose.orthographic);
    }

    #[test]
    fn test_unreadable_saved_pose_falls_back() {
        let store = Rc::new(MemoryBlobStore::new());
        store.save(KEY, "garbage").unwrap();
        assert_eq!(manager(&store).pose().bearing, 270.0);
    }

    #[test]
    fn test_edit_field() {
        let store = Rc::new(MemoryBlobStore::new());
        let mut manager = manager(&store);

        let out = manager.edit_field("zoom", 19.0).unwrap();
        assert_eq!(out.zoom, 19.0);

        let out = manager.edit_field("pitch", 50.0).unwrap();
        assert_eq!(out.pitch, 0.0);

        assert_eq!(
            manager.edit_field("fov", 1.0),
            Err(ViewStateError::UnknownField("fov".into()))
        );
        assert!(matches!(
            manager.edit_field("zoom", f64::NAN),
            Err(ViewStateError::NotFinite { field: ViewField::Zoom, .. })
        ));
        assert_eq!(manager.pose().zoom, 19.0);
    }

    #[test]
    fn test_clear_removes_blob() {
        let store = Rc::new(MemoryBlobStore::new());
        let mut manager = manager(&store);
        manager.on_camera_change(ViewState::default_for(&header()));
        assert!(store.contains(KEY));
        manager.clear();
        assert!(!store.contains(KEY));
    }
}
