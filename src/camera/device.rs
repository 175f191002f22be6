//! Camera device enumeration and facing-based selection.

use super::types::{CameraError, CameraInfo, Facing};

const ENVIRONMENT_HINTS: &[&str] = &["back", "rear", "environment", "world"];
const USER_HINTS: &[&str] = &["front", "facetime", "user", "integrated", "selfie"];

/// List all available camera devices on the system.
///
/// Returns a vector of `CameraInfo` structs, or an error if querying fails.
/// If no cameras are found, returns an empty vector (not an error).
#[cfg(feature = "camera")]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    use nokhwa::query;
    use nokhwa::utils::ApiBackend;

    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Without the `camera` feature there is no device backend to query.
#[cfg(not(feature = "camera"))]
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    Err(CameraError::QueryFailed(
        "built without the `camera` feature".to_string(),
    ))
}

/// Guess which way a device faces from its name and description.
///
/// Returns `None` when nothing in the strings gives it away, which is the
/// usual case for USB webcams.
pub fn infer_facing(info: &CameraInfo) -> Option<Facing> {
    let haystack = format!("{} {}", info.name, info.description).to_lowercase();

    if ENVIRONMENT_HINTS.iter().any(|h| haystack.contains(h)) {
        Some(Facing::Environment)
    } else if USER_HINTS.iter().any(|h| haystack.contains(h)) {
        Some(Facing::User)
    } else {
        None
    }
}

/// Pick the device to open.
///
/// An explicit index wins over facing. `Facing::Any` takes the first device.
/// A concrete facing only matches devices inferred to face that way.
pub fn select_device(
    devices: &[CameraInfo],
    facing: Facing,
    explicit_index: Option<u32>,
) -> Result<CameraInfo, CameraError> {
    if devices.is_empty() {
        return Err(CameraError::NoDevices);
    }

    if let Some(index) = explicit_index {
        return devices
            .iter()
            .find(|d| d.index == index)
            .cloned()
            .ok_or(CameraError::DeviceNotFound(index));
    }

    match facing {
        Facing::Any => Ok(devices[0].clone()),
        wanted => devices
            .iter()
            .find(|d| infer_facing(d) == Some(wanted))
            .cloned()
            .ok_or(CameraError::NoMatchingFacing(wanted)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: u32, name: &str) -> CameraInfo {
        CameraInfo {
            index,
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_infer_facing() {
        assert_eq!(
            infer_facing(&device(0, "Back Camera")),
            Some(Facing::Environment)
        );
        assert_eq!(
            infer_facing(&device(0, "FaceTime HD Camera")),
            Some(Facing::User)
        );
        assert_eq!(infer_facing(&device(0, "USB Video Device")), None);
    }

    #[test]
    fn test_select_by_facing() {
        let devices = vec![device(0, "FaceTime HD Camera"), device(1, "Rear Camera")];
        assert_eq!(
            select_device(&devices, Facing::Environment, None).unwrap().index,
            1
        );
        assert_eq!(select_device(&devices, Facing::User, None).unwrap().index, 0);
        assert_eq!(select_device(&devices, Facing::Any, None).unwrap().index, 0);
    }

    #[test]
    fn test_select_does_not_substitute_facing() {
        let devices = vec![device(0, "FaceTime HD Camera")];
        match select_device(&devices, Facing::Environment, None) {
            Err(CameraError::NoMatchingFacing(Facing::Environment)) => (),
            other => panic!("Expected NoMatchingFacing, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_index_wins() {
        let devices = vec![device(0, "FaceTime HD Camera"), device(3, "USB Camera")];
        assert_eq!(
            select_device(&devices, Facing::Environment, Some(3))
                .unwrap()
                .index,
            3
        );
        match select_device(&devices, Facing::Any, Some(999)) {
            Err(CameraError::DeviceNotFound(999)) => (),
            other => panic!("Expected DeviceNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_select_without_devices() {
        assert!(matches!(
            select_device(&[], Facing::Any, None),
            Err(CameraError::NoDevices)
        ));
    }
}
