//! Shape-tolerant provisioning response extractors
//!
//! The provisioning backend does not guarantee a fixed response schema.
//! Bulk responses have been observed as a direct source→playback map, a
//! flat array of pairs, and the same pairs nested under `items`,
//! `results` or `data`. Single-camera responses carry the playback URL
//! under `hls_url`, `hls`, `output`, or as a bare string. Each shape is
//! tried in turn and normalized to one mapping here rather than sniffed
//! at call sites.

use crate::camera_directory::types::CameraRecord;
use serde_json::Value;
use std::collections::HashMap;

/// Key aliases for the source URL in a pair entry
const SOURCE_KEYS: [&str; 3] = ["rtsp_url", "input", "url"];

/// Key aliases for the playback URL in a pair entry
const PLAYBACK_KEYS: [&str; 3] = ["hls_url", "hls", "output"];

/// Build a `source_url -> playback_url` lookup from a bulk response.
///
/// Unrecognized shapes and entries yield an empty or partial map, never
/// an error; a camera absent from the map is simply left unprovisioned.
pub fn extract_bulk_map(payload: &Value) -> HashMap<String, String> {
    let mut map = HashMap::new();

    match payload {
        Value::Object(obj) => {
            // Shape 1: { "map": { source: playback, ... } }
            if let Some(Value::Object(inner)) = obj.get("map") {
                collect_string_entries(inner, &mut map);
                return map;
            }

            // Shape 2: pairs nested under items / results / data
            for key in ["items", "results", "data"] {
                if let Some(Value::Array(arr)) = obj.get(key) {
                    collect_pairs(arr, &mut map);
                    return map;
                }
            }

            // Shape 3: the object itself is the mapping
            collect_string_entries(obj, &mut map);
        }
        // Shape 4: flat array of pair objects
        Value::Array(arr) => collect_pairs(arr, &mut map),
        _ => {}
    }

    map
}

/// Normalize a single-camera provisioning response to a playback URL
pub fn normalize_single(payload: &Value) -> Option<String> {
    match payload {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => PLAYBACK_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
            .map(String::from),
        _ => None,
    }
}

/// Apply a bulk lookup to the camera collection.
///
/// Sets `playback_url` for every camera whose `source_url` is a key in
/// the lookup; all other cameras are left untouched. Returns the number
/// of cameras updated.
pub fn apply_bulk_map(cameras: &mut [CameraRecord], map: &HashMap<String, String>) -> usize {
    let mut updated = 0;
    for camera in cameras.iter_mut() {
        let Some(source) = camera.source_url.as_deref() else {
            continue;
        };
        if let Some(playback) = map.get(source) {
            camera.playback_url = Some(playback.clone());
            updated += 1;
        }
    }
    updated
}

fn collect_string_entries(obj: &serde_json::Map<String, Value>, map: &mut HashMap<String, String>) {
    for (key, value) in obj {
        if let Some(v) = value.as_str() {
            if !key.is_empty() && !v.is_empty() {
                map.insert(key.clone(), v.to_string());
            }
        }
    }
}

fn collect_pairs(arr: &[Value], map: &mut HashMap<String, String>) {
    for entry in arr {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let source = SOURCE_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str));
        let playback = PLAYBACK_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str));
        if let (Some(s), Some(p)) = (source, playback) {
            if !s.is_empty() && !p.is_empty() {
                map.insert(s.to_string(), p.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expected() -> HashMap<String, String> {
        HashMap::from([
            (
                "rtsp://host/cam1".to_string(),
                "https://host/cam1.m3u8".to_string(),
            ),
            (
                "rtsp://host/cam2".to_string(),
                "https://host/cam2.m3u8".to_string(),
            ),
        ])
    }

    #[test]
    fn test_direct_map_shape() {
        let payload = json!({
            "rtsp://host/cam1": "https://host/cam1.m3u8",
            "rtsp://host/cam2": "https://host/cam2.m3u8"
        });
        assert_eq!(extract_bulk_map(&payload), expected());
    }

    #[test]
    fn test_wrapped_map_shape() {
        let payload = json!({ "map": {
            "rtsp://host/cam1": "https://host/cam1.m3u8",
            "rtsp://host/cam2": "https://host/cam2.m3u8"
        }});
        assert_eq!(extract_bulk_map(&payload), expected());
    }

    #[test]
    fn test_flat_pairs_shape() {
        let payload = json!([
            { "rtsp_url": "rtsp://host/cam1", "ok": true, "hls_url": "https://host/cam1.m3u8" },
            { "rtsp_url": "rtsp://host/cam2", "ok": true, "hls_url": "https://host/cam2.m3u8" }
        ]);
        assert_eq!(extract_bulk_map(&payload), expected());
    }

    #[test]
    fn test_nested_pairs_shape() {
        for envelope in ["items", "results", "data"] {
            let payload = json!({
                "needs_restart": false,
                envelope: [
                    { "input": "rtsp://host/cam1", "output": "https://host/cam1.m3u8" },
                    { "url": "rtsp://host/cam2", "hls": "https://host/cam2.m3u8" }
                ]
            });
            assert_eq!(extract_bulk_map(&payload), expected(), "envelope {}", envelope);
        }
    }

    #[test]
    fn test_failed_entries_are_skipped() {
        let payload = json!({ "items": [
            { "rtsp_url": "rtsp://host/cam1", "ok": true, "hls_url": "https://host/cam1.m3u8" },
            { "rtsp_url": "rtsp://host/bad", "ok": false, "error": "Invalid RTSP URL" }
        ]});
        let map = extract_bulk_map(&payload);
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("rtsp://host/bad"));
    }

    #[test]
    fn test_unrecognized_shape_yields_empty_map() {
        assert!(extract_bulk_map(&json!(42)).is_empty());
        assert!(extract_bulk_map(&json!(null)).is_empty());
    }

    #[test]
    fn test_normalize_single_aliases() {
        for key in ["hls_url", "hls", "output"] {
            let payload = json!({ key: "https://host/cam1.m3u8", "needs_restart": false });
            assert_eq!(
                normalize_single(&payload).as_deref(),
                Some("https://host/cam1.m3u8"),
                "key {}",
                key
            );
        }
        assert_eq!(
            normalize_single(&json!("https://host/cam1.m3u8")).as_deref(),
            Some("https://host/cam1.m3u8")
        );
        assert!(normalize_single(&json!({ "needs_restart": true })).is_none());
        assert!(normalize_single(&json!({ "hls_url": "" })).is_none());
    }
}
