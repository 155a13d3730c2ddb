//! Rewrites of the CNI configuration handed to the wrapped plugin.
//!
//! The configuration is handled as a generic [`Value`] so that fields the
//! wrapper does not know about reach the plugin unchanged. Mesos passes
//! network labels under `args."org.apache.mesos".network_info.labels.labels`
//! (see the Mesos CNI documentation on passing network labels to plugins);
//! plugins that copy those into container metadata fail on values longer
//! than 63 bytes, so oversized values are compressed here.

mod label;

pub use label::{compress_label, needs_compression, DIGEST_PREFIX_LEN, MAX_LABEL_LEN, SUFFIX_LEN};

use serde_json::Value;

/// Key path from the document root to the Mesos label array.
pub const MESOS_LABELS_PATH: [&str; 5] = ["args", "org.apache.mesos", "network_info", "labels", "labels"];

/// Walk `path` through nested objects.
///
/// Returns `None` as soon as a key is missing or an intermediate value is
/// not an object.
pub fn object_path_mut<'a>(root: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(root, |node, key| node.as_object_mut()?.get_mut(*key))
}

/// Compress oversized Mesos label values in `config`.
///
/// Anything that does not have the expected shape is left alone; this is
/// never an error.
pub fn compress_mesos_labels(mut config: Value) -> Value {
    let Some(labels) = object_path_mut(&mut config, &MESOS_LABELS_PATH).and_then(Value::as_array_mut)
    else {
        return config;
    };

    let mut compressed = 0usize;
    for entry in labels.iter_mut() {
        let Some(value) = entry.get_mut("value") else {
            continue;
        };
        if let Value::String(text) = value {
            if needs_compression(text) {
                *text = compress_label(text);
                compressed += 1;
            }
        }
    }

    if compressed > 0 {
        tracing::debug!("Compressed {} oversized Mesos network label(s)", compressed);
    }

    config
}
