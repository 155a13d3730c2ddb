//! One wrapper invocation: locate the plugin, rewrite its configuration,
//! run it.

use crate::config::Config;
use crate::error::{Result, WrapperError};
use crate::plugin::{process, resolve_plugin, ChildOutcome};
use crate::transform::compress_mesos_labels;
use serde_json::{Map, Value};
use std::ffi::{OsStr, OsString};
use std::io::IsTerminal;
use tokio::io::AsyncReadExt;
use tracing::Instrument;

/// Run the wrapped plugin for this invocation.
///
/// `argv0` locates the plugin, `args` are handed to it verbatim. Errors are
/// only returned when the plugin was never run.
pub async fn run(config: &Config, argv0: &OsStr, args: Vec<OsString>) -> Result<ChildOutcome> {
    let span = tracing::info_span!(
        "cni",
        command = %std::env::var("CNI_COMMAND").unwrap_or_default(),
        container = %std::env::var("CNI_CONTAINERID").unwrap_or_default()
    );

    async move {
        // Fail on a missing plugin before touching stdin.
        let plugin = resolve_plugin(config, argv0)?;

        let document = compress_mesos_labels(read_stdin_document().await?);
        let payload = serde_json::to_vec(&document).map_err(WrapperError::Serialization)?;

        process::run(&plugin, args, &payload).await
    }
    .instrument(span)
    .await
}

/// Read the configuration from stdin.
///
/// An interactive terminal is never read from; it yields an empty document.
pub async fn read_stdin_document() -> Result<Value> {
    if std::io::stdin().is_terminal() {
        tracing::debug!("STDIN is a terminal, using an empty configuration");
        return Ok(Value::Object(Map::new()));
    }

    let mut input = Vec::new();
    tokio::io::stdin().read_to_end(&mut input).await?;
    parse_document(&input)
}

/// Parse a configuration document. Empty input and `null` are `{}`.
pub fn parse_document(input: &[u8]) -> Result<Value> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_slice(input).map_err(|e| WrapperError::InvalidInput(e.to_string()))? {
        Value::Null => Ok(Value::Object(Map::new())),
        document @ Value::Object(_) => Ok(document),
        _ => Err(WrapperError::InvalidInput(
            "configuration must be a JSON object".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_is_empty_object() {
        assert_eq!(parse_document(b"").unwrap(), json!({}));
        assert_eq!(parse_document(b" \n\t").unwrap(), json!({}));
        assert_eq!(parse_document(b"null").unwrap(), json!({}));
    }

    #[test]
    fn test_object_input() {
        let document = parse_document(br#"{"cniVersion": "0.3.1", "type": "calico"}"#).unwrap();
        assert_eq!(document, json!({"cniVersion": "0.3.1", "type": "calico"}));
    }

    #[test]
    fn test_malformed_input_rejected() {
        let err = parse_document(br#"{"cniVersion": "#).unwrap_err();
        assert!(matches!(err, WrapperError::InvalidInput(_)));
    }

    #[test]
    fn test_non_object_root_rejected() {
        for input in [&b"[1, 2]"[..], &b"\"calico\""[..], &b"42"[..]] {
            let err = parse_document(input).unwrap_err();
            assert!(matches!(err, WrapperError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let input = br#"{"ipam": {"type": "host-local", "ranges": [[{"subnet": "10.1.0.0/16"}]]}, "x-vendor": 1.5}"#;
        let document = compress_mesos_labels(parse_document(input).unwrap());

        let reparsed: Value = serde_json::from_slice(&serde_json::to_vec(&document).unwrap()).unwrap();
        assert_eq!(reparsed, serde_json::from_slice::<Value>(input).unwrap());
    }
}
