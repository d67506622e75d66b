//! Multipart upload of route files to Drive.
//!
//! Content is packaged as a dated `routes_<date>.json` file and sent as a
//! two-part body (a `metadata` part and a `file` part) to the multipart
//! upload endpoint with `supportsAllDrives=true`.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::client::DriveClient;
use crate::types::{BridgeResult, DriveFile};

/// MIME type of uploaded route files.
const UPLOAD_MIME: &str = "application/json";

/// Filename for a save performed at `at`: `routes_<ISO-date>.json`,
/// date-only.
pub fn save_filename(at: DateTime<Utc>) -> String {
    format!("routes_{}.json", at.format("%Y-%m-%d"))
}

/// Build the file metadata JSON for an upload.
fn build_metadata_json(name: &str, parent: &str) -> String {
    let mut map = serde_json::Map::new();
    map.insert("name".into(), serde_json::Value::String(name.into()));
    map.insert(
        "mimeType".into(),
        serde_json::Value::String(UPLOAD_MIME.into()),
    );
    map.insert(
        "parents".into(),
        serde_json::Value::Array(vec![serde_json::Value::String(parent.into())]),
    );
    serde_json::to_string(&map).unwrap_or_default()
}

/// Assemble the two-part body: a `metadata` part holding the file
/// metadata JSON and a `file` part holding the content.
fn build_multipart_body(metadata_json: &str, content: &[u8], boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"metadata\"\r\n");
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"\r\n");
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", UPLOAD_MIME).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());
    body
}

/// Upload `content` as a dated route file. Returns the created file's
/// metadata as reported by Drive.
pub async fn upload_json(
    client: &DriveClient,
    content: &[u8],
    at: DateTime<Utc>,
) -> BridgeResult<DriveFile> {
    let name = save_filename(at);
    debug!("Uploading {} ({} bytes)", name, content.len());

    let metadata = build_metadata_json(&name, &client.config().upload_parent);
    let boundary = format!("driveport_{}", uuid::Uuid::new_v4());
    let body = build_multipart_body(&metadata, content, &boundary);
    let content_type = format!("multipart/form-data; boundary={}", boundary);

    let url = DriveClient::multipart_upload_url()?;
    let file: DriveFile = client.post_bytes(&url, &content_type, body).await?;

    info!("Uploaded {} as file {}", name, file.id);
    Ok(file)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    /// Split a multipart body into its parts (header block + content).
    fn parts(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
        let text = body.to_vec();
        let delim = format!("--{}", boundary);
        let closing = format!("--{}--", boundary);

        let mut segments: Vec<Vec<u8>> = Vec::new();
        let mut rest = &text[..];
        loop {
            let Some(start) = find(rest, delim.as_bytes()) else {
                break;
            };
            rest = &rest[start + delim.len()..];
            if rest.starts_with(b"--") {
                break; // closing delimiter
            }
            let end = find(rest, delim.as_bytes()).unwrap_or(rest.len());
            segments.push(rest[..end].to_vec());
            rest = &rest[end..];
        }
        assert!(
            find(&text, closing.as_bytes()).is_some(),
            "missing closing delimiter"
        );

        segments
            .into_iter()
            .map(|seg| {
                let split = find(&seg, b"\r\n\r\n").expect("part without header block");
                let headers = String::from_utf8_lossy(&seg[..split]).to_string();
                let mut content = seg[split + 4..].to_vec();
                // trailing CRLF before the next delimiter
                if content.ends_with(b"\r\n") {
                    content.truncate(content.len() - 2);
                }
                (headers, content)
            })
            .collect()
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn part_name(headers: &str) -> Option<String> {
        headers
            .split("name=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .map(|s| s.to_string())
    }

    #[test]
    fn filename_is_date_only() {
        let at: DateTime<Utc> = "2024-03-05T10:00:00Z".parse().unwrap();
        assert_eq!(save_filename(at), "routes_2024-03-05.json");
    }

    #[test]
    fn filename_ignores_time_component() {
        let morning: DateTime<Utc> = "2025-12-31T00:00:01Z".parse().unwrap();
        let night: DateTime<Utc> = "2025-12-31T23:59:59Z".parse().unwrap();
        assert_eq!(save_filename(morning), save_filename(night));
    }

    #[test]
    fn metadata_json_fields() {
        let json = build_metadata_json("routes_2024-03-05.json", "root");
        let val: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val["name"], "routes_2024-03-05.json");
        assert_eq!(val["mimeType"], "application/json");
        assert_eq!(val["parents"], serde_json::json!(["root"]));
    }

    #[test]
    fn body_has_exactly_two_named_parts() {
        let metadata = build_metadata_json("routes_2024-03-05.json", "root");
        let body = build_multipart_body(&metadata, br#"{"a":1}"#, "testboundary");
        let parts = parts(&body, "testboundary");

        assert_eq!(parts.len(), 2);
        assert_eq!(part_name(&parts[0].0).as_deref(), Some("metadata"));
        assert_eq!(part_name(&parts[1].0).as_deref(), Some("file"));
    }

    #[test]
    fn body_metadata_part_parses_as_file_metadata() {
        let metadata = build_metadata_json("routes_2024-03-05.json", "root");
        let body = build_multipart_body(&metadata, b"[]", "testboundary");
        let parts = parts(&body, "testboundary");

        let meta: serde_json::Value = serde_json::from_slice(&parts[0].1).unwrap();
        assert_eq!(meta["name"], "routes_2024-03-05.json");
        assert_eq!(meta["mimeType"], "application/json");
        assert_eq!(meta["parents"], serde_json::json!(["root"]));
    }

    #[test]
    fn body_file_part_carries_content_verbatim() {
        let metadata = build_metadata_json("routes_2024-03-05.json", "root");
        let content = br#"{"routes":[1,2,3]}"#;
        let body = build_multipart_body(&metadata, content, "testboundary");
        let parts = parts(&body, "testboundary");

        assert_eq!(parts[1].1, content.to_vec());
        assert!(parts[1].0.contains("Content-Type: application/json"));
    }

    #[test]
    fn body_ends_with_closing_delimiter() {
        let body = build_multipart_body("{}", b"x", "b1");
        assert!(body.ends_with(b"--b1--"));
    }
}
