//! S3 XML bodies: batch delete, multipart, copy and error documents
//!
//! Parsers are strict about document shape. A body that is empty, truncated
//! or rooted at an unexpected element is an `XmlParse` error, never an
//! implicit success, so a partially failed batch cannot go unnoticed.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write as _;

use crate::s3::error::{Result, StorageError};
use crate::s3::types::{
    CompleteMultipartUploadResponse, CompletedPart, CreateMultipartUploadResponse, DeleteError,
    DeleteObjectsResponse, DeletedObject,
};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Escape XML special characters into an existing buffer
pub fn xml_escape_into(buf: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            _ => buf.push(ch),
        }
    }
}

/// `<Delete>` body for a batch delete
pub fn build_delete_body(keys: &[String]) -> String {
    let mut xml = String::with_capacity(keys.len() * 60 + 80);
    xml.push_str(XML_DECLARATION);
    xml.push_str("<Delete><Quiet>false</Quiet>");
    for key in keys {
        xml.push_str("<Object><Key>");
        xml_escape_into(&mut xml, key);
        xml.push_str("</Key></Object>");
    }
    xml.push_str("</Delete>");
    xml
}

/// `<CompleteMultipartUpload>` body; parts must already be sorted
pub fn build_complete_body(parts: &[CompletedPart]) -> String {
    let mut xml = String::with_capacity(parts.len() * 100 + 100);
    xml.push_str(XML_DECLARATION);
    xml.push_str("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str("<Part><PartNumber>");
        let _ = write!(xml, "{}", part.part_number);
        xml.push_str("</PartNumber><ETag>\"");
        xml_escape_into(&mut xml, part.etag.trim_matches('"'));
        xml.push_str("\"</ETag></Part>");
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Tracks the root element and nesting depth of one document
#[derive(Default)]
struct Shape {
    root: Option<String>,
    depth: usize,
}

impl Shape {
    fn open(&mut self, e: &BytesStart<'_>) {
        if self.root.is_none() {
            self.root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
        }
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// The document was complete and rooted at `expected`
    fn finish(&self, expected: &str) -> Result<()> {
        if self.depth != 0 {
            return Err(StorageError::XmlParse(format!(
                "unexpected end of document inside <{}>",
                self.root().unwrap_or(expected)
            )));
        }
        match self.root() {
            Some(root) if root == expected => Ok(()),
            Some(root) => Err(StorageError::XmlParse(format!(
                "expected <{}>, found <{}>",
                expected, root
            ))),
            None => Err(StorageError::XmlParse(format!(
                "expected <{}>, found no element",
                expected
            ))),
        }
    }
}

fn reader(xml_data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;
    reader
}

/// An `<Error>` document returned with a success status
fn embedded_error(fields: &ErrorFields) -> StorageError {
    StorageError::Server {
        status: 200,
        message: fields
            .message
            .clone()
            .unwrap_or_else(|| "Request failed inside a successful response".to_string()),
        code: fields.code.clone(),
    }
}

#[derive(Debug, Default)]
struct ErrorFields {
    code: Option<String>,
    message: Option<String>,
}

/// Parse a `DeleteResult` document
pub fn parse_delete_response(xml_data: &[u8]) -> Result<DeleteObjectsResponse> {
    let mut reader = reader(xml_data);
    let mut shape = Shape::default();

    let mut response = DeleteObjectsResponse::default();
    let mut current_deleted: Option<DeletedObject> = None;
    let mut current_error: Option<DeleteError> = None;
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                shape.open(&e);
                match e.local_name().as_ref() {
                    b"Deleted" => current_deleted = Some(DeletedObject::new(String::new())),
                    b"Error" if shape.depth > 1 => {
                        current_error = Some(DeleteError {
                            key: String::new(),
                            code: String::new(),
                            message: String::new(),
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // <DeleteResult/> is a complete, empty result
                if shape.root.is_none() {
                    shape.open(&e);
                    shape.close();
                }
            }
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                shape.close();
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.key = std::mem::take(&mut current_text);
                        } else if let Some(ref mut error) = current_error {
                            error.key = std::mem::take(&mut current_text);
                        }
                    }
                    b"VersionId" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.version_id = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"Code" => {
                        if let Some(ref mut error) = current_error {
                            error.code = std::mem::take(&mut current_text);
                        }
                    }
                    b"Message" => {
                        if let Some(ref mut error) = current_error {
                            error.message = std::mem::take(&mut current_text);
                        }
                    }
                    b"Deleted" => {
                        if let Some(deleted) = current_deleted.take() {
                            response.deleted.push(deleted);
                        }
                    }
                    b"Error" => {
                        if let Some(error) = current_error.take() {
                            response.errors.push(error);
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::XmlParse(e.to_string())),
            _ => {}
        }
    }

    shape.finish("DeleteResult")?;
    Ok(response)
}

/// Parse an `InitiateMultipartUploadResult` document
pub fn parse_create_multipart_response(xml_data: &[u8]) -> Result<CreateMultipartUploadResponse> {
    let mut reader = reader(xml_data);
    let mut shape = Shape::default();

    let mut bucket = String::new();
    let mut key = String::new();
    let mut upload_id = String::new();
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => shape.open(&e),
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                shape.close();
                match e.local_name().as_ref() {
                    b"Bucket" => bucket = std::mem::take(&mut current_text),
                    b"Key" => key = std::mem::take(&mut current_text),
                    b"UploadId" => upload_id = std::mem::take(&mut current_text),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::XmlParse(e.to_string())),
            _ => {}
        }
    }

    shape.finish("InitiateMultipartUploadResult")?;
    if upload_id.is_empty() {
        return Err(StorageError::InvalidResponse(
            "Missing UploadId in response".to_string(),
        ));
    }

    Ok(CreateMultipartUploadResponse {
        bucket,
        key,
        upload_id,
    })
}

/// Parse a `CompleteMultipartUploadResult` document.
///
/// S3 may report a failed completion as an `<Error>` document with a 200
/// status; that becomes a `Server` error.
pub fn parse_complete_multipart_response(
    xml_data: &[u8],
) -> Result<CompleteMultipartUploadResponse> {
    let mut reader = reader(xml_data);
    let mut shape = Shape::default();

    let mut location = None;
    let mut bucket = String::new();
    let mut key = String::new();
    let mut etag = String::new();
    let mut error = ErrorFields::default();
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => shape.open(&e),
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                shape.close();
                match e.local_name().as_ref() {
                    b"Location" => location = Some(std::mem::take(&mut current_text)),
                    b"Bucket" => bucket = std::mem::take(&mut current_text),
                    b"Key" => key = std::mem::take(&mut current_text),
                    b"ETag" => {
                        etag = std::mem::take(&mut current_text).trim_matches('"').to_string()
                    }
                    b"Code" => error.code = Some(std::mem::take(&mut current_text)),
                    b"Message" => error.message = Some(std::mem::take(&mut current_text)),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::XmlParse(e.to_string())),
            _ => {}
        }
    }

    if shape.root() == Some("Error") && shape.depth == 0 {
        return Err(embedded_error(&error));
    }
    shape.finish("CompleteMultipartUploadResult")?;

    Ok(CompleteMultipartUploadResponse {
        location,
        bucket,
        key,
        etag,
    })
}

/// ETag and modification time from a `CopyObjectResult` document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResultFields {
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Parse a `CopyObjectResult` document.
///
/// Like completion, a copy can fail after the 200 status was sent.
pub fn parse_copy_object_response(xml_data: &[u8]) -> Result<CopyResultFields> {
    let mut reader = reader(xml_data);
    let mut shape = Shape::default();

    let mut etag = String::new();
    let mut last_modified = None;
    let mut error = ErrorFields::default();
    let mut current_text = String::with_capacity(128);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => shape.open(&e),
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                shape.close();
                match e.local_name().as_ref() {
                    b"ETag" => {
                        etag = std::mem::take(&mut current_text).trim_matches('"').to_string()
                    }
                    b"LastModified" => {
                        last_modified = DateTime::parse_from_rfc3339(&current_text)
                            .ok()
                            .map(|d| d.with_timezone(&Utc));
                    }
                    b"Code" => error.code = Some(std::mem::take(&mut current_text)),
                    b"Message" => error.message = Some(std::mem::take(&mut current_text)),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::XmlParse(e.to_string())),
            _ => {}
        }
    }

    if shape.root() == Some("Error") && shape.depth == 0 {
        return Err(embedded_error(&error));
    }
    shape.finish("CopyObjectResult")?;
    if etag.is_empty() {
        return Err(StorageError::InvalidResponse(
            "Missing ETag in copy response".to_string(),
        ));
    }

    Ok(CopyResultFields {
        etag,
        last_modified,
    })
}

/// `<Code>` of an S3 `<Error>` document, if the body is one
pub fn error_code(xml_data: &[u8]) -> Option<String> {
    if xml_data.is_empty() {
        return None;
    }

    let mut reader = reader(xml_data);
    let mut shape = Shape::default();
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                shape.open(&e);
                if shape.root() != Some("Error") {
                    return None;
                }
            }
            Ok(Event::Text(e)) => {
                current_text = e.unescape().ok()?.into_owned();
            }
            Ok(Event::End(e)) => {
                shape.close();
                if e.local_name().as_ref() == b"Code" && !current_text.is_empty() {
                    return Some(current_text);
                }
                current_text.clear();
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
