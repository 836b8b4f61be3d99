use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

/// Content type sent with every archive upload.
pub const GZIP_CONTENT_TYPE: &str = "application/gzip";

/// Characters that cannot appear raw inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode a single drive path segment (folder or file name).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Remote location of one backup archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub drive_id: String,
    pub backup_folder: String,
    pub day_folder: String,
    pub filename: String,
}

impl UploadTarget {
    pub fn new(
        drive_id: impl Into<String>,
        backup_folder: impl Into<String>,
        day_folder: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            drive_id: drive_id.into(),
            backup_folder: backup_folder.into(),
            day_folder: day_folder.into(),
            filename: filename.into(),
        }
    }

    /// Drive-relative item path, e.g. `db/2024-01-15/dump.sql.gz`.
    pub fn item_path(&self) -> String {
        format!(
            "{}/{}/{}",
            encode_segment(&self.backup_folder),
            encode_segment(&self.day_folder),
            encode_segment(&self.filename)
        )
    }

    /// Graph path (relative to the API root) for a simple content PUT.
    pub fn content_path(&self) -> String {
        format!(
            "drives/{}/root:/{}:/content",
            encode_segment(&self.drive_id),
            self.item_path()
        )
    }
}

/// Drive item returned by a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}
