/// Protocol version sent in every request.
pub const TUS_VERSION: &str = "1.0.0";

/// Header carrying the protocol version.
pub const TUS_RESUMABLE: &str = "Tus-Resumable";

/// Total length of the upload, sent on creation.
pub const UPLOAD_LENGTH: &str = "Upload-Length";

/// Byte offset of a patch request, or the acknowledged offset in a response.
pub const UPLOAD_OFFSET: &str = "Upload-Offset";

/// Encoded key/value metadata sent on creation.
pub const UPLOAD_METADATA: &str = "Upload-Metadata";

/// Location of the upload resource created by the server.
pub const LOCATION: &str = "Location";

/// Content type of every patch body.
pub const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// Metadata key holding the file name. Always present.
pub const METADATA_FILENAME: &str = "filename";

/// Metadata key holding the probed content type. Optional.
pub const METADATA_FILETYPE: &str = "filetype";
