//! Stream validation: content hash and signature checks.

use crate::error::ValidationError;
use crate::schema::Schema;
use crate::stream::ContentStream;

/// Validate a stream on its own.
///
/// This performs:
/// - Content hash verification against the record's canonical bytes
/// - Holder signature verification over the content hash
pub fn validate_stream(stream: &ContentStream) -> Result<(), ValidationError> {
    let computed = stream.record().content_hash();
    if computed != stream.content_hash() {
        return Err(ValidationError::ContentHashMismatch {
            expected: stream.content_hash().to_string(),
            actual: computed.to_string(),
        });
    }

    stream.verify_signature()
}

/// Validate a stream against the schema it claims to follow.
pub fn validate_stream_for_schema(
    stream: &ContentStream,
    schema: &Schema,
) -> Result<(), ValidationError> {
    if stream.schema_id() != schema.id() {
        return Err(ValidationError::SchemaMismatch {
            expected: schema.id().to_string(),
            actual: stream.schema_id().to_string(),
        });
    }
    schema.check_content(stream.content())?;
    validate_stream(stream)
}
