use voxkit_foundation::VoxKitError;
use voxkit_transcript::TranscribeStream;

/// Observer events for one streaming transcription cycle.
///
/// Per capture cycle the sequence is `Connecting`, then `Started` once the
/// session opens, any number of `Updated`, and exactly one `Completed` —
/// whether the cycle ended with a natural stop or an error.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connecting,
    Started,
    Updated(TranscribeStream),
    Completed {
        stream: TranscribeStream,
        error: Option<VoxKitError>,
    },
}
