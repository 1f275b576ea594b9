use uuid::Uuid;

/// Summary of one completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub user_id: String,
    pub session_id: Uuid,
    pub input: String,
    pub output: String,
}

/// Destination for per-turn traces
pub trait TraceSink: Send + Sync {
    fn update_current_trace(&self, record: TraceRecord);
}

/// Writes traces to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn update_current_trace(&self, record: TraceRecord) {
        tracing::info!(
            user_id = %record.user_id,
            session_id = %record.session_id,
            input_chars = record.input.chars().count(),
            output_chars = record.output.chars().count(),
            "turn completed"
        );
        tracing::debug!(input = %record.input, output = %record.output, "turn transcript");
    }
}
