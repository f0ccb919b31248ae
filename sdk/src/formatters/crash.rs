//! Crash formatter.
//!
//! Builds an upload-ready [`CrashReport`] from the raw exception chain and
//! thread stacks captured by the crash handler. The report's title and
//! description come from the root cause; the summary field lists the whole
//! cause chain, or is empty when the thrown exception had none.

use chrono::{DateTime, Utc};
use shared::models::{
    CrashFrame, CrashReport, CrashThread, MeasurementRecord, MeasurementValue, StackFrame,
};

use super::{FormattedOutput, Formatter};

fn report_frames(frames: &[StackFrame]) -> Vec<CrashFrame> {
    frames
        .iter()
        .enumerate()
        .map(|(sequence, frame)| CrashFrame {
            class_name: frame.class_name.clone(),
            function: frame.function.clone(),
            file: frame.file.clone(),
            line: frame.line,
            sequence: u32::try_from(sequence).unwrap_or(u32::MAX),
        })
        .collect()
}

/// Formats crash data into a crash report.
pub struct CrashFormatter;

impl Formatter for CrashFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let MeasurementValue::Crash(crash) = &record.value else {
            return Vec::new();
        };

        let root = crash.exception.root_cause();
        let all_exception_names = if crash.exception.cause.is_some() {
            crash.exception.chain_class_names().join(",")
        } else {
            String::new()
        };

        let threads = crash
            .threads
            .iter()
            .map(|thread| CrashThread {
                name: thread.name.clone(),
                id: thread.id,
                crashed: thread.crashed,
                frames: report_frames(&thread.frames),
            })
            .collect();

        let report = CrashReport {
            title: root.class_name.clone(),
            description: root.message.clone().unwrap_or_default(),
            all_exception_names,
            threads,
            crashed_at: DateTime::from_timestamp_millis(crash.crashed_at_ms)
                .unwrap_or_else(Utc::now),
        };

        vec![FormattedOutput::Crash(report)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CrashData, DataSourceType, ExceptionData, ThreadSnapshot};

    fn frame(class_name: &str, function: &str, line: i64) -> StackFrame {
        StackFrame {
            class_name: class_name.to_string(),
            function: function.to_string(),
            file: Some("App.java".to_string()),
            line,
        }
    }

    fn chained_crash() -> CrashData {
        let root = ExceptionData {
            class_name: "java.io.IOException".to_string(),
            message: Some("disk full".to_string()),
            frames: vec![frame("com.example.Writer", "write", 42)],
            cause: None,
        };
        let outer = ExceptionData {
            class_name: "java.lang.RuntimeException".to_string(),
            message: Some("write failed".to_string()),
            frames: vec![frame("com.example.Saver", "save", 17)],
            cause: Some(Box::new(root)),
        };

        CrashData {
            exception: outer,
            threads: vec![
                ThreadSnapshot {
                    name: "main".to_string(),
                    id: 1,
                    crashed: true,
                    frames: vec![
                        frame("com.example.Saver", "save", 17),
                        frame("com.example.App", "onClick", 101),
                    ],
                },
                ThreadSnapshot {
                    name: "worker-1".to_string(),
                    id: 12,
                    crashed: false,
                    frames: vec![frame("java.lang.Object", "wait", 0)],
                },
            ],
            crashed_at_ms: 1_600_000_000_000,
        }
    }

    fn format_crash(data: CrashData) -> CrashReport {
        let record =
            MeasurementRecord::new(DataSourceType::Crash, MeasurementValue::Crash(data));
        let outputs = CrashFormatter.format(&record);
        assert_eq!(outputs.len(), 1);
        match outputs.into_iter().next().unwrap() {
            FormattedOutput::Crash(report) => report,
            other => panic!("expected a crash report, got {other:?}"),
        }
    }

    #[test]
    fn test_title_and_description_from_root_cause() {
        let report = format_crash(chained_crash());

        assert_eq!(report.title, "java.io.IOException");
        assert_eq!(report.description, "disk full");
    }

    #[test]
    fn test_summary_lists_whole_chain() {
        let report = format_crash(chained_crash());

        assert_eq!(
            report.all_exception_names,
            "java.lang.RuntimeException,java.io.IOException"
        );
    }

    #[test]
    fn test_summary_empty_without_chain() {
        let mut data = chained_crash();
        data.exception.cause = None;

        let report = format_crash(data);
        assert_eq!(report.all_exception_names, "");
        assert_eq!(report.title, "java.lang.RuntimeException");
    }

    #[test]
    fn test_missing_message_becomes_empty_description() {
        let mut data = chained_crash();
        data.exception = ExceptionData {
            class_name: "java.lang.NullPointerException".to_string(),
            message: None,
            frames: Vec::new(),
            cause: None,
        };

        let report = format_crash(data);
        assert_eq!(report.description, "");
    }

    #[test]
    fn test_threads_and_frame_sequences() {
        let report = format_crash(chained_crash());

        assert_eq!(report.threads.len(), 2);

        let crashed = report.crashed_thread().unwrap();
        assert_eq!(crashed.name, "main");
        assert_eq!(crashed.frames.len(), 2);
        assert_eq!(crashed.frames[0].sequence, 0);
        assert_eq!(crashed.frames[1].sequence, 1);
        assert_eq!(crashed.frames[1].function, "onClick");

        assert!(!report.threads[1].crashed);
    }

    #[test]
    fn test_wrong_typed_content_formats_to_nothing() {
        let record = MeasurementRecord::text(DataSourceType::Crash, "boom");
        assert!(CrashFormatter.format(&record).is_empty());
    }
}
