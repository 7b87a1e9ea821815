//! Console event formatter: short timestamps, a tree prefix per message level,
//! and INFO left unlabelled.

pub mod filters;
pub mod levels;
pub mod styling;

use chrono::Local;
use console::style;
use std::fmt::{self as std_fmt, Debug};
use tracing::Level;
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};

use crate::utils::logging::text_utils;
use filters::should_show_message;
use levels::determine_processing_level;
use styling::{format_level, get_tree_prefix, style_message};

const LINE_WIDTH: usize = 120;
const TIMESTAMP_WIDTH: usize = 11; // "[HH:MM:SS] "
const PREFIX_WIDTH: usize = 2;

pub struct CleanFormatter {
    show_timestamps: bool,
    use_color: bool,
}

impl CleanFormatter {
    pub fn new(show_timestamps: bool, use_color: bool) -> Self {
        Self {
            show_timestamps,
            use_color,
        }
    }

    fn format_message(&self, message: &str, metadata_level: &Level) -> String {
        let level = determine_processing_level(message);
        let prefix = get_tree_prefix(level);

        let level_indicator = format_level(metadata_level, self.use_color);
        let (level_prefix, level_width) = if level_indicator.is_empty() {
            (String::new(), 0)
        } else {
            // width of the plain label, ANSI codes excluded
            (format!("{} ", level_indicator), 6)
        };

        let timestamp_width = if self.show_timestamps { TIMESTAMP_WIDTH } else { 0 };
        let indent = timestamp_width + PREFIX_WIDTH + level_width;
        let available_width = LINE_WIDTH.saturating_sub(indent);

        let wrapped = text_utils::wrap_text(message, available_width);
        let mut lines = wrapped.lines();
        let first = lines.next().unwrap_or_default();

        let mut output = format!(
            "{} {}{}",
            prefix,
            level_prefix,
            style_message(first, level, self.use_color)
        );
        for line in lines {
            output.push('\n');
            output.push_str(&" ".repeat(indent));
            output.push_str(&style_message(line, level, self.use_color));
        }
        output
    }
}

impl<S, N> FormatEvent<S, N> for CleanFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std_fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if !should_show_message(&visitor.message) {
            return Ok(());
        }

        let mut output = String::new();
        if self.show_timestamps {
            let now = Local::now().format("%H:%M:%S").to_string();
            let timestamp = if self.use_color {
                style(now).dim().to_string()
            } else {
                now
            };
            output.push_str(&format!("[{}] ", timestamp));
        }

        output.push_str(&self.format_message(&visitor.message, event.metadata().level()));
        writeln!(writer, "{}", output)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value).trim_matches('"').to_string();
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}
