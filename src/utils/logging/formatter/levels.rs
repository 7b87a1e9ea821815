/// Processing level determination for hierarchical log output

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingLevel {
    Root,   // Session and per-job headers
    Stage,  // Job outcomes and renders
    Step,   // Setup and intermediate results
    Detail, // Everything else
}

const ROOT_PREFIXES: &[&str] = &["Processing ", "Watching ", "Shutting down", "Session summary"];

const STAGE_MARKERS: &[&str] = &["✓ ", "✗ ", "↷ ", "Rendering ", "Wrote still "];

const STEP_PATTERNS: &[&str] = &[
    "Loaded background",
    "Background:",
    "Found ",
    "is available",
    "Canvas ",
    "Acceptance policy",
    "Waiting for ",
];

/// Determines the processing level of a log message based on its content
pub fn determine_processing_level(message: &str) -> ProcessingLevel {
    if ROOT_PREFIXES.iter().any(|p| message.starts_with(p)) {
        return ProcessingLevel::Root;
    }

    if STAGE_MARKERS.iter().any(|p| message.starts_with(p)) {
        return ProcessingLevel::Stage;
    }

    if STEP_PATTERNS.iter().any(|p| message.contains(p)) {
        return ProcessingLevel::Step;
    }

    ProcessingLevel::Detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_level() {
        assert_eq!(
            determine_processing_level("Processing portrait.mp4 (video)"),
            ProcessingLevel::Root
        );
        assert_eq!(
            determine_processing_level("Watching input (every 1000ms)"),
            ProcessingLevel::Root
        );
    }

    #[test]
    fn test_stage_level() {
        assert_eq!(
            determine_processing_level("✓ portrait.mp4 -> output/portrait.mp4 (2.10 MB in 4.2s)"),
            ProcessingLevel::Stage
        );
        assert_eq!(
            determine_processing_level("✗ broken.png failed: Decode failed: bad header"),
            ProcessingLevel::Stage
        );
        assert_eq!(
            determine_processing_level("Rendering clip.mov -> output/clip.mp4"),
            ProcessingLevel::Stage
        );
    }

    #[test]
    fn test_step_and_detail_level() {
        assert_eq!(
            determine_processing_level("Loaded background bg.jpg (3840x2160 -> 1920x1080)"),
            ProcessingLevel::Step
        );
        assert_eq!(
            determine_processing_level("Found 3 existing file(s) in input"),
            ProcessingLevel::Step
        );
        assert_eq!(
            determine_processing_level("settled at 2048 bytes"),
            ProcessingLevel::Detail
        );
    }
}
