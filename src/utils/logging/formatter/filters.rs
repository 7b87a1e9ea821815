//! Message filtering to remove noisy log output

/// ffmpeg and decoder chatter that adds nothing at the console.
const NOISE_PATTERNS: &[&str] = &[
    "deprecated pixel format used",
    "Last message repeated",
    "Consider increasing the value for the 'analyzeduration'",
    "Could not find codec parameters for stream",
    "[swscaler @",
    "No accelerated colorspace conversion found",
];

/// Returns true if the message should be displayed, false if it should be filtered out
pub fn should_show_message(message: &str) -> bool {
    !NOISE_PATTERNS.iter().any(|pattern| message.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_show_normal_message() {
        assert!(should_show_message("Processing portrait.mp4 (video)"));
        assert!(should_show_message("✓ portrait.mp4 -> output/portrait.mp4"));
    }

    #[test]
    fn test_should_filter_ffmpeg_noise() {
        assert!(!should_show_message(
            "[swscaler @ 0x55d0c8a4c640] deprecated pixel format used, make sure you did set range correctly"
        ));
        assert!(!should_show_message("    Last message repeated 3 times"));
    }
}
