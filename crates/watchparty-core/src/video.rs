//! Video URL and timestamp helpers shared by every front end.

use std::sync::OnceLock;

use regex::Regex;

/// Length of a YouTube video ID.
pub const VIDEO_ID_LEN: usize = 11;

fn video_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
            .expect("video URL pattern is valid")
    })
}

/// Extract the video ID from a YouTube URL.
///
/// Accepts `youtu.be/ID`, `watch?v=ID`, `&v=ID`, `embed/ID`, `v/ID` and
/// `u/x/ID` shapes. Returns `None` unless the captured ID is exactly
/// [`VIDEO_ID_LEN`] characters.
pub fn extract_video_id(url: &str) -> Option<String> {
    let caps = video_url_pattern().captures(url.trim())?;
    let id = caps.get(2)?.as_str();
    (id.chars().count() == VIDEO_ID_LEN).then(|| id.to_string())
}

/// Format seconds as `mm:ss`.
///
/// Non-finite and negative inputs render as `00:00`. Fractions are
/// truncated and whole hours wrap, so 3661 seconds renders as `01:01`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", (total / 60) % 60, total % 60)
}

/// Parse a user-entered timestamp: plain seconds (`90`, `12.5`), `mm:ss`,
/// or `h:mm:ss`.
pub fn parse_timestamp(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn extract_canonical_shapes() {
        for url in [
            format!("https://youtu.be/{ID}"),
            format!("https://www.youtube.com/watch?v={ID}"),
            format!("https://www.youtube.com/embed/{ID}"),
            format!("https://www.youtube.com/v/{ID}"),
            format!("https://www.youtube.com/watch?feature=share&v={ID}"),
            format!("  https://youtu.be/{ID}?t=30  "),
            format!("https://www.youtube.com/watch?v={ID}#comments"),
        ] {
            assert_eq!(extract_video_id(&url).as_deref(), Some(ID), "url: {url}");
        }
    }

    #[test]
    fn extract_rejects_wrong_length() {
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQx"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
    }

    #[test]
    fn extract_rejects_non_matching() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("https://example.com/video/123"), None);
    }

    #[test]
    fn format_basic() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.0), "01:05");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(599.0), "09:59");
    }

    #[test]
    fn format_degenerate_inputs() {
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00");
        assert_eq!(format_time(-12.0), "00:00");
    }

    #[test]
    fn format_wraps_hours() {
        assert_eq!(format_time(3661.0), "01:01");
    }

    #[test]
    fn parse_timestamps() {
        assert_eq!(parse_timestamp("90"), Some(90.0));
        assert_eq!(parse_timestamp("12.5"), Some(12.5));
        assert_eq!(parse_timestamp("1:05"), Some(65.0));
        assert_eq!(parse_timestamp("1:00:00"), Some(3600.0));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("-4"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
    }
}
