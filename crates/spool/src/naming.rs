//! Output filename derivation.
//!
//! Turns a free-text label (a space title, a user handle) into a short,
//! portable file stem built only from `[A-Za-z0-9_@-]`, then appends the
//! container extension.

use crate::error::SpoolError;
use crate::hls::output::MediaType;

/// Maximum number of characters kept in a sanitized stem.
pub const MAX_STEM_LEN: usize = 50;

/// Stem used when a label sanitizes to nothing.
pub const DEFAULT_STEM: &str = "twitter_space_media";

const SEPARATORS: &[char] = &['-', '_', '@'];

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_separator(c)
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(is_separator)
}

/// Sanitize a label into a file stem (no extension).
///
/// 1. Drops every character outside `[A-Za-z0-9 _@-]`, keeping whitespace
/// 2. Replaces each whitespace run with a single `_`
/// 3. Collapses any separator run that contains `_` into a single `_`
/// 4. Trims leading/trailing separators
/// 5. Truncates to [`MAX_STEM_LEN`] and trims again
///
/// Falls back to [`DEFAULT_STEM`] when nothing survives. Applying it twice
/// gives the same result as applying it once.
///
/// ```
/// use spool_engine::naming::sanitize_stem;
///
/// assert_eq!(sanitize_stem("  My Space! 🎙️ @user  "), "My_Space_user");
/// assert_eq!(sanitize_stem("🎙️"), "twitter_space_media");
/// ```
pub fn sanitize_stem(label: &str) -> String {
    // Steps 1 and 2.
    let mut spaced = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                spaced.push('_');
                in_whitespace = true;
            }
        } else if is_kept(c) {
            spaced.push(c);
            in_whitespace = false;
        }
    }

    // Step 3.
    let mut collapsed = String::with_capacity(spaced.len());
    let mut run = String::new();
    for c in spaced.chars().chain(std::iter::once('\0')) {
        if is_separator(c) {
            run.push(c);
            continue;
        }
        if run.contains('_') {
            collapsed.push('_');
        } else {
            collapsed.push_str(&run);
        }
        run.clear();
        if c != '\0' {
            collapsed.push(c);
        }
    }

    // Steps 4 and 5. Only ASCII remains, so chars and bytes agree.
    let trimmed = trim_separators(&collapsed);
    let truncated = &trimmed[..trimmed.len().min(MAX_STEM_LEN)];
    let stem = trim_separators(truncated);

    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Sanitized stem plus `.mp4` for video or `.mp3` for audio.
pub fn sanitize_filename(label: &str, has_video: bool) -> String {
    let media_type = if has_video {
        MediaType::VideoMp4
    } else {
        MediaType::AudioMpeg
    };
    format!("{}.{}", sanitize_stem(label), media_type.extension())
}

/// Rejects names that cannot be written as a single file in a directory.
pub fn validate_filename(name: &str) -> Result<(), SpoolError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(SpoolError::InvalidFilename {
            name: name.to_string(),
        });
    }
    Ok(())
}
