//! Human readable descriptions for engine warning and error codes

/// Describe an engine status code
///
/// Join results are negative on failure, so the absolute value is looked up.
pub fn describe(code: i32) -> &'static str {
    match code.unsigned_abs() {
        0 => "No error",
        1 => "General error with no classified reason",
        2 => "Invalid parameter",
        3 => "Engine is not ready",
        4 => "Method not supported",
        5 => "Request rejected",
        6 => "Buffer too small",
        7 => "Engine is not initialized",
        8 => "Invalid view",
        9 => "No permission to access the audio device",
        10 => "Request timed out",
        16 => "Initializing",
        17 => "Join channel rejected, the user is already in a channel",
        18 => "Leave channel rejected, the user is not in a channel",
        20 => "Request pending",
        101 => "Invalid app ID",
        102 => "Invalid channel name",
        103 => "No available channel resources",
        104 => "Channel lookup timed out",
        106 => "Opening the channel timed out",
        107 => "Server rejected the request to open the channel",
        109 => "Token expired",
        110 => "Invalid token",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_codes_use_absolute_value() {
        assert_eq!(describe(-102), "Invalid channel name");
        assert_eq!(describe(102), describe(-102));
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(describe(99_999), "Unknown error");
        assert_eq!(describe(i32::MIN), "Unknown error");
    }
}
