use chrono::NaiveDate;

/// Mobile numbers accepted for accounts: mainland China, Hong Kong,
/// Macau or Taiwan formats.
pub fn is_mobile(s: &str) -> bool {
    is_mobile_cn(s) || is_mobile_hk(s) || is_mobile_mo(s) || is_mobile_tw(s)
}

/// Mainland: 11 digits starting with 1.
fn is_mobile_cn(s: &str) -> bool {
    s.len() == 11 && s.starts_with('1') && all_digits(s)
}

/// Hong Kong: 8 digits starting with 6 or 9.
fn is_mobile_hk(s: &str) -> bool {
    s.len() == 8 && (s.starts_with('6') || s.starts_with('9')) && all_digits(s)
}

/// Macau: 7 digits starting with 6.
fn is_mobile_mo(s: &str) -> bool {
    s.len() == 7 && s.starts_with('6') && all_digits(s)
}

/// Taiwan: 9 digits starting with 9.
fn is_mobile_tw(s: &str) -> bool {
    s.len() == 9 && s.starts_with('9') && all_digits(s)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Passwords: 6-16 characters from the app's allowed set.
pub fn is_password(s: &str) -> bool {
    (6..=16).contains(&s.len())
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || "_.-~@#$%^&*".contains(c)
        })
}

/// SMS verification codes: exactly 6 alphanumeric characters.
pub fn is_sms_code(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Calendar dates in `YYYY-MM-DD`.  Rejects impossible dates like
/// 2018-06-31, not just bad shapes.  Returns the parsed date so callers
/// can apply their own range checks on top.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
