use once_cell::sync::Lazy;
use regex::Regex;

/// Leading 2-3 letter carrier prefix; anything shorter or longer is not a
/// prefix we recognize (1-letter and 4+ letter carrier codes are out of scope).
static CALLSIGN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]{2,3})").unwrap());

/// Split a raw callsign into (carrier prefix, flight number).
///
/// The prefix is normalized to uppercase. When no 2-3 letter alphabetic
/// prefix is present, the prefix is empty and the whole trimmed callsign is
/// returned as the number.
pub fn parse_callsign(callsign: &str) -> (String, String) {
    let cs = callsign.trim();
    if cs.is_empty() {
        return (String::new(), String::new());
    }

    match CALLSIGN_RE.find(cs) {
        Some(m) => {
            let prefix = m.as_str().to_ascii_uppercase();
            let number = cs[m.end()..].trim().to_string();
            (prefix, number)
        }
        None => (String::new(), cs.to_string()),
    }
}
