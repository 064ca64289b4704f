use std::borrow::Cow;

/// Candidate fill characters for the short-key placeholder. There are
/// `MASK_MIN_CHARS` of them, so a short key can never contain them all.
const MASK_FILL: [char; MASK_MIN_CHARS] = ['*', '#', '~', '%', '^', '!', '?', '=', '+', '@', '$', '&'];
const MASK_FILL_LEN: usize = 3;
const MASK_MIN_CHARS: usize = 12;
const MASK_VISIBLE_CHARS: usize = 4;

/// Masks a secret for logging: short keys are fully hidden, longer ones keep
/// four characters at each end.
///
/// A short key becomes `***`, or three of the first fill character the key
/// does not contain, so the placeholder never shares a substring with it.
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() < MASK_MIN_CHARS {
        let fill = MASK_FILL
            .iter()
            .find(|&&c| !chars.contains(&c))
            .copied()
            .unwrap_or('*');
        return std::iter::repeat(fill).take(MASK_FILL_LEN).collect();
    }

    let head: String = chars[..MASK_VISIBLE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - MASK_VISIBLE_CHARS..].iter().collect();
    format!("{head}...{tail}")
}

/// Keeps the first and last `max_chars / 2` characters of `text`, replacing
/// the middle with a marker carrying the original length.
pub fn truncate_content(text: &str, max_chars: usize) -> Cow<'_, str> {
    let total = text.chars().count();
    if total <= max_chars {
        return Cow::Borrowed(text);
    }

    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    Cow::Owned(format!("{head}...({total}chars)...{tail}"))
}
