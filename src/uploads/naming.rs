//! File names for stored uploads

/// Reduce a client-supplied name to its final path component
///
/// Both separators are honoured since browsers on Windows may send full paths.
pub fn sanitize(client_name: &str) -> Option<String> {
    let name = client_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// Split at the last dot, keeping dotfiles such as `.env` whole
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Strip a trailing ` (n)` counter, returning the bare stem and `n`
fn split_counter(stem: &str) -> (&str, Option<u64>) {
    let Some(inner) = stem.strip_suffix(')') else {
        return (stem, None);
    };
    let Some(open) = inner.rfind(" (") else {
        return (stem, None);
    };

    let digits = &inner[open + 2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (stem, None);
    }

    match digits.parse() {
        Ok(n) => (&inner[..open], Some(n)),
        Err(_) => (stem, None),
    }
}

/// Next name to try after `name` turned out to be taken
///
/// `a.png` becomes `a (1).png`, `a (3).png` becomes `a (4).png`.
pub fn next_candidate(name: &str) -> String {
    let (stem, ext) = split_extension(name);
    let (bare, counter) = split_counter(stem);
    let next = counter.map_or(1, |n| n.saturating_add(1));

    match ext {
        Some(ext) => format!("{} ({}).{}", bare, next, ext),
        None => format!("{} ({})", bare, next),
    }
}

/// Lowercased extension, if any
pub fn extension(name: &str) -> Option<String> {
    split_extension(name).1.map(str::to_ascii_lowercase)
}
