use extract::Section;
use regex::Regex;

/// Starts with an upper-case letter, at least four characters of letters,
/// digits, spaces, commas or hyphens.
pub const DEFAULT_HEADER_PATTERN: &str = r"^[A-Z][A-Za-z0-9 ,\-]{3,}$";

/// Split text into sections at header lines.
///
/// A trimmed line matching `header` opens a new section whose level is the
/// number of periods in the header plus one. Text before the first header
/// is dropped.
pub fn detect_sections(text: &str, header: &Regex) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if header.is_match(trimmed) {
            if let Some((title, lines)) = current.take() {
                sections.push(finish(title, lines));
            }
            current = Some((trimmed.to_string(), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((title, lines)) = current {
        sections.push(finish(title, lines));
    }

    sections
}

fn finish(title: String, lines: Vec<&str>) -> Section {
    let level = title.matches('.').count() + 1;
    let content = lines.join("\n").trim().to_string();
    Section::new(title, level, content)
}
