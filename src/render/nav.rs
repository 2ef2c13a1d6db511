//! Navigation helpers exposed to templates.

use crate::markdown::Heading;

/// One step of a page's ancestor trail, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub url: String,
    pub title: String,
}

/// Build the ancestor-trail `<nav>` for `path_nav()`.
///
/// `start` and `end` slice the trail the way the script language's users
/// expect (negative indices count from the end). If fewer than `min` links
/// remain, the result is the empty string.
pub fn path_nav(trail: &[NavEntry], start: Option<i64>, end: Option<i64>, min: i64) -> String {
    let len = trail.len();
    let start = clamp_index(start.unwrap_or(0), len);
    let end = clamp_index(end.unwrap_or(len as i64), len);

    let links: Vec<String> = trail
        .get(start..end.max(start))
        .unwrap_or(&[])
        .iter()
        .map(|entry| format!("<a href=\"{}\">{}</a>", entry.url, entry.title))
        .collect();

    if (links.len() as i64) < min {
        return String::new();
    }

    format!("<nav class=\"skiff-page-path\">{}</nav>", links.concat())
}

/// Build the table-of-contents `<nav>` for `toc_nav()`. Only top-level
/// headings (h1/h2) are listed.
pub fn toc_nav(headings: &[Heading]) -> String {
    let links: Vec<String> = headings
        .iter()
        .filter(|h| h.level <= 2)
        .map(|h| format!("<a href=\"#{}\">{}</a>", h.id, h.text))
        .collect();

    format!("<nav class=\"skiff-page-toc\">{}</nav>", links.concat())
}

fn clamp_index(index: i64, len: usize) -> usize {
    if index < 0 {
        (len as i64 + index).max(0) as usize
    } else {
        (index as usize).min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trail() -> Vec<NavEntry> {
        vec![
            NavEntry {
                url: "/index.html".into(),
                title: "Home".into(),
            },
            NavEntry {
                url: "/guides/index.html".into(),
                title: "Guides".into(),
            },
            NavEntry {
                url: "/guides/setup.html".into(),
                title: "Setup".into(),
            },
        ]
    }

    #[test]
    fn test_path_nav_full_trail() {
        let nav = path_nav(&trail(), None, None, 1);
        assert_eq!(
            nav,
            "<nav class=\"skiff-page-path\">\
             <a href=\"/index.html\">Home</a>\
             <a href=\"/guides/index.html\">Guides</a>\
             <a href=\"/guides/setup.html\">Setup</a></nav>"
        );
    }

    #[test]
    fn test_path_nav_start_trims_the_root() {
        let nav = path_nav(&trail(), Some(1), None, 1);
        assert!(!nav.contains("Home"));
        assert!(nav.contains("Guides"));
    }

    #[test]
    fn test_path_nav_negative_end() {
        let nav = path_nav(&trail(), None, Some(-1), 1);
        assert!(nav.contains("Guides"));
        assert!(!nav.contains("Setup"));
    }

    #[test]
    fn test_path_nav_min_suppresses_short_trails() {
        assert_eq!(path_nav(&trail()[..1], None, None, 2), "");
    }

    #[test]
    fn test_toc_nav_filters_deep_headings() {
        let headings = vec![
            Heading {
                level: 1,
                id: "intro".into(),
                text: "Intro".into(),
            },
            Heading {
                level: 3,
                id: "detail".into(),
                text: "Detail".into(),
            },
        ];

        let nav = toc_nav(&headings);
        assert!(nav.contains("#intro"));
        assert!(!nav.contains("#detail"));
    }
}
