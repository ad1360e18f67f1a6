//! Window classification into short human labels ("enriched names").
//!
//! Browser and editor titles are free text, so classification is a small set
//! of ordered rule tables. Order matters: the first matching rule wins, and
//! the tables must stay stable so labels are reproducible across runs and
//! across backfills of stored activities.

/// Label for browser activity on a site that no rule recognises.
pub const OTHER_SITES_LABEL: &str = "Autres";

/// Substrings of `app_name` identifying a web browser.
const BROWSER_APPS: &[&str] = &[
    "Brave Browser",
    "Google Chrome",
    "Safari",
    "Firefox",
    "Microsoft Edge",
    "Arc",
    "Zen Browser",
    "Zen",
    "Opera",
    "Vivaldi",
    "Chromium",
    "Waterfox",
    "LibreWolf",
];

/// Title suffixes appended by browsers, in the order they are stripped.
const BROWSER_SUFFIXES: &[&str] = &[
    " – Brave",
    " - Brave",
    " – Chrome",
    " - Chrome",
    " – Safari",
    " - Safari",
    " – Firefox",
    " - Firefox",
    " – Edge",
    " - Edge",
    " – Arc",
    " - Arc",
    " – Zen",
    " - Zen",
    " – Opera",
    " - Opera",
    " – Vivaldi",
    " - Vivaldi",
    " – Chromium",
    " - Chromium",
];

/// Substrings of `app_name` identifying a code editor.
const EDITOR_APPS: &[&str] = &["Electron", "Code", "Visual Studio Code", "Cursor", "VSCodium"];

/// Editor workspace names that never identify a project.
const GENERIC_WORKSPACES: &[&str] = &["Perso", "Workspace", "Visual Studio Code"];

/// Separator editors place between file, project and workspace.
const EDITOR_SEPARATOR: &str = " — ";

/// A test against a lower-cased browser title.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains(&'static str),
    EndsWith(&'static str),
}

impl Pattern {
    fn matches(self, title: &str) -> bool {
        match self {
            Self::Contains(needle) => title.contains(needle),
            Self::EndsWith(suffix) => title.ends_with(suffix),
        }
    }
}

/// A site signature: any matching pattern yields `label`.
#[derive(Debug)]
struct SiteRule {
    label: &'static str,
    patterns: &'static [Pattern],
}

impl SiteRule {
    fn matches(&self, title: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(title))
    }
}

const fn site(label: &'static str, patterns: &'static [Pattern]) -> SiteRule {
    SiteRule { label, patterns }
}

use Pattern::{Contains, EndsWith};

/// Site signatures in priority order.
static SITE_RULES: &[SiteRule] = &[
    // X titles look like `Name sur X : "..." / X`, `Accueil / X` or `(3) X`.
    site(
        "X",
        &[
            Contains(" sur x :"),
            Contains(" sur x "),
            Contains("accueil / x"),
            EndsWith(" / x"),
            Contains(") x"),
        ],
    ),
    site("YouTube", &[Contains("youtube")]),
    site("Twitch", &[Contains("twitch")]),
    site("TikTok", &[Contains("tiktok")]),
    site("Gmail", &[Contains("gmail"), Contains("inbox")]),
    site("GitHub", &[Contains("github")]),
    site("LinkedIn", &[Contains("linkedin")]),
    site("Reddit", &[Contains("reddit")]),
    site("Instagram", &[Contains("instagram")]),
    site("Facebook", &[Contains("facebook")]),
    site("Discord", &[Contains("discord")]),
    site("Slack", &[Contains("slack")]),
    site("Notion", &[Contains("notion")]),
    site(
        "Google Drive",
        &[
            Contains("google drive"),
            Contains("google docs"),
            Contains("google sheets"),
        ],
    ),
    site("Stack Overflow", &[Contains("stack overflow")]),
    site("ChatGPT", &[Contains("chatgpt")]),
    site("Claude", &[Contains("claude")]),
    site("Netflix", &[Contains("netflix")]),
    site("Spotify", &[Contains("spotify")]),
];

/// Maps a raw window identity to its enriched label.
///
/// Never fails: when no rule produces a label the app name is returned as is.
pub fn classify(app_name: &str, window_title: &str) -> String {
    if is_browser(app_name) {
        if let Some(site) = website_label(window_title) {
            return site.to_string();
        }
    }

    if is_editor(app_name) {
        if let Some(project) = project_label(window_title) {
            return project.to_string();
        }
    }

    app_name.to_string()
}

/// Returns `true` if the app name belongs to a known browser.
pub fn is_browser(app_name: &str) -> bool {
    BROWSER_APPS.iter().any(|browser| app_name.contains(browser))
}

/// Returns `true` if the app name belongs to a known code editor.
pub fn is_editor(app_name: &str) -> bool {
    EDITOR_APPS.iter().any(|editor| app_name.contains(editor))
}

/// Site label for a browser tab title.
///
/// Unrecognised sites collapse into [`OTHER_SITES_LABEL`]; only an empty title
/// yields `None`.
fn website_label(title: &str) -> Option<&'static str> {
    if title.is_empty() {
        return None;
    }

    let title = strip_browser_suffixes(title).to_lowercase();
    let label = SITE_RULES
        .iter()
        .find(|rule| rule.matches(&title))
        .map_or(OTHER_SITES_LABEL, |rule| rule.label);
    Some(label)
}

fn strip_browser_suffixes(title: &str) -> &str {
    let mut title = title;
    for suffix in BROWSER_SUFFIXES {
        match title.find(suffix) {
            Some(idx) if idx > 0 => title = &title[..idx],
            _ => {}
        }
    }
    title.trim()
}

/// Case-insensitive comparison with Unicode case folding (`ſ` matches `s`).
fn eq_fold(a: &str, b: &str) -> bool {
    let fold = |c: char| c.to_uppercase().flat_map(char::to_lowercase);
    a.chars().flat_map(fold).eq(b.chars().flat_map(fold))
}

/// Project name for an editor title such as `file.rs — project — workspace`.
fn project_label(title: &str) -> Option<&str> {
    if title.is_empty() {
        return None;
    }

    let parts: Vec<&str> = title.split(EDITOR_SEPARATOR).collect();

    if parts.len() >= 3 {
        let project = parts[1].trim();
        if !project.is_empty() {
            return Some(project);
        }
    }

    if let [first, last] = parts.as_slice() {
        let last = last.trim();
        let last_is_generic = GENERIC_WORKSPACES
            .iter()
            .any(|generic| eq_fold(last, generic));
        let project = if last_is_generic { first.trim() } else { last };
        if !project.is_empty() {
            return Some(project);
        }
    }

    // `[project] file.rs`
    if title.starts_with('[') {
        if let Some(end) = title.find(']') {
            if end > 1 {
                return Some(&title[1..end]);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_title_with_site_name_maps_to_site() {
        assert_eq!(
            classify("Google Chrome", "Dashboard - YouTube - Google Chrome"),
            "YouTube"
        );
    }

    #[test]
    fn browser_suffix_is_stripped_before_matching() {
        assert_eq!(classify("Brave Browser", "Pull requests · GitHub - Brave"), "GitHub");
        assert_eq!(classify("Arc", "Some article – Arc"), OTHER_SITES_LABEL);
    }

    #[test]
    fn x_requires_one_of_its_phrase_patterns() {
        assert_eq!(classify("Safari", "Accueil / X"), "X");
        assert_eq!(classify("Safari", "(3) X"), "X");
        assert_eq!(classify("Firefox", "Jane sur X : \"hello\" / X"), "X");
        assert_eq!(classify("Firefox", "Xylophone lessons"), OTHER_SITES_LABEL);
    }

    #[test]
    fn first_matching_site_wins() {
        // Both "youtube" and "github" appear; YouTube is earlier in the table.
        assert_eq!(
            classify("Google Chrome", "github tour - YouTube"),
            "YouTube"
        );
        assert_eq!(classify("Google Chrome", "Inbox (3) - Proton"), "Gmail");
    }

    #[test]
    fn unknown_site_is_bucketed_as_other() {
        assert_eq!(
            classify("Google Chrome", "Rust Programming Language"),
            OTHER_SITES_LABEL
        );
    }

    #[test]
    fn site_table_applies_to_chat_titles_inside_a_browser() {
        assert_eq!(
            classify("Google Chrome", "general (#eng) - MyTeam - Slack"),
            "Slack"
        );
    }

    #[test]
    fn non_browser_non_editor_falls_back_to_app_name() {
        assert_eq!(classify("Slack", "general (#eng) - MyTeam - Slack"), "Slack");
        assert_eq!(classify("Terminal", "~/src — zsh — 80x24"), "Terminal");
    }

    #[test]
    fn empty_browser_title_falls_back_to_app_name() {
        assert_eq!(classify("Firefox", ""), "Firefox");
    }

    #[test]
    fn editor_three_part_title_uses_middle_part() {
        assert_eq!(
            classify("Visual Studio Code", "main.go — myproj — Workspace"),
            "myproj"
        );
    }

    #[test]
    fn editor_two_part_title_skips_generic_workspace() {
        assert_eq!(classify("Visual Studio Code", "myproj — Perso"), "myproj");
        assert_eq!(classify("Cursor", "myproj — workspace"), "myproj");
        assert_eq!(classify("Cursor", "myproj — PERſO"), "myproj");
    }

    #[test]
    fn editor_two_part_title_prefers_specific_last_part() {
        assert_eq!(classify("Cursor", "lib.rs — wt-core"), "wt-core");
    }

    #[test]
    fn editor_bracketed_project_prefix() {
        assert_eq!(classify("VSCodium", "[tracker] notes.md"), "tracker");
        assert_eq!(classify("VSCodium", "[] notes.md"), "VSCodium");
    }

    #[test]
    fn editor_title_without_structure_falls_back() {
        assert_eq!(classify("Code", "Welcome"), "Code");
        assert_eq!(classify("Code", ""), "Code");
    }

    #[test]
    fn classification_is_deterministic() {
        let first = classify("Google Chrome", "Claude - Stack Overflow");
        for _ in 0..10 {
            assert_eq!(classify("Google Chrome", "Claude - Stack Overflow"), first);
        }
        assert_eq!(first, "Stack Overflow");
    }
}
