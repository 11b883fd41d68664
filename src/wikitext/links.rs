use super::{cached, strip_comments, strip_nowiki};
use regex::Regex;
use std::sync::OnceLock;

static RE_LINK: OnceLock<Option<Regex>> = OnceLock::new();

/// Find the targets of all `[[...]]` links in an article body
///
/// Display text after `|` is dropped. Links inside comments and
/// `<nowiki>` blocks are ignored.
pub fn find_links(text: &str) -> Vec<String> {
    let Some(re) = cached(&RE_LINK, r"\[\[([^|\]]+)") else {
        return Vec::new();
    };
    let cleaned = strip_nowiki(&strip_comments(text)).into_owned();

    re.captures_iter(&cleaned)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_links() {
        let text = "'''Sponges''' are [[animal]]s of the [[phylum]] '''Porifera''' \
                    ([[Neo-Latin|modern Latin]] for ''pore bearer'').";
        assert_eq!(find_links(text), vec!["animal", "phylum", "Neo-Latin"]);
    }

    #[test]
    fn test_find_links_skips_comments_and_nowiki() {
        let text = "[[Kept]] <!-- [[Commented]] --> <nowiki>[[Escaped]]</nowiki> [[es:Porifera]]";
        assert_eq!(find_links(text), vec!["Kept", "es:Porifera"]);
    }

    #[test]
    fn test_find_links_empty() {
        assert!(find_links("no links here").is_empty());
    }
}
