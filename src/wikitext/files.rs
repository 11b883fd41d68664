use super::{cached, strip_nowiki};
use md5::{Digest, Md5};
use regex::Regex;
use std::sync::OnceLock;

static RE_FILE: OnceLock<Option<Regex>> = OnceLock::new();

/// Most file references returned for one article
const MAX_FILES: usize = 10_000;

const COMMONS_BASE: &str = "http://upload.wikimedia.org/wikipedia/commons/";

/// Find all `[File:...]` references in an article body
///
/// References inside comments are included (many images are commented
/// out rather than deleted); `<nowiki>` blocks are skipped.
pub fn find_files(text: &str) -> Vec<String> {
    let Some(re) = cached(&RE_FILE, r"\[File:([^|\]]+)") else {
        return Vec::new();
    };
    let cleaned = strip_nowiki(text);

    re.captures_iter(&cleaned)
        .take(MAX_FILES)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Wikimedia Commons URL for a named file
///
/// Commons shards uploads by the MD5 of the file name (with spaces as
/// underscores): `/{h[0]}/{h[0..2]}/{name}`.
pub fn url_for_file(name: &str) -> String {
    let name = name.replace(' ', "_");
    let hash = hex::encode(Md5::digest(name.as_bytes()));

    format!(
        "{}{}/{}/{}",
        COMMONS_BASE,
        &hash[..1],
        &hash[..2],
        urlencoding::encode(&name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPONGE: &str = r#"{{Taxobox
| image = Tide pools sponge.jpg
}}
[[File:Aphrocallistes vastus.jpg|thumb|upright|A glass sponge]]
<!-- [[File:Sponge in papua new guinea.jpg|thumb|Commented out]] -->
<nowiki>[[File:Escaped example.jpg]]</nowiki>
[[File:BoredEncrustedShell.JPG|thumb|left|[[Bivalve]] shell bored by a sponge]]
[[Image:Legacy prefix.jpg|thumb]]
"#;

    #[test]
    fn test_find_files() {
        assert_eq!(
            find_files(SPONGE),
            vec![
                "Aphrocallistes vastus.jpg",
                "Sponge in papua new guinea.jpg",
                "BoredEncrustedShell.JPG",
            ]
        );
    }

    #[test]
    fn test_url_for_file() {
        assert_eq!(
            url_for_file("BoredEncrustedShell.JPG"),
            "http://upload.wikimedia.org/wikipedia/commons/1/10/BoredEncrustedShell.JPG"
        );
        assert_eq!(
            url_for_file("AURI B-25.jpg"),
            "http://upload.wikimedia.org/wikipedia/commons/9/93/AURI_B-25.jpg"
        );
    }
}
