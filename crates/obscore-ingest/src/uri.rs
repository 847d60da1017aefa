//! URI minting.
//!
//! Paths follow the layout
//!
//! ```text
//! <root>/obsv/observation/MAST/obsid/<group>/
//! <root>/obsv/data/MAST/obsid/<group>/<fingerprint>
//! <root>/obsv/target/MAST/<target_name>
//! <root>/obsv/collection/MAST/<obs_collection>
//! <root>/conf/project/MAST_<obs_creator_name>
//! <root>/infra/{observatory,telescope,instrument}/...
//! ```
//!
//! Slash URIs keep the output small and let properties be attached to the
//! parent paths later. Every URI is a pure function of its inputs.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;

pub const DEFAULT_NAMESPACE_ROOT: &str = "http://ads.harvard.edu/sem/context";

/// Observatory name used for every observation in the MAST table.
pub const OBSERVATORY: &str = "MAST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriScheme {
    root: String,
}

impl Default for UriScheme {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE_ROOT)
    }
}

impl UriScheme {
    pub fn new(root: impl Into<String>) -> Self {
        let root: String = root.into();
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// `<root><base_path><key>`. `base_path` must start with `/`; `key` is
    /// percent-encoded as a single path segment.
    pub fn build_uri(&self, base_path: &str, key: Option<&str>) -> String {
        let mut uri = format!("{}{}", self.root, base_path);
        if let Some(key) = key {
            uri.push_str(&encode_segment(key));
        }
        uri
    }

    pub fn observation(&self, group: &str) -> String {
        self.build_uri(
            &format!("/obsv/observation/MAST/obsid/{}/", encode_segment(group)),
            None,
        )
    }

    /// Datum URIs hang off the row group (`obs_id`), not the merge key, so
    /// a file keeps its URI whichever exposure it is grouped into.
    pub fn datum(&self, group: &str, access_url: &str) -> String {
        self.build_uri(
            &format!("/obsv/data/MAST/obsid/{}/", encode_segment(group)),
            Some(&access_url_fingerprint(access_url)),
        )
    }

    pub fn target(&self, name: &str) -> String {
        self.build_uri("/obsv/target/MAST/", Some(name))
    }

    /// Collection node. An IVOA identifier is used verbatim so that the node
    /// lines up with the registry record; anything else is minted locally.
    pub fn collection(&self, name: &str) -> String {
        if is_ivoa_uri(name) {
            sanitize_iri(name)
        } else {
            self.build_uri("/obsv/collection/MAST/", Some(name))
        }
    }

    pub fn creator(&self, name: &str) -> String {
        self.build_uri("/conf/project/", Some(&format!("MAST_{name}")))
    }

    pub fn observatory(&self, name: &str) -> String {
        self.build_uri("/infra/observatory/", Some(name))
    }

    pub fn telescope(&self, name: &str) -> String {
        self.build_uri("/infra/telescope/", Some(&format!("MAST_{name}")))
    }

    pub fn instrument(&self, name: &str) -> String {
        self.build_uri("/infra/instrument/", Some(&format!("MAST_{name}")))
    }
}

/// Reverse the access URL and base64 it (URL-safe alphabet, padded).
///
/// This is a placeholder token, not a content hash: it is only as unique as
/// the URLs themselves and is long. Reversal puts the most variable part of
/// the URL (the file name) first.
pub fn access_url_fingerprint(url: &str) -> String {
    let reversed: String = url.chars().rev().collect();
    URL_SAFE.encode(reversed.as_bytes())
}

/// Is `value` an IVOA identifier (`ivo://authority[/path]`)?
pub fn is_ivoa_uri(value: &str) -> bool {
    let value = value.trim();
    let Some(scheme) = value.get(..6) else {
        return false;
    };
    if !scheme.eq_ignore_ascii_case("ivo://") {
        return false;
    }

    let rest = &value[6..];
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let mut chars = authority.chars();
    let starts_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    starts_ok
        && authority.len() >= 3
        && chars.all(|c| c.is_ascii_alphanumeric() || "-._~".contains(c))
        && !rest[authority.len()..].contains(char::is_whitespace)
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@".contains(c)
}

/// Percent-encode everything that may not appear in one IRI path segment.
pub fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if is_segment_char(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}

/// Percent-encode the characters that are never legal inside an IRI
/// (space, `<>"{}|\^` and backquote), leaving the rest of an external URL
/// untouched.
pub fn sanitize_iri(value: &str) -> String {
    let value = value.trim();
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_whitespace() || c.is_control() || "<>\"{}|\\^`".contains(c) {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn observation_and_datum_paths() {
        let uris = UriScheme::new("http://example.org/ctx/");
        assert_eq!(
            uris.observation("hut01=1990-12-03_10:00:00"),
            "http://example.org/ctx/obsv/observation/MAST/obsid/hut01=1990-12-03_10:00:00/"
        );

        let datum = uris.datum("hut01", "http://mast/a.fits");
        assert!(datum.starts_with("http://example.org/ctx/obsv/data/MAST/obsid/hut01/"));
        assert!(datum.ends_with(&access_url_fingerprint("http://mast/a.fits")));
    }

    #[test]
    fn fingerprint_is_reversed_urlsafe_base64() {
        // "cba" in standard base64
        assert_eq!(access_url_fingerprint("abc"), "Y2Jh");
        // padding is kept
        assert_eq!(access_url_fingerprint("ab"), "YmE=");
        let fp = access_url_fingerprint("http://mast.stsci.edu/x?y=~~~");
        assert!(!fp.contains('+') && !fp.contains('/'));
    }

    #[test]
    fn names_are_percent_encoded() {
        let uris = UriScheme::default();
        assert_eq!(
            uris.target("20% UV FLOOD"),
            format!("{DEFAULT_NAMESPACE_ROOT}/obsv/target/MAST/20%25%20UV%20FLOOD")
        );
        assert_eq!(
            uris.telescope("HST/FOS"),
            format!("{DEFAULT_NAMESPACE_ROOT}/infra/telescope/MAST_HST%2FFOS")
        );
        assert_eq!(
            uris.creator("Smith"),
            format!("{DEFAULT_NAMESPACE_ROOT}/conf/project/MAST_Smith")
        );
        assert_eq!(
            uris.observatory(OBSERVATORY),
            format!("{DEFAULT_NAMESPACE_ROOT}/infra/observatory/MAST")
        );
    }

    #[test]
    fn ivoa_collections_are_used_verbatim() {
        let uris = UriScheme::default();
        assert_eq!(
            uris.collection("ivo://mast.stsci/hut"),
            "ivo://mast.stsci/hut"
        );
        assert_eq!(
            uris.collection("HUT"),
            format!("{DEFAULT_NAMESPACE_ROOT}/obsv/collection/MAST/HUT")
        );
    }

    #[test]
    fn recognises_ivoa_identifiers() {
        assert!(is_ivoa_uri("ivo://mast.stsci.edu/hut"));
        assert!(is_ivoa_uri("IVO://archive.stsci.edu"));
        assert!(is_ivoa_uri("ivo://adsabs.harvard.edu/ads#frag"));
        assert!(!is_ivoa_uri("HUT"));
        assert!(!is_ivoa_uri("ivo://"));
        assert!(!is_ivoa_uri("ivo://ab"));
        assert!(!is_ivoa_uri("ivo://-bad.org/x"));
        assert!(!is_ivoa_uri("http://mast.stsci.edu"));
        assert!(!is_ivoa_uri("ivo://mast.stsci/has space"));
    }

    #[test]
    fn sanitize_only_touches_illegal_characters() {
        assert_eq!(
            sanitize_iri("http://x.org/a b<c>?q=1&r=2"),
            "http://x.org/a%20b%3Cc%3E?q=1&r=2"
        );
    }

    proptest! {
        #[test]
        fn uris_are_deterministic(obs_id in "[A-Za-z0-9_]{1,16}", url in "[ -~]{1,64}") {
            let uris = UriScheme::default();
            prop_assert_eq!(uris.observation(&obs_id), uris.observation(&obs_id));
            prop_assert_eq!(uris.datum(&obs_id, &url), uris.datum(&obs_id, &url));
        }

        #[test]
        fn different_urls_give_different_datums(
            obs_id in "[A-Za-z0-9_]{1,16}",
            a in "[ -~]{1,64}",
            b in "[ -~]{1,64}",
        ) {
            prop_assume!(a != b);
            let uris = UriScheme::default();
            prop_assert_ne!(uris.datum(&obs_id, &a), uris.datum(&obs_id, &b));
        }

        #[test]
        fn encoded_segments_never_contain_slashes(name in "\\PC{0,32}") {
            let encoded = encode_segment(&name);
            prop_assert!(!encoded.contains('/'));
            prop_assert!(!encoded.contains(' '));
        }
    }
}
