use crate::UrlError;
use url::form_urlencoded;
use url::Url;

/// Query parameters removed during normalization
///
/// These are the tracking and attribution parameters newsletter platforms
/// append to outgoing links. Only exact key matches are removed.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
    "mc_cid",
    "mc_eid",
    "fbclid",
    "gclid",
    "dclid",
    "_ga",
    "_gl",
    "oly_enc_id",
    "oly_anon_id",
    "vero_id",
    "vero_conv",
    "spm",
    "share_token",
    "si",
    "feature",
];

/// Normalizes a link into its canonical form using the default tracking list
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Remove tracking query parameters
/// 4. Re-encode the remaining parameters sorted by key, or drop the query
///    string entirely when none remain
/// 5. Remove the fragment
/// 6. Remove one trailing slash from the path
///
/// # Examples
///
/// ```
/// use mailsift::url::normalize_url;
///
/// let url = normalize_url("https://x.com/a?utm_source=nl&id=5#frag").unwrap();
/// assert_eq!(url, "https://x.com/a?id=5");
///
/// let url = normalize_url("https://x.com/a/?utm_source=nl").unwrap();
/// assert_eq!(url, "https://x.com/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = super::parse_http_url(url_str)?;
    Ok(normalize_parsed(&url, TRACKING_PARAMS))
}

/// Normalizes an already parsed http(s) URL with a caller-supplied tracking list
pub fn normalize_parsed<S: AsRef<str>>(url: &Url, tracking_params: &[S]) -> String {
    let mut normalized = url.clone();

    if normalized.query().is_some() {
        let mut params: Vec<(String, String)> = normalized
            .query_pairs()
            .filter(|(key, _)| !tracking_params.iter().any(|p| p.as_ref() == key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if params.is_empty() {
            normalized.set_query(None);
        } else {
            // Stable sort keeps repeated keys in their original order
            params.sort_by(|a, b| a.0.cmp(&b.0));
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            normalized.set_query(Some(&query));
        }
    }

    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path[..path.len() - 1].to_string();
        normalized.set_path(&trimmed);
    }

    normalized.to_string()
}
