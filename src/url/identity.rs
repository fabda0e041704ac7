use crate::UrlError;
use url::Url;

/// Query parameter carrying the source system's document identifier
const IDENTITY_PARAM: &str = "guid";

/// Path segment that precedes a document identifier (`/.../Document/<id>`)
const DOCUMENT_SEGMENT: &str = "document";

/// The resolved identity of a page address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// The address with any fragment removed; unique key of a stored node
    pub canonical_address: String,

    /// Source-specific document identifier, when the address carries one
    pub identity_key: Option<String>,
}

impl Identity {
    /// Returns true if the address carries an identity key
    pub fn has_key(&self) -> bool {
        self.identity_key.is_some()
    }
}

/// Resolves a page address into its canonical address and identity key
///
/// The identity key is the value of the `guid` query parameter (parameter
/// name compared case-insensitively). Without one, a path of the form
/// `/.../Document/<id>` yields `<id>`. Otherwise the key is `None`.
///
/// Pure function: no I/O, no side effects.
///
/// # Examples
///
/// ```
/// use regatlas::url::resolve;
///
/// let identity = resolve("https://regs.example.gov/Browse?guid=I123#top").unwrap();
/// assert_eq!(identity.canonical_address, "https://regs.example.gov/Browse?guid=I123");
/// assert_eq!(identity.identity_key.as_deref(), Some("I123"));
///
/// let identity = resolve("https://regs.example.gov/calregs/Document/I456").unwrap();
/// assert_eq!(identity.identity_key.as_deref(), Some("I456"));
/// ```
pub fn resolve(address: &str) -> Result<Identity, UrlError> {
    let mut url = Url::parse(address.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let identity_key = key_from_query(&url).or_else(|| key_from_path(&url));

    Ok(Identity {
        canonical_address: url.to_string(),
        identity_key,
    })
}

fn key_from_query(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(name, value)| name.eq_ignore_ascii_case(IDENTITY_PARAM) && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn key_from_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url
        .path()
        .trim_end_matches('/')
        .split('/')
        .collect();

    match segments.as_slice() {
        [.., marker, id] if marker.eq_ignore_ascii_case(DOCUMENT_SEGMENT) && !id.is_empty() => {
            Some((*id).to_string())
        }
        _ => None,
    }
}
