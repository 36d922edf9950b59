//! Path tokenizer shared by registration and dispatch.
//!
//! A path is trimmed of leading and trailing `/`, split on `/`, and empty
//! pieces produced by repeated slashes are dropped. Each surviving token is
//! then classified:
//!
//! | Token      | Segment                     |
//! |------------|-----------------------------|
//! | `{id}`     | `Param("id")`               |
//! | `*` / `*x` | `Wildcard(None)` / `Wildcard(Some("x"))` |
//! | anything else | `Static(token)`          |
//!
//! Registration and dispatch both go through [`tokenize`], so a path that is
//! registered and the same path arriving on the wire always split the same way.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Most paths have fewer segments than this; longer ones spill to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 16;

/// Tokens of one path, with byte offsets into the trimmed path so a wildcard
/// can capture the remainder exactly as it was sent.
#[derive(Debug, Clone)]
pub struct PathTokens<'a> {
    trimmed: &'a str,
    tokens: SmallVec<[(usize, &'a str); MAX_INLINE_SEGMENTS]>,
}

impl<'a> PathTokens<'a> {
    /// Number of non-empty segments.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// `true` for the router root (`""`, `/`, `///`).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Raw text of segment `idx`.
    #[inline]
    #[must_use]
    pub fn text(&self, idx: usize) -> Option<&'a str> {
        self.tokens.get(idx).map(|(_, t)| *t)
    }

    /// Untokenized path from segment `idx` to the end (trailing `/` trimmed).
    /// Empty when `idx` is past the last segment.
    #[inline]
    #[must_use]
    pub fn remainder_from(&self, idx: usize) -> &'a str {
        match self.tokens.get(idx) {
            Some((offset, _)) => &self.trimmed[*offset..],
            None => "",
        }
    }

    /// Iterate over the raw segment texts.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tokens.iter().map(|(_, t)| *t)
    }
}

/// Split `path` into its non-empty segments.
#[must_use]
pub fn tokenize(path: &str) -> PathTokens<'_> {
    let trimmed = path.trim_matches('/');
    let mut tokens = SmallVec::new();
    let mut offset = 0;
    for piece in trimmed.split('/') {
        if !piece.is_empty() {
            tokens.push((offset, piece));
        }
        offset += piece.len() + 1;
    }
    PathTokens { trimmed, tokens }
}

/// Kind of a classified segment, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Static,
    Param,
    Wildcard,
}

/// A classified path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text that must match exactly.
    Static(Arc<str>),
    /// `{name}`: matches any single segment.
    Param(Arc<str>),
    /// `*` or `*name`: matches the rest of the path.
    Wildcard(Option<Arc<str>>),
}

impl Segment {
    /// Classify one raw token. Never fails; validation of names happens at
    /// registration.
    #[must_use]
    pub fn classify(token: &str) -> Segment {
        if let Some(rest) = token.strip_prefix('*') {
            if rest.is_empty() {
                return Segment::Wildcard(None);
            }
            return Segment::Wildcard(Some(Arc::from(rest)));
        }
        if token.len() >= 2 && token.starts_with('{') && token.ends_with('}') {
            return Segment::Param(Arc::from(&token[1..token.len() - 1]));
        }
        Segment::Static(Arc::from(token))
    }

    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Static(_) => SegmentKind::Static,
            Segment::Param(_) => SegmentKind::Param,
            Segment::Wildcard(_) => SegmentKind::Wildcard,
        }
    }

    /// Whether this segment captures a value during dispatch.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Segment::Static(_))
    }

    /// Key under which a dynamic segment's captured value is reported.
    /// An unnamed wildcard reports under `*`.
    #[must_use]
    pub fn capture_name(&self) -> Option<Arc<str>> {
        match self {
            Segment::Static(_) => None,
            Segment::Param(name) => Some(Arc::clone(name)),
            Segment::Wildcard(Some(name)) => Some(Arc::clone(name)),
            Segment::Wildcard(None) => Some(Arc::from("*")),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(text) => write!(f, "{text}"),
            Segment::Param(name) => write!(f, "{{{name}}}"),
            Segment::Wildcard(Some(name)) => write!(f, "*{name}"),
            Segment::Wildcard(None) => write!(f, "*"),
        }
    }
}

/// Tokenize and classify a path for registration.
#[must_use]
pub fn segments(path: &str) -> Vec<Segment> {
    tokenize(path).iter().map(Segment::classify).collect()
}

/// Render segments back to a normalised path (`/` for none).
#[must_use]
pub fn join(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(&seg.to_string());
    }
    out
}
