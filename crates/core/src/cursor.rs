//! Resumable scan cursors.
//!
//! Incremental iteration (`SCAN`, `HSCAN`, `SSCAN`, `ZSCAN`) is a three-state
//! machine:
//!
//! ```text
//! Start ──advance──▶ InProgress(token) ──advance──▶ ... ──advance──▶ Done
//!   │                                                          ▲
//!   └──────────── advance (store returns "0") ─────────────────┘
//! ```
//!
//! The first round trip sends token `"0"`. Each reply carries the next token;
//! a reply token of `"0"` ends the iteration. Advancing a finished cursor makes
//! no round trip and yields an empty page.
//!
//! Under concurrent modification the store may repeat or skip elements, but
//! never loops forever. Callers needing exact-once semantics deduplicate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque continuation token in the store's native form (a decimal integer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorToken(String);

impl CursorToken {
    /// Token that starts an iteration and that the store returns at its end.
    pub const START: &'static str = "0";

    /// The starting token.
    pub fn start() -> Self {
        CursorToken(Self::START.to_string())
    }

    /// Wrap a token returned by the store.
    pub fn new(token: impl Into<String>) -> Self {
        CursorToken(token.into())
    }

    /// Returns `true` for `"0"`.
    pub fn is_start(&self) -> bool {
        self.0 == Self::START
    }

    /// Token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the token as the store's integer position.
    pub fn position(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<u64> for CursorToken {
    fn from(position: u64) -> Self {
        CursorToken(position.to_string())
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options passed unchanged on every round trip of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Glob pattern (`MATCH`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Page-size hint (`COUNT`); the store may return more or fewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Key type filter (`TYPE`), only meaningful for key scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ScanParams {
    /// No pattern, no hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the match pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the page-size hint.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Restrict a key scan to one value type (`"string"`, `"hash"`, ...).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// One round trip's worth of results.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage<T> {
    /// Token for the next round trip; `"0"` when the iteration is complete
    pub cursor: CursorToken,
    /// Elements in this page, possibly none
    pub items: Vec<T>,
}

impl<T> ScanPage<T> {
    /// Transform the items, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ScanPage<U> {
        ScanPage {
            cursor: self.cursor,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Where an iteration stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// No round trip made yet
    Start,
    /// Resume with this token
    InProgress(CursorToken),
    /// The store reported completion
    Done,
}

/// A scan state plus the options it was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    state: ScanState,
    params: ScanParams,
}

impl ScanCursor {
    /// A fresh cursor.
    pub fn new(params: ScanParams) -> Self {
        Self {
            state: ScanState::Start,
            params,
        }
    }

    /// Resume from a token obtained earlier. `"0"` means start over.
    pub fn resume(token: CursorToken, params: ScanParams) -> Self {
        let state = if token.is_start() {
            ScanState::Start
        } else {
            ScanState::InProgress(token)
        };
        Self { state, params }
    }

    /// Current state.
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Options sent on every round trip.
    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    /// Returns `true` once the store has reported completion.
    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Token the next round trip would send, or `None` when done.
    pub fn token(&self) -> Option<CursorToken> {
        match &self.state {
            ScanState::Start => Some(CursorToken::start()),
            ScanState::InProgress(token) => Some(token.clone()),
            ScanState::Done => None,
        }
    }

    /// Make one round trip through `fetch` and move to the next state.
    ///
    /// On `Done` this returns an empty page without calling `fetch`. A failed
    /// round trip leaves the state unchanged so the caller may retry it.
    pub fn advance<T, F>(&mut self, fetch: F) -> Result<Vec<T>>
    where
        F: FnOnce(&CursorToken, &ScanParams) -> Result<ScanPage<T>>,
    {
        let Some(token) = self.token() else {
            return Ok(Vec::new());
        };
        let page = fetch(&token, &self.params)?;
        tracing::debug!(
            target: "redstone::cursor",
            from = %token,
            to = %page.cursor,
            items = page.items.len(),
            "scan advanced"
        );
        self.state = if page.cursor.is_start() {
            ScanState::Done
        } else {
            ScanState::InProgress(page.cursor)
        };
        Ok(page.items)
    }
}

/// Lazy iterator over scan pages.
///
/// Each call to `next` makes one round trip. After an error the iterator is
/// fused.
pub struct Scan<T, F> {
    cursor: ScanCursor,
    fetch: F,
    failed: bool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> Scan<T, F>
where
    F: FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<T>>,
{
    /// Iterate from the start with `params`.
    pub fn new(params: ScanParams, fetch: F) -> Self {
        Self::from_cursor(ScanCursor::new(params), fetch)
    }

    /// Iterate from an existing cursor.
    pub fn from_cursor(cursor: ScanCursor, fetch: F) -> Self {
        Self {
            cursor,
            fetch,
            failed: false,
            _marker: std::marker::PhantomData,
        }
    }

    /// The underlying cursor, e.g. to persist its token between sessions.
    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    /// Flatten pages into individual elements.
    pub fn items(self) -> ScanItems<T, F> {
        ScanItems {
            pages: self,
            buffer: std::collections::VecDeque::new(),
        }
    }
}

impl<T, F> Iterator for Scan<T, F>
where
    F: FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<T>>,
{
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_done() {
            return None;
        }
        let fetch = &mut self.fetch;
        match self.cursor.advance(|token, params| fetch(token, params)) {
            Ok(items) => Some(Ok(items)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Element-wise view of a [`Scan`].
pub struct ScanItems<T, F> {
    pages: Scan<T, F>,
    buffer: std::collections::VecDeque<T>,
}

impl<T, F> Iterator for ScanItems<T, F>
where
    F: FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            match self.pages.next()? {
                Ok(items) => self.buffer.extend(items),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
